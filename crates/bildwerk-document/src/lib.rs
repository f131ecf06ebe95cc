// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bildwerk-document — Page assembly for Bildwerk.
//
// Provides the image transform engine (decode, quarter-turn rotation,
// resolution capping, JPEG re-encoding), the layout solver (fit, cover,
// stretch), the `PageSink` document backend with its `printpdf`
// implementation, and the `PageAssembler` that drives a run.

pub mod assemble;
pub mod image;
pub mod layout;
pub mod pdf;

// Re-export the primary types so callers can use `bildwerk_document::PageAssembler` etc.
pub use crate::assemble::{CancelHandle, PageAssembler};
pub use crate::image::transform;
pub use crate::layout::{SafeArea, solve};
pub use crate::pdf::{PageSink, PdfSink};

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bildwerk — Core types, settings resolution, and error definitions shared
// across all crates.

pub mod batch;
pub mod config;
pub mod error;
pub mod human_errors;
pub mod types;

pub use batch::ImageBatch;
pub use config::{RawSettings, resolve};
pub use error::{BildwerkError, Result};
pub use types::*;

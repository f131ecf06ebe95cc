// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Assemble module — the run state machine that turns an ordered image list
// into a finished document.

pub mod assembler;

pub use assembler::{CancelHandle, PageAssembler};

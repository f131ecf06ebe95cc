// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout module — placement of a raster within a page's safe area.

pub mod solver;

pub use solver::{SafeArea, solve};

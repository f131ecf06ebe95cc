// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — decode, quarter-turn rotation, resolution capping, and JPEG
// re-encoding of source images.

pub mod transform;

pub use transform::{capped_dimensions, effective_dimensions, transform};

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout solver — computes where an image lands on a page for a given fit
// mode. Pure geometry in millimetres, origin at the page's top-left corner.

use bildwerk_core::types::{FitMode, PlacementRect};

/// Page area left after subtracting the margin from every side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafeArea {
    /// The margin actually applied, after clamping.
    pub margin: f32,
    pub width: f32,
    pub height: f32,
}

impl SafeArea {
    /// The margin is clamped to `[0, min(page_w, page_h) / 2]` so the safe
    /// area never has negative extent.
    pub fn new(page_w: f32, page_h: f32, margin: f32) -> Self {
        let margin = margin.max(0.0).min(page_w / 2.0).min(page_h / 2.0);
        Self {
            margin,
            width: page_w - 2.0 * margin,
            height: page_h - 2.0 * margin,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Centre a `w` x `h` box in the safe area.
    fn centre(&self, w: f32, h: f32) -> PlacementRect {
        PlacementRect {
            x: self.margin + (self.width - w) / 2.0,
            y: self.margin + (self.height - h) / 2.0,
            width: w,
            height: h,
        }
    }
}

/// Compute the placement of an `img_w` x `img_h` raster on a
/// `page_w` x `page_h` page.
///
/// - `Fit` keeps the whole image visible; one axis matches the safe area.
/// - `Cover` takes the opposite branch, so the rectangle covers the safe area
///   and overflows it on one axis. Nothing is cropped.
/// - `Stretch` fills the safe area exactly.
///
/// The result is always centred in the safe area. A degenerate safe area or a
/// zero-sized image yields a zero-area rectangle at the centre.
pub fn solve(
    img_w: f32,
    img_h: f32,
    page_w: f32,
    page_h: f32,
    margin: f32,
    mode: FitMode,
) -> PlacementRect {
    let safe = SafeArea::new(page_w, page_h, margin);
    if safe.is_degenerate() || img_w <= 0.0 || img_h <= 0.0 {
        return safe.centre(0.0, 0.0);
    }

    let img_ratio = img_w / img_h;
    let page_ratio = safe.width / safe.height;
    let wider_than_page = img_ratio > page_ratio;

    let (w, h) = match mode {
        FitMode::Fit if wider_than_page => (safe.width, safe.width / img_ratio),
        FitMode::Fit => (safe.height * img_ratio, safe.height),
        FitMode::Cover if wider_than_page => (safe.height * img_ratio, safe.height),
        FitMode::Cover => (safe.width, safe.width / img_ratio),
        FitMode::Stretch => (safe.width, safe.height),
    };

    safe.centre(w, h)
}

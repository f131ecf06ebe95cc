// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// User-facing settings and their resolution into a frozen `PageSettings`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::{BildwerkError, Result};
use crate::types::{DEFAULT_MAX_DIMENSION_PX, DEFAULT_TITLE, FitMode, Orientation, PageSettings, PaperSize};

/// Page size used for custom dimensions left blank or non-numeric.
const FALLBACK_PAPER: PaperSize = PaperSize::A4;

/// Settings as the user entered them.
///
/// Custom dimensions are kept as text because they come from free-form
/// fields; blank or non-numeric values fall back to A4. Every field has a
/// default so a JSON settings file may be partial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSettings {
    /// Named size (`a3`, `a4`, `a5`, `letter`, `legal`, `tabloid`) or `custom`.
    pub page_size: String,
    pub custom_width: String,
    pub custom_height: String,
    /// `portrait` or `landscape`.
    pub orientation: String,
    pub margin: f32,
    /// JPEG quality, 0.0–1.0.
    pub quality: f32,
    /// `fit`, `cover` (or `fill`), `stretch`.
    pub fit_mode: String,
    pub page_numbers: bool,
    pub max_dimension: u32,
    pub title: Option<String>,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            page_size: "a4".to_string(),
            custom_width: String::new(),
            custom_height: String::new(),
            orientation: "portrait".to_string(),
            margin: 10.0,
            quality: 0.9,
            fit_mode: "fit".to_string(),
            page_numbers: false,
            max_dimension: DEFAULT_MAX_DIMENSION_PX,
            title: None,
        }
    }
}

impl RawSettings {
    /// Load settings from a JSON file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let settings = serde_json::from_str(&data)?;
        debug!("settings file loaded");
        Ok(settings)
    }

    /// Resolve into a validated snapshot. See [`resolve`].
    pub fn resolve(&self) -> Result<PageSettings> {
        resolve(self)
    }
}

/// Normalise user-facing settings into the canonical per-run parameters.
///
/// Fails with [`BildwerkError::InvalidConfig`] when a custom dimension is
/// non-positive, the margin is negative, the quality is outside `[0, 1]`,
/// or a token is not recognised.
#[instrument(skip(raw), fields(page_size = %raw.page_size, orientation = %raw.orientation))]
pub fn resolve(raw: &RawSettings) -> Result<PageSettings> {
    let (base_w, base_h) = base_dimensions(raw)?;

    let orientation = Orientation::from_token(&raw.orientation).ok_or_else(|| {
        BildwerkError::InvalidConfig(format!("unknown orientation '{}'", raw.orientation))
    })?;
    let (page_width_mm, page_height_mm) = orientation.apply(base_w, base_h);

    if !raw.margin.is_finite() || raw.margin < 0.0 {
        return Err(BildwerkError::InvalidConfig(format!(
            "margin must be a non-negative number, got {}",
            raw.margin
        )));
    }

    if !(0.0..=1.0).contains(&raw.quality) {
        return Err(BildwerkError::InvalidConfig(format!(
            "quality must be between 0 and 1, got {}",
            raw.quality
        )));
    }

    let fit_mode = FitMode::from_token(&raw.fit_mode).ok_or_else(|| {
        BildwerkError::InvalidConfig(format!("unknown fit mode '{}'", raw.fit_mode))
    })?;

    if raw.max_dimension == 0 {
        return Err(BildwerkError::InvalidConfig(
            "max dimension must be at least 1 pixel".into(),
        ));
    }

    let settings = PageSettings {
        page_width_mm,
        page_height_mm,
        orientation,
        margin_mm: raw.margin,
        fit_mode,
        jpeg_quality: raw.quality,
        numbering_enabled: raw.page_numbers,
        max_dimension_px: raw.max_dimension,
        title: raw
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .to_string(),
    };

    debug!(
        page_width_mm,
        page_height_mm,
        margin_mm = settings.margin_mm,
        fit_mode = ?settings.fit_mode,
        "settings resolved"
    );
    Ok(settings)
}

/// Portrait-or-as-entered dimensions before orientation is applied.
fn base_dimensions(raw: &RawSettings) -> Result<(f32, f32)> {
    if raw.page_size.trim().eq_ignore_ascii_case("custom") {
        let (fallback_w, fallback_h) = FALLBACK_PAPER.dimensions_mm();
        let width = parse_custom_dimension("width", &raw.custom_width, fallback_w)?;
        let height = parse_custom_dimension("height", &raw.custom_height, fallback_h)?;
        return Ok((width, height));
    }

    PaperSize::from_token(&raw.page_size)
        .map(|size| size.dimensions_mm())
        .ok_or_else(|| BildwerkError::InvalidConfig(format!("unknown page size '{}'", raw.page_size)))
}

/// Blank or non-numeric input falls back; numeric input must be positive.
fn parse_custom_dimension(field: &str, input: &str, fallback: f32) -> Result<f32> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(fallback);
    }

    match trimmed.parse::<f32>() {
        Ok(value) if value.is_nan() => {
            warn!(field, input = trimmed, fallback, "custom dimension is not a number");
            Ok(fallback)
        }
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        Ok(value) => Err(BildwerkError::InvalidConfig(format!(
            "custom {field} must be positive, got {value}"
        ))),
        Err(_) => {
            warn!(field, input = trimmed, fallback, "custom dimension is not a number");
            Ok(fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn custom(width: &str, height: &str) -> RawSettings {
        RawSettings {
            page_size: "custom".into(),
            custom_width: width.into(),
            custom_height: height.into(),
            ..RawSettings::default()
        }
    }

    #[test]
    fn defaults_resolve_to_portrait_a4() {
        let settings = resolve(&RawSettings::default()).expect("resolve");
        assert_eq!((settings.page_width_mm, settings.page_height_mm), (210.0, 297.0));
        assert_eq!(settings.fit_mode, FitMode::Fit);
        assert_eq!(settings.max_dimension_px, 2000);
        assert_eq!(settings.title, DEFAULT_TITLE);
    }

    #[test]
    fn landscape_swaps_named_size() {
        let raw = RawSettings {
            orientation: "landscape".into(),
            ..RawSettings::default()
        };
        let settings = resolve(&raw).expect("resolve");
        assert_eq!((settings.page_width_mm, settings.page_height_mm), (297.0, 210.0));
        assert_eq!(settings.orientation, Orientation::Landscape);
    }

    #[test]
    fn letter_uses_exact_millimetres() {
        let raw = RawSettings {
            page_size: "LETTER".into(),
            ..RawSettings::default()
        };
        let settings = resolve(&raw).expect("resolve");
        assert!((settings.page_width_mm - 215.9).abs() < 1e-4);
        assert!((settings.page_height_mm - 279.4).abs() < 1e-4);
    }

    #[test]
    fn custom_dimensions_pass_through() {
        let settings = resolve(&custom("100", "150.5")).expect("resolve");
        assert_eq!((settings.page_width_mm, settings.page_height_mm), (100.0, 150.5));
    }

    #[test]
    fn blank_or_garbage_custom_falls_back_to_a4() {
        let settings = resolve(&custom("", "abc")).expect("resolve");
        assert_eq!((settings.page_width_mm, settings.page_height_mm), (210.0, 297.0));
    }

    #[test]
    fn non_positive_custom_is_rejected() {
        assert!(matches!(
            resolve(&custom("0", "100")),
            Err(BildwerkError::InvalidConfig(_))
        ));
        assert!(matches!(
            resolve(&custom("100", "-5")),
            Err(BildwerkError::InvalidConfig(_))
        ));
    }

    #[test]
    fn quality_out_of_range_is_rejected() {
        for quality in [-0.1, 1.5, f32::NAN] {
            let raw = RawSettings {
                quality,
                ..RawSettings::default()
            };
            assert!(
                matches!(resolve(&raw), Err(BildwerkError::InvalidConfig(_))),
                "quality {quality} should be rejected"
            );
        }
    }

    #[test]
    fn negative_margin_is_rejected() {
        let raw = RawSettings {
            margin: -1.0,
            ..RawSettings::default()
        };
        assert!(matches!(resolve(&raw), Err(BildwerkError::InvalidConfig(_))));
    }

    #[test]
    fn zero_resolution_cap_is_rejected() {
        let raw = RawSettings {
            max_dimension: 0,
            ..RawSettings::default()
        };
        assert!(matches!(resolve(&raw), Err(BildwerkError::InvalidConfig(_))));
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        let bad_size = RawSettings {
            page_size: "b5".into(),
            ..RawSettings::default()
        };
        let bad_fit = RawSettings {
            fit_mode: "crop".into(),
            ..RawSettings::default()
        };
        let bad_orientation = RawSettings {
            orientation: "sideways".into(),
            ..RawSettings::default()
        };
        assert!(resolve(&bad_size).is_err());
        assert!(resolve(&bad_fit).is_err());
        assert!(resolve(&bad_orientation).is_err());
    }

    #[test]
    fn partial_json_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"page_size": "a5", "fit_mode": "cover", "page_numbers": true}}"#)
            .expect("write settings");

        let raw = RawSettings::from_json_file(file.path()).expect("load");
        assert_eq!(raw.orientation, "portrait");

        let settings = raw.resolve().expect("resolve");
        assert_eq!((settings.page_width_mm, settings.page_height_mm), (148.0, 210.0));
        assert_eq!(settings.fit_mode, FitMode::Cover);
        assert!(settings.numbering_enabled);
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Bildwerk page assembly engine.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{BildwerkError, Result};

/// Default resolution cap (largest pixel edge after rotation).
pub const DEFAULT_MAX_DIMENSION_PX: u32 = 2000;

/// Title written to the PDF /Info dictionary when none is configured.
pub const DEFAULT_TITLE: &str = "Bildwerk Document";

/// Accepted input raster types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MimeType {
    Png,
    Jpeg,
    Webp,
}

impl MimeType {
    /// MIME type string.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    /// Parse a MIME type string. Anything outside the allow-list is `None`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Infer the type from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }
}

/// Quarter-turn clockwise rotation applied to an image before layout.
///
/// Only 0, 90, 180 and 270 degrees are representable. Composition is
/// addition modulo 360.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Rotation(u16);

impl Rotation {
    pub const NONE: Rotation = Rotation(0);
    pub const CW_90: Rotation = Rotation(90);
    pub const CW_180: Rotation = Rotation(180);
    pub const CW_270: Rotation = Rotation(270);

    /// Build a rotation from a degree value. Negative and >= 360 values are
    /// normalised first; the result must be a multiple of 90.
    pub fn from_degrees(degrees: i32) -> Result<Self> {
        let normalised = degrees.rem_euclid(360);
        if normalised % 90 != 0 {
            return Err(BildwerkError::InvalidConfig(format!(
                "rotation must be a multiple of 90 degrees, got {degrees}"
            )));
        }
        Ok(Self(normalised as u16))
    }

    pub fn degrees(&self) -> u16 {
        self.0
    }

    /// One further quarter turn clockwise.
    pub fn rotate_cw(self) -> Self {
        self.compose(Self::CW_90)
    }

    pub fn compose(self, other: Rotation) -> Self {
        Self((self.0 + other.0) % 360)
    }

    /// True for 90 and 270, where the effective bounding box swaps width and
    /// height.
    pub fn swaps_axes(&self) -> bool {
        self.0 % 180 != 0
    }
}

impl TryFrom<u16> for Rotation {
    type Error = BildwerkError;

    fn try_from(degrees: u16) -> Result<Self> {
        Self::from_degrees(i32::from(degrees))
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> u16 {
        rotation.0
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// Identity of an uploaded file, used for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageIdentity {
    pub name: String,
    pub size: u64,
}

/// One user-supplied image, as accepted from the upload collaborator.
///
/// The encoded payload is shared, so cloning a `SourceImage` (for example when
/// snapshotting a batch before a run) does not copy the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    identity: ImageIdentity,
    encoded_bytes: Arc<[u8]>,
    mime_type: MimeType,
    rotation: Rotation,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, mime_type: MimeType, bytes: impl Into<Arc<[u8]>>) -> Self {
        let encoded_bytes: Arc<[u8]> = bytes.into();
        Self {
            identity: ImageIdentity {
                name: name.into(),
                size: encoded_bytes.len() as u64,
            },
            encoded_bytes,
            mime_type,
            rotation: Rotation::NONE,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// The explicit user "rotate" action: a further 90 degrees clockwise.
    pub fn rotate(&mut self) {
        self.rotation = self.rotation.rotate_cw();
    }

    pub fn identity(&self) -> &ImageIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn encoded_bytes(&self) -> &[u8] {
        &self.encoded_bytes
    }

    pub fn mime_type(&self) -> MimeType {
        self.mime_type
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }
}

/// Standard paper sizes, portrait dimensions in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl PaperSize {
    /// Dimensions in millimetres (width, height), portrait.
    pub fn dimensions_mm(&self) -> (f32, f32) {
        match self {
            Self::A3 => (297.0, 420.0),
            Self::A4 => (210.0, 297.0),
            Self::A5 => (148.0, 210.0),
            Self::Letter => (215.9, 279.4),
            Self::Legal => (215.9, 355.6),
            Self::Tabloid => (279.4, 431.8),
        }
    }

    /// Parse a named size token (case-insensitive). `custom` is not a named
    /// size and yields `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "a3" => Some(Self::A3),
            "a4" => Some(Self::A4),
            "a5" => Some(Self::A5),
            "letter" => Some(Self::Letter),
            "legal" => Some(Self::Legal),
            "tabloid" | "ledger" => Some(Self::Tabloid),
            _ => None,
        }
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "portrait" | "p" => Some(Self::Portrait),
            "landscape" | "l" => Some(Self::Landscape),
            _ => None,
        }
    }

    /// Orient a (width, height) pair: landscape puts the long edge
    /// horizontally, portrait vertically.
    pub fn apply(&self, width: f32, height: f32) -> (f32, f32) {
        match self {
            Self::Portrait if width > height => (height, width),
            Self::Landscape if height > width => (height, width),
            _ => (width, height),
        }
    }
}

/// How an image is reconciled with the page's safe area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Whole image visible, no overflow.
    #[default]
    Fit,
    /// Fill the safe area on both axes, overflowing on one. No cropping.
    Cover,
    /// Fill the safe area exactly, ignoring aspect ratio.
    Stretch,
}

impl FitMode {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "fit" | "contain" => Some(Self::Fit),
            "cover" | "fill" => Some(Self::Cover),
            "stretch" => Some(Self::Stretch),
            _ => None,
        }
    }
}

/// Frozen, validated settings for one run. Produced by
/// [`crate::config::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSettings {
    /// Page width in millimetres, orientation already applied.
    pub page_width_mm: f32,
    /// Page height in millimetres, orientation already applied.
    pub page_height_mm: f32,
    pub orientation: Orientation,
    pub margin_mm: f32,
    pub fit_mode: FitMode,
    /// JPEG quality on a 0.0–1.0 scale.
    pub jpeg_quality: f32,
    pub numbering_enabled: bool,
    pub max_dimension_px: u32,
    pub title: String,
}

impl Default for PageSettings {
    fn default() -> Self {
        let (page_width_mm, page_height_mm) = PaperSize::A4.dimensions_mm();
        Self {
            page_width_mm,
            page_height_mm,
            orientation: Orientation::Portrait,
            margin_mm: 10.0,
            fit_mode: FitMode::Fit,
            jpeg_quality: 0.9,
            numbering_enabled: false,
            max_dimension_px: DEFAULT_MAX_DIMENSION_PX,
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

/// Output of the transform engine: a rotated, capped, re-encoded raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResampledRaster {
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// JPEG bytes.
    pub encoded_data: Vec<u8>,
}

/// Where an image lands on the page, in millimetres from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlacementRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PlacementRect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// Horizontal alignment of an annotation relative to its anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Lifecycle of the page assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Events emitted while a run progresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// Emitted before page `page_index` (0-based) is processed.
    Progress { page_index: usize, page_count: usize },
    /// Emitted once the run reaches a terminal state.
    Finished(RunStatus),
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// The finalized document bytes.
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

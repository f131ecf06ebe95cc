// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments and their merge onto the settings file.

use std::path::PathBuf;

use bildwerk_core::{RawSettings, Rotation};
use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "bildwerk", about = "Assemble images into a PDF, one image per page", version)]
pub struct Cli {
    /// Input images (PNG, JPEG, WebP), in page order
    #[arg(required = true, num_args = 1..)]
    pub images: Vec<PathBuf>,

    /// Output PDF file
    #[arg(short, long)]
    pub output: PathBuf,

    /// JSON settings file; flags given here override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Paper size
    #[arg(long, value_enum)]
    pub page_size: Option<PaperArg>,

    /// Custom page width in mm (implies --page-size custom)
    #[arg(long)]
    pub width: Option<f32>,

    /// Custom page height in mm (implies --page-size custom)
    #[arg(long)]
    pub height: Option<f32>,

    /// Page orientation
    #[arg(long, value_enum)]
    pub orientation: Option<OrientationArg>,

    /// Margin in mm (uniform on all sides)
    #[arg(long)]
    pub margin: Option<f32>,

    /// JPEG quality, 0.0 to 1.0
    #[arg(long)]
    pub quality: Option<f32>,

    /// How images are scaled onto the page
    #[arg(long, value_enum)]
    pub fit: Option<FitArg>,

    /// Print "n / N" in the bottom-right corner of each page
    #[arg(long, overrides_with = "no_page_numbers")]
    pub page_numbers: bool,

    /// Leave pages unnumbered, even if the settings file asks for numbers
    #[arg(long, overrides_with = "page_numbers")]
    pub no_page_numbers: bool,

    /// Longest edge of an embedded image, in pixels
    #[arg(long)]
    pub max_dimension: Option<u32>,

    /// Rotate an input clockwise, e.g. `--rotate 2:90` (1-based, repeatable)
    #[arg(long = "rotate", value_name = "INDEX:DEGREES", value_parser = parse_rotate)]
    pub rotations: Vec<RotateArg>,

    /// Document title
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PaperArg {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrientationArg {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FitArg {
    Fit,
    #[value(alias = "fill")]
    Cover,
    Stretch,
}

/// One `--rotate` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotateArg {
    /// 0-based position among the input images.
    pub index: usize,
    pub rotation: Rotation,
}

fn parse_rotate(value: &str) -> Result<RotateArg, String> {
    let (index, degrees) = value
        .split_once(':')
        .ok_or_else(|| format!("expected INDEX:DEGREES, got '{value}'"))?;

    let index: usize = index
        .trim()
        .parse()
        .map_err(|_| format!("'{index}' is not a page index"))?;
    if index == 0 {
        return Err("page indexes start at 1".into());
    }

    let degrees: i32 = degrees
        .trim()
        .parse()
        .map_err(|_| format!("'{degrees}' is not a number of degrees"))?;
    let rotation = Rotation::from_degrees(degrees).map_err(|err| err.to_string())?;

    Ok(RotateArg {
        index: index - 1,
        rotation,
    })
}

impl PaperArg {
    fn token(self) -> &'static str {
        match self {
            Self::A3 => "a3",
            Self::A4 => "a4",
            Self::A5 => "a5",
            Self::Letter => "letter",
            Self::Legal => "legal",
            Self::Tabloid => "tabloid",
            Self::Custom => "custom",
        }
    }
}

impl OrientationArg {
    fn token(self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }
}

impl FitArg {
    fn token(self) -> &'static str {
        match self {
            Self::Fit => "fit",
            Self::Cover => "cover",
            Self::Stretch => "stretch",
        }
    }
}

impl Cli {
    /// Overlay the flags that were given onto `base`.
    pub fn apply_to(&self, mut base: RawSettings) -> RawSettings {
        if let Some(page_size) = self.page_size {
            base.page_size = page_size.token().to_string();
        } else if self.width.is_some() || self.height.is_some() {
            base.page_size = PaperArg::Custom.token().to_string();
        }
        if let Some(width) = self.width {
            base.custom_width = width.to_string();
        }
        if let Some(height) = self.height {
            base.custom_height = height.to_string();
        }
        if let Some(orientation) = self.orientation {
            base.orientation = orientation.token().to_string();
        }
        if let Some(margin) = self.margin {
            base.margin = margin;
        }
        if let Some(quality) = self.quality {
            base.quality = quality;
        }
        if let Some(fit) = self.fit {
            base.fit_mode = fit.token().to_string();
        }
        if self.page_numbers {
            base.page_numbers = true;
        } else if self.no_page_numbers {
            base.page_numbers = false;
        }
        if let Some(max_dimension) = self.max_dimension {
            base.max_dimension = max_dimension;
        }
        if let Some(title) = &self.title {
            base.title = Some(title.clone());
        }
        base
    }
}

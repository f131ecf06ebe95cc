// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transform engine — turns one `SourceImage` into a rotated, resolution-capped
// JPEG raster ready for placement. Operates on in-memory images using the
// `image` crate.

use std::io::Cursor;

use bildwerk_core::error::{BildwerkError, Result};
use bildwerk_core::types::{MimeType, ResampledRaster, Rotation, SourceImage};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgb, RgbImage};
use tracing::{debug, info, instrument, warn};

/// Produce the page raster for `image`.
///
/// The effective bounding box is the decoded size with width and height
/// swapped for 90/270 degree rotations. It is only ever scaled down, so that
/// its larger edge does not exceed `resolution_cap`. The result is JPEG at
/// `quality` (0.0–1.0). The input is not modified.
///
/// ```ignore
/// let raster = transform(&source, 2000, 0.9)?;
/// assert!(raster.pixel_width.max(raster.pixel_height) <= 2000);
/// ```
#[instrument(
    skip(image),
    fields(name = image.name(), rotation = %image.rotation(), bytes_len = image.encoded_bytes().len())
)]
pub fn transform(image: &SourceImage, resolution_cap: u32, quality: f32) -> Result<ResampledRaster> {
    let decoded = decode(image.encoded_bytes(), image.mime_type())?;
    let (width, height) = (decoded.width(), decoded.height());
    let rotation = image.rotation();

    let (eff_w, eff_h) = effective_dimensions(width, height, rotation);
    let (out_w, out_h) = capped_dimensions(eff_w, eff_h, resolution_cap);

    // Resample in the source orientation, then turn; the canvas size already
    // accounts for the swap.
    let (resample_w, resample_h) = if rotation.swaps_axes() {
        (out_h, out_w)
    } else {
        (out_w, out_h)
    };
    let resampled = if (resample_w, resample_h) == (width, height) {
        decoded
    } else {
        debug!(from_w = width, from_h = height, resample_w, resample_h, "Downscaling");
        decoded.resize_exact(resample_w, resample_h, FilterType::Lanczos3)
    };

    let rotated = rotate_quarter_turns(resampled, rotation);
    let flattened = flatten_onto_white(&rotated);
    let encoded_data = encode_jpeg(&flattened, quality)?;

    info!(
        width,
        height,
        out_w,
        out_h,
        encoded_len = encoded_data.len(),
        "Image transformed"
    );

    Ok(ResampledRaster {
        pixel_width: out_w,
        pixel_height: out_h,
        encoded_data,
    })
}

/// Bounding box of the image once rotated.
pub fn effective_dimensions(width: u32, height: u32, rotation: Rotation) -> (u32, u32) {
    if rotation.swaps_axes() {
        (height, width)
    } else {
        (width, height)
    }
}

/// Apply `scale = min(1, cap / max(w, h))`, truncating to whole pixels and
/// never going below one pixel per axis.
pub fn capped_dimensions(width: u32, height: u32, resolution_cap: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest == 0 || longest <= resolution_cap {
        return (width.max(1), height.max(1));
    }

    let scale = f64::from(resolution_cap) / f64::from(longest);
    let scaled = |edge: u32| ((f64::from(edge) * scale).floor() as u32).max(1);
    (scaled(width), scaled(height))
}

/// Decode the payload, trusting its content over the declared MIME type.
fn decode(bytes: &[u8], declared: MimeType) -> Result<DynamicImage> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| BildwerkError::Decode(format!("failed to read image: {err}")))?;

    let declared_format = image_format(declared);
    match reader.format() {
        Some(found) if found != declared_format => {
            warn!(declared = declared.mime_type(), found = ?found, "Content does not match declared type");
        }
        Some(_) => {}
        None => reader.set_format(declared_format),
    }

    let img = reader
        .decode()
        .map_err(|err| BildwerkError::Decode(format!("failed to decode image: {err}")))?;
    debug!(width = img.width(), height = img.height(), "Image decoded");
    Ok(img)
}

fn image_format(mime: MimeType) -> ImageFormat {
    match mime {
        MimeType::Png => ImageFormat::Png,
        MimeType::Jpeg => ImageFormat::Jpeg,
        MimeType::Webp => ImageFormat::WebP,
    }
}

/// Lossless clockwise rotation by the given quarter turns.
fn rotate_quarter_turns(image: DynamicImage, rotation: Rotation) -> DynamicImage {
    match rotation.degrees() {
        90 => image.rotate90(),
        180 => image.rotate180(),
        270 => image.rotate270(),
        _ => image,
    }
}

/// JPEG carries no alpha: composite translucent pixels over white paper.
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let image::Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = u16::from(a);
        let over_white = |channel: u8| -> u8 {
            ((u16::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255) as u8
        };
        Rgb([over_white(r), over_white(g), over_white(b)])
    })
}

/// Map a 0.0–1.0 quality onto the encoder's 1–100 scale.
fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

fn encode_jpeg(image: &RgbImage, quality: f32) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, jpeg_quality(quality));
    image
        .write_with_encoder(encoder)
        .map_err(|err| BildwerkError::Encode(format!("JPEG encoding failed: {err}")))?;
    Ok(buffer)
}

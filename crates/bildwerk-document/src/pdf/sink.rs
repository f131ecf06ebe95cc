// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document backend — the `PageSink` seam and its `printpdf` 0.8 implementation.
//
// printpdf 0.8 uses a data-oriented API: each page is a `PdfPage` holding a
// `Vec<Op>`, images are registered once as XObjects, and the whole document is
// serialised by `PdfDocument::save()`.

use bildwerk_core::error::{BildwerkError, Result};
use bildwerk_core::types::{PageSettings, PlacementRect, ResampledRaster, TextAlign};
use printpdf::{
    BuiltinFont, ImageCompression, ImageOptimizationOptions, Mm, Op, PdfDocument, PdfPage,
    PdfSaveOptions, PdfWarnMsg, Point, Pt, RawImage, RawImageData, RawImageFormat, TextItem,
    XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

/// Page-number font size in points.
pub const ANNOTATION_FONT_SIZE_PT: f32 = 10.0;

/// Receives pages in order and produces the final document bytes.
///
/// Placement coordinates are millimetres from the page's top-left corner.
/// `annotate_text` applies to the page most recently added; `y` is the text
/// baseline.
pub trait PageSink {
    fn begin_document(&mut self, settings: &PageSettings) -> Result<()>;

    fn add_page(
        &mut self,
        raster: &ResampledRaster,
        placement: &PlacementRect,
        page_index: usize,
        page_count: usize,
    ) -> Result<()>;

    fn annotate_text(&mut self, text: &str, x: f32, y: f32, align: TextAlign) -> Result<()>;

    fn finalize(&mut self) -> Result<Vec<u8>>;
}

/// In-progress document state, present between `begin_document` and
/// `finalize`.
struct OpenDocument {
    doc: PdfDocument,
    page_w: Mm,
    page_h: Mm,
    jpeg_quality: f32,
    pages: Vec<PdfPage>,
    /// Operations for the page currently being built.
    current: Option<Vec<Op>>,
}

impl OpenDocument {
    fn flush_current(&mut self) {
        if let Some(ops) = self.current.take() {
            self.pages.push(PdfPage::new(self.page_w, self.page_h, ops));
        }
    }
}

/// `PageSink` that writes a PDF with `printpdf`.
///
/// ```ignore
/// let mut sink = PdfSink::new();
/// let output = PageAssembler::new().run(images, &settings, &mut sink).await?;
/// std::fs::write("document.pdf", output.bytes)?;
/// ```
#[derive(Default)]
pub struct PdfSink {
    open: Option<OpenDocument>,
}

impl PdfSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn open_mut(&mut self, operation: &str) -> Result<&mut OpenDocument> {
        self.open
            .as_mut()
            .ok_or_else(|| BildwerkError::Sink(format!("{operation} called before begin_document")))
    }
}

impl PageSink for PdfSink {
    #[instrument(skip_all, fields(title = %settings.title))]
    fn begin_document(&mut self, settings: &PageSettings) -> Result<()> {
        if self.open.is_some() {
            warn!("begin_document called on an open document; discarding previous pages");
        }

        info!(
            page_width_mm = settings.page_width_mm,
            page_height_mm = settings.page_height_mm,
            "Starting PDF document"
        );
        self.open = Some(OpenDocument {
            doc: PdfDocument::new(&settings.title),
            page_w: Mm(settings.page_width_mm),
            page_h: Mm(settings.page_height_mm),
            jpeg_quality: settings.jpeg_quality,
            pages: Vec::new(),
            current: None,
        });
        Ok(())
    }

    #[instrument(skip(self, raster, placement), fields(w = raster.pixel_width, h = raster.pixel_height))]
    fn add_page(
        &mut self,
        raster: &ResampledRaster,
        placement: &PlacementRect,
        page_index: usize,
        page_count: usize,
    ) -> Result<()> {
        let open = self.open_mut("add_page")?;
        open.flush_current();

        let raw = raw_image(raster)?;
        let xobject_id = open.doc.add_image(&raw);

        // Natural size at 72 dpi is one point per pixel, so the scale factors
        // map pixels straight onto the placement size.
        let dpi: f32 = 72.0;
        let width_pt = Mm(placement.width).into_pt().0;
        let height_pt = Mm(placement.height).into_pt().0;
        let scale_x = width_pt / raster.pixel_width.max(1) as f32;
        let scale_y = height_pt / raster.pixel_height.max(1) as f32;

        // PDF user space has its origin at the bottom-left corner.
        let x_pt = Mm(placement.x).into_pt().0;
        let y_pt = Mm(open.page_h.0 - placement.y - placement.height).into_pt().0;

        open.current = Some(vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(x_pt)),
                translate_y: Some(Pt(y_pt)),
                scale_x: Some(scale_x),
                scale_y: Some(scale_y),
                dpi: Some(dpi),
                rotate: None,
            },
        }]);

        debug!(page = page_index + 1, page_count, x_pt, y_pt, scale_x, scale_y, "Image placed on page");
        Ok(())
    }

    fn annotate_text(&mut self, text: &str, x: f32, y: f32, align: TextAlign) -> Result<()> {
        let open = self.open_mut("annotate_text")?;
        let page_h = open.page_h.0;
        let ops = open
            .current
            .as_mut()
            .ok_or_else(|| BildwerkError::Sink("annotate_text called before add_page".into()))?;

        let text_width_mm = Mm::from(Pt(helvetica_width_pt(text, ANNOTATION_FONT_SIZE_PT))).0;
        let start_x = match align {
            TextAlign::Left => x,
            TextAlign::Center => x - text_width_mm / 2.0,
            TextAlign::Right => x - text_width_mm,
        };

        ops.push(Op::StartTextSection);
        ops.push(Op::SetTextCursor {
            pos: Point {
                x: Mm(start_x).into_pt(),
                y: Mm(page_h - y).into_pt(),
            },
        });
        ops.push(Op::SetFontSizeBuiltinFont {
            size: Pt(ANNOTATION_FONT_SIZE_PT),
            font: BuiltinFont::Helvetica,
        });
        ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text.to_string())],
            font: BuiltinFont::Helvetica,
        });
        ops.push(Op::EndTextSection);
        Ok(())
    }

    #[instrument(skip(self))]
    fn finalize(&mut self) -> Result<Vec<u8>> {
        let mut open = self
            .open
            .take()
            .ok_or_else(|| BildwerkError::Sink("finalize called before begin_document".into()))?;
        open.flush_current();

        if open.pages.is_empty() {
            return Err(BildwerkError::Sink("document has no pages".into()));
        }

        let page_count = open.pages.len();
        open.doc.with_pages(open.pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = open.doc.save(&save_options(open.jpeg_quality), &mut warnings);
        if !warnings.is_empty() {
            debug!(count = warnings.len(), "printpdf reported warnings");
        }

        info!(page_count, bytes = output.len(), "PDF finalized");
        Ok(output)
    }
}

/// Store every image as DCT at the run's quality, at exactly the raster's
/// pixel size. printpdf's defaults would downscale anything over 2 MB of RGB
/// and re-store it losslessly.
fn save_options(jpeg_quality: f32) -> PdfSaveOptions {
    PdfSaveOptions {
        image_optimization: Some(ImageOptimizationOptions {
            quality: Some(jpeg_quality),
            max_image_size: None,
            auto_optimize: Some(false),
            convert_to_greyscale: Some(false),
            dither_greyscale: None,
            format: Some(ImageCompression::Jpeg),
        }),
        ..PdfSaveOptions::default()
    }
}

/// Unpack the JPEG raster into RGB pixels for embedding.
fn raw_image(raster: &ResampledRaster) -> Result<RawImage> {
    let decoded = ::image::load_from_memory_with_format(&raster.encoded_data, ::image::ImageFormat::Jpeg)
        .map_err(|err| BildwerkError::Sink(format!("raster is not a readable JPEG: {err}")))?;
    let rgb = decoded.to_rgb8();
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);

    Ok(RawImage {
        pixels: RawImageData::U8(rgb.into_raw()),
        width,
        height,
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    })
}

/// Advance width of `text` in built-in Helvetica, in points.
///
/// Covers the glyphs used for page numbers exactly; anything else is
/// estimated at the width of a digit.
fn helvetica_width_pt(text: &str, font_size_pt: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|ch| match ch {
            '0'..='9' => 556,
            ' ' | '/' => 278,
            '.' | ',' => 278,
            '-' => 333,
            _ => 556,
        })
        .sum();
    units as f32 / 1000.0 * font_size_pt
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn jpeg_raster(width: u32, height: u32) -> ResampledRaster {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
        let mut encoded_data = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut encoded_data), ImageFormat::Jpeg)
            .expect("encode jpeg");
        ResampledRaster {
            pixel_width: width,
            pixel_height: height,
            encoded_data,
        }
    }

    fn placement() -> PlacementRect {
        PlacementRect {
            x: 10.0,
            y: 20.0,
            width: 190.0,
            height: 95.0,
        }
    }

    /// Width, height and filter of every image XObject in the document.
    fn embedded_images(doc: &lopdf::Document) -> Vec<(i64, i64, Vec<u8>)> {
        doc.objects
            .values()
            .filter_map(|object| {
                let dict = &object.as_stream().ok()?.dict;
                if dict.get(b"Subtype").and_then(|o| o.as_name()).ok()? != b"Image" {
                    return None;
                }
                let width = dict.get(b"Width").and_then(|o| o.as_i64()).ok()?;
                let height = dict.get(b"Height").and_then(|o| o.as_i64()).ok()?;
                let filter = dict
                    .get(b"Filter")
                    .and_then(|o| o.as_name())
                    .map(<[u8]>::to_vec)
                    .unwrap_or_default();
                Some((width, height, filter))
            })
            .collect()
    }

    fn page_operations(doc: &lopdf::Document, page_number: u32) -> Vec<lopdf::content::Operation> {
        let page_id = doc.get_pages()[&page_number];
        let content = doc.get_page_content(page_id).expect("page content");
        lopdf::content::Content::decode(&content).expect("decode content").operations
    }

    /// Every string shown with `Tj` or `TJ` on the page.
    fn shown_text(operations: &[lopdf::content::Operation]) -> Vec<String> {
        fn collect(object: &lopdf::Object, out: &mut Vec<String>) {
            match object {
                lopdf::Object::String(bytes, _) => out.push(String::from_utf8_lossy(bytes).into_owned()),
                lopdf::Object::Array(items) => items.iter().for_each(|item| collect(item, out)),
                _ => {}
            }
        }
        let mut out = Vec::new();
        for op in operations.iter().filter(|op| op.operator == "Tj" || op.operator == "TJ") {
            op.operands.iter().for_each(|operand| collect(operand, &mut out));
        }
        out
    }

    #[test]
    fn writes_one_pdf_page_per_add_page() {
        let raster = jpeg_raster(40, 20);
        let mut sink = PdfSink::new();
        sink.begin_document(&PageSettings::default()).expect("begin");
        for i in 0..3 {
            sink.add_page(&raster, &placement(), i, 3).expect("add_page");
            sink.annotate_text(&format!("{} / 3", i + 1), 200.0, 287.0, TextAlign::Right)
                .expect("annotate");
        }
        let bytes = sink.finalize().expect("finalize");

        assert!(bytes.starts_with(b"%PDF"));
        let parsed = lopdf::Document::load_mem(&bytes).expect("valid PDF");
        assert_eq!(parsed.get_pages().len(), 3);

        let images = embedded_images(&parsed);
        assert_eq!(images.len(), 3);
        for (width, height, filter) in &images {
            assert_eq!((*width, *height), (40, 20));
            assert_eq!(filter.as_slice(), b"DCTDecode");
        }

        // The image matrix maps the unit square onto the placement, flipped
        // to a bottom-left origin.
        let ops = page_operations(&parsed, 1);
        let cm = ops.iter().find(|op| op.operator == "cm").expect("image transform");
        let values: Vec<f32> = cm.operands.iter().map(|o| o.as_float().expect("number")).collect();
        let rect = placement();
        let expected = [
            Mm(rect.width).into_pt().0,
            0.0,
            0.0,
            Mm(rect.height).into_pt().0,
            Mm(rect.x).into_pt().0,
            Mm(297.0 - rect.y - rect.height).into_pt().0,
        ];
        for (got, want) in values.iter().zip(expected) {
            assert!((got - want).abs() < 0.05, "cm {values:?}, expected {expected:?}");
        }
        assert!(ops.iter().any(|op| op.operator == "Do"));

        assert!(shown_text(&ops).iter().any(|t| t.contains("1 / 3")), "{:?}", shown_text(&ops));
        assert!(shown_text(&page_operations(&parsed, 3)).iter().any(|t| t.contains("3 / 3")));
    }

    #[test]
    fn embedded_image_keeps_capped_raster_size() {
        // Well above printpdf's default 2 MB downscaling threshold as RGB.
        let raster = jpeg_raster(1000, 2000);
        let mut sink = PdfSink::new();
        sink.begin_document(&PageSettings::default()).expect("begin");
        sink.add_page(&raster, &placement(), 0, 1).expect("add_page");
        let bytes = sink.finalize().expect("finalize");

        let parsed = lopdf::Document::load_mem(&bytes).expect("valid PDF");
        assert_eq!(embedded_images(&parsed), vec![(1000, 2000, b"DCTDecode".to_vec())]);
    }

    #[test]
    fn quality_controls_embedded_size() {
        let img = RgbImage::from_fn(256, 256, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8])
        });
        let mut jpeg = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .expect("encode jpeg");
        let raster = ResampledRaster {
            pixel_width: 256,
            pixel_height: 256,
            encoded_data: jpeg,
        };

        let document_len = |jpeg_quality: f32| {
            let settings = PageSettings {
                jpeg_quality,
                ..PageSettings::default()
            };
            let mut sink = PdfSink::new();
            sink.begin_document(&settings).expect("begin");
            sink.add_page(&raster, &placement(), 0, 1).expect("add_page");
            sink.finalize().expect("finalize").len()
        };

        let low = document_len(0.1);
        let high = document_len(1.0);
        assert!(low < high, "q=0.1 gave {low} bytes, q=1.0 gave {high}");
    }

    #[test]
    fn operations_before_begin_are_rejected() {
        let mut sink = PdfSink::new();
        assert!(matches!(
            sink.add_page(&jpeg_raster(4, 4), &placement(), 0, 1),
            Err(BildwerkError::Sink(_))
        ));
        assert!(matches!(sink.finalize(), Err(BildwerkError::Sink(_))));
    }

    #[test]
    fn annotation_needs_a_page() {
        let mut sink = PdfSink::new();
        sink.begin_document(&PageSettings::default()).expect("begin");
        let err = sink.annotate_text("1 / 1", 200.0, 287.0, TextAlign::Right).unwrap_err();
        assert!(matches!(err, BildwerkError::Sink(_)));
    }

    #[test]
    fn finalize_consumes_the_document() {
        let mut sink = PdfSink::new();
        sink.begin_document(&PageSettings::default()).expect("begin");
        sink.add_page(&jpeg_raster(8, 8), &placement(), 0, 1).expect("add_page");
        sink.finalize().expect("first finalize");
        assert!(sink.finalize().is_err());
    }

    #[test]
    fn empty_document_is_rejected() {
        let mut sink = PdfSink::new();
        sink.begin_document(&PageSettings::default()).expect("begin");
        assert!(matches!(sink.finalize(), Err(BildwerkError::Sink(_))));
    }

    #[test]
    fn non_jpeg_raster_is_a_sink_error() {
        let mut sink = PdfSink::new();
        sink.begin_document(&PageSettings::default()).expect("begin");
        let bogus = ResampledRaster {
            pixel_width: 2,
            pixel_height: 2,
            encoded_data: vec![1, 2, 3],
        };
        assert!(matches!(sink.add_page(&bogus, &placement(), 0, 1), Err(BildwerkError::Sink(_))));
    }

    #[test]
    fn page_number_width_uses_helvetica_metrics() {
        // "12 / 34": four digits, two spaces, one slash.
        let width = helvetica_width_pt("12 / 34", 10.0);
        let expected = (4.0 * 556.0 + 3.0 * 278.0) / 1000.0 * 10.0;
        assert!((width - expected).abs() < 1e-4);
    }
}

//! `genpdf` integration: image decoding, font-cache text measurement and the page canvas element.
//!
//! [`CanvasElement`] replays a [`Canvas`] laid out in millimetres onto one PDF page.  `genpdf` has
//! no absolute-positioning primitives of its own, so every instruction is drawn relative to the
//! page area handed to the element.

use std::path::Path;

use image::GenericImageView;

use genpdf::elements::Image;
use genpdf::error::{Context as _, Error};
use genpdf::fonts::FontCache;
use genpdf::style::{Color, Style};
use genpdf::{render, Alignment, Element, Mm, Position, RenderResult, Scale, Size};

use crate::canvas::{Canvas, DrawOp, Point, Rect};
use crate::layout::TextMeasure;
use crate::model::ImageSource;
use crate::richtext::TextStyle;

const DEFAULT_IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;
/// Spacing of the strokes used to fill rectangles; slightly below the default line width.
const FILL_STROKE_STEP_MM: f64 = 0.3;

pub(crate) fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

pub(crate) fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

fn estimated_image_size(image: &image::DynamicImage, dpi: f64) -> Size {
    let (px_width, px_height) = image.dimensions();
    let width_mm = MM_PER_INCH * (px_width as f64) / dpi;
    let height_mm = MM_PER_INCH * (px_height as f64) / dpi;
    Size::new(mm_from_f64(width_mm), mm_from_f64(height_mm))
}

/// Loads an image from in-memory bytes using the [`image`] crate with descriptive errors.
pub fn decode_image_from_bytes(bytes: impl AsRef<[u8]>) -> Result<image::DynamicImage, Error> {
    image::load_from_memory(bytes.as_ref()).context("Failed to decode image from provided bytes")
}

/// Loads an image from the given path using the [`image`] crate with descriptive errors.
pub fn decode_image_from_path(path: impl AsRef<Path>) -> Result<image::DynamicImage, Error> {
    let path = path.as_ref();
    let reader = image::io::Reader::open(path)
        .with_context(|| format!("Failed to open image file {}", path.display()))?;
    reader
        .with_guessed_format()
        .context("Unable to determine image format")?
        .decode()
        .with_context(|| format!("Failed to decode image file {}", path.display()))
}

/// Turns a work's image handle into a decoded raster.
///
/// Decoding is the one point where rendering waits on outside work; implementations block until
/// the image is ready or fail.
pub trait ImageDecoder {
    /// Decodes the image referenced by `source`.
    fn decode(&self, source: &ImageSource) -> Result<image::DynamicImage, Error>;
}

/// Default decoder reading [`ImageSource`] bytes or files with the [`image`] crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct SourceDecoder;

impl ImageDecoder for SourceDecoder {
    fn decode(&self, source: &ImageSource) -> Result<image::DynamicImage, Error> {
        match source {
            ImageSource::Bytes(bytes) => decode_image_from_bytes(bytes),
            ImageSource::Path(path) => decode_image_from_path(path),
        }
    }
}

/// [`TextMeasure`] backed by the fonts loaded into a `genpdf` document; widths are millimetres.
pub struct FontCacheMeasure<'a> {
    font_cache: &'a FontCache,
}

impl<'a> FontCacheMeasure<'a> {
    /// Creates a measure over the given font cache.
    pub fn new(font_cache: &'a FontCache) -> Self {
        Self { font_cache }
    }
}

impl TextMeasure for FontCacheMeasure<'_> {
    fn text_width(&self, text: &str, style: &TextStyle) -> f64 {
        mm_to_f64(style.to_style().str_width(self.font_cache, text))
    }
}

/// An element that paints one fixed-size [`Canvas`] onto the current page.
///
/// The element consumes no vertical space, so a following page break starts the next page.
pub struct CanvasElement {
    canvas: Canvas,
}

impl CanvasElement {
    /// Wraps a canvas laid out in millimetres.
    pub fn new(canvas: Canvas) -> Self {
        Self { canvas }
    }

    fn fill_rect(area: &render::Area<'_>, rect: Rect, color: Color) {
        let style = Style::new().with_color(color);
        let mut y = rect.y;
        while y <= rect.bottom() {
            area.draw_line(
                vec![
                    Position::new(mm_from_f64(rect.x), mm_from_f64(y)),
                    Position::new(mm_from_f64(rect.right()), mm_from_f64(y)),
                ],
                style,
            );
            y += FILL_STROKE_STEP_MM;
        }
    }

    fn line(area: &render::Area<'_>, from: Point, to: Point, color: Color) {
        area.draw_line(
            vec![
                Position::new(mm_from_f64(from.x), mm_from_f64(from.y)),
                Position::new(mm_from_f64(to.x), mm_from_f64(to.y)),
            ],
            Style::new().with_color(color),
        );
    }

    fn text(
        context: &genpdf::Context,
        area: &render::Area<'_>,
        origin: Point,
        text: &str,
        style: Style,
        left_edge: f64,
    ) -> Result<(), Error> {
        // Text sections are positioned by their top edge; the canvas stores baselines.
        let glyph_height = style.font(&context.font_cache).glyph_height(style.font_size());
        let top = origin.y - mm_to_f64(glyph_height);
        let position = Position::new(mm_from_f64(left_edge), mm_from_f64(top));
        if let Some(mut section) = area.text_section(&context.font_cache, position, style) {
            section.print_str(text, style)?;
            Ok(())
        } else {
            Err(Error::new(
                format!("Text '{}' does not fit on the page", text),
                genpdf::error::ErrorKind::PageSizeExceeded,
            ))
        }
    }

    fn image(
        context: &genpdf::Context,
        area: &render::Area<'_>,
        rect: Rect,
        image: &image::DynamicImage,
        style: Style,
    ) -> Result<(), Error> {
        // PDF images carry no alpha channel.
        let flattened = image::DynamicImage::ImageRgb8(image.to_rgb8());
        let natural = estimated_image_size(&flattened, DEFAULT_IMAGE_DPI);
        let natural_width = mm_to_f64(natural.width);
        let natural_height = mm_to_f64(natural.height);
        if natural_width <= f64::EPSILON || natural_height <= f64::EPSILON {
            return Ok(());
        }

        let mut element = Image::from_dynamic_image(flattened)?;
        element.set_alignment(Alignment::Left);
        element.set_scale(Scale::new(
            rect.width / natural_width,
            rect.height / natural_height,
        ));

        let mut image_area = area.clone();
        image_area.add_offset(Position::new(mm_from_f64(rect.x), mm_from_f64(rect.y)));
        element.render(context, image_area, style)?;
        Ok(())
    }
}

impl Element for CanvasElement {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        for op in self.canvas.ops() {
            match op {
                DrawOp::FillRect { rect, color } => Self::fill_rect(&area, *rect, *color),
                DrawOp::Line { from, to, color } => Self::line(&area, *from, *to, *color),
                DrawOp::Text {
                    origin,
                    text,
                    style: text_style,
                    align,
                    ..
                } => {
                    let text_style = style.and(text_style.to_style());
                    let width = mm_to_f64(text_style.str_width(&context.font_cache, text));
                    let left_edge = align.left_edge(origin.x, width);
                    Self::text(context, &area, *origin, text, text_style, left_edge)?;
                }
                // Shadows are a raster effect; the printed page shows the plain photo.
                DrawOp::Image { rect, image, .. } => {
                    Self::image(context, &area, *rect, image, style)?
                }
            }
        }

        Ok(RenderResult::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BookletWriter;
    use crate::canvas::{HorizontalAlignment, Page, PageKind};
    use genpdf::fonts::{FontData, FontFamily};
    use image::{DynamicImage, ImageBuffer, Rgb};
    use std::io::Cursor;
    use std::path::PathBuf;

    /// Environment variable naming a TrueType file to paint test pages with.
    const TEST_FONT_ENV: &str = "STUDY_BOOKLET_TEST_FONT";

    const SYSTEM_FONTS: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];

    /// Builds a family from a single face, preferring the configured or bundled fonts.
    fn test_font_family() -> Option<FontFamily<FontData>> {
        let configured = std::env::var_os(TEST_FONT_ENV).map(PathBuf::from);
        let bundled = crate::fonts::resolve_font_files()
            .ok()
            .map(|files| files.path(crate::fonts::Face::Regular).to_path_buf());
        let path = configured
            .into_iter()
            .chain(bundled)
            .chain(SYSTEM_FONTS.iter().map(PathBuf::from))
            .find(|path| path.is_file())?;
        let face = FontData::load(&path, None).ok()?;
        Some(FontFamily {
            regular: face.clone(),
            bold: face.clone(),
            italic: face.clone(),
            bold_italic: face,
        })
    }

    fn page(canvas: Canvas) -> Page {
        Page {
            kind: PageKind::Cover,
            heading: None,
            canvas,
        }
    }

    #[test]
    fn canvas_pages_are_written_to_pdf() {
        let Some(family) = test_font_family() else {
            eprintln!("Skipping canvas_pages_are_written_to_pdf: set {TEST_FONT_ENV}");
            return;
        };
        let photo = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(30, 20, Rgb([10, 120, 90])));
        let mut canvas = Canvas::new(210.0, 297.0);
        canvas.fill_rect(Rect::new(0.0, 0.0, 210.0, 12.0), Color::Rgb(94, 45, 145));
        canvas.line(Point::new(20.0, 40.0), Point::new(190.0, 40.0), Color::Rgb(0, 0, 0));
        canvas.text(
            Point::new(105.0, 30.0),
            "Ikebana",
            TextStyle::new(18).bold(),
            HorizontalAlignment::Center,
        );
        canvas.image(Rect::new(30.0, 60.0, 150.0, 100.0), photo, None);

        let second = Canvas::new(210.0, 297.0);
        let bytes = BookletWriter::new(family)
            .write(vec![page(canvas), page(second)])
            .expect("canvas pages render");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn text_below_the_page_is_an_error() {
        let Some(family) = test_font_family() else {
            eprintln!("Skipping text_below_the_page_is_an_error: set {TEST_FONT_ENV}");
            return;
        };
        let mut canvas = Canvas::new(210.0, 297.0);
        canvas.text(
            Point::new(20.0, 400.0),
            "Overflow",
            TextStyle::new(12),
            HorizontalAlignment::Left,
        );
        assert!(BookletWriter::new(family).write(vec![page(canvas)]).is_err());
    }

    #[test]
    fn font_cache_measure_grows_with_text() {
        let Some(family) = test_font_family() else {
            return;
        };
        let writer = BookletWriter::new(family);
        let measure = writer.measure();
        let style = TextStyle::new(12);
        let short = measure.text_width("Moss", &style);
        assert!(short > 0.0);
        assert!(measure.text_width("Moss and stone", &style) > short);
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let buffer = ImageBuffer::from_pixel(width, height, Rgb([120u8, 80, 200]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(buffer)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .expect("encode png");
        bytes
    }

    #[test]
    fn source_decoder_reads_bytes() {
        let decoded = SourceDecoder
            .decode(&ImageSource::from_bytes(png_bytes(6, 4)))
            .expect("decode succeeds");
        assert_eq!(decoded.dimensions(), (6, 4));
    }

    #[test]
    fn source_decoder_reports_garbage() {
        let err = SourceDecoder
            .decode(&ImageSource::from_bytes(vec![0, 1, 2, 3]))
            .unwrap_err();
        assert!(err.to_string().contains("decode"));
    }

    #[test]
    fn source_decoder_reports_missing_files() {
        assert!(SourceDecoder
            .decode(&ImageSource::from_path("/__missing__/photo.png"))
            .is_err());
    }

    #[test]
    fn image_size_follows_dpi() {
        let image = DynamicImage::ImageRgb8(ImageBuffer::new(300, 600));
        let size = estimated_image_size(&image, DEFAULT_IMAGE_DPI);
        assert!((mm_to_f64(size.width) - 25.4).abs() < 1e-9);
        assert!((mm_to_f64(size.height) - 50.8).abs() < 1e-9);
    }
}

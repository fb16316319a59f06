//! Paints pixel canvases into PNG images.
//!
//! A canvas is translated into an SVG scene and rasterized with `resvg` onto a `tiny-skia`
//! pixmap.  Text is shaped from the same font files the PDF writer loads; `rusttype` measures it
//! for wrapping, since it is the engine `genpdf` itself uses for font metrics.

use std::fmt::{self, Write as _};
use std::io::Cursor;
use std::sync::Arc;

use base64::prelude::*;
use genpdf::error::{Error, ErrorKind};
use genpdf::style::Color;
use image::{DynamicImage, ImageOutputFormat};
use log::debug;
use png::{BitDepth, ColorType, Compression, Encoder, FilterType};
use rusttype::{point, Font, Scale};
use usvg::fontdb;

use crate::canvas::{Canvas, DrawOp, HorizontalAlignment, Rect, Shadow};
use crate::fonts::{Face, FontFiles};
use crate::layout::TextMeasure;
use crate::richtext::{rgba, TextStyle};

/// The four faces of a family, parsed for measuring and registered for drawing.
pub struct RasterFonts {
    regular: Font<'static>,
    bold: Font<'static>,
    italic: Font<'static>,
    bold_italic: Font<'static>,
    database: Arc<fontdb::Database>,
    family: String,
}

impl RasterFonts {
    /// Parses every face of `files`.
    pub fn load(files: &FontFiles) -> Result<Self, Error> {
        let mut database = fontdb::Database::new();
        let mut parse = |face: Face| -> Result<Font<'static>, Error> {
            let data = files.read(face)?;
            let font = Font::try_from_vec(data.clone()).ok_or_else(|| {
                Error::new(
                    format!("Failed to parse font file {}", files.path(face).display()),
                    ErrorKind::InvalidFont,
                )
            })?;
            database.load_font_data(data);
            Ok(font)
        };
        let regular = parse(Face::Regular)?;
        let bold = parse(Face::Bold)?;
        let italic = parse(Face::Italic)?;
        let bold_italic = parse(Face::BoldItalic)?;

        // The regular face is loaded first, so its family names the whole set.
        let family = database
            .faces()
            .next()
            .and_then(|face| face.families.first())
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| files.family().to_string());
        database.set_sans_serif_family(family.clone());

        Ok(Self {
            regular,
            bold,
            italic,
            bold_italic,
            database: Arc::new(database),
            family,
        })
    }

    /// Loads the default family resolved by [`crate::fonts::resolve_font_files`].
    pub fn load_default() -> Result<Self, Error> {
        Self::load(&crate::fonts::resolve_font_files()?)
    }

    /// Family name the scene refers to.
    pub fn family(&self) -> &str {
        &self.family
    }

    fn face(&self, style: &TextStyle) -> &Font<'static> {
        match Face::select(style.is_bold(), style.is_italic()) {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
            Face::Italic => &self.italic,
            Face::BoldItalic => &self.bold_italic,
        }
    }
}

/// Widths in pixels, treating the style size as the pixel height of the em square.
impl TextMeasure for RasterFonts {
    fn text_width(&self, text: &str, style: &TextStyle) -> f64 {
        let scale = Scale::uniform(f32::from(style.size()));
        let font = self.face(style);
        font.layout(text, scale, point(0.0, 0.0))
            .last()
            .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
            .map(f64::from)
            .unwrap_or(0.0)
    }
}

/// Failure while turning a canvas into PNG bytes.
#[derive(Debug)]
pub enum RasterError {
    /// An embedded image could not be re-encoded for the scene.
    Image(image::ImageError),
    /// The generated scene was rejected by the SVG parser.
    Scene(usvg::Error),
    /// The pixmap could not be allocated.
    Pixmap { width: u32, height: u32 },
    /// The rendered pixels could not be written as PNG.
    Png(png::EncodingError),
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(err) => write!(f, "failed to embed image: {err}"),
            Self::Scene(err) => write!(f, "failed to parse the card scene: {err}"),
            Self::Pixmap { width, height } => {
                write!(f, "failed to allocate a {width}x{height} pixmap")
            }
            Self::Png(err) => write!(f, "failed to encode PNG: {err}"),
        }
    }
}

impl std::error::Error for RasterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Image(err) => Some(err),
            Self::Scene(err) => Some(err),
            Self::Png(err) => Some(err),
            Self::Pixmap { .. } => None,
        }
    }
}

impl From<image::ImageError> for RasterError {
    fn from(err: image::ImageError) -> Self {
        Self::Image(err)
    }
}

impl From<usvg::Error> for RasterError {
    fn from(err: usvg::Error) -> Self {
        Self::Scene(err)
    }
}

impl From<png::EncodingError> for RasterError {
    fn from(err: png::EncodingError) -> Self {
        Self::Png(err)
    }
}

/// Paints a canvas laid out in pixels over an opaque white background and encodes it as PNG.
pub fn render_png(canvas: &Canvas, fonts: &RasterFonts) -> Result<Vec<u8>, RasterError> {
    let pixmap = rasterize(canvas, fonts.family(), fonts.database.clone())?;
    encode_png(&pixmap)
}

/// Builds the SVG scene of a canvas, drawing text in `family`.
pub fn scene(canvas: &Canvas, family: &str) -> Result<String, RasterError> {
    let mut svg = String::new();
    // Writing into a String cannot fail.
    let _ = write!(
        svg,
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink""#,
            r#" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        ),
        w = canvas.width(),
        h = canvas.height(),
    );

    let mut shadows = 0usize;
    for op in canvas.ops() {
        match op {
            DrawOp::FillRect { rect, color } => {
                let _ = write!(
                    svg,
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
                    rect.x,
                    rect.y,
                    rect.width,
                    rect.height,
                    svg_color(*color)
                );
            }
            DrawOp::Line { from, to, color } => {
                let _ = write!(
                    svg,
                    r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="1"/>"#,
                    from.x,
                    from.y,
                    to.x,
                    to.y,
                    svg_color(*color)
                );
            }
            DrawOp::Text {
                origin,
                text,
                style,
                align,
                alpha,
            } => {
                let anchor = match align {
                    HorizontalAlignment::Left => "start",
                    HorizontalAlignment::Center => "middle",
                    HorizontalAlignment::Right => "end",
                };
                let _ = write!(
                    svg,
                    concat!(
                        r#"<text x="{}" y="{}" font-family="{}" font-size="{}""#,
                        r#" font-weight="{}" font-style="{}" text-anchor="{}""#,
                        r#" fill="{}" fill-opacity="{}" xml:space="preserve">{}</text>"#,
                    ),
                    origin.x,
                    origin.y,
                    svg_escape(family),
                    style.size(),
                    if style.is_bold() { "bold" } else { "normal" },
                    if style.is_italic() { "italic" } else { "normal" },
                    anchor,
                    svg_color(style.color()),
                    f64::from(*alpha) / 255.0,
                    svg_escape(text)
                );
            }
            DrawOp::Image {
                rect,
                image,
                shadow,
            } => {
                let filter = match shadow {
                    Some(shadow) => {
                        shadows += 1;
                        let id = format!("shadow{shadows}");
                        write_shadow_filter(&mut svg, &id, *rect, shadow);
                        format!(r#" filter="url(#{id})""#)
                    }
                    None => String::new(),
                };
                let _ = write!(
                    svg,
                    concat!(
                        r#"<image x="{}" y="{}" width="{}" height="{}""#,
                        r#" preserveAspectRatio="none"{} xlink:href="data:image/png;base64,{}"/>"#,
                    ),
                    rect.x,
                    rect.y,
                    rect.width,
                    rect.height,
                    filter,
                    BASE64_STANDARD.encode(png_bytes(image)?)
                );
            }
        }
    }

    svg.push_str("</svg>");
    Ok(svg)
}

fn rasterize(
    canvas: &Canvas,
    family: &str,
    database: Arc<fontdb::Database>,
) -> Result<tiny_skia::Pixmap, RasterError> {
    let width = canvas.width().round().max(1.0) as u32;
    let height = canvas.height().round().max(1.0) as u32;
    let svg = scene(canvas, family)?;

    let mut options = usvg::Options::default();
    options.fontdb = database;
    let tree = usvg::Tree::from_str(&svg, &options)?;

    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(RasterError::Pixmap { width, height })?;
    pixmap.fill(tiny_skia::Color::WHITE);
    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

    debug!("painted {}x{} canvas with {} ops", width, height, canvas.ops().len());
    Ok(pixmap)
}

/// Encodes the pixmap without timestamps so identical canvases give identical bytes.
fn encode_png(pixmap: &tiny_skia::Pixmap) -> Result<Vec<u8>, RasterError> {
    let mut bytes = Vec::new();
    {
        let mut encoder = Encoder::new(&mut bytes, pixmap.width(), pixmap.height());
        encoder.set_color(ColorType::Rgba);
        encoder.set_depth(BitDepth::Eight);
        encoder.set_filter(FilterType::NoFilter);
        encoder.set_compression(Compression::Default);
        let mut writer = encoder.write_header()?;
        // The background is opaque, so premultiplied pixels equal straight ones.
        writer.write_image_data(pixmap.data())?;
        writer.finish()?;
    }
    Ok(bytes)
}

fn write_shadow_filter(svg: &mut String, id: &str, rect: Rect, shadow: &Shadow) {
    let reach = shadow.blur * 2.0 + shadow.offset_x.abs().max(shadow.offset_y.abs());
    let _ = write!(
        svg,
        concat!(
            r#"<defs><filter id="{}" filterUnits="userSpaceOnUse""#,
            r#" x="{}" y="{}" width="{}" height="{}">"#,
            r#"<feDropShadow dx="{}" dy="{}" stdDeviation="{}""#,
            r#" flood-color="{}" flood-opacity="{}"/></filter></defs>"#,
        ),
        id,
        rect.x - reach,
        rect.y - reach,
        rect.width + reach * 2.0,
        rect.height + reach * 2.0,
        shadow.offset_x,
        shadow.offset_y,
        // Blur radius follows the CSS convention of twice the standard deviation.
        shadow.blur / 2.0,
        svg_color(shadow.color),
        f64::from(shadow.alpha) / 255.0
    );
}

fn png_bytes(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
    Ok(bytes)
}

fn svg_color(color: Color) -> String {
    let [r, g, b, _] = rgba(color, u8::MAX);
    format!("rgb({r},{g},{b})")
}

fn svg_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Point;
    use image::{GenericImageView, ImageBuffer, Rgb};

    fn pixel(pixmap: &tiny_skia::Pixmap, x: u32, y: u32) -> [u8; 3] {
        let color = pixmap.pixel(x, y).expect("pixel inside the pixmap");
        [color.red(), color.green(), color.blue()]
    }

    #[test]
    fn scene_anchors_text_at_its_baseline() {
        let mut canvas = Canvas::new(200.0, 60.0);
        canvas.text_with_alpha(
            Point::new(100.0, 40.0),
            "Moss & <Stone>",
            TextStyle::new(24).bold(),
            HorizontalAlignment::Center,
            153,
        );
        let svg = scene(&canvas, "Card Sans").unwrap();
        assert!(svg.contains(r#"x="100" y="40""#));
        assert!(svg.contains(r#"font-family="Card Sans""#));
        assert!(svg.contains(r#"font-weight="bold""#));
        assert!(svg.contains(r#"text-anchor="middle""#));
        assert!(svg.contains(r#"fill-opacity="0.6""#));
        assert!(svg.contains("Moss &amp; &lt;Stone&gt;"));
    }

    #[test]
    fn shapes_images_and_shadows_are_painted() {
        let mut canvas = Canvas::new(100.0, 100.0);
        canvas.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Color::Rgb(255, 0, 0));
        canvas.line(
            Point::new(0.0, 95.5),
            Point::new(100.0, 95.5),
            Color::Rgb(0, 0, 0),
        );
        let photo = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(4, 2, Rgb([0, 0, 255])));
        let shadow = Shadow {
            color: Color::Rgb(0, 0, 0),
            alpha: 200,
            blur: 4.0,
            offset_x: 0.0,
            offset_y: 10.0,
        };
        canvas.image(Rect::new(20.0, 20.0, 40.0, 40.0), photo, Some(shadow));

        let pixmap = rasterize(&canvas, "unused", Arc::new(fontdb::Database::new())).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (100, 100));
        assert_eq!(pixel(&pixmap, 5, 5), [255, 0, 0]);
        let [r, g, b] = pixel(&pixmap, 40, 40);
        assert!(r < 40 && g < 40 && b > 215, "photo stretched into its rect");
        let [r, ..] = pixel(&pixmap, 40, 65);
        assert!(r < 128, "shadow falls below the photo");
        let [r, ..] = pixel(&pixmap, 50, 95);
        assert!(r < 200, "line crosses the canvas");
        assert_eq!(pixel(&pixmap, 95, 5), [255, 255, 255]);
    }

    #[test]
    fn pixmaps_encode_as_png() {
        let canvas = Canvas::new(30.0, 20.0);
        let pixmap = rasterize(&canvas, "unused", Arc::new(fontdb::Database::new())).unwrap();
        let png = encode_png(&pixmap).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.dimensions(), (30, 20));
        assert_eq!(encode_png(&pixmap).unwrap(), png);
    }

    #[test]
    fn painting_with_fonts_when_available() {
        let Ok(fonts) = RasterFonts::load_default() else {
            return;
        };
        let mut canvas = Canvas::new(200.0, 60.0);
        canvas.text(
            Point::new(100.0, 40.0),
            "Ikebana",
            TextStyle::new(24).bold(),
            HorizontalAlignment::Center,
        );
        let png = render_png(&canvas, &fonts).unwrap();
        let painted = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(painted.dimensions(), (200, 60));
        assert!(painted.pixels().any(|pixel| pixel[0] < 128));
        assert!(fonts.text_width("Ikebana", &TextStyle::new(24)) > 0.0);
    }
}

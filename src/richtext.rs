//! Text styles shared by the document and raster painters.
//!
//! A [`TextStyle`] carries the subset of styling the artifacts use (size, weight, slant and
//! color).  It converts into a [`genpdf::style::Style`] for the PDF writer and into plain RGBA
//! channels for the raster writer, so both painters draw the same canvas the same way.

use genpdf::style::{Color, Style};

/// Inline text attributes for a single line of text.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    size: u8,
    bold: bool,
    italic: bool,
    color: Color,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 12,
            bold: false,
            italic: false,
            color: Color::Rgb(0, 0, 0),
        }
    }
}

impl TextStyle {
    /// Creates a regular black style with the given font size.
    ///
    /// The size is interpreted in points by the PDF writer and in pixels by the raster writer.
    pub fn new(size: u8) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Returns the font size.
    pub fn size(&self) -> u8 {
        self.size
    }

    /// Returns whether the text is set in bold.
    pub fn is_bold(&self) -> bool {
        self.bold
    }

    /// Returns whether the text is set in italic.
    pub fn is_italic(&self) -> bool {
        self.italic
    }

    /// Returns the text color.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Convenience shorthand that marks the style as bold.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Convenience shorthand that marks the style as italic.
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    /// Sets the color and returns the updated style.
    pub fn colored(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Builds the [`Style`] used by `genpdf`.
    pub fn to_style(&self) -> Style {
        let mut style = Style::new().with_font_size(self.size).with_color(self.color);
        if self.bold {
            style.set_bold();
        }
        if self.italic {
            style.set_italic();
        }
        style
    }
}

/// Converts a `genpdf` color into RGBA channels with the given opacity.
pub fn rgba(color: Color, alpha: u8) -> [u8; 4] {
    match color {
        Color::Rgb(r, g, b) => [r, g, b, alpha],
        Color::Greyscale(v) => [v, v, v, alpha],
        Color::Cmyk(c, m, y, k) => {
            let channel = |value: u8| {
                let value = f64::from(value) / 255.0;
                let key = f64::from(k) / 255.0;
                (255.0 * (1.0 - value) * (1.0 - key)).round() as u8
            };
            [channel(c), channel(m), channel(y), alpha]
        }
    }
}

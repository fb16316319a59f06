//! Fixed-size drawing surfaces produced by the renderers.
//!
//! A [`Canvas`] is an ordered list of drawing instructions bound to a width and height.  The
//! renderers decide every coordinate up front; the painters in [`crate::elements`] (PDF) and
//! [`crate::raster`] (PNG) only replay the instructions.  Coordinates grow right and down from the
//! top-left corner; the unit is whatever the producing renderer uses (millimetres for booklet
//! pages, pixels for share cards).

use std::fmt;

use genpdf::style::Color;
use image::{DynamicImage, GenericImageView};

use crate::richtext::TextStyle;

/// Horizontal anchoring of a text instruction relative to its x coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalAlignment {
    /// Text starts at x.
    #[default]
    Left,
    /// Text is centred on x.
    Center,
    /// Text ends at x.
    Right,
}

impl HorizontalAlignment {
    /// Returns the left edge of a run of `width` anchored at `x`.
    pub fn left_edge(self, x: f64, width: f64) -> f64 {
        match self {
            HorizontalAlignment::Left => x,
            HorizontalAlignment::Center => x - width / 2.0,
            HorizontalAlignment::Right => x - width,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Whether `other` lies entirely inside this rectangle, allowing for rounding error.
    pub fn contains(&self, other: &Rect) -> bool {
        const EPSILON: f64 = 1e-6;
        other.x >= self.x - EPSILON
            && other.y >= self.y - EPSILON
            && other.right() <= self.right() + EPSILON
            && other.bottom() <= self.bottom() + EPSILON
    }
}

/// Soft shadow painted underneath an image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shadow {
    pub color: Color,
    /// Opacity in `0..=255`.
    pub alpha: u8,
    /// Blur radius in canvas units.
    pub blur: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// A single drawing instruction.
#[derive(Clone)]
pub enum DrawOp {
    /// Solid rectangle.
    FillRect { rect: Rect, color: Color },
    /// Straight line segment.
    Line { from: Point, to: Point, color: Color },
    /// One line of text whose baseline starts at `origin`, anchored by `align`.
    Text {
        origin: Point,
        text: String,
        style: TextStyle,
        align: HorizontalAlignment,
        /// Opacity in `0..=255`.
        alpha: u8,
    },
    /// Decoded image stretched into `rect`.
    Image {
        rect: Rect,
        image: DynamicImage,
        shadow: Option<Shadow>,
    },
}

impl fmt::Debug for DrawOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawOp::FillRect { rect, color } => f
                .debug_struct("FillRect")
                .field("rect", rect)
                .field("color", color)
                .finish(),
            DrawOp::Line { from, to, color } => f
                .debug_struct("Line")
                .field("from", from)
                .field("to", to)
                .field("color", color)
                .finish(),
            DrawOp::Text {
                origin,
                text,
                style,
                align,
                alpha,
            } => f
                .debug_struct("Text")
                .field("origin", origin)
                .field("text", text)
                .field("style", style)
                .field("align", align)
                .field("alpha", alpha)
                .finish(),
            DrawOp::Image {
                rect,
                image,
                shadow,
            } => f
                .debug_struct("Image")
                .field("rect", rect)
                .field("pixels", &image.dimensions())
                .field("shadow", shadow)
                .finish(),
        }
    }
}

/// A fixed-size surface with its drawing instructions in paint order.
#[derive(Clone, Debug)]
pub struct Canvas {
    width: f64,
    height: f64,
    ops: Vec<DrawOp>,
}

impl Canvas {
    /// Creates an empty canvas.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Returns the canvas bounds as a rectangle at the origin.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// Returns the drawing instructions in paint order.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ops.push(DrawOp::FillRect { rect, color });
    }

    pub fn line(&mut self, from: Point, to: Point, color: Color) {
        self.ops.push(DrawOp::Line { from, to, color });
    }

    pub fn text(
        &mut self,
        origin: Point,
        text: impl Into<String>,
        style: TextStyle,
        align: HorizontalAlignment,
    ) {
        self.text_with_alpha(origin, text, style, align, u8::MAX);
    }

    pub fn text_with_alpha(
        &mut self,
        origin: Point,
        text: impl Into<String>,
        style: TextStyle,
        align: HorizontalAlignment,
        alpha: u8,
    ) {
        self.ops.push(DrawOp::Text {
            origin,
            text: text.into(),
            style,
            align,
            alpha,
        });
    }

    pub fn image(&mut self, rect: Rect, image: DynamicImage, shadow: Option<Shadow>) {
        self.ops.push(DrawOp::Image {
            rect,
            image,
            shadow,
        });
    }

    /// Iterates over the text instructions as `(origin, text)` pairs.
    pub fn texts(&self) -> impl Iterator<Item = (Point, &str)> + '_ {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { origin, text, .. } => Some((*origin, text.as_str())),
            _ => None,
        })
    }

    /// Iterates over the destination rectangles of image instructions.
    pub fn image_rects(&self) -> impl Iterator<Item = Rect> + '_ {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Image { rect, .. } => Some(*rect),
            _ => None,
        })
    }
}

/// Role of a booklet page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageKind {
    /// Title page; not numbered.
    Cover,
    /// One curriculum item; numbered from 1 across content pages.
    Content { number: usize },
}

/// One booklet page.
#[derive(Clone, Debug)]
pub struct Page {
    pub kind: PageKind,
    /// Curriculum title used for outline entries; `None` on the cover.
    pub heading: Option<String>,
    pub canvas: Canvas,
}

//! Document assembly for booklets.
//!
//! [`BookletWriter`] owns one `genpdf::Document` for the duration of a render: pages are laid out
//! against the document's font cache, painted through [`CanvasElement`]s separated by page breaks,
//! and the finished document is written to memory in one step.

use genpdf::elements::PageBreak;
use genpdf::error::{Error, ErrorKind};
use genpdf::fonts::{FontCache, FontData, FontFamily};
use genpdf::style;
use genpdf::{self, PageDecorator, PaperSize};
use log::debug;

use crate::canvas::Page;
use crate::elements::{CanvasElement, FontCacheMeasure};

/// A4 portrait width in millimetres.
pub const A4_WIDTH_MM: f64 = 210.0;
/// A4 portrait height in millimetres.
pub const A4_HEIGHT_MM: f64 = 297.0;

/// Builder for A4 booklet documents; see [`A4_WIDTH_MM`] and [`A4_HEIGHT_MM`].
pub struct BookletWriter {
    document: genpdf::Document,
}

impl BookletWriter {
    /// Creates an A4 document using `font_family` as its default font.
    pub fn new(font_family: FontFamily<FontData>) -> Self {
        let mut document = genpdf::Document::new(font_family);
        document.set_paper_size(PaperSize::A4);
        document.set_page_decorator(CanvasPageDecorator::default());
        Self { document }
    }

    /// Sets the document title stored in the PDF metadata.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.document.set_title(title);
        self
    }

    /// Returns the font cache that layout measurements must use.
    pub fn font_cache(&self) -> &FontCache {
        self.document.font_cache()
    }

    /// Returns a text measure over this document's fonts.
    pub fn measure(&self) -> FontCacheMeasure<'_> {
        FontCacheMeasure::new(self.font_cache())
    }

    /// Paints `pages` in order and writes the finished PDF into memory.
    pub fn write(mut self, pages: Vec<Page>) -> Result<Vec<u8>, Error> {
        if pages.is_empty() {
            return Err(Error::new(
                "A booklet needs at least one page",
                ErrorKind::InvalidData,
            ));
        }

        let page_count = pages.len();
        for (index, page) in pages.into_iter().enumerate() {
            if index > 0 {
                self.document.push(PageBreak::new());
            }
            self.document.push(CanvasElement::new(page.canvas));
        }

        let mut bytes = Vec::new();
        self.document.render(&mut bytes)?;
        debug!("wrote {} booklet pages ({} bytes)", page_count, bytes.len());
        Ok(bytes)
    }
}

/// Page decorator that hands the canvas the whole sheet without margins.
#[derive(Default)]
struct CanvasPageDecorator {
    page: usize,
}

impl PageDecorator for CanvasPageDecorator {
    fn decorate_page<'a>(
        &mut self,
        _context: &genpdf::Context,
        area: genpdf::render::Area<'a>,
        _style: style::Style,
    ) -> Result<genpdf::render::Area<'a>, Error> {
        self.page += 1;
        debug!("starting booklet page {}", self.page);
        Ok(area)
    }
}

//! Single-work share cards: an 800×1100 px PNG with the photo, the study title, its graduation
//! and a few details about the work.

use genpdf::style::Color;
use image::GenericImageView;
use log::info;

use crate::canvas::{Canvas, HorizontalAlignment, Point, Rect, Shadow};
use crate::curriculum::Curriculum;
use crate::elements::{ImageDecoder, SourceDecoder};
use crate::error::RenderError;
use crate::layout::{advance_cursor, file_stem, fit_box, TextMeasure};
use crate::model::{Artifact, Work};
use crate::raster::{self, RasterFonts};
use crate::richtext::TextStyle;

pub const CARD_WIDTH: f64 = 800.0;
pub const CARD_HEIGHT: f64 = 1100.0;

const PADDING: f64 = 60.0;
const IMAGE_MAX_HEIGHT: f64 = 600.0;
const TITLE_GAP: f64 = 60.0;
const TITLE_LINE_HEIGHT: f64 = 45.0;
const GRADUATION_GAP: f64 = 30.0;
const DETAILS_GAP: f64 = 60.0;
const DETAIL_ROW_HEIGHT: f64 = 35.0;
const DETAIL_LABEL_X: f64 = PADDING + 40.0;
const DETAIL_VALUE_X: f64 = DETAIL_LABEL_X + 100.0;
const FOOTER_OFFSET: f64 = 30.0;
/// 60 % opacity.
const FOOTER_ALPHA: u8 = 153;

const PRIMARY: Color = Color::Rgb(94, 45, 145);
const GRAY_400: Color = Color::Rgb(0x9C, 0xA3, 0xAF);
const GRAY_500: Color = Color::Rgb(0x6B, 0x72, 0x80);
const GRAY_800: Color = Color::Rgb(0x1F, 0x29, 0x37);

const IMAGE_SHADOW: Shadow = Shadow {
    color: Color::Rgb(0, 0, 0),
    alpha: 38,
    blur: 20.0,
    offset_x: 0.0,
    offset_y: 10.0,
};

/// Text printed on share cards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareCardLabels {
    pub author: String,
    pub date: String,
    pub variety: String,
    pub footer: String,
}

impl Default for ShareCardLabels {
    fn default() -> Self {
        Self {
            author: "Author:".to_string(),
            date: "Date:".to_string(),
            variety: "Variety:".to_string(),
            footer: "Made with Ikebana Studio".to_string(),
        }
    }
}

/// Options controlling share card generation.
#[derive(Clone, Debug)]
pub struct ShareCardOptions {
    date_format: String,
    labels: ShareCardLabels,
}

impl Default for ShareCardOptions {
    fn default() -> Self {
        Self {
            date_format: "%d/%m/%Y".to_string(),
            labels: ShareCardLabels::default(),
        }
    }
}

impl ShareCardOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `chrono` format string used for the work date.
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Replaces the printed labels.
    pub fn with_labels(mut self, labels: ShareCardLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn labels(&self) -> &ShareCardLabels {
        &self.labels
    }
}

/// Lays out the share card of one work on an 800×1100 px canvas.
///
/// Fails with [`RenderError::UnresolvableReference`] before decoding anything when the work's
/// curriculum id is unknown.
pub fn render_share_card(
    curriculum: &Curriculum,
    work: &Work,
    options: &ShareCardOptions,
    measure: &dyn TextMeasure,
    decoder: &dyn ImageDecoder,
) -> Result<Canvas, RenderError> {
    let item = curriculum
        .get(work.curriculum_id)
        .ok_or_else(|| RenderError::UnresolvableReference {
            work_id: work.id.clone(),
            curriculum_id: work.curriculum_id,
        })?;

    let image = decoder
        .decode(&work.image)
        .map_err(|source| RenderError::ImageDecode {
            work_id: work.id.clone(),
            source,
        })?;
    let (px_width, px_height) = image.dimensions();

    let content_width = CARD_WIDTH - PADDING * 2.0;
    let center = CARD_WIDTH / 2.0;
    let mut canvas = Canvas::new(CARD_WIDTH, CARD_HEIGHT);
    canvas.fill_rect(canvas.bounds(), Color::Rgb(255, 255, 255));

    let fitted = fit_box(
        f64::from(px_width),
        f64::from(px_height),
        content_width,
        IMAGE_MAX_HEIGHT,
    );
    let image_rect = Rect::new(
        (CARD_WIDTH - fitted.width) / 2.0,
        PADDING,
        fitted.width,
        fitted.height,
    );
    canvas.image(image_rect, image, Some(IMAGE_SHADOW));

    let title_style = TextStyle::new(36).bold().colored(PRIMARY);
    // The card keeps the annotated title; only the filename uses the display title.
    let title_lines = measure.wrap(&item.title, content_width, &title_style);
    let mut y = image_rect.bottom() + TITLE_GAP;
    for (index, line) in title_lines.iter().enumerate() {
        if index > 0 {
            y = advance_cursor(y, TITLE_LINE_HEIGHT, 1);
        }
        canvas.text(Point::new(center, y), line, title_style, HorizontalAlignment::Center);
    }

    y += GRADUATION_GAP;
    canvas.text(
        Point::new(center, y),
        item.graduation.to_uppercase(),
        TextStyle::new(22).colored(GRAY_500),
        HorizontalAlignment::Center,
    );

    y += DETAILS_GAP;
    let labels = options.labels();
    let date = work.created_at.format(&options.date_format).to_string();
    let variety = work.variety.to_string();
    let details = [
        (&labels.author, work.author.as_str()),
        (&labels.date, date.as_str()),
        (&labels.variety, variety.as_str()),
    ];
    for (label, value) in details {
        canvas.text(
            Point::new(DETAIL_LABEL_X, y),
            label.as_str(),
            TextStyle::new(18).colored(GRAY_400),
            HorizontalAlignment::Left,
        );
        canvas.text(
            Point::new(DETAIL_VALUE_X, y),
            value,
            TextStyle::new(18).bold().colored(GRAY_800),
            HorizontalAlignment::Left,
        );
        y = advance_cursor(y, DETAIL_ROW_HEIGHT, 1);
    }

    canvas.text_with_alpha(
        Point::new(center, CARD_HEIGHT - FOOTER_OFFSET),
        labels.footer.as_str(),
        TextStyle::new(16).colored(PRIMARY),
        HorizontalAlignment::Center,
        FOOTER_ALPHA,
    );

    Ok(canvas)
}

/// Renders the share card PNG of the work with id `work_id`.
///
/// The file is named after the study's display title, e.g. `upright_style.png`.
pub fn generate_share_card(
    curriculum: &Curriculum,
    works: &[Work],
    work_id: &str,
    options: &ShareCardOptions,
) -> Result<Artifact, RenderError> {
    if works.is_empty() {
        return Err(RenderError::EmptyCatalog);
    }
    let work = works
        .iter()
        .find(|work| work.id == work_id)
        .ok_or_else(|| RenderError::UnknownWork {
            work_id: work_id.to_string(),
        })?;
    let item = curriculum
        .get(work.curriculum_id)
        .ok_or_else(|| RenderError::UnresolvableReference {
            work_id: work.id.clone(),
            curriculum_id: work.curriculum_id,
        })?;

    let fonts = RasterFonts::load_default().map_err(RenderError::FontLoad)?;
    let canvas = render_share_card(curriculum, work, options, &fonts, &SourceDecoder)?;
    let bytes = raster::render_png(&canvas, &fonts)?;

    let filename = format!("{}.png", file_stem(&item.display_title()));
    info!("generated {} ({} bytes)", filename, bytes.len());
    Ok(Artifact { filename, bytes })
}

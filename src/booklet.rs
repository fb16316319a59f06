//! The printable progress booklet.
//!
//! A booklet is a cover page followed by one page per curriculum item that has at least one work,
//! in curriculum order.  Each content page shows the item's representative work (see
//! [`select_representatives`]).  [`render_booklet`] produces the laid-out [`Page`]s;
//! [`generate_booklet`] also loads fonts and writes the PDF.

use chrono::{DateTime, Utc};
use genpdf::style::Color;
use image::GenericImageView;
use log::{debug, info};

use crate::builder::{BookletWriter, A4_HEIGHT_MM, A4_WIDTH_MM};
use crate::canvas::{Canvas, HorizontalAlignment, Page, PageKind, Point, Rect};
use crate::curriculum::Curriculum;
use crate::elements::{ImageDecoder, SourceDecoder};
use crate::error::RenderError;
use crate::fonts;
use crate::layout::{advance_cursor, fit_box, TextMeasure};
use crate::model::{Artifact, Work};
use crate::progress::{select_representatives, Representative};
use crate::richtext::TextStyle;

const PRIMARY: Color = Color::Rgb(94, 45, 145);
const TEXT: Color = Color::Rgb(60, 60, 60);
const SUBTEXT: Color = Color::Rgb(100, 100, 100);
const HEADER_BAND: Color = Color::Rgb(245, 245, 245);
const DIVIDER: Color = Color::Rgb(200, 200, 200);
const FOOTER: Color = Color::Rgb(150, 150, 150);
const WHITE: Color = Color::Rgb(255, 255, 255);

const MARGIN_X: f64 = 20.0;
const CONTENT_WIDTH: f64 = 170.0;
const HEADER_HEIGHT: f64 = 30.0;
const GRADUATION_BASELINE: f64 = 20.0;
const TITLE_BASELINE: f64 = 50.0;
const TITLE_LINE_HEIGHT: f64 = 10.0;
const IMAGE_TOP: f64 = 60.0;
const IMAGE_MAX_HEIGHT: f64 = 150.0;
const IMAGE_MIN_HEIGHT: f64 = 20.0;
const META_GAP: f64 = 15.0;
const META_FIRST_ROW: f64 = 10.0;
const META_ROW_HEIGHT: f64 = 6.0;
const META_SECOND_COLUMN: f64 = 120.0;
const FOOTER_BASELINE: f64 = 285.0;
/// Lowest baseline the metadata block may use without running into the footer.
const META_LIMIT: f64 = 277.0;

/// Text printed on booklet pages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookletLabels {
    pub title_lines: Vec<String>,
    pub subtitle: String,
    pub author: String,
    pub generated_on: String,
    pub custom_title: String,
    pub date: String,
    pub variety: String,
    pub page: String,
    pub studio: String,
}

impl Default for BookletLabels {
    fn default() -> Self {
        Self {
            title_lines: vec!["My Ikebana".to_string(), "Booklet".to_string()],
            subtitle: "Study Portfolio".to_string(),
            author: "Author".to_string(),
            generated_on: "Generated on".to_string(),
            custom_title: "Title".to_string(),
            date: "Date".to_string(),
            variety: "Variety".to_string(),
            page: "Page".to_string(),
            studio: "Ikebana Studio".to_string(),
        }
    }
}

/// Options controlling booklet generation.
#[derive(Clone, Debug)]
pub struct BookletOptions {
    author_fallback: String,
    generated_at: DateTime<Utc>,
    date_format: String,
    filename: String,
    labels: BookletLabels,
}

impl Default for BookletOptions {
    fn default() -> Self {
        Self {
            author_fallback: "Ikebana Student".to_string(),
            generated_at: Utc::now(),
            date_format: "%d/%m/%Y".to_string(),
            filename: "my-ikebana-booklet.pdf".to_string(),
            labels: BookletLabels::default(),
        }
    }
}

impl BookletOptions {
    /// Creates options with the crate defaults, stamped with the current time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the author printed when the snapshot has no works to take a name from.
    pub fn with_author_fallback(mut self, author: impl Into<String>) -> Self {
        self.author_fallback = author.into();
        self
    }

    /// Sets the generation timestamp printed on the cover.
    pub fn with_generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }

    /// Sets the `chrono` format string used for every printed date.
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Sets the file name of the generated document.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Replaces the printed labels.
    pub fn with_labels(mut self, labels: BookletLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn author_fallback(&self) -> &str {
        &self.author_fallback
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn labels(&self) -> &BookletLabels {
        &self.labels
    }

    fn format_date(&self, date: DateTime<Utc>) -> String {
        date.format(&self.date_format).to_string()
    }
}

/// Lays out the booklet for a snapshot.
///
/// Returns [`RenderError::EmptyCatalog`] without producing pages when no curriculum item has a
/// work.  Otherwise the result is one cover followed by one content page per represented item, in
/// curriculum order.  The cover names the author of the first work in `works`.
pub fn render_booklet(
    curriculum: &Curriculum,
    works: &[Work],
    options: &BookletOptions,
    measure: &dyn TextMeasure,
    decoder: &dyn ImageDecoder,
) -> Result<Vec<Page>, RenderError> {
    let representatives = select_representatives(curriculum, works);
    if representatives.is_empty() {
        return Err(RenderError::EmptyCatalog);
    }

    let author = works
        .first()
        .map(|work| work.author.as_str())
        .unwrap_or(options.author_fallback());

    let mut pages = Vec::with_capacity(representatives.len() + 1);
    pages.push(Page {
        kind: PageKind::Cover,
        heading: None,
        canvas: cover_canvas(author, options),
    });

    for (index, representative) in representatives.iter().enumerate() {
        let number = index + 1;
        let canvas = study_canvas(representative, number, options, measure, decoder)?;
        pages.push(Page {
            kind: PageKind::Content { number },
            heading: Some(representative.item.display_title()),
            canvas,
        });
    }

    debug!(
        "laid out booklet with {} study pages for {} works",
        representatives.len(),
        works.len()
    );
    Ok(pages)
}

fn cover_canvas(author: &str, options: &BookletOptions) -> Canvas {
    let labels = options.labels();
    let center = A4_WIDTH_MM / 2.0;
    let mut canvas = Canvas::new(A4_WIDTH_MM, A4_HEIGHT_MM);

    canvas.fill_rect(canvas.bounds(), PRIMARY);

    let title_style = TextStyle::new(40).bold().colored(WHITE);
    let mut y = 100.0;
    for line in &labels.title_lines {
        canvas.text(Point::new(center, y), line, title_style, HorizontalAlignment::Center);
        y = advance_cursor(y, 20.0, 1);
    }

    canvas.text(
        Point::new(center, 140.0),
        &labels.subtitle,
        TextStyle::new(16).colored(WHITE),
        HorizontalAlignment::Center,
    );
    canvas.line(Point::new(70.0, 150.0), Point::new(140.0, 150.0), WHITE);

    canvas.text(
        Point::new(center, 250.0),
        format!("{}: {}", labels.author, author),
        TextStyle::new(14).colored(WHITE),
        HorizontalAlignment::Center,
    );
    canvas.text(
        Point::new(center, 260.0),
        format!(
            "{}: {}",
            labels.generated_on,
            options.format_date(options.generated_at())
        ),
        TextStyle::new(10).colored(WHITE),
        HorizontalAlignment::Center,
    );

    canvas
}

fn study_canvas(
    representative: &Representative<'_>,
    number: usize,
    options: &BookletOptions,
    measure: &dyn TextMeasure,
    decoder: &dyn ImageDecoder,
) -> Result<Canvas, RenderError> {
    let Representative { item, work } = *representative;
    let labels = options.labels();
    let mut canvas = Canvas::new(A4_WIDTH_MM, A4_HEIGHT_MM);

    canvas.fill_rect(Rect::new(0.0, 0.0, A4_WIDTH_MM, HEADER_HEIGHT), HEADER_BAND);
    canvas.text(
        Point::new(MARGIN_X, GRADUATION_BASELINE),
        item.graduation.to_uppercase(),
        TextStyle::new(12).bold().colored(PRIMARY),
        HorizontalAlignment::Left,
    );

    let title = item.display_title();
    let title_style = TextStyle::new(24).bold().colored(TEXT);
    let title_lines = measure.wrap(&title, CONTENT_WIDTH, &title_style);
    let mut y = TITLE_BASELINE;
    for line in &title_lines {
        canvas.text(Point::new(MARGIN_X, y), line, title_style, HorizontalAlignment::Left);
        y = advance_cursor(y, TITLE_LINE_HEIGHT, 1);
    }

    let image = decoder
        .decode(&work.image)
        .map_err(|source| RenderError::ImageDecode {
            work_id: work.id.clone(),
            source,
        })?;
    let (px_width, px_height) = image.dimensions();

    let image_top = advance_cursor(IMAGE_TOP, TITLE_LINE_HEIGHT, title_lines.len());
    let reserved_below = META_GAP + META_FIRST_ROW + META_ROW_HEIGHT;
    let max_height = (META_LIMIT - reserved_below - image_top)
        .min(IMAGE_MAX_HEIGHT)
        .max(IMAGE_MIN_HEIGHT);
    let fitted = fit_box(
        f64::from(px_width),
        f64::from(px_height),
        CONTENT_WIDTH,
        max_height,
    );
    let image_rect = Rect::new(
        (A4_WIDTH_MM - fitted.width) / 2.0,
        image_top,
        fitted.width,
        fitted.height,
    );
    canvas.image(image_rect, image, None);

    let divider_y = image_rect.bottom() + META_GAP;
    canvas.line(
        Point::new(MARGIN_X, divider_y),
        Point::new(MARGIN_X + CONTENT_WIDTH, divider_y),
        DIVIDER,
    );

    let meta_style = TextStyle::new(10).bold().colored(SUBTEXT);
    let mut meta_y = divider_y + META_FIRST_ROW;
    if let Some(custom) = work.custom_title().filter(|custom| *custom != title) {
        canvas.text(
            Point::new(MARGIN_X, meta_y),
            format!("{}: {}", labels.custom_title, custom),
            meta_style,
            HorizontalAlignment::Left,
        );
        meta_y = advance_cursor(meta_y, META_ROW_HEIGHT, 1);
    }
    canvas.text(
        Point::new(MARGIN_X, meta_y),
        format!("{}: {}", labels.date, options.format_date(work.created_at)),
        meta_style,
        HorizontalAlignment::Left,
    );
    canvas.text(
        Point::new(META_SECOND_COLUMN, meta_y),
        format!("{}: {}", labels.variety, work.variety),
        meta_style,
        HorizontalAlignment::Left,
    );

    canvas.text(
        Point::new(A4_WIDTH_MM / 2.0, FOOTER_BASELINE),
        format!("{} | {} {}", labels.studio, labels.page, number),
        TextStyle::new(8).colored(FOOTER),
        HorizontalAlignment::Center,
    );

    Ok(canvas)
}

/// Renders the booklet PDF for a snapshot.
///
/// Fonts are resolved through [`fonts::resolve_font_files`] and images decoded with
/// [`SourceDecoder`].  The document is only returned once it has been written completely.
pub fn generate_booklet(
    curriculum: &Curriculum,
    works: &[Work],
    options: &BookletOptions,
) -> Result<Artifact, RenderError> {
    if select_representatives(curriculum, works).is_empty() {
        return Err(RenderError::EmptyCatalog);
    }

    let family = fonts::default_font_family().map_err(RenderError::FontLoad)?;
    let title = options.labels().title_lines.join(" ");
    let writer = BookletWriter::new(family).with_title(title);

    let pages = render_booklet(curriculum, works, options, &writer.measure(), &SourceDecoder)?;
    let page_count = pages.len();

    #[cfg(feature = "bookmarks")]
    let outline = crate::bookmarks::outline_for_pages(&pages);

    let bytes = writer.write(pages).map_err(RenderError::Document)?;

    #[cfg(feature = "bookmarks")]
    let bytes = crate::bookmarks::apply_page_bookmarks(&bytes, &outline)?;

    info!(
        "generated {} with {} pages ({} bytes)",
        options.filename(),
        page_count,
        bytes.len()
    );
    Ok(Artifact {
        filename: options.filename().to_string(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::DrawOp;
    use crate::curriculum::CurriculumItem;
    use crate::layout::FixedAdvance;
    use crate::model::{ImageSource, Variety};
    use crate::progress::tests::{at, basic_curriculum, work};
    use image::{DynamicImage, ImageBuffer, Rgb};

    /// Decoder that fabricates a 400×300 image for every path and fails on `broken.png`.
    struct StubDecoder;

    impl ImageDecoder for StubDecoder {
        fn decode(&self, source: &ImageSource) -> Result<DynamicImage, genpdf::error::Error> {
            match source {
                ImageSource::Path(path) if path == "broken.png" => Err(genpdf::error::Error::new(
                    "corrupt",
                    std::io::Error::new(std::io::ErrorKind::InvalidData, "corrupt"),
                )),
                _ => Ok(DynamicImage::ImageRgb8(ImageBuffer::from_pixel(
                    400,
                    300,
                    Rgb([10, 20, 30]),
                ))),
            }
        }
    }

    fn options() -> BookletOptions {
        BookletOptions::new().with_generated_at(at(20))
    }

    fn render(curriculum: &Curriculum, works: &[Work]) -> Result<Vec<Page>, RenderError> {
        render_booklet(
            curriculum,
            works,
            &options(),
            &FixedAdvance::millimetres(),
            &StubDecoder,
        )
    }

    fn texts(page: &Page) -> Vec<String> {
        page.canvas.texts().map(|(_, text)| text.to_string()).collect()
    }

    #[test]
    fn empty_catalog_produces_no_pages() {
        let err = render(&basic_curriculum(3), &[]).unwrap_err();
        assert!(err.is_empty_catalog());
    }

    #[test]
    fn works_for_unknown_items_only_count_as_empty() {
        let err = render(&basic_curriculum(3), &[work("ghost", 42, 1)]).unwrap_err();
        assert!(err.is_empty_catalog());
    }

    #[test]
    fn one_cover_plus_one_page_per_represented_item() {
        let curriculum = basic_curriculum(5);
        let works = vec![work("a", 4, 1), work("b", 2, 2), work("c", 4, 3)];
        let pages = render(&curriculum, &works).unwrap();

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].kind, PageKind::Cover);
        assert_eq!(pages[1].kind, PageKind::Content { number: 1 });
        assert_eq!(pages[2].kind, PageKind::Content { number: 2 });
        assert_eq!(pages[1].heading.as_deref(), Some("Study 2"));
        assert_eq!(pages[2].heading.as_deref(), Some("Study 4"));
        assert!(texts(&pages[2]).contains(&"Ikebana Studio | Page 2".to_string()));
    }

    #[test]
    fn cover_uses_first_raw_work_author() {
        let curriculum = basic_curriculum(2);
        let mut first = work("a", 2, 1);
        first.author = "Sofu".to_string();
        let works = vec![first, work("b", 1, 2)];
        let pages = render(&curriculum, &works).unwrap();
        let cover = texts(&pages[0]);
        assert!(cover.contains(&"Author: Sofu".to_string()));
        assert!(cover.contains(&"Generated on: 20/01/2024".to_string()));
    }

    #[test]
    fn custom_title_is_printed_only_when_different() {
        let curriculum = Curriculum::from_items(vec![
            CurriculumItem::new(1, "Basic", "Upright Style (Risshin-kei)", Variety::Moribana),
            CurriculumItem::new(2, "Basic", "Slanting Style", Variety::Moribana),
        ])
        .unwrap();
        let works = vec![
            work("a", 1, 1).with_custom_title("Upright Style"),
            work("b", 2, 1)
                .with_custom_title("Spring branches")
                .with_variety(Variety::Nageire),
        ];
        let pages = render(&curriculum, &works).unwrap();

        let first = texts(&pages[1]);
        assert!(first.contains(&"BASIC".to_string()));
        assert!(first.contains(&"Upright Style".to_string()));
        assert!(!first.iter().any(|t| t.starts_with("Title:")));

        let second = texts(&pages[2]);
        assert!(second.contains(&"Title: Spring branches".to_string()));
        assert!(second.contains(&"Date: 01/01/2024".to_string()));
        assert!(second.contains(&"Variety: Nageire".to_string()));
    }

    #[test]
    fn metadata_sits_below_the_fitted_image() {
        let curriculum = basic_curriculum(1);
        let pages = render(&curriculum, &[work("a", 1, 1).with_custom_title("Other")]).unwrap();
        let canvas = &pages[1].canvas;

        let rect = canvas.image_rects().next().expect("image placed");
        assert!((rect.width - CONTENT_WIDTH).abs() < 1e-9);
        assert!((rect.height - 127.5).abs() < 1e-9);
        assert!((rect.x - MARGIN_X).abs() < 1e-9);
        assert!(canvas.bounds().contains(&rect));

        let title_row = canvas
            .texts()
            .find(|(_, text)| text.starts_with("Title:"))
            .map(|(origin, _)| origin.y)
            .unwrap();
        let date_row = canvas
            .texts()
            .find(|(_, text)| text.starts_with("Date:"))
            .map(|(origin, _)| origin.y)
            .unwrap();
        assert!((title_row - (rect.bottom() + META_GAP + META_FIRST_ROW)).abs() < 1e-9);
        assert!((date_row - (title_row + META_ROW_HEIGHT)).abs() < 1e-9);
    }

    #[test]
    fn long_titles_push_the_image_down() {
        let long = "An exceptionally long curriculum title that certainly needs more than one line to fit";
        let curriculum =
            Curriculum::from_items(vec![CurriculumItem::new(1, "Basic", long, Variety::Moribana)])
                .unwrap();
        let pages = render(&curriculum, &[work("a", 1, 1)]).unwrap();
        let canvas = &pages[1].canvas;

        let title_lines = canvas
            .ops()
            .iter()
            .filter(|op| matches!(op, DrawOp::Text { style, .. } if style.size() == 24))
            .count();
        assert!(title_lines > 1);

        let rect = canvas.image_rects().next().unwrap();
        assert!((rect.y - advance_cursor(IMAGE_TOP, TITLE_LINE_HEIGHT, title_lines)).abs() < 1e-9);
        assert!(rect.bottom() + META_GAP + META_FIRST_ROW + META_ROW_HEIGHT <= META_LIMIT + 1e-9);
    }

    #[test]
    fn decode_failure_aborts_the_booklet() {
        let curriculum = basic_curriculum(2);
        let mut broken = work("bad", 2, 1);
        broken.image = ImageSource::from_path("broken.png");
        let err = render(&curriculum, &[work("ok", 1, 1), broken]).unwrap_err();
        assert!(matches!(err, RenderError::ImageDecode { ref work_id, .. } if work_id == "bad"));
    }

    #[test]
    fn generate_reports_empty_catalog_before_loading_fonts() {
        let err = generate_booklet(&basic_curriculum(2), &[], &options()).unwrap_err();
        assert!(err.is_empty_catalog());
    }
}

//! Pure geometry and text-wrapping helpers shared by the booklet and share-card renderers.
//!
//! Nothing in this module touches fonts or images directly.  Text widths come from a
//! [`TextMeasure`] implementation supplied by the caller, which lets the same layout run against
//! the PDF font cache, rasterizer glyph metrics, or the [`FixedAdvance`] approximation.

use crate::richtext::TextStyle;

const MM_PER_POINT: f64 = 25.4 / 72.0;

/// Width and height of a fitted box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxSize {
    pub width: f64,
    pub height: f64,
}

/// Scales a `content_width × content_height` box uniformly so it fits in `max_width × max_height`.
///
/// The box is scaled by `min(max_width / content_width, max_height / content_height)`, so it fills
/// the limiting dimension and keeps its aspect ratio.  Small content is scaled up to the bounds.
///
/// # Panics
///
/// Panics unless all four dimensions are positive.  Callers pass decoded image dimensions and
/// fixed layout bounds, which are never degenerate.
pub fn fit_box(
    content_width: f64,
    content_height: f64,
    max_width: f64,
    max_height: f64,
) -> BoxSize {
    assert!(
        content_width > 0.0 && content_height > 0.0,
        "fit_box requires a non-empty content box, got {content_width}x{content_height}"
    );
    assert!(
        max_width > 0.0 && max_height > 0.0,
        "fit_box requires positive bounds, got {max_width}x{max_height}"
    );

    let scale = (max_width / content_width).min(max_height / content_height);
    BoxSize {
        width: (content_width * scale).min(max_width),
        height: (content_height * scale).min(max_height),
    }
}

/// Greedily packs the whitespace-separated words of `text` into lines no wider than
/// `max_line_width` according to `measure`.
///
/// Words are joined with single spaces.  A word that is wider than `max_line_width` on its own is
/// placed on a line by itself and never split.  Empty input yields one empty line.
pub fn wrap_text<F>(text: &str, max_line_width: f64, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f64,
{
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        let candidate = format!("{current} {word}");
        if measure(&candidate) <= max_line_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Moves a vertical cursor down by `line_count` lines of `line_height`.
pub fn advance_cursor(current_y: f64, line_height: f64, line_count: usize) -> f64 {
    current_y + line_height * line_count as f64
}

/// Measures rendered text width in the unit of the canvas being laid out.
pub trait TextMeasure {
    /// Returns the width of `text` set in `style`.
    fn text_width(&self, text: &str, style: &TextStyle) -> f64;

    /// Wraps `text` to `max_width` using this measure.
    fn wrap(&self, text: &str, max_width: f64, style: &TextStyle) -> Vec<String> {
        wrap_text(text, max_width, |candidate| self.text_width(candidate, style))
    }
}

impl<T: TextMeasure + ?Sized> TextMeasure for &T {
    fn text_width(&self, text: &str, style: &TextStyle) -> f64 {
        (**self).text_width(text, style)
    }
}

/// Static approximation that gives every character the same advance.
///
/// The advance is a fraction of the em size.  Bold text is widened slightly.  This is close enough
/// to proportional fonts for previews and for laying out pages when no font files are installed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedAdvance {
    em_fraction: f64,
    unit_per_size: f64,
}

impl FixedAdvance {
    /// Advance of an average Latin glyph relative to the font size.
    pub const AVERAGE_EM_FRACTION: f64 = 0.5;
    const BOLD_FACTOR: f64 = 1.08;

    /// Measures in millimetres, treating the style size as points.
    pub fn millimetres() -> Self {
        Self {
            em_fraction: Self::AVERAGE_EM_FRACTION,
            unit_per_size: MM_PER_POINT,
        }
    }

    /// Measures in pixels, treating the style size as pixels.
    pub fn pixels() -> Self {
        Self {
            em_fraction: Self::AVERAGE_EM_FRACTION,
            unit_per_size: 1.0,
        }
    }
}

impl TextMeasure for FixedAdvance {
    fn text_width(&self, text: &str, style: &TextStyle) -> f64 {
        let weight = if style.is_bold() { Self::BOLD_FACTOR } else { 1.0 };
        text.chars().count() as f64
            * f64::from(style.size())
            * self.em_fraction
            * self.unit_per_size
            * weight
    }
}

/// Removes the parenthetical annotation from a curriculum title.
///
/// Titles look like `"Upright Style (Risshin-kei) (立真型)"`; the text before the first `(` is the
/// display title.  When a title starts with a parenthesis, every parenthesized group is removed
/// instead, and a title made only of parentheses is kept as written.
pub fn display_title(title: &str) -> String {
    let head = title.split('(').next().unwrap_or_default().trim();
    if !head.is_empty() {
        return head.to_string();
    }

    let mut depth = 0usize;
    let mut stripped = String::with_capacity(title.len());
    for ch in title.chars() {
        match ch {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => stripped.push(ch),
            _ => {}
        }
    }

    let stripped = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if stripped.is_empty() {
        title.trim().to_string()
    } else {
        stripped
    }
}

/// Builds a file name stem from a title: lower-case alphanumerics with every other run of
/// characters collapsed to a single `_`.
pub fn file_stem(title: &str) -> String {
    let mut stem = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            stem.push(ch.to_ascii_lowercase());
        } else if !stem.is_empty() && !stem.ends_with('_') {
            stem.push('_');
        }
    }
    let stem = stem.trim_end_matches('_');
    if stem.is_empty() {
        "share_card".to_string()
    } else {
        stem.to_string()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_fit_box_keeps_ratio_and_bounds(
            width in 1.0f64..5000.0,
            height in 1.0f64..5000.0,
            max_width in 1.0f64..500.0,
            max_height in 1.0f64..500.0,
        ) {
            let fitted = fit_box(width, height, max_width, max_height);
            prop_assert!(fitted.width <= max_width);
            prop_assert!(fitted.height <= max_height);
            let ratio = width / height;
            let fitted_ratio = fitted.width / fitted.height;
            prop_assert!((ratio - fitted_ratio).abs() < 1e-6 * ratio.max(1.0));
        }

        #[test]
        fn prop_wrapped_lines_fit_unless_single_word(
            words in prop::collection::vec("[a-z]{1,12}", 0..30),
            max_width in 0.0f64..40.0,
        ) {
            let text = words.join(" ");
            let lines = wrap_text(&text, max_width, |s| s.chars().count() as f64);
            prop_assert!(!lines.is_empty());
            for line in &lines {
                let fits = line.chars().count() as f64 <= max_width;
                prop_assert!(fits || !line.contains(' '));
            }
            let joined = lines.join(" ");
            let rejoined: Vec<&str> = joined.split_whitespace().collect();
            let expected: Vec<&str> = words.iter().map(String::as_str).collect();
            prop_assert_eq!(rejoined, expected);
        }
    }
}

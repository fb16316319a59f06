//! Core entry point for the study_booklet crate.
//!
//! The crate turns a curriculum table and a snapshot of cataloged works into
//! progress statistics, a printable booklet (PDF) and per-work share cards
//! (PNG).

pub mod booklet;
pub mod builder;
pub mod canvas;
pub mod curriculum;
pub mod elements;
pub mod error;
pub mod fonts;
pub mod layout;
pub mod model;
pub mod progress;
pub mod raster;
pub mod richtext;
pub mod share_card;

#[cfg(feature = "bookmarks")]
pub mod bookmarks;

pub use booklet::{generate_booklet, render_booklet, BookletLabels, BookletOptions};
pub use curriculum::{Curriculum, CurriculumItem};
pub use elements::{ImageDecoder, SourceDecoder};
pub use error::RenderError;
pub use layout::{FixedAdvance, TextMeasure};
pub use model::{Artifact, ImageSource, Variety, Work};
pub use progress::{graduation_progress, select_representatives, GraduationProgress};
pub use share_card::{generate_share_card, render_share_card, ShareCardLabels, ShareCardOptions};

//! Data structures describing cataloged works.
//!
//! The types in this module form a serialization-friendly model of the snapshot handed to the
//! renderers.  They intentionally avoid referencing the rendering crates so values can be produced
//! by any frontend or persisted as JSON without pulling in heavy dependencies.

use std::fmt;
use std::path::Path;

use base64::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Arrangement style of a work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variety {
    /// Arrangement in a shallow container.
    Moribana,
    /// Arrangement in a tall vase.
    Nageire,
    /// No variety recorded.
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl Variety {
    /// Returns the label printed on artifacts.
    pub fn label(self) -> &'static str {
        match self {
            Variety::Moribana => "Moribana",
            Variety::Nageire => "Nageire",
            Variety::NotApplicable => "N/A",
        }
    }
}

impl Default for Variety {
    fn default() -> Self {
        Self::NotApplicable
    }
}

impl fmt::Display for Variety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Representation of image sources a work can point at.
///
/// Besides the tagged `{"bytes": [..]}` and `{"path": ".."}` forms, a plain JSON string is
/// accepted: `data:` URLs with a base64 payload decode into [`ImageSource::Bytes`], any other
/// string is taken as a path.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "ImageSourceRepr")]
pub enum ImageSource {
    /// Encoded image held in memory.
    Bytes(Vec<u8>),
    /// Encoded image referenced by a file path.
    Path(String),
}

impl ImageSource {
    /// Creates a new in-memory image from raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Creates an image sourced from a file path.
    pub fn from_path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    /// Decodes a `data:<mime>;base64,<payload>` URL into an in-memory image.
    pub fn from_data_url(url: &str) -> Result<Self, DataUrlError> {
        let rest = url
            .get(..5)
            .filter(|scheme| scheme.eq_ignore_ascii_case("data:"))
            .map(|_| &url[5..])
            .ok_or(DataUrlError::NotDataUrl)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingPayload)?;
        if !header
            .split(';')
            .any(|param| param.trim().eq_ignore_ascii_case("base64"))
        {
            return Err(DataUrlError::NotBase64);
        }
        let bytes = BASE64_STANDARD
            .decode(payload.trim())
            .map_err(DataUrlError::Decode)?;
        Ok(Self::Bytes(bytes))
    }

    /// Rebases a relative path onto `base`; other sources are returned unchanged.
    pub fn relative_to(self, base: &Path) -> Self {
        match self {
            Self::Path(path) if Path::new(&path).is_relative() => {
                Self::Path(base.join(path).to_string_lossy().into_owned())
            }
            other => other,
        }
    }
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImageSourceRepr {
    Plain(String),
    Tagged(TaggedImageSource),
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum TaggedImageSource {
    Bytes(Vec<u8>),
    Path(String),
}

impl TryFrom<ImageSourceRepr> for ImageSource {
    type Error = DataUrlError;

    fn try_from(repr: ImageSourceRepr) -> Result<Self, Self::Error> {
        match repr {
            ImageSourceRepr::Plain(text) if text.trim_start().starts_with("data:") => {
                Self::from_data_url(text.trim_start())
            }
            ImageSourceRepr::Plain(path) => Ok(Self::Path(path)),
            ImageSourceRepr::Tagged(TaggedImageSource::Bytes(bytes)) => Ok(Self::Bytes(bytes)),
            ImageSourceRepr::Tagged(TaggedImageSource::Path(path)) => Ok(Self::Path(path)),
        }
    }
}

/// Errors raised while decoding a `data:` URL.
#[derive(Debug)]
pub enum DataUrlError {
    /// The string does not start with `data:`.
    NotDataUrl,
    /// No `,` separates the media type from the payload.
    MissingPayload,
    /// The payload is not marked as base64.
    NotBase64,
    /// The payload is not valid base64.
    Decode(base64::DecodeError),
}

impl fmt::Display for DataUrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotDataUrl => f.write_str("image source is not a data URL"),
            Self::MissingPayload => f.write_str("data URL has no payload"),
            Self::NotBase64 => f.write_str("only base64 data URLs are supported"),
            Self::Decode(err) => write!(f, "invalid base64 in data URL: {}", err),
        }
    }
}

impl std::error::Error for DataUrlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err),
            _ => None,
        }
    }
}

/// A cataloged study record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    /// Opaque unique identifier.
    pub id: String,
    /// Curriculum item this work documents.
    pub curriculum_id: u32,
    /// Photograph of the arrangement.
    #[serde(alias = "imageRef", alias = "imageDataUrl")]
    pub image: ImageSource,
    /// Name of the person who made the arrangement.
    pub author: String,
    /// Creation timestamp.
    #[serde(alias = "creationDate")]
    pub created_at: DateTime<Utc>,
    /// Optional title chosen by the author; empty when unset.
    #[serde(default)]
    pub custom_title: String,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub variety: Variety,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Self-assessment from 0 to 5.
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub professor_notes: String,
}

impl Work {
    /// Creates a work with the required fields; optional fields start empty.
    pub fn new(
        id: impl Into<String>,
        curriculum_id: u32,
        image: ImageSource,
        author: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            curriculum_id,
            image,
            author: author.into(),
            created_at,
            custom_title: String::new(),
            is_favorite: false,
            variety: Variety::NotApplicable,
            description: String::new(),
            tags: Vec::new(),
            rating: 0,
            professor_notes: String::new(),
        }
    }

    /// Sets the favorite flag and returns the updated work.
    pub fn with_favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = is_favorite;
        self
    }

    /// Sets the custom title and returns the updated work.
    pub fn with_custom_title(mut self, title: impl Into<String>) -> Self {
        self.custom_title = title.into();
        self
    }

    /// Sets the variety and returns the updated work.
    pub fn with_variety(mut self, variety: Variety) -> Self {
        self.variety = variety;
        self
    }

    /// Returns the custom title when one was set.
    pub fn custom_title(&self) -> Option<&str> {
        let title = self.custom_title.trim();
        (!title.is_empty()).then_some(title)
    }
}

/// Reads a works snapshot from a JSON array.
///
/// Relative image paths are resolved against the directory containing `path`.
pub fn load_works(path: impl AsRef<Path>) -> Result<Vec<Work>, LoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let works: Vec<Work> = serde_json::from_str(&text)?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(works
        .into_iter()
        .map(|mut work| {
            work.image = work.image.relative_to(base);
            work
        })
        .collect())
}

/// Errors raised by [`load_works`].
#[derive(Debug)]
pub enum LoadError {
    /// The snapshot file could not be read.
    Io(std::io::Error),
    /// The snapshot is not a JSON array of works.
    Json(serde_json::Error),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "Failed to read works snapshot: {err}"),
            Self::Json(err) => write!(f, "Failed to parse works snapshot: {err}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// A generated file ready to be saved or shared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    /// Suggested file name, including the extension.
    pub filename: String,
    /// Encoded file contents.
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legacy_field_aliases() {
        let json = r#"{
            "id": "w1",
            "curriculumId": 3,
            "imageRef": {"path": "photos/a.png"},
            "author": "Aiko",
            "creationDate": "2024-03-01T10:00:00Z",
            "isFavorite": true,
            "variety": "N/A"
        }"#;
        let work: Work = serde_json::from_str(json).expect("work parses");
        assert_eq!(work.curriculum_id, 3);
        assert!(work.is_favorite);
        assert_eq!(work.variety, Variety::NotApplicable);
        assert_eq!(work.custom_title(), None);
        assert_eq!(work.image, ImageSource::from_path("photos/a.png"));
    }

    fn sample_png() -> Vec<u8> {
        let buffer = image::ImageBuffer::from_pixel(3, 2, image::Rgb([200u8, 40, 90]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(buffer)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageOutputFormat::Png,
            )
            .unwrap();
        bytes
    }

    #[test]
    fn parses_a_full_record_with_an_embedded_photo() {
        let png = sample_png();
        let json = format!(
            r#"{{
                "id": "5f0c6a8e-3b1d-4c2a-9f7e-2d4b8c1a6e90",
                "curriculumId": 7,
                "imageDataUrl": "data:image/png;base64,{}",
                "author": "Aiko",
                "creationDate": "2024-03-01T10:00:00.000Z",
                "customTitle": "Spring branches",
                "description": "Cherry and iris",
                "tags": ["spring", "cherry"],
                "isFavorite": false,
                "rating": 4,
                "professorNotes": "Lower the subject line.",
                "variety": "Moribana"
            }}"#,
            BASE64_STANDARD.encode(&png)
        );
        let work: Work = serde_json::from_str(&json).expect("work parses");
        assert_eq!(work.curriculum_id, 7);
        assert_eq!(work.custom_title(), Some("Spring branches"));
        assert_eq!(work.tags, vec!["spring".to_string(), "cherry".to_string()]);
        assert_eq!(work.rating, 4);
        assert_eq!(work.variety, Variety::Moribana);
        assert_eq!(work.image, ImageSource::from_bytes(png.clone()));

        let ImageSource::Bytes(bytes) = &work.image else {
            panic!("embedded photo should decode to bytes");
        };
        let decoded = image::load_from_memory(bytes).expect("embedded photo is a png");
        assert_eq!(image::GenericImageView::dimensions(&decoded), (3, 2));
    }

    #[test]
    fn plain_strings_are_paths_unless_data_urls() {
        let source: ImageSource = serde_json::from_str(r#""photos/a.jpg""#).unwrap();
        assert_eq!(source, ImageSource::from_path("photos/a.jpg"));

        let source: ImageSource = serde_json::from_str(r#""data:image/jpeg;base64,AQID""#).unwrap();
        assert_eq!(source, ImageSource::from_bytes(vec![1, 2, 3]));

        let tagged = serde_json::to_string(&ImageSource::from_bytes(vec![4, 5])).unwrap();
        assert_eq!(tagged, r#"{"bytes":[4,5]}"#);
        let back: ImageSource = serde_json::from_str(&tagged).unwrap();
        assert_eq!(back, ImageSource::from_bytes(vec![4, 5]));
    }

    #[test]
    fn malformed_data_urls_are_rejected() {
        assert!(matches!(
            ImageSource::from_data_url("image/png;base64,AQID"),
            Err(DataUrlError::NotDataUrl)
        ));
        assert!(matches!(
            ImageSource::from_data_url("data:image/png;base64"),
            Err(DataUrlError::MissingPayload)
        ));
        assert!(matches!(
            ImageSource::from_data_url("data:text/plain,hello"),
            Err(DataUrlError::NotBase64)
        ));
        assert!(matches!(
            ImageSource::from_data_url("data:image/png;base64,@@@"),
            Err(DataUrlError::Decode(_))
        ));
        assert!(serde_json::from_str::<ImageSource>(r#""data:image/png;base64,@@@""#).is_err());
    }

    #[test]
    fn relative_paths_are_rebased() {
        let source = ImageSource::from_path("a.png").relative_to(Path::new("/data"));
        assert_eq!(source, ImageSource::from_path("/data/a.png"));

        let bytes = ImageSource::from_bytes(vec![1, 2]).relative_to(Path::new("/data"));
        assert_eq!(bytes, ImageSource::from_bytes(vec![1, 2]));
    }

    #[test]
    fn blank_custom_title_is_none() {
        let work = Work::new("w", 1, ImageSource::from_path("x"), "A", Utc::now())
            .with_custom_title("   ");
        assert_eq!(work.custom_title(), None);
    }
}

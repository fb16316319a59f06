//! Errors surfaced while generating booklets and share cards.

use std::fmt;

/// Failure of a single artifact generation.
///
/// Aggregation never fails; every variant here aborts the artifact that was being produced and
/// leaves nothing half-written behind.
#[derive(Debug)]
pub enum RenderError {
    /// The snapshot holds no works, so there is nothing to render.
    EmptyCatalog,
    /// A work points at a curriculum id that the curriculum does not define.
    UnresolvableReference {
        /// Identifier of the offending work.
        work_id: String,
        /// The curriculum id that could not be resolved.
        curriculum_id: u32,
    },
    /// The requested work is not part of the snapshot.
    UnknownWork {
        /// Identifier that was requested.
        work_id: String,
    },
    /// The image of a work could not be decoded.
    ImageDecode {
        /// Identifier of the work whose image failed.
        work_id: String,
        /// Underlying decode error.
        source: genpdf::error::Error,
    },
    /// No usable font family could be loaded.
    FontLoad(genpdf::error::Error),
    /// The PDF document could not be assembled or written.
    Document(genpdf::error::Error),
    /// The share card could not be encoded.
    Encode(crate::raster::RasterError),
    /// Outline entries could not be added to the rendered PDF.
    #[cfg(feature = "bookmarks")]
    Bookmarks(crate::bookmarks::BookmarkError),
}

impl RenderError {
    /// Whether the error only means "nothing to render" rather than a failure.
    pub fn is_empty_catalog(&self) -> bool {
        matches!(self, Self::EmptyCatalog)
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCatalog => write!(f, "Add works to the catalog before generating artifacts"),
            Self::UnresolvableReference {
                work_id,
                curriculum_id,
            } => write!(
                f,
                "Work {work_id} refers to unknown curriculum item {curriculum_id}"
            ),
            Self::UnknownWork { work_id } => write!(f, "Work {work_id} is not in the catalog"),
            Self::ImageDecode { work_id, .. } => {
                write!(f, "Failed to decode the image of work {work_id}")
            }
            Self::FontLoad(err) => write!(f, "Failed to load fonts: {err}"),
            Self::Document(err) => write!(f, "Failed to write the booklet document: {err}"),
            Self::Encode(err) => write!(f, "Failed to encode the share card: {err}"),
            #[cfg(feature = "bookmarks")]
            Self::Bookmarks(err) => write!(f, "Failed to add booklet bookmarks: {err}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ImageDecode { source, .. } => Some(source),
            Self::FontLoad(err) | Self::Document(err) => Some(err),
            Self::Encode(err) => Some(err),
            #[cfg(feature = "bookmarks")]
            Self::Bookmarks(err) => Some(err),
            Self::EmptyCatalog | Self::UnresolvableReference { .. } | Self::UnknownWork { .. } => {
                None
            }
        }
    }
}

impl From<crate::raster::RasterError> for RenderError {
    fn from(err: crate::raster::RasterError) -> Self {
        Self::Encode(err)
    }
}

#[cfg(feature = "bookmarks")]
impl From<crate::bookmarks::BookmarkError> for RenderError {
    fn from(err: crate::bookmarks::BookmarkError) -> Self {
        Self::Bookmarks(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn empty_catalog_is_distinguishable() {
        assert!(RenderError::EmptyCatalog.is_empty_catalog());
        assert!(!RenderError::UnknownWork {
            work_id: "w".into()
        }
        .is_empty_catalog());
    }

    #[test]
    fn decode_errors_keep_their_source() {
        let err = RenderError::ImageDecode {
            work_id: "w7".into(),
            source: genpdf::error::Error::new(
                "bad header",
                std::io::Error::new(std::io::ErrorKind::InvalidData, "bad header"),
            ),
        };
        assert!(err.to_string().contains("w7"));
        assert!(err.source().is_some());
    }
}

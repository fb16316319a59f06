//! The static curriculum table that works are cataloged against.
//!
//! A [`Curriculum`] is loaded once at start-up and never mutated afterwards.  It keeps the items in
//! their declared order, which is the order every derived artifact follows, together with the
//! ordered list of graduation levels.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::Variety;

/// A single named unit of study belonging to one graduation level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumItem {
    /// Stable identifier referenced by [`crate::model::Work::curriculum_id`].
    pub id: u32,
    /// Graduation level the item belongs to.
    pub graduation: String,
    /// Full title, possibly carrying a parenthetical secondary-script annotation.
    #[serde(alias = "study")]
    pub title: String,
    /// Variety the arrangement is usually made in.
    #[serde(alias = "varietySuggestion")]
    pub suggested_variety: Variety,
}

impl CurriculumItem {
    /// Creates a new curriculum item.
    pub fn new(
        id: u32,
        graduation: impl Into<String>,
        title: impl Into<String>,
        suggested_variety: Variety,
    ) -> Self {
        Self {
            id,
            graduation: graduation.into(),
            title: title.into(),
            suggested_variety,
        }
    }

    /// Returns the title with the parenthetical annotation removed.
    ///
    /// See [`crate::layout::display_title`].
    pub fn display_title(&self) -> String {
        crate::layout::display_title(&self.title)
    }
}

/// Errors raised while building or loading a [`Curriculum`].
#[derive(Debug)]
pub enum CurriculumError {
    /// Two items share the same identifier.
    DuplicateId(u32),
    /// An item refers to a graduation that is not part of the ordered graduation list.
    UnknownGraduation {
        /// Identifier of the offending item.
        id: u32,
        /// Graduation named by the item.
        graduation: String,
    },
    /// The curriculum file could not be read.
    Io(std::io::Error),
    /// The curriculum file is not valid JSON for the expected shape.
    Json(serde_json::Error),
}

impl fmt::Display for CurriculumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "Curriculum item id {id} is declared twice"),
            Self::UnknownGraduation { id, graduation } => write!(
                f,
                "Curriculum item {id} refers to unknown graduation '{graduation}'"
            ),
            Self::Io(err) => write!(f, "Failed to read curriculum: {err}"),
            Self::Json(err) => write!(f, "Failed to parse curriculum: {err}"),
        }
    }
}

impl std::error::Error for CurriculumError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::DuplicateId(_) | Self::UnknownGraduation { .. } => None,
        }
    }
}

impl From<std::io::Error> for CurriculumError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for CurriculumError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// Accepted on-disk shapes: either a bare item array or an object with an explicit graduation order.
#[derive(Deserialize)]
#[serde(untagged)]
enum CurriculumFile {
    Explicit {
        graduations: Vec<String>,
        items: Vec<CurriculumItem>,
    },
    Items(Vec<CurriculumItem>),
}

/// Immutable, ordered curriculum table.
#[derive(Clone, Debug, Default)]
pub struct Curriculum {
    graduations: Vec<String>,
    items: Vec<CurriculumItem>,
    index: HashMap<u32, usize>,
}

impl Curriculum {
    /// Builds a curriculum with an explicit graduation order.
    pub fn new(
        graduations: impl Into<Vec<String>>,
        items: impl Into<Vec<CurriculumItem>>,
    ) -> Result<Self, CurriculumError> {
        let graduations = graduations.into();
        let items = items.into();

        let known: HashSet<&str> = graduations.iter().map(String::as_str).collect();
        let mut index = HashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            if !known.contains(item.graduation.as_str()) {
                return Err(CurriculumError::UnknownGraduation {
                    id: item.id,
                    graduation: item.graduation.clone(),
                });
            }
            if index.insert(item.id, position).is_some() {
                return Err(CurriculumError::DuplicateId(item.id));
            }
        }

        Ok(Self {
            graduations,
            items,
            index,
        })
    }

    /// Builds a curriculum whose graduation order is the order of first appearance in `items`.
    pub fn from_items(items: impl Into<Vec<CurriculumItem>>) -> Result<Self, CurriculumError> {
        let items = items.into();
        let mut graduations: Vec<String> = Vec::new();
        for item in &items {
            if !graduations.contains(&item.graduation) {
                graduations.push(item.graduation.clone());
            }
        }
        Self::new(graduations, items)
    }

    /// Parses a curriculum from JSON text.
    pub fn from_json(json: &str) -> Result<Self, CurriculumError> {
        match serde_json::from_str(json)? {
            CurriculumFile::Explicit { graduations, items } => Self::new(graduations, items),
            CurriculumFile::Items(items) => Self::from_items(items),
        }
    }

    /// Reads and parses a curriculum JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CurriculumError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Returns the graduation levels in their fixed order.
    pub fn graduations(&self) -> &[String] {
        &self.graduations
    }

    /// Returns the items in declaration order.
    pub fn items(&self) -> &[CurriculumItem] {
        &self.items
    }

    /// Returns the items of one graduation in declaration order.
    pub fn items_in<'a>(
        &'a self,
        graduation: &'a str,
    ) -> impl Iterator<Item = &'a CurriculumItem> + 'a {
        self.items
            .iter()
            .filter(move |item| item.graduation == graduation)
    }

    /// Resolves a curriculum id.
    pub fn get(&self, id: u32) -> Option<&CurriculumItem> {
        self.index.get(&id).map(|&position| &self.items[position])
    }

    /// Number of items in the table.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the table has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

//! PDF outline entries for booklet pages, written with `lopdf` after `genpdf` has rendered the
//! document.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::canvas::{Page, PageKind};

/// Errors that can occur while embedding bookmarks into a rendered PDF document.
#[derive(Debug)]
pub enum BookmarkError {
    /// The PDF bytes could not be parsed by `lopdf`.
    Parse(lopdf::Error),
    /// A required catalog entry was missing from the document trailer.
    MissingCatalog,
    /// The catalog object was not a dictionary, preventing outline injection.
    InvalidCatalog,
    /// An outline target points past the last page of the document.
    MissingPage {
        /// Title of the outline entry.
        title: String,
        /// The requested (1-indexed) page number that could not be resolved.
        page_number: usize,
    },
}

impl From<lopdf::Error> for BookmarkError {
    fn from(err: lopdf::Error) -> Self {
        Self::Parse(err)
    }
}

impl From<std::io::Error> for BookmarkError {
    fn from(err: std::io::Error) -> Self {
        Self::Parse(err.into())
    }
}

impl std::fmt::Display for BookmarkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "Failed to parse PDF bytes: {err}"),
            Self::MissingCatalog => write!(f, "PDF catalog entry is missing"),
            Self::InvalidCatalog => write!(f, "PDF catalog entry is not a dictionary"),
            Self::MissingPage { title, page_number } => write!(
                f,
                "Bookmark '{}' refers to missing page {}",
                title, page_number
            ),
        }
    }
}

impl std::error::Error for BookmarkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::MissingCatalog | Self::InvalidCatalog | Self::MissingPage { .. } => None,
        }
    }
}

/// One outline entry: a title and the 1-indexed physical page it opens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutlineTarget {
    pub title: String,
    pub page_number: usize,
}

/// Lists the outline entries for laid-out booklet pages: one per content page, titled with the
/// page heading.  The cover has no entry but still occupies page 1.
pub fn outline_for_pages(pages: &[Page]) -> Vec<OutlineTarget> {
    pages
        .iter()
        .enumerate()
        .filter_map(|(index, page)| match (page.kind, &page.heading) {
            (PageKind::Content { .. }, Some(heading)) => Some(OutlineTarget {
                title: heading.clone(),
                page_number: index + 1,
            }),
            _ => None,
        })
        .collect()
}

/// Adds a flat `/Outlines` tree to the rendered PDF, each entry a `/Dest [page /Fit]`.
pub fn apply_page_bookmarks(
    pdf_bytes: &[u8],
    targets: &[OutlineTarget],
) -> Result<Vec<u8>, BookmarkError> {
    if targets.is_empty() {
        return Ok(pdf_bytes.to_vec());
    }

    let mut document = Document::load_mem(pdf_bytes)?;
    let pages = document.get_pages();
    let mut entries = collect_outline_entries(&mut document, targets, &pages)?;

    let outlines_id = document.new_object_id();
    link_outline_entries(outlines_id, &mut document, &entries);
    insert_outlines_root(outlines_id, &mut document, &mut entries)?;

    let mut buffer = Vec::new();
    document.save_to(&mut buffer)?;
    Ok(buffer)
}

struct OutlineEntry {
    object_id: ObjectId,
    page_ref: ObjectId,
    title: String,
}

fn collect_outline_entries(
    document: &mut Document,
    targets: &[OutlineTarget],
    pages: &BTreeMap<u32, ObjectId>,
) -> Result<Vec<OutlineEntry>, BookmarkError> {
    targets
        .iter()
        .map(|target| {
            let page_ref = u32::try_from(target.page_number)
                .ok()
                .and_then(|number| pages.get(&number).copied())
                .ok_or_else(|| BookmarkError::MissingPage {
                    title: target.title.clone(),
                    page_number: target.page_number,
                })?;
            Ok(OutlineEntry {
                object_id: document.new_object_id(),
                page_ref,
                title: target.title.clone(),
            })
        })
        .collect()
}

fn link_outline_entries(outlines_id: ObjectId, document: &mut Document, entries: &[OutlineEntry]) {
    for (index, entry) in entries.iter().enumerate() {
        let mut dictionary = Dictionary::new();
        dictionary.set("Title", Object::string_literal(entry.title.as_str()));
        dictionary.set(
            "Dest",
            Object::Array(vec![
                Object::Reference(entry.page_ref),
                Object::Name("Fit".into()),
            ]),
        );
        dictionary.set("Parent", Object::Reference(outlines_id));

        if let Some(previous) = index.checked_sub(1).and_then(|i| entries.get(i)) {
            dictionary.set("Prev", Object::Reference(previous.object_id));
        }
        if let Some(next) = entries.get(index + 1) {
            dictionary.set("Next", Object::Reference(next.object_id));
        }

        document
            .objects
            .insert(entry.object_id, Object::Dictionary(dictionary));
    }
}

fn insert_outlines_root(
    outlines_id: ObjectId,
    document: &mut Document,
    entries: &mut [OutlineEntry],
) -> Result<(), BookmarkError> {
    let catalog_id = document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| BookmarkError::MissingCatalog)?;

    let mut dictionary = Dictionary::new();
    dictionary.set("Type", Object::Name("Outlines".into()));
    dictionary.set("Count", Object::Integer(entries.len() as i64));
    if let Some(first) = entries.first() {
        dictionary.set("First", Object::Reference(first.object_id));
    }
    if let Some(last) = entries.last() {
        dictionary.set("Last", Object::Reference(last.object_id));
    }
    document
        .objects
        .insert(outlines_id, Object::Dictionary(dictionary));

    let catalog = document
        .objects
        .get_mut(&catalog_id)
        .ok_or(BookmarkError::MissingCatalog)?
        .as_dict_mut()
        .map_err(|_| BookmarkError::InvalidCatalog)?;
    catalog.set("Outlines", Object::Reference(outlines_id));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;

    fn page(kind: PageKind, heading: Option<&str>) -> Page {
        Page {
            kind,
            heading: heading.map(str::to_string),
            canvas: Canvas::new(210.0, 297.0),
        }
    }

    #[test]
    fn outline_skips_the_cover_and_counts_it_as_page_one() {
        let pages = vec![
            page(PageKind::Cover, None),
            page(PageKind::Content { number: 1 }, Some("Upright Style")),
            page(PageKind::Content { number: 2 }, Some("Slanting Style")),
        ];
        assert_eq!(
            outline_for_pages(&pages),
            vec![
                OutlineTarget {
                    title: "Upright Style".into(),
                    page_number: 2
                },
                OutlineTarget {
                    title: "Slanting Style".into(),
                    page_number: 3
                },
            ]
        );
    }

    #[test]
    fn no_targets_leave_the_bytes_untouched() {
        let bytes = b"%PDF-1.3 not really".to_vec();
        assert_eq!(apply_page_bookmarks(&bytes, &[]).unwrap(), bytes);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let targets = [OutlineTarget {
            title: "x".into(),
            page_number: 1,
        }];
        assert!(matches!(
            apply_page_bookmarks(b"nope", &targets),
            Err(BookmarkError::Parse(_))
        ));
    }
}

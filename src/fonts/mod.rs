//! Font discovery for the booklet and share-card writers.
//!
//! The bundled Roboto family is looked up in, in order: `STUDY_BOOKLET_FONTS_DIR`,
//! `<exe dir>/assets/fonts` and `<crate>/assets/fonts`.  When none of them holds the files, the
//! Windows Arial family is used as a fallback (`STUDY_BOOKLET_WINDOWS_FONTS_DIR` or the system
//! font directory).

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::{Error, ErrorKind};
use genpdf::fonts::{FontData, FontFamily};
use log::{debug, warn};

/// Name of the bundled font family.
pub const DEFAULT_FONT_FAMILY_NAME: &str = "Roboto";

/// Environment variable overriding the bundled font directory.
pub const FONTS_DIR_ENV: &str = "STUDY_BOOKLET_FONTS_DIR";

/// Environment variable overriding the Windows fallback font directory.
pub const WINDOWS_FONTS_DIR_ENV: &str = "STUDY_BOOKLET_WINDOWS_FONTS_DIR";

const WINDOWS_FALLBACK_FAMILY_NAME: &str = "Arial";

/// File names of the four faces of a family.
struct FaceFiles {
    regular: &'static str,
    bold: &'static str,
    italic: &'static str,
    bold_italic: &'static str,
}

impl FaceFiles {
    fn all(&self) -> [&'static str; 4] {
        [self.regular, self.bold, self.italic, self.bold_italic]
    }
}

const BUNDLED_FONT_FILES: FaceFiles = FaceFiles {
    regular: "Roboto-Regular.ttf",
    bold: "Roboto-Bold.ttf",
    italic: "Roboto-Italic.ttf",
    bold_italic: "Roboto-BoldItalic.ttf",
};

const WINDOWS_FONT_FILES: FaceFiles = FaceFiles {
    regular: "arial.ttf",
    bold: "arialbd.ttf",
    italic: "ariali.ttf",
    bold_italic: "arialbi.ttf",
};

/// Face of a font family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl Face {
    /// Picks the face matching the given weight and slant.
    pub fn select(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => Face::Regular,
            (true, false) => Face::Bold,
            (false, true) => Face::Italic,
            (true, true) => Face::BoldItalic,
        }
    }
}

/// Resolved on-disk location of a complete font family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontFiles {
    family: &'static str,
    regular: PathBuf,
    bold: PathBuf,
    italic: PathBuf,
    bold_italic: PathBuf,
}

impl FontFiles {
    fn in_directory(directory: &Path, family: &'static str, files: &FaceFiles) -> Self {
        Self {
            family,
            regular: directory.join(files.regular),
            bold: directory.join(files.bold),
            italic: directory.join(files.italic),
            bold_italic: directory.join(files.bold_italic),
        }
    }

    /// Name of the resolved family.
    pub fn family(&self) -> &str {
        self.family
    }

    /// Path of one face.
    pub fn path(&self, face: Face) -> &Path {
        match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
            Face::Italic => &self.italic,
            Face::BoldItalic => &self.bold_italic,
        }
    }

    /// Reads the raw bytes of one face.
    pub fn read(&self, face: Face) -> Result<Vec<u8>, Error> {
        let path = self.path(face);
        std::fs::read(path).map_err(|err| {
            Error::new(
                format!("Failed to read font file {}: {}", path.display(), err),
                err,
            )
        })
    }

    /// Loads the family for use by `genpdf`.
    pub fn load_family(&self) -> Result<FontFamily<FontData>, Error> {
        Ok(FontFamily {
            regular: load_face(self.path(Face::Regular), "regular")?,
            bold: load_face(self.path(Face::Bold), "bold")?,
            italic: load_face(self.path(Face::Italic), "italic")?,
            bold_italic: load_face(self.path(Face::BoldItalic), "bold italic")?,
        })
    }
}

/// Directory holding the fonts shipped with the crate sources.
pub fn bundled_fonts_source_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts")
}

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var).and_then(|value| {
        let path = PathBuf::from(value);
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    })
}

fn font_directory_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = env_path(FONTS_DIR_ENV) {
        candidates.push(path);
    }

    if let Ok(current_exe) = env::current_exe() {
        if let Some(bin_dir) = current_exe.parent() {
            let candidate = bin_dir.join("assets/fonts");
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }

    let manifest_candidate = bundled_fonts_source_dir();
    if !candidates.contains(&manifest_candidate) {
        candidates.push(manifest_candidate);
    }

    candidates
}

fn missing_font_files(path: &Path, files: &FaceFiles) -> Vec<&'static str> {
    files
        .all()
        .into_iter()
        .filter(|name| !path.join(name).is_file())
        .collect()
}

fn resolve_bundled_fonts() -> Result<FontFiles, Error> {
    let mut attempts = Vec::new();

    for candidate in font_directory_candidates() {
        let exists = candidate.is_dir();
        let missing = missing_font_files(&candidate, &BUNDLED_FONT_FILES);

        if exists && missing.is_empty() {
            debug!("using bundled fonts from {}", candidate.display());
            return Ok(FontFiles::in_directory(
                &candidate,
                DEFAULT_FONT_FAMILY_NAME,
                &BUNDLED_FONT_FILES,
            ));
        }

        let reason = if !exists {
            format!("directory missing at {}", candidate.display())
        } else {
            format!("missing files [{}]", missing.join(", "))
        };
        attempts.push(format!("{} ({})", candidate.display(), reason));
    }

    let summary = if attempts.is_empty() {
        "no search paths were available".to_owned()
    } else {
        attempts.join(", ")
    };

    Err(Error::new(
        format!(
            "Unable to locate bundled font directory. Checked: {}. Set {} to a directory holding the Roboto family.",
            summary, FONTS_DIR_ENV
        ),
        io::Error::new(io::ErrorKind::NotFound, "bundled fonts directory not found"),
    ))
}

fn windows_font_directory() -> Option<PathBuf> {
    if let Some(path) = env_path(WINDOWS_FONTS_DIR_ENV) {
        return Some(path);
    }

    #[cfg(windows)]
    {
        for var in ["WINDIR", "SystemRoot"] {
            if let Some(root) = env_path(var) {
                let candidate = root.join("Fonts");
                if candidate.is_dir() {
                    return Some(candidate);
                }
            }
        }
    }

    None
}

fn resolve_windows_fonts() -> Result<FontFiles, Error> {
    let directory = windows_font_directory().ok_or_else(|| {
        Error::new(
            "Windows font directory not found for fallback",
            io::Error::new(io::ErrorKind::NotFound, "windows fonts directory not found"),
        )
    })?;

    let missing = missing_font_files(&directory, &WINDOWS_FONT_FILES);
    if !missing.is_empty() {
        return Err(Error::new(
            format!(
                "Windows fallback fonts missing in {}: [{}]",
                directory.display(),
                missing.join(", ")
            ),
            io::Error::new(io::ErrorKind::NotFound, "windows fallback fonts missing"),
        ));
    }

    Ok(FontFiles::in_directory(
        &directory,
        WINDOWS_FALLBACK_FAMILY_NAME,
        &WINDOWS_FONT_FILES,
    ))
}

fn load_face(path: &Path, face: &str) -> Result<FontData, Error> {
    FontData::load(path, None).map_err(|err| {
        let io_kind = if path.is_file() {
            io::ErrorKind::Other
        } else {
            io::ErrorKind::NotFound
        };
        Error::new(
            format!("Failed to load {} font at {}: {}", face, path.display(), err),
            io::Error::new(io_kind, err.to_string()),
        )
    })
}

fn fonts_missing(err: &Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::IoError(io_err)
            if io_err.kind() == io::ErrorKind::NotFound
                || io_err.kind() == io::ErrorKind::PermissionDenied
    )
}

/// Locates the bundled Roboto files, falling back to the Windows Arial family when they are
/// missing.
pub fn resolve_font_files() -> Result<FontFiles, Error> {
    match resolve_bundled_fonts() {
        Ok(files) => Ok(files),
        Err(err) if fonts_missing(&err) => match resolve_windows_fonts() {
            Ok(fallback) => {
                warn!(
                    "Bundled fonts unavailable ({}); falling back to Windows '{}' family.",
                    err, WINDOWS_FALLBACK_FAMILY_NAME
                );
                Ok(fallback)
            }
            Err(fallback_err) => {
                warn!(
                    "Bundled fonts unavailable ({}); Windows fallback failed: {}",
                    err, fallback_err
                );
                Err(Error::new(
                    format!(
                        "Bundled fonts unavailable and Windows fallback failed: {}",
                        fallback_err
                    ),
                    io::Error::new(io::ErrorKind::NotFound, "default fonts are not available"),
                ))
            }
        },
        Err(err) => Err(err),
    }
}

/// Returns the default font family as a `genpdf` font family definition.
pub fn default_font_family() -> Result<FontFamily<FontData>, Error> {
    resolve_font_files()?.load_family()
}

/// Indicates whether a complete font family can be found.
pub fn default_fonts_available() -> bool {
    resolve_font_files().is_ok()
}

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization as _;

use crate::error::ContextError;

/// The standard round bullet every list marker is converted to.
pub const BULLET: char = '\u{2022}';

/// The private-use bullet word processors emit when the Symbol font is used for lists.
const SYMBOL_FONT_BULLET: char = '\u{f0b7}';

/// Extensions (lowercase) accepted for the photo.
const PHOTO_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];

/// A hyphen followed by whitespace at the start of the text or of any line.
static LEADING_HYPHEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|\n)-\s+").unwrap());

/// A piece of resume text loaded from a single file of the content directory.
/// An empty fragment stands for a file that does not exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    raw: String,
    normalized: String,
}

impl Fragment {
    pub fn from_raw<S: Into<String>>(raw: S) -> Self {
        let raw = raw.into();
        let normalized = normalize_fragment(&raw);
        Fragment { raw, normalized }
    }

    pub fn empty() -> Self {
        Fragment::default()
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }
}

/// Normalizes the text of a fragment:
///
/// 1. leading and trailing whitespace is stripped,
/// 2. the text is brought to the NFKD form,
/// 3. the Symbol-font bullet is replaced with the standard round bullet,
/// 4. every line starting with a hyphen followed by whitespace becomes a bullet line.
///
/// Stripping happens again after the decomposition, since a few compatibility characters
/// decompose into a leading space and the normalization has to be idempotent.
pub fn normalize_fragment(raw: &str) -> String {
    let decomposed = raw.trim().nfkd().collect::<String>();
    let decomposed = decomposed
        .trim()
        .replace(SYMBOL_FONT_BULLET, &BULLET.to_string());

    LEADING_HYPHEN
        .replace_all(&decomposed, format!("${{1}}{BULLET} ").as_str())
        .into_owned()
}

/// The directory holding the plain-text fragments of the resume and the photo subdirectory.
#[derive(Debug, Clone)]
pub struct ContentDirectory {
    root: PathBuf,
    photo_subdirectory: PathBuf,
}

impl ContentDirectory {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(root: P, photo_subdirectory: Q) -> Self {
        ContentDirectory {
            root: root.into(),
            photo_subdirectory: photo_subdirectory.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reads the fragment stored under the given file name. A file that doesn't exist is
    /// not an error: it yields an empty fragment, which leaves its section out of the resume.
    pub fn read_fragment(&self, file_name: &str) -> Result<Fragment, ContextError> {
        let fragment_path = self.root.join(file_name);
        match std::fs::read_to_string(&fragment_path) {
            Ok(raw) => {
                let fragment = Fragment::from_raw(raw);
                log::debug!(
                    "Loaded the fragment {:?} ({} characters)",
                    file_name,
                    fragment.as_str().chars().count()
                );
                Ok(fragment)
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("The fragment {:?} does not exist, skipping it", file_name);
                Ok(Fragment::empty())
            }
            Err(error) => Err(ContextError::with_error(
                format!("Unable to read the fragment {:?}", fragment_path),
                &error,
            )),
        }
    }

    /// Returns the first file of the photo subdirectory, in file-name order, which has an
    /// image extension. A missing subdirectory simply means there is no photo.
    pub fn find_photo(&self) -> Result<Option<PathBuf>, ContextError> {
        let photo_directory = self.root.join(&self.photo_subdirectory);
        if !photo_directory.is_dir() {
            return Ok(None);
        }

        let entries = std::fs::read_dir(&photo_directory).map_err(|error| {
            ContextError::with_error(
                format!("Unable to list the photo directory {:?}", photo_directory),
                &error,
            )
        })?;
        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|error| {
                ContextError::with_error(
                    format!("Unable to list the photo directory {:?}", photo_directory),
                    &error,
                )
            })?;
            candidates.push(entry.path());
        }
        candidates.sort();

        Ok(candidates.into_iter().find(|path| has_photo_extension(path)))
    }
}

fn has_photo_extension(path: &Path) -> bool {
    path.file_name()
        .map(|file_name| file_name.to_string_lossy().to_lowercase())
        .is_some_and(|file_name| {
            PHOTO_EXTENSIONS
                .iter()
                .any(|extension| file_name.ends_with(extension))
        })
}

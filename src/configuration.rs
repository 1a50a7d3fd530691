use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ContextError;

/// The family the composer tries to register first, everything else is a fallback.
pub const PREFERRED_FONT_FAMILY: &str = "Arial";

/// Where the composer reads its fragments from, where it writes the resume to and which
/// TrueType families it is allowed to embed. Every field has a default, so a configuration
/// file only needs to mention what it overrides.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ComposerConfiguration {
    pub content_directory: PathBuf,
    /// Resolved relative to the content directory.
    pub photo_subdirectory: PathBuf,
    pub output_directory: PathBuf,
    /// Tried in order, the first family whose three styles all load is used.
    pub font_candidates: Vec<FontCandidate>,
}

/// The font files of one TrueType family, one per style used by the resume.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FontCandidate {
    pub font_family: String,
    pub regular_font_path: PathBuf,
    pub bold_font_path: PathBuf,
    pub italic_font_path: PathBuf,
}

impl FontCandidate {
    fn new(font_family: &str, directory: &str, regular: &str, bold: &str, italic: &str) -> Self {
        let directory = Path::new(directory);
        FontCandidate {
            font_family: font_family.to_string(),
            regular_font_path: directory.join(regular),
            bold_font_path: directory.join(bold),
            italic_font_path: directory.join(italic),
        }
    }
}

impl Default for ComposerConfiguration {
    fn default() -> Self {
        ComposerConfiguration {
            content_directory: PathBuf::from("content"),
            photo_subdirectory: PathBuf::from("photo"),
            output_directory: PathBuf::from("resumes"),
            font_candidates: default_font_candidates(),
        }
    }
}

/// The well-known host locations of Arial, followed by its metric-compatible Liberation Sans.
fn default_font_candidates() -> Vec<FontCandidate> {
    vec![
        FontCandidate::new(
            PREFERRED_FONT_FAMILY,
            r"C:\Windows\Fonts",
            "arial.ttf",
            "arialbd.ttf",
            "ariali.ttf",
        ),
        FontCandidate::new(
            PREFERRED_FONT_FAMILY,
            "/usr/share/fonts/truetype/msttcorefonts",
            "Arial.ttf",
            "Arial_Bold.ttf",
            "Arial_Italic.ttf",
        ),
        FontCandidate::new(
            PREFERRED_FONT_FAMILY,
            "/Library/Fonts",
            "Arial.ttf",
            "Arial Bold.ttf",
            "Arial Italic.ttf",
        ),
        FontCandidate::new(
            "LiberationSans",
            "/usr/share/fonts/truetype/liberation",
            "LiberationSans-Regular.ttf",
            "LiberationSans-Bold.ttf",
            "LiberationSans-Italic.ttf",
        ),
    ]
}

impl ComposerConfiguration {
    pub fn from_path(configuration_file_path: &Path) -> Result<Self, ContextError> {
        let configuration_file_contents = std::fs::read_to_string(configuration_file_path)
            .map_err(|error| {
                ContextError::with_error(
                    format!(
                        "Failed to read the configuration file {:?}",
                        configuration_file_path
                    ),
                    &error,
                )
            })?;
        let configuration: ComposerConfiguration =
            serde_json::from_str(&configuration_file_contents).map_err(|error| {
                ContextError::with_error(
                    format!(
                        "Failed to parse the configuration file {:?}",
                        configuration_file_path
                    ),
                    &error,
                )
            })?;

        Ok(configuration)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{ComposerConfiguration, PREFERRED_FONT_FAMILY};

    #[test]
    fn partial_configuration_keeps_the_defaults() {
        let directory = tempfile::tempdir().unwrap();
        let configuration_path = directory.path().join("resumr.json");
        std::fs::write(&configuration_path, r#"{ "outputDirectory": "out/pdf" }"#).unwrap();

        let configuration = ComposerConfiguration::from_path(&configuration_path).unwrap();

        assert_eq!(configuration.output_directory, PathBuf::from("out/pdf"));
        assert_eq!(configuration.content_directory, PathBuf::from("content"));
        assert_eq!(
            configuration.font_candidates[0].font_family,
            PREFERRED_FONT_FAMILY
        );
        assert_eq!(configuration.photo_subdirectory, PathBuf::from("photo"));
    }

    #[test]
    fn malformed_configuration_is_reported_with_its_path() {
        let directory = tempfile::tempdir().unwrap();
        let configuration_path = directory.path().join("broken.json");
        std::fs::write(&configuration_path, "{ not json").unwrap();

        let error = ComposerConfiguration::from_path(&configuration_path).unwrap_err();

        assert!(error.context.starts_with("Failed to parse the configuration file"));
        assert!(error.source_error.is_some());
    }
}

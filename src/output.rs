use std::path::{Path, PathBuf};

use time::{macros::format_description, OffsetDateTime};

use crate::error::ContextError;

/// Stands in for the role in the file name when the role fragment is empty.
pub const FALLBACK_ROLE: &str = "Resume";

/// Replaces every character outside of `[A-Za-z0-9]` with an underscore, one per character.
pub fn sanitize_file_name_component(component: &str) -> String {
    component
        .chars()
        .map(|character| {
            if character.is_ascii_alphanumeric() {
                character
            } else {
                '_'
            }
        })
        .collect()
}

/// Formats the generation time as `YYYY-MM-DD_HH-MM-SS`.
pub fn format_timestamp(timestamp: OffsetDateTime) -> Result<String, ContextError> {
    timestamp
        .format(format_description!(
            "[year]-[month]-[day]_[hour]-[minute]-[second]"
        ))
        .map_err(|error| ContextError::with_error("Failed to format the timestamp", &error))
}

/// Builds `<name>_<role>_<timestamp>.pdf` out of the sanitized name and role.
pub fn derive_output_file_name(
    name: &str,
    role: &str,
    timestamp: OffsetDateTime,
) -> Result<String, ContextError> {
    let role = if role.is_empty() {
        FALLBACK_ROLE.to_string()
    } else {
        sanitize_file_name_component(role)
    };

    Ok(format!(
        "{}_{}_{}.pdf",
        sanitize_file_name_component(name),
        role,
        format_timestamp(timestamp)?
    ))
}

/// Creates the output directory if needed and returns the path the resume is written to.
pub fn prepare_output_path(
    output_directory: &Path,
    name: &str,
    role: &str,
    timestamp: OffsetDateTime,
) -> Result<PathBuf, ContextError> {
    std::fs::create_dir_all(output_directory).map_err(|error| {
        ContextError::with_error(
            format!("Unable to create the output directory {:?}", output_directory),
            &error,
        )
    })?;

    Ok(output_directory.join(derive_output_file_name(name, role, timestamp)?))
}

/// The local time, or UTC when the local offset can't be determined.
pub fn current_timestamp() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|error| {
        log::debug!("Unable to determine the local offset ({error}), using UTC");
        OffsetDateTime::now_utc()
    })
}

// Utility functions
pub mod fs;
pub mod io;

pub use self::io::{open_input, open_output, python_bool, require_columns, serialize_bool};

use chrono::DateTime;

/// POSIX timestamp of an ISO 8601 date like `2018-02-07T12:00:00.000Z`
pub fn parse_iso8601(date: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(date.trim())
        .ok()
        .map(|d| d.timestamp())
}

/// Original and latest name of a repository row
///
/// The latest name is the `renamed_to` column if it is set, the original
/// `full_name` otherwise.
pub fn get_latest_repo_name<'a>(full_name: &'a str, renamed_to: Option<&'a str>) -> (&'a str, &'a str) {
    let latest = renamed_to
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(full_name);
    (full_name, latest)
}

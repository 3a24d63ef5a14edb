pub mod add_gradle_info;
pub mod clone;
pub mod draw_commits;
pub mod get_gradle_files;
pub mod get_play_data;
pub mod get_repo_data;
pub mod match_packages;
pub mod mirror_empty_repos;
pub mod play_category;
pub mod prepare_neo4j_import;
pub mod store_repo_data;
pub mod verify_play_link;

use crate::utils::require_columns;
use crate::Result;
use csv::StringRecord;
use std::io::{BufRead, BufReader, Read};

/// Columns appended by `add-gradle-info` and `get-gradle-files`
pub const GRADLE_COLUMNS: [&str; 3] = ["has_gradle_files", "renamed_to", "not_found"];

/// Position of `column` in `headers`, logging and failing if it is missing
pub(crate) fn column(headers: &StringRecord, column: &str) -> Result<usize> {
    require_columns(headers, &[column])?;
    crate::play::details::column_index(headers, column)
}

/// `headers` followed by `columns`
pub(crate) fn extend_headers(headers: &StringRecord, columns: &[&str]) -> StringRecord {
    let mut extended = headers.clone();
    for column in columns {
        extended.push_field(column);
    }
    extended
}

/// Reader for CSV input without a header line and rows of varying length
pub(crate) fn headerless_reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input)
}

/// Trimmed, non-empty lines of `input`
pub(crate) fn read_lines<R: Read>(input: R) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for line in BufReader::new(input).lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_headers() {
        let headers = StringRecord::from(vec!["id", "full_name"]);
        let extended = extend_headers(&headers, &GRADLE_COLUMNS);
        assert_eq!(
            extended.iter().collect::<Vec<_>>(),
            vec!["id", "full_name", "has_gradle_files", "renamed_to", "not_found"]
        );
    }

    #[test]
    fn test_read_lines() {
        let lines = read_lines(" com.a \n\ncom.b\r\n".as_bytes()).unwrap();
        assert_eq!(lines, vec!["com.a", "com.b"]);
    }

    #[test]
    fn test_column() {
        let headers = StringRecord::from(vec!["id", "full_name"]);
        assert_eq!(column(&headers, "full_name").unwrap(), 1);
        assert!(column(&headers, "commit_count").is_err());
    }
}

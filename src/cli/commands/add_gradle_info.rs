//! Reconstruct gradle columns from an existing download directory
//!
//! Earlier downloads stored gradle files without writing a table. This
//! command derives `has_gradle_files` and `renamed_to` from the contents of
//! the download directory. Whether a repository was not found cannot be
//! recovered, so `not_found` stays empty.

use super::{column, extend_headers, GRADLE_COLUMNS};
use crate::utils::fs::{get_new_repo_name, has_gradle_files};
use crate::utils::python_bool;
use crate::Result;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Copy the table in `repo_list` to `output`, extended by the gradle columns
///
/// Returns the number of rows written.
pub fn update_csv_table<R: Read, W: Write>(repo_list: R, outdir: &Path, output: W) -> Result<usize> {
    let mut reader = csv::Reader::from_reader(repo_list);
    let headers = reader.headers()?.clone();
    let full_name = column(&headers, "full_name")?;

    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(&extend_headers(&headers, &GRADLE_COLUMNS))?;

    let mut rows = 0;
    for record in reader.records() {
        let mut record = record?;
        let repo_name = record.get(full_name).unwrap_or_default().to_string();
        debug!("Look up gradle files of {}", repo_name);

        record.push_field(python_bool(has_gradle_files(&repo_name, outdir)));
        record.push_field(&get_new_repo_name(&repo_name, outdir));
        record.push_field("");
        writer.write_record(&record)?;
        rows += 1;
    }

    writer.flush()?;
    Ok(rows)
}

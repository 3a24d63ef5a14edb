use crate::neo4j::{prepare_for_neo4j_import, ImportStats};
use crate::Result;
use std::path::Path;
use tracing::info;

/// Convert the collected data in `input_dir` into import files in
/// `output_dir`
pub fn prepare_neo4j_import(input_dir: &Path, output_dir: &Path) -> Result<ImportStats> {
    info!("------- Arguments: -------");
    info!("input-dir: {}", input_dir.display());
    info!("output-dir: {}", output_dir.display());
    info!("------- Arguments end -------");

    prepare_for_neo4j_import(input_dir, output_dir)
}

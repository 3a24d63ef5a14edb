use super::read_lines;
use crate::play::BulkDetails;
use crate::Result;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Download metadata for each package name in `input`, one per line, to
/// `<outdir>/<package>.json`
pub async fn download_package_details<R: Read>(input: R, outdir: &Path, bulk: &BulkDetails) -> Result<usize> {
    let package_names = read_lines(input)?;
    info!("Download details of {} packages", package_names.len());

    let written = bulk.download(package_names, outdir).await?;
    info!("Stored details of {} packages in {}", written, outdir.display());
    Ok(written)
}

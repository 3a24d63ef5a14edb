use crate::error::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Manual testing indicates a limit of 1000 packages per call
pub const BULK_SIZE: usize = 900;

/// Pause between two bulk requests
pub const DELAY: Duration = Duration::from_secs(12);

/// Group items into chunks of `n`, the last chunk may be shorter
pub fn grouper<I>(items: I, n: usize) -> impl Iterator<Item = Vec<I::Item>>
where
    I: IntoIterator,
{
    let mut items = items.into_iter();
    std::iter::from_fn(move || {
        let group: Vec<_> = items.by_ref().take(n.max(1)).collect();
        (!group.is_empty()).then_some(group)
    })
}

/// Downloads package metadata from Google Play with the `gp-bulk-details`
/// binary of node-google-play-cli
pub struct BulkDetails {
    bin: PathBuf,
    delay: Duration,
}

impl BulkDetails {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            delay: DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Metadata for every package name
    ///
    /// Metadata is `null` for packages that are not accessible. If the
    /// binary fails, the failure is logged and no metadata is returned.
    pub async fn fetch(&self, package_names: &[String]) -> Result<Vec<(String, Value)>> {
        let (Some(first), Some(last)) = (package_names.first(), package_names.last()) else {
            return Ok(Vec::new());
        };

        let output = Command::new(&self.bin).args(package_names).output().await?;

        if !output.status.success() {
            warn!("{} returned {}", self.bin.display(), output.status);
            debug!("{}", String::from_utf8_lossy(&output.stderr));
            debug!("First package: {}; last package: {}", first, last);
            return Ok(Vec::new());
        }

        let details: Vec<Value> = serde_json::from_slice(&output.stdout)?;
        Ok(package_names.iter().cloned().zip(details).collect())
    }

    /// Store metadata of each package in `<out_dir>/<package>.json`
    ///
    /// Existing files are overwritten. Returns the number of files written.
    pub async fn download<I>(&self, package_names: I, out_dir: &Path) -> Result<usize>
    where
        I: IntoIterator<Item = String>,
    {
        std::fs::create_dir_all(out_dir)?;
        let mut written = 0;

        let packages = package_names
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        for group in grouper(packages, BULK_SIZE) {
            info!("Fetch details for {} packages", group.len());
            for (package, meta_data) in self.fetch(&group).await? {
                let path = out_dir.join(format!("{package}.json"));
                std::fs::write(&path, serde_json::to_string_pretty(&meta_data)?)?;
                written += 1;
            }
            tokio::time::sleep(self.delay).await;
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouper() {
        let groups: Vec<Vec<i32>> = grouper(1..=7, 3).collect();
        assert_eq!(groups, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);
        assert_eq!(grouper(Vec::<i32>::new(), 3).count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_nothing() {
        let bulk = BulkDetails::new("/nonexistent/gp-bulk-details");
        assert!(bulk.fetch(&[]).await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_download_writes_one_file_per_package() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("fake-bulk-details");
        std::fs::write(
            &bin,
            "#!/bin/sh\necho '[{\"title\": \"A\"}, null]'\n",
        )
        .unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

        let out = dir.path().join("out");
        let bulk = BulkDetails::new(&bin).with_delay(Duration::ZERO);
        let written = bulk
            .download(vec![" com.a\n".to_string(), "com.b".to_string()], &out)
            .await
            .unwrap();

        assert_eq!(written, 2);
        let a: Value =
            serde_json::from_str(&std::fs::read_to_string(out.join("com.a.json")).unwrap()).unwrap();
        assert_eq!(a["title"], "A");
        assert_eq!(std::fs::read_to_string(out.join("com.b.json")).unwrap(), "null");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_binary_yields_no_details() {
        let bulk = BulkDetails::new("false");
        let details = bulk.fetch(&["com.a".to_string()]).await.unwrap();
        assert!(details.is_empty());
    }
}

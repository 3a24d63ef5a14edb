use super::{column, extend_headers, GRADLE_COLUMNS};
use crate::github::{FullName, GitHubClient};
use crate::utils::fs::symlink_repo;
use crate::utils::python_bool;
use crate::{Error, Result};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Code search for files with `build.gradle` or `settings.gradle` anywhere in
/// the path, which includes unrelated files like `settings.gradle/notes.txt`
pub fn gradle_search_query(repo_name: &str) -> String {
    format!("repo:{repo_name} in:path build.gradle OR settings.gradle")
}

/// Download the gradle files of `repo_name` to `<outdir>/<repo_name>/<path>`
///
/// Returns whether the repository contains at least one gradle file.
pub async fn download_gradle_files(repo_name: &str, github: &mut GitHubClient, outdir: &Path) -> Result<bool> {
    let mut has_gradle_files = false;

    let results = github.search_code(&gradle_search_query(repo_name)).await?;
    for result in results.iter().filter(|r| r.path.ends_with(".gradle")) {
        has_gradle_files = true;

        let contents = github
            .file_contents(&result.repository.full_name, &result.path)
            .await?
            .unwrap_or_else(|| {
                warn!("Cannot download {} of {}", result.path, result.repository.full_name);
                Vec::new()
            });

        let path = outdir.join(repo_name).join(&result.path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents)?;
        debug!("Stored {}", path.display());
    }

    Ok(has_gradle_files)
}

/// Download gradle files, following renamed repositories
///
/// Code search answers 422 for unknown repository names, renamed ones
/// included. In that case the current name is requested from GitHub and the
/// download is retried with it. Returns the canonical name together with
/// whether gradle files were found, `None` if the repository does not exist.
pub async fn catch_renamed_repo(
    repo_name: &str,
    github: &mut GitHubClient,
    outdir: &Path,
) -> Result<Option<(String, bool)>> {
    let mut repo_name = repo_name.to_string();

    loop {
        let error = match download_gradle_files(&repo_name, github, outdir).await {
            Ok(has_gradle_files) => return Ok(Some((repo_name, has_gradle_files))),
            Err(error @ Error::Api { status: 422, .. }) => error,
            Err(error) => return Err(error),
        };

        let full_name = FullName::parse(&repo_name)?;
        match github.repository(&full_name.owner, &full_name.name).await? {
            None => {
                info!("Repo does not exist: {}", repo_name);
                return Ok(None);
            }
            Some(repo) if repo.full_name != repo_name => {
                info!("Repo was moved: {} -> {}", repo_name, repo.full_name);
                repo_name = repo.full_name;
            }
            Some(_) => {
                error!("{}", error.log_safe());
                return Err(error);
            }
        }
    }
}

/// Download gradle files for every repository in `repo_list` and write the
/// table extended by the gradle columns to `output`
pub async fn get_gradle_files<R: Read, W: Write>(
    repo_list: R,
    github: &mut GitHubClient,
    outdir: &Path,
    output: W,
) -> Result<usize> {
    let mut reader = csv::Reader::from_reader(repo_list);
    let headers = reader.headers()?.clone();
    let full_name = column(&headers, "full_name")?;

    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(&extend_headers(&headers, &GRADLE_COLUMNS))?;

    let mut rows = 0;
    for record in reader.records() {
        let mut record = record?;
        let repo_name = record.get(full_name).unwrap_or_default().to_string();
        info!("Get gradle files in {}", repo_name);

        let (has_gradle_files, renamed_to, not_found) =
            match catch_renamed_repo(&repo_name, github, outdir).await? {
                Some((new_name, has_gradle_files)) => {
                    let renamed_to = if new_name != repo_name {
                        symlink_repo(outdir, &repo_name, &new_name)?;
                        new_name
                    } else {
                        String::new()
                    };
                    (has_gradle_files, renamed_to, false)
                }
                None => (false, String::new(), true),
            };

        record.push_field(python_bool(has_gradle_files));
        record.push_field(&renamed_to);
        record.push_field(python_bool(not_found));
        writer.write_record(&record)?;
        writer.flush()?;
        rows += 1;
    }

    Ok(rows)
}

//! Collect metadata of commits, branches and tags of mirrored repositories
//!
//! The graph database is built without access to GitLab, so everything it
//! needs is stored in one CSV directory per repository first.

use super::column;
use crate::git::{BareGit, GitHistory};
use crate::gitlab::{GitLabClient, Project};
use crate::{Error, Result};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracing::{error, info};

pub const SNAPSHOT_FIELDS: &[&str] = &["web_url", "created_at"];

pub const COMMIT_FIELDS: &[&str] = &[
    "id",
    "short_id",
    "title",
    "message",
    "additions",
    "deletions",
    "total",
    "author_name",
    "author_email",
    "committer_name",
    "committer_email",
    "authored_date",
    "committed_date",
    "parent_ids",
];

pub const BRANCH_FIELDS: &[&str] = &["commit_hash", "branch_name"];

pub const TAG_FIELDS: &[&str] = &["commit_hash", "tag_name", "tag_message"];

pub const PATHS_FIELDS: &[&str] = &[
    "package",
    "manifestPaths",
    "gradleConfigPaths",
    "mavenConfigPaths",
];

#[derive(Debug, Serialize)]
struct SnapshotRow<'a> {
    web_url: &'a str,
    created_at: &'a str,
}

#[derive(Debug, Serialize)]
struct BranchRow<'a> {
    commit_hash: &'a str,
    branch_name: &'a str,
}

#[derive(Debug, Serialize)]
struct TagRow<'a> {
    commit_hash: &'a str,
    tag_name: &'a str,
    tag_message: &'a str,
}

/// Files of a repository that define `package`, paths comma separated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationPaths {
    pub package: String,
    pub manifest_paths: String,
    pub gradle_config_paths: String,
    pub maven_config_paths: String,
}

/// Write `rows` below a header of `fields`, which is written even without rows
fn write_csv<T, I>(dir: &Path, filename: &str, fields: &[&str], rows: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let path = dir.join(filename);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)?;
    writer.write_record(fields)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Manifest, gradle and Maven files in the default branch of `project` for
/// each package
pub async fn implementation_properties(
    project: &Project,
    packages: &[&str],
    git: &BareGit,
) -> Result<Vec<ImplementationPaths>> {
    let branch = project.default_branch.as_deref();
    let mut rows = Vec::with_capacity(packages.len());

    for package in packages {
        let manifest = git.find_manifest_paths(package, branch).await?;
        let gradle = git.find_gradle_config_paths(package, branch).await?;
        let maven = git.find_maven_config_paths(package, branch).await?;
        rows.push(ImplementationPaths {
            package: package.to_string(),
            manifest_paths: manifest.join(","),
            gradle_config_paths: gradle.join(","),
            maven_config_paths: maven.join(","),
        });
    }

    Ok(rows)
}

/// Store `snapshot.csv`, `commits.csv`, `branches.csv`, `tags.csv` and
/// `paths.csv` of one repository in `repo_dir`
pub async fn store_project_data(
    project: &Project,
    packages: &[&str],
    gitlab: &GitLabClient,
    git: BareGit,
    repo_dir: &Path,
) -> Result<()> {
    write_csv(
        repo_dir,
        "snapshot.csv",
        SNAPSHOT_FIELDS,
        [SnapshotRow {
            web_url: &project.web_url,
            created_at: project.created_at.as_deref().unwrap_or_default(),
        }],
    )?;

    let history = GitHistory::new(git);
    let commits = history.commits().await?;
    write_csv(
        repo_dir,
        "commits.csv",
        COMMIT_FIELDS,
        commits.iter().map(|c| c.to_row()),
    )?;

    let branches = gitlab.branches(project.id).await?;
    write_csv(
        repo_dir,
        "branches.csv",
        BRANCH_FIELDS,
        branches.iter().map(|b| BranchRow {
            commit_hash: &b.commit.id,
            branch_name: &b.name,
        }),
    )?;

    let tags = gitlab.tags(project.id).await?;
    write_csv(
        repo_dir,
        "tags.csv",
        TAG_FIELDS,
        tags.iter().map(|t| TagRow {
            commit_hash: &t.commit.id,
            tag_name: &t.name,
            tag_message: t.message.as_deref().unwrap_or_default(),
        }),
    )?;

    let paths = implementation_properties(project, packages, history.git()).await?;
    write_csv(repo_dir, "paths.csv", PATHS_FIELDS, paths)?;

    Ok(())
}

/// Store data of every repository in `repo_list` in `<outdir>/<id>/`
///
/// Repositories whose GitLab project cannot be retrieved are logged and
/// skipped. Returns the number of repositories stored.
pub async fn store_repository_info<R: Read>(
    repo_list: R,
    gitlab: &GitLabClient,
    repository_prefix: &Path,
    git_bin: &Path,
    outdir: &Path,
) -> Result<usize> {
    let mut reader = csv::Reader::from_reader(repo_list);
    let headers = reader.headers()?.clone();
    let id = column(&headers, "id")?;
    let full_name = column(&headers, "full_name")?;
    let clone_project_id = column(&headers, "clone_project_id")?;
    let clone_project_path = column(&headers, "clone_project_path")?;
    let packages = column(&headers, "packages")?;

    let mut stored = 0;
    for record in reader.records() {
        let record = record?;
        let field = |index: usize| record.get(index).unwrap_or_default();
        info!(
            "Repo info: ({}, {}, {}, {})",
            field(id),
            field(full_name),
            field(clone_project_id),
            field(clone_project_path)
        );

        let repo_dir = outdir.join(field(id));
        std::fs::create_dir_all(&repo_dir)?;
        let package_names: Vec<&str> = field(packages)
            .split(',')
            .filter(|p| !p.is_empty())
            .collect();

        let project_id: u64 = field(clone_project_id).trim().parse().map_err(|_| {
            Error::Validation(format!(
                "Invalid clone_project_id {:?} for {}",
                field(clone_project_id),
                field(full_name)
            ))
        })?;

        let project = match gitlab.project(project_id).await {
            Ok(Some(project)) => project,
            Ok(None) => {
                error!("Could not get GitLab project with ID: {}", project_id);
                error!("These are repository details: {:?}", record);
                continue;
            }
            Err(e @ Error::Api { .. }) => {
                error!("Could not get GitLab project with ID: {}", project_id);
                error!("These are repository details: {:?}", record);
                error!("{}", e);
                continue;
            }
            Err(e) => return Err(e),
        };

        let repository_path = repository_prefix.join(format!("{}.git", project.path));
        info!("Use local git repository at {}", repository_path.display());
        let git = BareGit::new(git_bin, repository_path);

        store_project_data(&project, &package_names, gitlab, git, &repo_dir).await?;
        stored += 1;
    }

    Ok(stored)
}

//! Some repositories are empty after mirroring them to GitLab. Delete those
//! projects and import them from GitHub once more.

use super::{column, read_lines};
use crate::gitlab::{GitLabClient, GithubToGitlabName, Project};
use crate::utils::get_latest_repo_name;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::{info, warn};

pub const OLD_REPOSITORY_DATA: &str = "input/github_repo_data.new.complete.utf8.csv";
pub const EMPTY_REPOSITORY_LIST: &str = "output/all-empty-repos-no-wikis.txt";

/// Namespace the mirrors live in on GitLab
pub const GITLAB_NAMESPACE: &str = "gitlab";

/// Time GitLab gets to delete projects before they are created again
pub const DELETE_DELAY: Duration = Duration::from_secs(5);

/// GitHub names, original and latest, by estimated GitLab name
pub type NamesByGitlabName = HashMap<String, BTreeSet<String>>;

/// Row of the output table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirroredRepo {
    pub github_full_name: String,
    pub clone_project_name: String,
    pub clone_project_path: String,
    pub clone_project_id: u64,
}

/// Index repository data by the name each repository has on GitLab
pub fn by_gitlab_name<R: Read>(repo_data: R) -> Result<NamesByGitlabName> {
    let mut reader = csv::Reader::from_reader(repo_data);
    let headers = reader.headers()?.clone();
    let full_name = column(&headers, "full_name")?;
    let renamed_to = headers.iter().position(|h| h == "renamed_to");

    let mut result = NamesByGitlabName::new();
    let mut rows = 0;
    for record in reader.records() {
        let record = record?;
        let name = record.get(full_name).unwrap_or_default();
        let (original, latest) =
            get_latest_repo_name(name, renamed_to.and_then(|i| record.get(i)));

        let names = result.entry(GithubToGitlabName::convert(name)).or_default();
        names.insert(original.to_string());
        names.insert(latest.to_string());
        rows += 1;
    }

    info!("Loaded repo data with {} entries", rows);
    Ok(result)
}

/// The single GitHub name known for `gitlab_repo_name`
pub fn find_github_name<'a>(gitlab_repo_name: &str, repos: &'a NamesByGitlabName) -> Option<&'a str> {
    let names = repos.get(gitlab_repo_name);
    match names.map(|n| n.len()).unwrap_or_default() {
        0 => {
            warn!("Cannot find any repos for {}", gitlab_repo_name);
            None
        }
        1 => names.and_then(|n| n.iter().next()).map(String::as_str),
        _ => {
            warn!("Too many repos for {}", gitlab_repo_name);
            None
        }
    }
}

async fn delete_repo(gitlab_repo_name: &str, gitlab: &GitLabClient) -> Result<()> {
    let path = format!("{GITLAB_NAMESPACE}/{gitlab_repo_name}");
    let Some(project) = gitlab.project_by_path(&path).await? else {
        warn!("Project {} does not exist.", gitlab_repo_name);
        return Ok(());
    };

    info!("Delete repo {} ({})", project.name, project.id);
    match gitlab.delete_project(project.id).await {
        Err(Error::NotFound(_)) => {
            warn!("Project {} does not exist.", gitlab_repo_name);
            Ok(())
        }
        result => result,
    }
}

async fn import_from_github(github_repo_name: &str, gitlab_repo_name: &str, gitlab: &GitLabClient) -> Result<Project> {
    let github_url = format!("https://github.com/{github_repo_name}.git");
    let project = gitlab.create_import_project(gitlab_repo_name, &github_url).await?;
    info!("Created new repo: {} ({})", project.name, project.id);
    Ok(project)
}

/// Delete each empty repository in `empty_repos` whose GitHub name is known
/// and import it from GitHub again, writing the new projects to `output`
pub async fn mirror_empty_repos<E: Read, D: Read, W: Write>(
    empty_repos: E,
    repo_data: D,
    gitlab: &GitLabClient,
    delete_delay: Duration,
    output: W,
) -> Result<Vec<MirroredRepo>> {
    let repos = by_gitlab_name(repo_data)?;
    let empty_repos = read_lines(empty_repos)?;
    info!("Loaded list with {} empty repos", empty_repos.len());

    let mut writer = csv::Writer::from_writer(output);

    let mut repo_names = Vec::new();
    for gitlab_repo_name in &empty_repos {
        let Some(github_repo_name) = find_github_name(gitlab_repo_name, &repos) else {
            continue;
        };
        repo_names.push((github_repo_name.to_string(), gitlab_repo_name.as_str()));
        delete_repo(gitlab_repo_name, gitlab).await?;
    }

    info!("Wait for {} seconds for GitLab to delete repos", delete_delay.as_secs());
    tokio::time::sleep(delete_delay).await;
    info!("Finished waiting: Continue");

    let mut mirrored = Vec::with_capacity(repo_names.len());
    for (github_repo_name, gitlab_repo_name) in repo_names {
        let project = import_from_github(&github_repo_name, gitlab_repo_name, gitlab).await?;
        let row = MirroredRepo {
            github_full_name: github_repo_name,
            clone_project_name: project.name,
            clone_project_path: project.path,
            clone_project_id: project.id,
        };
        writer.serialize(&row)?;
        writer.flush()?;
        mirrored.push(row);
    }

    if mirrored.is_empty() {
        writer.write_record([
            "github_full_name",
            "clone_project_name",
            "clone_project_path",
            "clone_project_id",
        ])?;
        writer.flush()?;
    }

    Ok(mirrored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const REPO_DATA: &str = "full_name,renamed_to\n\
                             Foo/Bar.App,\n\
                             old/name,new/name\n\
                             foo/bar-app,\n";

    #[test]
    fn test_by_gitlab_name() {
        let repos = by_gitlab_name(REPO_DATA.as_bytes()).unwrap();

        assert_eq!(
            repos["old_name"],
            BTreeSet::from(["old/name".to_string(), "new/name".to_string()])
        );
        assert_eq!(repos["foo_bar-app"].len(), 2);
    }

    #[test]
    fn test_find_github_name() {
        let repos = by_gitlab_name("full_name\nfoo/bar\n".as_bytes()).unwrap();
        assert_eq!(find_github_name("foo_bar", &repos), Some("foo/bar"));
        assert_eq!(find_github_name("missing", &repos), None);

        let ambiguous = by_gitlab_name(REPO_DATA.as_bytes()).unwrap();
        assert_eq!(find_github_name("foo_bar-app", &ambiguous), None);
    }

    #[tokio::test]
    async fn test_mirror_empty_repos() {
        let mut server = mockito::Server::new_async().await;
        let lookup = server
            .mock("GET", "/api/v4/projects/gitlab%2Ffoo_bar")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 3, "name": "foo_bar", "path": "foo_bar"}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/api/v4/projects/3")
            .with_status(202)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/api/v4/projects")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "name": "foo_bar",
                "import_url": "https://github.com/foo/bar.git"
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 4, "name": "foo_bar", "path": "foo_bar"}"#)
            .create_async()
            .await;

        let gitlab = GitLabClient::new(&server.url(), Some("secret"), 5).unwrap();
        let mut output = Vec::new();
        let mirrored = mirror_empty_repos(
            "foo_bar\nunknown\n".as_bytes(),
            "full_name\nfoo/bar\n".as_bytes(),
            &gitlab,
            Duration::ZERO,
            &mut output,
        )
        .await
        .unwrap();

        lookup.assert_async().await;
        delete.assert_async().await;
        create.assert_async().await;
        assert_eq!(mirrored.len(), 1);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "github_full_name,clone_project_name,clone_project_path,clone_project_id\n\
             foo/bar,foo_bar,foo_bar,4\n"
        );
    }
}

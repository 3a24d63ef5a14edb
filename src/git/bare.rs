use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

const OPTION_GIT_DIR: &str = "--git-dir";
const OPTION_BARE: &str = "--bare";
const OPTION_PATTERN: &str = "-e";
const OPTIONS_END: &str = "--";
const COMMAND_GREP: &str = "grep";
const COMMAND_LOG: &str = "log";

/// One line of `git grep` output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrepMatch {
    pub treespec: String,
    pub path: String,
    /// Matching text, empty for `--name-only`
    pub text: String,
}

/// Run git commands on a bare repository without a working directory
#[derive(Debug, Clone)]
pub struct BareGit {
    git_bin: PathBuf,
    git_dir: PathBuf,
}

impl BareGit {
    pub fn new(git_bin: impl Into<PathBuf>, git_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_bin: git_bin.into(),
            git_dir: git_dir.into(),
        }
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Execute a git subcommand on the repository
    ///
    /// Arguments are passed to the process directly, no shell is involved.
    /// Returns stdout together with the exit status.
    pub async fn git(&self, command: &str, options: &[String]) -> Result<(Vec<u8>, i32)> {
        let output = Command::new(&self.git_bin)
            .arg(OPTION_GIT_DIR)
            .arg(&self.git_dir)
            .arg(OPTION_BARE)
            .arg(command)
            .args(options)
            .output()
            .await
            .map_err(|e| {
                Error::Git(format!(
                    "Cannot run {} {}: {e}",
                    self.git_bin.display(),
                    command
                ))
            })?;

        let status = output.status.code().unwrap_or(-1);
        if status != 0 {
            debug!(
                "Git command returned status {}.\ncommand: {} {:?}\nstderr: {}",
                status,
                command,
                options,
                String::from_utf8_lossy(&output.stderr)
            );
        }

        Ok((output.stdout, status))
    }

    /// Search the repository with `git grep`
    ///
    /// `treespec` is a branch or commit to search, `pathspec` optionally
    /// restricts the files searched.
    pub async fn grep(
        &self,
        pattern: &str,
        treespec: &str,
        pathspec: Option<&str>,
        options: &[&str],
    ) -> Result<Vec<GrepMatch>> {
        let mut args: Vec<String> = options.iter().map(|o| o.to_string()).collect();
        args.push(OPTION_PATTERN.to_string());
        args.push(pattern.to_string());
        args.push(treespec.to_string());
        if let Some(pathspec) = pathspec.filter(|p| !p.is_empty()) {
            args.push(OPTIONS_END.to_string());
            args.push(pathspec.to_string());
        }

        let (output, status) = self.git(COMMAND_GREP, &args).await?;
        if status == 1 {
            info!("Status code 1: git grep returned no results");
        }

        parse_grep_output(&output)
    }

    /// Raw `git log` output
    pub async fn log(&self, options: &[String]) -> Result<Vec<u8>> {
        let (output, _) = self.git(COMMAND_LOG, options).await?;
        Ok(output)
    }

    /// Sorted, distinct paths of files in `branch` matching `pattern`
    pub async fn find_paths(
        &self,
        pattern: &str,
        file_pattern: &str,
        branch: Option<&str>,
    ) -> Result<Vec<String>> {
        let Some(branch) = branch.filter(|b| !b.is_empty()) else {
            warn!("Branch is None for {}", self.git_dir.display());
            return Ok(Vec::new());
        };

        let mut paths: Vec<String> = self
            .grep(pattern, branch, Some(file_pattern), &["--name-only"])
            .await?
            .into_iter()
            .map(|m| m.path)
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    /// Paths of `AndroidManifest.xml` files declaring `package_name`
    pub async fn find_manifest_paths(
        &self,
        package_name: &str,
        branch: Option<&str>,
    ) -> Result<Vec<String>> {
        let pattern = format!("package=\"{package_name}\"");
        self.find_paths(&pattern, "*AndroidManifest.xml", branch)
            .await
    }

    /// Paths of `build.gradle` files using `package_name` as `applicationId`
    pub async fn find_gradle_config_paths(
        &self,
        package_name: &str,
        branch: Option<&str>,
    ) -> Result<Vec<String>> {
        let pattern = format!("applicationId *.{package_name}.");
        self.find_paths(&pattern, "*build.gradle", branch).await
    }

    /// Paths of `pom.xml` files using `package_name` as `groupId`
    pub async fn find_maven_config_paths(
        &self,
        package_name: &str,
        branch: Option<&str>,
    ) -> Result<Vec<String>> {
        let pattern = format!("<groupId>{package_name}<\\/groupId>");
        self.find_paths(&pattern, "*pom.xml", branch).await
    }
}

/// Turn `git grep` output into `ref:path[:text]` triples
pub fn parse_grep_output(output: &[u8]) -> Result<Vec<GrepMatch>> {
    let output = std::str::from_utf8(output).map_err(|e| {
        debug!(
            "Entire command output was:\n{}",
            String::from_utf8_lossy(output)
        );
        Error::Git(format!("Cannot decode git grep output: {e}"))
    })?;

    output
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut parts = line.splitn(3, ':');
            match (parts.next(), parts.next()) {
                (Some(treespec), Some(path)) => Ok(GrepMatch {
                    treespec: treespec.to_string(),
                    path: path.to_string(),
                    text: parts.next().unwrap_or_default().to_string(),
                }),
                _ => Err(Error::Git(format!("Unexpected git grep output: {line}"))),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grep_output_with_text() {
        let matches = parse_grep_output(b"master:test.txt:Hello Universe: again\n").unwrap();
        assert_eq!(
            matches,
            vec![GrepMatch {
                treespec: "master".to_string(),
                path: "test.txt".to_string(),
                text: "Hello Universe: again".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_grep_output_name_only() {
        let matches = parse_grep_output(
            b"master:app/src/main/AndroidManifest.xml\nmaster:lib/AndroidManifest.xml\n",
        )
        .unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[1].path, "lib/AndroidManifest.xml");
        assert!(matches[1].text.is_empty());
    }

    #[test]
    fn test_parse_grep_output_empty() {
        assert!(parse_grep_output(b"").unwrap().is_empty());
    }

    #[test]
    fn test_parse_grep_output_rejects_garbage() {
        assert!(matches!(
            parse_grep_output(b"no colon here\n"),
            Err(Error::Git(_))
        ));
        assert!(matches!(parse_grep_output(&[0xff, b':', b'x']), Err(Error::Git(_))));
    }

    #[tokio::test]
    async fn test_find_paths_without_branch() {
        let git = BareGit::new("git", "/nonexistent.git");
        let paths = git.find_manifest_paths("com.example", None).await.unwrap();
        assert!(paths.is_empty());
    }
}

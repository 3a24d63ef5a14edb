use crate::error::{Error, Result};
use crate::github::GitHubConfig;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Settings {
    pub github: GitHubConfig,
    pub gitlab: GitLabConfig,
    pub tools: ToolsConfig,
    pub play: PlayConfig,
}

#[derive(Debug, Clone)]
pub struct GitLabConfig {
    pub host: String,
    /// File whose first line holds a private token
    pub token_file: PathBuf,
    /// Directory of the bare repositories managed by the GitLab instance
    pub repository_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ToolsConfig {
    pub git_bin: PathBuf,
    pub bulk_details_bin: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PlayConfig {
    /// Details page, package name is passed as `id` query parameter
    pub details_url: String,
    pub accept_language: String,
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let github = GitHubConfig::from_env();

        let host = std::env::var("GITLAB_HOST").unwrap_or_else(|_| "http://localhost".to_string());
        let token_file = std::env::var("GITLAB_TOKEN_FILE")
            .unwrap_or_else(|_| ".gitlab.private_token".to_string())
            .into();
        let repository_path = std::env::var("GITLAB_REPOSITORY_PATH")
            .unwrap_or_else(|_| "/var/opt/gitlab/git-data/repositories/gitlab".to_string())
            .into();

        let git_bin = std::env::var("GIT_BIN")
            .unwrap_or_else(|_| "git".to_string())
            .into();
        let bulk_details_bin = std::env::var("BULK_DETAILS_BIN")
            .unwrap_or_else(|_| "/usr/bin/gp-bulk-details".to_string())
            .into();

        let details_url = std::env::var("PLAY_STORE_URL")
            .unwrap_or_else(|_| "https://play.google.com/store/apps/details".to_string());

        if let Ok(timeout) = std::env::var("HTTP_TIMEOUT") {
            timeout
                .parse::<u64>()
                .map_err(|_| Error::Config("Invalid HTTP_TIMEOUT value".to_string()))?;
        }

        Ok(Settings {
            github,
            gitlab: GitLabConfig {
                host,
                token_file,
                repository_path,
            },
            tools: ToolsConfig {
                git_bin,
                bulk_details_bin,
            },
            play: PlayConfig {
                details_url,
                accept_language: "en,en-GB;q=0.8,en-US;q=0.7,de;q=0.5,de-DE;q=0.3,nl;q=0.2"
                    .to_string(),
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(self.github.api_base_url())
            .map_err(|e| Error::Config(format!("Invalid GITHUB_API_URL: {e}")))?;

        url::Url::parse(&self.gitlab.host)
            .map_err(|e| Error::Config(format!("Invalid GITLAB_HOST: {e}")))?;

        if self.github.timeout_secs == 0 {
            return Err(Error::Config("HTTP_TIMEOUT must be non-zero".to_string()));
        }

        Ok(())
    }
}

use std::env;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub integration configuration
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// Optional GitHub personal access token for increased rate limits
    pub token: Option<String>,

    /// Base URL of the REST API, overridable for tests and GitHub Enterprise
    pub api_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    pub user_agent: String,
}

impl GitHubConfig {
    /// Create a new GitHubConfig from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            token: env::var("GITHUB_AUTH_TOKEN").ok().filter(|t| !t.is_empty()),
            api_url: env::var("GITHUB_API_URL").unwrap_or(defaults.api_url),
            timeout_secs: env::var("HTTP_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            user_agent: env::var("USER_AGENT").unwrap_or(defaults.user_agent),
        }
    }

    /// Get the base API URL without a trailing slash
    pub fn api_base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    /// Config pointing at an arbitrary base URL, used against mock servers
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 60,
            user_agent: format!("repo-mining/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

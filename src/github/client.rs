use crate::github::{
    config::GitHubConfig,
    models::{CodeSearchItem, CodeSearchResponse, CommitSummary, RateLimitResponse, Repository},
    parser::FullName,
    rate_limiter::{RateLimiter, Resource, DEFAULT_SLEEP_PERIOD},
};
use crate::{Error, Result};
use reqwest::{header, Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Page size requested from paginated endpoints
pub const PER_PAGE: u64 = 100;

const RATE_LIMIT_PATH: &str = "/rate_limit";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.v3.raw";

/// GitHub API client that adheres to the rate limit
///
/// Every request waits for the quota of its resource to reset if it is
/// exhausted. Abuse detection responses (status 403) and connection errors
/// are retried until the request goes through.
pub struct GitHubClient {
    client: Client,
    config: GitHubConfig,
    rate_limiter: RateLimiter,
}

impl GitHubClient {
    /// Create a new GitHub client
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github.v3+json"),
        );

        // Add authentication if token is provided
        if let Some(token) = &config.token {
            let auth_value = format!("token {token}");
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("Invalid GitHub token: {e}")))?,
            );
        }

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            rate_limiter: RateLimiter::new(),
        })
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn rate_limiter_mut(&mut self) -> &mut RateLimiter {
        &mut self.rate_limiter
    }

    /// Time to sleep between requests to proactively avoid abuse detection
    pub fn suggested_spacing(&self) -> Duration {
        self.rate_limiter.suggested_spacing()
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.config.api_base_url(), path)
        }
    }

    /// Path of `url` relative to the API base, without query
    fn api_path<'a>(&self, url: &'a str) -> &'a str {
        let path = url.strip_prefix(self.config.api_base_url()).unwrap_or(url);
        path.split('?').next().unwrap_or(path)
    }

    /// Fill the rate limit cache with data from the server
    async fn fill_rate_limit_cache(&mut self) {
        let url = self.url(RATE_LIMIT_PATH);

        let response = loop {
            match self.client.get(&url).send().await {
                Ok(response) => break response,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    error!("Cannot reach {}: {}", url, e);
                    sleep(DEFAULT_SLEEP_PERIOD).await;
                }
                Err(e) => {
                    error!("Cannot fill rate limit cache: {}", e);
                    return;
                }
            }
        };

        if response.status() != StatusCode::OK {
            error!("Cannot fill rate limit cache: HTTP {}", response.status());
            return;
        }

        match response.json::<RateLimitResponse>().await {
            Ok(body) => self.rate_limiter.fill(&body.resources),
            Err(e) => error!("Cannot fill rate limit cache: {}", e),
        }
    }

    /// Wait until the quota of `resource` has been reset if necessary
    ///
    /// Uses cached values if present and not stale. Otherwise fresh values
    /// are requested from `/rate_limit` first.
    pub async fn wait_if_needed(&mut self, resource: Resource) {
        if self
            .rate_limiter
            .needs_refresh(resource, chrono::Utc::now().timestamp())
        {
            self.fill_rate_limit_cache().await;
        }

        if let Some(wait) = self.rate_limiter.wait_duration_now(resource) {
            let reset = self
                .rate_limiter
                .get(resource)
                .map(|limit| limit.reset)
                .unwrap_or_default();
            info!(
                "Rate limit reached. Wait for {} sec until {}",
                wait.as_secs(),
                chrono::DateTime::from_timestamp(reset, 0).unwrap_or_else(chrono::Utc::now)
            );
            sleep(wait).await;
        }
    }

    /// Make a rate limited request to the GitHub API
    pub async fn send(&mut self, method: Method, url: &str) -> Result<Response> {
        self.send_with_accept(method, url, None).await
    }

    async fn send_with_accept(
        &mut self,
        method: Method,
        url: &str,
        accept: Option<&str>,
    ) -> Result<Response> {
        let url = self.url(url);
        let path = self.api_path(&url).to_string();
        let resource = Resource::from_path(&path);

        if path != RATE_LIMIT_PATH {
            self.wait_if_needed(resource).await;
        }

        loop {
            debug!("GitHub API request: {} {}", method, url);

            let mut request = self.client.request(method.clone(), &url);
            if let Some(accept) = accept {
                request = request.header(header::ACCEPT, accept);
            }

            match request.send().await {
                Ok(response) if response.status() == StatusCode::FORBIDDEN => {
                    match retry_after(response.headers()) {
                        Some(retry_after) => {
                            let body = response.text().await.unwrap_or_default();
                            warn!("Status 403: {}", body);
                            info!("Retry after: {}", retry_after);
                            self.rate_limiter.double_spacing();
                            sleep(Duration::from_secs(retry_after) + DEFAULT_SLEEP_PERIOD).await;
                        }
                        None => {
                            let body = response.text().await.unwrap_or_default();
                            error!("Status 403: {}", body);
                            self.fill_rate_limit_cache().await;
                            self.wait_if_needed(resource).await;
                        }
                    }
                }
                Ok(response) => {
                    self.rate_limiter
                        .record_response(resource, response.headers());
                    return Ok(response);
                }
                Err(e) if e.is_connect() || e.is_timeout() => {
                    error!("GitHub API request failed: {}", e);
                    error!(
                        "Re-running request might lead to skipped data. Do it anyway after {} seconds.",
                        DEFAULT_SLEEP_PERIOD.as_secs()
                    );
                    sleep(DEFAULT_SLEEP_PERIOD).await;
                }
                Err(e) => return Err(Error::Http(e)),
            }
        }
    }

    /// GET a JSON document, `None` if GitHub does not know the resource
    async fn get_json<T>(&mut self, url: &str) -> Result<Option<(T, Links)>>
    where
        T: DeserializeOwned,
    {
        let response = self.send(Method::GET, url).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND || status == StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS {
            debug!("GitHub resource not available ({}): {}", status, url);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(api_error(response).await);
        }

        let links = Links::from_headers(response.headers());
        let body = response
            .json::<T>()
            .await
            .map_err(|e| Error::Internal(format!("Failed to parse GitHub API response: {e}")))?;

        Ok(Some((body, links)))
    }

    /// GET every page of a list endpoint by following `rel="next"` links
    async fn get_all_pages<T>(&mut self, url: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut next = Some(url.to_string());

        while let Some(url) = next {
            match self.get_json::<Vec<T>>(&url).await? {
                Some((page, links)) => {
                    items.extend(page);
                    next = links.next;
                }
                None => break,
            }
        }

        Ok(items)
    }

    /// Get repository information, `None` if the repository does not exist
    pub async fn repository(&mut self, owner: &str, name: &str) -> Result<Option<Repository>> {
        let path = format!("/repos/{owner}/{name}");
        Ok(self.get_json(&path).await?.map(|(repo, _)| repo))
    }

    /// Get repository identified by `<owner_login>/<repo_name>`
    ///
    /// Fails immediately if owner and name cannot be extracted from
    /// `full_name`.
    pub async fn get_repo(&mut self, full_name: &str) -> Result<Option<Repository>> {
        let name = FullName::parse(full_name)?;
        self.repository(&name.owner, &name.name).await
    }

    /// Count commits in the main branch of a repository
    ///
    /// This takes at most two requests. Counting stops early if the
    /// repository has at least `stop_at` commits and `stop_at` fits into the
    /// first page; a negative `stop_at` always returns the total.
    pub async fn count_commits(&mut self, repo: &Repository, stop_at: i64) -> Result<u64> {
        if stop_at == 0 {
            return Ok(0);
        }

        let mut path = format!("/repos/{}/commits?per_page={PER_PAGE}", repo.full_name);
        if let Some(branch) = &repo.default_branch {
            path.push_str(&format!("&sha={}", urlencoding::encode(branch)));
        }

        let response = self.send(Method::GET, &path).await?;
        if response.status() == StatusCode::CONFLICT {
            // This is an empty repository
            return Ok(0);
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let links = Links::from_headers(response.headers());
        let first_page: Vec<serde_json::Value> = response.json().await?;

        let num_pages = links.last.as_deref().map(page_number).unwrap_or(1);
        let stops_on_first_page = 0 < stop_at && stop_at as u64 <= PER_PAGE;

        let count_last_page = match links.last {
            Some(last) if num_pages > 1 && !stops_on_first_page => {
                match self.get_json::<Vec<serde_json::Value>>(&last).await? {
                    Some((page, _)) => page.len() as u64,
                    None => 0,
                }
            }
            _ => first_page.len() as u64,
        };

        Ok(PER_PAGE * (num_pages - 1) + count_last_page)
    }

    /// Test if a repository has at least `n_commits` commits
    pub async fn has_n_commits(&mut self, repo: &Repository, n_commits: u64) -> Result<bool> {
        Ok(self.count_commits(repo, n_commits as i64).await? >= n_commits)
    }

    /// Search code, following all result pages
    ///
    /// GitHub answers queries for unknown (e.g. renamed) repositories with
    /// HTTP 422, which surfaces as `Error::Api { status: 422, .. }`.
    pub async fn search_code(&mut self, query: &str) -> Result<Vec<CodeSearchItem>> {
        let mut items = Vec::new();
        let mut next = Some(format!(
            "/search/code?q={}&per_page={PER_PAGE}",
            urlencoding::encode(query)
        ));

        while let Some(url) = next {
            let response = self.send(Method::GET, &url).await?;
            if !response.status().is_success() {
                return Err(api_error(response).await);
            }
            let links = Links::from_headers(response.headers());
            let page: CodeSearchResponse = response.json().await?;
            debug!("Code search '{}': {} results in total", query, page.total_count);
            items.extend(page.items);
            next = links.next;
        }

        Ok(items)
    }

    /// Raw content of a file, `None` if it does not exist
    pub async fn file_contents(&mut self, full_name: &str, path: &str) -> Result<Option<Vec<u8>>> {
        let encoded_path = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let url = format!("/repos/{full_name}/contents/{encoded_path}");

        let response = self
            .send_with_accept(Method::GET, &url, Some(RAW_MEDIA_TYPE))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(Some(response.bytes().await?.to_vec()))
    }

    /// All commits of a repository touching `path`
    pub async fn list_commits(&mut self, full_name: &str, path: &str) -> Result<Vec<CommitSummary>> {
        let mut url = format!("/repos/{full_name}/commits?per_page={PER_PAGE}");
        if !path.is_empty() {
            url.push_str(&format!("&path={}", urlencoding::encode(path)));
        }
        self.get_all_pages(&url).await
    }
}

/// Relations of a `Link` response header we care about
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Links {
    pub next: Option<String>,
    pub last: Option<String>,
}

impl Links {
    pub fn from_headers(headers: &header::HeaderMap) -> Self {
        headers
            .get(header::LINK)
            .and_then(|v| v.to_str().ok())
            .map(Links::parse)
            .unwrap_or_default()
    }

    /// Parse `<url>; rel="next", <url>; rel="last"`
    pub fn parse(value: &str) -> Self {
        let mut relations: HashMap<String, String> = HashMap::new();

        for link in value.split(',') {
            let mut parts = link.split(';');
            let Some(url) = parts.next() else {
                continue;
            };
            let url = url.trim().trim_start_matches('<').trim_end_matches('>');

            for param in parts {
                if let Some(rel) = param.trim().strip_prefix("rel=") {
                    relations.insert(rel.trim_matches('"').to_string(), url.to_string());
                }
            }
        }

        Links {
            next: relations.remove("next"),
            last: relations.remove("last"),
        }
    }
}

/// Extract the `page` query parameter, 1 if absent or malformed
pub fn page_number(url: &str) -> u64 {
    url::Url::parse(url)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "page")
                .and_then(|(_, value)| value.parse::<u64>().ok())
        })
        .filter(|&page| page >= 1)
        .unwrap_or(1)
}

fn retry_after(headers: &header::HeaderMap) -> Option<u64> {
    headers
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

async fn api_error(response: Response) -> Error {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    Error::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_link_header() {
        let links = Links::parse(
            r#"<https://api.github.com/repositories/1/commits?per_page=100&page=2>; rel="next", <https://api.github.com/repositories/1/commits?per_page=100&page=1003>; rel="last""#,
        );
        assert_eq!(
            links.next.as_deref(),
            Some("https://api.github.com/repositories/1/commits?per_page=100&page=2")
        );
        assert_eq!(page_number(links.last.as_deref().unwrap()), 1003);
    }

    #[test]
    fn test_parse_empty_link_header() {
        assert_eq!(Links::parse(""), Links::default());
    }

    #[test]
    fn test_page_number_defaults_to_one() {
        assert_eq!(page_number("https://api.github.com/repos/a/b/commits"), 1);
        assert_eq!(page_number("not a url"), 1);
        assert_eq!(page_number("https://api.github.com/x?page=abc"), 1);
        assert_eq!(page_number("https://api.github.com/x?per_page=100&page=0"), 1);
    }

    #[test]
    fn test_api_path_strips_base_and_query() {
        let client = GitHubClient::new(GitHubConfig::with_api_url("http://127.0.0.1:9")).unwrap();
        assert_eq!(
            client.api_path("http://127.0.0.1:9/search/code?q=foo"),
            "/search/code"
        );
        assert_eq!(client.api_path("http://127.0.0.1:9/rate_limit"), "/rate_limit");
    }
}

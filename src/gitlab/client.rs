use crate::gitlab::models::{Branch, CreateProject, Project, Tag};
use crate::{Error, Result};
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error};

const PRIVATE_TOKEN_HEADER: &str = "PRIVATE-TOKEN";
const NEXT_PAGE_HEADER: &str = "x-next-page";
const PER_PAGE: u32 = 100;

/// Minimal GitLab API v4 client
pub struct GitLabClient {
    client: Client,
    host: String,
}

impl GitLabClient {
    /// Create a client for `host`, authenticating with `token` if given
    pub fn new(host: &str, token: Option<&str>, timeout_secs: u64) -> Result<Self> {
        let mut headers = header::HeaderMap::new();

        if let Some(token) = token {
            headers.insert(
                PRIVATE_TOKEN_HEADER,
                header::HeaderValue::from_str(token)
                    .map_err(|e| Error::Config(format!("Invalid GitLab token: {e}")))?,
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
        })
    }

    /// Read a private token from the first line of `path`
    pub fn read_token_file(path: &Path) -> Result<String> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Cannot read GitLab token file {}: {e}",
                path.display()
            ))
        })?;
        Ok(content.lines().next().unwrap_or_default().trim().to_string())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v4{}", self.host, path)
    }

    async fn get_optional<T>(&self, path: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!("GitLab API request: GET {}", url);

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;

        Ok(Some(response.json::<T>().await?))
    }

    /// GET all pages of a list endpoint following `X-Next-Page`
    async fn get_all<T>(&self, path: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut page = "1".to_string();

        loop {
            let url = self.url(path);
            debug!("GitLab API request: GET {} (page {})", url, page);

            let response = self
                .client
                .get(&url)
                .query(&[("per_page", PER_PAGE.to_string()), ("page", page.clone())])
                .send()
                .await?;
            let response = check_status(response).await?;

            let next_page = response
                .headers()
                .get(NEXT_PAGE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());

            items.extend(response.json::<Vec<T>>().await?);

            match next_page {
                Some(next) => page = next,
                None => break,
            }
        }

        Ok(items)
    }

    pub async fn project(&self, id: u64) -> Result<Option<Project>> {
        self.get_optional(&format!("/projects/{id}")).await
    }

    /// Project by its full path, e.g. `gitlab/owner_name`
    pub async fn project_by_path(&self, path: &str) -> Result<Option<Project>> {
        self.get_optional(&format!("/projects/{}", urlencoding::encode(path)))
            .await
    }

    pub async fn branches(&self, project_id: u64) -> Result<Vec<Branch>> {
        self.get_all(&format!("/projects/{project_id}/repository/branches"))
            .await
    }

    pub async fn tags(&self, project_id: u64) -> Result<Vec<Tag>> {
        self.get_all(&format!("/projects/{project_id}/repository/tags"))
            .await
    }

    /// Create a public project importing the repository at `import_url`
    pub async fn create_import_project(&self, name: &str, import_url: &str) -> Result<Project> {
        let url = self.url("/projects");
        debug!("GitLab API request: POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&CreateProject {
                name,
                visibility: "public",
                import_url,
            })
            .send()
            .await?;
        let response = check_status(response).await?;

        Ok(response.json::<Project>().await?)
    }

    /// Delete a project, `Error::NotFound` if it does not exist
    pub async fn delete_project(&self, project_id: u64) -> Result<()> {
        let url = self.url(&format!("/projects/{project_id}"));
        debug!("GitLab API request: DELETE {}", url);

        let response = self.client.delete(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("GitLab project {project_id}")));
        }
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    error!("GitLab API error: {} - {}", status, message);

    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

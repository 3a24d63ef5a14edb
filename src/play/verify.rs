use crate::error::{Error, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{error, info};

/// Checks availability of packages on Google Play
pub struct PlayVerifier {
    client: Client,
    details_url: String,
}

impl PlayVerifier {
    pub fn new(details_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            details_url: details_url.into(),
        })
    }

    /// Test if `package_name` is available on Google Play
    ///
    /// Status 200 means available. So does 403 if `include_403` is set.
    pub async fn is_package_in_play(&self, package_name: &str, include_403: bool) -> Result<bool> {
        let response = self
            .client
            .head(&self.details_url)
            .query(&[("id", package_name)])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::NOT_FOUND {
            error!("Status {} for {}", status.as_u16(), response.url());
        } else {
            info!("Status {} for {}", status.as_u16(), response.url());
        }

        Ok(status == StatusCode::OK || (include_403 && status == StatusCode::FORBIDDEN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    async fn mock_status(server: &mut mockito::ServerGuard, package: &str, status: usize) -> mockito::Mock {
        server
            .mock("HEAD", "/store/apps/details")
            .match_query(Matcher::UrlEncoded("id".into(), package.into()))
            .with_status(status)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_status_decides_availability() {
        let mut server = mockito::Server::new_async().await;
        let _ok = mock_status(&mut server, "com.ok", 200).await;
        let _missing = mock_status(&mut server, "com.missing", 404).await;
        let _forbidden = mock_status(&mut server, "com.forbidden", 403).await;

        let verifier =
            PlayVerifier::new(format!("{}/store/apps/details", server.url()), 5).unwrap();

        assert!(verifier.is_package_in_play("com.ok", false).await.unwrap());
        assert!(!verifier.is_package_in_play("com.missing", true).await.unwrap());
        assert!(!verifier.is_package_in_play("com.forbidden", false).await.unwrap());
        assert!(verifier.is_package_in_play("com.forbidden", true).await.unwrap());
    }
}

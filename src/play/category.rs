use crate::error::{Error, Result};
use reqwest::{header, Client};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const CATEGORY_DIR: &str = "categories";

/// Content of `<details_dir>/categories/<package>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppCategory {
    pub package_name: String,
    pub app_category: String,
}

/// Fetches Google Play pages to scrape the app category from
pub struct CategoryScraper {
    client: Client,
    details_url: String,
}

impl CategoryScraper {
    pub fn new(details_url: impl Into<String>, accept_language: &str, timeout_secs: u64) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_str(accept_language)
                .map_err(|e| Error::Config(format!("Invalid Accept-Language: {e}")))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            details_url: details_url.into(),
        })
    }

    /// HTML of the Google Play page of `package_name`
    pub async fn play_page(&self, package_name: &str) -> Result<String> {
        let request = self
            .client
            .get(&self.details_url)
            .query(&[("id", package_name)])
            .build()?;
        info!("Request {}", request.url());

        let response = self.client.execute(request).await?;
        Ok(response.text().await?)
    }

    /// Category of `package_name`, `None` if the page does not show one
    pub async fn category(&self, package_name: &str) -> Result<Option<String>> {
        let html = self.play_page(package_name).await?;
        Ok(find_category(&html))
    }
}

/// Extract the genre of the first `.category` element
pub fn find_category(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let category_selector = Selector::parse(".category").ok()?;
    let genre_selector = Selector::parse("[itemprop=genre]").ok()?;

    let category = document
        .select(&category_selector)
        .next()
        .and_then(|link| link.select(&genre_selector).next())
        .map(|genre| genre.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty());

    if category.is_none() {
        warn!("Cannot match category in HTML");
    }
    category
}

/// Write the category of `package_name` to the categories directory
pub fn write_category_file(package_name: &str, category: &str, details_dir: &Path) -> Result<PathBuf> {
    let category_dir = details_dir.join(CATEGORY_DIR);
    std::fs::create_dir_all(&category_dir)?;

    let path = category_dir.join(format!("{package_name}.json"));
    let content = serde_json::to_string(&AppCategory {
        package_name: package_name.to_string(),
        app_category: category.to_string(),
    })?;
    std::fs::write(&path, content)?;

    info!("Wrote {}", path.display());
    Ok(path)
}

use crate::play::category::write_category_file;
use crate::play::{iter_package_details, CategoryScraper};
use crate::Result;
use std::path::Path;
use tracing::info;

/// Scrape the category of every package with details in `details_dir`
///
/// Categories are stored in `<details_dir>/categories/<package>.json`.
/// Packages whose page does not show a category are skipped.
pub async fn scrape_categories(details_dir: &Path, scraper: &CategoryScraper) -> Result<usize> {
    let mut found = 0;

    for entry in iter_package_details(details_dir)? {
        let (package_name, _) = entry?;
        let Some(category) = scraper.category(&package_name).await? else {
            continue;
        };

        info!("Found category \"{}\" for {}", category, package_name);
        write_category_file(&package_name, &category, details_dir)?;
        found += 1;
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_scrape_categories() {
        let mut server = mockito::Server::new_async().await;
        let _tools = server
            .mock("GET", "/details")
            .match_query(Matcher::UrlEncoded("id".into(), "com.tools".into()))
            .with_status(200)
            .with_body(r#"<a class="category"><span itemprop="genre">Tools</span></a>"#)
            .create_async()
            .await;
        let _plain = server
            .mock("GET", "/details")
            .match_query(Matcher::UrlEncoded("id".into(), "com.plain".into()))
            .with_status(200)
            .with_body("<html></html>")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("com.tools.json"), "{}").unwrap();
        std::fs::write(dir.path().join("com.plain.json"), "{}").unwrap();

        let scraper = CategoryScraper::new(format!("{}/details", server.url()), "en", 5).unwrap();
        assert_eq!(scrape_categories(dir.path(), &scraper).await.unwrap(), 1);
        assert!(dir.path().join("categories/com.tools.json").exists());
        assert!(!dir.path().join("categories/com.plain.json").exists());
    }
}

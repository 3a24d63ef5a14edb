use crate::error::{Error, Result};
use crate::play::package::PackageRepos;
use crate::utils::require_columns;
use chrono::NaiveDate;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Iterate over `<package_name>.json` files directly in `dir`
///
/// Files are visited in order of their names. The package name is the file
/// name without extension.
pub fn iter_package_details(dir: &Path) -> Result<impl Iterator<Item = Result<(String, Value)>>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    Ok(paths.into_iter().filter_map(|path| {
        let package_name = path.file_stem()?.to_string_lossy().into_owned();
        Some(read_json(&path).map(|details| (package_name, details)))
    }))
}

fn read_json(path: &Path) -> Result<Value> {
    debug!("Read {}", path.display());
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        warn!("Cannot parse {}: {}", path.display(), e);
        Error::Json(e)
    })
}

/// Read a CSV file matching package names to repositories
///
/// The file needs a column `package` and a column `all_repos` holding a
/// comma separated list of repositories that include an
/// `AndroidManifest.xml` for the package.
pub fn read_package_to_repos<R: Read>(reader: R) -> Result<PackageRepos> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    require_columns(&headers, &["package", "all_repos"])?;

    let package_idx = column_index(&headers, "package")?;
    let repos_idx = column_index(&headers, "all_repos")?;

    let mut packages = PackageRepos::new();
    for record in csv_reader.records() {
        let record = record?;
        let package = record.get(package_idx).unwrap_or_default().to_string();
        let repos = record
            .get(repos_idx)
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from);
        packages.entry(package).or_default().extend(repos);
    }

    Ok(packages)
}

pub(crate) fn column_index(headers: &csv::StringRecord, column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| Error::MissingColumn(column.to_string()))
}

/// Google Play fields exported to the graph import
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayPage {
    pub uri: Option<String>,
    pub title: Option<String>,
    pub app_category: Vec<String>,
    pub promotional_description: Option<String>,
    pub description_html: Option<String>,
    pub translated_description_html: Option<String>,
    pub version_code: Option<i64>,
    pub version_string: Option<String>,
    /// POSIX timestamp of the upload date
    pub upload_date: Option<i64>,
    pub formatted_amount: Option<String>,
    pub currency_code: Option<String>,
    pub in_app_purchases: Option<String>,
    pub install_notes: Option<String>,
    pub star_rating: Option<f64>,
    pub num_downloads: Option<String>,
    pub developer_name: Option<String>,
    pub developer_email: Option<String>,
    pub developer_website: Option<String>,
    pub target_sdk_version: Option<i64>,
    pub permissions: Vec<String>,
}

impl PlayPage {
    /// Extract fields from bulk details of a package
    pub fn from_details(details: &Value) -> Self {
        let text = |pointer: &str| {
            details
                .pointer(pointer)
                .and_then(Value::as_str)
                .map(String::from)
        };
        let int = |pointer: &str| {
            details.pointer(pointer).and_then(|v| {
                v.as_i64()
                    .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
            })
        };
        let strings = |pointer: &str| {
            details
                .pointer(pointer)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default()
        };

        PlayPage {
            uri: text("/shareUrl"),
            title: text("/title"),
            app_category: strings("/details/appDetails/appCategory"),
            promotional_description: text("/promotionalDescription"),
            description_html: text("/descriptionHtml"),
            translated_description_html: text("/translatedDescriptionHtml"),
            version_code: int("/details/appDetails/versionCode"),
            version_string: text("/details/appDetails/versionString"),
            upload_date: text("/details/appDetails/uploadDate")
                .as_deref()
                .and_then(parse_upload_date),
            formatted_amount: text("/offer/0/formattedAmount"),
            currency_code: text("/offer/0/currencyCode"),
            in_app_purchases: text("/details/appDetails/inAppProductsPrice"),
            install_notes: text("/details/appDetails/installNotes"),
            star_rating: details
                .pointer("/aggregateRating/starRating")
                .and_then(Value::as_f64),
            num_downloads: text("/details/appDetails/numDownloads"),
            developer_name: text("/details/appDetails/developerName"),
            developer_email: text("/details/appDetails/developerEmail"),
            developer_website: text("/details/appDetails/developerWebsite"),
            target_sdk_version: int("/details/appDetails/targetSdkVersion"),
            permissions: strings("/details/appDetails/permission"),
        }
    }
}

/// Upload dates look like `Feb 7, 2018`
pub fn parse_upload_date(date: &str) -> Option<i64> {
    NaiveDate::parse_from_str(date.trim(), "%b %d, %Y")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc().timestamp())
}

/// Read `<details_dir>/<package_name>.json` into a `PlayPage`
///
/// Returns `None` if the file does not exist or holds no details.
pub fn parse_play_page(package_name: &str, details_dir: &Path) -> Result<Option<PlayPage>> {
    let path = details_dir.join(format!("{package_name}.json"));
    if !path.exists() {
        debug!("No details for {} at {}", package_name, path.display());
        return Ok(None);
    }

    let details = read_json(&path)?;
    if details.is_null() {
        return Ok(None);
    }
    Ok(Some(PlayPage::from_details(&details)))
}

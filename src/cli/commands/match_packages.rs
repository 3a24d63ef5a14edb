use crate::github::dedup::{deduplicate, RepoLookup};
use crate::play::{iter_package_details, read_package_to_repos, Package};
use crate::Result;
use serde::Serialize;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Counts of how packages were matched
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    pub all: usize,
    pub unknown: usize,
    pub valid: usize,
    pub no_github_link: usize,
    pub no_github_link_but_unique_popular: usize,
    pub unique_repo: usize,
    pub no_repo: usize,
    pub too_many_repos: usize,
}

/// Match apps on Google Play with their repositories on GitHub
///
/// `package_to_repos` is a CSV table with a column `package` and a column
/// `all_repos` listing, comma separated, the repositories containing a
/// manifest for the package. A package is matched if only one repository
/// contains its manifest, if exactly one of those repositories is linked from
/// Google Play, or, lacking links to GitHub, if one of them is the unique
/// most popular.
pub async fn match_play_and_github<R, L>(
    package_to_repos: R,
    details_dir: &Path,
    lookup: &mut L,
) -> Result<(Vec<(String, String)>, MatchStats)>
where
    R: Read,
    L: RepoLookup + Send + ?Sized,
{
    let mut stats = MatchStats::default();
    let mut matches = Vec::new();
    let packages = read_package_to_repos(package_to_repos)?;

    for entry in iter_package_details(details_dir)? {
        let (package_name, details) = entry?;
        stats.all += 1;

        let mut package = Package::new(package_name, details);
        if !package.is_known_package(&packages) {
            debug!("\"{}\" is not a known package", package.package_name);
            stats.unknown += 1;
            continue;
        }

        package.search_github_links();
        package.set_github_repos(&packages);
        package.match_repos_to_links();

        let is_unique_repo = package.has_unique_github_repo();
        if !package.has_github_links() && !is_unique_repo {
            debug!(
                "\"{}\" does not link to GitHub and has these {} repos on GitHub: {:?}",
                package.package_name,
                package.github_repos().len(),
                package.github_repos()
            );
            stats.no_github_link += 1;

            if let Some(most_popular) = deduplicate(package.github_repos(), lookup).await? {
                stats.no_github_link_but_unique_popular += 1;
                debug!(
                    "\"{}\" is most popular repo for {}",
                    most_popular, package.package_name
                );
                matches.push((package.package_name, most_popular));
            }
        } else if !package.has_repo_links() && !is_unique_repo {
            debug!(
                "\"{}\" does not link to valid repo ({:?}) and has these {} repos on GitHub: {:?}",
                package.package_name,
                package.github_links(),
                package.github_repos().len(),
                package.github_repos()
            );
            stats.no_repo += 1;
        } else if package.has_too_many_repo_links() && !is_unique_repo {
            debug!(
                "\"{}\" has {} repo links",
                package.package_name,
                package.repos.len()
            );
            stats.too_many_repos += 1;
        } else {
            let repo = if is_unique_repo {
                stats.unique_repo += 1;
                package.github_repos()[0].clone()
            } else {
                package.repos[0].clone()
            };
            stats.valid += 1;
            matches.push((package.package_name, repo));
        }
    }

    debug!("{}", serde_json::to_string_pretty(&stats)?);
    Ok((matches, stats))
}

/// Write matched package and repository names as headerless CSV to `output`
pub async fn match_packages<R, L, W>(
    package_to_repos: R,
    details_dir: &Path,
    lookup: &mut L,
    output: W,
) -> Result<MatchStats>
where
    R: Read,
    L: RepoLookup + Send + ?Sized,
    W: Write,
{
    let (matches, stats) = match_play_and_github(package_to_repos, details_dir, lookup).await?;

    let mut writer = csv::Writer::from_writer(output);
    for (package, repo) in &matches {
        writer.write_record([package, repo])?;
    }
    writer.flush()?;

    Ok(stats)
}

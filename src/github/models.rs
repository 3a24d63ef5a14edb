use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// GitHub API rate limit information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub limit: u32,
    pub remaining: u32,
    /// Unix timestamp when the quota resets
    pub reset: i64,
}

/// Body of `GET /rate_limit`
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResponse {
    pub resources: HashMap<String, RateLimit>,
}

/// GitHub repository information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: Option<Owner>,
    pub description: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub language: Option<String>,
    pub default_branch: Option<String>,
    pub homepage: Option<String>,
    pub clone_url: Option<String>,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub subscribers_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    #[serde(default)]
    pub network_count: u64,
    #[serde(default)]
    pub has_downloads: bool,
    #[serde(default)]
    pub has_issues: bool,
    #[serde(default)]
    pub has_pages: bool,
    #[serde(default)]
    pub has_projects: bool,
    #[serde(default)]
    pub has_wiki: bool,
    /// Repository this one was forked from
    pub parent: Option<RepositoryId>,
    /// Root of the fork network
    pub source: Option<RepositoryId>,
}

/// Repository owner information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
    pub id: u64,
    #[serde(rename = "type")]
    pub owner_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryId {
    pub id: u64,
}

/// Flat selection of repository fields, one CSV row of `get-repo-data`
#[derive(Debug, Clone, Serialize)]
pub struct RepoMetadata {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub size: u64,
    #[serde(serialize_with = "crate::utils::serialize_bool")]
    pub private: bool,
    #[serde(serialize_with = "crate::utils::serialize_bool")]
    pub fork: bool,
    #[serde(serialize_with = "crate::utils::serialize_bool")]
    pub archived: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub pushed_at: Option<String>,
    pub language: Option<String>,
    pub default_branch: Option<String>,
    pub homepage: Option<String>,
    pub forks_count: u64,
    pub stargazers_count: u64,
    pub subscribers_count: u64,
    pub watchers_count: u64,
    pub network_count: u64,
    #[serde(serialize_with = "crate::utils::serialize_bool")]
    pub has_downloads: bool,
    #[serde(serialize_with = "crate::utils::serialize_bool")]
    pub has_issues: bool,
    #[serde(serialize_with = "crate::utils::serialize_bool")]
    pub has_pages: bool,
    #[serde(serialize_with = "crate::utils::serialize_bool")]
    pub has_projects: bool,
    #[serde(serialize_with = "crate::utils::serialize_bool")]
    pub has_wiki: bool,
    pub owner_id: i64,
    pub owner_login: Option<String>,
    pub owner_type: Option<String>,
    pub parent_id: i64,
    pub source_id: i64,
    pub commit_count: Option<u64>,
}

impl Repository {
    /// A flat selection of relevant meta data
    pub fn meta_data(&self) -> RepoMetadata {
        RepoMetadata {
            id: self.id,
            name: self.name.clone(),
            full_name: self.full_name.clone(),
            description: self.description.clone(),
            size: self.size,
            private: self.private,
            fork: self.fork,
            archived: self.archived,
            created_at: self.created_at.map(|d| d.to_rfc3339()),
            updated_at: self.updated_at.map(|d| d.to_rfc3339()),
            pushed_at: self.pushed_at.map(|d| d.to_rfc3339()),
            language: self.language.clone(),
            default_branch: self.default_branch.clone(),
            homepage: self.homepage.clone(),
            forks_count: self.forks_count,
            stargazers_count: self.stargazers_count,
            subscribers_count: self.subscribers_count,
            watchers_count: self.watchers_count,
            network_count: self.network_count,
            has_downloads: self.has_downloads,
            has_issues: self.has_issues,
            has_pages: self.has_pages,
            has_projects: self.has_projects,
            has_wiki: self.has_wiki,
            owner_id: self.owner.as_ref().map_or(-1, |o| o.id as i64),
            owner_login: self.owner.as_ref().map(|o| o.login.clone()),
            owner_type: self.owner.as_ref().map(|o| o.owner_type.clone()),
            parent_id: self.parent.as_ref().map_or(-1, |p| p.id as i64),
            source_id: self.source.as_ref().map_or(-1, |s| s.id as i64),
            commit_count: None,
        }
    }
}

/// One page of `GET /search/code`
#[derive(Debug, Clone, Deserialize)]
pub struct CodeSearchResponse {
    pub total_count: u64,
    #[serde(default)]
    pub items: Vec<CodeSearchItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeSearchItem {
    pub name: String,
    pub path: String,
    pub sha: String,
    pub repository: SearchRepository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRepository {
    pub id: u64,
    pub full_name: String,
}

/// Entry of `GET /repos/{owner}/{repo}/commits`
#[derive(Debug, Clone, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    pub commit: CommitDetails,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetails {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_data_defaults_missing_relations_to_minus_one() {
        let repo: Repository = serde_json::from_str(
            r#"{
                "id": 81598961,
                "name": "cpython",
                "full_name": "python/cpython",
                "owner": {"login": "python", "id": 1525981, "type": "Organization"},
                "created_at": "2017-02-10T19:23:51Z",
                "forks_count": 3106,
                "fork": false
            }"#,
        )
        .unwrap();

        let meta = repo.meta_data();
        assert_eq!(meta.owner_id, 1525981);
        assert_eq!(meta.owner_type.as_deref(), Some("Organization"));
        assert_eq!(meta.parent_id, -1);
        assert_eq!(meta.source_id, -1);
        assert_eq!(meta.created_at.as_deref(), Some("2017-02-10T19:23:51+00:00"));
        assert!(meta.updated_at.is_none());
    }
}

use serde::{Deserialize, Serialize};

/// GitLab project as returned by `/api/v4/projects`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub path_with_namespace: String,
    pub default_branch: Option<String>,
    #[serde(default)]
    pub web_url: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRef {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub commit: CommitRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub message: Option<String>,
    pub commit: CommitRef,
}

/// Body of `POST /api/v4/projects` importing a repository by URL
#[derive(Debug, Clone, Serialize)]
pub struct CreateProject<'a> {
    pub name: &'a str,
    pub visibility: &'a str,
    pub import_url: &'a str,
}

use crate::error::{Error, Result};
use crate::play::PlayPage;
use crate::utils::parse_iso8601;
use std::collections::HashMap;

/// A CSV row read by column name
pub type InputRow = HashMap<String, String>;

pub const REPOSITORY_FIELDS: &[&str] = &[
    ":LABEL",
    "id:ID",
    "owner:string",
    "name:string",
    "snapshot:string",
    "snapshotTimestamp:long",
    "description:string",
    "createdAt:long",
    "forksCount:int",
    "stargazersCount:int",
    "subscribersCount:int",
    "watchersCount:int",
    "networkCount:int",
    "ownerType:string",
    "parentId:long",
    "sourceId:long",
];

pub const PLAY_PAGE_FIELDS: &[&str] = &[
    ":LABEL",
    ":ID",
    "docId:string",
    "uri:string",
    "snapshotTimestamp:long",
    "title:string",
    "appCategory:string[]",
    "promotionalDescription:string",
    "descriptionHtml:string",
    "translatedDescriptionHtml:string",
    "versionCode:int",
    "versionString:string",
    "uploadDate:long",
    "formattedAmount:string",
    "currencyCode:string",
    "in-app purchases:string",
    "installNotes:string",
    "starRating:float",
    "numDownloads:string",
    "developerName:string",
    "developerEmail:string",
    "developerWebsite:string",
    "targetSdkVersion:int",
    "permissions:string[]",
];

pub const COMMIT_FIELDS: &[&str] = &[
    ":LABEL",
    "id:ID",
    "short_id:string",
    "title:string",
    "message:string",
    "additions:int",
    "deletions:int",
    "total:int",
];

pub const APP_FIELDS: &[&str] = &[":LABEL", "id:ID"];

pub const BRANCH_FIELDS: &[&str] = &[":LABEL", ":ID", "name:string"];

pub const TAG_FIELDS: &[&str] = &[":LABEL", ":ID", "name:string", "message:string"];

pub const CONTRIBUTOR_FIELDS: &[&str] = &[":LABEL", ":ID", "email:string", "name:string"];

pub const GENERAL_RELATION_FIELDS: &[&str] = &[":TYPE", ":START_ID", ":END_ID"];

pub const CONTRIBUTOR_RELATION_FIELDS: &[&str] =
    &[":TYPE", ":START_ID", ":END_ID", "timestamp:long"];

pub const IMPLEMENTED_RELATION_FIELDS: &[&str] = &[
    ":TYPE",
    ":START_ID",
    ":END_ID",
    "manifestPaths:string[]",
    "gradleConfigPaths:string[]",
    "mavenConfigPaths:string[]",
];

pub const COMMITS_RELATION: &str = "COMMITS";
pub const AUTHORS_RELATION: &str = "AUTHORS";
pub const BELONGS_TO_RELATION: &str = "BELONGS_TO";
pub const POINTS_TO_RELATION: &str = "POINTS_TO";
pub const IMPLEMENTED_BY_RELATION: &str = "IMPLEMENTED_BY";
pub const PUBLISHED_AT_RELATION: &str = "PUBLISHED_AT";
pub const PARENT_RELATION: &str = "PARENT";

/// Values of one output row, in the order of the respective field list
pub type Row = Vec<String>;

/// Provides unique identifiers for nodes
#[derive(Debug, Default)]
pub struct NodeIds {
    counter: u64,
}

impl NodeIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next generated identifier, e.g. `tag:12`
    pub fn next(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{prefix}:{}", self.counter)
    }

    /// Identifier derived from a domain id, e.g. `contr:jane@example.com`
    pub fn for_domain(prefix: &str, domain_id: &str) -> String {
        format!("{prefix}:{domain_id}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub kind: &'static str,
    pub start_id: String,
    pub end_id: String,
    pub properties: Vec<String>,
}

impl Relation {
    pub fn new(kind: &'static str, start_id: impl Into<String>, end_id: impl Into<String>) -> Self {
        Self {
            kind,
            start_id: start_id.into(),
            end_id: end_id.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_properties(mut self, properties: Vec<String>) -> Self {
        self.properties = properties;
        self
    }

    /// Relations are considered equal if type, start and end are
    pub fn key(&self) -> (&'static str, String, String) {
        (self.kind, self.start_id.clone(), self.end_id.clone())
    }

    pub fn to_row(&self) -> Row {
        let mut row = vec![
            self.kind.to_string(),
            self.start_id.clone(),
            self.end_id.clone(),
        ];
        row.extend(self.properties.iter().cloned());
        row
    }
}

/// Value of `column` in `row`
pub fn field<'a>(row: &'a InputRow, column: &str) -> Result<&'a str> {
    row.get(column)
        .map(String::as_str)
        .ok_or_else(|| Error::MissingColumn(column.to_string()))
}

fn timestamp_or_empty(date: &str) -> String {
    parse_iso8601(date)
        .map(|ts| ts.to_string())
        .unwrap_or_default()
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

pub fn format_repository(input_row: &InputRow, snapshot: &InputRow) -> Result<Row> {
    let snapshot_created = snapshot
        .get("created_at")
        .map(|d| timestamp_or_empty(d))
        .unwrap_or_default();

    Ok(vec![
        "GitHubRepository".to_string(),
        field(input_row, "id")?.to_string(),
        field(input_row, "owner_login")?.to_string(),
        field(input_row, "name")?.to_string(),
        snapshot.get("web_url").cloned().unwrap_or_default(),
        snapshot_created,
        field(input_row, "description")?.to_string(),
        timestamp_or_empty(field(input_row, "created_at")?),
        field(input_row, "forks_count")?.to_string(),
        field(input_row, "stargazers_count")?.to_string(),
        field(input_row, "subscribers_count")?.to_string(),
        field(input_row, "watchers_count")?.to_string(),
        field(input_row, "network_count")?.to_string(),
        field(input_row, "owner_type")?.to_string(),
        field(input_row, "parent_id")?.to_string(),
        field(input_row, "source_id")?.to_string(),
    ])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributorType {
    Author,
    Committer,
}

/// Contributor node id, node row and relation to the commit
pub fn format_contributor(input_row: &InputRow, contributor_type: ContributorType) -> Result<(String, Row, Relation)> {
    let (email_key, name_key, time_key, relation_type) = match contributor_type {
        ContributorType::Author => ("author_email", "author_name", "authored_date", AUTHORS_RELATION),
        ContributorType::Committer => (
            "committer_email",
            "committer_name",
            "committed_date",
            COMMITS_RELATION,
        ),
    };

    let email = field(input_row, email_key)?.trim();
    let node_id = NodeIds::for_domain("contr", email);
    let node = vec![
        "Contributor".to_string(),
        node_id.clone(),
        email.to_string(),
        field(input_row, name_key)?.to_string(),
    ];
    let relation = Relation::new(relation_type, node_id.clone(), field(input_row, "id")?)
        .with_properties(vec![field(input_row, time_key)?.to_string()]);

    Ok((node_id, node, relation))
}

/// Everything derived from one row of `commits.csv`
#[derive(Debug, Clone)]
pub struct FormattedCommit {
    pub id: String,
    pub node: Row,
    pub authors: Relation,
    pub commits: Relation,
    pub belongs: Relation,
    pub contributors: Vec<(String, Row)>,
    pub parents: Vec<Relation>,
}

pub fn format_commit(input_row: &InputRow, repo_id: &str) -> Result<FormattedCommit> {
    let id = field(input_row, "id")?.to_string();
    let node = vec![
        "Commit".to_string(),
        id.clone(),
        field(input_row, "short_id")?.to_string(),
        field(input_row, "title")?.to_string(),
        field(input_row, "message")?.to_string(),
        field(input_row, "additions")?.to_string(),
        field(input_row, "deletions")?.to_string(),
        field(input_row, "total")?.to_string(),
    ];

    let (author_id, author_node, authors) = format_contributor(input_row, ContributorType::Author)?;
    let (committer_id, committer_node, commits) =
        format_contributor(input_row, ContributorType::Committer)?;

    let parents = field(input_row, "parent_ids")?
        .split(',')
        .filter(|parent| !parent.is_empty())
        .map(|parent| Relation::new(PARENT_RELATION, id.clone(), parent))
        .collect();

    Ok(FormattedCommit {
        belongs: Relation::new(BELONGS_TO_RELATION, id.clone(), repo_id),
        id,
        node,
        authors,
        commits,
        contributors: vec![(author_id, author_node), (committer_id, committer_node)],
        parents,
    })
}

/// Tag node with its `BELONGS_TO` and `POINTS_TO` relations
pub fn format_tag(input_row: &InputRow, repo_id: &str, ids: &mut NodeIds) -> Result<(Row, Relation, Relation)> {
    let node_id = ids.next("tag");
    let node = vec![
        "Tag".to_string(),
        node_id.clone(),
        field(input_row, "tag_name")?.to_string(),
        field(input_row, "tag_message")?.to_string(),
    ];
    Ok((
        node,
        Relation::new(BELONGS_TO_RELATION, node_id.clone(), repo_id),
        Relation::new(POINTS_TO_RELATION, node_id, field(input_row, "commit_hash")?),
    ))
}

/// Branch node with its `BELONGS_TO` and `POINTS_TO` relations
pub fn format_branch(input_row: &InputRow, repo_id: &str, ids: &mut NodeIds) -> Result<(Row, Relation, Relation)> {
    let node_id = ids.next("branch");
    let node = vec![
        "Branch".to_string(),
        node_id.clone(),
        field(input_row, "branch_name")?.to_string(),
    ];
    Ok((
        node,
        Relation::new(BELONGS_TO_RELATION, node_id.clone(), repo_id),
        Relation::new(POINTS_TO_RELATION, node_id, field(input_row, "commit_hash")?),
    ))
}

pub fn format_app(package_name: &str) -> Row {
    vec!["App".to_string(), package_name.to_string()]
}

/// `IMPLEMENTED_BY` relation from a row of `paths.csv`
pub fn format_implemented(input_row: &InputRow, repo_id: &str) -> Result<Relation> {
    let paths = |column: &str| field(input_row, column).map(|p| p.replace(',', ";"));

    Ok(
        Relation::new(IMPLEMENTED_BY_RELATION, field(input_row, "package")?, repo_id)
            .with_properties(vec![
                paths("manifestPaths")?,
                paths("gradleConfigPaths")?,
                paths("mavenConfigPaths")?,
            ]),
    )
}

/// Google Play page node and its `PUBLISHED_AT` relation
///
/// Packages without details still get a node with empty properties.
pub fn format_play_page(
    package_name: &str,
    page: Option<&PlayPage>,
    mtime: &str,
    ids: &mut NodeIds,
) -> (Row, Relation) {
    let node_id = ids.next("play");
    let default = PlayPage::default();
    let page = page.unwrap_or(&default);

    let node = vec![
        "GooglePlayPage".to_string(),
        node_id.clone(),
        package_name.to_string(),
        opt(&page.uri),
        mtime.to_string(),
        opt(&page.title),
        page.app_category.join(";"),
        opt(&page.promotional_description),
        opt(&page.description_html),
        opt(&page.translated_description_html),
        opt(&page.version_code),
        opt(&page.version_string),
        opt(&page.upload_date),
        opt(&page.formatted_amount),
        opt(&page.currency_code),
        opt(&page.in_app_purchases),
        opt(&page.install_notes),
        opt(&page.star_rating),
        opt(&page.num_downloads),
        opt(&page.developer_name),
        opt(&page.developer_email),
        opt(&page.developer_website),
        opt(&page.target_sdk_version),
        page.permissions.join(";"),
    ];

    let relation = Relation::new(PUBLISHED_AT_RELATION, package_name, node_id);
    (node, relation)
}

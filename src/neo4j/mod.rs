//! Conversion of collected data into CSV files for `neo4j-admin import`
pub mod format;
pub mod output;

pub use format::{NodeIds, Relation, Row};
pub use output::{Output, Table};

use crate::error::{Error, Result};
use crate::play::parse_play_page;
use format::InputRow;
use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Rows keyed by identity, keeping first-seen order and the last value
#[derive(Debug)]
pub struct UniqueRows<K, V> {
    index: HashMap<K, usize>,
    rows: Vec<V>,
}

impl<K: Hash + Eq, V> Default for UniqueRows<K, V> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            rows: Vec::new(),
        }
    }
}

impl<K: Hash + Eq, V> UniqueRows<K, V> {
    pub fn insert(&mut self, key: K, value: V) {
        match self.index.get(&key) {
            Some(&i) => self.rows[i] = value,
            None => {
                self.index.insert(key, self.rows.len());
                self.rows.push(value);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.rows.iter()
    }
}

/// Relations deduplicated by type, start and end
pub type RelationSet = UniqueRows<(&'static str, String, String), Relation>;

impl RelationSet {
    pub fn add_relation(&mut self, relation: Relation) {
        self.insert(relation.key(), relation);
    }
}

/// Number of rows written per table
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportStats {
    pub repositories: usize,
    pub commits: usize,
    pub contributors: usize,
    pub apps: usize,
}

fn repository_csv_path(input_dir: &Path, repo_id: &str, name: &str) -> PathBuf {
    input_dir.join("repository_details").join(repo_id).join(name)
}

fn read_rows(path: &Path) -> Result<Vec<InputRow>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        error!("Cannot read {}: {}", path.display(), e);
        e
    })?;
    let rows = reader
        .deserialize::<InputRow>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| {
            error!("Malformed CSV in {}: {}", path.display(), e);
            e
        })?;
    Ok(rows)
}

/// First row of the GitLab snapshot of a repository, empty if there is none
fn read_snapshot(input_dir: &Path, repo_id: &str) -> Result<InputRow> {
    let path = repository_csv_path(input_dir, repo_id, "snapshot.csv");
    Ok(read_rows(&path)?.into_iter().next().unwrap_or_default())
}

/// Snapshot time of each package from the headerless `play_snapshots.csv`
pub fn read_package_snapshot_times(input_dir: &Path) -> Result<HashMap<String, String>> {
    let path = input_dir.join("play_snapshots.csv");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(&path)?;

    let mut mtimes = HashMap::new();
    for record in reader.records() {
        let record = record?;
        if let (Some(package), Some(mtime)) = (record.get(0), record.get(1)) {
            mtimes.insert(package.to_string(), mtime.to_string());
        }
    }
    Ok(mtimes)
}

/// Convert the contents of `input_dir` into import files in `output_dir`
///
/// Commits and contributors are written once per id and commit relations
/// once per type, start and end, after all repositories have been read.
pub fn prepare_for_neo4j_import(input_dir: &Path, output_dir: &Path) -> Result<ImportStats> {
    let mut ids = NodeIds::new();
    let mut stats = ImportStats::default();
    let mut contributors: UniqueRows<String, Row> = UniqueRows::default();
    let mut commits: UniqueRows<String, Row> = UniqueRows::default();
    let mut general_relations = RelationSet::default();
    let mut contribute_relations = RelationSet::default();

    let mtimes = read_package_snapshot_times(input_dir)?;
    let details_dir = input_dir.join("package_details");
    let mut output = Output::create(output_dir)?;

    for input_row in read_rows(&input_dir.join("repositories.csv"))? {
        let repo_id = format::field(&input_row, "id")?.to_string();
        let snapshot = read_snapshot(input_dir, &repo_id)?;
        output.write(Table::Repo, &format::format_repository(&input_row, &snapshot)?)?;
        stats.repositories += 1;

        let commits_path = repository_csv_path(input_dir, &repo_id, "commits.csv");
        for commit_row in read_rows(&commits_path)? {
            let commit = format::format_commit(&commit_row, &repo_id).map_err(|e| {
                error!("Repo ID: {}: {}", repo_id, e);
                e
            })?;
            // Cloned projects share commits
            commits.insert(commit.id, commit.node);
            contribute_relations.add_relation(commit.authors);
            contribute_relations.add_relation(commit.commits);
            general_relations.add_relation(commit.belongs);
            for (contributor_id, node) in commit.contributors {
                contributors.insert(contributor_id, node);
            }
            for parent in commit.parents {
                general_relations.add_relation(parent);
            }
        }

        for package in format::field(&input_row, "packages")?
            .split(',')
            .filter(|p| !p.is_empty())
        {
            output.write(Table::App, &format::format_app(package))?;
            stats.apps += 1;

            let mtime = mtimes
                .get(package)
                .ok_or_else(|| Error::NotFound(format!("Snapshot time of package {package}")))?;
            let page = parse_play_page(package, &details_dir)?;
            let (node, relation) = format::format_play_page(package, page.as_ref(), mtime, &mut ids);
            output.write(Table::PlayPage, &node)?;
            output.relation(Table::GeneralRelation, &relation)?;
        }

        for tag_row in read_rows(&repository_csv_path(input_dir, &repo_id, "tags.csv"))? {
            let (node, belongs, points) = format::format_tag(&tag_row, &repo_id, &mut ids)?;
            output.write(Table::Tag, &node)?;
            output.relation(Table::GeneralRelation, &belongs)?;
            output.relation(Table::GeneralRelation, &points)?;
        }

        for branch_row in read_rows(&repository_csv_path(input_dir, &repo_id, "branches.csv"))? {
            let (node, belongs, points) = format::format_branch(&branch_row, &repo_id, &mut ids)?;
            output.write(Table::Branch, &node)?;
            output.relation(Table::GeneralRelation, &belongs)?;
            output.relation(Table::GeneralRelation, &points)?;
        }

        for paths_row in read_rows(&repository_csv_path(input_dir, &repo_id, "paths.csv"))? {
            let relation = format::format_implemented(&paths_row, &repo_id)?;
            output.relation(Table::ImplementedRelation, &relation)?;
        }
    }

    for contributor in contributors.iter() {
        output.write(Table::Contributor, contributor)?;
    }
    for commit in commits.iter() {
        output.write(Table::Commit, commit)?;
    }
    for relation in general_relations.iter() {
        output.relation(Table::GeneralRelation, relation)?;
    }
    for relation in contribute_relations.iter() {
        output.relation(Table::ContributeRelation, relation)?;
    }

    stats.commits = commits.len();
    stats.contributors = contributors.len();
    output.finish()?;

    info!(
        "Prepared {} repositories, {} commits, {} contributors and {} apps",
        stats.repositories, stats.commits, stats.contributors, stats.apps
    );
    Ok(stats)
}

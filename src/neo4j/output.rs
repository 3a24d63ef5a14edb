use super::format::*;
use crate::error::{Error, Result};
use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Files of a graph import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Repo,
    Commit,
    App,
    PlayPage,
    Branch,
    Tag,
    Contributor,
    GeneralRelation,
    ContributeRelation,
    ImplementedRelation,
}

impl Table {
    pub const ALL: [Table; 10] = [
        Table::Repo,
        Table::Commit,
        Table::App,
        Table::PlayPage,
        Table::Branch,
        Table::Tag,
        Table::Contributor,
        Table::GeneralRelation,
        Table::ContributeRelation,
        Table::ImplementedRelation,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Table::Repo => "repos.csv",
            Table::Commit => "commits.csv",
            Table::App => "apps.csv",
            Table::PlayPage => "play_pages.csv",
            Table::Branch => "branches.csv",
            Table::Tag => "tags.csv",
            Table::Contributor => "contributors.csv",
            Table::GeneralRelation => "general_relations.csv",
            Table::ContributeRelation => "contribute_relations.csv",
            Table::ImplementedRelation => "implemented_relations.csv",
        }
    }

    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Table::Repo => REPOSITORY_FIELDS,
            Table::Commit => COMMIT_FIELDS,
            Table::App => APP_FIELDS,
            Table::PlayPage => PLAY_PAGE_FIELDS,
            Table::Branch => BRANCH_FIELDS,
            Table::Tag => TAG_FIELDS,
            Table::Contributor => CONTRIBUTOR_FIELDS,
            Table::GeneralRelation => GENERAL_RELATION_FIELDS,
            Table::ContributeRelation => CONTRIBUTOR_RELATION_FIELDS,
            Table::ImplementedRelation => IMPLEMENTED_RELATION_FIELDS,
        }
    }
}

/// CSV writer compatible with the Neo4j import tool
///
/// Every field is quoted, quotes are doubled, backslashes are escaped with
/// a backslash and lines end with `\n`.
pub fn neo4j_writer(path: &Path) -> Result<Writer<File>> {
    Ok(WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_path(path)?)
}

fn escape_backslashes(field: &str) -> String {
    field.replace('\\', "\\\\")
}

/// All writers of a graph import, each with its header already written
pub struct Output {
    directory: PathBuf,
    writers: Vec<Writer<File>>,
}

impl Output {
    pub fn create(directory: &Path) -> Result<Self> {
        std::fs::create_dir_all(directory)?;

        let mut writers = Vec::with_capacity(Table::ALL.len());
        for table in Table::ALL {
            let mut writer = neo4j_writer(&directory.join(table.file_name()))?;
            writer.write_record(table.fields())?;
            writers.push(writer);
        }

        Ok(Self {
            directory: directory.to_path_buf(),
            writers,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn write(&mut self, table: Table, row: &[String]) -> Result<()> {
        if row.len() != table.fields().len() {
            return Err(Error::Internal(format!(
                "{} expects {} fields, got {}",
                table.file_name(),
                table.fields().len(),
                row.len()
            )));
        }
        let writer = &mut self.writers[table as usize];
        writer.write_record(row.iter().map(|field| escape_backslashes(field)))?;
        Ok(())
    }

    pub fn relation(&mut self, table: Table, relation: &Relation) -> Result<()> {
        self.write(table, &relation.to_row())
    }

    /// Flush all files
    pub fn finish(mut self) -> Result<()> {
        for writer in &mut self.writers {
            writer.flush()?;
        }
        debug!("Wrote import files to {}", self.directory.display());
        Ok(())
    }
}

// Command-line interface

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "repo-mining")]
#[command(
    about = "Match Android apps on Google Play with their repositories on GitHub",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add has_gradle_files, renamed_to and not_found from downloaded gradle files
    AddGradleInfo {
        /// Directory to read gradle files from
        #[arg(long, default_value = "out/gradle_files")]
        outdir: PathBuf,

        /// CSV file with a column `full_name`. Default: stdin
        #[arg(short = 'r', long = "repo_list")]
        repo_list: Option<PathBuf>,

        /// CSV file to write the extended table to. Default: stdout
        #[arg(long = "output_list")]
        output_list: Option<PathBuf>,
    },

    /// Download gradle files of repositories on GitHub
    GetGradleFiles {
        /// Directory to save gradle files to
        #[arg(long, default_value = "out/gradle_files")]
        outdir: PathBuf,

        /// CSV file with a column `full_name`. Default: stdin
        #[arg(short = 'r', long = "repo_list")]
        repo_list: Option<PathBuf>,

        /// CSV file to write the extended table to. Default: stdout
        #[arg(long = "output_list")]
        output_list: Option<PathBuf>,
    },

    /// Download metadata of repositories from GitHub
    GetRepoData {
        /// Headerless CSV file of package name and repository name. Default: stdin
        #[arg(short = 'p', long = "package_list")]
        package_list: Option<PathBuf>,

        /// CSV file to write metadata to. Default: stdout
        #[arg(short = 'o', long = "out")]
        out: Option<PathBuf>,
    },

    /// Match package names to GitHub repositories
    MatchPackages {
        /// Directory containing JSON files with details from Google Play
        #[arg(value_name = "DETAILS_DIRECTORY")]
        details_directory: PathBuf,

        /// CSV file with columns `package` and `all_repos`. Default: stdin
        #[arg(short = 'p', long = "package_list")]
        package_list: Option<PathBuf>,

        /// File to write CSV output to. Default: stdout
        #[arg(short = 'o', long = "out")]
        out: Option<PathBuf>,
    },

    /// Draw a random sample of commits touching manifest directories
    DrawCommits {
        /// Headerless CSV file of package name and repository name. Default: stdin
        #[arg(short = 'p', long = "package_list")]
        package_list: Option<PathBuf>,

        /// Minimum number of commits in the main branch
        #[arg(short = 'c', long = "min_commits", default_value_t = 2)]
        min_commits: u64,

        /// Number of commits to draw in total
        #[arg(short = 's', long = "sample_size", default_value_t = 5000)]
        sample_size: usize,

        /// Path to store the sample at. Default: stdout
        #[arg(short = 'o', long = "outfile")]
        outfile: Option<PathBuf>,
    },

    /// Bare clone GitHub repositories listed in a CSV file
    Clone {
        /// Prefix to clone repositories into
        #[arg(short = 'o', long, default_value = "out/github_repos")]
        outdir: PathBuf,

        /// CSV file with columns `full_name` and `commit_count`. Default: stdin
        #[arg(short = 'r', long = "repo_list")]
        repo_list: Option<PathBuf>,

        /// Minimum number of commits in the main branch, 0 disables the filter
        #[arg(short = 'c', long = "min_commits", default_value_t = 2)]
        min_commits: u64,
    },

    /// Download package metadata from Google Play
    GetPlayData {
        /// File to read package names from, one per line. Default: stdin
        #[arg(long)]
        input: Option<PathBuf>,

        /// Directory to store `<package>.json` files in
        #[arg(long, default_value = "out/")]
        outdir: PathBuf,

        /// Path to the gp-bulk-details binary of node-google-play-cli
        #[arg(long = "bulk-details-bin", env = "BULK_DETAILS_BIN")]
        bulk_details_bin: Option<PathBuf>,
    },

    /// Scrape app categories from Google Play
    PlayCategory {
        /// Directory containing JSON files with details from Google Play
        #[arg(value_name = "PLAY_STORE_DETAILS_DIR")]
        play_store_details_dir: PathBuf,
    },

    /// Filter out package names not available on Google Play
    VerifyPlayLink {
        /// File to read package names from. Default: stdin
        #[arg(long)]
        input: Option<PathBuf>,

        /// File to write available package names to. Default: stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Include packages Google Play answers with 403
        #[arg(long = "include-403")]
        include_403: bool,
    },

    /// Store metadata of commits, branches and tags of mirrored repositories
    StoreRepoData {
        /// Output directory
        #[arg(value_name = "OUTDIR")]
        outdir: PathBuf,

        /// CSV file of repositories and their snapshots on GitLab
        #[arg(value_name = "REPOSITORY_LIST")]
        repository_list: PathBuf,

        /// Local path to the bare repositories of the GitLab user
        #[arg(long)]
        gitlab_repos_dir: Option<PathBuf>,

        /// URL of the GitLab instance
        #[arg(long, env = "GITLAB_HOST")]
        gitlab_host: Option<String>,
    },

    /// Delete empty GitLab mirrors and import them from GitHub again
    MirrorEmptyRepos {
        /// File to write the new projects to. Default: stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// CSV file with repository metadata, including `full_name`
        #[arg(long, default_value = commands::mirror_empty_repos::OLD_REPOSITORY_DATA)]
        repo_data: PathBuf,

        /// File listing the GitLab names of empty repositories, one per line
        #[arg(long, default_value = commands::mirror_empty_repos::EMPTY_REPOSITORY_LIST)]
        empty_repos: PathBuf,
    },

    /// Create CSV files for neo4j-admin import
    PrepareNeo4jImport {
        /// Directory containing CSV and JSON files to convert
        input_dir: PathBuf,

        /// Directory to store import files in
        output_dir: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_draw_commits_defaults() {
        let cli = Cli::try_parse_from(["repo-mining", "draw-commits", "-p", "packages.csv"]).unwrap();
        match cli.command {
            Commands::DrawCommits {
                package_list,
                min_commits,
                sample_size,
                outfile,
            } => {
                assert_eq!(package_list, Some(PathBuf::from("packages.csv")));
                assert_eq!(min_commits, 2);
                assert_eq!(sample_size, 5000);
                assert_eq!(outfile, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_verify_play_link() {
        let cli = Cli::try_parse_from(["repo-mining", "verify-play-link", "--include-403"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::VerifyPlayLink { include_403: true, input: None, output: None }
        ));
    }

    #[test]
    fn test_parse_prepare_neo4j_import() {
        let cli = Cli::try_parse_from(["repo-mining", "prepare-neo4j-import", "in", "out"]).unwrap();
        assert!(matches!(cli.command, Commands::PrepareNeo4jImport { .. }));
    }
}

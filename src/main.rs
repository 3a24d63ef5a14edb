use clap::Parser;
use repo_mining::{
    cli::{commands, Cli, Commands},
    config::Settings,
    github::GitHubClient,
    gitlab::GitLabClient,
    play::{BulkDetails, CategoryScraper, PlayVerifier},
    utils::{open_input, open_output},
    Result,
};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    let _ = dotenvy::dotenv();

    // stdout carries data, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,repo_mining=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let settings = Settings::from_env()?;
    settings.validate()?;

    if let Err(e) = run(cli.command, settings).await {
        error!("{}", e.log_safe());
        return Err(e);
    }

    Ok(())
}

async fn run(command: Commands, settings: Settings) -> Result<()> {
    match command {
        Commands::AddGradleInfo {
            outdir,
            repo_list,
            output_list,
        } => add_gradle_info(outdir, repo_list, output_list),
        Commands::GetGradleFiles {
            outdir,
            repo_list,
            output_list,
        } => get_gradle_files(settings, outdir, repo_list, output_list).await,
        Commands::GetRepoData { package_list, out } => {
            get_repo_data(settings, package_list, out).await
        }
        Commands::MatchPackages {
            details_directory,
            package_list,
            out,
        } => match_packages(settings, details_directory, package_list, out).await,
        Commands::DrawCommits {
            package_list,
            min_commits,
            sample_size,
            outfile,
        } => draw_commits(settings, package_list, min_commits, sample_size, outfile).await,
        Commands::Clone {
            outdir,
            repo_list,
            min_commits,
        } => clone(settings, outdir, repo_list, min_commits).await,
        Commands::GetPlayData {
            input,
            outdir,
            bulk_details_bin,
        } => get_play_data(settings, input, outdir, bulk_details_bin).await,
        Commands::PlayCategory {
            play_store_details_dir,
        } => play_category(settings, play_store_details_dir).await,
        Commands::VerifyPlayLink {
            input,
            output,
            include_403,
        } => verify_play_link(settings, input, output, include_403).await,
        Commands::StoreRepoData {
            outdir,
            repository_list,
            gitlab_repos_dir,
            gitlab_host,
        } => {
            store_repo_data(settings, outdir, repository_list, gitlab_repos_dir, gitlab_host).await
        }
        Commands::MirrorEmptyRepos {
            output,
            repo_data,
            empty_repos,
        } => mirror_empty_repos(settings, output, repo_data, empty_repos).await,
        Commands::PrepareNeo4jImport {
            input_dir,
            output_dir,
        } => commands::prepare_neo4j_import::prepare_neo4j_import(&input_dir, &output_dir)
            .map(|_| ()),
    }
}

fn add_gradle_info(
    outdir: PathBuf,
    repo_list: Option<PathBuf>,
    output_list: Option<PathBuf>,
) -> Result<()> {
    let input = open_input(repo_list.as_deref())?;
    let output = open_output(output_list.as_deref())?;
    let rows = commands::add_gradle_info::update_csv_table(input, &outdir, output)?;
    info!("Updated {} repositories", rows);
    Ok(())
}

async fn get_gradle_files(
    settings: Settings,
    outdir: PathBuf,
    repo_list: Option<PathBuf>,
    output_list: Option<PathBuf>,
) -> Result<()> {
    let mut github = GitHubClient::new(settings.github)?;
    let input = open_input(repo_list.as_deref())?;
    let output = open_output(output_list.as_deref())?;
    let rows =
        commands::get_gradle_files::get_gradle_files(input, &mut github, &outdir, output).await?;
    info!("Searched gradle files of {} repositories", rows);
    Ok(())
}

async fn get_repo_data(
    settings: Settings,
    package_list: Option<PathBuf>,
    out: Option<PathBuf>,
) -> Result<()> {
    let mut github = GitHubClient::new(settings.github)?;
    let input = open_input(package_list.as_deref())?;
    let output = open_output(out.as_deref())?;
    let rows = commands::get_repo_data::get_repo_data(input, &mut github, output).await?;
    info!("Wrote metadata of {} repositories", rows);
    Ok(())
}

async fn match_packages(
    settings: Settings,
    details_directory: PathBuf,
    package_list: Option<PathBuf>,
    out: Option<PathBuf>,
) -> Result<()> {
    let mut github = GitHubClient::new(settings.github)?;
    let input = open_input(package_list.as_deref())?;
    let output = open_output(out.as_deref())?;
    let stats = commands::match_packages::match_packages(
        input,
        &details_directory,
        &mut github,
        output,
    )
    .await?;
    info!("Matched {} of {} packages", stats.valid + stats.no_github_link_but_unique_popular, stats.all);
    Ok(())
}

async fn draw_commits(
    settings: Settings,
    package_list: Option<PathBuf>,
    min_commits: u64,
    sample_size: usize,
    outfile: Option<PathBuf>,
) -> Result<()> {
    info!("------- Arguments: -------");
    info!("Reading package_list from {}", display_or(&package_list, "stdin"));
    info!("Skipping repos with fewer than {} commits", min_commits);
    info!("Sample size: {}", sample_size);
    info!("Write output to {}", display_or(&outfile, "stdout"));
    info!("------- Arguments end -------");

    let mut github = GitHubClient::new(settings.github)?;
    let input = open_input(package_list.as_deref())?;
    let output = open_output(outfile.as_deref())?;
    commands::draw_commits::print_commit_sample(input, min_commits, sample_size, &mut github, output)
        .await?;
    Ok(())
}

async fn clone(
    settings: Settings,
    outdir: PathBuf,
    repo_list: Option<PathBuf>,
    min_commits: u64,
) -> Result<()> {
    let mut github = GitHubClient::new(settings.github)?;
    let input = open_input(repo_list.as_deref())?;
    let cloned = commands::clone::clone_repositories(
        input,
        min_commits,
        &outdir,
        &mut github,
        &settings.tools.git_bin,
    )
    .await?;
    info!("Cloned {} repositories", cloned);
    Ok(())
}

async fn get_play_data(
    settings: Settings,
    input: Option<PathBuf>,
    outdir: PathBuf,
    bulk_details_bin: Option<PathBuf>,
) -> Result<()> {
    let bulk = BulkDetails::new(bulk_details_bin.unwrap_or(settings.tools.bulk_details_bin));
    let input = open_input(input.as_deref())?;
    commands::get_play_data::download_package_details(input, &outdir, &bulk).await?;
    Ok(())
}

async fn play_category(settings: Settings, details_dir: PathBuf) -> Result<()> {
    info!("------- Arguments: -------");
    info!("PLAY_STORE_DETAILS_DIR: {}", details_dir.display());

    let scraper = CategoryScraper::new(
        settings.play.details_url,
        &settings.play.accept_language,
        settings.github.timeout_secs,
    )?;
    let found = commands::play_category::scrape_categories(&details_dir, &scraper).await?;
    info!("Found categories of {} packages", found);
    Ok(())
}

async fn verify_play_link(
    settings: Settings,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    include_403: bool,
) -> Result<()> {
    let verifier = PlayVerifier::new(settings.play.details_url, settings.github.timeout_secs)?;
    let input = open_input(input.as_deref())?;
    let output = open_output(output.as_deref())?;
    let available =
        commands::verify_play_link::package_filter(input, output, &verifier, include_403).await?;
    info!("{} packages are available on Google Play", available);
    Ok(())
}

async fn store_repo_data(
    settings: Settings,
    outdir: PathBuf,
    repository_list: PathBuf,
    gitlab_repos_dir: Option<PathBuf>,
    gitlab_host: Option<String>,
) -> Result<()> {
    let gitlab_repos_dir = gitlab_repos_dir.unwrap_or(settings.gitlab.repository_path);
    let gitlab_host = gitlab_host.unwrap_or(settings.gitlab.host);

    info!("------- Arguments: -------");
    info!("OUTDIR: {}", outdir.display());
    info!("REPOSITORY_LIST: {}", repository_list.display());
    info!("--gitlab-repos-dir: {}", gitlab_repos_dir.display());
    info!("--gitlab-host: {}", gitlab_host);
    info!("------- Arguments end -------");

    let gitlab = GitLabClient::new(&gitlab_host, None, settings.github.timeout_secs)?;
    let input = open_input(Some(&repository_list))?;
    let stored = commands::store_repo_data::store_repository_info(
        input,
        &gitlab,
        &gitlab_repos_dir,
        &settings.tools.git_bin,
        &outdir,
    )
    .await?;
    info!("Stored data of {} repositories", stored);
    Ok(())
}

async fn mirror_empty_repos(
    settings: Settings,
    output: Option<PathBuf>,
    repo_data: PathBuf,
    empty_repos: PathBuf,
) -> Result<()> {
    info!("------- Constants: -------");
    info!("GITLAB_HOST: {}", settings.gitlab.host);
    info!("GITLAB_TOKEN_FILE: {}", settings.gitlab.token_file.display());
    info!("OLD_REPOSITORY_DATA: {}", repo_data.display());
    info!("EMPTY_REPOSITORY_LIST: {}", empty_repos.display());
    info!("------- Arguments: -------");
    info!("--output: {}", display_or(&output, "stdout"));
    info!("------- Arguments end -------");

    let token = GitLabClient::read_token_file(&settings.gitlab.token_file)?;
    let gitlab = GitLabClient::new(&settings.gitlab.host, Some(&token), settings.github.timeout_secs)?;
    let empty = open_input(Some(&empty_repos))?;
    let data = open_input(Some(&repo_data))?;
    let output = open_output(output.as_deref())?;

    let mirrored = commands::mirror_empty_repos::mirror_empty_repos(
        empty,
        data,
        &gitlab,
        commands::mirror_empty_repos::DELETE_DELAY,
        output,
    )
    .await?;
    info!("Mirrored {} repositories again", mirrored.len());
    Ok(())
}

fn display_or(path: &Option<PathBuf>, default: &str) -> String {
    path.as_deref()
        .map(Path::display)
        .map(|p| p.to_string())
        .unwrap_or_else(|| default.to_string())
}

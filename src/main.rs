mod compare;
mod config;
mod report;

use clap::Parser;
use compare::{CommitsComparison, Coordinates, FakeRequest, GithubRequest, Request};
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

const MOCK_REPO: &str = "octocat/hello-world";
const MOCK_BASE: &str = "main";
const MOCK_HEAD: &str = "feature/oauth";

/// gh-compare — fetch a GitHub comparison between two commit references
/// and summarize the files that changed.
#[derive(Parser, Debug)]
#[command(name = "gh-compare", version, about)]
struct Cli {
    /// Repository as owner/repo (e.g., octocat/hello-world)
    ///
    /// Not required when --mock is used.
    repo: Option<String>,

    /// Base commit reference: sha, branch or tag
    base: Option<String>,

    /// Head commit reference: sha, branch or tag
    head: Option<String>,

    /// Optional output file path for markdown report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use a built-in comparison for demo purposes (no network or token needed)
    #[arg(long)]
    r#mock: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.r#mock {
        info!("using mock comparison data for demo");
        let request = FakeRequest::new().with_body(include_str!("../tests/fixtures/sample_compare.json"));
        let comparison = CommitsComparison::new(
            request,
            MOCK_REPO.parse()?,
            cli.base.as_deref().unwrap_or(MOCK_BASE),
            cli.head.as_deref().unwrap_or(MOCK_HEAD),
        )?;
        run(&comparison, cli.output.as_deref()).await?;
        debug!(requests = comparison.request().calls(), "mock transport served");
        return Ok(());
    }

    let usage = "repository, base and head are required unless --mock is used. Usage: gh-compare <OWNER/REPO> <BASE> <HEAD> or gh-compare --mock";
    let (repo, base, head) = match (cli.repo.as_deref(), cli.base.as_deref(), cli.head.as_deref()) {
        (Some(repo), Some(base), Some(head)) => (repo, base, head),
        _ => return Err(usage.into()),
    };

    let _main_span = info_span!("gh_compare", repo = %repo, base = %base, head = %head).entered();

    info!("parsing repository");
    let coords: Coordinates = repo.parse()?;
    debug!(owner = %coords.owner, repo = %coords.repo, "parsed repository");

    info!("loading configuration");
    let config = config::Config::load()?;
    let token = config.github_token();
    if token.is_none() {
        info!("no GitHub token configured, using anonymous access");
    }

    let request = GithubRequest::new(&config.github.api_url, &config.github.user_agent, token);
    let comparison = CommitsComparison::new(request, coords, base, head)?;
    run(&comparison, cli.output.as_deref()).await
}

async fn run<R: Request>(
    comparison: &CommitsComparison<R>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(path = %comparison.path(), "fetching comparison from GitHub");
    let files = comparison.files().await?;
    if files.is_empty() {
        info!("no file changes between the two references");
    } else {
        info!(files = files.len(), "fetched comparison");
    }

    info!("generating report");
    let built_report = report::build(comparison).await?;
    report::output(&built_report, output)?;
    info!(
        files = built_report.files.len(),
        additions = built_report.additions,
        deletions = built_report.deletions,
        "done"
    );

    Ok(())
}

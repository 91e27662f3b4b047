use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use shelfload::config::{LoaderConfig, DEFAULT_BOLT_URI};
use shelfload::models::{Author, Book};
use shelfload::store::{MemoryStore, Neo4jConfig, Neo4jStore};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "shelfload")]
#[command(about = "Load Open Library author and work dumps into a graph store")]
struct Cli {
    /// Verbosity level (-v debug, -vv trace); stage completion is logged at the default level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load authors, then works
    Load(LoadArgs),
    /// Load the author dump only
    Authors(AuthorArgs),
    /// Load the works dump only, resolving names against stored authors
    Works(WorkArgs),
}

#[derive(Args)]
struct LoadArgs {
    /// Path to the author dump
    #[arg(long, env = "DATADUMP_LOCATION_AUTHOR")]
    author_dump: PathBuf,

    /// Path to the works dump
    #[arg(long, env = "DATADUMP_LOCATION_WORKS")]
    works_dump: PathBuf,

    /// Parse and enrich in memory without touching Neo4j
    #[arg(long)]
    dry_run: bool,

    #[command(flatten)]
    work: WorkOptions,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct AuthorArgs {
    /// Path to the author dump
    #[arg(long, env = "DATADUMP_LOCATION_AUTHOR")]
    author_dump: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct WorkArgs {
    /// Path to the works dump
    #[arg(long, env = "DATADUMP_LOCATION_WORKS")]
    works_dump: PathBuf,

    #[command(flatten)]
    work: WorkOptions,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct WorkOptions {
    /// Keep works without a `created` timestamp (published date left unset)
    #[arg(long)]
    allow_missing_created: bool,
}

#[derive(Args)]
struct CommonArgs {
    /// Limit number of lines read from each dump (for testing)
    #[arg(long)]
    limit: Option<u64>,

    /// Neo4j Bolt URI
    #[arg(long, env = "NEO4J_URI", default_value = DEFAULT_BOLT_URI)]
    bolt_uri: String,

    /// Neo4j user
    #[arg(long, env = "NEO4J_USER", default_value = "")]
    user: String,

    /// Neo4j password
    #[arg(long, env = "NEO4J_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,
}

impl CommonArgs {
    fn neo4j(&self) -> Neo4jConfig {
        Neo4jConfig {
            bolt_uri: self.bolt_uri.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }
}

async fn run_load(args: LoadArgs) -> Result<()> {
    let mut config = LoaderConfig::new(args.author_dump, args.works_dump);
    config.limit = args.common.limit;
    config.require_created = !args.work.allow_missing_created;

    let summary = if args.dry_run {
        info!("Dry run, using in-memory store");
        let authors: MemoryStore<Author> = MemoryStore::new();
        let books: MemoryStore<Book> = MemoryStore::new();
        shelfload::run(&config, &authors, &books).await?
    } else {
        let store = Neo4jStore::connect(&args.common.neo4j()).await?;
        shelfload::run(&config, &store, &store).await?
    };

    info!(
        authors = summary.authors,
        books = summary.books,
        "Load finished"
    );
    Ok(())
}

async fn run_authors(args: AuthorArgs) -> Result<()> {
    let mut config = LoaderConfig::new(args.author_dump, PathBuf::new());
    config.limit = args.common.limit;

    let store = Neo4jStore::connect(&args.common.neo4j()).await?;
    shelfload::authors::load_authors(&config, &store).await?;
    Ok(())
}

async fn run_works(args: WorkArgs) -> Result<()> {
    let mut config = LoaderConfig::new(PathBuf::new(), args.works_dump);
    config.limit = args.common.limit;
    config.require_created = !args.work.allow_missing_created;

    let store = Neo4jStore::connect(&args.common.neo4j()).await?;
    shelfload::works::load_works(&config, &store, &store).await?;
    Ok(())
}

/// Stage completion signals are INFO, so they show without `-v`.
fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = log_level(cli.verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let start = Instant::now();
    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(anyhow::Error::from)
        .and_then(|rt| {
            rt.block_on(async {
                match cli.command {
                    Commands::Load(args) => run_load(args).await,
                    Commands::Authors(args) => run_authors(args).await,
                    Commands::Works(args) => run_works(args).await,
                }
            })
        });

    match result {
        Ok(()) => {
            info!(
                duration_secs = start.elapsed().as_secs_f64(),
                "Completed successfully"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_shows_completion() {
        assert_eq!(log_level(0), Level::INFO);
    }

    #[test]
    fn verbosity_raises_detail() {
        assert_eq!(log_level(1), Level::DEBUG);
        assert_eq!(log_level(2), Level::TRACE);
        assert_eq!(log_level(5), Level::TRACE);
    }

    #[test]
    fn load_reads_dump_paths() {
        let cli = Cli::try_parse_from([
            "shelfload",
            "load",
            "--author-dump",
            "authors.txt",
            "--works-dump",
            "works.txt",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 0);
        match cli.command {
            Commands::Load(args) => {
                assert_eq!(args.author_dump, PathBuf::from("authors.txt"));
                assert!(args.dry_run);
            }
            _ => panic!("expected load"),
        }
    }
}

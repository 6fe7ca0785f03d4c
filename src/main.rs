//! wiki-crawler main entry point
//!
//! This is the command-line interface for the wiki-crawler article crawler.

use clap::{CommandFactory, Parser};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use wiki_crawler::config::{load_config_with_hash, Config};
use wiki_crawler::crawler::crawl;
use wiki_crawler::output::{load_statistics, print_report, print_statistics};
use wiki_crawler::storage::SqliteStorage;
use wiki_crawler::validate_article_url;

/// wiki-crawler: a depth-bounded encyclopedia article crawler
///
/// Starting from one article, wiki-crawler follows article links up to a
/// fixed depth with a pool of concurrent workers, recording every visited
/// article and every discovered link in a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "wiki-crawler")]
#[command(version)]
#[command(about = "A depth-bounded encyclopedia article crawler", long_about = None)]
struct Cli {
    /// Seed article URL, e.g. https://en.wikipedia.org/wiki/Rust
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Clear stored visited and discovered records before crawling
    #[arg(long, conflicts_with = "stats")]
    fresh: bool,

    /// Show statistics from the database and exit
    #[arg(long)]
    stats: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // `help` and `list` are accepted as positional aliases for --help
    if cli.url.as_deref().is_some_and(is_usage_alias) {
        return print_usage();
    }

    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = match load_configuration(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.stats {
        return match handle_stats(&config) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let Some(url) = cli.url else {
        eprintln!("Error: no seed URL given");
        eprintln!("Usage: wiki-crawler [OPTIONS] <URL>  (see --help)");
        return ExitCode::FAILURE;
    };

    let seed = match validate_article_url(&url) {
        Ok(seed) => seed,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Expected an article URL like https://en.wikipedia.org/wiki/Rust");
            return ExitCode::FAILURE;
        }
    };

    match handle_crawl(config, config_hash, seed.as_str(), cli.fresh).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn is_usage_alias(arg: &str) -> bool {
    arg.eq_ignore_ascii_case("help") || arg.eq_ignore_ascii_case("list")
}

fn print_usage() -> ExitCode {
    let mut command = Cli::command();
    match command.print_help() {
        Ok(()) => {
            println!();
            ExitCode::SUCCESS
        }
        Err(_) => ExitCode::FAILURE,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wiki_crawler=info,warn"),
            1 => EnvFilter::new("wiki_crawler=debug,info"),
            2 => EnvFilter::new("wiki_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file if one was given, otherwise the built-in defaults
fn load_configuration(
    path: Option<&Path>,
) -> Result<(Config, Option<String>), wiki_crawler::ConfigError> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok((config, Some(hash)))
        }
        None => Ok((Config::default(), None)),
    }
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: Option<String>,
    seed_url: &str,
    fresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring previous records)");
    } else {
        tracing::info!("Starting crawl (previously visited articles are skipped)");
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, stopping workers");
                cancel.cancel();
            }
        });
    }

    let report = crawl(config, config_hash, seed_url, fresh, cancel).await?;
    print_report(&report);

    Ok(())
}

//! # Site Harness CLI (`site`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `site init` | Create the SQLite database and schema |
//! | `site crawl <url>` | Crawl a site and index its pages |
//! | `site ask "<question>"` | Answer a question from indexed pages |
//! | `site scrape <url>` | Print the readable text of one page |
//! | `site stats` | Show index size and crawled hosts |
//! | `site serve` | Start the HTTP tool server |
//!
//! ## Examples
//!
//! ```bash
//! site --config ./config/site.toml init
//! site --config ./config/site.toml crawl https://example.com/ --max-pages 50 --exclude /login
//! site --config ./config/site.toml ask "how do I reset my password" --top-k 5
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides `[logging].level`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use site_harness::app::{self, format_crawl_summary, App};
use site_harness::config::{self, Config};
use site_harness::fetch::HttpFetcher;
use site_harness::models::CrawlState;
use site_harness::{migrate, server};

/// Site Harness: crawl a website, index it, and ask it questions.
#[derive(Parser)]
#[command(name = "site", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// When the file does not exist, built-in defaults are used.
    #[arg(long, global = true, default_value = "./config/site.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the index database. Safe to run repeatedly.
    Init,

    /// Crawl a site breadth-first from BASE_URL and index its pages.
    Crawl {
        base_url: String,

        /// Maximum number of pages to visit (default: `[crawl].max_pages`).
        #[arg(long)]
        max_pages: Option<usize>,

        /// Skip URLs containing this substring. Repeatable.
        #[arg(long = "exclude")]
        exclude: Vec<String>,
    },

    /// Answer a question from the indexed pages.
    Ask {
        question: String,

        /// Number of results (default: `[retrieval].top_k`).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Fetch one page and print its text.
    Scrape { url: String },

    /// Show how many pages are indexed and from which hosts.
    Stats,

    /// Start the HTTP tool server on `[server].bind`.
    Serve,
}

fn load(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

fn init_logging(cfg: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.logging.level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let cfg = load(&cli.config)?;
    init_logging(&cfg);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized at {}", cfg.db.path.display());
        }
        Commands::Crawl {
            base_url,
            max_pages,
            exclude,
        } => {
            let app = Arc::new(App::open(&cfg).await?);
            let on_signal = app.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupted, stopping crawl");
                    on_signal.shutdown();
                }
            });

            let report = app.crawl(&base_url, max_pages, &exclude).await;
            println!("{}", format_crawl_summary(&report));
            if report.state == CrawlState::Failed {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Ask { question, top_k } => {
            let app = App::open(&cfg).await?;
            println!("{}", app.ask_site(&question, top_k).await);
        }
        Commands::Scrape { url } => {
            let fetcher = HttpFetcher::new(&cfg.crawl)?;
            match app::scrape(&fetcher, &url).await {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    println!("Error scraping {}: {}", url, e);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Stats => {
            let app = App::open(&cfg).await?;
            let stats = app.stats().await?;
            println!("Pages indexed: {}", stats.pages);
            println!("Hosts: {}", stats.hosts.len());
            for host in &stats.hosts {
                println!("  {}", host);
            }
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

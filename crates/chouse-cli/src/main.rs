mod display;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use chouse_core::config::{DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE, DEFAULT_WORKERS};
use chouse_core::{ExportFormat, PipelineConfig};
use chouse_registry::http::DEFAULT_BASE_URL;
use chouse_registry::{DiskCache, HttpRegistry, RegistryConfig, RetryPolicy};
use chouse_server::{Pipeline, build_router};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "chouse", version)]
#[command(about = "Search the Companies House register and export company details")]
struct Cli {
    #[command(flatten)]
    registry: RegistryArgs,

    #[command(flatten)]
    pipeline: PipelineArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct RegistryArgs {
    /// Registry API key, sent as the basic-auth username
    #[arg(long, env = "CHOUSE_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    #[arg(long, env = "CHOUSE_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    /// Per-request timeout
    #[arg(long, env = "CHOUSE_TIMEOUT_SECS", default_value_t = 30, global = true)]
    timeout_secs: u64,

    /// Attempts per request when rate limited (1 disables retrying)
    #[arg(long, env = "CHOUSE_RETRY_ATTEMPTS", default_value_t = 3, global = true)]
    retry_attempts: u32,

    #[arg(long, env = "CHOUSE_RETRY_DELAY_SECS", default_value_t = 30, global = true)]
    retry_delay_secs: u64,
}

#[derive(ClapArgs, Debug)]
struct PipelineArgs {
    #[arg(
        long,
        env = "CHOUSE_PAGE_SIZE",
        default_value_t = DEFAULT_PAGE_SIZE,
        value_parser = positive,
        global = true
    )]
    page_size: usize,

    /// Concurrent detail lookups
    #[arg(
        long,
        env = "CHOUSE_WORKERS",
        default_value_t = DEFAULT_WORKERS,
        value_parser = positive,
        global = true
    )]
    workers: usize,

    #[arg(
        long,
        env = "CHOUSE_MAX_PAGES",
        default_value_t = DEFAULT_MAX_PAGES,
        value_parser = positive,
        global = true
    )]
    max_pages: usize,

    /// Cache raw search pages here; caching is off when unset
    #[arg(long, env = "CHOUSE_CACHE_DIR", global = true)]
    cache_dir: Option<PathBuf>,

    #[arg(long, env = "CHOUSE_OUTPUT_DIR", default_value = "exports", global = true)]
    output_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "CHOUSE_BIND", default_value = "127.0.0.1:5000")]
        bind: SocketAddr,
    },
    /// Search by name and show detailed results
    Search {
        query: String,
        #[arg(long, default_value_t = 1, value_parser = positive)]
        page: usize,
        /// List every match (summaries only) instead of one detailed page
        #[arg(long)]
        all: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show one company by number
    Company {
        number: String,
        #[arg(long)]
        json: bool,
    },
    /// Export every match for a query to xlsx or CSV
    Export {
        query: String,
        #[arg(long, default_value = "xlsx")]
        format: ExportFormat,
        /// Keep only companies with this SIC code
        #[arg(long)]
        sic_code: Option<String>,
    },
    /// Look up the company numbers listed in a CSV file
    Import {
        file: PathBuf,
        #[arg(long, default_value_t = 1, value_parser = positive)]
        page: usize,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chouse=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let pipeline = build_pipeline(&cli)?;

    match cli.command {
        Command::Serve { bind } => serve(pipeline, bind).await,
        Command::Search {
            query, all: true, json, ..
        } => interruptible(search_all(&pipeline, &query, json)).await,
        Command::Search {
            query, page, json, ..
        } => interruptible(search(&pipeline, &query, page, json)).await,
        Command::Company { number, json } => interruptible(company(&pipeline, &number, json)).await,
        Command::Export {
            query,
            format,
            sic_code,
        } => interruptible(export(&pipeline, &query, format, sic_code.as_deref())).await,
        Command::Import { file, page, json } => {
            interruptible(import(&pipeline, &file, page, json)).await
        }
    }
}

/// Counts and page numbers start at 1.
fn positive(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn build_pipeline(cli: &Cli) -> anyhow::Result<Pipeline> {
    let api_key = cli
        .registry
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .context("no API key: set CHOUSE_API_KEY or pass --api-key")?;

    let mut config = RegistryConfig::new(api_key);
    config.base_url = cli.registry.base_url.clone();
    config.page_size = cli.pipeline.page_size;
    config.timeout = Duration::from_secs(cli.registry.timeout_secs);
    config.retry = RetryPolicy {
        max_attempts: cli.registry.retry_attempts.max(1),
        delay: Duration::from_secs(cli.registry.retry_delay_secs),
    };

    let mut registry = HttpRegistry::new(config).context("failed to build HTTP client")?;
    if let Some(dir) = &cli.pipeline.cache_dir {
        let cache = DiskCache::open(dir)
            .with_context(|| format!("failed to open cache directory {}", dir.display()))?;
        info!(dir = %dir.display(), "search page cache enabled");
        registry = registry.with_cache(Arc::new(cache));
    }

    let config = PipelineConfig {
        page_size: cli.pipeline.page_size,
        workers: cli.pipeline.workers,
        max_pages: cli.pipeline.max_pages,
        cache_dir: cli.pipeline.cache_dir.clone(),
        output_dir: cli.pipeline.output_dir.clone(),
    };
    Ok(Pipeline::new(Arc::new(registry), config))
}

async fn serve(pipeline: Pipeline, bind: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(%bind, "chouse v{} listening", env!("CARGO_PKG_VERSION"));

    axum::serve(listener, build_router(pipeline))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("server error")
}

/// Ctrl-C drops `work`, cancelling its in-flight registry calls.
async fn interruptible(work: impl Future<Output = anyhow::Result<()>>) -> anyhow::Result<()> {
    tokio::select! {
        result = work => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, cancelling in-flight requests");
            bail!("interrupted")
        }
    }
}

async fn search_all(pipeline: &Pipeline, query: &str, json: bool) -> anyhow::Result<()> {
    let list = pipeline.search_all(query).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        print!("{}", display::render_summaries(&list.items));
        println!("{} companies", list.total);
    }
    Ok(())
}

async fn search(pipeline: &Pipeline, query: &str, page: usize, json: bool) -> anyhow::Result<()> {
    let result = pipeline.search_page(query, page).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    print!("{}", display::render_cards(&result.data)?);
    print!("{}", display::render_failed(&result.failed));
    let p = &result.pagination;
    println!(
        "page {} of {} ({} results)",
        p.current_page, p.total_pages, p.total_results
    );
    Ok(())
}

async fn company(pipeline: &Pipeline, number: &str, json: bool) -> anyhow::Result<()> {
    let record = pipeline.company(number).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print!("{}", display::render_cards(std::slice::from_ref(&record))?);
    }
    Ok(())
}

async fn export(
    pipeline: &Pipeline,
    query: &str,
    format: ExportFormat,
    sic_code: Option<&str>,
) -> anyhow::Result<()> {
    let report = pipeline.export(query, format, sic_code).await?;
    println!(
        "Wrote {} of {} companies to {}",
        report.exported,
        report.matched,
        report.file.path.display()
    );
    if !report.failed.is_empty() {
        println!("{} lookups failed and were skipped:", report.failed.len());
        print!("{}", display::render_failed(&report.failed));
    }
    Ok(())
}

async fn import(pipeline: &Pipeline, file: &Path, page: usize, json: bool) -> anyhow::Result<()> {
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let result = pipeline.import(&data, page).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    print!("{}", display::render_cards(&result.data)?);
    print!("{}", display::render_failed(&result.failed));
    let p = &result.pagination;
    println!(
        "page {} of {} ({} company numbers)",
        p.current_page, p.total_pages, p.total_results
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn export_parses_format_aliases() {
        let cli = Cli::try_parse_from(["chouse", "export", "UKPA", "--format", "excel"]).unwrap();
        match cli.command {
            Command::Export { query, format, .. } => {
                assert_eq!(query, "UKPA");
                assert_eq!(format, ExportFormat::Xlsx);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["chouse", "export", "UKPA", "--format", "pdf"]).is_err());
    }

    #[test]
    fn zero_counts_are_rejected() {
        for flag in ["--page-size", "--workers", "--max-pages"] {
            let err = Cli::try_parse_from(["chouse", "search", "acme", flag, "0"]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation, "{flag}");
        }
        assert!(Cli::try_parse_from(["chouse", "search", "acme", "--page", "0"]).is_err());
        assert!(Cli::try_parse_from(["chouse", "search", "acme", "--workers", "x"]).is_err());
    }

    #[test]
    fn serve_parses_bind_address() {
        let cli = Cli::try_parse_from(["chouse", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        match cli.command {
            Command::Serve { bind } => assert_eq!(bind.port(), 8080),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn missing_api_key_is_reported() {
        let cli = Cli::try_parse_from(["chouse", "--api-key", " ", "company", "1"]).unwrap();
        let err = build_pipeline(&cli).err().unwrap();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn flags_populate_pipeline_config() {
        let dir = std::env::temp_dir().join("chouse-cli-test-out");
        let cli = Cli::try_parse_from([
            "chouse",
            "search",
            "acme",
            "--api-key",
            "k",
            "--workers",
            "4",
            "--page-size",
            "50",
            "--output-dir",
            dir.to_str().unwrap(),
        ])
        .unwrap();
        let pipeline = build_pipeline(&cli).unwrap();
        assert_eq!(pipeline.config().workers, 4);
        assert_eq!(pipeline.config().page_size, 50);
        assert_eq!(pipeline.config().output_dir, dir);
        assert!(pipeline.config().cache_dir.is_none());
    }
}

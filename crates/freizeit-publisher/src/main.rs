//! freizeit engine entry point.

use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tracing::warn;

use freizeit_core::{TracingConfig, init_tracing};
use freizeit_feeds::FeedFetcher;
use freizeit_publisher::cli::Cli;
use freizeit_publisher::config::EngineConfig;
use freizeit_publisher::error::PublishResult;
use freizeit_publisher::pipeline::{run_free_time, run_status_log};
use freizeit_publisher::runner::{PeriodicRunner, RunnerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else if cli.once {
        TracingConfig::default()
    } else {
        TracingConfig::engine()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> PublishResult<()> {
    let config = EngineConfig::load(cli.config.as_deref())?;
    let fetcher = FeedFetcher::new()?;

    if cli.once {
        return run_pipelines(&cli, &config, &fetcher).await;
    }

    let runner = PeriodicRunner::new(RunnerConfig::new(config.run_interval()));
    let handle = runner.handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = handle.stop().await;
        }
    });

    let config = Arc::new(config);
    let fetcher = Arc::new(fetcher);
    let cli = Arc::new(cli);
    runner
        .run(move || {
            let config = config.clone();
            let fetcher = fetcher.clone();
            let cli = cli.clone();
            async move {
                run_pipelines(&cli, &config, &fetcher)
                    .await
                    .map_err(|e| e.to_string())
            }
        })
        .await;
    Ok(())
}

/// Runs the configured pipelines for one tick.
async fn run_pipelines(cli: &Cli, config: &EngineConfig, fetcher: &FeedFetcher) -> PublishResult<()> {
    if cli.wants_free_time() {
        run_free_time(config, fetcher, Utc::now()).await?;
    }
    if cli.wants_status_log() {
        if config.sources.status_feed_url.is_some() {
            run_status_log(config, fetcher).await?;
        } else if cli.artifact.is_some() {
            warn!("status log requested but no status feed URL configured");
        }
    }
    Ok(())
}

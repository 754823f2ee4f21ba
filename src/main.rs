// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! strava-etl command line
//!
//! `sync` pulls the athlete's activity history into the database,
//! `serve` runs the webhook receiver that keeps it current.

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use strava_etl::{
    config::{Config, ConfigError},
    db,
    services::{tasks, FetchOptions, Pipeline, TasksService},
    time_utils::{format_utc_rfc3339, parse_cutoff},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "strava-etl", version, about = "Load Strava activities into a database")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the activity history and upsert it
    Sync {
        /// Only activities after this date (RFC3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_cutoff)]
        after: Option<DateTime<Utc>>,
        /// Activities per page (1-200)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=200))]
        per_page: Option<u32>,
        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<u32>,
    },
    /// Run the webhook server
    Serve,
    /// Write every stored activity to a CSV file
    Export {
        /// Path of the CSV file to write
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Create the activities table and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Sync {
            after,
            per_page,
            max_pages,
        } => {
            let mut options = FetchOptions::from_config(&config);
            options.after = after;
            if let Some(per_page) = per_page {
                options.per_page = per_page;
            }
            if let Some(max_pages) = max_pages {
                options.max_pages = max_pages;
            }
            run_sync(&config, options).await
        }
        Commands::Serve => serve(config).await,
        Commands::Export { output } => export(&config, output).await,
        Commands::Migrate => {
            let store = db::connect(&config.database_url).await?;
            store.migrate().await?;
            tracing::info!("Migration complete");
            Ok(())
        }
    }
}

async fn run_sync(config: &Config, options: FetchOptions) -> anyhow::Result<()> {
    if let Some(after) = options.after {
        tracing::info!(after = %format_utc_rfc3339(after), "Syncing activities after cutoff");
    }

    let store = db::connect(&config.database_url).await?;
    store.migrate().await?;

    let pipeline = Pipeline::from_config(config, store);
    let report = pipeline.sync(&options).await?;

    println!(
        "Fetched {} activities, wrote {} rows",
        report.fetched, report.loaded
    );
    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    if config.webhook_verify_token.is_none() {
        return Err(ConfigError::Missing("WEBHOOK_VERIFY_TOKEN").into());
    }

    let store = db::connect(&config.database_url).await?;
    store.migrate().await?;

    let pipeline = Arc::new(Pipeline::from_config(&config, store));
    let (tasks_service, receiver) = TasksService::new();
    let worker = tasks::spawn_worker(pipeline, receiver);

    let state = Arc::new(AppState {
        config: config.clone(),
        tasks: tasks_service,
    });
    let app = strava_etl::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router (and with it the last queue sender) is gone; let the
    // worker finish whatever is still queued.
    tracing::info!("Server stopped, draining sync queue");
    worker.await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn export(config: &Config, output: PathBuf) -> anyhow::Result<()> {
    let store = db::connect(&config.database_url).await?;
    store.migrate().await?;
    let rows = store.list_all().await?;

    let file = std::fs::File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let written = strava_etl::services::export::write_csv(&rows, file)?;

    println!("Wrote {} activities to {}", written, output.display());
    Ok(())
}

/// Initialize structured JSON logging on stderr.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true)
        .with_writer(std::io::stderr);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("strava_etl=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}

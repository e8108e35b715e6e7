use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use counter_core::{AuditSink, CounterEngine, NoopAuditSink, StorageAuditSink};
use storage::Storage;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod presenter;

use config::{load_settings, prepare_database_url};
use presenter::{run_command_loop, run_renderer, OutputMode};

#[derive(Parser, Debug)]
struct Args {
    /// Settings file with flat `key = value` entries.
    #[arg(long, default_value = "counter.toml")]
    config: PathBuf,
    #[arg(long)]
    database_url: Option<String>,
    /// Skip the SQLite count log entirely.
    #[arg(long)]
    no_audit: bool,
    /// Emit JSON lines instead of human-readable text.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config);
    if let Some(database_url) = args.database_url {
        settings.database_url = database_url;
    }
    let counter_config = settings.counter_config()?;

    let audit_sink: Arc<dyn AuditSink> = if args.no_audit {
        Arc::new(NoopAuditSink)
    } else {
        let database_url = prepare_database_url(&settings.database_url)?;
        let storage = Storage::new(&database_url).await.map_err(|error| {
            error!(
                %database_url,
                %error,
                "failed to open SQLite count log; verify parent directory exists and permissions are correct"
            );
            error
        })?;
        info!(%database_url, "count log ready");
        Arc::new(StorageAuditSink::new(storage))
    };

    let engine = Arc::new(CounterEngine::with_audit_sink(counter_config, audit_sink)?);
    let mode = if args.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let renderer = tokio::spawn(run_renderer(
        engine.state_stream(),
        Arc::downgrade(&engine),
        mode,
        tokio::io::stdout(),
    ));

    let submitted = run_command_loop(
        &engine,
        BufReader::new(tokio::io::stdin()),
        mode,
        tokio::io::stderr(),
    )
    .await?;
    info!(submitted, "input closed; shutting down");

    engine.shutdown();
    drop(engine);
    renderer.await??;
    Ok(())
}

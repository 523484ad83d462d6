use anyhow::{bail, Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};

use sockline::cli::config::FileConfig;
use sockline::cli::{Cli, Commands};
use sockline::{ConnectionSession, OutcomeChannel, SessionConfig, SessionOutcome, TcpConnector};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let (file, source) = FileConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Send {
            host,
            port,
            message,
            retries,
            tag,
            timeout_ms,
            backoff_ms,
            utf8,
            json,
        } => {
            let host = host
                .or_else(|| file.host.clone())
                .context("no host given; pass --host or set host in sockline.toml")?;
            let port = port
                .or(file.port)
                .context("no port given; pass --port or set port in sockline.toml")?;
            let retries = retries.or(file.retries).unwrap_or(0);

            let mut config = SessionConfig::default();
            if let Some(ms) = timeout_ms.or(file.connect_timeout_ms) {
                config.connect_timeout = Duration::from_millis(ms);
            }
            if let Some(ms) = backoff_ms.or(file.retry_backoff_ms) {
                config.retry_backoff = Duration::from_millis(ms);
            }
            if let Some(size) = file.chunk_size {
                config.chunk_size = size;
            }
            if utf8 {
                config.encoding = encoding_rs::UTF_8;
            }

            info!(host = %host, port, retries, "sending request");

            let (sink, outcome) = OutcomeChannel::pair();
            let mut session = ConnectionSession::new(TcpConnector, config, &sink);
            session
                .start_tagged(tag.as_deref(), &host, port, &message, retries)
                .await;

            let outcome = outcome
                .await
                .context("session ended without delivering an outcome")?;

            if json {
                println!("{}", serde_json::to_string_pretty(outcome.info())?);
            }
            match outcome {
                SessionOutcome::Success(info) => {
                    if !json {
                        println!("{}", info.message);
                    }
                }
                SessionOutcome::Error(info, err) => {
                    error!(status = info.status_code, "request failed");
                    if !json {
                        bail!("request failed: {err}");
                    }
                }
                SessionOutcome::Timeout(info) => {
                    error!(status = info.status_code, "request timed out");
                    if !json {
                        bail!("request timed out");
                    }
                }
            }
        }
        Commands::Config => {
            match source {
                Some(path) => info!("config loaded from {}", path.display()),
                None => info!("no config file found; using built-in defaults"),
            }
            println!("host              = {}", file.host.as_deref().unwrap_or("-"));
            println!("port              = {}", opt(file.port));
            println!("retries           = {}", opt(file.retries));
            println!("connect_timeout_ms = {}", opt(file.connect_timeout_ms));
            println!("retry_backoff_ms  = {}", opt(file.retry_backoff_ms));
            println!("chunk_size        = {}", opt(file.chunk_size));
            println!();
            println!("search order:");
            for candidate in FileConfig::candidates() {
                println!("  {}", candidate.display());
            }
        }
    }

    Ok(())
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

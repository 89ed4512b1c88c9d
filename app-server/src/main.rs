use std::sync::Arc;

use anyhow::Result;
use conductor_app_server::{ConversationHandler, MessageProcessor};
use conductor_core::{Orchestrator, OrchestratorConfig};
use conductor_generation::OpenAIGenerator;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Path of an optional TOML configuration file.
const CONFIG_ENV: &str = "CONDUCTOR_CONFIG";

#[tokio::main]
async fn main() -> Result<()> {
    // Stdout carries responses, so logs go to stderr.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            info!("Loading configuration from {}", path.to_string_lossy());
            OrchestratorConfig::load(path)?
        }
        None => OrchestratorConfig::default(),
    };

    let mut generator = OpenAIGenerator::new();
    if let Some(model) = &config.generation_model {
        generator = generator.with_model(model);
    }

    let orchestrator = Orchestrator::builder(config, Arc::new(generator))
        .build()
        .await?;
    let processor = MessageProcessor::new(ConversationHandler::new(Arc::new(orchestrator)));
    info!("conductor-app-server v{} ready", env!("CARGO_PKG_VERSION"));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let response = processor.process_line(&line).await;
                        let json = serde_json::to_string(&response)?;
                        stdout.write_all(json.as_bytes()).await?;
                        stdout.write_all(b"\n").await?;
                        stdout.flush().await?;
                    }
                    Ok(None) => {
                        debug!("stdin closed");
                        break;
                    }
                    Err(e) => {
                        warn!("stdin read error: {e}");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    info!("conductor-app-server stopped");
    Ok(())
}

//! restack: deploy a declarative template as a remote stack.
//!
//! Loads a template file, reconciles it against the stack service, and
//! waits for the remote operation to reach a terminal status.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use restack_core::config::{resolve_region, DeployConfig};
use restack_core::{DeployRunner, HostEnv, HttpStackClient, Outcome};

/// Stack deployment tool
#[derive(Parser, Debug)]
#[command(name = "restack", version, about)]
struct Args {
    /// Stack service endpoint
    #[arg(long, default_value = "http://[::1]:7070")]
    endpoint: String,

    /// Base deployment name; the stack name is derived from it
    #[arg(long)]
    service: String,

    /// Target provider of the deployment
    #[arg(long, default_value = "aws")]
    provider: String,

    /// Region override (falls back to STACK_REGION, then the built-in default)
    #[arg(long)]
    region: Option<String>,

    /// Template file (.json, .yml or .yaml)
    #[arg(long)]
    template: PathBuf,

    /// Delay between status polls in milliseconds
    #[arg(long, default_value = "1000")]
    poll_interval_ms: u64,

    /// Substring that marks a status terminal (repeatable; replaces the defaults)
    #[arg(long = "terminal-marker")]
    terminal_markers: Vec<String>,

    /// Deploy even when the endpoint does not look like local emulation tooling
    #[arg(long)]
    allow_without_emulation: bool,
}

/// Host environment as seen from the command line.
struct CliHost {
    provider: String,
    service: String,
    endpoint: String,
}

impl HostEnv for CliHost {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn deployment_name(&self) -> &str {
        &self.service
    }

    fn emulation_tooling_active(&self) -> bool {
        is_local_endpoint(&self.endpoint)
    }
}

/// Whether the endpoint points at emulation tooling on this machine.
fn is_local_endpoint(endpoint: &str) -> bool {
    ["localhost", "127.0.0.1", "[::1]"]
        .iter()
        .any(|host| endpoint.contains(host))
}

/// Load a template from disk; YAML by extension, JSON otherwise.
async fn load_template(path: &Path) -> Result<Value> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read template {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    );
    if is_yaml {
        serde_yaml::from_str(&raw).context("Template is not valid YAML")
    } else {
        serde_json::from_str(&raw).context("Template is not valid JSON")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "restack_cli=info,restack_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let template = load_template(&args.template).await?;
    let region = resolve_region(
        args.region.as_deref(),
        std::env::var("STACK_REGION").ok().as_deref(),
    );

    let mut config = DeployConfig::default();
    config.poll_interval = Duration::from_millis(args.poll_interval_ms);
    if !args.terminal_markers.is_empty() {
        config.terminal_markers = args.terminal_markers.clone();
    }

    info!(endpoint = %args.endpoint, region = %region, service = %args.service, "Starting deployment");

    let host = CliHost {
        provider: args.provider.clone(),
        service: args.service.clone(),
        endpoint: args.endpoint.clone(),
    };
    let client = HttpStackClient::new(&args.endpoint, &region);

    let mut runner = DeployRunner::new(client, &config);
    if args.allow_without_emulation {
        runner = runner.allow_without_emulation();
    }

    // Ctrl-c aborts the poll loop instead of leaving it retrying forever.
    let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = stop_tx.send(()).await;
        }
    });

    match runner.run(&host, &template, Some(&mut stop_rx)).await {
        Ok(Outcome::Created(status)) => info!(status = %status, "Stack created"),
        Ok(Outcome::Updated(status)) => info!(status = %status, "Stack updated"),
        Ok(Outcome::Unchanged) => info!("Stack already up to date"),
        Ok(Outcome::Skipped(reason)) => warn!(reason = %reason, "Deployment skipped"),
        Err(e) => {
            error!(error = %e, "Deployment failed");
            return Err(e.into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_endpoints_count_as_emulation() {
        assert!(is_local_endpoint("http://localhost:4566"));
        assert!(is_local_endpoint("http://127.0.0.1:7070"));
        assert!(is_local_endpoint("http://[::1]:7070"));
        assert!(!is_local_endpoint("https://stacks.example.com"));
    }
}

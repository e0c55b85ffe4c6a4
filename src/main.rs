//! Compliance Report Uploader
//!
//! Aggregates the results of the compliance profiles executed in this run and
//! uploads them to a compliance server.
//!
//! # Usage
//! ```bash
//! # Standalone compliance server with an API token
//! compliance-report --manifest run.json \
//!   --server https://compliance.example.com/api --variant compliance --token $TOKEN
//!
//! # Through the platform server, signing with the node's client key
//! compliance-report --manifest run.json \
//!   --chef-server-url https://chef.example.com/organizations/acme \
//!   --client-name web-01 --client-key /etc/chef/client.pem
//!
//! # Print the report instead of sending it
//! compliance-report --manifest run.json --owner admin --dry-run
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use compliance_report::{ReportConfig, ReportRun, RunManifest};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

// ============================================================
// CLI Definition
// ============================================================

#[derive(Parser, Debug)]
#[command(name = "compliance-report")]
#[command(about = "Upload aggregated compliance scan results", long_about = None)]
#[command(version)]
struct Cli {
    /// Run manifest listing executed entries and their result files
    #[arg(long, env = "COMPLIANCE_MANIFEST")]
    manifest: PathBuf,

    /// Compliance server base URL (omit to post to the platform server)
    #[arg(long, env = "COMPLIANCE_API")]
    server: Option<String>,

    /// Override the compliance server port
    #[arg(long)]
    port: Option<u16>,

    /// Server flavor: chef or compliance
    #[arg(long, default_value = "chef")]
    variant: String,

    /// API token; without one the platform credentials are used
    #[arg(long, env = "COMPLIANCE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Owner to file the report under (default: derived from server URL)
    #[arg(long)]
    owner: Option<String>,

    /// Node name to report (default: host name)
    #[arg(long)]
    node: Option<String>,

    /// Environment to report (default: $CHEF_ENVIRONMENT or _default)
    #[arg(long)]
    environment: Option<String>,

    /// Platform server URL, e.g. https://chef.example.com/organizations/acme
    #[arg(long, env = "CHEF_SERVER_URL")]
    chef_server_url: Option<String>,

    /// Platform API client name
    #[arg(long, env = "CHEF_NODE_NAME")]
    client_name: Option<String>,

    /// Platform API client key (PEM)
    #[arg(long, env = "CHEF_CLIENT_KEY")]
    client_key: Option<PathBuf>,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Print the report instead of submitting it
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn report_config(&self) -> compliance_report::Result<ReportConfig> {
        let mut builder = ReportConfig::builder()
            .variant(&self.variant)
            .verify_tls(!self.insecure)
            .timeout_secs(self.timeout);

        if let Some(server) = &self.server {
            builder = builder.server(server);
        }
        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        if let Some(token) = &self.token {
            builder = builder.token(token);
        }
        if let Some(owner) = &self.owner {
            builder = builder.owner(owner);
        }
        if let Some(node) = &self.node {
            builder = builder.node(node);
        }
        if let Some(environment) = &self.environment {
            builder = builder.environment(environment);
        }
        if let Some(url) = &self.chef_server_url {
            builder = builder.platform_url(url);
        }
        if let Some(name) = &self.client_name {
            builder = builder.client_name(name);
        }
        if let Some(key) = &self.client_key {
            builder = builder.client_key(key);
        }

        builder.build()
    }
}

// ============================================================
// Main Entry Point
// ============================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    let config = cli.report_config().context("Invalid report configuration")?;

    let manifest = RunManifest::load(&cli.manifest).context("Failed to load run manifest")?;
    let run = ReportRun::new(config);

    if cli.dry_run {
        let prepared = run.prepare(&manifest).context("Failed to prepare report")?;
        info!(
            endpoint = %prepared.target.endpoint,
            route = %prepared.target.route(),
            "Dry run, not submitting"
        );
        println!(
            "{}",
            serde_json::to_string_pretty(&prepared.envelope).context("Failed to serialize report")?
        );
        return Ok(());
    }

    let outcome = run.execute(&manifest).await.context("Compliance report failed")?;

    info!(
        endpoint = %outcome.endpoint,
        route = %outcome.route,
        profiles = outcome.profiles,
        "✅ Compliance report uploaded"
    );

    Ok(())
}

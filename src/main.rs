//! Process entry point.
//!
//! Parses the CLI, initializes tracing, and drives the lifecycle. Results
//! are printed as soon as all probes have finished, before the drain grace
//! period runs. Configuration and listener-bind errors exit nonzero.

use clap::Parser;
use portcheck::cli::Cli;
use portcheck::lifecycle::Lifecycle;
use portcheck::output;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("portcheck=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let lifecycle = Lifecycle::start(cli.run_config()).await?;
    let results = lifecycle.probe().await;

    output::print_results(&results, cli.output)?;

    lifecycle.shutdown().await?;
    Ok(())
}

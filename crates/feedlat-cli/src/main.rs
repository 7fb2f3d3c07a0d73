//! feedlat - redundant feed latency analyzer entry point.

use anyhow::Result;
use clap::Parser;
use feedlat::{AppConfig, Application, Args};
use tracing::info;

fn main() -> Result<()> {
    let args = Args::parse();

    // Config path: CLI arg > FEEDLAT_CONFIG env var > built-in defaults
    let config_path = args.config_path();
    let mut config = AppConfig::load(config_path.as_deref())?;
    args.apply(&mut config)?;

    feedlat_telemetry::init_logging(&config.telemetry.log_level)?;

    info!("Starting feedlat v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!(config_path = %path, "Configuration loaded");
    }

    let app = Application::new(config, args.capture)?;
    info!(
        capture = %app.capture().display(),
        identity = %app.config().capture.identity,
        workers = app.config().analysis.workers,
        "Analyzing capture"
    );

    let outcome = app.run()?;
    print!("{}", app.render_text(&outcome));

    Ok(())
}

//! Vigil Runtime
//!
//! Boots logging and settings, then drives a deterministic crowd through the
//! AOI engine and prints the resulting statistics.
//!
//! Usage: `vigil [settings.json] [ticks]`

mod demo;

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vigil_services::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let settings_path = args.next().map(PathBuf::from);
    let ticks = match args.next() {
        Some(raw) => raw.parse().with_context(|| format!("invalid tick count `{raw}`"))?,
        None => demo::DEFAULT_TICKS,
    };

    let settings = Settings::load_or_default(settings_path.as_deref())
        .context("failed to load settings")?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.logging.filter)
            .with_context(|| format!("invalid log filter `{}`", settings.logging.filter))?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Vigil AOI v{}", vigil_core::VERSION);
    let summary = demo::run(settings.aoi, ticks).await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

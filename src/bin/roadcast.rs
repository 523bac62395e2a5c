//! Headless roadcast runner.
//!
//! Reads the configuration named by `ROADCAST_CONFIG` (defaults otherwise),
//! starts the telemetry pipeline and logs position, suggestions and alerts
//! until Ctrl-C.

use anyhow::Result;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use roadcast::{Config, Roadcast};

const CONFIG_ENV: &str = "ROADCAST_CONFIG";
const REPORT_INTERVAL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roadcast=info")))
        .init();

    let config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => Config::load(path)?,
        None => {
            let mut config = Config::default();
            config.apply_env();
            config
        }
    };

    let mut app = Roadcast::new(config);
    let mode = app.initialize()?;
    info!(?mode, "Roadcast running, press Ctrl-C to stop");

    let mut report = tokio::time::interval(REPORT_INTERVAL);
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Could not listen for Ctrl-C");
                }
                break;
            }
            _ = report.tick() => log_status(&app),
        }
    }

    app.shutdown().await;
    Ok(())
}

fn log_status(app: &Roadcast) {
    let controller = app.controller();
    for alert in controller.consume_alerts() {
        warn!(kind = ?alert.kind, "{}", alert.message);
    }

    let status = controller.status();
    match &status.location {
        Some(location) => info!(
            location = %location.name,
            country = %location.country,
            signal = format_args!("{:.0}%", status.signal_strength * 100.0),
            speed = format_args!("{:.0} km/h", status.truck.speed),
            suggested = status.suggested_station.as_ref().map(|s| s.name.as_str()),
            "Status"
        ),
        None => info!(
            country = status.country.as_deref(),
            speed = format_args!("{:.0} km/h", status.truck.speed),
            tracking = ?status.tracking_mode,
            "Out of range"
        ),
    }
}

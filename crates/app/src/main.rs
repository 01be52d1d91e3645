//! Warden - Main Entry Point
//!
//! Loads the configuration, wires all components and runs the terminal
//! front end until `quit` or end of input.

use std::sync::Arc;

use tokio::io::{BufReader, stdin, stdout};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use warden::{App, Shell};
use warden_infrastructure::{BrowserNavigator, ConfigLoader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they do not interleave with the prompt.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Warden v{}", env!("CARGO_PKG_VERSION"));

    let config = ConfigLoader::from_env().load().await?;
    let mut app = App::new(&config, Arc::new(BrowserNavigator::new()))?;
    app.start().await;

    Shell::new(&app)
        .run(BufReader::new(stdin()), stdout())
        .await?;

    app.shutdown();
    Ok(())
}

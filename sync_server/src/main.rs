mod app_state;
mod cli;
mod config;
mod consts;
mod errors;
mod server;

use anyhow::Context as _;
use app_state::AppState;
use clap::Parser as _;
use cli::args::Args;
use errors::{SyncServerError, init_error};
use log::info;
use server::create_server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), SyncServerError> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                let level = args.verbose.log_level_filter().to_string().to_lowercase();
                format!(
                    "{}={level},tower_http={level},axum::rejection=trace",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_ansi(args.color.use_colors()))
        .try_init()
        .context("Failed to initialise tracing")
        .map_err(init_error)?;

    info!(
        "Starting collaborative editing server version {}",
        env!("CARGO_PKG_VERSION")
    );

    let app_state = AppState::try_new(args.config_path)
        .await
        .context("Failed to initialise app state")
        .map_err(init_error)?;

    create_server(app_state)
        .await
        .context("Failed to start server")
        .map_err(init_error)
}

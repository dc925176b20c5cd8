//! Terminal front end of the transmission kiosk.

use std::sync::Arc;

use anyhow::Context;
use crossterm::event::EventStream;
use kiosk_client::HttpListingSource;
use kiosk_client::HttpResourceLoader;
use kiosk_client::build_http_client;
use kiosk_core::spawn_feed_poller;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;

mod app;
mod cli;
mod colors;
mod history_grid;
mod logging;
mod pixels;
mod surface;
mod thumbnails;
mod transmission;
pub mod tui;

pub use cli::Cli;

use crate::app::App;

/// Largest side, in pixels, the featured image is decoded to.
const FEATURED_MAX_DIMENSION: u32 = 480;
/// Largest side, in pixels, of a decoded history thumbnail.
const THUMBNAIL_MAX_DIMENSION: u32 = 256;

pub async fn run_main(cli: Cli) -> anyhow::Result<()> {
    let config = cli.load_config().context("loading configuration")?;
    let log_dir = cli.log_dir.clone().unwrap_or_else(logging::default_log_dir);
    let _log_guard = logging::init_logging(&log_dir)?;
    info!(endpoint = %config.feed.endpoint, "starting kiosk");

    let client = build_http_client(config.feed.request_timeout())
        .context("building HTTP client")?;
    let cancel = CancellationToken::new();

    let listing = Arc::new(HttpListingSource::new(
        client.clone(),
        config.feed.endpoint.clone(),
    ));
    let poller = spawn_feed_poller(listing, config.feed.poll_interval(), cancel.child_token());

    let featured_loader = Arc::new(
        HttpResourceLoader::new(client.clone(), FEATURED_MAX_DIMENSION)
            .with_endpoint_base(&config.feed.endpoint),
    );
    let thumbnail_loader = Arc::new(
        HttpResourceLoader::new(client, THUMBNAIL_MAX_DIMENSION)
            .with_endpoint_base(&config.feed.endpoint),
    );

    let mut terminal = tui::init().context("initializing terminal")?;
    let (app, channels) = App::new(config, featured_loader, thumbnail_loader, cancel.clone());
    let result = app
        .run(
            &mut terminal,
            EventStream::new(),
            poller.subscribe(),
            channels,
            cancel.clone(),
        )
        .await;

    if let Err(err) = tui::restore() {
        error!("failed to restore terminal: {err}");
    }
    cancel.cancel();
    poller.shutdown().await;
    info!("kiosk stopped");
    result
}

mod api;
mod app;
mod config;
mod forms;
mod fragment;
mod handlers;
mod logging;
mod profile;
mod session;
mod shortcuts;
mod storage;
mod timers;
mod token;
mod ui;

use anyhow::{anyhow, Result};
use app::App;
use shortcuts::PageContext;
use storage::LocalStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config().map_err(|e| anyhow!(e))?;
    logging::init(&config.log.level).map_err(|e| anyhow!(e))?;
    tracing::info!(base_url = %config.server.base_url, "starting gurl");

    let store = LocalStore::open_default().map_err(|e| anyhow!(e))?;
    tracing::debug!(store = ?store.path(), "local store opened");

    // Optional start page, e.g. `gurl /login`.
    let start = match std::env::args().nth(1) {
        Some(path) => PageContext::from_path(&path).ok_or_else(|| anyhow!("unknown page: {}", path))?,
        None => PageContext::Home,
    };

    let mut app = App::new(&config, store)?;
    app.page = start;
    app.run().await
}

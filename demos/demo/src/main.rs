use tracing_subscriber::EnvFilter;
use wszero_client::{ClientConfig, Page};
use wszero_client::config::DEFAULT_PAGE_URL;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Also forwards `log` records from the client.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // The page the client pretends to be served from, e.g. http://localhost:8000/
    let page_url = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_PAGE_URL.to_string());
    let config = ClientConfig::from_page_url(&page_url)?;

    log::warn!(
        "Loading page {} -> {}; server-sent eval_js runs unsandboxed",
        config.page_url(),
        config.websocket_url()
    );
    let page = Page::load(config)?;
    page.run().await;
    Ok(())
}

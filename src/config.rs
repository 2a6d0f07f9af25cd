use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// Delay between a channel closing and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(2000);

/// Page the client pretends to be loaded from when none is given.
pub const DEFAULT_PAGE_URL: &str = "http://localhost:8000/";

/// Where the page lives and how it reconnects.
///
/// The WebSocket endpoint is always `ws://<page host>/<path>`, mirroring a
/// browser page that connects back to its own origin.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    page_url: Url,
    path: String,
    reconnect_delay: Duration,
}

impl ClientConfig {
    /// Build a config for a page loaded from `page_url`.
    pub fn from_page_url(page_url: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(page_url)?;
        if url.host_str().is_none() {
            return Err(ConfigError::MissingHost(page_url.to_string()));
        }
        Ok(Self {
            page_url: url,
            ..Self::default()
        })
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        self
    }

    pub fn page_url(&self) -> &Url {
        &self.page_url
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    /// `host[:port]`, the same string as `location.host` in a browser.
    pub fn host(&self) -> String {
        location_host(&self.page_url)
    }

    /// Address to open the TCP connection to, with the scheme's default port filled in.
    pub fn socket_addr(&self) -> String {
        let hostname = self.page_url.host_str().unwrap_or("localhost");
        let port = self.page_url.port().unwrap_or(80);
        format!("{hostname}:{port}")
    }

    /// Serialized page origin, e.g. `http://localhost:8000`.
    pub fn origin(&self) -> String {
        self.page_url.origin().ascii_serialization()
    }

    pub fn websocket_url(&self) -> String {
        format!("ws://{}{}", self.host(), self.path)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            page_url: Url::parse(DEFAULT_PAGE_URL).expect("default page URL is valid"),
            path: "/ws".to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// `location.host` for `url`: the hostname, plus the port unless it is the
/// scheme's default.
pub(crate) fn location_host(url: &Url) -> String {
    let hostname = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{hostname}:{port}"),
        None => hostname.to_string(),
    }
}

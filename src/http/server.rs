//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Bind the listener and resolve the actual address (port 0 → real port)
//! - Report the address through the listen callback, exactly once
//! - Create the Axum router with the request adapter as its only handler
//! - Wire up middleware (tracing, optional request timeout)
//! - Stop accepting when the server signal fires or `Server::stop` is called

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::serve::Listener as _;
use axum::Router;
use thiserror::Error;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use url::Url;

use crate::config::ServerConfig;
use crate::fetch::{AbortController, AbortSignal, Fetch};
use crate::http::adapter::{self, AdapterState};
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Listener, ListenerError, PeerInfo};

/// Startup failures. All of them are fatal to [`serve`].
#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("listen address is not a valid URL authority: {0}")]
    Url(#[from] url::ParseError),
}

/// The address a server is actually bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddr {
    pub hostname: String,
    pub port: u16,
}

impl ListenAddr {
    /// `http://host:port`, with IPv6 hosts in brackets.
    pub fn url(&self) -> String {
        format!("http://{self}")
    }

    fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.url())
    }
}

impl From<SocketAddr> for ListenAddr {
    fn from(addr: SocketAddr) -> Self {
        Self {
            hostname: addr.ip().to_string(),
            port: addr.port(),
        }
    }
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hostname.parse::<IpAddr>() {
            Ok(IpAddr::V6(_)) => write!(f, "[{}]:{}", self.hostname, self.port),
            _ => write!(f, "{}:{}", self.hostname, self.port),
        }
    }
}

type OnListen = Box<dyn FnOnce(&ListenAddr) + Send>;

/// Everything `serve` needs: the handler plus listener settings.
///
/// Defaults: hostname `0.0.0.0`, port 0 (any free port), no signal, and a
/// listen callback that logs `Listening on http://{hostname}:{port}`.
pub struct ServeOptions {
    fetch: Arc<dyn Fetch>,
    hostname: String,
    port: u16,
    signal: Option<AbortSignal>,
    on_listen: Option<OnListen>,
    max_connections: usize,
    request_timeout: Option<Duration>,
}

impl ServeOptions {
    pub fn new(fetch: impl Fetch) -> Self {
        Self::from_config(fetch, &ServerConfig::default())
    }

    /// Start from a loaded configuration file.
    pub fn from_config(fetch: impl Fetch, config: &ServerConfig) -> Self {
        Self {
            fetch: Arc::new(fetch),
            hostname: config.listener.hostname.clone(),
            port: config.listener.port,
            signal: None,
            on_listen: None,
            max_connections: config.listener.max_connections,
            request_timeout: config.timeouts.request_secs.map(Duration::from_secs),
        }
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Stop the server when `signal` fires.
    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Replace the default listen log line.
    pub fn on_listen<F>(mut self, on_listen: F) -> Self
    where
        F: FnOnce(&ListenAddr) + Send + 'static,
    {
        self.on_listen = Some(Box::new(on_listen));
        self
    }

    /// Limit concurrent connections. [`serve`] rejects 0 and values above
    /// [`tokio::sync::Semaphore::MAX_PERMITS`].
    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Answer `408 Request Timeout` when a request takes longer than this.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for ServeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServeOptions")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("signal", &self.signal)
            .field("on_listen", &self.on_listen.is_some())
            .field("max_connections", &self.max_connections)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// Handle to a running server.
///
/// Dropping the handle does not stop the server; use [`Server::stop`] or
/// the signal passed in [`ServeOptions::signal`].
#[derive(Debug)]
pub struct Server {
    addr: ListenAddr,
    stop: AbortController,
    finished: AbortSignal,
    tracker: ConnectionTracker,
    max_connections: usize,
}

impl Server {
    pub fn addr(&self) -> &ListenAddr {
        &self.addr
    }

    pub fn hostname(&self) -> &str {
        &self.addr.hostname
    }

    pub fn port(&self) -> u16 {
        self.addr.port
    }

    /// Stop accepting connections and drain the ones in flight. Does not
    /// fire the caller's signal.
    pub fn stop(&self) {
        self.stop.abort();
    }

    /// Wait until the listener is closed and in-flight connections are done.
    pub async fn stopped(&self) {
        self.finished.cancelled().await
    }

    pub fn is_stopped(&self) -> bool {
        self.finished.aborted()
    }

    /// Connections currently open.
    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Configured connection limit.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Connections that can still be accepted before `accept` waits.
    pub fn available_connection_slots(&self) -> usize {
        let active = usize::try_from(self.tracker.active_count()).unwrap_or(usize::MAX);
        self.max_connections.saturating_sub(active)
    }
}

/// Start serving `options.fetch`.
///
/// Resolves once the listener is bound, so the returned address always
/// carries the real port, even when port 0 was requested. The listen
/// callback has run by the time this returns.
pub async fn serve(options: ServeOptions) -> Result<Server, ServeError> {
    let ServeOptions {
        fetch,
        hostname,
        port,
        signal,
        on_listen,
        max_connections,
        request_timeout,
    } = options;

    let tracker = ConnectionTracker::new();
    let listener = Listener::bind(&hostname, port, max_connections, tracker.clone()).await?;
    let addr = ListenAddr::from(listener.local_addr().map_err(ListenerError::LocalAddr)?);

    let state = AdapterState::new(fetch, addr.base_url()?);
    let app = build_router(state, request_timeout).into_make_service_with_connect_info::<PeerInfo>();

    let stop = signal.as_ref().map(AbortSignal::child).unwrap_or_default();
    let shutdown = stop.signal();
    let finished = AbortController::new();
    let finished_signal = finished.signal();

    tokio::spawn(async move {
        let _finished = finished.abort_on_drop();

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        match result {
            Ok(()) => tracing::info!("HTTP server stopped"),
            Err(e) => tracing::error!(error = %e, "HTTP server failed"),
        }
    });

    match on_listen {
        Some(on_listen) => on_listen(&addr),
        None => log_listening(&addr),
    }

    Ok(Server {
        addr,
        stop,
        finished: finished_signal,
        tracker,
        max_connections,
    })
}

/// Default listen callback.
pub fn log_listening(addr: &ListenAddr) {
    tracing::info!(
        hostname = %addr.hostname,
        port = addr.port,
        "Listening on {}",
        addr.url()
    );
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
fn build_router(state: AdapterState, request_timeout: Option<Duration>) -> Router {
    let mut router = Router::new().fallback(adapter::handle).with_state(state);

    if let Some(timeout) = request_timeout {
        router = router.layer(TimeoutLayer::new(timeout));
    }

    router.layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn listen_addr_formats_ipv4() {
        let addr = ListenAddr::from(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)));
        assert_eq!(addr.hostname, "0.0.0.0");
        assert_eq!(addr.url(), "http://0.0.0.0:8080");
    }

    #[test]
    fn listen_addr_brackets_ipv6() {
        let addr = ListenAddr::from(SocketAddr::from((Ipv6Addr::LOCALHOST, 3000)));
        assert_eq!(addr.hostname, "::1");
        assert_eq!(addr.to_string(), "[::1]:3000");
        assert_eq!(addr.base_url().unwrap().as_str(), "http://[::1]:3000/");
    }

    #[test]
    fn options_take_config_values() {
        let mut config = ServerConfig::default();
        config.listener.hostname = "127.0.0.1".into();
        config.listener.port = 9000;
        config.listener.max_connections = 8;
        config.timeouts.request_secs = Some(5);

        let options = ServeOptions::from_config(
            |_req: crate::fetch::Request| async { crate::fetch::Response::new("") },
            &config,
        );
        assert_eq!(options.hostname, "127.0.0.1");
        assert_eq!(options.port, 9000);
        assert_eq!(options.max_connections, 8);
        assert_eq!(options.request_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn options_defaults() {
        let options =
            ServeOptions::new(|_req: crate::fetch::Request| async { crate::fetch::Response::new("") });
        assert_eq!(options.hostname, "0.0.0.0");
        assert_eq!(options.port, 0);
        assert!(options.signal.is_none());
        assert!(options.on_listen.is_none());
        assert_eq!(options.request_timeout, None);
    }
}

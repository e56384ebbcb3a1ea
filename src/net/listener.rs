//! TCP listener implementation with backpressure.
//!
//! # Responsibilities
//! - Resolve and bind the requested hostname/port
//! - Accept incoming TCP connections
//! - Enforce max_connections limit via semaphore
//! - Graceful handling of accept errors

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::extract::connect_info::Connected;
use axum::serve::IncomingStream;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::net::connection::{ConnectionGuard, ConnectionId, ConnectionTracker};

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The hostname did not resolve to any address.
    #[error("Failed to resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Failed to bind to address.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The connection limit must be between 1 and `max` inclusive.
    #[error("Invalid connection limit {requested}: must be between 1 and {max}")]
    ConnectionLimit { requested: usize, max: usize },

    /// The bound socket could not report its address.
    #[error("Failed to read local address: {0}")]
    LocalAddr(#[source] io::Error),
}

/// A bounded TCP listener that limits concurrent connections.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is reached,
/// new connections will wait until a slot becomes available.
#[derive(Debug)]
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Semaphore to limit concurrent connections.
    connection_limit: Arc<Semaphore>,
    tracker: ConnectionTracker,
}

impl Listener {
    /// Resolve `hostname` and bind the first address that accepts.
    pub async fn bind(
        hostname: &str,
        port: u16,
        max_connections: usize,
        tracker: ConnectionTracker,
    ) -> Result<Self, ListenerError> {
        if max_connections == 0 || max_connections > Semaphore::MAX_PERMITS {
            return Err(ListenerError::ConnectionLimit {
                requested: max_connections,
                max: Semaphore::MAX_PERMITS,
            });
        }

        let resolve_error = |source: io::Error| ListenerError::Resolve {
            host: hostname.to_string(),
            port,
            source,
        };

        let addrs = tokio::net::lookup_host((hostname, port))
            .await
            .map_err(resolve_error)?;

        let mut last_error = None;
        for addr in addrs {
            match TcpListener::bind(addr).await {
                Ok(inner) => {
                    let local_addr = inner.local_addr().map_err(ListenerError::LocalAddr)?;

                    tracing::info!(
                        address = %local_addr,
                        max_connections,
                        "Listener bound"
                    );

                    return Ok(Self {
                        inner,
                        connection_limit: Arc::new(Semaphore::new(max_connections)),
                        tracker,
                    });
                }
                Err(source) => last_error = Some(ListenerError::Bind { addr, source }),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            resolve_error(io::Error::new(
                io::ErrorKind::NotFound,
                "no addresses found",
            ))
        }))
    }
}

impl axum::serve::Listener for Listener {
    type Io = TrackedStream;
    type Addr = SocketAddr;

    /// Accept a new connection, respecting the connection limit.
    ///
    /// This will wait if the connection limit has been reached.
    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        // Acquire permit first (backpressure)
        let permit = Arc::clone(&self.connection_limit)
            .acquire_owned()
            .await
            .expect("connection semaphore is never closed");

        loop {
            match self.inner.accept().await {
                Ok((stream, addr)) => {
                    let guard = self.tracker.track();

                    tracing::debug!(
                        peer_addr = %addr,
                        connection_id = %guard.id(),
                        available_permits = self.connection_limit.available_permits(),
                        "Connection accepted"
                    );

                    let io = TrackedStream {
                        inner: stream,
                        _permit: permit,
                        guard,
                    };
                    return (io, addr);
                }
                Err(e) => handle_accept_error(e).await,
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.inner.local_addr()
    }
}

/// Per-connection errors are retried at once; anything else (e.g. EMFILE)
/// backs off for a second.
async fn handle_accept_error(e: io::Error) {
    if matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    ) {
        return;
    }

    tracing::error!(error = %e, "Accept error");
    tokio::time::sleep(Duration::from_secs(1)).await;
}

/// An accepted stream holding its connection slot.
///
/// When dropped, the slot is released and the connection is no longer
/// counted as active.
#[derive(Debug)]
pub struct TrackedStream {
    inner: TcpStream,
    _permit: OwnedSemaphorePermit,
    guard: ConnectionGuard,
}

impl TrackedStream {
    pub fn id(&self) -> ConnectionId {
        self.guard.id()
    }
}

impl AsyncRead for TrackedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for TrackedStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Connection metadata made available to request handling.
#[derive(Debug, Clone, Copy)]
pub struct PeerInfo {
    pub remote_addr: SocketAddr,
    pub connection_id: ConnectionId,
}

impl Connected<IncomingStream<'_, Listener>> for PeerInfo {
    fn connect_info(stream: IncomingStream<'_, Listener>) -> Self {
        Self {
            remote_addr: *stream.remote_addr(),
            connection_id: stream.io().id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::serve::Listener as _;

    #[tokio::test]
    async fn binds_any_free_port() {
        let tracker = ConnectionTracker::new();
        let listener = Listener::bind("127.0.0.1", 0, 4, tracker).await.unwrap();
        let addr = listener.local_addr().unwrap();

        assert_ne!(addr.port(), 0);
        assert_eq!(listener.connection_limit.available_permits(), 4);
    }

    #[tokio::test]
    async fn rejects_out_of_range_connection_limits() {
        for requested in [0, Semaphore::MAX_PERMITS + 1, usize::MAX] {
            let err = Listener::bind("127.0.0.1", 0, requested, ConnectionTracker::new())
                .await
                .unwrap_err();
            assert!(
                matches!(err, ListenerError::ConnectionLimit { requested: r, .. } if r == requested),
                "limit {requested} gave {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn accepted_stream_holds_permit_and_is_tracked() {
        let tracker = ConnectionTracker::new();
        let mut listener = Listener::bind("127.0.0.1", 0, 2, tracker.clone())
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();

        let _client = TcpStream::connect(addr).await.unwrap();
        let (io, _) = listener.accept().await;

        assert_eq!(listener.connection_limit.available_permits(), 1);
        assert_eq!(tracker.active_count(), 1);

        drop(io);
        assert_eq!(listener.connection_limit.available_permits(), 2);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let tracker = ConnectionTracker::new();
        let first = Listener::bind("127.0.0.1", 0, 1, tracker.clone())
            .await
            .unwrap();
        let port = first.local_addr().unwrap().port();

        let err = Listener::bind("127.0.0.1", port, 1, tracker).await.unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
    }

    #[tokio::test]
    async fn unresolvable_host_is_reported() {
        let err = Listener::bind("host.invalid", 0, 1, ConnectionTracker::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ListenerError::Resolve { .. }));
    }
}

//! Translation between native axum/hyper messages and the fetch model.
//!
//! # Responsibilities
//! - Build a `fetch::Request` from the native request (method, absolute URL,
//!   headers, lazy body, abort signal)
//! - Run the handler on its own task and await its response
//! - Write the `fetch::Response` back (headers, status, reason phrase, body)
//! - Map handler failures to `500 Internal Server Error`

use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::header::HOST;
use axum::http::{HeaderValue, Method, StatusCode, Uri};
use hyper::ext::ReasonPhrase;
use url::Url;

use crate::fetch::{AbortController, AbortSignal, Body, Fetch, Headers, Request, Response};
use crate::net::listener::PeerInfo;

/// Shared by every request on a server.
#[derive(Clone)]
pub(crate) struct AdapterState {
    fetch: Arc<dyn Fetch>,
    /// Authority used when a request has no usable `Host` header.
    fallback_base: Url,
}

impl AdapterState {
    pub(crate) fn new(fetch: Arc<dyn Fetch>, fallback_base: Url) -> Self {
        Self {
            fetch,
            fallback_base,
        }
    }
}

/// Handle one request end to end.
pub(crate) async fn handle(
    State(state): State<AdapterState>,
    native: axum::extract::Request,
) -> axum::response::Response {
    let peer = native
        .extensions()
        .get::<ConnectInfo<PeerInfo>>()
        .map(|ConnectInfo(peer)| *peer);

    let controller = AbortController::new();
    let request = into_request(native, &state.fallback_base, controller.signal());

    tracing::debug!(
        method = %request.method(),
        url = %request.url(),
        peer_addr = ?peer.map(|p| p.remote_addr),
        connection_id = ?peer.map(|p| p.connection_id.as_u64()),
        "Dispatching request"
    );

    // hyper drops this future when the connection goes away; the guard then
    // fires the request's signal. The handler task itself keeps running.
    let abort_on_drop = controller.abort_on_drop();
    let fetch = Arc::clone(&state.fetch);
    let outcome = tokio::spawn(async move { fetch.fetch(request).await }).await;
    abort_on_drop.disarm();

    let response = match outcome {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Handler failed");
            internal_error()
        }
        Err(e) => {
            tracing::error!(error = %e, "Handler panicked");
            internal_error()
        }
    };

    into_native(response)
}

fn internal_error() -> Response {
    Response::empty(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Inbound translation.
pub(crate) fn into_request(
    native: axum::extract::Request,
    fallback_base: &Url,
    signal: AbortSignal,
) -> Request {
    let (parts, body) = native.into_parts();
    let url = resolve_url(&parts.uri, parts.headers.get(HOST), fallback_base);

    let body = if parts.method == Method::GET || parts.method == Method::HEAD {
        None
    } else {
        Some(Body::from_native(body))
    };

    Request::new(parts.method, url)
        .with_headers(Headers::from(parts.headers))
        .with_optional_body(body)
        .with_signal(signal)
}

/// Resolve the request target against `http://{host}`.
///
/// Absolute-form targets are kept as they are. A missing or unusable `Host`
/// falls back to the listener's own address.
pub(crate) fn resolve_url(uri: &Uri, host: Option<&HeaderValue>, fallback_base: &Url) -> Url {
    if uri.scheme().is_some() {
        if let Ok(url) = Url::parse(&uri.to_string()) {
            return url;
        }
    }

    let mut url = host
        .and_then(|h| h.to_str().ok())
        .and_then(|h| Url::parse(&format!("http://{h}")).ok())
        .filter(|u| u.has_host() && u.username().is_empty() && u.path() == "/")
        .unwrap_or_else(|| fallback_base.clone());

    url.set_path(uri.path());
    url.set_query(uri.query());
    url
}

/// Outbound translation.
pub(crate) fn into_native(response: Response) -> axum::response::Response {
    let (status, status_text, headers, body) = response.into_parts();

    let body = body.map_or_else(axum::body::Body::empty, Body::into_native);
    let mut native = axum::response::Response::new(body);
    *native.status_mut() = status;
    *native.headers_mut() = headers.into_header_map();

    if !status_text.is_empty() && status.canonical_reason() != Some(status_text.as_str()) {
        match ReasonPhrase::try_from(status_text.into_bytes()) {
            Ok(reason) => {
                native.extensions_mut().insert(reason);
            }
            Err(_) => tracing::warn!(status = %status, "Dropping invalid status text"),
        }
    }

    native
}

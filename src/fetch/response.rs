//! Standardized response produced by handlers.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use serde::Serialize;

use super::body::Body;
use super::headers::Headers;

/// Status, status text and headers for [`Response::with_init`].
#[derive(Debug, Clone)]
pub struct ResponseInit {
    pub status: StatusCode,
    /// Reason phrase; empty means the canonical phrase for `status`.
    pub status_text: String,
    pub headers: Headers,
}

impl Default for ResponseInit {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            status_text: String::new(),
            headers: Headers::new(),
        }
    }
}

/// A response returned by a handler.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    status_text: String,
    headers: Headers,
    body: Option<Body>,
}

impl Response {
    /// `200 OK` with the given body and no headers.
    pub fn new(body: impl Into<Body>) -> Self {
        Self::with_init(body, ResponseInit::default())
    }

    pub fn with_init(body: impl Into<Body>, init: ResponseInit) -> Self {
        Self {
            status: init.status,
            status_text: init.status_text,
            headers: init.headers,
            body: Some(body.into()),
        }
    }

    /// A response without a body.
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: Headers::new(),
            body: None,
        }
    }

    /// `text/plain` response.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text.into()).with_content_type("text/plain; charset=utf-8")
    }

    /// `application/json` response with `value` serialized as the body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::new(body).with_content_type("application/json"))
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    fn with_content_type(mut self, value: &'static str) -> Self {
        self.headers
            .as_header_map_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(value));
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Reason phrase as set by the handler; may be empty.
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub(crate) fn into_parts(self) -> (StatusCode, String, Headers, Option<Body>) {
        (self.status, self.status_text, self.headers, self.body)
    }
}

impl From<&'static str> for Response {
    fn from(text: &'static str) -> Self {
        Response::new(text)
    }
}

impl From<String> for Response {
    fn from(text: String) -> Self {
        Response::new(text)
    }
}

impl From<StatusCode> for Response {
    fn from(status: StatusCode) -> Self {
        Response::empty(status)
    }
}

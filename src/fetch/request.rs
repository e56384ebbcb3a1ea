//! Standardized request passed to handlers.

use axum::http::Method;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use url::Url;

use super::body::{Body, BodyError};
use super::headers::Headers;
use super::signal::AbortSignal;

/// An incoming request, owned by the handler that receives it.
///
/// `GET` and `HEAD` requests built by the server never carry a body;
/// every other method carries one, possibly empty.
#[derive(Debug)]
pub struct Request {
    method: Method,
    url: Url,
    headers: Headers,
    body: Option<Body>,
    signal: AbortSignal,
}

impl Request {
    /// Create a request with no headers, no body, and a signal that never
    /// fires.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            body: None,
            signal: AbortSignal::never(),
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signal = signal;
        self
    }

    pub(crate) fn with_optional_body(mut self, body: Option<Body>) -> Self {
        self.body = body;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Absolute URL of the request.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Fires when the client connection goes away before a response is
    /// produced.
    pub fn signal(&self) -> &AbortSignal {
        &self.signal
    }

    /// Take ownership of the body stream.
    pub fn into_body(self) -> Option<Body> {
        self.body
    }

    /// Take the body, leaving the request without one.
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    /// Read the whole body. A missing body reads as empty.
    pub async fn bytes(self) -> Result<Bytes, BodyError> {
        match self.body {
            Some(body) => body.bytes().await,
            None => Ok(Bytes::new()),
        }
    }

    pub async fn text(self) -> Result<String, BodyError> {
        match self.body {
            Some(body) => body.text().await,
            None => Ok(String::new()),
        }
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T, BodyError> {
        self.body.unwrap_or_default().json().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn missing_body_reads_empty() {
        let request = Request::new(Method::GET, url("http://localhost/"));
        assert!(request.body().is_none());
        assert_eq!(request.text().await.unwrap(), "");
    }

    #[tokio::test]
    async fn json_body_deserializes() {
        let request = Request::new(Method::POST, url("http://localhost/items"))
            .with_body(r#"{"name":"widget","count":3}"#);

        let value: serde_json::Value = request.json().await.unwrap();
        assert_eq!(value["name"], "widget");
        assert_eq!(value["count"], 3);
    }

    #[tokio::test]
    async fn json_on_missing_body_fails() {
        let request = Request::new(Method::DELETE, url("http://localhost/items/1"));
        let result: Result<serde_json::Value, _> = request.json().await;
        assert!(matches!(result, Err(BodyError::Json(_))));
    }

    #[test]
    fn take_body_leaves_none() {
        let mut request =
            Request::new(Method::PUT, url("http://localhost/")).with_body("payload");
        assert!(request.take_body().is_some());
        assert!(request.body().is_none());
    }
}

//! Single-pass byte stream bodies.

use std::fmt;
use std::pin::Pin;
use std::string::FromUtf8Error;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures_util::stream::{BoxStream, Stream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Error type returned by handlers and body streams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure while consuming a body.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("body stream failed: {0}")]
    Stream(#[source] BoxError),

    #[error("body is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    #[error("body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A body that can be read exactly once, chunk by chunk.
///
/// Buffered bodies (built from strings or bytes) know their length, so the
/// server can send `Content-Length`; streamed bodies are sent chunked.
pub struct Body {
    kind: Kind,
}

enum Kind {
    Full(Option<Bytes>),
    Stream(BoxStream<'static, Result<Bytes, BoxError>>),
}

impl Body {
    /// A body with no bytes.
    pub fn empty() -> Self {
        Self {
            kind: Kind::Full(None),
        }
    }

    /// Wrap a stream of chunks.
    pub fn from_stream<S, B, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: Into<Bytes> + 'static,
        E: Into<BoxError> + 'static,
    {
        Self {
            kind: Kind::Stream(
                stream
                    .map_ok(Into::<Bytes>::into)
                    .map_err(Into::<BoxError>::into)
                    .boxed(),
            ),
        }
    }

    /// Exact length, when known without reading.
    pub fn exact_len(&self) -> Option<usize> {
        match &self.kind {
            Kind::Full(bytes) => Some(bytes.as_ref().map_or(0, Bytes::len)),
            Kind::Stream(_) => None,
        }
    }

    /// Read the whole body into memory.
    pub async fn bytes(self) -> Result<Bytes, BodyError> {
        match self.kind {
            Kind::Full(bytes) => Ok(bytes.unwrap_or_default()),
            Kind::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk.map_err(BodyError::Stream)?);
                }
                Ok(buf.freeze())
            }
        }
    }

    /// Read the whole body as UTF-8 text.
    pub async fn text(self) -> Result<String, BodyError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    /// Read the whole body and deserialize it as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, BodyError> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub(crate) fn from_native(body: axum::body::Body) -> Self {
        Self::from_stream(body.into_data_stream())
    }

    pub(crate) fn into_native(self) -> axum::body::Body {
        match self.kind {
            Kind::Full(None) => axum::body::Body::empty(),
            Kind::Full(Some(bytes)) => axum::body::Body::from(bytes),
            Kind::Stream(stream) => axum::body::Body::from_stream(stream),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl Stream for Body {
    type Item = Result<Bytes, BoxError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match &mut self.kind {
            Kind::Full(bytes) => Poll::Ready(bytes.take().filter(|b| !b.is_empty()).map(Ok)),
            Kind::Stream(stream) => stream.as_mut().poll_next(cx),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.kind {
            Kind::Full(Some(bytes)) if !bytes.is_empty() => (1, Some(1)),
            Kind::Full(_) => (0, Some(0)),
            Kind::Stream(stream) => stream.size_hint(),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Full(bytes) => f
                .debug_struct("Body")
                .field("len", &bytes.as_ref().map_or(0, Bytes::len))
                .finish(),
            Kind::Stream(_) => f.debug_struct("Body").field("stream", &true).finish(),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self {
            kind: Kind::Full(Some(bytes)),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes::from(bytes).into()
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Bytes::from(text).into()
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Bytes::from_static(text.as_bytes()).into()
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Bytes::from_static(bytes).into()
    }
}

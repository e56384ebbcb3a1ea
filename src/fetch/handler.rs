//! Handler trait.

use std::future::Future;

use futures_util::future::{BoxFuture, FutureExt};

use super::body::BoxError;
use super::request::Request;
use super::response::Response;

/// Values a handler may resolve to.
pub trait IntoFetchResult {
    fn into_fetch_result(self) -> Result<Response, BoxError>;
}

impl IntoFetchResult for Response {
    fn into_fetch_result(self) -> Result<Response, BoxError> {
        Ok(self)
    }
}

impl<E> IntoFetchResult for Result<Response, E>
where
    E: Into<BoxError>,
{
    fn into_fetch_result(self) -> Result<Response, BoxError> {
        self.map_err(Into::into)
    }
}

/// Maps a [`Request`] to a [`Response`], possibly asynchronously.
///
/// Implemented for any `Fn(Request) -> impl Future<Output = R>` where `R` is
/// a [`Response`] or a `Result<Response, E>`.
pub trait Fetch: Send + Sync + 'static {
    fn fetch(&self, request: Request) -> BoxFuture<'static, Result<Response, BoxError>>;
}

impl<F, Fut, R> Fetch for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoFetchResult + 'static,
{
    fn fetch(&self, request: Request) -> BoxFuture<'static, Result<Response, BoxError>> {
        self(request).map(IntoFetchResult::into_fetch_result).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};
    use url::Url;

    fn request() -> Request {
        Request::new(Method::GET, Url::parse("http://localhost/").unwrap())
    }

    #[tokio::test]
    async fn closure_returning_response() {
        let handler = |_req: Request| async { Response::new("Hello!") };
        let response = handler.fetch(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn closure_returning_error() {
        let handler = |_req: Request| async {
            Err::<Response, _>(std::io::Error::other("database unavailable"))
        };
        let err = handler.fetch(request()).await.unwrap_err();
        assert_eq!(err.to_string(), "database unavailable");
    }

    struct Teapot;

    impl Fetch for Teapot {
        fn fetch(&self, _request: Request) -> BoxFuture<'static, Result<Response, BoxError>> {
            async { Ok(Response::empty(StatusCode::IM_A_TEAPOT)) }.boxed()
        }
    }

    #[tokio::test]
    async fn custom_fetch_impl() {
        let response = Teapot.fetch(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }
}

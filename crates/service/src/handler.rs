//! Request handlers and the adapter that invokes them.
//!
//! A handler is anything implementing [`RequestHandler`]. Closures are adapted with
//! [`handler_fn`] (async), [`sync_handler_fn`] (immediate) or [`error_handler_fn`] (async, for
//! error handlers which get no path parameters). Their `Ok` value is any [`Responder`]; their
//! `Err` is anything convertible into a [`HandlerError`].
//!
//! ```
//! use nimbus::handler::{handler_fn, sync_handler_fn};
//! use nimbus::{HandlerError, PathParams, Request};
//! use http::StatusCode;
//!
//! let show_user = handler_fn(|_req: Request, params: PathParams| async move {
//!     match params.get("id") {
//!         Some("0") => Err(HandlerError::status(StatusCode::NOT_FOUND)),
//!         Some(id) => Ok(format!("user {id}")),
//!         None => Err(HandlerError::status(StatusCode::BAD_REQUEST)),
//!     }
//! });
//!
//! let health = sync_handler_fn(|_req: Request, _params: PathParams| Ok::<_, HandlerError>("ok"));
//! ```

use crate::error::HandlerError;
use crate::request::{PathParams, Request};
use crate::responder::Responder;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response};
use nimbus_http::protocol::is_bodiless;
use once_cell::sync::Lazy;
use std::fmt;
use std::future::Future;

static TEXT_PLAIN_UTF_8: Lazy<HeaderValue> = Lazy::new(|| {
    HeaderValue::from_str(mime::TEXT_PLAIN_UTF_8.as_ref()).unwrap_or_else(|_| HeaderValue::from_static("text/plain"))
});

/// `text/plain; charset=utf-8`, the default content type of every body.
pub(crate) fn text_plain_utf8() -> HeaderValue {
    TEXT_PLAIN_UTF_8.clone()
}

#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, req: Request, params: PathParams) -> Result<Response<Bytes>, HandlerError>;
}

/// Invokes `handler` and fills in `Content-Type: text/plain; charset=utf-8` when the handler
/// didn't choose one and the status allows a body. Errors are passed through untouched.
pub async fn invoke(
    handler: &dyn RequestHandler,
    req: Request,
    params: PathParams,
) -> Result<Response<Bytes>, HandlerError> {
    let mut response = handler.invoke(req, params).await?;

    if !is_bodiless(response.status()) && !response.headers().contains_key(CONTENT_TYPE) {
        response.headers_mut().insert(CONTENT_TYPE, text_plain_utf8());
    }

    Ok(response)
}

pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, R, E> RequestHandler for FnHandler<F>
where
    F: Fn(Request, PathParams) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, E>> + Send,
    R: Responder,
    E: Into<HandlerError>,
{
    async fn invoke(&self, req: Request, params: PathParams) -> Result<Response<Bytes>, HandlerError> {
        match (self.f)(req, params).await {
            Ok(responder) => Ok(responder.into_response()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Adapts an async function of the request and its path parameters.
pub fn handler_fn<F, Fut, R, E>(f: F) -> FnHandler<F>
where
    F: Fn(Request, PathParams) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, E>> + Send,
    R: Responder,
    E: Into<HandlerError>,
{
    FnHandler { f }
}

pub struct SyncFnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, R, E> RequestHandler for SyncFnHandler<F>
where
    F: Fn(Request, PathParams) -> Result<R, E> + Send + Sync,
    R: Responder,
    E: Into<HandlerError>,
{
    async fn invoke(&self, req: Request, params: PathParams) -> Result<Response<Bytes>, HandlerError> {
        (self.f)(req, params).map(Responder::into_response).map_err(Into::into)
    }
}

/// Adapts a function that produces its result right away.
pub fn sync_handler_fn<F, R, E>(f: F) -> SyncFnHandler<F>
where
    F: Fn(Request, PathParams) -> Result<R, E> + Send + Sync,
    R: Responder,
    E: Into<HandlerError>,
{
    SyncFnHandler { f }
}

pub struct ErrorFnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, R, E> RequestHandler for ErrorFnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, E>> + Send,
    R: Responder,
    E: Into<HandlerError>,
{
    async fn invoke(&self, req: Request, _params: PathParams) -> Result<Response<Bytes>, HandlerError> {
        match (self.f)(req).await {
            Ok(responder) => Ok(responder.into_response()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Adapts an async function of the request alone, as used for error handlers.
pub fn error_handler_fn<F, Fut, R, E>(f: F) -> ErrorFnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, E>> + Send,
    R: Responder,
    E: Into<HandlerError>,
{
    ErrorFnHandler { f }
}

macro_rules! impl_debug {
    ($($name:ident),*) => {
        $(
            impl<F> fmt::Debug for $name<F> {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(stringify!($name))
                }
            }
        )*
    };
}

impl_debug!(FnHandler, SyncFnHandler, ErrorFnHandler);

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use std::io;

    fn request(path: &str) -> Request {
        Request::new(http::Request::builder().uri(path).body(Bytes::new()).unwrap())
    }

    #[tokio::test]
    async fn async_handler_gets_params() {
        let handler = handler_fn(|req: Request, params: PathParams| async move {
            Ok::<_, HandlerError>(format!("{} {}", req.path(), params.get("id").unwrap_or("-")))
        });
        let params = PathParams::new(vec![("id".into(), "42".into())]);

        let response = invoke(&handler, request("/users/42"), params).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"/users/42 42");
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
    }

    #[tokio::test]
    async fn sync_handler() {
        let handler = sync_handler_fn(|_req: Request, _params: PathParams| Ok::<_, HandlerError>("pong"));

        let response = invoke(&handler, request("/ping"), PathParams::empty()).await.unwrap();

        assert_eq!(response.body().as_ref(), b"pong");
    }

    #[tokio::test]
    async fn keeps_content_type_set_by_handler() {
        let handler = sync_handler_fn(|_req: Request, _params: PathParams| {
            Response::builder().header(CONTENT_TYPE, "application/json").body("{}").map_err(HandlerError::internal)
        });

        let response = invoke(&handler, request("/json"), PathParams::empty()).await.unwrap();

        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn no_content_type_on_no_content() {
        let handler =
            sync_handler_fn(|_req: Request, _params: PathParams| Ok::<_, HandlerError>((StatusCode::NO_CONTENT, ())));

        let response = invoke(&handler, request("/users/42"), PathParams::empty()).await.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn errors_pass_through() {
        let tagged = handler_fn(|_req: Request, _params: PathParams| async {
            Err::<(), _>(HandlerError::with_message(StatusCode::CONFLICT, "already exists"))
        });
        let untagged =
            sync_handler_fn(|_req: Request, _params: PathParams| Err::<(), _>(io::Error::other("connection reset")));

        let tagged = invoke(&tagged, request("/"), PathParams::empty()).await.unwrap_err();
        let untagged = invoke(&untagged, request("/"), PathParams::empty()).await.unwrap_err();

        assert!(matches!(tagged, HandlerError::Status { status: StatusCode::CONFLICT, message: Some(_) }));
        assert!(matches!(untagged, HandlerError::Internal(_)));
    }

    #[tokio::test]
    async fn error_handler_ignores_params() {
        let handler = error_handler_fn(|req: Request| async move {
            Ok::<_, HandlerError>((StatusCode::NOT_FOUND, format!("nothing at {}", req.path())))
        });

        let response = invoke(&handler, request("/missing"), PathParams::empty()).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body().as_ref(), b"nothing at /missing");
    }
}

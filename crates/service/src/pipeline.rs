//! The per-request pipeline: interceptors, route lookup, handler invocation and the translation
//! of handler errors into responses.

use crate::error::HandlerError;
use crate::handler::{self, text_plain_utf8};
use crate::interceptor::{Interceptor, Interceptors, ServerHeader};
use crate::options::HttpOptions;
use crate::request::{PathParams, Request};
use crate::router::Router;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, Response, StatusCode};
use nimbus_http::protocol::is_bodiless;
use std::convert::Infallible;
use std::error::Error;
use std::fmt::Write;
use tracing::{debug, error, warn};

pub struct Pipeline {
    router: Router,
    interceptors: Interceptors,
    server_header: ServerHeader,
    debug: bool,
}

impl Pipeline {
    pub fn new(router: Router, interceptors: Interceptors, options: &HttpOptions) -> Self {
        Self { router, interceptors, server_header: ServerHeader::from_options(options), debug: options.debug }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Produces the response for `req`. Never fails: every error becomes a response.
    pub async fn dispatch(&self, req: http::Request<Bytes>) -> Response<Bytes> {
        let request = Request::new(req);
        self.interceptors.on_request(&request).await;

        let result = match self.router.at(request.method(), request.path()) {
            Some(matched) => {
                let handler = matched.handler();
                handler::invoke(handler, request.clone(), matched.into_params()).await
            }
            None => {
                debug!(method = %request.method(), path = request.path(), "no route matched");
                Err(HandlerError::not_found())
            }
        };

        let mut response = match result {
            Ok(response) => response,
            Err(e) => self.recover(&request, e).await,
        };

        if is_bodiless(response.status()) {
            response.headers_mut().remove(CONTENT_LENGTH);
            *response.body_mut() = Bytes::new();
        } else {
            let length = response.body().len();
            response.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(length));
            if length > 0 && !response.headers().contains_key(CONTENT_TYPE) {
                response.headers_mut().insert(CONTENT_TYPE, text_plain_utf8());
            }
        }

        self.interceptors.on_response(&request, &mut response).await;
        self.server_header.on_response(&request, &mut response).await;
        response
    }

    /// Turns a handler error into a response.
    ///
    /// Unrecognized statuses and internal faults are answered as 500. Either way the error
    /// handler registered for the resulting status runs and its status is forced; without
    /// one the default body is used, with the source chain appended in debug mode.
    async fn recover(&self, request: &Request, error: HandlerError) -> Response<Bytes> {
        let (status, message, chain) = match error {
            HandlerError::Status { status, message } if status.canonical_reason().is_some() => (status, message, None),
            HandlerError::Status { status, .. } => {
                warn!(%status, path = request.path(), "unrecognized status code, responding with 500");
                (StatusCode::INTERNAL_SERVER_ERROR, None, None)
            }
            HandlerError::Internal(cause) => {
                error!(cause = %cause, method = %request.method(), path = request.path(), "error handling request");
                let chain = self.debug.then(|| error_chain(cause.as_ref()));
                (StatusCode::INTERNAL_SERVER_ERROR, None, chain)
            }
        };

        let Some(error_handler) = self.router.error_handler(status) else {
            let mut response = default_response(status, message.as_deref());
            if let Some(chain) = chain {
                debug!(chain = %chain, "error source chain");
                let body = format!("{}\n\n{chain}", String::from_utf8_lossy(response.body()));
                *response.body_mut() = Bytes::from(body);
            }
            return response;
        };

        match handler::invoke(error_handler, request.clone(), PathParams::empty()).await {
            Ok(mut response) => {
                *response.status_mut() = status;
                response
            }
            Err(e) => {
                error!(%status, cause = %e, path = request.path(), "error handler failed");
                default_response(StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        }
    }
}

#[async_trait]
impl nimbus_http::handler::Handler for Pipeline {
    type Error = Infallible;

    async fn call(&self, req: http::Request<Bytes>) -> Result<Response<Bytes>, Self::Error> {
        Ok(self.dispatch(req).await)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("router", &self.router)
            .field("interceptors", &self.interceptors)
            .field("server_header", &self.server_header)
            .field("debug", &self.debug)
            .finish()
    }
}

/// `"<code>: <reason>"`, or `"<code>: <message>"` when the error carries a message.
fn default_response(status: StatusCode, message: Option<&str>) -> Response<Bytes> {
    let text = message.or_else(|| status.canonical_reason()).unwrap_or("Unknown");
    let mut response = Response::new(Bytes::from(format!("{}: {text}", status.as_u16())));
    *response.status_mut() = status;
    response
}

/// The error and its sources, one per line.
fn error_chain(error: &(dyn Error + 'static)) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(chain, "\ncaused by: {cause}");
        source = cause.source();
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{error_handler_fn, handler_fn, sync_handler_fn};
    use crate::router::RouteRegistry;
    use http::Method;
    use http::header::SERVER;
    use std::io;

    fn get(path: &str) -> http::Request<Bytes> {
        http::Request::builder().method(Method::GET).uri(path).body(Bytes::new()).unwrap()
    }

    fn pipeline(registry: RouteRegistry, options: &HttpOptions) -> Pipeline {
        Pipeline::new(registry.build(), Interceptors::default(), options)
    }

    fn text(response: &Response<Bytes>) -> &str {
        std::str::from_utf8(response.body()).unwrap()
    }

    #[derive(Debug)]
    struct Wrapped(io::Error);

    impl std::fmt::Display for Wrapped {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("query failed")
        }
    }

    impl Error for Wrapped {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    fn failing_registry() -> RouteRegistry {
        let mut registry = RouteRegistry::new();
        registry
            .get(
                "/boom",
                sync_handler_fn(|_req: Request, _params: PathParams| {
                    Err::<(), _>(HandlerError::internal(Wrapped(io::Error::other("secret connection string"))))
                }),
            )
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn routes_to_handler() {
        let mut registry = RouteRegistry::new();
        registry
            .get(
                r"/users/(?P<id>\d+)",
                handler_fn(|_req: Request, params: PathParams| async move {
                    Ok::<_, HandlerError>(format!("user {}", params.get("id").unwrap_or_default()))
                }),
            )
            .unwrap();

        let response = pipeline(registry, &HttpOptions::default()).dispatch(get("/users/42")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text(&response), "user 42");
        assert_eq!(response.headers()[CONTENT_LENGTH], "7");
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(response.headers()[SERVER], "service.io");
    }

    #[tokio::test]
    async fn unmatched_path_is_404() {
        let response = pipeline(RouteRegistry::new(), &HttpOptions::default()).dispatch(get("/nowhere")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text(&response), "404: Not Found");
        assert_eq!(response.headers()[CONTENT_LENGTH], "14");
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
    }

    #[tokio::test]
    async fn not_found_override_keeps_404() {
        let mut registry = RouteRegistry::new();
        registry
            .error_handler(
                404,
                error_handler_fn(|req: Request| async move { Ok::<_, HandlerError>(format!("no page at {}", req.path())) }),
            )
            .unwrap();

        let response = pipeline(registry, &HttpOptions::default()).dispatch(get("/nowhere")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text(&response), "no page at /nowhere");
    }

    #[tokio::test]
    async fn status_error_with_message() {
        let mut registry = RouteRegistry::new();
        registry
            .get(
                "/admin",
                sync_handler_fn(|_req: Request, _params: PathParams| {
                    Err::<(), _>(HandlerError::with_message(StatusCode::FORBIDDEN, "admins only"))
                }),
            )
            .unwrap();

        let response = pipeline(registry, &HttpOptions::default()).dispatch(get("/admin")).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(text(&response), "403: admins only");
    }

    #[tokio::test]
    async fn error_handler_status_is_forced() {
        let mut registry = RouteRegistry::new();
        registry
            .get("/gone", sync_handler_fn(|_req: Request, _params: PathParams| Err::<(), _>(StatusCode::GONE)))
            .unwrap()
            .error_handler(410, error_handler_fn(|_req: Request| async { Ok::<_, HandlerError>("moved on") }))
            .unwrap();

        let response = pipeline(registry, &HttpOptions::default()).dispatch(get("/gone")).await;

        assert_eq!(response.status(), StatusCode::GONE);
        assert_eq!(text(&response), "moved on");
    }

    #[tokio::test]
    async fn internal_error_hidden_without_debug() {
        let response = pipeline(failing_registry(), &HttpOptions::default()).dispatch(get("/boom")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(text(&response), "500: Internal Server Error");
    }

    #[tokio::test]
    async fn internal_error_shown_in_debug() {
        let options = HttpOptions { debug: true, ..HttpOptions::default() };

        let response = pipeline(failing_registry(), &options).dispatch(get("/boom")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(text(&response).starts_with("500: Internal Server Error\n\n"));
        assert!(text(&response).contains("query failed"));
        assert!(text(&response).contains("caused by: secret connection string"));
    }

    #[tokio::test]
    async fn unrecognized_status_becomes_500() {
        let mut registry = RouteRegistry::new();
        registry
            .get(
                "/odd",
                sync_handler_fn(|_req: Request, _params: PathParams| {
                    Err::<(), _>(HandlerError::status(StatusCode::from_u16(599).unwrap()))
                }),
            )
            .unwrap();

        let response = pipeline(registry, &HttpOptions::default()).dispatch(get("/odd")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(text(&response), "500: Internal Server Error");
    }

    #[tokio::test]
    async fn internal_server_error_override_serves_every_500() {
        let mut registry = RouteRegistry::new();
        registry
            .get(
                "/boom",
                sync_handler_fn(|_req: Request, _params: PathParams| Err::<(), _>(io::Error::other("db down"))),
            )
            .unwrap()
            .get(
                "/odd",
                sync_handler_fn(|_req: Request, _params: PathParams| {
                    Err::<(), _>(HandlerError::status(StatusCode::from_u16(599).unwrap()))
                }),
            )
            .unwrap()
            .error_handler(500, error_handler_fn(|_req: Request| async { Ok::<_, HandlerError>("custom 500 page") }))
            .unwrap();
        let options = HttpOptions { debug: true, ..HttpOptions::default() };
        let pipeline = pipeline(registry, &options);

        for path in ["/boom", "/odd"] {
            let response = pipeline.dispatch(get(path)).await;

            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(text(&response), "custom 500 page");
        }
    }

    #[tokio::test]
    async fn failing_error_handler_falls_back_to_500() {
        let mut registry = RouteRegistry::new();
        registry
            .error_handler(
                404,
                error_handler_fn(|_req: Request| async { Err::<(), _>(io::Error::other("template missing")) }),
            )
            .unwrap();

        let response = pipeline(registry, &HttpOptions::default()).dispatch(get("/nowhere")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(text(&response), "500: Internal Server Error");
    }

    #[tokio::test]
    async fn two_not_found_handlers_last_one_used() {
        let mut registry = RouteRegistry::new();
        registry
            .error_handler(404, error_handler_fn(|_req: Request| async { Ok::<_, HandlerError>("first") }))
            .unwrap()
            .error_handler(404, error_handler_fn(|_req: Request| async { Ok::<_, HandlerError>("second") }))
            .unwrap();

        let response = pipeline(registry, &HttpOptions::default()).dispatch(get("/nowhere")).await;

        assert_eq!(text(&response), "second");
    }

    #[tokio::test]
    async fn server_header_overrides_or_removes() {
        let handler = || {
            sync_handler_fn(|_req: Request, _params: PathParams| {
                Response::builder().header(SERVER, "custom/0.1").body("hi").map_err(HandlerError::internal)
            })
        };

        let mut registry = RouteRegistry::new();
        registry.get("/", handler()).unwrap();
        let response = pipeline(registry, &HttpOptions::default()).dispatch(get("/")).await;
        assert_eq!(response.headers()[SERVER], "service.io");

        let mut registry = RouteRegistry::new();
        registry.get("/", handler()).unwrap();
        let options = HttpOptions { server_header: None, ..HttpOptions::default() };
        let response = pipeline(registry, &options).dispatch(get("/")).await;
        assert!(response.headers().get(SERVER).is_none());
    }

    #[tokio::test]
    async fn no_content_response() {
        let mut registry = RouteRegistry::new();
        registry
            .get(
                "/empty",
                sync_handler_fn(|_req: Request, _params: PathParams| {
                    Response::builder().status(StatusCode::NO_CONTENT).body(Bytes::new()).map_err(HandlerError::internal)
                }),
            )
            .unwrap();

        let response = pipeline(registry, &HttpOptions::default()).dispatch(get("/empty")).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(CONTENT_LENGTH).is_none());
        assert!(response.headers().get(CONTENT_TYPE).is_none());
        assert!(response.body().is_empty());
    }
}

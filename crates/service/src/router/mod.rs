//! Route registration and lookup.
//!
//! Routes are registered on a [`RouteRegistry`] and looked up through the immutable [`Router`]
//! it builds. Lookup walks the routes in registration order and the first entry whose method
//! and pattern both match wins; a `GET` route also answers `HEAD`.
//!
//! ```
//! use nimbus::handler::sync_handler_fn;
//! use nimbus::router::RouteRegistry;
//! use nimbus::{ConfigurationError, HandlerError, PathParams, Request};
//! use http::Method;
//!
//! # fn main() -> Result<(), ConfigurationError> {
//! let mut registry = RouteRegistry::new();
//! registry
//!     .get(r"/users/(?P<id>\d+)", sync_handler_fn(|_: Request, p: PathParams| {
//!         Ok::<_, HandlerError>(format!("user {}", p.get("id").unwrap_or_default()))
//!     }))?
//!     .route("post", "/users", sync_handler_fn(|_: Request, _: PathParams| Ok::<_, HandlerError>("created")))?;
//!
//! let router = registry.build();
//! let matched = router.at(&Method::HEAD, "/users/42").unwrap();
//! assert_eq!(matched.params().get("id"), Some("42"));
//! # Ok(())
//! # }
//! ```

use crate::error::ConfigurationError;
use crate::handler::RequestHandler;
use crate::pattern::PathPattern;
use crate::request::PathParams;
use http::{Method, StatusCode};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A registered route.
#[derive(Clone)]
pub struct RouteEntry {
    method: Method,
    pattern: PathPattern,
    handler: Arc<dyn RequestHandler>,
}

impl RouteEntry {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn handler(&self) -> &dyn RequestHandler {
        self.handler.as_ref()
    }

    fn accepts(&self, method: &Method) -> bool {
        self.method == method || (self.method == Method::GET && method == Method::HEAD)
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry").field("method", &self.method).field("pattern", &self.pattern).finish()
    }
}

/// The route found for a request, with the parameters its pattern captured.
#[derive(Debug)]
pub struct RouteMatch<'router> {
    entry: &'router RouteEntry,
    params: PathParams,
}

impl<'router> RouteMatch<'router> {
    pub fn entry(&self) -> &'router RouteEntry {
        self.entry
    }

    pub fn handler(&self) -> &'router dyn RequestHandler {
        self.entry.handler()
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn into_params(self) -> PathParams {
        self.params
    }
}

/// Collects routes and error handlers until [`RouteRegistry::build`] freezes them.
#[derive(Default)]
pub struct RouteRegistry {
    routes: Vec<RouteEntry>,
    error_handlers: HashMap<StatusCode, Arc<dyn RequestHandler>>,
}

macro_rules! method_route {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("Registers a `", stringify!($method), "` route.")]
            pub fn $name<H: RequestHandler + 'static>(
                &mut self,
                pattern: &str,
                handler: H,
            ) -> Result<&mut Self, ConfigurationError> {
                self.add(Method::$method, pattern, Arc::new(handler))
            }
        )*
    };
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route; `method` is one of the standard verbs in any letter case.
    pub fn route<H: RequestHandler + 'static>(
        &mut self,
        method: &str,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, ConfigurationError> {
        let method = parse_method(method)?;
        self.add(method, pattern, Arc::new(handler))
    }

    method_route! {
        get => GET,
        post => POST,
        put => PUT,
        delete => DELETE,
        head => HEAD,
        options => OPTIONS,
        patch => PATCH,
        trace => TRACE,
        connect => CONNECT,
    }

    pub(crate) fn add(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<&mut Self, ConfigurationError> {
        let pattern = PathPattern::compile(pattern)?;
        debug!(%method, %pattern, "register route");
        self.routes.push(RouteEntry { method, pattern, handler });
        Ok(self)
    }

    /// Registers the handler producing the response for errors with `status`.
    ///
    /// A later registration for the same status replaces the earlier one.
    pub fn error_handler<H: RequestHandler + 'static>(
        &mut self,
        status: u16,
        handler: H,
    ) -> Result<&mut Self, ConfigurationError> {
        self.add_error_handler(status, Arc::new(handler))
    }

    pub(crate) fn add_error_handler(
        &mut self,
        status: u16,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<&mut Self, ConfigurationError> {
        let status = StatusCode::from_u16(status).map_err(|_| ConfigurationError::InvalidStatusCode { code: status })?;
        if self.error_handlers.insert(status, handler).is_some() {
            debug!(%status, "error handler replaced");
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn build(self) -> Router {
        Router { routes: self.routes, error_handlers: self.error_handlers }
    }
}

impl fmt::Debug for RouteRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRegistry")
            .field("routes", &self.routes)
            .field("error_handlers", &self.error_handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The frozen routing table.
pub struct Router {
    routes: Vec<RouteEntry>,
    error_handlers: HashMap<StatusCode, Arc<dyn RequestHandler>>,
}

impl Router {
    pub fn builder() -> RouteRegistry {
        RouteRegistry::new()
    }

    /// Finds the first route, in registration order, accepting `method` and the whole `path`.
    pub fn at(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.routes
            .iter()
            .filter(|entry| entry.accepts(method))
            .find_map(|entry| entry.pattern.match_path(path).map(|params| RouteMatch { entry, params }))
    }

    pub fn error_handler(&self, status: StatusCode) -> Option<&dyn RequestHandler> {
        self.error_handlers.get(&status).map(|handler| handler.as_ref())
    }

    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("error_handlers", &self.error_handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Parses a standard HTTP verb, ignoring letter case.
pub fn parse_method(method: &str) -> Result<Method, ConfigurationError> {
    let upper = method.trim().to_ascii_uppercase();
    match upper.as_str() {
        "GET" => Ok(Method::GET),
        "HEAD" => Ok(Method::HEAD),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "DELETE" => Ok(Method::DELETE),
        "CONNECT" => Ok(Method::CONNECT),
        "OPTIONS" => Ok(Method::OPTIONS),
        "TRACE" => Ok(Method::TRACE),
        "PATCH" => Ok(Method::PATCH),
        _ => Err(ConfigurationError::invalid_method(method)),
    }
}

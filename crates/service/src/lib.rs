//! An embeddable HTTP service layer.
//!
//! A service declares its endpoints as `(method, path pattern, handler)` routes plus optional
//! per-status error handlers, then starts the server once. Requests run through a pipeline that
//! finds the first matching route, invokes its handler and turns every outcome, including
//! errors, into a response. Once the listener is bound, discovery collaborators are told about
//! each endpoint.
//!
//! # Components
//!
//! - [`pattern`]: regular expression path patterns, always matched against the whole path
//! - [`router`]: route and error handler registration, first-match lookup
//! - [`handler`]: the handler trait and closure adapters
//! - [`pipeline`]: interceptors, dispatch and error responses
//! - [`server`]: [`ServiceContext`] and its one-shot startup
//! - [`discovery`]: best-effort endpoint notifications
//!
//! The HTTP/1.1 transport underneath lives in the `nimbus-http` crate.

pub mod discovery;
pub mod handler;
pub mod interceptor;
pub mod logging;
pub mod pattern;
pub mod pipeline;
pub mod router;
pub mod server;

mod error;
mod options;
mod request;
mod responder;

pub use error::{ConfigurationError, DiscoveryError, HandlerError, StartupError};
pub use options::{HttpOptions, Options};
pub use pattern::PathPattern;
pub use request::{PathParams, Request};
pub use responder::Responder;
pub use server::{ServerState, ServiceContext};

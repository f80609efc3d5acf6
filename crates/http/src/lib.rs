//! The HTTP/1.1 transport underneath the nimbus service layer
//!
//! This crate turns a TCP stream (or any `AsyncRead`/`AsyncWrite` pair) into exactly one
//! request/response exchange. It decodes the request line, headers and body, hands a fully
//! buffered [`http::Request<Bytes>`] to a [`handler::Handler`], encodes the returned
//! [`http::Response<Bytes>`] and closes the connection once the response is flushed.
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::{Request, Response, StatusCode};
//! use nimbus_http::connection::HttpConnection;
//! use nimbus_http::handler::make_handler;
//! use std::convert::Infallible;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, warn};
//!
//! #[tokio::main]
//! async fn main() {
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(make_handler(hello_world));
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = handler.clone();
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             if let Err(e) = HttpConnection::new(reader, writer).process(handler).await {
//!                 error!("service has error, cause {}, connection shutdown", e);
//!             }
//!         });
//!     }
//! }
//!
//! async fn hello_world(request: Request<Bytes>) -> Result<Response<Bytes>, Infallible> {
//!     let body = format!("hello {}\r\n", request.uri().path());
//!     Ok(Response::builder().status(StatusCode::OK).body(Bytes::from(body)).unwrap())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`connection`]: drives a single exchange on a connection
//! - [`protocol`]: request header wrapper, payload markers and error types
//! - [`codec`]: `tokio_util` decoder/encoder for requests and responses
//! - [`handler`]: the async handler trait the connection calls
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only, no TLS, no upgrades
//! - No keep-alive: every response carries `Connection: close`
//! - Request bodies are buffered, bounded by a configurable limit
//! - Maximum header size: 8KB, maximum number of headers: 64

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;

//! Drives one request/response exchange over a byte stream.
//!
//! [`HttpConnection`] reads a single request, calls the [`Handler`](crate::handler::Handler),
//! writes the response with `Connection: close` and shuts the write side down. Requests that
//! can't be decoded are answered with the matching 4xx/5xx status before the error is returned.

mod http_connection;

pub use http_connection::HttpConnection;

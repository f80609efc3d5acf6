//! Codec turning raw bytes into requests and responses into raw bytes.
//!
//! - [`RequestDecoder`]: yields complete requests, using the `header` and `body` decoders
//! - [`ResponseEncoder`]: writes a complete response
//!
//! Both plug into `tokio_util::codec::{FramedRead, FramedWrite}`.

mod body;
mod header;
mod request_decoder;
mod response_encoder;

pub use request_decoder::{DEFAULT_MAX_BODY_SIZE, RequestDecoder};
pub use response_encoder::ResponseEncoder;

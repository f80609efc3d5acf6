//! Header section encoding and decoding.
//!
//! - [`HeaderDecoder`]: parses the request line and header fields, decides how the body is framed
//! - [`HeaderEncoder`]: writes the status line and header fields of a response

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;

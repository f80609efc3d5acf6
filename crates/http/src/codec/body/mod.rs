//! Request body decoding.
//!
//! - `LengthDecoder`: bodies framed by `Content-Length`
//! - `ChunkedDecoder`: bodies framed by `Transfer-Encoding: chunked`
//! - [`PayloadDecoder`]: picks one of the above, or none, from the [`PayloadSize`](crate::protocol::PayloadSize)

mod chunked_decoder;
mod length_decoder;
mod payload_decoder;

pub use payload_decoder::PayloadDecoder;

//! Decodes a complete request, header section and body, from the read buffer.
//!
//! Bodies are buffered in full before the request is yielded, up to a configurable limit.
//!
//! ```no_run
//! use nimbus_http::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = RequestDecoder::with_max_body_size(64 * 1024);
//! let mut buffer = BytesMut::from("GET /health HTTP/1.1\r\nHost: localhost\r\n\r\n");
//! let request = decoder.decode(&mut buffer);
//! ```

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::ensure;
use crate::protocol::{ParseError, PayloadItem, PayloadSize, RequestHeader};
use bytes::{Bytes, BytesMut};
use http::Request;
use tokio_util::codec::Decoder;
use tracing::trace;

/// Default upper bound for a request body: 1 MiB
pub const DEFAULT_MAX_BODY_SIZE: u64 = 1024 * 1024;

/// A request whose header section is complete but whose body is still arriving.
#[derive(Debug)]
struct PendingRequest {
    header: RequestHeader,
    payload_decoder: PayloadDecoder,
    body: BytesMut,
}

/// Decoder yielding buffered `Request<Bytes>`s.
///
/// Works in two phases: the [`HeaderDecoder`] parses the header section, then a
/// [`PayloadDecoder`] collects the body. Bodies larger than `max_body_size` are rejected with
/// [`ParseError::TooLargeBody`], before reading them when `Content-Length` announces the size.
#[derive(Debug)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    pending: Option<PendingRequest>,
    max_body_size: u64,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_max_body_size(max_body_size: u64) -> Self {
        Self { header_decoder: HeaderDecoder, pending: None, max_body_size }
    }

    pub fn max_body_size(&self) -> u64 {
        self.max_body_size
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::with_max_body_size(DEFAULT_MAX_BODY_SIZE)
    }
}

impl Decoder for RequestDecoder {
    type Item = Request<Bytes>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.pending.is_none() {
            let Some((header, payload_size)) = self.header_decoder.decode(src)? else {
                return Ok(None);
            };

            let body = match payload_size {
                PayloadSize::Length(length) => {
                    ensure!(length <= self.max_body_size, ParseError::too_large_body(length, self.max_body_size));
                    BytesMut::with_capacity(length as usize)
                }
                _ => BytesMut::new(),
            };

            self.pending = Some(PendingRequest { header, payload_decoder: payload_size.into(), body });
        }

        let Some(pending) = &mut self.pending else {
            return Ok(None);
        };

        loop {
            match pending.payload_decoder.decode(src)? {
                Some(PayloadItem::Chunk(bytes)) => {
                    let current_size = (pending.body.len() + bytes.len()) as u64;
                    ensure!(current_size <= self.max_body_size, ParseError::too_large_body(current_size, self.max_body_size));
                    pending.body.extend_from_slice(&bytes);
                }
                Some(PayloadItem::Eof) => break,
                None => return Ok(None),
            }
        }

        let Some(PendingRequest { header, body, .. }) = self.pending.take() else {
            return Ok(None);
        };
        trace!(body_size = body.len(), "decoded request");
        Ok(Some(header.body(body.freeze())))
    }
}

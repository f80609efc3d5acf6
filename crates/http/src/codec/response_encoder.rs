//! Encodes a complete, buffered response.

use crate::codec::header::HeaderEncoder;
use crate::protocol::SendError;
use bytes::{BufMut, Bytes, BytesMut};
use http::Response;
use tokio_util::codec::Encoder;

/// Writes the header section followed by the whole body.
#[derive(Debug, Default)]
pub struct ResponseEncoder {
    header_encoder: HeaderEncoder,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Encoder<Response<Bytes>> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Response<Bytes>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (parts, body) = item.into_parts();
        let head = Response::from_parts(parts, ());

        self.header_encoder.encode((head, body.len() as u64), dst)?;
        dst.reserve(body.len());
        dst.put_slice(&body);
        Ok(())
    }
}

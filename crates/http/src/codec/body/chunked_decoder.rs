//! Decoder for bodies framed by chunked transfer coding, see
//! [RFC 9112 Section 7.1](https://www.rfc-editor.org/rfc/rfc9112.html#name-chunked-transfer-coding).
//!
//! Chunk size lines (including extensions) are parsed by `httparse::parse_chunk_size`; trailer
//! fields are read and dropped.

use crate::ensure;
use crate::protocol::{ParseError, PayloadItem};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

/// Upper bound for a single trailer line, so a peer can't make us buffer forever.
const MAX_TRAILER_LINE: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Expect a chunk size line
    Size,
    /// Inside chunk data, with the bytes left in this chunk
    Data(u64),
    /// Expect the CRLF closing a chunk
    DataEnd,
    /// After the last chunk: trailer fields until an empty line
    Trailer,
    /// Body fully read
    End,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: ChunkedState::Size }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                ChunkedState::Size => match httparse::parse_chunk_size(&src[..]) {
                    Ok(httparse::Status::Complete((consumed, size))) => {
                        src.advance(consumed);
                        trace!(size, "read chunk size");
                        self.state = if size == 0 { ChunkedState::Trailer } else { ChunkedState::Data(size) };
                    }
                    Ok(httparse::Status::Partial) => {
                        ensure!(src.len() <= MAX_TRAILER_LINE, ParseError::invalid_body("chunk size line too long"));
                        return Ok(None);
                    }
                    Err(_) => return Err(ParseError::invalid_body("invalid chunk size")),
                },

                ChunkedState::Data(remaining) => {
                    if src.is_empty() {
                        return Ok(None);
                    }

                    let len = remaining.min(src.len() as u64);
                    let bytes = src.split_to(len as usize).freeze();
                    let left = remaining - len;
                    self.state = if left == 0 { ChunkedState::DataEnd } else { ChunkedState::Data(left) };
                    return Ok(Some(PayloadItem::Chunk(bytes)));
                }

                ChunkedState::DataEnd => {
                    if src.len() < 2 {
                        return Ok(None);
                    }
                    ensure!(&src[..2] == b"\r\n", ParseError::invalid_body("missing CRLF after chunk data"));
                    src.advance(2);
                    self.state = ChunkedState::Size;
                }

                ChunkedState::Trailer => {
                    let Some(line_end) = src.iter().position(|b| *b == b'\n') else {
                        ensure!(src.len() <= MAX_TRAILER_LINE, ParseError::invalid_body("trailer line too long"));
                        return Ok(None);
                    };

                    let is_empty_line = src[..line_end].iter().all(|b| *b == b'\r');
                    src.advance(line_end + 1);
                    if is_empty_line {
                        self.state = ChunkedState::End;
                    }
                }

                ChunkedState::End => {
                    trace!("finished reading chunked data");
                    return Ok(Some(PayloadItem::Eof));
                }
            }
        }
    }
}

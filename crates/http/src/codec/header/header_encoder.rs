//! Serializes the status line and header fields of a response.

use crate::protocol::{ResponseHead, SendError, is_bodiless};

use bytes::{BufMut, BytesMut};

use http::{HeaderValue, Version, header};
use std::io;
use std::io::Write;
use tokio_util::codec::Encoder;

/// Initial buffer size reserved for the header section
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encodes a [`ResponseHead`] together with the length of the body that follows it.
///
/// `Content-Length` is inserted from that length unless the head already carries one, which
/// lets a HEAD response advertise the length of the body it doesn't send. Heads of 1xx and 204
/// responses never carry one.
#[derive(Debug, Default)]
pub struct HeaderEncoder;

impl Encoder<(ResponseHead, u64)> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (ResponseHead, u64), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, body_length) = item;

        dst.reserve(INIT_HEADER_SIZE);

        let version = match head.version() {
            Version::HTTP_10 => "HTTP/1.0",
            _ => "HTTP/1.1",
        };
        let status = head.status();
        write!(FastWrite(dst), "{version} {} {}\r\n", status.as_str(), status.canonical_reason().unwrap_or("Unknown"))?;

        if is_bodiless(status) {
            head.headers_mut().remove(header::CONTENT_LENGTH);
        } else if !head.headers().contains_key(header::CONTENT_LENGTH) {
            head.headers_mut().insert(header::CONTENT_LENGTH, HeaderValue::from(body_length));
        }

        for (name, value) in head.headers().iter() {
            dst.put_slice(name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// `io::Write` over a `BytesMut`, so `write!` can format straight into the buffer.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Response, StatusCode};

    fn encode(head: ResponseHead, length: u64) -> String {
        let mut dst = BytesMut::new();
        HeaderEncoder.encode((head, length), &mut dst).unwrap();
        String::from_utf8(dst.to_vec()).unwrap()
    }

    #[test]
    fn status_line_and_length() {
        let head = Response::builder().status(StatusCode::NOT_FOUND).header("X-Trace", "abc").body(()).unwrap();

        let encoded = encode(head, 14);

        assert!(encoded.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(encoded.contains("x-trace: abc\r\n"));
        assert!(encoded.contains("content-length: 14\r\n"));
        assert!(encoded.ends_with("\r\n\r\n"));
    }

    #[test]
    fn keeps_existing_content_length() {
        let head = Response::builder().header(header::CONTENT_LENGTH, "42").body(()).unwrap();

        let encoded = encode(head, 0);

        assert!(encoded.contains("content-length: 42\r\n"));
        assert!(!encoded.contains("content-length: 0"));
    }

    #[test]
    fn no_content_has_no_length() {
        let head =
            Response::builder().status(StatusCode::NO_CONTENT).header(header::CONTENT_LENGTH, "0").body(()).unwrap();

        let encoded = encode(head, 0);

        assert!(encoded.starts_with("HTTP/1.1 204 No Content\r\n"));
        assert!(!encoded.contains("content-length"));
    }

    #[test]
    fn unknown_reason_phrase() {
        let head = Response::builder().status(StatusCode::from_u16(599).unwrap()).body(()).unwrap();

        assert!(encode(head, 0).starts_with("HTTP/1.1 599 Unknown\r\n"));
    }
}

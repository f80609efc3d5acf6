//! Decodes the request line and header fields of an HTTP/1.x request.
//!
//! Parsing is delegated to `httparse`; the decoder then copies the method, target, version and
//! header fields into an [`http::Request<()>`] and works out how the body is framed.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header section size: 8KB
//! - HTTP/1.0 and HTTP/1.1 only

use bytes::{Buf, BytesMut};
use http::{HeaderName, HeaderValue, Request};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;

use crate::protocol::{ParseError, PayloadSize, RequestHeader};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Shortest header section we can possibly complete: `GET / HTTP/1.1\r\n\r\n`
const MIN_REQUEST_BYTES: usize = 18;

/// Decoder for the header section of a request.
///
/// Yields the parsed [`RequestHeader`] together with the [`PayloadSize`] derived from the
/// `Content-Length` and `Transfer-Encoding` fields. The header bytes are consumed from the
/// buffer, anything after them is left for the payload decoder.
#[derive(Debug, Default)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = (RequestHeader, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < MIN_REQUEST_BYTES {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut req = httparse::Request::new(&mut headers);

        let parsed_result = req.parse(src).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e.to_string()),
        });

        let body_offset = match parsed_result? {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };

        trace!(header_size = body_offset, "parsed request header");
        ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

        let version = match req.version {
            Some(0) => http::Version::HTTP_10,
            Some(1) => http::Version::HTTP_11,
            // http2 and http3 are not supported
            _ => return Err(ParseError::InvalidVersion(req.version)),
        };

        let method = http::Method::from_bytes(req.method.ok_or(ParseError::InvalidMethod)?.as_bytes())
            .map_err(|_| ParseError::InvalidMethod)?;
        let uri = req.path.ok_or(ParseError::InvalidUri)?.parse::<http::Uri>().map_err(|_| ParseError::InvalidUri)?;

        let mut request = Request::new(());
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.version_mut() = version;

        let header_map = request.headers_mut();
        header_map.reserve(req.headers.len());
        for header in req.headers.iter() {
            let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(ParseError::invalid_header)?;
            let value = HeaderValue::from_bytes(header.value).map_err(ParseError::invalid_header)?;
            header_map.append(name, value);
        }

        src.advance(body_offset);

        let header = RequestHeader::from(request);
        let payload_size = parse_payload(&header)?;

        Ok(Some((header, payload_size)))
    }
}

/// Works out how the body is framed, following RFC 9112 section 6.
///
/// `Transfer-Encoding` together with `Content-Length` is rejected as a smuggling vector.
fn parse_payload(header: &RequestHeader) -> Result<PayloadSize, ParseError> {
    // refer: https://www.rfc-editor.org/rfc/rfc9112.html#name-transfer-encoding
    let te_header = header.headers().get(http::header::TRANSFER_ENCODING);
    let cl_header = header.headers().get(http::header::CONTENT_LENGTH);

    match (te_header, cl_header) {
        (None, None) => Ok(PayloadSize::new_empty()),

        (Some(te_value), None) => {
            if is_chunked(te_value) {
                Ok(PayloadSize::new_chunked())
            } else if header.need_body() {
                Err(ParseError::invalid_body("transfer-encoding without chunked as final encoding"))
            } else {
                Ok(PayloadSize::new_empty())
            }
        }

        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;

            let length = cl_str
                .trim()
                .parse::<u64>()
                .map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

            Ok(PayloadSize::new_length(length))
        }

        (Some(_), Some(_)) => {
            Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers"))
        }
    }
}

/// Whether `chunked` is the final transfer coding.
fn is_chunked(header_value: &HeaderValue) -> bool {
    header_value
        .as_bytes()
        .rsplit(|b| *b == b',')
        .next()
        .is_some_and(|last| last.trim_ascii().eq_ignore_ascii_case(b"chunked"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Version};
    use indoc::indoc;

    #[test]
    fn check_is_chunked() {
        assert!(is_chunked(&HeaderValue::from_static("chunked")));
        assert!(is_chunked(&HeaderValue::from_static("gzip, chunked")));
        assert!(is_chunked(&HeaderValue::from_static("gzip, Chunked ")));
        assert!(!is_chunked(&HeaderValue::from_static("chunked, gzip")));
        assert!(!is_chunked(&HeaderValue::from_static("gzip")));
    }

    #[test]
    fn leaves_body_in_buffer() {
        let str = indoc! {r##"
        POST /users HTTP/1.1
        Host: 127.0.0.1:8080
        Content-Length: 3

        123"##};

        let mut bytes = BytesMut::from(str);

        let (header, payload_size) = HeaderDecoder.decode(&mut bytes).unwrap().unwrap();

        assert_eq!(header.method(), &Method::POST);
        assert_eq!(payload_size, PayloadSize::Length(3));
        assert_eq!(&bytes[..], &b"123"[..]);
    }

    #[test]
    fn from_curl() {
        let str = indoc! {r##"
        GET /users/42?verbose=1 HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/8.4.0
        Accept: */*

        "##};

        let mut buf = BytesMut::from(str);

        let (header, payload_size) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();

        assert!(payload_size.is_empty());

        assert_eq!(header.method(), &Method::GET);
        assert_eq!(header.version(), Version::HTTP_11);
        assert_eq!(header.uri().path(), "/users/42");
        assert_eq!(header.uri().query(), Some("verbose=1"));
        assert_eq!(header.headers().len(), 3);
        assert_eq!(header.headers().get(http::header::USER_AGENT).unwrap(), "curl/8.4.0");
        assert_eq!(header.headers().get(http::header::ACCEPT).unwrap(), "*/*");
    }

    #[test]
    fn partial_header_waits_for_more() {
        let mut buf = BytesMut::from("GET /users HTTP/1.1\r\nHost: 127.0");
        let len = buf.len();

        assert!(HeaderDecoder.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), len);
    }

    #[test]
    fn chunked_request() {
        let mut buf = BytesMut::from("POST /upload HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n");

        let (_, payload_size) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();

        assert!(payload_size.is_chunked());
    }

    #[test]
    fn rejects_length_and_chunked_together() {
        let mut buf =
            BytesMut::from("POST /upload HTTP/1.1\r\nTransfer-Encoding: chunked\r\nContent-Length: 4\r\n\r\n");

        let result = HeaderDecoder.decode(&mut buf);

        assert!(matches!(result, Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn rejects_invalid_content_length() {
        let mut buf = BytesMut::from("POST /upload HTTP/1.1\r\nContent-Length: ten\r\n\r\n");

        let result = HeaderDecoder.decode(&mut buf);

        assert!(matches!(result, Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn rejects_oversized_header() {
        let mut raw = String::from("GET / HTTP/1.1\r\nX-Filler: ");
        raw.push_str(&"a".repeat(MAX_HEADER_BYTES));

        let mut buf = BytesMut::from(raw.as_str());
        let result = HeaderDecoder.decode(&mut buf);

        assert!(matches!(result, Err(ParseError::TooLargeHeader { .. })));
    }

    #[test]
    fn rejects_garbage() {
        let mut buf = BytesMut::from("this is not http at all\r\n\r\n");

        assert!(HeaderDecoder.decode(&mut buf).is_err());
    }
}

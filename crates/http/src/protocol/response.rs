//! Response head used by the header encoder.

use http::{Response, StatusCode};

/// The status line and header fields of a response, with the body split off.
pub type ResponseHead = Response<()>;

/// Whether responses with `status` carry neither a body nor `Content-Length`.
///
/// See [RFC 9110 Section 8.6](https://www.rfc-editor.org/rfc/rfc9110.html#name-content-length).
pub fn is_bodiless(status: StatusCode) -> bool {
    status.is_informational() || status == StatusCode::NO_CONTENT
}

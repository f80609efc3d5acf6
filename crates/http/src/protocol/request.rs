//! The parsed request line and header fields, before the body is attached.

use http::{HeaderMap, Method, Request, Uri, Version};

/// The head of an HTTP request.
///
/// The header decoder produces this as soon as the header section is complete; the body is
/// attached with [`RequestHeader::body`] once the payload decoder reaches the end of it.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl RequestHeader {
    /// Attaches a body, producing the full `Request<T>`.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|_| body)
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Whether a body is read for this request at all.
    ///
    /// GET, HEAD, DELETE, OPTIONS and CONNECT requests are treated as bodiless.
    pub fn need_body(&self) -> bool {
        !matches!(self.method(), &Method::GET | &Method::HEAD | &Method::DELETE | &Method::OPTIONS | &Method::CONNECT)
    }
}

impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}

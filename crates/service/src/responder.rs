//! Conversion of handler return values into responses.
//!
//! Handlers return any [`Responder`]; the adapter in [`crate::handler`] turns it into a
//! `Response<Bytes>`. A missing `Content-Type` is filled in there, not here.

use bytes::Bytes;
use http::{Response, StatusCode};

pub trait Responder {
    fn into_response(self) -> Response<Bytes>;
}

impl Responder for String {
    fn into_response(self) -> Response<Bytes> {
        Response::new(Bytes::from(self))
    }
}

impl Responder for &'static str {
    fn into_response(self) -> Response<Bytes> {
        Response::new(Bytes::from_static(self.as_bytes()))
    }
}

impl Responder for Bytes {
    fn into_response(self) -> Response<Bytes> {
        Response::new(self)
    }
}

impl Responder for Vec<u8> {
    fn into_response(self) -> Response<Bytes> {
        Response::new(Bytes::from(self))
    }
}

/// An empty `200 OK`.
impl Responder for () {
    fn into_response(self) -> Response<Bytes> {
        Response::new(Bytes::new())
    }
}

impl<B: Into<Bytes>> Responder for Response<B> {
    fn into_response(self) -> Response<Bytes> {
        self.map(Into::into)
    }
}

impl<T: Responder> Responder for (StatusCode, T) {
    fn into_response(self) -> Response<Bytes> {
        let (status, responder) = self;
        let mut response = responder.into_response();
        *response.status_mut() = status;
        response
    }
}

/// `None` is an empty `200 OK`.
impl<T: Responder> Responder for Option<T> {
    fn into_response(self) -> Response<Bytes> {
        match self {
            Some(responder) => responder.into_response(),
            None => ().into_response(),
        }
    }
}

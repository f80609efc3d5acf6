//! Hooks run around every dispatched request.
//!
//! [`Interceptors`] runs its members in order: `on_request` before route lookup, `on_response`
//! once the response (including error responses) is final. The pipeline always runs the
//! [`ServerHeader`] interceptor last.

mod date;
mod server_header;

pub use date::DateHeader;
pub use server_header::ServerHeader;

use crate::request::Request;
use async_trait::async_trait;
use bytes::Bytes;
use http::Response;

#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn on_request(&self, _req: &Request) {}

    async fn on_response(&self, _req: &Request, _resp: &mut Response<Bytes>) {}
}

pub struct Interceptors {
    inner: Vec<Box<dyn Interceptor>>,
}

#[async_trait]
impl Interceptor for Interceptors {
    async fn on_request(&self, req: &Request) {
        for interceptor in self.inner.iter() {
            interceptor.on_request(req).await;
        }
    }

    async fn on_response(&self, req: &Request, resp: &mut Response<Bytes>) {
        for interceptor in self.inner.iter() {
            interceptor.on_response(req, resp).await;
        }
    }
}

impl Interceptors {
    pub fn builder() -> InterceptorsBuilder {
        InterceptorsBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for Interceptors {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl std::fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptors").field("len", &self.inner.len()).finish()
    }
}

#[derive(Default)]
pub struct InterceptorsBuilder {
    inner: Vec<Box<dyn Interceptor>>,
}

impl InterceptorsBuilder {
    fn new() -> Self {
        Self { inner: vec![] }
    }

    pub fn add_last<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.inner.push(Box::new(interceptor));
        self
    }

    pub fn add_first<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.inner.insert(0, Box::new(interceptor));
        self
    }

    pub fn build(self) -> Interceptors {
        Interceptors { inner: self.inner }
    }
}

impl std::fmt::Debug for InterceptorsBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorsBuilder").field("len", &self.inner.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use std::sync::{Arc, Mutex};

    struct Record {
        name: &'static str,
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Interceptor for Record {
        async fn on_request(&self, req: &Request) {
            self.calls.lock().unwrap().push(format!("{} request {}", self.name, req.path()));
        }

        async fn on_response(&self, _req: &Request, resp: &mut Response<Bytes>) {
            self.calls.lock().unwrap().push(format!("{} response", self.name));
            resp.headers_mut().append("x-seen-by", HeaderValue::from_static(self.name));
        }
    }

    #[tokio::test]
    async fn runs_in_order() {
        let calls = Arc::new(Mutex::new(vec![]));
        let interceptors = Interceptors::builder()
            .add_last(Record { name: "second", calls: Arc::clone(&calls) })
            .add_first(Record { name: "first", calls: Arc::clone(&calls) })
            .build();

        let request = Request::new(http::Request::builder().uri("/ping").body(Bytes::new()).unwrap());
        let mut response = Response::new(Bytes::new());
        interceptors.on_request(&request).await;
        interceptors.on_response(&request, &mut response).await;

        assert_eq!(
            *calls.lock().unwrap(),
            ["first request /ping", "second request /ping", "first response", "second response"]
        );
        let seen_by = response.headers().get_all("x-seen-by").iter().collect::<Vec<_>>();
        assert_eq!(seen_by, ["first", "second"]);
    }
}

use super::Interceptor;
use crate::options::HttpOptions;
use crate::request::Request;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::SERVER;
use http::{HeaderValue, Response};

/// Sets the `Server` header to the configured value, or removes it when none is configured.
///
/// Runs after every other interceptor, so it wins over values set by handlers.
#[derive(Debug, Clone)]
pub struct ServerHeader {
    value: Option<HeaderValue>,
}

impl ServerHeader {
    pub fn new(value: Option<HeaderValue>) -> Self {
        Self { value }
    }

    pub fn from_options(options: &HttpOptions) -> Self {
        Self::new(options.server_header_value())
    }
}

#[async_trait]
impl Interceptor for ServerHeader {
    async fn on_response(&self, _req: &Request, resp: &mut Response<Bytes>) {
        match &self.value {
            Some(value) => {
                resp.headers_mut().insert(SERVER, value.clone());
            }
            None => {
                resp.headers_mut().remove(SERVER);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Request {
        Request::new(http::Request::new(Bytes::new()))
    }

    fn response_with_server(value: &'static str) -> Response<Bytes> {
        let mut response = Response::new(Bytes::new());
        response.headers_mut().insert(SERVER, HeaderValue::from_static(value));
        response
    }

    #[tokio::test]
    async fn overrides_handler_value() {
        let mut response = response_with_server("handler/1.0");

        ServerHeader::from_options(&HttpOptions::default()).on_response(&request(), &mut response).await;

        assert_eq!(response.headers()[SERVER], "service.io");
    }

    #[tokio::test]
    async fn removes_header_when_not_configured() {
        let options = HttpOptions { server_header: Some(String::new()), ..HttpOptions::default() };
        let mut response = response_with_server("handler/1.0");

        ServerHeader::from_options(&options).on_response(&request(), &mut response).await;

        assert!(response.headers().get(SERVER).is_none());
    }
}

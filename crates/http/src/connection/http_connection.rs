use std::error::Error;
use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::header::{CONNECTION, CONTENT_LENGTH};
use http::{HeaderValue, Method, Response, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, warn};

use crate::codec::{DEFAULT_MAX_BODY_SIZE, RequestDecoder, ResponseEncoder};
use crate::handler::Handler;
use crate::protocol::{HttpError, SendError, is_bodiless};

/// Read buffer capacity, large enough for a maximal header section
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// A single HTTP exchange on a connection.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_max_body_size(reader, writer, DEFAULT_MAX_BODY_SIZE)
    }

    pub fn with_max_body_size(reader: R, writer: W, max_body_size: u64) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(
                reader,
                RequestDecoder::with_max_body_size(max_body_size),
                READ_BUFFER_SIZE,
            ),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
        }
    }

    /// Serves one request and closes the connection.
    ///
    /// Returns `Ok(())` as well when the peer disconnects before sending anything.
    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
    {
        let request = match self.framed_read.next().await {
            Some(Ok(request)) => request,

            Some(Err(e)) => {
                warn!(cause = %e, "can't decode request");
                self.send_response(build_error_response(e.status_code()), false).await?;
                return Err(e.into());
            }

            None => {
                debug!("connection closed before a request arrived");
                return Ok(());
            }
        };

        let is_head = request.method() == Method::HEAD;

        let response = match handler.call(request).await {
            Ok(response) => response,
            Err(e) => {
                let cause: Box<dyn Error + Send + Sync> = e.into();
                error!(%cause, "handle request error");
                build_error_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };

        self.send_response(response, is_head).await
    }

    async fn send_response(&mut self, mut response: Response<Bytes>, is_head: bool) -> Result<(), HttpError> {
        response.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));

        if is_bodiless(response.status()) {
            *response.body_mut() = Bytes::new();
        } else if is_head {
            let length = response.body().len() as u64;
            response.headers_mut().entry(CONTENT_LENGTH).or_insert_with(|| HeaderValue::from(length));
            *response.body_mut() = Bytes::new();
        }

        self.framed_write.send(response).await?;
        self.framed_write.get_mut().shutdown().await.map_err(SendError::io)?;
        Ok(())
    }
}

fn build_error_response(status_code: StatusCode) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status_code;
    response
}

//! `Date` response header.
//!
//! Formatting an HTTP date on every response is wasteful, so the formatted value is cached and
//! re-rendered at most every 800ms.

use super::Interceptor;
use crate::request::Request;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::DATE;
use http::{HeaderValue, Response};
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::{Duration, Instant};

const UPDATE_INTERVAL: Duration = Duration::from_millis(800);

static DATE_SERVICE: Lazy<DateService> = Lazy::new(|| DateService::new(UPDATE_INTERVAL));

struct CachedDate {
    rendered_at: Instant,
    value: HeaderValue,
}

struct DateService {
    current: ArcSwap<CachedDate>,
    update_interval: Duration,
}

impl DateService {
    fn new(update_interval: Duration) -> Self {
        Self { current: ArcSwap::from_pointee(render()), update_interval }
    }

    fn http_date(&self) -> HeaderValue {
        let current = self.current.load();
        if current.rendered_at.elapsed() < self.update_interval {
            return current.value.clone();
        }

        let fresh = render();
        let value = fresh.value.clone();
        self.current.store(Arc::new(fresh));
        value
    }
}

fn render() -> CachedDate {
    let mut buf = faf_http_date::get_date_buff_no_key();
    faf_http_date::get_date_no_key(&mut buf);
    let value = HeaderValue::from_maybe_shared(Bytes::from_owner(buf))
        .unwrap_or_else(|_| HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT"));
    CachedDate { rendered_at: Instant::now(), value }
}

/// Adds a `Date` header to responses that don't carry one.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateHeader;

#[async_trait]
impl Interceptor for DateHeader {
    async fn on_response(&self, _req: &Request, resp: &mut Response<Bytes>) {
        if !resp.headers().contains_key(DATE) {
            resp.headers_mut().insert(DATE, DATE_SERVICE.http_date());
        }
    }
}

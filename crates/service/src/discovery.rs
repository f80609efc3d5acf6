//! Notifies service discovery collaborators of the endpoints a started service exposes.
//!
//! A collaborator implements [`Discovery`]; the ones that want HTTP endpoints also return an
//! [`HttpEndpointListener`] from [`Discovery::http_endpoints`]. Notification is best effort: a
//! collaborator that fails or panics is logged and skipped, the others still get notified.

use crate::error::DiscoveryError;
use crate::router::RouteEntry;
use async_trait::async_trait;
use futures::FutureExt;
use http::Method;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, trace, warn};

pub trait Discovery: Send + Sync {
    fn name(&self) -> &str;

    /// The HTTP endpoint capability of this collaborator, if it has one.
    fn http_endpoints(&self) -> Option<&dyn HttpEndpointListener> {
        None
    }
}

/// Receives one call per registered route. `pattern` is always anchored as `^...$`.
#[async_trait]
pub trait HttpEndpointListener: Send + Sync {
    async fn add_http_endpoint(&self, host: &str, port: u16, method: &Method, pattern: &str)
    -> Result<(), DiscoveryError>;
}

#[derive(Default)]
pub struct DiscoveryNotifier {
    collaborators: Vec<Arc<dyn Discovery>>,
}

impl DiscoveryNotifier {
    pub fn new(collaborators: Vec<Arc<dyn Discovery>>) -> Self {
        Self { collaborators }
    }

    pub fn is_empty(&self) -> bool {
        self.collaborators.is_empty()
    }

    /// Reports every route to every collaborator with the HTTP endpoint capability.
    ///
    /// Returns the number of notifications that succeeded.
    pub async fn notify(&self, host: &str, port: u16, routes: &[RouteEntry]) -> usize {
        let mut succeeded = 0;

        for route in routes {
            for discovery in self.collaborators.iter() {
                let Some(listener) = discovery.http_endpoints() else {
                    trace!(discovery = discovery.name(), "no http endpoint capability, skipped");
                    continue;
                };

                let method = route.method();
                let pattern = route.pattern().anchored();
                let notification = listener.add_http_endpoint(host, port, method, pattern);

                match AssertUnwindSafe(notification).catch_unwind().await {
                    Ok(Ok(())) => {
                        debug!(discovery = discovery.name(), %method, pattern, "http endpoint registered");
                        succeeded += 1;
                    }
                    Ok(Err(e)) => {
                        warn!(discovery = discovery.name(), %method, pattern, cause = %e, "failed to register http endpoint");
                    }
                    Err(panic) => {
                        warn!(
                            discovery = discovery.name(),
                            %method,
                            pattern,
                            cause = panic_message(panic.as_ref()),
                            "panicked while registering http endpoint"
                        );
                    }
                }
            }
        }

        succeeded
    }
}

impl std::fmt::Debug for DiscoveryNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.collaborators.iter().map(|discovery| discovery.name())).finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

//! The service context and its one-shot server startup.
//!
//! Routes, error handlers, interceptors and discovery collaborators are registered on a
//! [`ServiceContext`]; [`ServiceContext::start_server`] then freezes them, binds the listener
//! exactly once and serves every accepted connection on its own task.
//!
//! ```no_run
//! use nimbus::handler::sync_handler_fn;
//! use nimbus::{HandlerError, Options, PathParams, Request, ServiceContext};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = ServiceContext::new(Options::from_value(json!({"http": {"port": 8080}}))?)?;
//!     context.register_route(
//!         "GET",
//!         "/health",
//!         sync_handler_fn(|_req: Request, _params: PathParams| Ok::<_, HandlerError>("healthy")),
//!     )?;
//!
//!     context.start_server().await?;
//!     tokio::signal::ctrl_c().await?;
//!     Ok(())
//! }
//! ```

use crate::discovery::{Discovery, DiscoveryNotifier};
use crate::error::{ConfigurationError, StartupError};
use crate::handler::RequestHandler;
use crate::interceptor::{Interceptor, InterceptorsBuilder};
use crate::options::{Options, format_address};
use crate::pipeline::Pipeline;
use crate::router::{RouteRegistry, parse_method};
use nimbus_http::connection::HttpConnection;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Where a [`ServiceContext`] is in its startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Accepting registrations
    NotStarted,
    /// `start_server` is running, registrations are closed
    Starting,
    /// The listener is bound, the accept loop isn't running yet
    Bound,
    /// Serving requests
    Listening,
    /// The listener could not be bound; the context stays unusable
    BindFailed,
}

#[derive(Default)]
struct Registration {
    routes: RouteRegistry,
    interceptors: InterceptorsBuilder,
    discovery: Vec<Arc<dyn Discovery>>,
}

enum Lifecycle {
    Registering(Box<Registration>),
    Starting,
    Bound,
    Listening,
    BindFailed,
}

/// Everything one service process registers, and the server started from it.
pub struct ServiceContext {
    options: Options,
    lifecycle: Mutex<Lifecycle>,
    local_addr: OnceCell<SocketAddr>,
}

impl ServiceContext {
    pub fn new(options: Options) -> Result<Self, ConfigurationError> {
        options.validate()?;
        Ok(Self {
            options,
            lifecycle: Mutex::new(Lifecycle::Registering(Box::default())),
            local_addr: OnceCell::new(),
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Registers a route for `method` (any letter case) and the regular expression `pattern`.
    pub fn register_route<H: RequestHandler + 'static>(
        &self,
        method: &str,
        pattern: &str,
        handler: H,
    ) -> Result<(), ConfigurationError> {
        let method = parse_method(method)?;
        self.with_registration(|registration| {
            registration.routes.add(method, pattern, Arc::new(handler))?;
            Ok(())
        })
    }

    /// Registers the handler answering errors with `status`; the last registration wins.
    pub fn register_error_handler<H: RequestHandler + 'static>(
        &self,
        status: u16,
        handler: H,
    ) -> Result<(), ConfigurationError> {
        self.with_registration(|registration| {
            registration.routes.add_error_handler(status, Arc::new(handler))?;
            Ok(())
        })
    }

    pub fn add_interceptor<I: Interceptor + 'static>(&self, interceptor: I) -> Result<(), ConfigurationError> {
        self.with_registration(|registration| {
            registration.interceptors = std::mem::take(&mut registration.interceptors).add_last(interceptor);
            Ok(())
        })
    }

    pub fn add_discovery(&self, discovery: Arc<dyn Discovery>) -> Result<(), ConfigurationError> {
        self.with_registration(|registration| {
            registration.discovery.push(discovery);
            Ok(())
        })
    }

    fn with_registration<F>(&self, f: F) -> Result<(), ConfigurationError>
    where
        F: FnOnce(&mut Registration) -> Result<(), ConfigurationError>,
    {
        match &mut *self.lock_lifecycle() {
            Lifecycle::Registering(registration) => f(registration),
            _ => Err(ConfigurationError::RegistryFrozen),
        }
    }

    /// Binds the listener and starts serving; only the first call does anything.
    ///
    /// Later calls, including concurrent ones made while the first is still binding, return
    /// `Ok(())` right away.
    pub async fn start_server(&self) -> Result<(), StartupError> {
        let registration = {
            let mut lifecycle = self.lock_lifecycle();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Starting) {
                Lifecycle::Registering(registration) => registration,
                other => {
                    *lifecycle = other;
                    debug!("server already started");
                    return Ok(());
                }
            }
        };

        let Registration { routes, interceptors, discovery } = *registration;
        let http = &self.options.http;
        let pipeline = Arc::new(Pipeline::new(routes.build(), interceptors.build(), http));

        let tcp_listener = match TcpListener::bind(http.bind_address()).await.and_then(|listener| {
            let local_addr = listener.local_addr()?;
            Ok((listener, local_addr))
        }) {
            Ok(bound) => bound,
            Err(e) => {
                let address = format!("http://{}/", format_address(http.display_host(), http.port));
                error!("Unable to bind service [http] to {address} ({e})");
                self.set_lifecycle(Lifecycle::BindFailed);
                return Err(StartupError::Bind { address, source: e });
            }
        };
        let (tcp_listener, local_addr) = tcp_listener;

        if self.local_addr.set(local_addr).is_err() {
            warn!(%local_addr, "local address was already recorded");
        }
        self.set_lifecycle(Lifecycle::Bound);

        info!("Listening [http] on http://{}/", format_address(http.display_host(), local_addr.port()));
        tokio::spawn(accept_loop(tcp_listener, Arc::clone(&pipeline), http.max_body_size));
        self.set_lifecycle(Lifecycle::Listening);

        let notifier = DiscoveryNotifier::new(discovery);
        if !notifier.is_empty() {
            let notified = notifier.notify(&http.host, local_addr.port(), pipeline.router().routes()).await;
            debug!(notified, "discovery notified");
        }

        Ok(())
    }

    pub fn state(&self) -> ServerState {
        match &*self.lock_lifecycle() {
            Lifecycle::Registering(_) => ServerState::NotStarted,
            Lifecycle::Starting => ServerState::Starting,
            Lifecycle::Bound => ServerState::Bound,
            Lifecycle::Listening => ServerState::Listening,
            Lifecycle::BindFailed => ServerState::BindFailed,
        }
    }

    /// Whether `start_server` has been called.
    pub fn is_started(&self) -> bool {
        self.state() != ServerState::NotStarted
    }

    /// The address the listener is bound to, once it is.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// The bound port, resolved from the socket when port `0` was configured.
    pub fn bound_port(&self) -> Option<u16> {
        self.local_addr().map(|addr| addr.port())
    }

    fn set_lifecycle(&self, lifecycle: Lifecycle) {
        *self.lock_lifecycle() = lifecycle;
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        // registration closures never panic half-way through a state change
        self.lifecycle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("options", &self.options)
            .field("state", &self.state())
            .field("local_addr", &self.local_addr())
            .finish()
    }
}

async fn accept_loop(tcp_listener: TcpListener, pipeline: Arc<Pipeline>, max_body_size: u64) {
    loop {
        let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
            Ok(stream_and_addr) => stream_and_addr,
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                continue;
            }
        };

        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            let (reader, writer) = tcp_stream.into_split();
            let connection = HttpConnection::with_max_body_size(reader, writer, max_body_size);
            match connection.process(pipeline).await {
                Ok(()) => {
                    debug!(%remote_addr, "finished process, connection shutdown");
                }
                Err(e) => {
                    warn!(%remote_addr, cause = %e, "connection closed with error");
                }
            }
        });
    }
}

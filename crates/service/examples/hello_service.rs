use async_trait::async_trait;
use http::{Method, StatusCode};
use nimbus::discovery::{Discovery, HttpEndpointListener};
use nimbus::handler::{error_handler_fn, handler_fn, sync_handler_fn};
use nimbus::interceptor::DateHeader;
use nimbus::{DiscoveryError, HandlerError, Options, PathParams, Request, ServiceContext};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Deserialize, Debug)]
struct Greeting {
    name: String,
}

// curl -v http://127.0.0.1:8080/hello/world
async fn hello(_req: Request, params: PathParams) -> Result<String, HandlerError> {
    Ok(format!("hello {}\r\n", params.get("name").unwrap_or("stranger")))
}

// curl -v -H 'Content-Type: application/json' -d '{"name":"nimbus"}' http://127.0.0.1:8080/greetings
async fn greet(req: Request, _params: PathParams) -> Result<(StatusCode, String), HandlerError> {
    let greeting: Greeting = serde_json::from_slice(req.body())
        .map_err(|e| HandlerError::with_message(StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok((StatusCode::CREATED, format!("greeted {}\r\n", greeting.name)))
}

// curl -v http://127.0.0.1:8080/teapot
async fn teapot(_req: Request, _params: PathParams) -> Result<(), HandlerError> {
    Err(HandlerError::status(StatusCode::IM_A_TEAPOT))
}

async fn not_found(req: Request) -> Result<String, HandlerError> {
    Ok(format!("nothing lives at {}\r\n", req.path()))
}

struct LoggingDiscovery;

impl Discovery for LoggingDiscovery {
    fn name(&self) -> &str {
        "logging"
    }

    fn http_endpoints(&self) -> Option<&dyn HttpEndpointListener> {
        Some(self)
    }
}

#[async_trait]
impl HttpEndpointListener for LoggingDiscovery {
    async fn add_http_endpoint(&self, host: &str, port: u16, method: &Method, pattern: &str) -> Result<(), DiscoveryError> {
        info!("endpoint {method} http://{host}:{port} {pattern}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = Options::from_value(json!({
        "http": { "host": "127.0.0.1", "port": 8080, "server_header": "hello-service/0.1" }
    }))?;
    nimbus::logging::init_from_options(&options)?;

    let context = ServiceContext::new(options)?;
    context.register_route("GET", r"^/hello/(?P<name>[^/]+)$", handler_fn(hello))?;
    context.register_route("post", "/greetings", handler_fn(greet))?;
    context.register_route("GET", "/teapot", handler_fn(teapot))?;
    context.register_route(
        "GET",
        "/health",
        sync_handler_fn(|_req: Request, _params: PathParams| Ok::<_, HandlerError>("ok\r\n")),
    )?;
    context.register_error_handler(404, error_handler_fn(not_found))?;
    context.add_interceptor(DateHeader)?;
    context.add_discovery(Arc::new(LoggingDiscovery))?;

    context.start_server().await?;

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}

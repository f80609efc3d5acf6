//! Resolved service options.
//!
//! The service layer doesn't read configuration files; it receives an already resolved mapping
//! and deserializes the parts it uses. Missing keys take their defaults:
//!
//! ```
//! use nimbus::Options;
//! use serde_json::json;
//!
//! let options = Options::from_value(json!({ "http": { "port": 8080, "server_header": null } })).unwrap();
//! assert_eq!(options.http.host, "0.0.0.0");
//! assert_eq!(options.http.port, 8080);
//! assert_eq!(options.http.server_header, None);
//! ```

use crate::error::ConfigurationError;
use http::HeaderValue;
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_SERVER_HEADER: &str = "service.io";
pub const DEFAULT_MAX_BODY_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Options {
    pub http: HttpOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpOptions {
    /// Interface to listen on
    pub host: String,
    /// Port to listen on, `0` picks an ephemeral port
    pub port: u16,
    /// Value of the `Server` response header, `None` or empty omits the header
    pub server_header: Option<String>,
    /// Show internal error details in 500 responses
    pub debug: bool,
    /// Largest request body accepted, in bytes
    pub max_body_size: u64,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: 0,
            server_header: Some(DEFAULT_SERVER_HEADER.to_string()),
            debug: false,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl Options {
    pub fn from_value(value: Value) -> Result<Self, ConfigurationError> {
        let options: Self = serde_json::from_value(value).map_err(ConfigurationError::invalid_options)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let options: Self = serde_json::from_str(json).map_err(ConfigurationError::invalid_options)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.http.validate()
    }
}

impl HttpOptions {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.host.trim().is_empty() {
            return Err(ConfigurationError::invalid_options("http.host must not be empty"));
        }

        if self.max_body_size == 0 {
            return Err(ConfigurationError::invalid_options("http.max_body_size must be positive"));
        }

        if let Some(server_header) = &self.server_header {
            HeaderValue::from_str(server_header).map_err(|e| {
                ConfigurationError::invalid_options(format!("http.server_header '{server_header}': {e}"))
            })?;
        }

        Ok(())
    }

    /// The `Server` header value to send, if any.
    pub fn server_header_value(&self) -> Option<HeaderValue> {
        self.server_header.as_deref().filter(|value| !value.is_empty()).and_then(|value| HeaderValue::from_str(value).ok())
    }

    /// `host:port` as passed to the listener, with IPv6 hosts in brackets.
    pub fn bind_address(&self) -> String {
        format_address(&self.host, self.port)
    }

    /// The host as shown in log lines: the wildcard address is shown as loopback.
    pub fn display_host(&self) -> &str {
        if self.host == DEFAULT_HOST { "127.0.0.1" } else { &self.host }
    }
}

pub(crate) fn format_address(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') { format!("[{host}]:{port}") } else { format!("{host}:{port}") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_from_empty_mapping() {
        let options = Options::from_value(json!({})).unwrap();

        assert_eq!(options, Options::default());
        assert_eq!(options.http.host, "0.0.0.0");
        assert_eq!(options.http.port, 0);
        assert_eq!(options.http.server_header.as_deref(), Some("service.io"));
        assert!(!options.http.debug);
        assert_eq!(options.http.max_body_size, 1024 * 1024);
    }

    #[test]
    fn partial_mapping_keeps_other_defaults() {
        let options = Options::from_json_str(r#"{"http": {"host": "127.0.0.1", "debug": true}, "amqp": {}}"#).unwrap();

        assert_eq!(options.http.host, "127.0.0.1");
        assert!(options.http.debug);
        assert_eq!(options.http.port, 0);
    }

    #[test]
    fn server_header_can_be_omitted() {
        let null_header = Options::from_value(json!({"http": {"server_header": null}})).unwrap();
        let empty_header = Options::from_value(json!({"http": {"server_header": ""}})).unwrap();

        assert!(null_header.http.server_header_value().is_none());
        assert!(empty_header.http.server_header_value().is_none());
        assert_eq!(Options::default().http.server_header_value().unwrap(), "service.io");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Options::from_value(json!({"http": {"port": "eighty"}})),
            Err(ConfigurationError::InvalidOptions { .. })
        ));
        assert!(matches!(
            Options::from_value(json!({"http": {"port": 70000}})),
            Err(ConfigurationError::InvalidOptions { .. })
        ));
        assert!(matches!(
            Options::from_value(json!({"http": {"host": ""}})),
            Err(ConfigurationError::InvalidOptions { .. })
        ));
        assert!(matches!(
            Options::from_value(json!({"http": {"server_header": "bad\nvalue"}})),
            Err(ConfigurationError::InvalidOptions { .. })
        ));
    }

    #[test]
    fn addresses() {
        let mut http = HttpOptions { port: 8080, ..HttpOptions::default() };
        assert_eq!(http.bind_address(), "0.0.0.0:8080");
        assert_eq!(http.display_host(), "127.0.0.1");

        http.host = "::1".to_string();
        assert_eq!(http.bind_address(), "[::1]:8080");
        assert_eq!(http.display_host(), "::1");
    }
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listening socket settings.
    pub server: ServerConfig,

    /// The single upstream platform API and WebSocket traffic goes to.
    pub upstream: UpstreamConfig,

    /// Static web bundle settings.
    pub web: WebConfig,

    /// Forwarding rules, evaluated in order.
    pub proxy: ProxyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl GatewayConfig {
    /// `address:port` string for the listening socket.
    pub fn bind_address(&self) -> String {
        join_host_port(&self.server.address, self.server.port)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0").
    pub address: String,

    /// Bind port.
    pub port: u16,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// Grace period for force-closed connections to report closure.
    /// Zero waits without bound.
    pub drain_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8080,
            max_connections: 10_000,
            drain_timeout_secs: 5,
        }
    }
}

/// Upstream target configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Forward API and WebSocket traffic. When false no rule is installed.
    pub enable_proxy: bool,

    /// Upstream host name or IP.
    pub host: String,

    /// Upstream port.
    pub port: u16,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl UpstreamConfig {
    /// `host:port` authority of the upstream.
    pub fn authority(&self) -> String {
        join_host_port(&self.host, self.port)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            enable_proxy: false,
            host: "localhost".to_string(),
            port: 8080,
            connect_timeout_secs: 10,
        }
    }
}

/// Static bundle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebConfig {
    /// Directory holding the compiled single-page application.
    pub folder: PathBuf,

    /// Entry document served by the history fallback.
    pub index_document: String,

    /// Path regexes that never receive the fallback document.
    pub fallback_exclusions: Vec<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("web/public"),
            index_document: "index.html".to_string(),
            fallback_exclusions: vec![
                r"^/resources/scada-symbols/(?:system|tenant)/[^/]+$".to_string(),
            ],
        }
    }
}

/// Forwarding rule list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub rules: Vec<ProxyRuleConfig>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                ProxyRuleConfig::prefix("/api/", ForwardMode::Http),
                ProxyRuleConfig::prefix("/static/rulenode/", ForwardMode::Http),
                ProxyRuleConfig::prefix("/", ForwardMode::Websocket),
            ],
        }
    }
}

/// A single forwarding rule. Exactly one of `prefix` or `pattern` is set.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProxyRuleConfig {
    /// Literal path prefix.
    #[serde(default)]
    pub prefix: Option<String>,

    /// Regex tested against the request path.
    #[serde(default)]
    pub pattern: Option<String>,

    /// How matching requests are forwarded.
    #[serde(default)]
    pub mode: ForwardMode,
}

impl ProxyRuleConfig {
    pub fn prefix(prefix: impl Into<String>, mode: ForwardMode) -> Self {
        Self {
            prefix: Some(prefix.into()),
            pattern: None,
            mode,
        }
    }

    pub fn pattern(pattern: impl Into<String>, mode: ForwardMode) -> Self {
        Self {
            prefix: None,
            pattern: Some(pattern.into()),
            mode,
        }
    }
}

/// Forwarding mode of a rule.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ForwardMode {
    /// Plain request/response forwarding.
    #[default]
    Http,
    /// Connection-level relay after an upgrade handshake.
    Websocket,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

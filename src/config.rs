//! Design Decision: JSON-based configuration with environment variable substitution
//!
//! Rationale: JSON configuration is the format MCP hosts already ship
//! (Claude Desktop's server config is JSON), and `${VAR_NAME}` substitution
//! keeps secrets such as bearer tokens and spawned-server environment
//! variables out of the config file itself while staying in the same
//! familiar format.
//!
//! Trade-offs:
//! - JSON over TOML: matches the MCP ecosystem's existing configs rather
//!   than introducing a second format for this crate alone
//! - Substitution at load time, not at use time: a config value is either
//!   fully resolved or visibly still a placeholder, never half-resolved
//!   deep in a transport
//! - Unset variable left untouched rather than erroring: a bad command or
//!   URL downstream is a louder, more locatable failure than a silent
//!   empty-string substitution would be
//!
//! Alternatives Considered:
//! 1. TOML configuration: rejected - breaks compatibility with existing
//!    MCP host configs
//! 2. Fail to load on an unresolved `${VAR_NAME}`: rejected - some fields
//!    (e.g. optional headers) are fine left as literal text if unset

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::wire::ClientCapabilities;

/// Replaces every `${VAR_NAME}` occurrence in `value` with the named
/// environment variable's value. A reference to a variable that isn't set
/// is left untouched, so a misconfigured secret fails loudly downstream
/// (a bad command/URL) rather than silently as an empty string.
pub fn resolve_env_var(value: &str) -> String {
    let mut resolved = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            resolved.push_str(rest);
            return resolved;
        };
        let end = start + end;
        resolved.push_str(&rest[..start]);
        let var_name = &rest[start + 2..end];
        match std::env::var(var_name) {
            Ok(value) => resolved.push_str(&value),
            Err(_) => {
                resolved.push_str("${");
                resolved.push_str(var_name);
                resolved.push('}');
            }
        }
        rest = &rest[end + 1..];
    }
    resolved.push_str(rest);
    resolved
}

fn resolve_env_map(map: HashMap<String, String>) -> HashMap<String, String> {
    map.into_iter().map(|(key, value)| (key, resolve_env_var(&value))).collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct HandshakeRetryConfig {
    #[serde(rename = "maxAttempts", default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay", with = "duration_secs")]
    pub delay: Duration,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(2)
}

impl Default for HandshakeRetryConfig {
    fn default() -> Self {
        Self { max_attempts: default_max_attempts(), delay: default_retry_delay() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub capabilities: ClientCapabilities,
    #[serde(rename = "handshakeRetry", default)]
    pub handshake_retry: HandshakeRetryConfig,
}

/// The JSON-deserializable subset of [`crate::transport::sse::SseTransportConfig`].
/// The token source is a trait object and has no JSON representation; the
/// host wires one in after loading this.
#[derive(Debug, Clone, Deserialize)]
pub struct SseTransportConfigJson {
    #[serde(rename = "serverUrl")]
    pub server_url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,
    #[serde(rename = "sseReadTimeout", default = "default_sse_read_timeout", with = "duration_secs")]
    pub sse_read_timeout: Duration,
    #[serde(rename = "maxConcurrentRequests", default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(rename = "terminateOnClose", default = "default_true")]
    pub terminate_on_close: bool,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_sse_read_timeout() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_max_concurrent_requests() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl SseTransportConfigJson {
    /// Resolves `${VAR_NAME}` references in header values before handing
    /// the config to the transport.
    pub fn resolve_secrets(mut self) -> Self {
        self.headers = resolve_env_map(self.headers);
        self
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(seconds.max(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_set_environment_variable() {
        std::env::set_var("MCP_CLIENT_CORE_TEST_VAR", "secret-value");
        assert_eq!(resolve_env_var("Bearer ${MCP_CLIENT_CORE_TEST_VAR}"), "Bearer secret-value");
        std::env::remove_var("MCP_CLIENT_CORE_TEST_VAR");
    }

    #[test]
    fn leaves_unset_variable_reference_untouched() {
        assert_eq!(resolve_env_var("Bearer ${MCP_CLIENT_CORE_DEFINITELY_UNSET}"), "Bearer ${MCP_CLIENT_CORE_DEFINITELY_UNSET}");
    }

    #[test]
    fn deserializes_sse_config_with_defaults() {
        let json = serde_json::json!({"serverUrl": "https://example.com/mcp"});
        let config: SseTransportConfigJson = serde_json::from_value(json).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.sse_read_timeout, Duration::from_secs(300));
        assert_eq!(config.max_concurrent_requests, 10);
        assert!(config.terminate_on_close);
    }

    #[test]
    fn loads_stdio_config_from_a_json_file() {
        use crate::transport::stdio::StdioTransportConfig;
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"command": "mcp-server", "arguments": ["--stdio"]}}"#).unwrap();
        let contents = std::fs::read_to_string(file.path()).unwrap();
        let config: StdioTransportConfig = serde_json::from_str(&contents).unwrap();
        assert_eq!(config.command, "mcp-server");
        assert_eq!(config.arguments, vec!["--stdio".to_string()]);
        assert!(config.environment.is_empty());
    }

    #[test]
    fn deserializes_client_config() {
        let json = serde_json::json!({
            "name": "my-host",
            "version": "0.1.0",
            "capabilities": {"roots": {"listChanged": true}, "sampling": {}},
            "handshakeRetry": {"maxAttempts": 5, "delay": 1.5}
        });
        let config: ClientConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.name, "my-host");
        assert!(config.capabilities.roots && config.capabilities.roots_list_changed);
        assert!(config.capabilities.sampling);
        assert_eq!(config.handshake_retry.max_attempts, 5);
        assert_eq!(config.handshake_retry.delay, Duration::from_millis(1500));
    }
}

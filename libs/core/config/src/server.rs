use crate::{env_or_default, env_parse, ConfigError};
use std::net::Ipv4Addr;

/// Bind address for an HTTP listener (health server, gateway API)
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Load from `HOST` and the given port variable.
    ///
    /// Each service owns its port variable (`HEALTH_PORT`, `GATEWAY_PORT`) so
    /// several services can share one environment file.
    pub fn from_env_with_port(port_key: &str, default_port: u16) -> Result<Self, ConfigError> {
        let host = env_or_default("HOST", &Ipv4Addr::UNSPECIFIED.to_string());
        let port = env_parse(port_key, default_port)?;
        Ok(Self { host, port })
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

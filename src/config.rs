use std::net::SocketAddr;

/// Settings for a scheduler server process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP API binds to.
    pub listen_addr: SocketAddr,
    /// Default tracing filter, used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_default() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.listen_addr.to_string(), "127.0.0.1:8000");
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn server_config_new() {
        let addr: SocketAddr = "0.0.0.0:9000".parse().unwrap();
        let cfg = ServerConfig::new(addr).with_log_level("debug");
        assert_eq!(cfg.listen_addr, addr);
        assert_eq!(cfg.log_level, "debug");
    }
}

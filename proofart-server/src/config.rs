//! Server configuration module
//!
//! Loads configuration from environment variables with sensible defaults.
//! Capability settings (generation, content store, ledger) are read through
//! the loaders in `proofart-core` so the CLI and server agree on variable names.

use std::net::SocketAddr;

use proofart_core::{GenerationConfig, LedgerConfig, PipelineConfig, StoreConfig};

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 25)
    pub body_limit_mb: usize,
    /// Request timeout in seconds (default: 300, a generation round-trip is slow)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 5)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 10)
    pub rate_limit_burst: u32,
    /// Use in-memory capabilities instead of real services
    /// (default: false from env, true in `Default` for tests)
    pub allow_mock_backends: bool,
    pub generation: GenerationConfig,
    pub store: StoreConfig,
    pub ledger: LedgerConfig,
    pub pipeline: PipelineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: [127, 0, 0, 1],
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_mb: 25,
            timeout_secs: 300,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 5,
            rate_limit_burst: 10,
            allow_mock_backends: true,
            generation: GenerationConfig::default(),
            store: StoreConfig::default(),
            ledger: LedgerConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or([127, 0, 0, 1]);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|origins| parse_origins(&origins));

        let body_limit_mb = std::env::var("BODY_LIMIT_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(25);

        let timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        let rate_limit_per_sec = std::env::var("RATE_LIMIT_PER_SEC")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        let rate_limit_burst = std::env::var("RATE_LIMIT_BURST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let allow_mock_backends = std::env::var("ALLOW_MOCK_BACKENDS")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        Self {
            port,
            host,
            allowed_origins,
            body_limit_mb,
            timeout_secs,
            rate_limit_enabled,
            rate_limit_per_sec,
            rate_limit_burst,
            allow_mock_backends,
            generation: GenerationConfig::from_env(),
            store: StoreConfig::from_env(),
            ledger: LedgerConfig::from_env(),
            pipeline: PipelineConfig::from_env(),
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert!(config.allow_mock_backends);
        assert!(!config.rate_limit_enabled);
        assert!(!config.generation.has_credentials());
    }

    #[test]
    fn test_socket_addr() {
        let config = Config {
            port: 8080,
            host: [0, 0, 0, 0],
            ..Config::default()
        };
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_parse_origins_skips_blanks() {
        assert_eq!(
            parse_origins("https://a.example, ,https://b.example,"),
            vec!["https://a.example", "https://b.example"]
        );
    }
}

//! Application configuration loaded from environment variables.

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `SHOP_URL` — public shop base URL used in token metadata links
///   (default: `"https://shop.example"`)
/// - `MAX_DISPATCH_IN_FLIGHT` — concurrent provider submissions
///   (default: `8`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub shop_url: String,
    pub max_dispatch_in_flight: usize,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            shop_url: std::env::var("SHOP_URL")
                .unwrap_or_else(|_| "https://shop.example".to_string()),
            max_dispatch_in_flight: std::env::var("MAX_DISPATCH_IN_FLIGHT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            shop_url: "https://shop.example".to_string(),
            max_dispatch_in_flight: 8,
        }
    }
}

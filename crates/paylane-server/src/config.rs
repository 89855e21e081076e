use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Currency reported by balance statements and used when a request
    /// omits one.
    pub default_currency: String,
    pub max_body_bytes: usize,
    /// Cache-control lifetime for catalog list responses.
    pub discovery_ttl: Duration,
    /// Requests slower than this are logged at warn level.
    pub slow_request_threshold: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            default_currency: "USD".to_string(),
            max_body_bytes: 64 * 1024,
            discovery_ttl: Duration::from_secs(30),
            slow_request_threshold: Duration::from_millis(200),
        }
    }
}

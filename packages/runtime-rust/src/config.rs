//! Runtime configuration for option resolution.

use std::time::Duration;

/// Settings shared by every resolver and option source.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Quiet period before a remote search is issued.
    pub debounce: Duration,
    /// Maximum time to wait for a remote option request.
    pub request_timeout: Duration,
    /// `User-Agent` sent with remote option requests.
    pub user_agent: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            request_timeout: Duration::from_secs(15),
            user_agent: concat!("formwork/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.debounce, Duration::from_millis(500));
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert!(config.user_agent.starts_with("formwork/"));
    }
}

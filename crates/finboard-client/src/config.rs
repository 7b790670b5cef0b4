//! Client configuration.

use finboard_core::{FinanceError, Result};
use std::time::Duration;

/// Environment variable holding the API base URL.
pub const ENV_API_URL: &str = "FINBOARD_API_URL";

/// Environment variable holding the request timeout in seconds.
pub const ENV_API_TIMEOUT_SECS: &str = "FINBOARD_API_TIMEOUT_SECS";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default user agent for HTTP requests.
const DEFAULT_USER_AGENT: &str = concat!("finboard/", env!("CARGO_PKG_VERSION"));

/// Settings for [`HttpFinanceClient`](crate::HttpFinanceClient).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Scheme, host and optional port of the API, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for the given base URL with default settings.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::default().with_base_url(base_url)
    }

    /// Sets the base URL. A trailing slash is removed.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Reads the configuration from `FINBOARD_API_URL` and
    /// `FINBOARD_API_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through a variable lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup(ENV_API_URL)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| FinanceError::InvalidParameter(format!("{ENV_API_URL} not set")))?;

        let mut config = Self::new(base_url.trim());
        if let Some(secs) = lookup(ENV_API_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                FinanceError::InvalidParameter(format!(
                    "{ENV_API_TIMEOUT_SECS} must be a whole number of seconds, got {secs:?}"
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

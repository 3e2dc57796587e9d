use crate::error::{Result, StratumError};
use reqwest::blocking::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Timeout applied when the configuration leaves it unset or zero
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Largest accepted request timeout (one year)
pub const MAX_TIMEOUT_SECS: u64 = 365 * 24 * 60 * 60;

/// Library identification sent in every User-Agent header
pub const LIBRARY_AGENT: &str = concat!("StratumClient/", env!("CARGO_PKG_VERSION"));

/// Create the HTTP client used for every request of a session
pub fn create_http_client(config: &Config) -> Result<Client> {
    if let Some(secs) = config.timeout {
        if secs > MAX_TIMEOUT_SECS {
            return Err(StratumError::Config(format!(
                "timeout {}s exceeds maximum of {}s",
                secs, MAX_TIMEOUT_SECS
            )));
        }
    }

    ClientBuilder::new()
        .timeout(config.timeout())
        .danger_accept_invalid_certs(config.insecure_skip_verify)
        .build()
        .map_err(|e| StratumError::Config(format!("failed to create HTTP client: {}", e)))
}

/// Configuration for the Stratum client
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Login name used for Basic authentication
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// API endpoint including the resource prefix, e.g. `https://server/stratum/v1`
    #[serde(default)]
    pub base_url: String,
    /// Tag appended to the User-Agent header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Request timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .finish()
    }
}

impl Config {
    /// Create a new configuration with the given credentials and base URL
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Config {
            username: username.into(),
            password: password.into(),
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the User-Agent tag
    pub fn with_user_agent(mut self, tag: impl Into<String>) -> Self {
        self.user_agent = Some(tag.into());
        self
    }

    /// Set the request timeout in seconds
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    /// Skip TLS certificate verification
    pub fn with_insecure_skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }

    /// Load a configuration from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from `STRATUM_*` environment variables.
    ///
    /// `STRATUM_BASE_URL` wins over `STRATUM_HOST`; a bare host expands to
    /// `https://<host>/stratum/v1`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = match lookup("STRATUM_BASE_URL") {
            Some(url) => url,
            None => lookup("STRATUM_HOST")
                .map(|host| format!("https://{}/stratum/v1", host))
                .unwrap_or_default(),
        };

        let timeout = match lookup("STRATUM_TIMEOUT") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                StratumError::Config(format!("STRATUM_TIMEOUT {:?}: {}", raw, e))
            })?),
            None => None,
        };

        let insecure_skip_verify = lookup("STRATUM_INSECURE_SKIP_VERIFY")
            .map(|raw| matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Config {
            username: lookup("STRATUM_USERNAME").unwrap_or_default(),
            password: lookup("STRATUM_PASSWORD").unwrap_or_default(),
            base_url,
            user_agent: lookup("STRATUM_USER_AGENT"),
            timeout,
            insecure_skip_verify,
        })
    }

    /// Effective request timeout
    pub fn timeout(&self) -> Duration {
        match self.timeout {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Value of the User-Agent header
    pub fn user_agent_header(&self) -> String {
        match self.user_agent.as_deref() {
            Some(tag) if !tag.is_empty() => format!("{} ({})", LIBRARY_AGENT, tag),
            _ => LIBRARY_AGENT.to_string(),
        }
    }
}

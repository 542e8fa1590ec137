//! Configuration types for the directory client.

use crate::errors::{DirectoryError, DirectoryResult};
use std::time::Duration;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Retry configuration for the transport.
///
/// Replaces the legacy module-level retry globals: every `Connection` gets
/// its own copy, there is no process-wide mutable state.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum attempts per call (1-based; 1 means no retry).
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub first_delay: Duration,
    /// Maximum random delay (whole seconds) added to each computed backoff.
    pub jitter_max: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            first_delay: Duration::from_secs(15),
            jitter_max: 5,
        }
    }
}

/// Client-side throttling limits. Each knob is independently adjustable.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Maximum actions packed into one physical call.
    pub max_actions_per_call: usize,
    /// Maximum commands per action before it is split into chunks.
    pub max_commands_per_action: usize,
    /// Maximum entries in one group-membership list before the command is
    /// cloned into multiple slices.
    pub max_group_members: usize,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_actions_per_call: 10,
            max_commands_per_action: 10,
            max_group_members: 10,
        }
    }
}

/// Directory connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Service root endpoint (e.g. `https://directory.example.com/v2/usermanagement`).
    pub endpoint: String,
    /// Organization ID all calls are scoped to.
    pub org_id: String,
    /// Whether to pass the server-side `testOnly` flag on write calls.
    pub test_mode: bool,
    /// Optional User-Agent prefix, prepended to the library's own token.
    pub user_agent: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Retry configuration.
    pub retry: RetryConfig,
    /// Throttling configuration.
    pub throttle: ThrottleConfig,
}

impl ConnectionConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }

    /// Full User-Agent header value: caller prefix plus the library token.
    pub fn user_agent_string(&self) -> String {
        let library = format!("directory-client/{}", env!("CARGO_PKG_VERSION"));
        match &self.user_agent {
            Some(prefix) => format!("{} {}", prefix, library),
            None => library,
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.endpoint.is_empty() {
            return Err(DirectoryError::argument("endpoint cannot be empty"));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(DirectoryError::argument(
                "endpoint must start with http:// or https://",
            ));
        }
        if self.org_id.is_empty() {
            return Err(DirectoryError::argument("org_id cannot be empty"));
        }
        if self.retry.max_attempts == 0 {
            return Err(DirectoryError::argument("retry.max_attempts must be at least 1"));
        }
        if self.throttle.max_actions_per_call == 0
            || self.throttle.max_commands_per_action == 0
            || self.throttle.max_group_members == 0
        {
            return Err(DirectoryError::argument("throttle limits must be at least 1"));
        }
        Ok(())
    }
}

/// Builder for [`ConnectionConfig`].
#[derive(Debug, Default)]
pub struct ConnectionConfigBuilder {
    endpoint: Option<String>,
    org_id: Option<String>,
    test_mode: bool,
    user_agent: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    retry: Option<RetryConfig>,
    throttle: Option<ThrottleConfig>,
}

impl ConnectionConfigBuilder {
    /// Sets the service root endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the organization ID.
    pub fn org_id(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    /// Enables server-side test mode on write calls.
    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    /// Sets a User-Agent prefix.
    pub fn user_agent(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent = Some(prefix.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the retry configuration.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Sets the throttling configuration.
    pub fn throttle(mut self, throttle: ThrottleConfig) -> Self {
        self.throttle = Some(throttle);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> DirectoryResult<ConnectionConfig> {
        let config = ConnectionConfig {
            endpoint: self
                .endpoint
                .ok_or_else(|| DirectoryError::argument("endpoint is required"))?,
            org_id: self
                .org_id
                .ok_or_else(|| DirectoryError::argument("org_id is required"))?,
            test_mode: self.test_mode,
            user_agent: self.user_agent,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            retry: self.retry.unwrap_or_default(),
            throttle: self.throttle.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}

//! Credential handling for the directory client.
//!
//! The token-acquisition protocol (signing a token and exchanging it for a
//! bearer credential) lives outside this crate. The transport only needs a
//! [`CredentialProvider`]: something that can produce an `Authorization`
//! header value and knows when it has expired.

use crate::errors::{DirectoryError, DirectoryResult};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

/// Capability the transport requires of its credential source.
///
/// `authorization` is consulted before every outgoing request; when
/// `is_expired` reports true the transport calls `refresh` first.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Produces the current `Authorization` header value.
    async fn authorization(&self) -> DirectoryResult<String>;

    /// Whether the credential needs a refresh before use.
    async fn is_expired(&self) -> bool {
        false
    }

    /// Refreshes the credential. Providers with non-expiring credentials
    /// can leave the default no-op.
    async fn refresh(&self) -> DirectoryResult<()> {
        Ok(())
    }
}

/// Fixed bearer-token provider.
pub struct StaticCredentialProvider {
    token: SecretString,
}

impl StaticCredentialProvider {
    /// Creates a provider around a fixed bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::new(token.into()),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn authorization(&self) -> DirectoryResult<String> {
        Ok(format!("Bearer {}", self.token.expose_secret()))
    }
}

/// Provider that reads a bearer token from an environment variable on each
/// request, so a rotated token is picked up without a restart.
pub struct EnvCredentialProvider {
    token_var: String,
}

impl EnvCredentialProvider {
    /// Creates a provider reading the named environment variable.
    pub fn new(var_name: impl Into<String>) -> Self {
        Self {
            token_var: var_name.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn authorization(&self) -> DirectoryResult<String> {
        std::env::var(&self.token_var)
            .map(|token| format!("Bearer {}", token))
            .map_err(|_| {
                DirectoryError::argument(format!(
                    "environment variable {} not set",
                    self.token_var
                ))
            })
    }

    async fn is_expired(&self) -> bool {
        std::env::var(&self.token_var).is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_header() {
        let provider = StaticCredentialProvider::new("tok-123");
        assert_eq!(provider.authorization().await.unwrap(), "Bearer tok-123");
        assert!(!provider.is_expired().await);
    }

    #[tokio::test]
    async fn env_provider_missing_var() {
        let provider = EnvCredentialProvider::new("DIRECTORY_CLIENT_TEST_UNSET_VAR");
        assert!(provider.is_expired().await);
        assert!(matches!(
            provider.authorization().await,
            Err(DirectoryError::Argument(_))
        ));
    }
}

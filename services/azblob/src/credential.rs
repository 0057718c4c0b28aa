use std::fmt::{self, Debug, Formatter};

use stowage_core::utils::Redact;

/// How the service authenticates against the storage account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthStrategy {
    /// Sign requests with the storage account key.
    ///
    /// The key is listed through the management plane (or provided
    /// directly). Required for SAS generation.
    #[default]
    SharedKey,
    /// Sign requests with a bearer token obtained from a login.
    ///
    /// The account key is never held under this strategy, so SAS
    /// generation is unavailable.
    Token,
}

impl fmt::Display for AuthStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AuthStrategy::SharedKey => write!(f, "shared-key"),
            AuthStrategy::Token => write!(f, "token"),
        }
    }
}

/// Credential that holds the secret matching the resolved auth strategy.
#[derive(Clone)]
pub enum Credential {
    /// Account name plus base64 encoded account key.
    SharedKey {
        /// Storage account name.
        account_name: String,
        /// Base64 encoded account key.
        account_key: String,
    },
    /// OAuth bearer token.
    Token {
        /// The access token.
        token: String,
    },
}

impl Credential {
    /// Build a shared-key credential.
    pub fn with_shared_key(account_name: &str, account_key: &str) -> Self {
        Self::SharedKey {
            account_name: account_name.to_string(),
            account_key: account_key.to_string(),
        }
    }

    /// Build a bearer-token credential.
    pub fn with_token(token: &str) -> Self {
        Self::Token {
            token: token.to_string(),
        }
    }

    /// Whether the credential carries a usable secret.
    pub fn is_valid(&self) -> bool {
        match self {
            Credential::SharedKey {
                account_name,
                account_key,
            } => !account_name.is_empty() && !account_key.is_empty(),
            Credential::Token { token } => !token.is_empty(),
        }
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Credential::SharedKey {
                account_name,
                account_key,
            } => f
                .debug_struct("Credential::SharedKey")
                .field("account_name", account_name)
                .field("account_key", &Redact::from(account_key))
                .finish(),
            Credential::Token { token } => f
                .debug_struct("Credential::Token")
                .field("token", &Redact::from(token))
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid() {
        assert!(Credential::with_shared_key("acct", "a2V5").is_valid());
        assert!(!Credential::with_shared_key("acct", "").is_valid());
        assert!(!Credential::with_shared_key("", "a2V5").is_valid());
        assert!(Credential::with_token("tok").is_valid());
        assert!(!Credential::with_token("").is_valid());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let cred = Credential::with_shared_key("acct", "supersecretaccountkey");
        let out = format!("{cred:?}");
        assert!(!out.contains("supersecretaccountkey"));
        assert!(out.contains("acct"));

        let cred = Credential::with_token("supersecretbearertoken");
        let out = format!("{cred:?}");
        assert!(!out.contains("supersecretbearertoken"));
    }
}

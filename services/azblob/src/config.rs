use std::time::Duration;

use stowage_core::Context;

/// Environment variable carrying the storage account name.
pub const STOWAGE_ACCOUNT_NAME: &str = "STOWAGE_ACCOUNT_NAME";
/// Environment variable carrying a custom blob endpoint.
pub const STOWAGE_ENDPOINT: &str = "STOWAGE_ENDPOINT";

/// Config carries all the configuration for the blob storage service.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Storage account name.
    ///
    /// Required. Can be loaded from `STOWAGE_ACCOUNT_NAME`.
    pub account_name: Option<String>,
    /// Blob service endpoint.
    ///
    /// Defaults to `https://{account}.blob.core.windows.net`. Can be
    /// loaded from `STOWAGE_ENDPOINT`, for example to point at a local
    /// emulator.
    pub endpoint: Option<String>,
    /// Block size for chunked downloads. Defaults to 4 MiB.
    pub download_block_size: Option<u64>,
    /// Max in-flight chunk requests per download. Defaults to 20.
    pub download_parallelism: Option<usize>,
    /// Overall deadline for a single download. Defaults to 30 minutes.
    pub download_timeout: Option<Duration>,
}

impl Config {
    /// Load config values from the context's environment.
    ///
    /// Values already set on the config take precedence over the
    /// environment.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        let envs = ctx.env_vars();

        if self.account_name.is_none() {
            self.account_name = envs.get(STOWAGE_ACCOUNT_NAME).cloned();
        }
        if self.endpoint.is_none() {
            self.endpoint = envs.get(STOWAGE_ENDPOINT).cloned();
        }

        self
    }

    /// Resolve the blob endpoint for the given account, trimming any
    /// trailing slash so url building stays uniform.
    pub(crate) fn endpoint_or_default(&self, account: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{account}.blob.core.windows.net"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_core::StaticEnv;

    fn static_env(pairs: &[(&str, &str)]) -> StaticEnv {
        StaticEnv {
            envs: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_config_from_env() {
        let ctx = Context::new().with_env(static_env(&[
            (STOWAGE_ACCOUNT_NAME, "deployacct"),
            (STOWAGE_ENDPOINT, "http://127.0.0.1:10000/deployacct"),
        ]));

        let config = Config::default().from_env(&ctx);
        assert_eq!(config.account_name.as_deref(), Some("deployacct"));
        assert_eq!(
            config.endpoint.as_deref(),
            Some("http://127.0.0.1:10000/deployacct")
        );
    }

    #[test]
    fn test_config_prefers_explicit_values() {
        let ctx = Context::new().with_env(static_env(&[(STOWAGE_ACCOUNT_NAME, "fromenv")]));

        let config = Config {
            account_name: Some("explicit".to_string()),
            ..Default::default()
        }
        .from_env(&ctx);
        assert_eq!(config.account_name.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_endpoint_default() {
        let config = Config::default();
        assert_eq!(
            config.endpoint_or_default("deployacct"),
            "https://deployacct.blob.core.windows.net"
        );

        let config = Config {
            endpoint: Some("http://localhost:10000/acct/".to_string()),
            ..Default::default()
        };
        assert_eq!(config.endpoint_or_default("acct"), "http://localhost:10000/acct");
    }
}

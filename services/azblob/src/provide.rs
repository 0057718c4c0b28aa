use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::header;
use log::debug;
use serde::Deserialize;
use stowage_core::utils::Redact;
use stowage_core::{Context, Error, Result};

/// Lists the account key for a storage account.
///
/// Used by the shared-key strategy during initialization. The service
/// calls this exactly once and caches the resulting credential.
#[async_trait]
pub trait KeyProvider: Debug + Send + Sync + 'static {
    /// Return the primary account key for the given account.
    async fn list_account_key(&self, ctx: &Context, account_name: &str) -> Result<String>;
}

#[async_trait]
impl<T: KeyProvider + ?Sized> KeyProvider for Arc<T> {
    async fn list_account_key(&self, ctx: &Context, account_name: &str) -> Result<String> {
        self.as_ref().list_account_key(ctx, account_name).await
    }
}

/// An authenticated login from which access tokens can be drawn.
#[async_trait]
pub trait LoginSession: Debug + Send + Sync + 'static {
    /// Return a bearer token for the storage data plane.
    async fn access_token(&self, ctx: &Context) -> Result<String>;
}

/// Performs a login and yields a session.
///
/// Used by the token strategy during initialization, and by
/// [`ManagementKeyProvider`] to authorize its management-plane call.
#[async_trait]
pub trait LoginProvider: Debug + Send + Sync + 'static {
    /// Perform the login.
    async fn login(&self, ctx: &Context) -> Result<Box<dyn LoginSession>>;
}

/// KeyProvider that returns a fixed key, for configs that carry the
/// account key directly.
pub struct StaticKeyProvider {
    key: String,
}

impl StaticKeyProvider {
    /// Create a provider around the given base64 encoded account key.
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }
}

impl Debug for StaticKeyProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticKeyProvider")
            .field("key", &Redact::from(&self.key))
            .finish()
    }
}

#[async_trait]
impl KeyProvider for StaticKeyProvider {
    async fn list_account_key(&self, _ctx: &Context, _account_name: &str) -> Result<String> {
        Ok(self.key.clone())
    }
}

/// LoginProvider that returns a fixed token, for tests and for callers
/// that already hold one.
pub struct StaticLoginProvider {
    token: String,
}

impl StaticLoginProvider {
    /// Create a provider around the given access token.
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }
}

impl Debug for StaticLoginProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticLoginProvider")
            .field("token", &Redact::from(&self.token))
            .finish()
    }
}

struct StaticSession {
    token: String,
}

impl Debug for StaticSession {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticSession")
            .field("token", &Redact::from(&self.token))
            .finish()
    }
}

#[async_trait]
impl LoginSession for StaticSession {
    async fn access_token(&self, _ctx: &Context) -> Result<String> {
        Ok(self.token.clone())
    }
}

#[async_trait]
impl LoginProvider for StaticLoginProvider {
    async fn login(&self, _ctx: &Context) -> Result<Box<dyn LoginSession>> {
        Ok(Box::new(StaticSession {
            token: self.token.clone(),
        }))
    }
}

/// Default endpoint of the azure management plane.
pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

const LIST_KEYS_API_VERSION: &str = "2023-01-01";

/// KeyProvider that lists the account key through the management plane.
///
/// Issues `POST .../storageAccounts/{account}/listKeys` with a bearer
/// token obtained from the configured login provider, and returns the
/// first key of the response.
#[derive(Debug)]
pub struct ManagementKeyProvider {
    subscription_id: String,
    resource_group: String,
    endpoint: String,
    login: Arc<dyn LoginProvider>,
}

impl ManagementKeyProvider {
    /// Create a provider for the given subscription and resource group.
    pub fn new(
        subscription_id: &str,
        resource_group: &str,
        login: Arc<dyn LoginProvider>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            endpoint: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
            login,
        }
    }

    /// Override the management endpoint, for sovereign clouds or tests.
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListKeysResponse {
    keys: Vec<StorageAccountKey>,
}

#[derive(Debug, Default, Deserialize)]
struct StorageAccountKey {
    value: String,
}

#[async_trait]
impl KeyProvider for ManagementKeyProvider {
    async fn list_account_key(&self, ctx: &Context, account_name: &str) -> Result<String> {
        let session = self.login.login(ctx).await?;
        let token = session.access_token(ctx).await?;

        let url = format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Storage/storageAccounts/{}/listKeys?api-version={}",
            self.endpoint,
            self.subscription_id,
            self.resource_group,
            account_name,
            LIST_KEYS_API_VERSION
        );
        debug!("listing account keys for storage account {account_name}");

        let mut auth: http::HeaderValue = format!("Bearer {token}").parse()?;
        auth.set_sensitive(true);
        let req = http::Request::post(&url)
            .header(header::AUTHORIZATION, auth)
            .header(header::CONTENT_LENGTH, 0)
            .body(Bytes::new())?;

        let resp = ctx.http_send(req).await?;
        if !resp.status().is_success() {
            return Err(Error::credential_invalid(format!(
                "listing account keys failed: status {}: {}",
                resp.status(),
                String::from_utf8_lossy(resp.body())
            )));
        }

        let listed: ListKeysResponse = serde_json::from_slice(resp.body())
            .map_err(|e| Error::credential_invalid("invalid listKeys response").with_source(e))?;
        listed
            .keys
            .into_iter()
            .next()
            .map(|k| k.value)
            .ok_or_else(|| Error::credential_invalid("account has no keys listed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use stowage_core::HttpSend;

    #[derive(Debug, Default)]
    struct RecordingHttpSend {
        requests: Mutex<Vec<http::Request<Bytes>>>,
        body: &'static str,
    }

    #[async_trait]
    impl HttpSend for RecordingHttpSend {
        async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
            let resp = http::Response::builder()
                .status(http::StatusCode::OK)
                .body(Bytes::from_static(self.body.as_bytes()))?;
            self.requests.lock().unwrap().push(req);
            Ok(resp)
        }
    }

    #[tokio::test]
    async fn test_management_key_provider_lists_first_key() {
        let http = Arc::new(RecordingHttpSend {
            requests: Mutex::new(Vec::new()),
            body: r#"{"keys":[{"keyName":"key1","value":"keyValue"},{"keyName":"key2","value":"other"}]}"#,
        });
        let ctx = Context::new().with_http_send(http.clone());

        let provider = ManagementKeyProvider::new(
            "sub-id",
            "deploy-rg",
            Arc::new(StaticLoginProvider::new("armToken")),
        );
        let key = provider.list_account_key(&ctx, "deployacct").await.unwrap();
        assert_eq!(key, "keyValue");

        let requests = http.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.method(), http::Method::POST);
        let uri = req.uri().to_string();
        assert!(uri.starts_with("https://management.azure.com/subscriptions/sub-id/"));
        assert!(uri.contains("/storageAccounts/deployacct/listKeys?api-version="));
        assert_eq!(
            req.headers().get(header::AUTHORIZATION).unwrap(),
            "Bearer armToken"
        );
    }

    #[tokio::test]
    async fn test_management_key_provider_no_keys() {
        let http = Arc::new(RecordingHttpSend {
            requests: Mutex::new(Vec::new()),
            body: r#"{"keys":[]}"#,
        });
        let ctx = Context::new().with_http_send(http);

        let provider = ManagementKeyProvider::new(
            "sub-id",
            "deploy-rg",
            Arc::new(StaticLoginProvider::new("armToken")),
        );
        let err = provider
            .list_account_key(&ctx, "deployacct")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), stowage_core::ErrorKind::CredentialInvalid);
    }
}

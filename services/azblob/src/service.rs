use std::collections::HashSet;
use std::fmt::{self, Debug, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http::{header, HeaderName, StatusCode};
use log::debug;
use stowage_core::time::now;
use stowage_core::{Context, Error, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::Config;
use crate::constants::X_MS_BLOB_TYPE;
use crate::credential::{AuthStrategy, Credential};
use crate::provide::{KeyProvider, LoginProvider};
use crate::sas::BlobSharedAccessSignature;
use crate::sign::RequestSigner;
use crate::url::ServiceHandle;
use crate::xml;

/// Block size for chunked downloads: 4 MiB.
pub const DOWNLOAD_BLOCK_SIZE: u64 = 4 * 1024 * 1024;
/// Max in-flight chunk requests per download.
pub const DOWNLOAD_PARALLELISM: usize = 20;
/// Overall deadline for a single download.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30 * 60);
/// Default lifetime of a generated SAS url.
pub const SAS_DEFAULT_EXPIRY: Duration = Duration::from_secs(60 * 60);

/// Blob storage service for deployment artifacts.
///
/// One instance serves one storage account under one auth strategy.
/// [`initialize`](Self::initialize) resolves the credential once; every
/// operation after that signs with the cached credential.
pub struct BlobStorageService {
    ctx: Context,
    handle: ServiceHandle,
    strategy: AuthStrategy,
    key_provider: Option<Arc<dyn KeyProvider>>,
    login_provider: Option<Arc<dyn LoginProvider>>,
    signer: RequestSigner,

    credential: Mutex<Option<Credential>>,
    // Containers known to exist. Seeded from a listing on first use,
    // then maintained additively; delete evicts.
    known_containers: Mutex<Option<HashSet<String>>>,

    block_size: u64,
    parallelism: usize,
    timeout: Duration,
}

impl Debug for BlobStorageService {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobStorageService")
            .field("account", &self.handle.account())
            .field("endpoint", &self.handle.url())
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl BlobStorageService {
    /// Create a service from the given context and config.
    ///
    /// The config must carry an account name. Use the `with_*` methods
    /// to pick the auth strategy and attach credential providers, then
    /// call [`initialize`](Self::initialize) before any operation.
    pub fn new(ctx: Context, config: Config) -> Result<Self> {
        let account = config
            .account_name
            .as_deref()
            .ok_or_else(|| Error::config_invalid("account name is required"))?;
        let handle = ServiceHandle::new(account, &config.endpoint_or_default(account))?;

        Ok(Self {
            ctx,
            handle,
            strategy: AuthStrategy::default(),
            key_provider: None,
            login_provider: None,
            signer: RequestSigner::new(),
            credential: Mutex::new(None),
            known_containers: Mutex::new(None),
            block_size: config.download_block_size.unwrap_or(DOWNLOAD_BLOCK_SIZE),
            parallelism: config.download_parallelism.unwrap_or(DOWNLOAD_PARALLELISM),
            timeout: config.download_timeout.unwrap_or(DOWNLOAD_TIMEOUT),
        })
    }

    /// Select the auth strategy. Defaults to shared key.
    pub fn with_strategy(mut self, strategy: AuthStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Attach the key provider used by the shared-key strategy.
    pub fn with_key_provider(mut self, provider: impl KeyProvider) -> Self {
        self.key_provider = Some(Arc::new(provider));
        self
    }

    /// Attach the login provider used by the token strategy.
    pub fn with_login_provider(mut self, provider: impl LoginProvider) -> Self {
        self.login_provider = Some(Arc::new(provider));
        self
    }

    /// Resolve and cache the credential for the selected strategy.
    ///
    /// Shared key asks the key provider for the account key; token
    /// performs a login and draws one access token from the session.
    /// Safe to call more than once; each call re-resolves.
    pub async fn initialize(&self) -> Result<()> {
        let cred = match self.strategy {
            AuthStrategy::SharedKey => {
                let provider = self.key_provider.as_ref().ok_or_else(|| {
                    Error::credential_invalid("shared-key auth requires a key provider")
                })?;
                let key = provider
                    .list_account_key(&self.ctx, self.handle.account())
                    .await?;
                Credential::with_shared_key(self.handle.account(), &key)
            }
            AuthStrategy::Token => {
                let provider = self.login_provider.as_ref().ok_or_else(|| {
                    Error::credential_invalid("token auth requires a login provider")
                })?;
                let session = provider.login(&self.ctx).await?;
                let token = session.access_token(&self.ctx).await?;
                Credential::with_token(&token)
            }
        };

        if !cred.is_valid() {
            return Err(Error::credential_invalid(format!(
                "{} credential resolved empty",
                self.strategy
            )));
        }
        debug!("initialized {} credential: {cred:?}", self.strategy);

        *self.credential.lock().expect("lock poisoned") = Some(cred);
        Ok(())
    }

    /// The resolved credential.
    ///
    /// Fails if [`initialize`](Self::initialize) has not completed.
    pub fn credential(&self) -> Result<Credential> {
        self.credential
            .lock()
            .expect("lock poisoned")
            .clone()
            .ok_or_else(|| Error::credential_invalid("service is not initialized"))
    }

    /// Sign the request with the cached credential and send it.
    async fn send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let cred = self.credential()?;
        let (mut parts, body) = req.into_parts();
        self.signer.sign(&mut parts, &cred)?;
        self.ctx
            .http_send(http::Request::from_parts(parts, body))
            .await
    }

    /// List all container names in the account, following continuation
    /// markers until the listing is exhausted.
    pub async fn list_containers(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut marker = String::new();

        loop {
            let mut url = format!("{}/?comp=list", self.handle.url());
            if !marker.is_empty() {
                url.push_str("&marker=");
                url.push_str(&urlencode(&marker));
            }

            let req = http::Request::get(&url).body(Bytes::new())?;
            let resp = self.send(req).await?;
            if !resp.status().is_success() {
                return Err(remote_error("list containers", resp));
            }

            let output = xml::parse_list_containers(resp.body())?;
            names.extend(output.containers.container.into_iter().map(|c| c.name));

            match output.next_marker {
                Some(m) if !m.is_empty() => marker = m,
                _ => break,
            }
        }

        Ok(names)
    }

    /// Create the container if it does not already exist.
    ///
    /// Existence is cached: the first call seeds the cache from a
    /// container listing, and later calls for known names return
    /// without any network traffic. A concurrent creation elsewhere
    /// surfaces as a conflict, which also counts as success.
    pub async fn create_container_if_not_exists(&self, name: &str) -> Result<()> {
        let container = self.handle.container(name)?;

        let needs_seed = self.known_containers.lock().expect("lock poisoned").is_none();
        if needs_seed {
            let listed = self.list_containers().await?;
            let mut cache = self.known_containers.lock().expect("lock poisoned");
            if cache.is_none() {
                *cache = Some(listed.into_iter().collect());
            }
        }

        {
            let cache = self.known_containers.lock().expect("lock poisoned");
            if cache.as_ref().is_some_and(|c| c.contains(container.name())) {
                debug!("container {} already exists", container.name());
                return Ok(());
            }
        }

        let url = format!("{}?restype=container", container.url());
        let req = http::Request::put(&url)
            .header(header::CONTENT_LENGTH, 0)
            .body(Bytes::new())?;
        let resp = self.send(req).await?;

        match resp.status() {
            StatusCode::CREATED | StatusCode::CONFLICT => {
                debug!("container {} ready", container.name());
                if let Some(cache) = self
                    .known_containers
                    .lock()
                    .expect("lock poisoned")
                    .as_mut()
                {
                    cache.insert(container.name().to_string());
                }
                Ok(())
            }
            _ => Err(remote_error("create container", resp)),
        }
    }

    /// Delete the container and evict it from the existence cache.
    pub async fn delete_container(&self, name: &str) -> Result<()> {
        let container = self.handle.container(name)?;

        let url = format!("{}?restype=container", container.url());
        let req = http::Request::delete(&url).body(Bytes::new())?;
        let resp = self.send(req).await?;
        if !resp.status().is_success() {
            return Err(remote_error("delete container", resp));
        }

        if let Some(cache) = self
            .known_containers
            .lock()
            .expect("lock poisoned")
            .as_mut()
        {
            cache.remove(container.name());
        }
        Ok(())
    }

    /// Upload a local file as a block blob.
    ///
    /// When `blob_path` is none, the file name of `local_path` becomes
    /// the blob name.
    pub async fn upload_file(
        &self,
        local_path: &str,
        container_name: &str,
        blob_path: Option<&str>,
    ) -> Result<()> {
        let blob_path = match blob_path {
            Some(p) => p.to_string(),
            None => Path::new(local_path)
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    Error::name_invalid(format!("cannot derive a blob name from {local_path:?}"))
                })?,
        };
        let blob = self.handle.container(container_name)?.blob(&blob_path)?;

        let content = self.ctx.file_read(local_path).await?;
        debug!("uploading {} bytes to {}", content.len(), blob.url());

        let req = http::Request::put(blob.url())
            .header(HeaderName::from_static(X_MS_BLOB_TYPE), "BlockBlob")
            .header(header::CONTENT_LENGTH, content.len())
            .body(Bytes::from(content))?;
        let resp = self.send(req).await?;
        if !resp.status().is_success() {
            return Err(remote_error("upload", resp));
        }
        Ok(())
    }

    /// Delete a blob.
    pub async fn delete_file(&self, container_name: &str, blob_path: &str) -> Result<()> {
        let blob = self.handle.container(container_name)?.blob(blob_path)?;

        let req = http::Request::delete(blob.url()).body(Bytes::new())?;
        let resp = self.send(req).await?;
        if !resp.status().is_success() {
            return Err(remote_error("delete", resp));
        }
        Ok(())
    }

    /// List blob paths in a container, flat across virtual directories.
    ///
    /// When `ext` is given, only paths ending in `.{ext}` are returned.
    pub async fn list_files(
        &self,
        container_name: &str,
        ext: Option<&str>,
    ) -> Result<Vec<String>> {
        let container = self.handle.container(container_name)?;

        let mut names = Vec::new();
        let mut marker = String::new();
        loop {
            let mut url = format!("{}?restype=container&comp=list", container.url());
            if !marker.is_empty() {
                url.push_str("&marker=");
                url.push_str(&urlencode(&marker));
            }

            let req = http::Request::get(&url).body(Bytes::new())?;
            let resp = self.send(req).await?;
            if !resp.status().is_success() {
                return Err(remote_error("list blobs", resp));
            }

            let output = xml::parse_list_blobs(resp.body())?;
            names.extend(output.blobs.blob.into_iter().map(|b| b.name));

            match output.next_marker {
                Some(m) if !m.is_empty() => marker = m,
                _ => break,
            }
        }

        if let Some(ext) = ext {
            let suffix = format!(".{}", ext.trim_start_matches('.'));
            names.retain(|n| n.ends_with(&suffix));
        }
        Ok(names)
    }

    /// Download a blob to a local file.
    ///
    /// The blob size is read from its properties, then fetched as
    /// fixed-size ranges with bounded parallelism. The whole download
    /// runs under one deadline; on expiry every in-flight chunk is
    /// cancelled and nothing is written.
    pub async fn download_binary(
        &self,
        container_name: &str,
        blob_path: &str,
        target_path: &str,
    ) -> Result<()> {
        let blob = self.handle.container(container_name)?.blob(blob_path)?;
        let url = blob.url();

        let req = http::Request::head(&url).body(Bytes::new())?;
        let resp = self.send(req).await?;
        if !resp.status().is_success() {
            return Err(remote_error("read blob properties", resp));
        }
        let total = resp
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| Error::transfer("blob properties are missing a content length"))?;

        debug!("downloading {url} ({total} bytes) to {target_path}");

        let buf = if total == 0 {
            Vec::new()
        } else {
            tokio::time::timeout(self.timeout, self.download_chunks(&url, total))
                .await
                .map_err(|_| {
                    Error::timeout(format!(
                        "download of {blob_path} exceeded {}s",
                        self.timeout.as_secs()
                    ))
                })??
        };

        self.ctx.file_write(target_path, Bytes::from(buf)).await
    }

    /// Fetch `total` bytes from `url` as ranged requests and assemble
    /// them in order.
    async fn download_chunks(&self, url: &str, total: u64) -> Result<Vec<u8>> {
        let cred = self.credential()?;
        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let mut tasks: JoinSet<Result<(u64, Bytes)>> = JoinSet::new();

        let mut offset = 0u64;
        while offset < total {
            let len = self.block_size.min(total - offset);
            let semaphore = semaphore.clone();
            let ctx = self.ctx.clone();
            let signer = self.signer.clone();
            let cred = cred.clone();
            let url = url.to_string();

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::unexpected("semaphore closed").with_source(e))?;
                fetch_range(&ctx, &signer, &cred, &url, offset, len).await
            });
            offset += len;
        }

        let mut buf = vec![0u8; total as usize];
        while let Some(joined) = tasks.join_next().await {
            let (offset, bytes) =
                joined.map_err(|e| Error::unexpected("download task failed").with_source(e))??;
            let start = offset as usize;
            buf[start..start + bytes.len()].copy_from_slice(&bytes);
        }
        Ok(buf)
    }

    /// Generate a read-only SAS url for one blob.
    ///
    /// Requires the shared-key strategy; a token credential never holds
    /// the account key, so this fails with an unsupported-auth error
    /// before any request is built. `expires_in` defaults to one hour.
    pub async fn generate_blob_sas_url(
        &self,
        container_name: &str,
        blob_path: &str,
        expires_in: Option<Duration>,
    ) -> Result<String> {
        let cred = self.credential()?;
        let account_key = match &cred {
            Credential::SharedKey { account_key, .. } => account_key,
            Credential::Token { .. } => {
                return Err(Error::unsupported_auth(
                    "SAS generation requires shared-key auth; token sessions never hold the account key",
                ))
            }
        };

        let blob = self.handle.container(container_name)?.blob(blob_path)?;

        let start = now();
        let lifetime = chrono::Duration::from_std(expires_in.unwrap_or(SAS_DEFAULT_EXPIRY))
            .map_err(|e| Error::unexpected("SAS expiry out of range").with_source(e))?;
        let sas = BlobSharedAccessSignature::new(
            account_key.clone(),
            blob.canonicalized_resource(),
            start + lifetime,
        )
        .with_start(start);

        let query: Vec<String> = sas
            .token()?
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        Ok(format!("{}?{}", blob.url(), query.join("&")))
    }
}

/// Fetch one byte range. Returns the range offset together with the
/// body so the caller can place it.
async fn fetch_range(
    ctx: &Context,
    signer: &RequestSigner,
    cred: &Credential,
    url: &str,
    offset: u64,
    len: u64,
) -> Result<(u64, Bytes)> {
    let end = offset + len - 1;
    let req = http::Request::get(url)
        .header(header::RANGE, format!("bytes={offset}-{end}"))
        .body(Bytes::new())?;

    let (mut parts, body) = req.into_parts();
    signer.sign(&mut parts, cred)?;
    let resp = ctx
        .http_send(http::Request::from_parts(parts, body))
        .await?;
    if !resp.status().is_success() {
        return Err(remote_error("download chunk", resp));
    }

    let bytes = resp.into_body();
    if bytes.len() as u64 != len {
        return Err(Error::transfer(format!(
            "short read for range {offset}-{end}: got {} bytes",
            bytes.len()
        )));
    }
    Ok((offset, bytes))
}

/// Carry the store's error surface into the message untranslated.
fn remote_error(op: &str, resp: http::Response<Bytes>) -> Error {
    let status = resp.status();
    let body = String::from_utf8_lossy(resp.body());
    Error::transfer(format!("{op} failed: status {status}: {}", body.trim()))
}

fn urlencode(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

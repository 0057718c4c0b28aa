//! Azure Blob Storage access layer for deployment workflows.
//!
//! This crate moves deployment artifacts in and out of an Azure Blob
//! Storage account. It resolves a credential once per service instance,
//! under one of two auth strategies, then signs every request with it:
//!
//! - **SharedKey**: the account key is listed through the management
//!   plane (or provided directly) and requests carry a SharedKey
//!   signature. Only this strategy can mint SAS URLs.
//! - **Token**: an interactive or service-principal login yields a
//!   bearer token. No account key is ever held, so SAS generation is
//!   refused up front.
//!
//! ## Example
//!
//! ```no_run
//! use stowage_azblob::{AuthStrategy, BlobStorageService, Config, StaticKeyProvider};
//! use stowage_core::Context;
//!
//! #[tokio::main]
//! async fn main() -> stowage_core::Result<()> {
//!     let ctx = Context::new();
//!     let config = Config {
//!         account_name: Some("deployacct".to_string()),
//!         ..Default::default()
//!     };
//!
//!     let service = BlobStorageService::new(ctx, config)?
//!         .with_strategy(AuthStrategy::SharedKey)
//!         .with_key_provider(StaticKeyProvider::new("base64-account-key"));
//!     service.initialize().await?;
//!
//!     service.create_container_if_not_exists("deployments").await?;
//!     service
//!         .upload_file("./artifact.zip", "deployments", None)
//!         .await?;
//!     Ok(())
//! }
//! ```

mod config;
pub use config::Config;

mod constants;

mod credential;
pub use credential::{AuthStrategy, Credential};

mod provide;
pub use provide::{
    KeyProvider, LoginProvider, LoginSession, ManagementKeyProvider, StaticKeyProvider,
    StaticLoginProvider,
};

mod sign;
pub use sign::RequestSigner;

mod sas;
pub use sas::BlobSharedAccessSignature;

mod url;
pub use url::{BlobHandle, ContainerHandle, ServiceHandle};

mod xml;

mod service;
pub use service::{
    BlobStorageService, DOWNLOAD_BLOCK_SIZE, DOWNLOAD_PARALLELISM, DOWNLOAD_TIMEOUT,
    SAS_DEFAULT_EXPIRY,
};

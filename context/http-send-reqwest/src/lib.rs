//! reqwest-based HTTP transport for stowage.
//!
//! This crate provides `ReqwestHttpSend`, which implements the `HttpSend`
//! trait from `stowage_core` on top of a shared `reqwest::Client`.
//!
//! ## Example
//!
//! ```no_run
//! use stowage_core::Context;
//! use stowage_http_send_reqwest::ReqwestHttpSend;
//!
//! let ctx = Context::new().with_http_send(ReqwestHttpSend::default());
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use reqwest::{Client, Request};
use stowage_core::{Error, HttpSend, Result};

/// HttpSend implementation backed by `reqwest::Client`.
#[derive(Debug, Default)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    ///
    /// Use this to share a client that carries custom transport settings
    /// (timeouts, proxies, TLS configuration).
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = Request::try_from(req)
            .map_err(|e| Error::request_invalid("failed to convert request").with_source(e))?;
        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| Error::transfer("failed to send request").with_source(e))?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| Error::transfer("failed to read response body").with_source(e))?;
        Ok(http::Response::from_parts(parts, bs))
    }
}

use crate::Result;
use bytes::Bytes;
use std::fmt::Debug;

/// HttpSend is used to send http requests to the remote store.
///
/// This trait is the seam between the access layer and the transport:
/// the transport owns connection pooling and transport-level retries,
/// this layer owns request construction and signing.
#[async_trait::async_trait]
pub trait HttpSend: Debug + Send + Sync + 'static {
    /// Send http request and return the response.
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>>;
}

#[async_trait::async_trait]
impl<T: HttpSend + ?Sized> HttpSend for std::sync::Arc<T> {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        self.as_ref().http_send(req).await
    }
}

use std::future::Future;

use anyhow::Result;

/// Contract of the private object store that holds photo bytes.
pub trait BlobStore: Send + Sync + 'static {
    /// Store `bytes` under `path` and return the stored path.
    fn upload(&self, path: &str, bytes: Vec<u8>) -> impl Future<Output = Result<String>> + Send;

    /// Temporary link to a private object, valid for `ttl_secs`.
    fn create_signed_url(&self, path: &str, ttl_secs: u64) -> impl Future<Output = Result<String>> + Send;

    fn remove(&self, path: &str) -> impl Future<Output = Result<()>> + Send;
}

use thiserror::Error;

use crate::request::Request;
use crate::response::Response;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("network unreachable")]
    Offline,
    #[error("fetch failed: {0}")]
    Failed(String),
}

/// The real network, as far as the cache manager is concerned.
///
/// Implementations run on a single-threaded executor, so the returned futures
/// need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait Network {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

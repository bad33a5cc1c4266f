use std::cell::RefCell;
use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::GenerationId;
use crate::request::RequestKey;
use crate::response::Response;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("cache storage unavailable")]
    Unavailable,
    #[error("cache storage error: {0}")]
    Io(String),
}

/// Named generations of `(request key -> response)` entries.
///
/// Entries carry no expiry; freshness is the strategy's job. Methods take
/// `&self` because a background revalidation may write while other requests
/// are being served.
#[allow(async_fn_in_trait)]
pub trait CacheStorage {
    async fn generations(&self) -> Result<Vec<GenerationId>, StorageError>;

    async fn get(
        &self,
        generation: &GenerationId,
        key: &RequestKey,
    ) -> Result<Option<Response>, StorageError>;

    async fn put(
        &self,
        generation: &GenerationId,
        key: RequestKey,
        response: Response,
    ) -> Result<(), StorageError>;

    /// Writes every entry or none of them.
    async fn put_all(
        &self,
        generation: &GenerationId,
        entries: Vec<(RequestKey, Response)>,
    ) -> Result<(), StorageError>;

    /// Returns `true` if the generation existed.
    async fn delete_generation(&self, generation: &GenerationId) -> Result<bool, StorageError>;
}

/// Deterministic in-memory storage.
///
/// Generations and entries live in `BTreeMap`s so enumeration order is stable.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    generations: RefCell<BTreeMap<GenerationId, BTreeMap<RequestKey, Response>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_count(&self, generation: &GenerationId) -> usize {
        self.generations
            .borrow()
            .get(generation)
            .map_or(0, |entries| entries.len())
    }
}

impl CacheStorage for MemoryCacheStorage {
    async fn generations(&self) -> Result<Vec<GenerationId>, StorageError> {
        Ok(self.generations.borrow().keys().cloned().collect())
    }

    async fn get(
        &self,
        generation: &GenerationId,
        key: &RequestKey,
    ) -> Result<Option<Response>, StorageError> {
        Ok(self
            .generations
            .borrow()
            .get(generation)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn put(
        &self,
        generation: &GenerationId,
        key: RequestKey,
        response: Response,
    ) -> Result<(), StorageError> {
        self.generations
            .borrow_mut()
            .entry(generation.clone())
            .or_default()
            .insert(key, response);
        Ok(())
    }

    async fn put_all(
        &self,
        generation: &GenerationId,
        entries: Vec<(RequestKey, Response)>,
    ) -> Result<(), StorageError> {
        let mut generations = self.generations.borrow_mut();
        let target = generations.entry(generation.clone()).or_default();
        target.extend(entries);
        Ok(())
    }

    async fn delete_generation(&self, generation: &GenerationId) -> Result<bool, StorageError> {
        Ok(self.generations.borrow_mut().remove(generation).is_some())
    }
}

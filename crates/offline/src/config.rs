use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Names one cache generation. Bumped on every deploy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationId(pub String);

impl GenerationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `"{app}-v{version}"`.
    pub fn for_release(app: &str, version: &str) -> Self {
        Self(format!("{app}-v{version}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GenerationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheConfigError {
    #[error("invalid cache config JSON: {0}")]
    Malformed(String),
    #[error("shell entry `{0}` is not part of the pre-cache manifest")]
    ShellNotPrecached(String),
    #[error("generation id must not be empty")]
    EmptyGeneration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// The current generation; every other generation is stale.
    pub generation: GenerationId,
    /// Shell-critical resources pre-cached on install.
    pub precache: Vec<String>,
    /// Served for navigations when the network is unreachable.
    pub shell_entry: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            generation: GenerationId::for_release("odyssey", "1"),
            precache: vec![
                "./".to_string(),
                "./index.html".to_string(),
                "./assets/css/styles.css".to_string(),
                "./pkg/viewer_web.js".to_string(),
                "./pkg/viewer_web_bg.wasm".to_string(),
                "./data/locations.json".to_string(),
            ],
            shell_entry: "./index.html".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn from_json(raw: &str) -> Result<Self, CacheConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| CacheConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CacheConfigError> {
        if self.generation.as_str().trim().is_empty() {
            return Err(CacheConfigError::EmptyGeneration);
        }
        if !self.precache.iter().any(|p| p == &self.shell_entry) {
            return Err(CacheConfigError::ShellNotPrecached(self.shell_entry.clone()));
        }
        Ok(())
    }
}

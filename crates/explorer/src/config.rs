use foundation::geo::Viewport;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid explorer config JSON: {0}")]
    Malformed(String),
    #[error("invalid explorer config: {0}")]
    Invalid(String),
}

/// Responsive image variants offered for the detail panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// One `srcset` candidate per width, in pixels.
    pub widths: Vec<u32>,
    pub quality: u8,
    /// `sizes` attribute passed through unchanged.
    pub sizes: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            widths: vec![400, 800, 1200],
            quality: 80,
            sizes: "(max-width: 768px) 100vw, 420px".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Default view, restored whenever a selection or tour ends.
    pub overview: Viewport,
    /// Zoom used when flying to a single location.
    pub detail_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Delay between opening the panel and moving focus into it.
    pub focus_trap_delay_ms: u64,
    pub marker_reveal_delay_ms: u64,
    pub welcome_fade_ms: u64,
    pub notice_duration_ms: u64,
    /// Issue every viewport transition without animation.
    pub reduced_motion: bool,
    pub images: ImageConfig,
    /// `tracing` filter level used by the host subscriber.
    pub log_level: String,
    /// Offline worker script registered at boot; `None` skips registration.
    pub service_worker_url: Option<String>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            overview: Viewport::at(2.8, 18.35, 4.0),
            detail_zoom: 7.0,
            min_zoom: 3.0,
            max_zoom: 12.0,
            focus_trap_delay_ms: 100,
            marker_reveal_delay_ms: 800,
            welcome_fade_ms: 1200,
            notice_duration_ms: 5000,
            reduced_motion: false,
            images: ImageConfig::default(),
            log_level: "info".to_string(),
            service_worker_url: Some("./service-worker.js".to_string()),
        }
    }
}

impl ExplorerConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses `raw`, falling back to defaults on any error. The error is
    /// returned alongside so the caller can report it.
    pub fn from_json_or_default(raw: &str) -> (Self, Option<ConfigError>) {
        match Self::from_json(raw) {
            Ok(config) => (config, None),
            Err(err) => {
                tracing::warn!(error = %err, "falling back to default explorer config");
                (Self::default(), Some(err))
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.overview.center.is_valid() {
            return Err(ConfigError::Invalid("overview center out of range".into()));
        }
        if !(self.min_zoom <= self.max_zoom) {
            return Err(ConfigError::Invalid(format!(
                "min_zoom {} exceeds max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        for (name, zoom) in [("detail_zoom", self.detail_zoom), ("overview zoom", self.overview.zoom)] {
            if !(self.min_zoom..=self.max_zoom).contains(&zoom) {
                return Err(ConfigError::Invalid(format!(
                    "{name} {zoom} outside [{}, {}]",
                    self.min_zoom, self.max_zoom
                )));
            }
        }
        if !(1..=100).contains(&self.images.quality) {
            return Err(ConfigError::Invalid(format!(
                "image quality {} outside 1..=100",
                self.images.quality
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ExplorerConfig};
    use foundation::geo::Viewport;

    #[test]
    fn defaults_match_the_shipped_map() {
        let c = ExplorerConfig::default();
        assert_eq!(c.overview, Viewport::at(2.8, 18.35, 4.0));
        assert_eq!(c.detail_zoom, 7.0);
        assert_eq!(c.images.widths, vec![400, 800, 1200]);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let c = ExplorerConfig::from_json(r#"{"reduced_motion":true,"images":{"quality":60}}"#)
            .unwrap();
        assert!(c.reduced_motion);
        assert_eq!(c.images.quality, 60);
        assert_eq!(c.images.widths, vec![400, 800, 1200]);
        assert_eq!(c.focus_trap_delay_ms, 100);
    }

    #[test]
    fn offline_worker_registration_can_be_disabled() {
        let c = ExplorerConfig::default();
        assert_eq!(c.service_worker_url.as_deref(), Some("./service-worker.js"));
        let c = ExplorerConfig::from_json(r#"{"service_worker_url":null}"#).unwrap();
        assert_eq!(c.service_worker_url, None);
    }

    #[test]
    fn detail_zoom_must_sit_inside_zoom_bounds() {
        let err = ExplorerConfig::from_json(r#"{"detail_zoom":15}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_json_falls_back_to_defaults() {
        let (c, err) = ExplorerConfig::from_json_or_default("{not json");
        assert_eq!(c, ExplorerConfig::default());
        assert!(matches!(err, Some(ConfigError::Malformed(_))));
    }
}

use std::sync::Arc;

use foundation::geo::LatLng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const BUNDLED_LOCATIONS: &str = include_str!("../data/locations.json");

/// One point of interest. Immutable once it has entered a [`LocationStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub name: String,
    /// Human-readable region label ("Tanzania", "North Africa", ...).
    #[serde(alias = "location")]
    pub region: String,
    pub lat: f64,
    pub lng: f64,
    pub description: String,
    #[serde(alias = "image")]
    pub image_ref: String,
}

impl Location {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    pub fn validate(&self) -> Result<(), LocationError> {
        if self.name.trim().is_empty() {
            return Err(LocationError::EmptyField { field: "name" });
        }
        if !self.position().is_valid() {
            return Err(LocationError::OutOfRange {
                lat: self.lat,
                lng: self.lng,
            });
        }
        let image = url::Url::parse(&self.image_ref)
            .map_err(|_| LocationError::BadImageRef(self.image_ref.clone()))?;
        if !matches!(image.scheme(), "http" | "https") {
            return Err(LocationError::BadImageRef(self.image_ref.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("location data is not valid JSON: {0}")]
    Malformed(String),
    #[error("location data must be a JSON array of records")]
    NotAList,
    #[error("record has missing or ill-typed fields: {0}")]
    InvalidRecord(String),
    #[error("`{field}` must not be empty")]
    EmptyField { field: &'static str },
    #[error("coordinates out of range: lat={lat} lng={lng}")]
    OutOfRange { lat: f64, lng: f64 },
    #[error("image reference is not an http(s) URL: {0}")]
    BadImageRef(String),
    #[error("location source unavailable: {0}")]
    Unavailable(String),
}

/// A record that failed validation, by its position in the source data.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub index: usize,
    pub error: LocationError,
}

/// Outcome of a lenient load: the valid records plus every rejection.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub store: LocationStore,
    pub rejected: Vec<Rejection>,
}

/// Ordered, immutable sequence of validated locations.
///
/// Cloning shares the underlying records; nothing hands out mutable access.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationStore {
    locations: Arc<[Location]>,
}

impl Default for LocationStore {
    fn default() -> Self {
        Self {
            locations: Arc::from(Vec::new()),
        }
    }
}

impl LocationStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a store, failing on the first invalid record.
    pub fn new(locations: Vec<Location>) -> Result<Self, LocationError> {
        for loc in &locations {
            loc.validate()?;
        }
        Ok(Self {
            locations: locations.into(),
        })
    }

    /// Parses a JSON array, keeping valid records and reporting each bad one.
    ///
    /// Only a document that is not an array at all is a hard error.
    pub fn from_json(raw: &str) -> Result<LoadReport, LocationError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| LocationError::Malformed(e.to_string()))?;
        let serde_json::Value::Array(items) = value else {
            return Err(LocationError::NotAList);
        };

        let mut locations = Vec::with_capacity(items.len());
        let mut rejected = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            let parsed = serde_json::from_value::<Location>(item)
                .map_err(|e| LocationError::InvalidRecord(e.to_string()))
                .and_then(|loc| loc.validate().map(|()| loc));
            match parsed {
                Ok(loc) => locations.push(loc),
                Err(error) => {
                    tracing::warn!(index, %error, "rejected location record");
                    rejected.push(Rejection { index, error });
                }
            }
        }

        Ok(LoadReport {
            store: Self {
                locations: locations.into(),
            },
            rejected,
        })
    }

    /// The seven points of interest shipped with the app.
    pub fn bundled() -> Result<LoadReport, LocationError> {
        Self::from_json(BUNDLED_LOCATIONS)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Location> {
        self.locations.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> + '_ {
        self.locations.iter()
    }

    pub fn as_slice(&self) -> &[Location] {
        &self.locations
    }
}

/// What the UI receives from a load attempt: always a store (possibly empty),
/// plus the problems worth telling the user about.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub store: LocationStore,
    pub problems: Vec<LocationError>,
}

/// Resolves a load result into a usable store. Failure degrades to an empty
/// store; it is never surfaced as an error to the caller.
pub fn resolve(result: Result<LoadReport, LocationError>) -> LoadOutcome {
    match result {
        Ok(report) => LoadOutcome {
            store: report.store,
            problems: report.rejected.into_iter().map(|r| r.error).collect(),
        },
        Err(err) => {
            tracing::error!(error = %err, "failed to load locations");
            LoadOutcome {
                store: LocationStore::empty(),
                problems: vec![err],
            }
        }
    }
}

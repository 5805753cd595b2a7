use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::geo::GeoPoint;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("geocoder returned malformed data: {0}")]
    Malformed(String),
}

/// Resolves a free-text delivery address to coordinates. Pure lookup, no
/// side effects on order or rider state; `Ok(None)` means the address is
/// not geocodable.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<Option<GeoPoint>, GeocodeError>;
}

/// Fixed address table. Unknown addresses resolve to `None`, which also
/// makes the default instance a deliberate "always fails" geocoder for
/// deployments where checkout precomputes coordinates.
#[derive(Default)]
pub struct StaticGeocoder {
    table: HashMap<String, GeoPoint>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, address: impl Into<String>, point: GeoPoint) -> Self {
        self.table.insert(address.into(), point);
        self
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn resolve(&self, address: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        Ok(self.table.get(address).copied())
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

/// Thin client for a Nominatim-style `/search` endpoint.
pub struct HttpGeocoder {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpGeocoder {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn resolve(&self, address: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        let url = format!("{}/search", self.endpoint);
        let hits: Vec<SearchHit> = self
            .client
            .get(url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(hit) = hits.into_iter().next() else {
            return Ok(None);
        };

        let lat: f64 = hit
            .lat
            .parse()
            .map_err(|_| GeocodeError::Malformed(format!("bad latitude: {}", hit.lat)))?;
        let lng: f64 = hit
            .lon
            .parse()
            .map_err(|_| GeocodeError::Malformed(format!("bad longitude: {}", hit.lon)))?;

        Ok(Some(GeoPoint { lat, lng }))
    }
}

use anyhow::Result;
use async_trait::async_trait;
use geocode_client::{GeocodeClient, GeocodedAddress};
use serde::Serialize;
use tracing::warn;

/// The provider is treated as reliable: any hit gets this fixed confidence.
/// A simplification, not a computed accuracy metric.
pub const GEOCODE_MATCH_CONFIDENCE: f64 = 0.9;

/// Resolves a free-text address to coordinates. `Ok(None)` is a provider
/// miss; `Err` is a provider/transport failure.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedAddress>>;
}

#[async_trait]
impl Geocoder for GeocodeClient {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedAddress>> {
        Ok(self.search(query).await?)
    }
}

/// Evidence produced by the geocoding check.
#[derive(Debug, Clone, Serialize)]
pub struct GeocodeCheck {
    pub pass: bool,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub confidence: Option<f64>,
    pub formatted_address: Option<String>,
}

/// Geocode a suggestion's address.
///
/// Returns `None` when the provider errored — the check is then unavailable
/// and stays out of the score entirely. A clean miss is a recorded failure.
pub async fn check_geocode(geocoder: &dyn Geocoder, query: &str) -> Option<GeocodeCheck> {
    match geocoder.geocode(query).await {
        Ok(Some(hit)) => Some(GeocodeCheck {
            pass: true,
            lat: Some(hit.lat),
            lng: Some(hit.lng),
            confidence: Some(GEOCODE_MATCH_CONFIDENCE),
            formatted_address: Some(hit.display_name),
        }),
        Ok(None) => Some(GeocodeCheck {
            pass: false,
            lat: None,
            lng: None,
            confidence: None,
            formatted_address: None,
        }),
        Err(e) => {
            warn!(query, error = %e, "Geocoder unavailable, excluding check");
            None
        }
    }
}

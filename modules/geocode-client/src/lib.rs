pub mod error;
pub mod types;

pub use error::{GeocodeError, Result};
pub use types::GeocodedAddress;

use std::time::Duration;
use tracing::{debug, warn};
use types::ProviderHit;

/// Nominatim usage policy requires an identifying user agent.
const USER_AGENT: &str = "aidmap-verify/0.1 (community services directory; ops@aidmap.org)";

pub struct GeocodeClient {
    client: reqwest::Client,
    base_url: String,
}

impl GeocodeClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Forward-geocode a free-text query. `Ok(None)` means the provider had
    /// no match — a normal outcome, distinct from transport/API errors.
    pub async fn search(&self, query: &str) -> Result<Option<GeocodedAddress>> {
        let url = format!(
            "{}/search?q={}&format=json&limit=1",
            self.base_url,
            urlencoding::encode(query)
        );

        debug!(query, "Geocoding query");

        let resp = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GeocodeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let hits: Vec<ProviderHit> = resp.json().await?;

        let Some(hit) = hits.into_iter().next() else {
            warn!(query, "Geocoder returned no match");
            return Ok(None);
        };

        let lat: f64 = hit
            .lat
            .parse()
            .map_err(|e| GeocodeError::Malformed(format!("invalid latitude: {e}")))?;
        let lng: f64 = hit
            .lon
            .parse()
            .map_err(|e| GeocodeError::Malformed(format!("invalid longitude: {e}")))?;

        debug!(query, lat, lng, "Geocoded");

        Ok(Some(GeocodedAddress {
            lat,
            lng,
            display_name: hit.display_name,
        }))
    }
}

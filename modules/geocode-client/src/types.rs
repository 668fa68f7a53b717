use serde::Deserialize;

/// One raw hit from the provider. Nominatim returns lat/lon as strings.
#[derive(Debug, Deserialize)]
pub(crate) struct ProviderHit {
    pub lat: String,
    pub lon: String,
    pub display_name: String,
}

/// A resolved address.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    pub lat: f64,
    pub lng: f64,
    /// Provider's canonical formatting of the matched address.
    pub display_name: String,
}

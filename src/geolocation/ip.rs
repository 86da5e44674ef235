//! IP-based geolocation lookup.

use std::fmt::Debug;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::distance::GeoPoint;
use crate::error::Result;

/// Fire-and-forget position lookup keyed on the caller's IP address.
#[async_trait]
pub trait IpLocator: Send + Sync + Debug {
    /// `Ok(None)` when the service answered without a usable position.
    async fn lookup(&self) -> Result<Option<GeoPoint>>;
}

/// Body of an ipapi-style response; only the coordinates matter.
#[derive(Debug, Deserialize)]
pub struct IpLookupResponse {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl IpLookupResponse {
    /// Missing or zero coordinates mean "no position".
    pub fn position(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) if lat != 0.0 && lng != 0.0 => {
                let point = GeoPoint { lat, lng };
                point.is_valid().then_some(point)
            }
            _ => None,
        }
    }
}

/// Looks the position up with a single GET.
#[derive(Debug, Clone)]
pub struct IpApiLocator {
    client: Client,
    url: String,
}

impl IpApiLocator {
    pub fn new<S: Into<String>>(url: S) -> Self {
        IpApiLocator {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl IpLocator for IpApiLocator {
    async fn lookup(&self) -> Result<Option<GeoPoint>> {
        let response = self.client.get(&self.url).send().await?;
        let body: IpLookupResponse = response.json().await?;
        Ok(body.position())
    }
}

/// Disabled lookup; never yields a position.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIpLookup;

#[async_trait]
impl IpLocator for NoIpLookup {
    async fn lookup(&self) -> Result<Option<GeoPoint>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> IpLookupResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_position_from_response() {
        let response = parse(r#"{"ip": "1.2.3.4", "city": "Paris", "latitude": 48.8534, "longitude": 2.3488}"#);
        assert_eq!(
            response.position(),
            Some(GeoPoint {
                lat: 48.8534,
                lng: 2.3488
            })
        );
    }

    #[test]
    fn test_missing_or_zero_coordinates() {
        assert_eq!(parse(r#"{"error": true, "reason": "RateLimited"}"#).position(), None);
        assert_eq!(parse(r#"{"latitude": 0, "longitude": 2.3}"#).position(), None);
        assert_eq!(parse(r#"{"latitude": 48.8}"#).position(), None);
        assert_eq!(parse(r#"{"latitude": 148.8, "longitude": 2.3}"#).position(), None);
    }

    #[tokio::test]
    async fn test_disabled_lookup() {
        assert_eq!(NoIpLookup.lookup().await.unwrap(), None);
    }
}

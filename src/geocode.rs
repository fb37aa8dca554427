//! Forward and reverse geocoding for address entry
//!
//! Thin client over a Nominatim-compatible HTTP API. The address picker uses
//! [`Geocoder::search`] to turn typed text into candidate places and
//! [`Geocoder::reverse`] to fill the form from a dropped map pin.

use crate::config::GeocoderConfig;
use crate::core::product::decimal;
use crate::core::{NetworkError, ParseError, Result};
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;

/// A geocoded place
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Place {
    pub display_name: String,

    #[serde(deserialize_with = "decimal")]
    pub lat: f64,

    #[serde(deserialize_with = "decimal")]
    pub lon: f64,

    /// Structured address parts (`road`, `city`, `postcode`, ...)
    #[serde(default)]
    pub address: BTreeMap<String, String>,
}

impl Place {
    /// City-like locality; smaller settlements report it under other keys
    pub fn locality(&self) -> Option<&str> {
        ["city", "town", "village", "municipality"]
            .iter()
            .find_map(|key| self.address.get(*key))
            .map(String::as_str)
    }

    pub fn postcode(&self) -> Option<&str> {
        self.address.get("postcode").map(String::as_str)
    }

    /// Street line: road and house number when available
    pub fn street(&self) -> Option<String> {
        let road = self.address.get("road")?;
        Some(match self.address.get("house_number") {
            Some(number) => format!("{} {}", road, number),
            None => road.clone(),
        })
    }
}

/// Reverse lookups answer with an error object when nothing is near
#[derive(Deserialize)]
#[serde(untagged)]
enum ReverseResponse {
    Found(Place),
    Missing { error: String },
}

/// Geocoding client
pub struct Geocoder {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
    country_codes: Vec<String>,
}

impl Geocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NetworkError::transport(&config.base_url, &e))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            country_codes: config.country_codes.clone(),
        })
    }

    /// Places matching free text, best match first
    pub async fn search(&self, text: &str, limit: usize) -> Result<Vec<Place>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = vec![
            ("q", text.to_string()),
            ("format", "json".to_string()),
            ("addressdetails", "1".to_string()),
            ("limit", limit.clamp(1, 50).to_string()),
        ];
        if !self.country_codes.is_empty() {
            query.push(("countrycodes", self.country_codes.join(",")));
        }

        self.get("search", &query).await
    }

    /// The place at a coordinate, if any
    pub async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<Place>> {
        let query = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("format", "json".to_string()),
            ("addressdetails", "1".to_string()),
        ];
        match self.get::<ReverseResponse>("reverse", &query).await? {
            ReverseResponse::Found(place) => Ok(Some(place)),
            ReverseResponse::Missing { error } => {
                tracing::debug!(lat, lon, %error, "No place at coordinate");
                Ok(None)
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .http
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .query(query)
            .send()
            .await
            .map_err(|e| NetworkError::transport(&url, &e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| NetworkError::transport(&url, &e))?;
        if !status.is_success() {
            return Err(NetworkError::Status {
                url,
                status,
                body: text,
            }
            .into());
        }

        serde_json::from_str(&text).map_err(|e| {
            ParseError::Payload {
                url,
                message: e.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_place_from_nominatim_payload() {
        let place: Place = serde_json::from_value(json!({
            "display_name": "12, Rue de Rivoli, Paris, 75001, France",
            "lat": "48.8559",
            "lon": "2.3580",
            "address": {
                "house_number": "12",
                "road": "Rue de Rivoli",
                "city": "Paris",
                "postcode": "75001"
            }
        }))
        .unwrap();

        assert_eq!(place.lat, 48.8559);
        assert_eq!(place.locality(), Some("Paris"));
        assert_eq!(place.postcode(), Some("75001"));
        assert_eq!(place.street().as_deref(), Some("Rue de Rivoli 12"));
    }

    #[test]
    fn test_reverse_miss_is_recognised() {
        let response: ReverseResponse =
            serde_json::from_value(json!({"error": "Unable to geocode"})).unwrap();
        assert!(matches!(response, ReverseResponse::Missing { .. }));
    }

    #[test]
    fn test_village_counts_as_locality() {
        let place: Place = serde_json::from_value(json!({
            "display_name": "x",
            "lat": 1.0,
            "lon": 2.0,
            "address": {"village": "Giverny"}
        }))
        .unwrap();
        assert_eq!(place.locality(), Some("Giverny"));
    }
}

//! HTTP clients for the directions and weather providers.
//!
//! Mapbox Directions returns polyline6 geometry and per-step maneuver
//! texts; Open-Meteo returns current precipitation and rain. Both clients
//! share a caller-supplied `reqwest::Client`.
//!
//! See <https://docs.mapbox.com/api/navigation/directions/> and
//! <https://open-meteo.com/en/docs>.

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use crate::directions::{DirectionsProvider, DirectionsRequest, DirectionsResponse};
use crate::error::{NavError, Result};
use crate::weather::{WeatherProvider, WeatherReport};
use crate::GpsPoint;

const MAPBOX_BASE_URL: &str = "https://api.mapbox.com/directions/v5/mapbox/driving";
const OPEN_METEO_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";

// ============================================================================
// Mapbox Directions
// ============================================================================

/// Driving directions from the Mapbox Directions API.
#[derive(Debug, Clone)]
pub struct MapboxDirections {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl MapboxDirections {
    pub fn new(client: reqwest::Client, access_token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: MAPBOX_BASE_URL.to_string(),
            access_token: access_token.into(),
        }
    }

    /// Point the client at a different host (self-hosted proxy, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct MapboxResponse {
    #[serde(default)]
    routes: Vec<MapboxRoute>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MapboxRoute {
    geometry: Option<String>,
    #[serde(default)]
    legs: Vec<MapboxLeg>,
}

#[derive(Debug, Deserialize)]
struct MapboxLeg {
    #[serde(default)]
    steps: Vec<MapboxStep>,
}

#[derive(Debug, Deserialize)]
struct MapboxStep {
    maneuver: MapboxManeuver,
}

#[derive(Debug, Deserialize)]
struct MapboxManeuver {
    #[serde(default)]
    instruction: String,
}

#[async_trait]
impl DirectionsProvider for MapboxDirections {
    async fn route(&self, request: &DirectionsRequest) -> Result<DirectionsResponse> {
        // Mapbox wants lng,lat pairs
        let url = format!(
            "{}/{},{};{},{}",
            self.base_url,
            request.origin.longitude,
            request.origin.latitude,
            request.destination.longitude,
            request.destination.latitude
        );
        debug!("Mapbox directions request for language {}", request.language);

        let body: MapboxResponse = self
            .client
            .get(&url)
            .query(&[
                ("geometries", "polyline6"),
                ("overview", "full"),
                ("steps", "true"),
                ("language", request.language.as_str()),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(route) = body.routes.into_iter().next() else {
            return Err(NavError::Directions(
                body.message
                    .unwrap_or_else(|| "no routes in response".to_string()),
            ));
        };

        let steps = route
            .legs
            .into_iter()
            .flat_map(|leg| leg.steps)
            .map(|step| step.maneuver.instruction)
            .collect();

        Ok(DirectionsResponse {
            encoded_geometry: route.geometry,
            steps,
        })
    }
}

// ============================================================================
// Open-Meteo
// ============================================================================

/// Current weather from the Open-Meteo forecast API.
#[derive(Debug, Clone)]
pub struct OpenMeteoWeather {
    client: reqwest::Client,
    base_url: String,
}

impl OpenMeteoWeather {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: OPEN_METEO_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    current: Option<OpenMeteoCurrent>,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoCurrent {
    #[serde(default)]
    precipitation: f64,
    #[serde(default)]
    rain: f64,
}

#[async_trait]
impl WeatherProvider for OpenMeteoWeather {
    async fn current(&self, point: GpsPoint) -> Result<WeatherReport> {
        let latitude = point.latitude.to_string();
        let longitude = point.longitude.to_string();

        let body: OpenMeteoResponse = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("current", "precipitation,rain"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let current = body
            .current
            .ok_or_else(|| NavError::Weather("response has no current block".to_string()))?;

        Ok(WeatherReport {
            precipitation: current.precipitation,
            rain: current.rain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mapbox_body() {
        let json = r#"{
            "routes": [{
                "geometry": "_ibE_seK_ibE_ibE",
                "legs": [{"steps": [
                    {"maneuver": {"instruction": "Head north"}},
                    {"maneuver": {"instruction": "You have arrived"}}
                ]}]
            }],
            "code": "Ok"
        }"#;
        let body: MapboxResponse = serde_json::from_str(json).unwrap();
        let route = &body.routes[0];
        assert_eq!(route.geometry.as_deref(), Some("_ibE_seK_ibE_ibE"));
        assert_eq!(route.legs[0].steps.len(), 2);
        assert_eq!(route.legs[0].steps[1].maneuver.instruction, "You have arrived");
    }

    #[test]
    fn test_parse_mapbox_no_route() {
        let json = r#"{"routes": [], "code": "NoRoute", "message": "No route found"}"#;
        let body: MapboxResponse = serde_json::from_str(json).unwrap();
        assert!(body.routes.is_empty());
        assert_eq!(body.message.as_deref(), Some("No route found"));
    }

    #[test]
    fn test_parse_open_meteo_body() {
        let json = r#"{"latitude": 52.52, "longitude": 13.41,
            "current": {"time": "2024-05-01T12:00", "interval": 900, "precipitation": 0.3, "rain": 0.2}}"#;
        let body: OpenMeteoResponse = serde_json::from_str(json).unwrap();
        let current = body.current.unwrap();
        assert_eq!(current.precipitation, 0.3);
        assert_eq!(current.rain, 0.2);
    }
}

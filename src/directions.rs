//! Directions provider boundary.
//!
//! The provider returns an encoded geometry and instruction texts; this
//! module turns that into a [`Route`] or a "no route" failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{NavError, Result};
use crate::route::MIN_ROUTE_POINTS;
use crate::{polyline, GpsPoint, Route};

/// Request for a driving route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRequest {
    pub origin: GpsPoint,
    pub destination: GpsPoint,
    /// Language tag for the instruction texts
    pub language: String,
}

/// Raw provider answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsResponse {
    /// Encoded polyline geometry; `None` if the provider sent none
    pub encoded_geometry: Option<String>,
    pub steps: Vec<String>,
}

/// External directions provider.
#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    async fn route(&self, request: &DirectionsRequest) -> Result<DirectionsResponse>;
}

/// Decode a provider answer into a route.
///
/// Missing or implausibly short geometry is a [`NavError::NoRoute`].
pub fn route_from_response(response: DirectionsResponse, precision: u32) -> Result<Route> {
    let encoded = response
        .encoded_geometry
        .filter(|g| !g.is_empty())
        .ok_or_else(|| NavError::NoRoute("response has no geometry".to_string()))?;

    let geometry = polyline::decode(&encoded, precision);
    let valid = geometry.iter().filter(|p| p.is_valid()).count();
    if valid < MIN_ROUTE_POINTS {
        return Err(NavError::NoRoute(format!(
            "geometry decoded to {} usable points",
            valid
        )));
    }

    Route::new(geometry, response.steps)
}

/// Fetch and decode a route in one call.
pub async fn fetch_route<D: DirectionsProvider + ?Sized>(
    provider: &D,
    request: &DirectionsRequest,
    precision: u32,
) -> Result<Route> {
    let response = provider.route(request).await?;
    route_from_response(response, precision)
}

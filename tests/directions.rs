//! Tests for the directions boundary

use async_trait::async_trait;
use spotnav::directions::{fetch_route, route_from_response};
use spotnav::{
    polyline, DirectionsProvider, DirectionsRequest, DirectionsResponse, GpsPoint, NavError,
};

fn response(encoded: Option<&str>) -> DirectionsResponse {
    DirectionsResponse {
        encoded_geometry: encoded.map(str::to_string),
        steps: vec!["Head north".to_string(), "Arrive".to_string()],
    }
}

#[test]
fn test_response_to_route() {
    let points = vec![GpsPoint::new(40.0, -3.7), GpsPoint::new(40.01, -3.7)];
    let encoded = polyline::encode(&points, 6);

    let route = route_from_response(response(Some(&encoded)), 6).unwrap();
    assert_eq!(route.geometry().len(), 2);
    assert_eq!(route.step_count(), 2);
}

#[test]
fn test_missing_geometry_is_no_route() {
    assert!(matches!(
        route_from_response(response(None), 6),
        Err(NavError::NoRoute(_))
    ));
    assert!(matches!(
        route_from_response(response(Some("")), 6),
        Err(NavError::NoRoute(_))
    ));
}

#[test]
fn test_single_point_geometry_is_no_route() {
    let encoded = polyline::encode(&[GpsPoint::new(40.0, -3.7)], 6);
    assert!(matches!(
        route_from_response(response(Some(&encoded)), 6),
        Err(NavError::NoRoute(_))
    ));
}

#[test]
fn test_garbage_geometry_is_no_route() {
    // Bytes below the polyline alphabet stop decoding immediately
    assert!(matches!(
        route_from_response(response(Some("!!!!")), 6),
        Err(NavError::NoRoute(_))
    ));
}

struct FailingDirections;

#[async_trait]
impl DirectionsProvider for FailingDirections {
    async fn route(&self, _request: &DirectionsRequest) -> spotnav::Result<DirectionsResponse> {
        Err(NavError::Directions("quota exceeded".to_string()))
    }
}

#[tokio::test]
async fn test_provider_failure_propagates() {
    let request = DirectionsRequest {
        origin: GpsPoint::new(0.0, 0.0),
        destination: GpsPoint::new(0.0, 1.0),
        language: "en".to_string(),
    };
    let result = fetch_route(&FailingDirections, &request, 6).await;
    assert!(matches!(result, Err(NavError::Directions(ref msg)) if msg == "quota exceeded"));
}

//! Unified error type for the navigation engine.
//!
//! Nothing here is meant to reach the render boundary: the session turns
//! route failures into a retryable "no route" state and weather failures
//! into "keep the current effect".

use thiserror::Error;

/// Errors produced by the navigation engine and its providers.
#[derive(Debug, Error)]
pub enum NavError {
    /// Not enough valid points to form a route.
    #[error("Route has {point_count} points, but {minimum_required} are required")]
    InsufficientPoints {
        point_count: usize,
        minimum_required: usize,
    },

    /// The directions provider answered without a usable route.
    #[error("No route available: {0}")]
    NoRoute(String),

    /// The directions provider failed.
    #[error("Directions request failed: {0}")]
    Directions(String),

    /// The weather provider failed.
    #[error("Weather request failed: {0}")]
    Weather(String),

    /// HTTP transport error.
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A provider did not answer in time.
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The request was superseded or its session ended.
    #[error("Request cancelled")]
    Cancelled,

    /// Configuration could not be parsed or is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NavError>;

/// Conversions from `Option` into engine errors.
pub trait OptionExt<T> {
    /// Map `None` to [`NavError::InsufficientPoints`].
    fn ok_or_insufficient_points(self, point_count: usize, minimum_required: usize) -> Result<T>;

    /// Map `None` to [`NavError::NoRoute`].
    fn ok_or_no_route(self, reason: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_insufficient_points(self, point_count: usize, minimum_required: usize) -> Result<T> {
        self.ok_or(NavError::InsufficientPoints {
            point_count,
            minimum_required,
        })
    }

    fn ok_or_no_route(self, reason: &str) -> Result<T> {
        self.ok_or_else(|| NavError::NoRoute(reason.to_string()))
    }
}

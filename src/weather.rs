//! Rain effect cache.
//!
//! Decides whether the map shows a rain effect for the viewer's area.
//! Lookups are keyed by the position rounded to two decimals and
//! remembered in a single slot for ten minutes, so the provider is asked
//! at most once per key and TTL. A failed lookup keeps whatever effect is
//! currently active instead of switching it off.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::error::{NavError, Result};
use crate::GpsPoint;

/// Configuration for rain effect lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// How long a lookup stays valid for the same key.
    /// Default: 600 seconds
    pub ttl_secs: u64,

    /// Decimal places the position is rounded to for the cache key.
    /// Default: 2
    pub key_precision: u32,

    /// Give up on a provider call after this long.
    /// Default: 10 seconds
    pub fetch_timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            key_precision: 2,
            fetch_timeout_secs: 10,
        }
    }
}

impl WeatherConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Rounded `"lat:lng"` cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationKey(String);

impl LocationKey {
    /// Round a position to `precision` decimals.
    pub fn new(position: &GpsPoint, precision: u32) -> Self {
        Self(format!(
            "{}:{}",
            format_rounded(position.latitude, precision),
            format_rounded(position.longitude, precision)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn format_rounded(value: f64, precision: u32) -> String {
    let factor = 10f64.powi(precision as i32);
    // Adding 0.0 turns -0.0 into 0.0
    let rounded = (value * factor).round() / factor + 0.0;
    format!("{:.*}", precision as usize, rounded)
}

/// Weather at a location as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    /// Total precipitation in mm
    pub precipitation: f64,
    /// Rain in mm
    pub rain: f64,
}

impl WeatherReport {
    pub fn is_raining(&self) -> bool {
        self.rain > 0.0 || self.precipitation > 0.0
    }
}

/// External weather provider.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current weather at a point.
    async fn current(&self, point: GpsPoint) -> Result<WeatherReport>;
}

/// Most recent lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherCacheEntry {
    pub key: LocationKey,
    pub checked_at: Instant,
    pub is_raining: bool,
}

/// Single-slot TTL cache; only the latest lookup is remembered.
#[derive(Debug, Clone)]
pub struct WeatherCache {
    entry: Option<WeatherCacheEntry>,
    ttl: Duration,
}

impl WeatherCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entry: None, ttl }
    }

    /// Cached answer for `key` if it is younger than the TTL.
    pub fn lookup(&self, key: &LocationKey, now: Instant) -> Option<bool> {
        self.entry
            .as_ref()
            .filter(|e| &e.key == key && now.saturating_duration_since(e.checked_at) < self.ttl)
            .map(|e| e.is_raining)
    }

    /// Replace the slot with a fresh answer.
    pub fn store(&mut self, key: LocationKey, now: Instant, is_raining: bool) {
        self.entry = Some(WeatherCacheEntry {
            key,
            checked_at: now,
            is_raining,
        });
    }

    pub fn entry(&self) -> Option<&WeatherCacheEntry> {
        self.entry.as_ref()
    }
}

/// Identifies one issued fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherTicket {
    pub generation: u64,
    pub key: LocationKey,
    pub point: GpsPoint,
}

/// Outcome of [`RainEffect::begin`].
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherCheck {
    /// Fresh cached answer, no fetch needed
    Cached(bool),
    /// A fetch for the same key is already running
    InFlight,
    /// The caller should fetch and report back with the ticket
    Fetch(WeatherTicket),
}

/// Rain effect state: cache, active effect and the in-flight fetch.
pub struct RainEffect<P> {
    provider: Arc<P>,
    config: WeatherConfig,
    cache: WeatherCache,
    active: bool,
    generation: u64,
    pending: Option<WeatherTicket>,
    in_flight: Option<AbortHandle>,
}

impl<P: WeatherProvider + 'static> RainEffect<P> {
    pub fn new(provider: Arc<P>, config: WeatherConfig) -> Self {
        let cache = WeatherCache::new(config.ttl());
        Self {
            provider,
            config,
            cache,
            active: false,
            generation: 0,
            pending: None,
            in_flight: None,
        }
    }

    /// Whether the effect is currently shown.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }

    pub fn provider(&self) -> Arc<P> {
        Arc::clone(&self.provider)
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.config.fetch_timeout()
    }

    /// First half of a lookup.
    ///
    /// A fresh cache hit is answered directly and cancels a pending fetch
    /// for another key. Otherwise a new ticket is issued, superseding any
    /// pending one for a different key; a pending fetch for the same key is
    /// left to finish.
    pub fn begin(&mut self, position: &GpsPoint, now: Instant) -> WeatherCheck {
        let key = LocationKey::new(position, self.config.key_precision);

        if let Some(is_raining) = self.cache.lookup(&key, now) {
            if self.pending.as_ref().is_some_and(|pending| pending.key != key) {
                debug!("Cached answer for {} supersedes pending fetch", key);
                self.abort_in_flight();
            }
            self.active = is_raining;
            return WeatherCheck::Cached(is_raining);
        }

        if let Some(pending) = &self.pending {
            if pending.key == key {
                return WeatherCheck::InFlight;
            }
            debug!("Superseding weather fetch for {} with {}", pending.key, key);
            self.abort_in_flight();
        }

        self.generation += 1;
        let ticket = WeatherTicket {
            generation: self.generation,
            key,
            point: *position,
        };
        self.pending = Some(ticket.clone());
        WeatherCheck::Fetch(ticket)
    }

    /// Register the task running the fetch for the pending ticket so a
    /// later ticket can abort it.
    pub fn track(&mut self, handle: AbortHandle) {
        if let Some(previous) = self.in_flight.replace(handle) {
            previous.abort();
        }
    }

    /// Second half of a lookup.
    ///
    /// Returns the effect to show, or `None` if the ticket was superseded.
    /// Failures keep the current effect.
    pub fn complete(
        &mut self,
        ticket: &WeatherTicket,
        result: Result<WeatherReport>,
        now: Instant,
    ) -> Option<bool> {
        if self.pending.as_ref() != Some(ticket) {
            debug!("Ignoring stale weather result for {}", ticket.key);
            return None;
        }
        self.pending = None;
        self.in_flight = None;

        match result {
            Ok(report) => {
                let is_raining = report.is_raining();
                self.cache.store(ticket.key.clone(), now, is_raining);
                self.active = is_raining;
            }
            Err(e) => {
                warn!(
                    "Weather lookup for {} failed, keeping current effect ({}): {}",
                    ticket.key, self.active, e
                );
            }
        }
        Some(self.active)
    }

    /// Decide whether to show the rain effect at `position`.
    ///
    /// Spawns the provider call on the tokio runtime with the configured
    /// timeout. If this future is dropped mid-fetch, the next call for a
    /// different key aborts the orphaned task.
    pub async fn should_enable_rain_effect(&mut self, position: GpsPoint) -> bool {
        let ticket = match self.begin(&position, Instant::now()) {
            WeatherCheck::Cached(is_raining) => return is_raining,
            // Only reachable when an earlier call was dropped mid-fetch;
            // start over for this key
            WeatherCheck::InFlight => {
                self.abort_in_flight();
                match self.begin(&position, Instant::now()) {
                    WeatherCheck::Fetch(ticket) => ticket,
                    WeatherCheck::Cached(is_raining) => return is_raining,
                    WeatherCheck::InFlight => return self.active,
                }
            }
            WeatherCheck::Fetch(ticket) => ticket,
        };

        let provider = Arc::clone(&self.provider);
        let timeout = self.config.fetch_timeout();
        let point = ticket.point;
        let handle = tokio::spawn(async move { fetch_with_timeout(provider.as_ref(), point, timeout).await });
        self.track(handle.abort_handle());

        let result = match handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(NavError::Cancelled),
            Err(e) => Err(NavError::Weather(e.to_string())),
        };

        self.complete(&ticket, result, Instant::now())
            .unwrap_or(self.active)
    }

    fn abort_in_flight(&mut self) {
        self.pending = None;
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

impl<P> Drop for RainEffect<P> {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

/// Call the provider, mapping an elapsed timeout to [`NavError::Timeout`].
pub async fn fetch_with_timeout<P: WeatherProvider + ?Sized>(
    provider: &P,
    point: GpsPoint,
    timeout: Duration,
) -> Result<WeatherReport> {
    match tokio::time::timeout(timeout, provider.current(point)).await {
        Ok(result) => result,
        Err(_) => Err(NavError::Timeout(timeout)),
    }
}

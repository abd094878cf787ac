//! Event-driven session driver.
//!
//! Geolocation callbacks, feed ticks, user actions and fetch results all
//! arrive as [`DriverEvent`]s on one queue and are processed in order by
//! a single consumer. Network fetches run as spawned tasks that post
//! their result back onto the same queue, tagged with a generation;
//! results for a superseded fetch or an ended session are dropped.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::directions::{self, DirectionsProvider, DirectionsRequest};
use crate::error::Result;
use crate::presence::{PresenceEngine, RawPresence};
use crate::voice::{SpeechSynthesizer, VoiceAnnouncer};
use crate::weather::{self, RainEffect, WeatherCheck, WeatherProvider, WeatherReport, WeatherTicket};
use crate::{GeoFix, GpsPoint, NavigationConfig, Route};

use super::{NavigationSession, RenderUpdate};

/// Input to the driver.
#[derive(Debug)]
pub enum DriverEvent {
    /// Begin navigating to a spot, ending any current session
    StartSession {
        session_id: String,
        destination: GpsPoint,
        language: Option<String>,
    },
    /// Navigation dismissed or the spot changed
    EndSession,
    /// Geolocation callback
    Fix(GeoFix),
    /// Full snapshot of nearby users
    Presence(Vec<RawPresence>),
    /// User asked to hear the instruction again
    RepeatInstruction,
    SetVoiceEnabled(bool),
    SetLanguage(String),
    /// Fetch directions again after a failure
    RetryRoute,
    /// Result of a directions fetch (posted by the driver itself)
    RouteFetched { generation: u64, result: Result<Route> },
    /// Result of a weather fetch (posted by the driver itself)
    WeatherResolved {
        ticket: WeatherTicket,
        result: Result<WeatherReport>,
    },
    /// Stop the driver
    Shutdown,
}

/// Cloneable sender for driver events.
#[derive(Debug, Clone)]
pub struct DriverHandle {
    tx: mpsc::UnboundedSender<DriverEvent>,
}

impl DriverHandle {
    /// Queue an event. Returns `false` once the driver has stopped.
    pub fn send(&self, event: DriverEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn fix(&self, fix: GeoFix) -> bool {
        self.send(DriverEvent::Fix(fix))
    }

    pub fn presence(&self, snapshot: Vec<RawPresence>) -> bool {
        self.send(DriverEvent::Presence(snapshot))
    }

    pub fn start_session(&self, session_id: impl Into<String>, destination: GpsPoint) -> bool {
        self.send(DriverEvent::StartSession {
            session_id: session_id.into(),
            destination,
            language: None,
        })
    }

    pub fn end_session(&self) -> bool {
        self.send(DriverEvent::EndSession)
    }

    pub fn shutdown(&self) -> bool {
        self.send(DriverEvent::Shutdown)
    }
}

type SpeechFactory<S> = Box<dyn FnMut() -> Option<S> + Send>;

/// Single-consumer driver for navigation sessions, presence and weather.
pub struct NavigationDriver<D, W, S> {
    config: NavigationConfig,
    directions: Arc<D>,
    rain: RainEffect<W>,
    presence: PresenceEngine,
    speech: SpeechFactory<S>,

    session: Option<NavigationSession<S>>,
    route_generation: u64,
    route_fetch: Option<AbortHandle>,
    route_requested: bool,

    last_fix: Option<GeoFix>,
    last_snapshot: Vec<RawPresence>,
    rain_shown: Option<bool>,

    tx: mpsc::UnboundedSender<DriverEvent>,
    rx: mpsc::UnboundedReceiver<DriverEvent>,
    updates: mpsc::UnboundedSender<RenderUpdate>,
}

impl<D, W, S> NavigationDriver<D, W, S>
where
    D: DirectionsProvider + 'static,
    W: WeatherProvider + 'static,
    S: SpeechSynthesizer,
{
    /// Create a driver, its event handle and the render update stream.
    ///
    /// `speech` is called once per session to obtain a synthesizer;
    /// returning `None` runs the session without voice.
    pub fn new(
        config: NavigationConfig,
        directions: Arc<D>,
        weather: Arc<W>,
        speech: impl FnMut() -> Option<S> + Send + 'static,
    ) -> (Self, DriverHandle, mpsc::UnboundedReceiver<RenderUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (updates, updates_rx) = mpsc::unbounded_channel();

        let driver = Self {
            rain: RainEffect::new(weather, config.weather.clone()),
            presence: PresenceEngine::with_config(config.presence.clone()),
            config,
            directions,
            speech: Box::new(speech),
            session: None,
            route_generation: 0,
            route_fetch: None,
            route_requested: false,
            last_fix: None,
            last_snapshot: Vec::new(),
            rain_shown: None,
            tx: tx.clone(),
            rx,
            updates,
        };

        (driver, DriverHandle { tx }, updates_rx)
    }

    pub fn session(&self) -> Option<&NavigationSession<S>> {
        self.session.as_ref()
    }

    pub fn presence(&self) -> &PresenceEngine {
        &self.presence
    }

    /// Process events until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        info!("Navigation driver started");
        while let Some(event) = self.rx.recv().await {
            if !self.handle(event) {
                break;
            }
        }
        self.end_session();
        info!("Navigation driver stopped");
    }

    /// Process one event. Returns `false` on shutdown.
    ///
    /// Must be called within a tokio runtime; fetches are spawned from here.
    pub fn handle(&mut self, event: DriverEvent) -> bool {
        match event {
            DriverEvent::StartSession {
                session_id,
                destination,
                language,
            } => self.start_session(session_id, destination, language),
            DriverEvent::EndSession => self.end_session(),
            DriverEvent::Fix(fix) => self.on_fix(fix),
            DriverEvent::Presence(snapshot) => {
                self.last_snapshot = snapshot;
                self.place_presence();
            }
            DriverEvent::RepeatInstruction => {
                if let Some(session) = self.session.as_mut() {
                    session.repeat_instruction();
                }
            }
            DriverEvent::SetVoiceEnabled(enabled) => {
                if let Some(session) = self.session.as_mut() {
                    session.set_voice_enabled(enabled);
                }
            }
            DriverEvent::SetLanguage(language) => {
                if let Some(session) = self.session.as_mut() {
                    session.set_language(language);
                }
            }
            DriverEvent::RetryRoute => {
                if let Some(fix) = self.last_fix {
                    self.request_route(fix.point);
                }
            }
            DriverEvent::RouteFetched { generation, result } => self.on_route(generation, result),
            DriverEvent::WeatherResolved { ticket, result } => {
                if let Some(is_raining) = self.rain.complete(&ticket, result, Instant::now()) {
                    self.show_rain(is_raining);
                }
            }
            DriverEvent::Shutdown => return false,
        }
        true
    }

    fn start_session(&mut self, session_id: String, destination: GpsPoint, language: Option<String>) {
        self.end_session();

        let language = language.unwrap_or_else(|| self.config.default_language.clone());
        let announcer = match (self.speech)() {
            Some(synth) => VoiceAnnouncer::new(synth),
            None => {
                info!("No speech synthesis available, voice guidance disabled");
                VoiceAnnouncer::unavailable()
            }
        };

        info!("Starting session {} to {:?}", session_id, destination);
        self.session = Some(NavigationSession::new(
            session_id,
            destination,
            language,
            announcer,
            self.config.bearing.clone(),
        ));

        if let Some(fix) = self.last_fix {
            self.request_route(fix.point);
        }
    }

    fn end_session(&mut self) {
        if let Some(handle) = self.route_fetch.take() {
            handle.abort();
        }
        // Results of anything still running belong to the old session
        self.route_generation += 1;
        self.route_requested = false;

        if let Some(session) = self.session.take() {
            info!("Ending session {}", session.session_id());
            self.emit(RenderUpdate::SessionEnded {
                session_id: session.session_id().to_string(),
            });
        }
    }

    fn on_fix(&mut self, fix: GeoFix) {
        if !fix.point.is_valid() {
            debug!("Ignoring invalid fix {:?}", fix.point);
            return;
        }
        let first_fix = self.last_fix.is_none();
        self.last_fix = Some(fix);

        if let Some(session) = self.session.as_mut() {
            let updates = session.on_fix(&fix);
            self.emit_all(updates);
            if !self.route_requested {
                self.request_route(fix.point);
            }
        }

        if first_fix && !self.last_snapshot.is_empty() {
            self.place_presence();
        }
        self.check_weather(fix.point);
    }

    fn request_route(&mut self, origin: GpsPoint) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if let Some(handle) = self.route_fetch.take() {
            debug!("Aborting superseded directions fetch");
            handle.abort();
        }

        self.route_generation += 1;
        self.route_requested = true;
        let generation = self.route_generation;
        let request = DirectionsRequest {
            origin,
            destination: session.destination(),
            language: session.language().to_string(),
        };
        let precision = self.config.polyline_precision;
        let provider = Arc::clone(&self.directions);
        let tx = self.tx.clone();

        debug!("Requesting directions (generation {})", generation);
        let handle = tokio::spawn(async move {
            let result = directions::fetch_route(provider.as_ref(), &request, precision).await;
            if tx.send(DriverEvent::RouteFetched { generation, result }).is_err() {
                debug!("Driver gone before directions arrived");
            }
        });
        self.route_fetch = Some(handle.abort_handle());
    }

    fn on_route(&mut self, generation: u64, result: Result<Route>) {
        if generation != self.route_generation {
            debug!(
                "Dropping directions result of generation {} (current {})",
                generation, self.route_generation
            );
            return;
        }
        self.route_fetch = None;
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let updates = match result {
            Ok(route) => {
                let mut updates = session.set_route(route);
                if let Some(fix) = self.last_fix {
                    updates.extend(session.on_fix(&fix));
                }
                updates
            }
            Err(e) => {
                warn!("Directions for session {} failed: {}", session.session_id(), e);
                session.clear_route(&e.to_string())
            }
        };
        self.emit_all(updates);
    }

    fn place_presence(&mut self) {
        let Some(fix) = self.last_fix else {
            debug!("Holding presence snapshot until the viewer position is known");
            return;
        };
        let markers = self.presence.place(&self.last_snapshot, &fix.point);
        self.emit(RenderUpdate::Presence(markers));
    }

    fn check_weather(&mut self, position: GpsPoint) {
        match self.rain.begin(&position, Instant::now()) {
            WeatherCheck::Cached(is_raining) => self.show_rain(is_raining),
            WeatherCheck::InFlight => {}
            WeatherCheck::Fetch(ticket) => {
                let provider = self.rain.provider();
                let timeout = self.rain.fetch_timeout();
                let tx = self.tx.clone();
                let handle = tokio::spawn(async move {
                    let result =
                        weather::fetch_with_timeout(provider.as_ref(), ticket.point, timeout).await;
                    if tx.send(DriverEvent::WeatherResolved { ticket, result }).is_err() {
                        debug!("Driver gone before weather arrived");
                    }
                });
                self.rain.track(handle.abort_handle());
            }
        }
    }

    fn show_rain(&mut self, is_raining: bool) {
        if self.rain_shown != Some(is_raining) {
            self.rain_shown = Some(is_raining);
            self.emit(RenderUpdate::RainEffect(is_raining));
        }
    }

    fn emit(&self, update: RenderUpdate) {
        if self.updates.send(update).is_err() {
            debug!("Render target dropped, discarding update");
        }
    }

    fn emit_all(&self, updates: Vec<RenderUpdate>) {
        for update in updates {
            self.emit(update);
        }
    }
}

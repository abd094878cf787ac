//! # Navigation Session
//!
//! One session per active spot/booking. The session owns the route, the
//! progress tracker, the vehicle pose and the voice announcer, and turns
//! every geolocation fix into render updates: tracker first, then bearing
//! fusion (which needs the fresh closest vertex), then instruction and voice.
//!
//! The [`NavigationDriver`] feeds sessions from a single event queue and
//! runs the network fetches.

pub mod driver;

pub use driver::{DriverEvent, DriverHandle, NavigationDriver};

use log::{debug, info};
use serde::Serialize;

use crate::bearing::{fuse_bearing, BearingConfig, BearingInputs, FusedBearing, VehiclePose};
use crate::presence::PresenceMarker;
use crate::tracker::{RouteProgress, RouteProgressTracker, TrackerState};
use crate::voice::{Announcement, SpeechSynthesizer, VoiceAnnouncer};
use crate::{Bounds, GeoFix, GpsPoint, Route};

/// Everything the map renderer is told to draw.
///
/// Serialized as `{"type": "...", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RenderUpdate {
    /// Vehicle marker position and heading
    Vehicle(VehiclePose),
    /// Full route line
    RouteLine(Vec<GpsPoint>),
    /// Camera should fit these bounds
    FitBounds(Bounds),
    /// Current instruction changed
    Instruction {
        step_index: usize,
        text: String,
        remaining_m: f64,
    },
    /// Presence markers, nearest first
    Presence(Vec<PresenceMarker>),
    /// Directions failed; the caller may retry
    RouteUnavailable { reason: String },
    /// Rain effect on/off
    RainEffect(bool),
    /// The session was torn down
    SessionEnded { session_id: String },
}

/// State of one navigation session.
pub struct NavigationSession<S> {
    session_id: String,
    destination: GpsPoint,
    language: String,
    voice_enabled: bool,
    bearing_config: BearingConfig,

    route: Option<Route>,
    tracker: RouteProgressTracker,
    pose: Option<VehiclePose>,
    prev_fix: Option<GpsPoint>,
    last_progress: Option<RouteProgress>,
    announced_step: Option<usize>,
    announcer: VoiceAnnouncer<S>,
}

impl<S: SpeechSynthesizer> NavigationSession<S> {
    /// Start a session toward `destination`.
    pub fn new(
        session_id: impl Into<String>,
        destination: GpsPoint,
        language: impl Into<String>,
        announcer: VoiceAnnouncer<S>,
        bearing_config: BearingConfig,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            destination,
            language: language.into(),
            voice_enabled: true,
            bearing_config,
            route: None,
            tracker: RouteProgressTracker::new(),
            pose: None,
            prev_fix: None,
            last_progress: None,
            announced_step: None,
            announcer,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn destination(&self) -> GpsPoint {
        self.destination
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn pose(&self) -> Option<&VehiclePose> {
        self.pose.as_ref()
    }

    pub fn tracker_state(&self) -> TrackerState {
        self.tracker.state()
    }

    pub fn last_progress(&self) -> Option<&RouteProgress> {
        self.last_progress.as_ref()
    }

    pub fn announcer(&self) -> &VoiceAnnouncer<S> {
        &self.announcer
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice_enabled
    }

    /// Current step index and instruction text.
    pub fn current_instruction(&self) -> Option<(usize, &str)> {
        let route = self.route.as_ref()?;
        let step = self.tracker.state().current_step_index;
        route.step(step).map(|text| (step, text))
    }

    /// Install a freshly fetched route.
    ///
    /// Tracker state and vehicle pose are reset together, before any
    /// update for the new route is emitted.
    pub fn set_route(&mut self, route: Route) -> Vec<RenderUpdate> {
        info!(
            "Session {}: route with {} points, {} steps, {:.0}m",
            self.session_id,
            route.geometry().len(),
            route.step_count(),
            route.total_distance_m()
        );

        self.tracker.reset();
        self.pose = None;
        self.last_progress = None;
        self.announced_step = None;
        self.announcer.reset();
        self.route = Some(route);

        let mut updates = Vec::with_capacity(3);
        if let Some(route) = &self.route {
            updates.push(RenderUpdate::RouteLine(route.geometry().to_vec()));
            if let Some(bounds) = route.bounds() {
                updates.push(RenderUpdate::FitBounds(bounds));
            }
        }
        updates.extend(self.instruction_update());
        updates
    }

    /// Drop the route after a failed fetch.
    pub fn clear_route(&mut self, reason: &str) -> Vec<RenderUpdate> {
        self.route = None;
        self.tracker.reset();
        self.last_progress = None;
        self.announced_step = None;
        vec![RenderUpdate::RouteUnavailable {
            reason: reason.to_string(),
        }]
    }

    /// Process one geolocation fix.
    ///
    /// Invalid coordinates are ignored.
    pub fn on_fix(&mut self, fix: &GeoFix) -> Vec<RenderUpdate> {
        if !fix.point.is_valid() {
            debug!("Session {}: ignoring invalid fix {:?}", self.session_id, fix.point);
            return Vec::new();
        }

        let progress = self
            .route
            .as_ref()
            .and_then(|route| self.tracker.update_route(route, &fix.point));
        if progress.is_some() {
            self.last_progress = progress;
        }

        let fused = self.fuse(fix, progress.as_ref());
        let pose = VehiclePose {
            position: fix.point,
            bearing_deg: fused.bearing_deg,
            speed_mps: fix.speed_mps,
            heading_deg: fix.heading_deg,
        };
        self.pose = Some(pose);
        self.prev_fix = Some(fix.point);

        let mut updates = vec![RenderUpdate::Vehicle(pose)];
        if progress.is_some() && self.announced_step != Some(self.tracker.state().current_step_index) {
            updates.extend(self.instruction_update());
        }
        updates
    }

    fn fuse(&self, fix: &GeoFix, progress: Option<&RouteProgress>) -> FusedBearing {
        let inputs = BearingInputs {
            prev_fix: self.prev_fix.as_ref(),
            current_fix: &fix.point,
            route_geometry: self.route.as_ref().map(|r| r.geometry()).unwrap_or(&[]),
            closest_index: progress.map(|p| p.closest_index),
            device_heading: fix.heading_deg,
            speed_mps: fix.speed_mps,
            last_bearing: self.pose.map_or(0.0, |p| p.bearing_deg),
        };
        fuse_bearing(&inputs, &self.bearing_config)
    }

    /// Emit the current instruction and speak it.
    fn instruction_update(&mut self) -> Option<RenderUpdate> {
        let route = self.route.as_ref()?;
        let step_index = self.tracker.state().current_step_index;
        let text = route.step(step_index)?.to_string();
        let remaining_m = route.remaining_distance_m(self.tracker.state().last_matched_index);

        self.announced_step = Some(step_index);
        self.announcer
            .announce(&text, step_index, &self.language, self.voice_enabled, false);

        Some(RenderUpdate::Instruction {
            step_index,
            text,
            remaining_m,
        })
    }

    /// Speak the current instruction again (user "repeat" action).
    pub fn repeat_instruction(&mut self) -> Announcement {
        let Some((step, text)) = self.current_instruction() else {
            return Announcement::Empty;
        };
        let text = text.to_string();
        self.announcer
            .announce(&text, step, &self.language, self.voice_enabled, true)
    }

    /// Turn voice guidance on or off.
    ///
    /// Switching it on speaks the current instruction once.
    pub fn set_voice_enabled(&mut self, enabled: bool) -> Announcement {
        self.voice_enabled = enabled;
        let current = self
            .current_instruction()
            .map(|(step, text)| (step, text.to_string()));

        match current {
            Some((step, text)) => self
                .announcer
                .announce(&text, step, &self.language, enabled, false),
            None if enabled => Announcement::Empty,
            None => {
                self.announcer.reset();
                Announcement::Disabled
            }
        }
    }

    /// Change the language used for speech and future directions requests.
    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }
}

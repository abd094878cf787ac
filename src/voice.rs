//! Spoken turn-by-turn instructions.
//!
//! The announcer speaks the current instruction once per `(text, step)`
//! pair. The latest instruction always wins: anything still being spoken
//! is cancelled first, nothing is queued.

use log::{debug, info};
use serde::{Deserialize, Serialize};

/// A synthesis voice offered by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    /// BCP 47 language tag, e.g. "de-DE"
    pub lang: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

/// One request to speak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    /// `None` lets the platform pick its default voice
    pub voice: Option<Voice>,
}

/// Platform text-to-speech.
pub trait SpeechSynthesizer {
    /// Voices currently available.
    fn voices(&self) -> Vec<Voice>;

    /// Stop whatever is being spoken.
    fn cancel(&mut self);

    /// Start speaking an utterance.
    fn speak(&mut self, utterance: Utterance);
}

/// What [`VoiceAnnouncer::announce`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Announcement {
    Spoken,
    /// Same text and step as the last announcement
    Duplicate,
    /// Voice guidance is switched off
    Disabled,
    /// No speech synthesis on this platform
    Unavailable,
    /// Nothing to say
    Empty,
}

/// Pick a voice for a language tag.
///
/// Prefers an exact tag match, then a voice whose tag starts with the
/// requested primary language; otherwise `None` (platform default).
/// Tags compare case-insensitively and `_` is treated as `-`.
pub fn select_voice(voices: &[Voice], lang: &str) -> Option<Voice> {
    let wanted = normalize_tag(lang);
    if wanted.is_empty() {
        return None;
    }

    if let Some(exact) = voices.iter().find(|v| normalize_tag(&v.lang) == wanted) {
        return Some(exact.clone());
    }

    let primary = wanted.split('-').next().unwrap_or(&wanted);
    voices
        .iter()
        .find(|v| {
            let tag = normalize_tag(&v.lang);
            tag == primary || tag.starts_with(&format!("{primary}-"))
        })
        .cloned()
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().replace('_', "-").to_ascii_lowercase()
}

/// Speaks instructions without repeating itself.
pub struct VoiceAnnouncer<S> {
    synth: Option<S>,
    last: Option<(String, usize)>,
}

impl<S: SpeechSynthesizer> VoiceAnnouncer<S> {
    /// Announcer backed by a synthesizer.
    pub fn new(synth: S) -> Self {
        Self {
            synth: Some(synth),
            last: None,
        }
    }

    /// Announcer for a platform without speech; every call is a no-op.
    pub fn unavailable() -> Self {
        Self {
            synth: None,
            last: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.synth.is_some()
    }

    pub fn synthesizer(&self) -> Option<&S> {
        self.synth.as_ref()
    }

    /// Last `(text, step)` that was spoken.
    pub fn last_spoken(&self) -> Option<(&str, usize)> {
        self.last.as_ref().map(|(text, step)| (text.as_str(), *step))
    }

    /// Forget what was spoken so the next call speaks again.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Speak an instruction unless it was the last one spoken.
    ///
    /// `force` repeats the instruction anyway (the user's "repeat"
    /// action). While disabled the announcer clears its memory, so
    /// turning voice back on speaks the current instruction once.
    pub fn announce(
        &mut self,
        text: &str,
        step_index: usize,
        lang: &str,
        enabled: bool,
        force: bool,
    ) -> Announcement {
        if !enabled {
            self.last = None;
            return Announcement::Disabled;
        }
        let Some(synth) = self.synth.as_mut() else {
            return Announcement::Unavailable;
        };
        let text = text.trim();
        if text.is_empty() {
            return Announcement::Empty;
        }

        let is_duplicate = self
            .last
            .as_ref()
            .is_some_and(|(last_text, last_step)| last_text == text && *last_step == step_index);
        if is_duplicate && !force {
            debug!("Skipping repeated instruction for step {}", step_index);
            return Announcement::Duplicate;
        }

        let voice = select_voice(&synth.voices(), lang);
        info!(
            "Speaking step {} in {} ({})",
            step_index,
            lang,
            voice.as_ref().map_or("default voice", |v| v.name.as_str())
        );

        synth.cancel();
        synth.speak(Utterance {
            text: text.to_string(),
            lang: lang.to_string(),
            voice,
        });
        self.last = Some((text.to_string(), step_index));
        Announcement::Spoken
    }
}

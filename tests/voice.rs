//! Tests for spoken instructions

use spotnav::voice::{select_voice, Utterance};
use spotnav::{Announcement, SpeechSynthesizer, Voice, VoiceAnnouncer};

#[derive(Default)]
struct RecordingSpeech {
    voices: Vec<Voice>,
    spoken: Vec<Utterance>,
    cancels: usize,
}

impl SpeechSynthesizer for RecordingSpeech {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn cancel(&mut self) {
        self.cancels += 1;
    }

    fn speak(&mut self, utterance: Utterance) {
        self.spoken.push(utterance);
    }
}

fn announcer() -> VoiceAnnouncer<RecordingSpeech> {
    VoiceAnnouncer::new(RecordingSpeech {
        voices: vec![Voice::new("Anna", "de-DE"), Voice::new("Samantha", "en-US")],
        ..RecordingSpeech::default()
    })
}

fn spoken(announcer: &VoiceAnnouncer<RecordingSpeech>) -> Vec<String> {
    announcer
        .synthesizer()
        .map(|s| s.spoken.iter().map(|u| u.text.clone()).collect())
        .unwrap_or_default()
}

#[test]
fn test_same_instruction_is_spoken_once() {
    let mut voice = announcer();
    assert_eq!(voice.announce("Turn left", 1, "en", true, false), Announcement::Spoken);
    assert_eq!(voice.announce("Turn left", 1, "en", true, false), Announcement::Duplicate);
    assert_eq!(spoken(&voice), vec!["Turn left"]);
    assert_eq!(voice.last_spoken(), Some(("Turn left", 1)));
}

#[test]
fn test_same_text_on_new_step_is_spoken() {
    let mut voice = announcer();
    voice.announce("Turn left", 1, "en", true, false);
    assert_eq!(voice.announce("Turn left", 2, "en", true, false), Announcement::Spoken);
    assert_eq!(spoken(&voice).len(), 2);
}

#[test]
fn test_force_repeats() {
    let mut voice = announcer();
    voice.announce("Turn right", 0, "en", true, false);
    assert_eq!(voice.announce("Turn right", 0, "en", true, true), Announcement::Spoken);
    assert_eq!(spoken(&voice), vec!["Turn right", "Turn right"]);
}

#[test]
fn test_latest_instruction_cancels_current_speech() {
    let mut voice = announcer();
    voice.announce("First", 0, "en", true, false);
    voice.announce("Second", 1, "en", true, false);
    assert_eq!(voice.synthesizer().unwrap().cancels, 2);
}

#[test]
fn test_disable_then_enable_speaks_again() {
    let mut voice = announcer();
    voice.announce("Keep right", 3, "en", true, false);
    assert_eq!(voice.announce("Keep right", 3, "en", false, false), Announcement::Disabled);
    assert_eq!(voice.last_spoken(), None);
    assert_eq!(voice.announce("Keep right", 3, "en", true, false), Announcement::Spoken);
    assert_eq!(spoken(&voice).len(), 2);
}

#[test]
fn test_unavailable_and_empty() {
    let mut silent: VoiceAnnouncer<RecordingSpeech> = VoiceAnnouncer::unavailable();
    assert!(!silent.is_available());
    assert_eq!(silent.announce("Go", 0, "en", true, false), Announcement::Unavailable);

    let mut voice = announcer();
    assert_eq!(voice.announce("   ", 0, "en", true, false), Announcement::Empty);
    assert!(spoken(&voice).is_empty());
}

#[test]
fn test_utterance_uses_selected_voice() {
    let mut voice = announcer();
    voice.announce("Links abbiegen", 0, "de", true, false);
    let utterance = &voice.synthesizer().unwrap().spoken[0];
    assert_eq!(utterance.lang, "de");
    assert_eq!(utterance.voice.as_ref().map(|v| v.name.as_str()), Some("Anna"));
}

#[test]
fn test_select_voice() {
    let voices = vec![
        Voice::new("British", "en-GB"),
        Voice::new("American", "en-US"),
        Voice::new("Thomas", "fr_FR"),
    ];

    // Exact match beats the first prefix match
    assert_eq!(select_voice(&voices, "en-US").unwrap().name, "American");
    assert_eq!(select_voice(&voices, "EN-us").unwrap().name, "American");
    // Prefix match on the primary language
    assert_eq!(select_voice(&voices, "en").unwrap().name, "British");
    assert_eq!(select_voice(&voices, "en-AU").unwrap().name, "British");
    // Underscore tags are normalized
    assert_eq!(select_voice(&voices, "fr-FR").unwrap().name, "Thomas");
    assert!(select_voice(&voices, "de").is_none());
    assert!(select_voice(&voices, "").is_none());
    assert!(select_voice(&[], "en").is_none());
}

use crate::core::events::{EventBus, StateEvent};
use crate::core::playback::{detect_language, PlaybackPhase, PlaybackState, QueueItem};
use crate::core::script::{character_map, CharacterMap, Script};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const AUTO_LANGUAGE: &str = "auto";
pub const DEFAULT_LINE_FONT_SIZE: u32 = 18;
pub const DEFAULT_SPEECH_RATE: f32 = 1.0;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VoiceInfo {
    pub lang: String,
    pub name: String,
}

/// Everything a rehearsal session knows: the loaded script, the actor's
/// choices and where playback stands. Every mutation is announced on the
/// [`EventBus`].
pub struct RehearsalState {
    events: EventBus,
    script: Option<Arc<Script>>,
    character_map: CharacterMap,
    selected_character_id: Option<String>,
    hide_own_lines: bool,
    line_font_size: u32,
    speech_rate: f32,
    preferred_language: String,
    voices: Vec<VoiceInfo>,
    playback: PlaybackState,
}

impl RehearsalState {
    pub fn new(events: EventBus) -> Self {
        Self {
            events,
            script: None,
            character_map: CharacterMap::default(),
            selected_character_id: None,
            hide_own_lines: true,
            line_font_size: DEFAULT_LINE_FONT_SIZE,
            speech_rate: DEFAULT_SPEECH_RATE,
            preferred_language: AUTO_LANGUAGE.to_string(),
            voices: Vec::new(),
            playback: PlaybackState::default(),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // --- Script ---

    pub fn script(&self) -> Option<&Arc<Script>> {
        self.script.as_ref()
    }

    pub fn character_map(&self) -> &CharacterMap {
        &self.character_map
    }

    pub fn set_play_data(&mut self, script: Script) {
        let script = Arc::new(script);
        self.character_map = character_map(&script.characters);
        self.script = Some(script.clone());
        self.reset_playback();
        self.events.emit(StateEvent::PlayDataChanged(script));
    }

    // --- Selection & preferences ---

    pub fn selected_character_id(&self) -> Option<&str> {
        self.selected_character_id.as_deref()
    }

    /// An empty id clears the selection. Picking a character always hides
    /// their lines again.
    pub fn select_character(&mut self, character_id: &str) {
        self.selected_character_id = if character_id.is_empty() {
            None
        } else {
            Some(character_id.to_string())
        };
        self.hide_own_lines = true;
        self.events
            .emit(StateEvent::CharacterSelected(self.selected_character_id.clone()));
        self.events.emit(StateEvent::HideOwnLinesChanged(true));
    }

    pub fn hide_own_lines(&self) -> bool {
        self.hide_own_lines
    }

    pub fn set_hide_own_lines(&mut self, hide: bool) {
        self.hide_own_lines = hide;
        self.events.emit(StateEvent::HideOwnLinesChanged(hide));
    }

    pub fn line_font_size(&self) -> u32 {
        self.line_font_size
    }

    pub fn set_line_font_size(&mut self, size: u32) {
        self.line_font_size = size;
        self.events.emit(StateEvent::LineFontSizeChanged(size));
    }

    pub fn speech_rate(&self) -> f32 {
        self.speech_rate
    }

    pub fn set_speech_rate(&mut self, rate: f32) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            bail!("Invalid speech rate: {}", rate);
        }
        self.speech_rate = rate;
        self.events.emit(StateEvent::SpeechRateChanged(rate));
        Ok(())
    }

    pub fn preferred_language(&self) -> &str {
        &self.preferred_language
    }

    pub fn set_preferred_language(&mut self, language: &str) {
        let language = language.trim();
        self.preferred_language = if language.is_empty() {
            AUTO_LANGUAGE.to_string()
        } else {
            language.to_string()
        };
        self.events.emit(StateEvent::PreferredLanguageChanged(
            self.preferred_language.clone(),
        ));
    }

    /// The explicit preference, or a guess from the text under `auto`.
    pub fn language_for(&self, text: &str) -> String {
        if self.preferred_language != AUTO_LANGUAGE {
            return self.preferred_language.clone();
        }
        detect_language(text).to_string()
    }

    pub fn voices(&self) -> &[VoiceInfo] {
        &self.voices
    }

    pub fn set_voices(&mut self, voices: Vec<VoiceInfo>) {
        self.voices = voices.clone();
        self.events.emit(StateEvent::VoicesChanged(voices));
    }

    // --- Playback ---

    pub fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    pub fn is_playing(&self) -> bool {
        self.playback.phase.is_playing()
    }

    pub fn is_paused(&self) -> bool {
        self.playback.phase.is_paused()
    }

    pub fn is_auto_paused_for_user(&self) -> bool {
        self.playback.phase.is_auto_paused_for_user()
    }

    pub fn active_line_index(&self) -> Option<usize> {
        self.playback.phase.active_line_index()
    }

    pub fn playback_queue(&self) -> &[QueueItem] {
        &self.playback.queue
    }

    pub fn current_queue_index(&self) -> usize {
        self.playback.current_queue_index
    }

    pub(crate) fn update_playback<F>(&mut self, update: F)
    where
        F: FnOnce(&mut PlaybackState),
    {
        let previous_line = self.active_line_index();
        update(&mut self.playback);
        debug_assert!(self.playback.current_queue_index <= self.playback.queue.len());

        self.events
            .emit(StateEvent::PlaybackStateChanged(self.playback.snapshot()));
        let active_line = self.active_line_index();
        if active_line != previous_line {
            self.events.emit(StateEvent::ActiveLineChanged(active_line));
        }
    }

    pub(crate) fn set_phase(&mut self, phase: PlaybackPhase) {
        self.update_playback(|playback| playback.phase = phase);
    }

    /// Back to idle with an empty queue.
    pub(crate) fn reset_playback(&mut self) {
        self.playback = PlaybackState::default();
        self.events
            .emit(StateEvent::PlaybackStateChanged(self.playback.snapshot()));
        self.events.emit(StateEvent::ActiveLineChanged(None));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::StateEventKind;
    use std::sync::Mutex;

    #[test]
    fn test_set_play_data_builds_map_and_resets() {
        let events = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = events.subscribe(StateEventKind::PlayDataChanged, move |e| {
            sink.lock().unwrap().push(e.kind());
        });

        let mut state = RehearsalState::new(events);
        state.set_play_data(Script::fallback());

        assert_eq!(state.character_map().get("tomas"), Some("Tomás"));
        assert!(!state.is_playing());
        assert_eq!(state.current_queue_index(), 0);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_select_character_forces_hidden_lines() {
        let mut state = RehearsalState::new(EventBus::new());
        state.set_hide_own_lines(false);
        state.select_character("aurora");
        assert_eq!(state.selected_character_id(), Some("aurora"));
        assert!(state.hide_own_lines());

        state.select_character("");
        assert_eq!(state.selected_character_id(), None);
    }

    #[test]
    fn test_speech_rate_validation() {
        let mut state = RehearsalState::new(EventBus::new());
        assert!(state.set_speech_rate(1.3).is_ok());
        assert!(state.set_speech_rate(0.0).is_err());
        assert!(state.set_speech_rate(f32::NAN).is_err());
        assert_eq!(state.speech_rate(), 1.3);
    }

    #[test]
    fn test_language_preference() {
        let mut state = RehearsalState::new(EventBus::new());
        assert_eq!(state.language_for("I love the night"), "en-US");

        state.set_preferred_language("fr-FR");
        assert_eq!(state.language_for("I love the night"), "fr-FR");

        state.set_preferred_language(" ");
        assert_eq!(state.preferred_language(), AUTO_LANGUAGE);
    }
}

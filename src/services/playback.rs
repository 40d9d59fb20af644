use crate::core::config::NarrationConfig;
use crate::core::events::EventBus;
use crate::core::playback::{
    build_queue, clamp_queue_index, InFlight, PlaybackPhase, UtteranceId,
};
use crate::core::script::{display_names, has_lines_excluding, is_own_line, Script};
use crate::core::state::RehearsalState;
use crate::services::speech::{SpeakRequest, SpeechEngine, SpeechOutcome};
use log::{debug, info, warn};

/// What the controller reports back to the presentation layer, besides state
/// events. Refusals leave the state untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSignal {
    Started,
    Paused,
    Resumed,
    Stopped,
    Finished,
    YourTurn,
    Continuing,
    Error(String),
    NoCharacter,
    NoPlay,
    NoOtherLines,
    SpeechUnavailable,
    JumpError,
}

impl PlaybackSignal {
    /// Translation key of the status message for this signal.
    pub fn status_key(&self) -> &'static str {
        match self {
            PlaybackSignal::Started => "status.playingOthers",
            PlaybackSignal::Paused => "status.playbackPaused",
            PlaybackSignal::Resumed => "status.playbackResumed",
            PlaybackSignal::Stopped => "status.playbackStopped",
            PlaybackSignal::Finished => "status.playbackFinished",
            PlaybackSignal::YourTurn => "status.yourTurn",
            PlaybackSignal::Continuing => "status.continuing",
            PlaybackSignal::Error(_) => "status.speechError",
            PlaybackSignal::NoCharacter => "status.selectCharacterFirst",
            PlaybackSignal::NoPlay => "status.noPlayLoaded",
            PlaybackSignal::NoOtherLines => "status.noOtherLines",
            PlaybackSignal::SpeechUnavailable => "status.speechUnavailable",
            PlaybackSignal::JumpError => "status.jumpError",
        }
    }
}

pub type SignalSink = Box<dyn FnMut(PlaybackSignal) + Send>;

/// Walks the script queue: narrates other characters' lines through the
/// speech engine and stops on the actor's own lines until they continue.
pub struct PlaybackController {
    state: RehearsalState,
    engine: Box<dyn SpeechEngine>,
    narration: NarrationConfig,
    signals: SignalSink,
    last_utterance: u64,
}

impl PlaybackController {
    pub fn new(engine: Box<dyn SpeechEngine>, events: EventBus, narration: NarrationConfig) -> Self {
        Self {
            state: RehearsalState::new(events),
            engine,
            narration,
            signals: Box::new(|_| {}),
            last_utterance: 0,
        }
    }

    pub fn on_signal<F>(&mut self, sink: F)
    where
        F: FnMut(PlaybackSignal) + Send + 'static,
    {
        self.signals = Box::new(sink);
    }

    pub fn state(&self) -> &RehearsalState {
        &self.state
    }

    pub fn engine(&self) -> &dyn SpeechEngine {
        self.engine.as_ref()
    }

    fn signal(&mut self, signal: PlaybackSignal) {
        debug!("Playback signal: {:?}", signal);
        (self.signals)(signal);
    }

    // --- Session setup & preferences ---

    pub fn set_play_data(&mut self, script: Script) {
        if self.state.is_playing() {
            self.engine.cancel();
        }
        info!("Loaded script '{}' with {} lines", script.title, script.lines.len());
        self.state.set_play_data(script);
    }

    pub fn select_character(&mut self, character_id: &str) {
        if self.state.is_playing() {
            self.engine.cancel();
            self.state.reset_playback();
        }
        self.state.select_character(character_id);
    }

    pub fn set_hide_own_lines(&mut self, hide: bool) {
        self.state.set_hide_own_lines(hide);
    }

    pub fn set_line_font_size(&mut self, size: u32) {
        self.state.set_line_font_size(size);
    }

    /// Takes effect from the next narrated line.
    pub fn set_speech_rate(&mut self, rate: f32) {
        if let Err(e) = self.state.set_speech_rate(rate) {
            warn!("{}", e);
        }
    }

    pub fn set_preferred_language(&mut self, language: &str) {
        self.state.set_preferred_language(language);
    }

    pub fn refresh_voices(&mut self) {
        let voices = self.engine.voices();
        self.state.set_voices(voices);
    }

    // --- Commands ---

    pub fn start(&mut self) {
        self.start_at(0);
    }

    /// Builds a fresh queue and plays from `index` (clamped into the queue).
    /// Also used while already playing, replacing the running queue.
    pub fn start_at(&mut self, index: usize) {
        if !self.engine.is_supported() {
            self.signal(PlaybackSignal::SpeechUnavailable);
            return;
        }
        let Some(character_id) = self.state.selected_character_id().map(str::to_string) else {
            self.signal(PlaybackSignal::NoCharacter);
            return;
        };
        let Some(script) = self.state.script().cloned() else {
            self.signal(PlaybackSignal::NoPlay);
            return;
        };
        if !has_lines_excluding(&script.lines, &character_id) {
            self.signal(PlaybackSignal::NoOtherLines);
            return;
        }

        self.engine.cancel();

        let queue = build_queue(&script.lines);
        let cursor = clamp_queue_index(index, queue.len());
        info!("Starting playback at line {} as '{}'", cursor, character_id);
        self.state.update_playback(|playback| {
            playback.queue = queue;
            playback.current_queue_index = cursor;
            playback.phase = PlaybackPhase::Advancing;
        });

        self.signal(PlaybackSignal::Started);
        self.advance();
    }

    /// `target` is the raw line index handed over by the presentation layer.
    pub fn jump_to_line(&mut self, target: &str) {
        let Ok(index) = target.trim().parse::<i64>() else {
            warn!("Cannot jump to line '{}'", target);
            self.signal(PlaybackSignal::JumpError);
            return;
        };
        self.start_at(usize::try_from(index).unwrap_or(0));
    }

    pub fn toggle_play_pause(&mut self) {
        if !self.engine.is_supported() {
            self.signal(PlaybackSignal::SpeechUnavailable);
            return;
        }

        match self.state.playback().phase() {
            PlaybackPhase::Idle => self.start_at(0),
            // Only the continue action moves past the actor's line
            PlaybackPhase::WaitingForActor { .. } => {}
            PlaybackPhase::Speaking(in_flight) => self.pause(Some(in_flight)),
            PlaybackPhase::Advancing => self.pause(None),
            PlaybackPhase::UserPaused(in_flight) => self.resume(in_flight),
        }
    }

    fn pause(&mut self, in_flight: Option<InFlight>) {
        if self.engine.is_speaking() && !self.engine.is_paused() {
            self.engine.pause();
        }
        self.state.set_phase(PlaybackPhase::UserPaused(in_flight));
        self.signal(PlaybackSignal::Paused);
    }

    fn resume(&mut self, in_flight: Option<InFlight>) {
        if self.engine.is_paused() {
            self.engine.resume();
        }
        match in_flight {
            Some(in_flight) => {
                self.state.set_phase(PlaybackPhase::Speaking(in_flight));
                self.signal(PlaybackSignal::Resumed);
            }
            None => {
                self.state.set_phase(PlaybackPhase::Advancing);
                self.signal(PlaybackSignal::Resumed);
                self.advance();
            }
        }
    }

    pub fn continue_after_actor(&mut self) {
        if !self.state.is_auto_paused_for_user() {
            return;
        }
        self.state.update_playback(|playback| {
            playback.current_queue_index += 1;
            playback.phase = PlaybackPhase::Advancing;
        });
        self.signal(PlaybackSignal::Continuing);
        self.advance();
    }

    pub fn stop(&mut self) {
        if !self.engine.is_supported() {
            return;
        }
        self.engine.cancel();
        self.state.reset_playback();
        self.signal(PlaybackSignal::Stopped);
    }

    // --- Speech outcomes ---

    pub fn handle_speech_outcome(&mut self, outcome: SpeechOutcome) {
        let current = self.state.playback().phase().in_flight();
        if current.map(|f| f.utterance) != Some(outcome.utterance()) {
            debug!("Ignoring stale outcome for utterance {}", outcome.utterance());
            return;
        }

        match outcome {
            SpeechOutcome::Finished(_) => {
                let paused = self.state.is_paused();
                self.state.update_playback(|playback| {
                    playback.current_queue_index += 1;
                    playback.phase = if paused {
                        PlaybackPhase::UserPaused(None)
                    } else {
                        PlaybackPhase::Advancing
                    };
                });
                if !paused {
                    self.advance();
                }
            }
            SpeechOutcome::Failed { utterance, reason } => {
                warn!("Speech failed for utterance {}: {}", utterance, reason);
                self.state.set_phase(PlaybackPhase::Idle);
                self.signal(PlaybackSignal::Error(reason));
            }
        }
    }

    /// Moves the cursor to its next resting point: finished, the actor's
    /// turn, or a line handed to the speech engine.
    fn advance(&mut self) {
        if self.state.playback().phase() != PlaybackPhase::Advancing {
            return;
        }

        let cursor = self.state.current_queue_index();
        let Some(item) = self.state.playback_queue().get(cursor).cloned() else {
            info!("Reached the end of the script");
            self.state.set_phase(PlaybackPhase::Idle);
            self.signal(PlaybackSignal::Finished);
            return;
        };

        let character_id = self.state.selected_character_id().unwrap_or_default();
        if is_own_line(&item.line, character_id) {
            self.state.set_phase(PlaybackPhase::WaitingForActor {
                line: item.original_index,
            });
            self.signal(PlaybackSignal::YourTurn);
            return;
        }

        let names = display_names(
            &item.line,
            self.state.character_map(),
            &self.narration.separator,
        );
        let text = format!("{} {}: {}", names, self.narration.verb, item.line.text);
        let language = self.state.language_for(&item.line.text);

        self.last_utterance += 1;
        let utterance = UtteranceId(self.last_utterance);
        self.state.set_phase(PlaybackPhase::Speaking(InFlight {
            line: item.original_index,
            utterance,
        }));

        debug!("Speaking line {} as utterance {}", item.original_index, utterance);
        self.engine.speak(SpeakRequest {
            utterance,
            text,
            language,
            rate: self.state.speech_rate(),
        });
    }
}

use crate::core::config::SpeechConfig;
use crate::core::playback::UtteranceId;
pub use crate::core::state::VoiceInfo;
use anyhow::{anyhow, Result};
use log::info;
use tokio::sync::mpsc;

pub mod console;

pub type OutcomeSender = mpsc::UnboundedSender<SpeechOutcome>;
pub type OutcomeReceiver = mpsc::UnboundedReceiver<SpeechOutcome>;

#[derive(Debug, Clone, PartialEq)]
pub struct SpeakRequest {
    pub utterance: UtteranceId,
    pub text: String,
    pub language: String,
    pub rate: f32,
}

/// How a `speak` request ended. Engines report exactly one outcome per
/// request, through their [`OutcomeSender`], unless the request was
/// cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    Finished(UtteranceId),
    Failed { utterance: UtteranceId, reason: String },
}

impl SpeechOutcome {
    pub fn utterance(&self) -> UtteranceId {
        match self {
            SpeechOutcome::Finished(utterance) => *utterance,
            SpeechOutcome::Failed { utterance, .. } => *utterance,
        }
    }
}

pub fn outcome_channel() -> (OutcomeSender, OutcomeReceiver) {
    mpsc::unbounded_channel()
}

/// Text-to-speech capability driven by the playback controller.
///
/// `speak` is fire-and-forget: the outcome must arrive later on the outcome
/// channel, never from inside the call. `pause` and `resume` are best effort.
/// `cancel` silences the current utterance and suppresses its outcome.
pub trait SpeechEngine: Send + Sync {
    fn is_supported(&self) -> bool;
    fn speak(&self, request: SpeakRequest);
    fn pause(&self);
    fn resume(&self);
    fn cancel(&self);
    fn is_speaking(&self) -> bool;
    fn is_paused(&self) -> bool;

    fn voices(&self) -> Vec<VoiceInfo> {
        Vec::new()
    }

    /// Engines with a fixed inventory report it once, right away.
    fn on_voices_changed(&self, callback: Box<dyn Fn() + Send + Sync>) {
        callback();
    }
}

/// Stands in for a platform without speech synthesis.
pub struct MuteSpeech {
    outcomes: OutcomeSender,
}

impl MuteSpeech {
    pub fn new(outcomes: OutcomeSender) -> Self {
        Self { outcomes }
    }
}

impl SpeechEngine for MuteSpeech {
    fn is_supported(&self) -> bool {
        false
    }

    fn speak(&self, request: SpeakRequest) {
        let _ = self.outcomes.send(SpeechOutcome::Failed {
            utterance: request.utterance,
            reason: "speech synthesis unavailable".to_string(),
        });
    }

    fn pause(&self) {}
    fn resume(&self) {}
    fn cancel(&self) {}

    fn is_speaking(&self) -> bool {
        false
    }

    fn is_paused(&self) -> bool {
        false
    }
}

pub fn create_speech_engine(
    config: &SpeechConfig,
    outcomes: OutcomeSender,
) -> Result<Box<dyn SpeechEngine>> {
    info!("Initializing speech engine for provider: {}", config.provider);
    match config.provider.as_str() {
        "console" => Ok(Box::new(console::ConsoleSpeech::new(
            config.words_per_minute,
            outcomes,
        ))),
        "mute" => Ok(Box::new(MuteSpeech::new(outcomes))),
        _ => Err(anyhow!("Unknown speech provider: {}", config.provider)),
    }
}

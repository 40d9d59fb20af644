use crate::core::playback::UtteranceId;
use crate::services::speech::{OutcomeSender, SpeakRequest, SpeechEngine, SpeechOutcome, VoiceInfo};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;

const TICK: Duration = Duration::from_millis(50);
const MIN_UTTERANCE: Duration = Duration::from_millis(400);

struct Utterance {
    id: UtteranceId,
    paused: AtomicBool,
    cancelled: AtomicBool,
    done: AtomicBool,
}

impl Utterance {
    fn is_live(&self) -> bool {
        !self.done.load(Ordering::SeqCst) && !self.cancelled.load(Ordering::SeqCst)
    }
}

/// Prints each line instead of voicing it and takes roughly as long as
/// reading it aloud would.
pub struct ConsoleSpeech {
    words_per_minute: u32,
    outcomes: OutcomeSender,
    current: Mutex<Option<Arc<Utterance>>>,
}

impl ConsoleSpeech {
    pub fn new(words_per_minute: u32, outcomes: OutcomeSender) -> Self {
        Self {
            words_per_minute,
            outcomes,
            current: Mutex::new(None),
        }
    }

    fn current(&self) -> Option<Arc<Utterance>> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(|u| u.is_live())
    }
}

pub fn utterance_duration(text: &str, words_per_minute: u32, rate: f32) -> Duration {
    let words = text.split_whitespace().count().max(1) as f64;
    let per_minute = words_per_minute.max(1) as f64 * (rate as f64).max(0.1);
    Duration::from_secs_f64(words * 60.0 / per_minute).max(MIN_UTTERANCE)
}

impl SpeechEngine for ConsoleSpeech {
    fn is_supported(&self) -> bool {
        true
    }

    fn speak(&self, request: SpeakRequest) {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("No async runtime to speak on: {}", e);
                let _ = self.outcomes.send(SpeechOutcome::Failed {
                    utterance: request.utterance,
                    reason: e.to_string(),
                });
                return;
            }
        };

        let utterance = Arc::new(Utterance {
            id: request.utterance,
            paused: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            done: AtomicBool::new(false),
        });
        if let Some(previous) = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(utterance.clone())
        {
            previous.cancelled.store(true, Ordering::SeqCst);
        }

        println!("  🔊 [{}] {}", request.language, request.text);
        let duration = utterance_duration(&request.text, self.words_per_minute, request.rate);
        let outcomes = self.outcomes.clone();

        handle.spawn(async move {
            let mut remaining = duration;
            while !remaining.is_zero() {
                if utterance.cancelled.load(Ordering::SeqCst) {
                    debug!("Utterance {} cancelled", utterance.id);
                    return;
                }
                tokio::time::sleep(TICK).await;
                if !utterance.paused.load(Ordering::SeqCst) {
                    remaining = remaining.saturating_sub(TICK);
                }
            }

            utterance.done.store(true, Ordering::SeqCst);
            if !utterance.cancelled.load(Ordering::SeqCst) {
                let _ = outcomes.send(SpeechOutcome::Finished(utterance.id));
            }
        });
    }

    fn pause(&self) {
        if let Some(utterance) = self.current() {
            utterance.paused.store(true, Ordering::SeqCst);
        }
    }

    fn resume(&self) {
        if let Some(utterance) = self.current() {
            utterance.paused.store(false, Ordering::SeqCst);
        }
    }

    fn cancel(&self) {
        if let Some(utterance) = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            utterance.cancelled.store(true, Ordering::SeqCst);
        }
    }

    fn is_speaking(&self) -> bool {
        self.current().is_some()
    }

    fn is_paused(&self) -> bool {
        self.current()
            .map_or(false, |u| u.paused.load(Ordering::SeqCst))
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        vec![
            VoiceInfo {
                lang: "es-ES".to_string(),
                name: "Consola (es-ES)".to_string(),
            },
            VoiceInfo {
                lang: "en-US".to_string(),
                name: "Console (en-US)".to_string(),
            },
        ]
    }
}

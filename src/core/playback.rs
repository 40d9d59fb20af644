use crate::core::script::Line;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub const LANGUAGE_SPANISH: &str = "es-ES";
pub const LANGUAGE_ENGLISH: &str = "en-US";

const SPANISH_MARKS: &[char] = &['á', 'é', 'í', 'ó', 'ú', 'ñ', 'ü', '¿', '¡'];
const SPANISH_WORDS: &[&str] = &["que", "para", "sueño", "besos", "nadie", "corte"];
const ENGLISH_WORDS: &[&str] = &["the", "and", "but", "you", "love", "night"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueItem {
    pub line: Line,
    pub original_index: usize,
}

/// Identifies one `speak` request so late outcomes can be told apart from
/// the current one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A line handed to the speech engine and not yet resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InFlight {
    pub line: usize,
    pub utterance: UtteranceId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PlaybackPhase {
    #[default]
    Idle,
    /// Playing, not paused, next line not dispatched yet.
    Advancing,
    Speaking(InFlight),
    /// Paused by the user. Holds the utterance that was interrupted, if any.
    UserPaused(Option<InFlight>),
    /// Cursor rests on a line of the selected character.
    WaitingForActor { line: usize },
}

impl PlaybackPhase {
    pub fn is_playing(&self) -> bool {
        !matches!(self, PlaybackPhase::Idle)
    }

    pub fn is_paused(&self) -> bool {
        matches!(
            self,
            PlaybackPhase::UserPaused(_) | PlaybackPhase::WaitingForActor { .. }
        )
    }

    pub fn is_auto_paused_for_user(&self) -> bool {
        matches!(self, PlaybackPhase::WaitingForActor { .. })
    }

    pub fn active_line_index(&self) -> Option<usize> {
        match self {
            PlaybackPhase::Speaking(in_flight) => Some(in_flight.line),
            PlaybackPhase::UserPaused(in_flight) => in_flight.map(|f| f.line),
            PlaybackPhase::WaitingForActor { line } => Some(*line),
            PlaybackPhase::Idle | PlaybackPhase::Advancing => None,
        }
    }

    pub fn in_flight(&self) -> Option<InFlight> {
        match self {
            PlaybackPhase::Speaking(in_flight) => Some(*in_flight),
            PlaybackPhase::UserPaused(in_flight) => *in_flight,
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub is_paused: bool,
    pub is_auto_paused_for_user: bool,
    pub current_queue_index: usize,
}

#[derive(Clone, Debug)]
pub struct PlaybackState {
    pub(crate) phase: PlaybackPhase,
    pub(crate) queue: Arc<[QueueItem]>,
    pub(crate) current_queue_index: usize,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            phase: PlaybackPhase::Idle,
            queue: Arc::from(Vec::new()),
            current_queue_index: 0,
        }
    }
}

impl PlaybackState {
    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn queue(&self) -> &Arc<[QueueItem]> {
        &self.queue
    }

    pub fn current_queue_index(&self) -> usize {
        self.current_queue_index
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            is_playing: self.phase.is_playing(),
            is_paused: self.phase.is_paused(),
            is_auto_paused_for_user: self.phase.is_auto_paused_for_user(),
            current_queue_index: self.current_queue_index,
        }
    }
}

pub fn build_queue(lines: &[Line]) -> Arc<[QueueItem]> {
    lines
        .iter()
        .enumerate()
        .map(|(original_index, line)| QueueItem {
            line: line.clone(),
            original_index,
        })
        .collect()
}

pub fn clamp_queue_index(requested: usize, queue_len: usize) -> usize {
    if queue_len == 0 {
        return 0;
    }
    requested.min(queue_len - 1)
}

/// Guesses a speech language tag for a line. Leans towards Spanish: anything
/// without a clear English marker is read as `es-ES`.
pub fn detect_language(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if lower.chars().any(|c| SPANISH_MARKS.contains(&c)) {
        return LANGUAGE_SPANISH;
    }

    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words.iter().any(|w| SPANISH_WORDS.contains(w)) {
        return LANGUAGE_SPANISH;
    }
    if words.iter().any(|w| ENGLISH_WORDS.contains(w)) {
        return LANGUAGE_ENGLISH;
    }
    LANGUAGE_SPANISH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("¿Qué pasa?"), "es-ES");
        assert_eq!(detect_language("I love the night"), "en-US");
        assert_eq!(detect_language("Xyzzy"), "es-ES");
        assert_eq!(detect_language("AÚN NO"), "es-ES");
        assert_eq!(detect_language("Dime que you are here"), "es-ES");
        // Whole words only
        assert_eq!(detect_language("Theater"), "es-ES");
        assert_eq!(detect_language("Hello, YOU!"), "en-US");
    }

    #[test]
    fn test_clamp_queue_index() {
        assert_eq!(clamp_queue_index(0, 3), 0);
        assert_eq!(clamp_queue_index(2, 3), 2);
        assert_eq!(clamp_queue_index(10, 3), 2);
        assert_eq!(clamp_queue_index(5, 0), 0);
    }

    #[test]
    fn test_build_queue_keeps_original_indices() {
        let lines = vec![
            Line::new(&["a"], "uno"),
            Line::new(&["b"], "dos"),
        ];
        let queue = build_queue(&lines);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[1].original_index, 1);
        assert_eq!(queue[1].line.text, "dos");
    }

    #[test]
    fn test_phase_flags() {
        let in_flight = InFlight {
            line: 4,
            utterance: UtteranceId(1),
        };

        let idle = PlaybackPhase::Idle;
        assert!(!idle.is_playing() && !idle.is_paused() && idle.active_line_index().is_none());

        let speaking = PlaybackPhase::Speaking(in_flight);
        assert!(speaking.is_playing() && !speaking.is_paused());
        assert_eq!(speaking.active_line_index(), Some(4));

        let paused = PlaybackPhase::UserPaused(None);
        assert!(paused.is_paused() && !paused.is_auto_paused_for_user());
        assert_eq!(paused.active_line_index(), None);
        assert_eq!(PlaybackPhase::UserPaused(Some(in_flight)).in_flight(), Some(in_flight));

        let waiting = PlaybackPhase::WaitingForActor { line: 2 };
        assert!(waiting.is_paused() && waiting.is_auto_paused_for_user());
        assert_eq!(waiting.active_line_index(), Some(2));
        assert_eq!(waiting.in_flight(), None);
    }
}

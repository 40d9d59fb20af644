use crate::core::playback::PlaybackSnapshot;
use crate::core::script::Script;
use crate::core::state::VoiceInfo;
use log::error;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, Weak};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateEventKind {
    PlayDataChanged,
    CharacterSelected,
    HideOwnLinesChanged,
    LineFontSizeChanged,
    SpeechRateChanged,
    PreferredLanguageChanged,
    VoicesChanged,
    PlaybackStateChanged,
    ActiveLineChanged,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StateEvent {
    PlayDataChanged(Arc<Script>),
    CharacterSelected(Option<String>),
    HideOwnLinesChanged(bool),
    LineFontSizeChanged(u32),
    SpeechRateChanged(f32),
    PreferredLanguageChanged(String),
    VoicesChanged(Vec<VoiceInfo>),
    PlaybackStateChanged(PlaybackSnapshot),
    ActiveLineChanged(Option<usize>),
}

impl StateEvent {
    pub fn kind(&self) -> StateEventKind {
        match self {
            StateEvent::PlayDataChanged(_) => StateEventKind::PlayDataChanged,
            StateEvent::CharacterSelected(_) => StateEventKind::CharacterSelected,
            StateEvent::HideOwnLinesChanged(_) => StateEventKind::HideOwnLinesChanged,
            StateEvent::LineFontSizeChanged(_) => StateEventKind::LineFontSizeChanged,
            StateEvent::SpeechRateChanged(_) => StateEventKind::SpeechRateChanged,
            StateEvent::PreferredLanguageChanged(_) => StateEventKind::PreferredLanguageChanged,
            StateEvent::VoicesChanged(_) => StateEventKind::VoicesChanged,
            StateEvent::PlaybackStateChanged(_) => StateEventKind::PlaybackStateChanged,
            StateEvent::ActiveLineChanged(_) => StateEventKind::ActiveLineChanged,
        }
    }
}

type Listener = Arc<dyn Fn(&StateEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<StateEventKind, Vec<(u64, Listener)>>,
}

/// Publish/subscribe hub between the playback core and whatever presents it.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

/// Handle returned by [`EventBus::subscribe`]. Dropping it keeps the
/// subscription alive; call [`Subscription::unsubscribe`] to remove it.
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    kind: StateEventKind,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(listeners) = registry.listeners.get_mut(&self.kind) {
                listeners.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: StateEventKind, callback: F) -> Subscription
    where
        F: Fn(&StateEvent) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .listeners
            .entry(kind)
            .or_default()
            .push((id, Arc::new(callback)));

        Subscription {
            registry: Arc::downgrade(&self.registry),
            kind,
            id,
        }
    }

    pub fn emit(&self, event: StateEvent) {
        let kind = event.kind();
        // Listeners run without the lock held so they may (un)subscribe.
        let listeners: Vec<Listener> = {
            let registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            match registry.listeners.get(&kind) {
                Some(listeners) => listeners.iter().map(|(_, l)| l.clone()).collect(),
                None => return,
            }
        };

        for listener in listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                error!("Error in event listener for {:?}", kind);
            }
        }
    }

    pub fn listener_count(&self, kind: StateEventKind) -> usize {
        let registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.listeners.get(&kind).map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.listeners.clear();
    }
}

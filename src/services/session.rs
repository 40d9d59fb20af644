use crate::services::playback::PlaybackController;
use crate::services::speech::{OutcomeReceiver, SpeechEngine};
use log::{debug, info};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    SelectCharacter(String),
    TogglePlayPause,
    ContinueAfterActor,
    JumpToLine(String),
    Stop,
    SetHideOwnLines(bool),
    SetLineFontSize(u32),
    SetSpeechRate(f32),
    SetPreferredLanguage(String),
    RefreshVoices,
    Shutdown,
}

pub type CommandSender = mpsc::UnboundedSender<SessionCommand>;
pub type CommandReceiver = mpsc::UnboundedReceiver<SessionCommand>;

pub fn command_channel() -> (CommandSender, CommandReceiver) {
    mpsc::unbounded_channel()
}

/// Turns the engine's voice inventory notifications into `RefreshVoices`
/// commands.
pub fn forward_voice_changes(engine: &dyn SpeechEngine, commands: CommandSender) {
    engine.on_voices_changed(Box::new(move || {
        let _ = commands.send(SessionCommand::RefreshVoices);
    }));
}

/// Owns the controller and feeds it one message at a time, either a user
/// command or a speech outcome, so no two transitions ever interleave.
pub struct RehearsalSession {
    controller: PlaybackController,
    commands: CommandReceiver,
    outcomes: OutcomeReceiver,
}

impl RehearsalSession {
    pub fn new(
        controller: PlaybackController,
        commands: CommandReceiver,
        outcomes: OutcomeReceiver,
    ) -> Self {
        Self {
            controller,
            commands,
            outcomes,
        }
    }

    /// Runs until `Shutdown` arrives or every command sender is gone, then
    /// stops playback and hands the controller back.
    pub async fn run(mut self) -> PlaybackController {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.apply(command),
                },
                Some(outcome) = self.outcomes.recv() => {
                    debug!("Speech outcome: {:?}", outcome);
                    self.controller.handle_speech_outcome(outcome);
                }
            }
        }

        info!("Rehearsal session closing");
        if self.controller.state().is_playing() {
            self.controller.stop();
        }
        self.controller
    }

    fn apply(&mut self, command: SessionCommand) {
        debug!("Session command: {:?}", command);
        let controller = &mut self.controller;
        match command {
            SessionCommand::SelectCharacter(id) => controller.select_character(&id),
            SessionCommand::TogglePlayPause => controller.toggle_play_pause(),
            SessionCommand::ContinueAfterActor => controller.continue_after_actor(),
            SessionCommand::JumpToLine(target) => controller.jump_to_line(&target),
            SessionCommand::Stop => controller.stop(),
            SessionCommand::SetHideOwnLines(hide) => controller.set_hide_own_lines(hide),
            SessionCommand::SetLineFontSize(size) => controller.set_line_font_size(size),
            SessionCommand::SetSpeechRate(rate) => controller.set_speech_rate(rate),
            SessionCommand::SetPreferredLanguage(language) => {
                controller.set_preferred_language(&language)
            }
            SessionCommand::RefreshVoices => controller.refresh_voices(),
            SessionCommand::Shutdown => {}
        }
    }
}

use anyhow::{Context, Result};
use inquire::Select;
use log::{error, info};
use rehearsal::core::config::{Config, CONFIG_FILE};
use rehearsal::core::events::{EventBus, StateEvent, StateEventKind};
use rehearsal::core::script::{
    character_map, display_names, is_own_line, CharacterMap, Line, Script, DEFAULT_NAME_SEPARATOR,
};
use rehearsal::core::state::{RehearsalState, AUTO_LANGUAGE};
use rehearsal::services::loader::{load_script_with_fallback, script_loader_for};
use rehearsal::services::playback::{PlaybackController, PlaybackSignal};
use rehearsal::services::session::{
    command_channel, forward_voice_changes, CommandSender, RehearsalSession, SessionCommand,
};
use rehearsal::services::speech::{create_speech_engine, outcome_channel};
use rehearsal::utils::i18n::{format_language_label, t, t_with};
use std::fmt;
use std::io::BufRead;
use std::sync::{Arc, Mutex, PoisonError};

struct CharacterChoice {
    id: String,
    name: String,
}

impl fmt::Display for CharacterChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// What the terminal shows, kept in sync through state events.
#[derive(Default)]
struct View {
    script: Option<Arc<Script>>,
    characters: CharacterMap,
    character_id: Option<String>,
    hide_own_lines: bool,
    listing: bool,
}

type SharedView = Arc<Mutex<View>>;

impl View {
    fn render_line(&self, idx: usize, line: &Line) -> String {
        let names = display_names(line, &self.characters, DEFAULT_NAME_SEPARATOR);
        let own = self
            .character_id
            .as_deref()
            .map_or(false, |id| is_own_line(line, id));
        let text = if own && self.hide_own_lines {
            t("label.hiddenLine")
        } else {
            line.text.clone()
        };
        format!("{:>4}. {}: {}", idx + 1, names, text)
    }

    fn render_script(&self) -> Vec<String> {
        let Some(script) = &self.script else {
            return Vec::new();
        };
        script
            .lines
            .iter()
            .enumerate()
            .map(|(idx, line)| self.render_line(idx, line))
            .collect()
    }

    fn print_script(&self) {
        println!("\n{}", t("label.script"));
        for line in self.render_script() {
            println!("{}", line);
        }
        println!();
    }
}

fn lock(view: &SharedView) -> std::sync::MutexGuard<'_, View> {
    view.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, PartialEq)]
enum Input {
    Session(SessionCommand),
    ListScript,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // 1. Config & script
    let mut config = Config::load()?;
    let loader = script_loader_for(&config.script);
    let loaded = load_script_with_fallback(loader.as_ref()).await;
    if loaded.used_fallback {
        println!("{}", t("status.fallbackUsed"));
    }
    let script = loaded.script;

    println!("\n{}", script.title);
    println!("{}", t_with("label.author", &[("author", &script.author)]));
    if !script.description.is_empty() {
        println!("{}", script.description);
    }
    println!();

    // 2. Character
    let choices: Vec<CharacterChoice> = script
        .characters
        .iter()
        .map(|c| CharacterChoice {
            id: c.id.clone(),
            name: c.name.clone(),
        })
        .collect();
    let choice = Select::new(&t("label.selectCharacter"), choices)
        .prompt()
        .context("Character selection aborted")?;
    info!("Rehearsing as {} ({})", choice.name, choice.id);

    // 3. Speech engine & controller
    let (outcome_tx, outcome_rx) = outcome_channel();
    let engine = create_speech_engine(&config.speech, outcome_tx)?;
    let speech_supported = engine.is_supported();

    let events = EventBus::new();
    let view = SharedView::default();
    subscribe_presentation(&events, view.clone());

    let mut controller =
        PlaybackController::new(engine, events, config.speech.narration.clone());
    controller.on_signal(|signal| {
        if let PlaybackSignal::Error(reason) = &signal {
            error!("Speech error: {}", reason);
        }
        println!("» {}", t(signal.status_key()));
    });
    controller.set_play_data(script);
    controller.set_speech_rate(config.speech.rate);
    controller.set_preferred_language(&config.speech.preferred_language);
    controller.set_line_font_size(config.display.line_font_size);
    controller.select_character(&choice.id);
    controller.set_hide_own_lines(config.display.hide_own_lines);

    {
        let mut view = lock(&view);
        view.listing = true;
        view.print_script();
    }
    if speech_supported {
        println!("{}", t("status.ready"));
    } else {
        println!("{}", t("status.speechUnavailableManual"));
    }
    println!("{}\n", t("label.commands"));

    // 4. Input & session
    let (commands, command_rx) = command_channel();
    forward_voice_changes(controller.engine(), commands.clone());
    spawn_input_reader(commands, view);

    let controller = RehearsalSession::new(controller, command_rx, outcome_rx)
        .run()
        .await;

    if apply_preferences(&mut config, controller.state()) {
        info!("Saving preferences to {}", CONFIG_FILE);
        config.save()?;
    }
    Ok(())
}

fn subscribe_presentation(events: &EventBus, view: SharedView) {
    let v = view.clone();
    let _ = events.subscribe(StateEventKind::PlayDataChanged, move |event| {
        if let StateEvent::PlayDataChanged(script) = event {
            let mut view = lock(&v);
            view.characters = character_map(&script.characters);
            view.script = Some(script.clone());
        }
    });

    let v = view.clone();
    let _ = events.subscribe(StateEventKind::CharacterSelected, move |event| {
        if let StateEvent::CharacterSelected(id) = event {
            lock(&v).character_id = id.clone();
        }
    });

    let v = view.clone();
    let _ = events.subscribe(StateEventKind::HideOwnLinesChanged, move |event| {
        if let StateEvent::HideOwnLinesChanged(hide) = event {
            let mut view = lock(&v);
            view.hide_own_lines = *hide;
            if view.listing {
                view.print_script();
            }
        }
    });

    let _ = events.subscribe(StateEventKind::ActiveLineChanged, move |event| {
        let StateEvent::ActiveLineChanged(Some(idx)) = event else {
            return;
        };
        let view = lock(&view);
        let Some(line) = view.script.as_ref().and_then(|s| s.lines.get(*idx)) else {
            return;
        };
        println!("{}", view.render_line(*idx, line));
    });

    let _ = events.subscribe(StateEventKind::SpeechRateChanged, |event| {
        if let StateEvent::SpeechRateChanged(rate) = event {
            let rate = t_with("label.speechRateX", &[("rate", &format!("{:.2}", rate))]);
            println!("{}", t_with("label.speechRate", &[("rate", &rate)]));
        }
    });

    let _ = events.subscribe(StateEventKind::LineFontSizeChanged, |event| {
        if let StateEvent::LineFontSizeChanged(size) = event {
            let size = t_with("label.textSizePx", &[("size", &size.to_string())]);
            println!("{}", t_with("label.textSize", &[("size", &size)]));
        }
    });

    let _ = events.subscribe(StateEventKind::PreferredLanguageChanged, |event| {
        if let StateEvent::PreferredLanguageChanged(language) = event {
            let language = if language == AUTO_LANGUAGE {
                t("label.languageAutoDetect")
            } else {
                format_language_label(language)
            };
            println!("{}", t_with("label.language", &[("language", &language)]));
        }
    });

    let _ = events.subscribe(StateEventKind::VoicesChanged, |event| {
        if let StateEvent::VoicesChanged(voices) = event {
            for voice in voices {
                println!("  - {} · {}", voice.name, format_language_label(&voice.lang));
            }
        }
    });
}

/// Copies session preferences into `config`. Returns whether anything changed.
fn apply_preferences(config: &mut Config, state: &RehearsalState) -> bool {
    let before = config.clone();
    config.speech.rate = state.speech_rate();
    config.speech.preferred_language = state.preferred_language().to_string();
    config.display.hide_own_lines = state.hide_own_lines();
    config.display.line_font_size = state.line_font_size();
    *config != before
}

/// Blocking stdin lives on its own thread so it never holds up runtime
/// shutdown.
fn spawn_input_reader(commands: CommandSender, view: SharedView) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let hide_own_lines = lock(&view).hide_own_lines;
            match parse_command(&line, hide_own_lines) {
                Some(Input::ListScript) => lock(&view).print_script(),
                Some(Input::Session(command)) => {
                    let quit = command == SessionCommand::Shutdown;
                    if commands.send(command).is_err() || quit {
                        return;
                    }
                }
                None => println!("{}", t("label.commands")),
            }
        }
        let _ = commands.send(SessionCommand::Shutdown);
    });
}

fn parse_command(input: &str, hide_own_lines: bool) -> Option<Input> {
    let input = input.trim();
    let (verb, arg) = match input.split_once(char::is_whitespace) {
        Some((verb, arg)) => (verb, arg.trim()),
        None => (input, ""),
    };

    let command = match verb {
        "t" => return Some(Input::ListScript),
        "" | "p" => SessionCommand::TogglePlayPause,
        "c" => SessionCommand::ContinueAfterActor,
        "s" => SessionCommand::Stop,
        "q" => SessionCommand::Shutdown,
        "h" => SessionCommand::SetHideOwnLines(!hide_own_lines),
        "v" => SessionCommand::RefreshVoices,
        // Lines are numbered from 1 on screen
        "j" => SessionCommand::JumpToLine(match arg.parse::<i64>() {
            Ok(n) => (n - 1).to_string(),
            Err(_) => arg.to_string(),
        }),
        "r" => SessionCommand::SetSpeechRate(arg.parse().ok()?),
        "f" => SessionCommand::SetLineFontSize(arg.parse().ok()?),
        "l" if !arg.is_empty() => SessionCommand::SetPreferredLanguage(arg.to_string()),
        _ => return None,
    };
    Some(Input::Session(command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rehearsal::core::script::Character;

    fn session(command: SessionCommand) -> Option<Input> {
        Some(Input::Session(command))
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("", true), session(SessionCommand::TogglePlayPause));
        assert_eq!(parse_command(" c ", true), session(SessionCommand::ContinueAfterActor));
        assert_eq!(parse_command("h", true), session(SessionCommand::SetHideOwnLines(false)));
        assert_eq!(parse_command("h", false), session(SessionCommand::SetHideOwnLines(true)));
        assert_eq!(
            parse_command("j 3", true),
            session(SessionCommand::JumpToLine("2".to_string()))
        );
        assert_eq!(
            parse_command("j x", true),
            session(SessionCommand::JumpToLine("x".to_string()))
        );
        assert_eq!(parse_command("r 1.2", true), session(SessionCommand::SetSpeechRate(1.2)));
        assert_eq!(parse_command("r fast", true), None);
        assert_eq!(parse_command("f 24", true), session(SessionCommand::SetLineFontSize(24)));
        assert_eq!(parse_command("f big", true), None);
        assert_eq!(
            parse_command("l en-US", true),
            session(SessionCommand::SetPreferredLanguage("en-US".to_string()))
        );
        assert_eq!(parse_command("l", true), None);
        assert_eq!(parse_command("zzz", true), None);
    }

    #[test]
    fn test_parse_list_script() {
        assert_eq!(parse_command("t", true), Some(Input::ListScript));
        assert_eq!(parse_command(" t ", false), Some(Input::ListScript));
    }

    fn scene() -> Script {
        Script {
            id: "scene".to_string(),
            title: "Escena".to_string(),
            author: String::new(),
            description: String::new(),
            characters: vec![
                Character::new("aurora", "Aurora"),
                Character::new("tomas", "Tomás"),
            ],
            lines: vec![
                Line::new(&["tomas"], "No soy príncipe."),
                Line::new(&["aurora"], "¿Quién me llama?"),
                Line::new(&["aurora", "tomas"], "Silencio."),
            ],
        }
    }

    #[test]
    fn test_script_listing_follows_state_events() {
        let events = EventBus::new();
        let view = SharedView::default();
        subscribe_presentation(&events, view.clone());
        let mut state = RehearsalState::new(events);
        state.set_play_data(scene());

        // Nothing selected yet, every line is readable
        assert_eq!(
            lock(&view).render_script(),
            vec![
                "   1. Tomás: No soy príncipe.",
                "   2. Aurora: ¿Quién me llama?",
                "   3. Aurora + Tomás: Silencio.",
            ]
        );

        state.select_character("aurora");
        let hidden = t("label.hiddenLine");
        assert_eq!(
            lock(&view).render_script(),
            vec![
                "   1. Tomás: No soy príncipe.".to_string(),
                format!("   2. Aurora: {}", hidden),
                format!("   3. Aurora + Tomás: {}", hidden),
            ]
        );

        state.set_hide_own_lines(false);
        assert_eq!(lock(&view).render_script()[1], "   2. Aurora: ¿Quién me llama?");

        // A new selection re-hides and moves the mask to the new character
        state.select_character("tomas");
        let listing = lock(&view).render_script();
        assert_eq!(listing[0], format!("   1. Tomás: {}", hidden));
        assert_eq!(listing[1], "   2. Aurora: ¿Quién me llama?");
    }

    #[test]
    fn test_apply_preferences() {
        let mut config = Config::default();
        let mut state = RehearsalState::new(EventBus::new());
        state.set_line_font_size(config.display.line_font_size);
        assert!(!apply_preferences(&mut config, &state));

        state.set_speech_rate(1.5).unwrap();
        state.set_line_font_size(24);
        state.set_preferred_language("en-US");
        assert!(apply_preferences(&mut config, &state));
        assert_eq!(config.speech.rate, 1.5);
        assert_eq!(config.display.line_font_size, 24);
        assert_eq!(config.speech.preferred_language, "en-US");
        assert!(!apply_preferences(&mut config, &state));
    }
}

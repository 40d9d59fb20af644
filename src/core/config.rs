use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Path or http(s) URL of the script document.
    #[serde(default = "default_script")]
    pub script: String,

    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpeechConfig {
    #[serde(default = "default_speech_provider")]
    pub provider: String,
    #[serde(default = "default_rate")]
    pub rate: f32,
    #[serde(default = "default_preferred_language")]
    pub preferred_language: String,
    #[serde(default = "default_words_per_minute")]
    pub words_per_minute: u32,
    #[serde(default)]
    pub narration: NarrationConfig,
}

/// How a narrated line is announced: `"<names> <verb>: <text>"`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NarrationConfig {
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_verb")]
    pub verb: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DisplayConfig {
    #[serde(default = "default_hide_own_lines")]
    pub hide_own_lines: bool,
    #[serde(default = "default_line_font_size")]
    pub line_font_size: u32,
}

fn default_script() -> String {
    "assets/play.json".to_string()
}
fn default_speech_provider() -> String {
    "console".to_string()
}
fn default_rate() -> f32 {
    1.0
}
fn default_preferred_language() -> String {
    "auto".to_string()
}
fn default_words_per_minute() -> u32 {
    170
}
fn default_separator() -> String {
    " y ".to_string()
}
fn default_verb() -> String {
    "dice".to_string()
}
fn default_hide_own_lines() -> bool {
    true
}
fn default_line_font_size() -> u32 {
    18
}

impl Default for Config {
    fn default() -> Self {
        Self {
            script: default_script(),
            speech: SpeechConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            provider: default_speech_provider(),
            rate: default_rate(),
            preferred_language: default_preferred_language(),
            words_per_minute: default_words_per_minute(),
            narration: NarrationConfig::default(),
        }
    }
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            verb: default_verb(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            hide_own_lines: default_hide_own_lines(),
            line_font_size: default_line_font_size(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// A missing file is not an error: every setting has a default.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("{} not found, using default settings", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(Path::new(CONFIG_FILE))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

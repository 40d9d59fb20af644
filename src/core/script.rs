use anyhow::{bail, Result};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_NAME_SEPARATOR: &str = " + ";

const BUNDLED_SCRIPT: &str = include_str!("../../assets/play.json");

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Character {
    pub id: String,
    pub name: String,
}

impl Character {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub character_ids: Vec<String>,
    pub text: String,
}

impl Line {
    pub fn new(character_ids: &[&str], text: &str) -> Self {
        Self {
            character_ids: character_ids.iter().map(|id| id.to_string()).collect(),
            text: text.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Script {
    #[serde(rename = "playId", alias = "id", default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    pub characters: Vec<Character>,
    pub lines: Vec<Line>,
}

impl Script {
    /// Rejects documents the playback engine cannot work with. Lines that
    /// reference characters missing from the cast are only reported, their raw
    /// id is shown instead of a name.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for character in &self.characters {
            if !seen.insert(character.id.as_str()) {
                bail!("Duplicate character id in script: {}", character.id);
            }
        }

        for (idx, line) in self.lines.iter().enumerate() {
            if line.character_ids.is_empty() {
                bail!("Line {} has no speaking characters", idx);
            }
            for id in &line.character_ids {
                if !seen.contains(id.as_str()) {
                    warn!("Line {} references unknown character '{}'", idx, id);
                }
            }
        }
        Ok(())
    }

    /// Built-in script used whenever the configured one cannot be loaded.
    pub fn fallback() -> Self {
        match serde_json::from_str(BUNDLED_SCRIPT) {
            Ok(script) => script,
            Err(e) => {
                error!("Bundled script is malformed: {}", e);
                Self::default()
            }
        }
    }
}

/// Lookup from character id to display name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CharacterMap {
    names: HashMap<String, String>,
}

impl CharacterMap {
    /// Unmapped ids resolve to themselves.
    pub fn name_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.names.get(id).map(String::as_str).unwrap_or(id)
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

pub fn character_map(characters: &[Character]) -> CharacterMap {
    CharacterMap {
        names: characters
            .iter()
            .map(|c| (c.id.clone(), c.name.clone()))
            .collect(),
    }
}

pub fn is_own_line(line: &Line, character_id: &str) -> bool {
    !character_id.is_empty() && line.character_ids.iter().any(|id| id == character_id)
}

pub fn display_names(line: &Line, characters: &CharacterMap, separator: &str) -> String {
    line.character_ids
        .iter()
        .map(|id| characters.name_of(id))
        .collect::<Vec<_>>()
        .join(separator)
}

pub fn has_lines_excluding(lines: &[Line], character_id: &str) -> bool {
    lines.iter().any(|line| !is_own_line(line, character_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cast() -> Vec<Character> {
        vec![
            Character::new("aurora", "Aurora"),
            Character::new("tomas", "Tomás"),
            Character::new("narrator", "Narrador"),
        ]
    }

    fn lines() -> Vec<Line> {
        vec![
            Line::new(&["narrator"], "La corte contiene el aliento."),
            Line::new(&["aurora"], "Siento las manos que me buscan."),
            Line::new(&["aurora", "tomas"], "Juntos al fin."),
        ]
    }

    #[test]
    fn test_character_map() {
        let map = character_map(&cast());
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("tomas"), Some("Tomás"));
        assert_eq!(map.name_of("ghost"), "ghost");
        assert!(character_map(&[]).is_empty());
    }

    #[test]
    fn test_is_own_line() {
        let lines = lines();
        assert!(is_own_line(&lines[1], "aurora"));
        assert!(!is_own_line(&lines[0], "aurora"));
        // Chorus lines belong to everyone listed
        assert!(is_own_line(&lines[2], "aurora"));
        assert!(is_own_line(&lines[2], "tomas"));
        assert!(!is_own_line(&lines[2], ""));
    }

    #[test]
    fn test_display_names() {
        let map = character_map(&cast());
        let lines = lines();
        assert_eq!(display_names(&lines[0], &map, DEFAULT_NAME_SEPARATOR), "Narrador");
        assert_eq!(display_names(&lines[2], &map, DEFAULT_NAME_SEPARATOR), "Aurora + Tomás");
        assert_eq!(display_names(&lines[2], &map, " y "), "Aurora y Tomás");

        let stray = Line::new(&["aurora", "ghost"], "...");
        assert_eq!(display_names(&stray, &map, " + "), "Aurora + ghost");
    }

    #[test]
    fn test_has_lines_excluding() {
        let lines = lines();
        assert!(has_lines_excluding(&lines, "aurora"));
        assert!(has_lines_excluding(&lines, ""));
        assert!(!has_lines_excluding(&[], ""));

        let only_aurora = vec![lines[1].clone(), lines[2].clone()];
        assert!(!has_lines_excluding(&only_aurora, "aurora"));
    }

    #[test]
    fn test_unknown_character_never_owns_a_line() {
        let script = Script::fallback();
        for line in &script.lines {
            assert!(!is_own_line(line, "nobody"));
        }
        assert!(has_lines_excluding(&script.lines, "nobody"));
    }

    #[test]
    fn test_bundled_script() {
        let script = Script::fallback();
        assert_eq!(script.id, "besos-bella-durmiente");
        assert_eq!(script.title, "Besos para la Bella Durmiente");
        assert_eq!(script.characters.len(), 13);
        assert_eq!(script.lines.len(), 13);
        assert_eq!(
            script.lines[2].character_ids,
            vec!["reina".to_string(), "rey".to_string()]
        );
        assert!(script.validate().is_ok());
    }

    #[test]
    fn test_parse_script_json() {
        let json = r#"{
            "playId": "demo",
            "title": "Demo",
            "author": "Anon",
            "description": "",
            "characters": [{"id": "a", "name": "A"}],
            "lines": [{"characterIds": ["a"], "text": "Hola"}]
        }"#;
        let script: Script = serde_json::from_str(json).unwrap();
        assert_eq!(script.id, "demo");
        assert_eq!(script.lines[0].character_ids, vec!["a".to_string()]);
        assert!(script.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_scripts() {
        let mut script = Script::fallback();
        assert!(script.validate().is_ok());

        script.lines.push(Line::new(&[], "Nadie dice esto"));
        assert!(script.validate().is_err());

        let mut script = Script::fallback();
        script.characters.push(Character::new("aurora", "Otra Aurora"));
        assert!(script.validate().is_err());

        // Unknown speakers are tolerated
        let mut script = Script::fallback();
        script.lines.push(Line::new(&["ghost"], "Buu"));
        assert!(script.validate().is_ok());
    }
}

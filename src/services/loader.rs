use crate::core::script::Script;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{error, info};
use reqwest::header::{HeaderValue, CACHE_CONTROL};
use std::path::PathBuf;
use url::Url;

#[async_trait]
pub trait ScriptLoader: Send + Sync {
    /// Human readable origin, used in logs.
    fn source(&self) -> String;
    async fn load(&self) -> Result<Script>;
}

#[derive(Debug, Clone)]
pub struct LoadedScript {
    pub script: Script,
    pub used_fallback: bool,
}

pub struct FileScriptLoader {
    path: PathBuf,
}

impl FileScriptLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ScriptLoader for FileScriptLoader {
    fn source(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> Result<Script> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let script: Script = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(script)
    }
}

pub struct HttpScriptLoader {
    url: Url,
    client: reqwest::Client,
}

impl HttpScriptLoader {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ScriptLoader for HttpScriptLoader {
    fn source(&self) -> String {
        self.url.to_string()
    }

    async fn load(&self) -> Result<Script> {
        let resp = self
            .client
            .get(self.url.clone())
            .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(anyhow!("Failed to fetch script: {}", resp.status()));
        }
        let script: Script = resp.json().await.context("Failed to parse script JSON")?;
        Ok(script)
    }
}

/// http(s) URLs are fetched, anything else is read from disk.
pub fn script_loader_for(location: &str) -> Box<dyn ScriptLoader> {
    match Url::parse(location) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
            Box::new(HttpScriptLoader::new(url))
        }
        _ => Box::new(FileScriptLoader::new(location)),
    }
}

/// Never fails: a missing, unreachable or invalid script is replaced by the
/// built-in one.
pub async fn load_script_with_fallback(loader: &dyn ScriptLoader) -> LoadedScript {
    let loaded = match loader.load().await {
        Ok(script) => script.validate().map(|_| script),
        Err(e) => Err(e),
    };

    match loaded {
        Ok(script) => {
            info!("Loaded script from {}", loader.source());
            LoadedScript {
                script,
                used_fallback: false,
            }
        }
        Err(e) => {
            error!("Could not load script from {}: {:#}", loader.source(), e);
            LoadedScript {
                script: Script::fallback(),
                used_fallback: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SCRIPT_JSON: &str = r#"{
        "playId": "ensayo",
        "title": "Ensayo",
        "author": "Anon",
        "description": "Escena corta",
        "characters": [{"id": "a", "name": "Ana"}, {"id": "b", "name": "Beto"}],
        "lines": [
            {"characterIds": ["a"], "text": "Hola"},
            {"characterIds": ["b"], "text": "Adiós"}
        ]
    }"#;

    #[tokio::test]
    async fn test_file_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("play.json");
        fs::write(&path, SCRIPT_JSON).unwrap();

        let loaded = load_script_with_fallback(&FileScriptLoader::new(&path)).await;
        assert!(!loaded.used_fallback);
        assert_eq!(loaded.script.title, "Ensayo");
        assert_eq!(loaded.script.lines.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FileScriptLoader::new(dir.path().join("nope.json"));

        let loaded = load_script_with_fallback(&loader).await;
        assert!(loaded.used_fallback);
        assert_eq!(loaded.script, Script::fallback());
    }

    #[tokio::test]
    async fn test_malformed_or_invalid_file_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("play.json");

        fs::write(&path, "{ not json").unwrap();
        assert!(load_script_with_fallback(&FileScriptLoader::new(&path)).await.used_fallback);

        fs::write(
            &path,
            r#"{"characters": [], "lines": [{"characterIds": [], "text": "?"}]}"#,
        )
        .unwrap();
        assert!(load_script_with_fallback(&FileScriptLoader::new(&path)).await.used_fallback);
    }

    #[test]
    fn test_script_loader_for() {
        assert_eq!(
            script_loader_for("https://example.com/play.json").source(),
            "https://example.com/play.json"
        );
        assert_eq!(script_loader_for("scripts/play.json").source(), "scripts/play.json");
    }
}

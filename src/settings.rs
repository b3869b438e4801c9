use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::categorizer::DEFAULT_BATCH_SIZE;
use crate::error::{PennyError, Result};

/// The external command that answers prompts. It reads the prompt on stdin
/// and prints a JSON object on stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewaySettings {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
        }
    }
}

fn default_program() -> String {
    "llm".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_dir_string")]
    pub data_dir: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_examples_limit")]
    pub examples_limit: usize,
    #[serde(default)]
    pub gateway: GatewaySettings,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_examples_limit() -> usize {
    20
}

fn default_data_dir_string() -> String {
    default_data_dir().to_string_lossy().to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir_string(),
            batch_size: default_batch_size(),
            examples_limit: default_examples_limit(),
            gateway: GatewaySettings::default(),
        }
    }
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("penny.db")
    }

    pub fn log_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("penny.log")
    }

    /// Batch size actually used; zero in the file means the smallest batch.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("penny")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("penny")
}

fn parse_settings(content: &str) -> Result<Settings> {
    serde_json::from_str(content).map_err(|e| PennyError::Settings(e.to_string()))
}

/// Load settings, falling back to defaults when the file is missing. A file
/// that exists but does not parse is an error rather than silently ignored.
pub fn load_settings() -> Result<Settings> {
    let path = settings_path();
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(&path)?;
    parse_settings(&content)
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| PennyError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            batch_size: 25,
            examples_limit: 0,
            gateway: GatewaySettings {
                program: "ollama".to_string(),
                args: vec!["run".to_string(), "llama3".to_string()],
            },
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded = parse_settings(&content).unwrap();
        assert_eq!(loaded.data_dir, "/tmp/test");
        assert_eq!(loaded.batch_size, 25);
        assert_eq!(loaded.gateway.args, vec!["run", "llama3"]);
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(s.gateway.program, "llm");
        assert!(s.gateway.args.is_empty());
        assert!(s.db_path().ends_with("penny.db"));
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let s = parse_settings(
            r#"{"data_dir": "/tmp/test", "gateway": {"args": ["-m", "gpt-4o"]}}"#,
        )
        .unwrap();
        assert_eq!(s.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(s.examples_limit, 20);
        assert_eq!(s.gateway.program, "llm");
        assert_eq!(s.gateway.args, vec!["-m", "gpt-4o"]);
    }

    #[test]
    fn test_invalid_settings_is_error() {
        assert!(matches!(parse_settings("{not json"), Err(PennyError::Settings(_))));
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let s = Settings { batch_size: 0, ..Settings::default() };
        assert_eq!(s.effective_batch_size(), 1);
    }
}

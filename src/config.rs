use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::GatewayError;

pub const PAT_VAR: &str = "ADO_PAT_TOKEN";
pub const API_KEY_VAR: &str = "SPARK_API_KEY";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub ado: AdoConfig,
    pub llm: LlmConfig,
    pub batch: BatchConfig,
    pub debug_dump: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdoConfig {
    pub organization: String,
    pub project: String,
    pub base_url: String,
    pub api_version: String,
}

impl Default for AdoConfig {
    fn default() -> Self {
        Self {
            organization: "spglobal".into(),
            project: "Platts".into(),
            base_url: "https://dev.azure.com".into(),
            api_version: "6.0".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub env_url: String,
    pub app_id: String,
    pub model: String,
    pub api_version: String,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            env_url: "https://sparkuatapi.spglobal.com".into(),
            app_id: "sparkassist".into(),
            model: "gpt-4o-2024-11-20".into(),
            api_version: "2024-10-21".into(),
            temperature: 0.2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { delay_ms: 300 }
    }
}

impl BatchConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ado-assist")
}

fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

/// Load `.env`, then the TOML file, then environment overrides.
pub fn load_config() -> Result<AppConfig> {
    let _ = dotenv::dotenv();
    let mut config = load_config_file(&config_path())?;
    apply_env(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

pub fn load_config_file(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig =
        toml::from_str(&contents).with_context(|| "Failed to parse config.toml")?;
    Ok(config)
}

pub fn apply_env(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(val) = var("ADO_ORGANIZATION") {
        config.ado.organization = val;
    }
    if let Some(val) = var("ADO_PROJECT") {
        config.ado.project = val;
    }
    if let Some(val) = var("ADO_BASE_URL") {
        config.ado.base_url = val;
    }
    if let Some(val) = var("SPARK_ENV_URL") {
        config.llm.env_url = val;
    }
    if let Some(val) = var("SPARK_APP_ID") {
        config.llm.app_id = val;
    }
    if let Some(val) = var("SPARK_MODEL") {
        config.llm.model = val;
    }
    if let Some(val) = var("ADO_ASSIST_BATCH_DELAY_MS") {
        if let Ok(n) = val.parse() {
            config.batch.delay_ms = n;
        }
    }
    if let Some(val) = var("ADO_ASSIST_DEBUG_DUMP") {
        config.debug_dump = val == "true" || val == "1";
    }
}

/// Fetch a secret from the environment, failing fast when absent or empty.
pub fn require_secret(
    name: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, GatewayError> {
    match lookup(name) {
        Some(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(GatewayError::Config(format!(
            "Missing required environment variable: {name}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_file_or_env() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_file(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.ado.organization, "spglobal");
        assert_eq!(config.ado.project, "Platts");
        assert_eq!(config.llm.model, "gpt-4o-2024-11-20");
        assert_eq!(config.batch.delay_ms, 300);
        assert!(!config.debug_dump);
    }

    #[test]
    fn file_values_fill_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "debug_dump = true\n[ado]\nproject = \"Sandbox\"\n[batch]\ndelay_ms = 50\n",
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.ado.project, "Sandbox");
        assert_eq!(config.ado.organization, "spglobal");
        assert_eq!(config.batch.delay(), Duration::from_millis(50));
        assert!(config.debug_dump);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ado\nproject = ").unwrap();
        assert!(load_config_file(&path).is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = AppConfig::default();
        apply_env(
            &mut config,
            env(&[
                ("ADO_ORGANIZATION", "contoso"),
                ("SPARK_MODEL", "gpt-4o-mini"),
                ("ADO_ASSIST_BATCH_DELAY_MS", "10"),
                ("ADO_ASSIST_DEBUG_DUMP", "1"),
            ]),
        );
        assert_eq!(config.ado.organization, "contoso");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.batch.delay_ms, 10);
        assert!(config.debug_dump);
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = AppConfig::default();
        apply_env(&mut config, env(&[("ADO_PROJECT", "  ")]));
        assert_eq!(config.ado.project, "Platts");
    }

    #[test]
    fn unparsable_delay_keeps_previous_value() {
        let mut config = AppConfig::default();
        apply_env(&mut config, env(&[("ADO_ASSIST_BATCH_DELAY_MS", "soon")]));
        assert_eq!(config.batch.delay_ms, 300);
    }

    #[test]
    fn secret_must_be_present_and_non_empty() {
        assert_eq!(
            require_secret(PAT_VAR, env(&[(PAT_VAR, "abc")])).unwrap(),
            "abc"
        );

        let missing = require_secret(PAT_VAR, env(&[])).unwrap_err();
        assert!(missing.to_string().contains(PAT_VAR));

        let empty = require_secret(API_KEY_VAR, env(&[(API_KEY_VAR, "")])).unwrap_err();
        assert!(matches!(empty, GatewayError::Config(_)));
    }
}

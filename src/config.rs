use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::ai_provider::{AIConfig, AIProvider, ProviderError};
use crate::core::{FactorTable, Region};

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub default_region: Region,
    pub default_provider: String,
    pub providers: HashMap<String, ProviderConfig>,
    /// JSON factor table replacing the built-in one; relative paths resolve
    /// against `data_dir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factors_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub default_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_temperature")]
    pub temperature: Option<f32>,
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_max_tokens() -> Option<u32> {
    Some(500)
}

fn default_temperature() -> Option<f32> {
    Some(0.7)
}

impl Config {
    pub fn default_data_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("carbon-calc")
    }

    /// Load `config.json` from `data_dir`, writing a default one if it is
    /// missing or unreadable. Empty API keys are filled from the environment.
    pub fn new(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.unwrap_or_else(Self::default_data_dir);
        let mut config = Self::load_or_create(data_dir)?;
        config.apply_env_key(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    fn load_or_create(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        let config_path = data_dir.join("config.json");

        if config_path.exists() {
            let config_str =
                std::fs::read_to_string(&config_path).context("Failed to read config.json")?;

            if config_str.trim().is_empty() {
                warn!("config file is empty, recreating defaults");
            } else {
                match serde_json::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        config.data_dir = data_dir;
                        config.clamp_timeouts();
                        debug!(path = %config_path.display(), "loaded config");
                        return Ok(config);
                    }
                    Err(e) => {
                        warn!("failed to parse {}: {}, recreating defaults", config_path.display(), e);
                    }
                }
            }
        }

        let config = Self::default_config(data_dir);
        config.save()?;
        Ok(config)
    }

    /// Zero timeouts are replaced with the default.
    fn clamp_timeouts(&mut self) {
        for (name, provider) in self.providers.iter_mut() {
            if provider.timeout_secs == 0 {
                warn!(provider = %name, "timeout_secs of 0 replaced with {}", default_timeout_secs());
                provider.timeout_secs = default_timeout_secs();
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = self.data_dir.join("config.json");
        let json_str = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, json_str).context("Failed to write config.json")?;
        Ok(())
    }

    fn default_config(data_dir: PathBuf) -> Self {
        let mut providers = HashMap::new();

        providers.insert(
            "openai".to_string(),
            ProviderConfig {
                default_model: "gpt-3.5-turbo".to_string(),
                host: None,
                api_key: None,
                timeout_secs: default_timeout_secs(),
                max_tokens: default_max_tokens(),
                temperature: default_temperature(),
            },
        );

        providers.insert(
            "ollama".to_string(),
            ProviderConfig {
                default_model: "qwen2.5".to_string(),
                host: Some("http://localhost:11434".to_string()),
                api_key: None,
                timeout_secs: default_timeout_secs(),
                max_tokens: default_max_tokens(),
                temperature: default_temperature(),
            },
        );

        Config {
            data_dir,
            default_region: Region::default(),
            default_provider: "openai".to_string(),
            providers,
            factors_file: None,
        }
    }

    /// Fill a missing OpenAI key from the environment value `key`.
    pub fn apply_env_key(&mut self, key: Option<String>) {
        let Some(key) = key.filter(|k| !k.trim().is_empty()) else {
            return;
        };
        if let Some(openai_config) = self.providers.get_mut("openai") {
            if openai_config.api_key.as_ref().map_or(true, |k| k.is_empty()) {
                openai_config.api_key = Some(key);
            }
        }
    }

    pub fn get_provider(&self, provider_name: &str) -> Option<&ProviderConfig> {
        self.providers.get(provider_name)
    }

    /// Resolve the model settings for `provider` (or the default provider).
    ///
    /// `Unavailable` means the assistant should run without a model.
    pub fn get_ai_config(
        &self,
        provider: Option<&str>,
        model: Option<String>,
    ) -> std::result::Result<AIConfig, ProviderError> {
        let provider_name = provider.unwrap_or(&self.default_provider);
        let ai_provider: AIProvider = provider_name
            .parse()
            .map_err(|e: anyhow::Error| ProviderError::Unavailable(e.to_string()))?;
        let provider_config = self.get_provider(&ai_provider.to_string()).ok_or_else(|| {
            ProviderError::Unavailable(format!("no settings for provider {}", provider_name))
        })?;

        let api_key = provider_config.api_key.clone().filter(|k| !k.is_empty());
        if ai_provider == AIProvider::OpenAI && api_key.is_none() {
            return Err(ProviderError::Unavailable(format!(
                "OpenAI API key not found, set {} or add it to config.json",
                API_KEY_ENV
            )));
        }

        Ok(AIConfig {
            provider: ai_provider,
            model: model.unwrap_or_else(|| provider_config.default_model.clone()),
            api_key,
            base_url: provider_config.host.clone(),
            max_tokens: provider_config.max_tokens,
            temperature: provider_config.temperature,
            timeout_secs: provider_config.timeout_secs,
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    /// The configured factor table, or the built-in one.
    pub fn factor_table(&self) -> Result<FactorTable> {
        match &self.factors_file {
            Some(path) => {
                let path = self.resolve(path);
                FactorTable::load(&path)
                    .with_context(|| format!("Failed to load factor table from {}", path.display()))
            }
            None => Ok(FactorTable::builtin()),
        }
    }
}

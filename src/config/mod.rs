use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{OrchestrationError, Result};

/// Prefix for environment overrides, e.g. `CREW_LLM__MODEL=gpt-4o`
pub const ENV_PREFIX: &str = "CREW";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub crew: CrewSettings,
    #[serde(default)]
    pub demo: DemoConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Offline,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub base_url: String,
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub max_retries: u32,
    #[serde(with = "humantime_serde")]
    pub offline_latency: Duration,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrewSettings {
    pub verbose: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DemoConfig {
    pub current_year: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Offline,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.7,
            max_tokens: None,
            timeout: Duration::from_secs(60),
            max_retries: 3,
            offline_latency: Duration::from_millis(250),
        }
    }
}

impl Default for CrewSettings {
    fn default() -> Self {
        Self { verbose: true }
    }
}

impl DemoConfig {
    /// The configured year, or the current calendar year when unset
    pub fn resolved_year(&self) -> String {
        match &self.current_year {
            Some(year) => year.clone(),
            None => chrono::Local::now().year().to_string(),
        }
    }
}

#[async_trait::async_trait]
pub trait ConfigManager {
    async fn load_config(&self) -> Result<Config>;
    async fn save_config(&self, config: &Config) -> Result<()>;
    fn validate_config(&self, config: &Config) -> Result<()>;
}

pub struct FileConfigManager {
    config_path: PathBuf,
    env_prefix: String,
}

impl FileConfigManager {
    pub fn new(config_path: PathBuf) -> Self {
        Self {
            config_path,
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }
}

#[async_trait::async_trait]
impl ConfigManager for FileConfigManager {
    async fn load_config(&self) -> Result<Config> {
        info!("Loading configuration from {:?}", self.config_path);

        // check if config file exists, create default if not
        if !self.config_path.exists() {
            warn!("Configuration file not found, creating default config at {:?}", self.config_path);
            self.create_default_config().await?;
        }

        // file first, then environment overrides on top
        let layered = config::Config::builder()
            .add_source(config::File::from(self.config_path.clone()).format(config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| OrchestrationError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Config = layered
            .try_deserialize()
            .map_err(|e| OrchestrationError::ConfigError(format!("Failed to parse config: {}", e)))?;

        // validate the loaded config
        self.validate_config(&config)?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    async fn save_config(&self, config: &Config) -> Result<()> {
        info!("Saving configuration to {:?}", self.config_path);

        let toml_content = toml::to_string_pretty(config)
            .map_err(|e| OrchestrationError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        fs::write(&self.config_path, toml_content)
            .map_err(|e| OrchestrationError::ConfigError(format!("Failed to write config file: {}", e)))?;

        info!("Configuration saved successfully");
        Ok(())
    }

    fn validate_config(&self, config: &Config) -> Result<()> {
        debug!("Validating configuration");

        let llm = &config.llm;
        if llm.model.trim().is_empty() {
            return Err(OrchestrationError::ConfigError("llm.model cannot be empty".to_string()).into());
        }
        if !llm.base_url.starts_with("http://") && !llm.base_url.starts_with("https://") {
            return Err(OrchestrationError::ConfigError("llm.base_url must start with http:// or https://".to_string()).into());
        }
        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(OrchestrationError::ConfigError(format!("llm.temperature {} must be between 0.0 and 2.0", llm.temperature)).into());
        }
        if llm.max_retries > 10 {
            return Err(OrchestrationError::ConfigError("llm.max_retries cannot exceed 10".to_string()).into());
        }
        if llm.timeout.is_zero() {
            return Err(OrchestrationError::ConfigError("llm.timeout must be greater than zero".to_string()).into());
        }
        if llm.timeout > Duration::from_secs(600) {
            return Err(OrchestrationError::ConfigError("llm.timeout cannot exceed 10 minutes".to_string()).into());
        }
        if llm.provider == LlmProvider::OpenAi && llm.api_key_env.trim().is_empty() {
            return Err(OrchestrationError::ConfigError("llm.api_key_env is required for the openai provider".to_string()).into());
        }

        if let Some(ref year) = config.demo.current_year {
            if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
                return Err(OrchestrationError::ConfigError(format!("demo.current_year '{}' must be a four digit year", year)).into());
            }
        }

        debug!("Configuration validation passed");
        Ok(())
    }
}

impl FileConfigManager {
    /// Create a default configuration file
    async fn create_default_config(&self) -> Result<()> {
        let default_config = Config::default();
        let toml_content = toml::to_string_pretty(&default_config)
            .map_err(|e| OrchestrationError::ConfigError(format!("Failed to serialize default config: {}", e)))?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| OrchestrationError::ConfigError(format!("Failed to create config directory: {}", e)))?;
            }
        }

        fs::write(&self.config_path, toml_content)
            .map_err(|e| OrchestrationError::ConfigError(format!("Failed to write default config: {}", e)))?;

        info!("Default configuration file created at {:?}", self.config_path);
        Ok(())
    }
}

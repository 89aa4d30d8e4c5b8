//! Environment configuration.

use std::path::PathBuf;
use thiserror::Error;

use crate::generate::{azure, gemini};
use crate::github::DEFAULT_API_URL;

pub const DEFAULT_OWNER: &str = "danielrod02";
pub const DEFAULT_REPO: &str = "flasher";
pub const DEFAULT_DECKS_PATH: &str = "decks";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Azure OpenAI settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AzureConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
}

/// Gemini settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub github_api_url: String,
    pub github_token: Option<String>,
    pub owner: String,
    pub repo: String,
    pub decks_path: String,
    pub db_path: PathBuf,
    azure_endpoint: Option<String>,
    azure_api_key: Option<String>,
    azure_deployment: String,
    gemini_api_key: Option<String>,
    gemini_model: String,
    gemini_api_url: String,
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Self {
            github_api_url: or("GITHUB_API_URL", DEFAULT_API_URL),
            github_token: get("GITHUB_TOKEN"),
            owner: or("FLASHER_OWNER", DEFAULT_OWNER),
            repo: or("FLASHER_REPO", DEFAULT_REPO),
            decks_path: or("FLASHER_DECKS_PATH", DEFAULT_DECKS_PATH),
            db_path: get("FLASHER_DB")
                .map(PathBuf::from)
                .unwrap_or_else(default_db_path),
            azure_endpoint: get("AZURE_OPENAI_ENDPOINT"),
            azure_api_key: get("AZURE_OPENAI_API_KEY"),
            azure_deployment: or("AZURE_OPENAI_DEPLOYMENT", azure::DEFAULT_DEPLOYMENT),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: or("GEMINI_MODEL", gemini::DEFAULT_MODEL),
            gemini_api_url: or("GEMINI_API_URL", gemini::DEFAULT_API_URL),
        }
    }

    pub fn azure(&self) -> Result<AzureConfig, ConfigError> {
        Ok(AzureConfig {
            endpoint: self
                .azure_endpoint
                .clone()
                .ok_or(ConfigError::Missing("AZURE_OPENAI_ENDPOINT"))?,
            api_key: self
                .azure_api_key
                .clone()
                .ok_or(ConfigError::Missing("AZURE_OPENAI_API_KEY"))?,
            deployment: self.azure_deployment.clone(),
        })
    }

    pub fn gemini(&self) -> Result<GeminiConfig, ConfigError> {
        Ok(GeminiConfig {
            api_key: self
                .gemini_api_key
                .clone()
                .ok_or(ConfigError::Missing("GEMINI_API_KEY"))?,
            model: self.gemini_model.clone(),
            api_url: self.gemini_api_url.clone(),
        })
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flasher")
        .join("flasher.db")
}

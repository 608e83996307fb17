use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// How to treat a model reply that mentions an error but still carries
/// well-formed JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorJsonPolicy {
    Accept,
    Reject,
}

impl std::str::FromStr for ErrorJsonPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "accept" => Ok(ErrorJsonPolicy::Accept),
            "reject" => Ok(ErrorJsonPolicy::Reject),
            other => Err(Error::Config(format!(
                "REPOCLASS_ERROR_JSON_POLICY must be 'accept' or 'reject', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub primary_model: String,
    pub fallback_model: String,
    pub template_name: String,
    pub output_path: PathBuf,
    pub temp_prefix: String,
    pub temp_dir: PathBuf,
    pub cooldown_secs: u64,
    pub search_language: String,
    /// Raw `REPOCLASS_ERROR_JSON_POLICY`; only the classify commands parse it.
    pub error_json_policy: String,
}

impl Config {
    pub fn from_env() -> Self {
        let primary_model = env::var("REPOCLASS_PRIMARY_MODEL")
            .unwrap_or_else(|_| "gemini-2.5-pro".to_string());

        let fallback_model = env::var("REPOCLASS_FALLBACK_MODEL")
            .unwrap_or_else(|_| "gemini-2.5-flash".to_string());

        let template_name = env::var("REPOCLASS_TEMPLATE")
            .unwrap_or_else(|_| "repo-classifier".to_string());

        let output_path = env::var("REPOCLASS_OUTPUT")
            .unwrap_or_else(|_| "classified_repos.json".to_string())
            .into();

        let temp_prefix = env::var("REPOCLASS_TEMP_PREFIX")
            .unwrap_or_else(|_| "repoclass-pack-".to_string());

        let temp_dir = env::var("REPOCLASS_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir());

        let cooldown_secs = env::var("REPOCLASS_COOLDOWN_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let search_language = env::var("REPOCLASS_SEARCH_LANGUAGE")
            .unwrap_or_else(|_| "rust".to_string());

        let error_json_policy = env::var("REPOCLASS_ERROR_JSON_POLICY")
            .unwrap_or_else(|_| "accept".to_string());

        Self {
            primary_model,
            fallback_model,
            template_name,
            output_path,
            temp_prefix,
            temp_dir,
            cooldown_secs,
            search_language,
            error_json_policy,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub primary_model: String,
    pub fallback_model: String,
    pub template_name: String,
    pub temp_prefix: String,
    pub temp_dir: PathBuf,
    pub cooldown: Duration,
    pub error_json_policy: ErrorJsonPolicy,
}

impl TryFrom<&Config> for ClassifierConfig {
    type Error = Error;

    fn try_from(config: &Config) -> Result<Self> {
        Ok(Self {
            primary_model: config.primary_model.clone(),
            fallback_model: config.fallback_model.clone(),
            template_name: config.template_name.clone(),
            temp_prefix: config.temp_prefix.clone(),
            temp_dir: config.temp_dir.clone(),
            cooldown: Duration::from_secs(config.cooldown_secs),
            error_json_policy: config.error_json_policy.parse()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub limit_per_search: u32,
    pub total_desired: u32,
    pub language: String,
}

impl SearchConfig {
    pub fn new(config: &Config, limit_per_search: u32, total_desired: u32) -> Result<Self> {
        if limit_per_search == 0 {
            return Err(Error::InvalidInput(
                "--limit must be a positive integer".to_string(),
            ));
        }
        if total_desired == 0 {
            return Err(Error::InvalidInput(
                "--total must be a positive integer".to_string(),
            ));
        }

        Ok(Self {
            limit_per_search,
            total_desired,
            language: config.search_language.clone(),
        })
    }
}

// src/config.rs
use log::warn;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::TravelAgentError;

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub bind_addr: String,
    pub redis_url: Option<String>,
    pub template_store_path: PathBuf,
    pub model_timeout: Duration,
    pub static_dir: PathBuf,
    pub max_image_dimension: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: "DUMMY_KEY".to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            redis_url: None,
            template_store_path: PathBuf::from("data/custom_templates.json"),
            model_timeout: Duration::from_secs(120),
            static_dir: PathBuf::from("static"),
            max_image_dimension: 2048,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, TravelAgentError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset or empty keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TravelAgentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let gemini_api_key = match get("GEMINI_API_KEY") {
            Some(key) => key,
            None => {
                warn!("GEMINI_API_KEY not set; model requests will be rejected");
                defaults.gemini_api_key
            }
        };

        let model_timeout = match get("MODEL_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number::<u64>("MODEL_TIMEOUT_SECS", &raw)?),
            None => defaults.model_timeout,
        };

        let max_image_dimension = match get("MAX_IMAGE_DIMENSION") {
            Some(raw) => parse_number::<u32>("MAX_IMAGE_DIMENSION", &raw)?,
            None => defaults.max_image_dimension,
        };

        Ok(Self {
            gemini_api_key,
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            redis_url: get("REDIS_URL"),
            template_store_path: get("TEMPLATE_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.template_store_path),
            model_timeout,
            static_dir: get("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            max_image_dimension,
        })
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T, TravelAgentError> {
    raw.trim()
        .parse()
        .map_err(|_| TravelAgentError::Config(format!("{} must be a number, got {:?}", key, raw)))
}

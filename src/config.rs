//! Environment-driven settings. `.env` is loaded first when present.

use crate::error::{Result, Text2SqlError};
use std::collections::HashMap;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "../DATA/data.db";
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_WATSONX_URL: &str = "https://us-south.ml.cloud.ibm.com";
pub const DEFAULT_WATSONX_MODEL: &str = "openai/gpt-oss-120b";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq)]
pub enum LlmBackend {
    Watsonx {
        url: String,
        api_key: String,
        project_id: String,
        model_id: String,
    },
    OpenAi {
        base_url: String,
        api_key: String,
        model: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub db_read_only: bool,
    pub bind_addr: String,
    pub backend: LlmBackend,
    pub llm_timeout_secs: u64,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Build settings from an explicit variable map. Missing credentials for
    /// the selected backend are an error.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| {
            get(key).ok_or_else(|| {
                Text2SqlError::Config(format!("Missing {} in environment.", key))
            })
        };

        let backend_name = get("TEXT2SQL_LLM_BACKEND").unwrap_or_else(|| "watsonx".to_string());
        let backend = match backend_name.to_lowercase().as_str() {
            "watsonx" => LlmBackend::Watsonx {
                url: get("WATSONX_URL").unwrap_or_else(|| DEFAULT_WATSONX_URL.to_string()),
                api_key: require("WATSONX_API_KEY")?,
                project_id: require("WATSONX_PROJECT_ID")?,
                model_id: get("WATSONX_MODEL_ID")
                    .unwrap_or_else(|| DEFAULT_WATSONX_MODEL.to_string()),
            },
            "openai" => LlmBackend::OpenAi {
                base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
                api_key: require("OPENAI_API_KEY")?,
                model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            },
            other => {
                return Err(Text2SqlError::Config(format!(
                    "Unknown TEXT2SQL_LLM_BACKEND '{}' (expected 'watsonx' or 'openai')",
                    other
                )))
            }
        };

        let db_read_only = match get("DB_READ_ONLY") {
            None => true,
            Some(v) => parse_bool(&v).ok_or_else(|| {
                Text2SqlError::Config(format!("DB_READ_ONLY must be true or false, got '{}'", v))
            })?,
        };

        let llm_timeout_secs = match get("TEXT2SQL_LLM_TIMEOUT_SECS") {
            None => DEFAULT_LLM_TIMEOUT_SECS,
            Some(v) => v.parse().map_err(|_| {
                Text2SqlError::Config(format!(
                    "TEXT2SQL_LLM_TIMEOUT_SECS must be an integer, got '{}'",
                    v
                ))
            })?,
        };

        Ok(Self {
            db_path: PathBuf::from(get("DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string())),
            db_read_only,
            bind_addr: get("TEXT2SQL_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            backend,
            llm_timeout_secs,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_watsonx_defaults() {
        let settings = Settings::from_vars(&vars(&[
            ("WATSONX_API_KEY", "key"),
            ("WATSONX_PROJECT_ID", "proj"),
        ]))
        .unwrap();

        assert_eq!(settings.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert!(settings.db_read_only);
        assert_eq!(settings.bind_addr, DEFAULT_BIND);
        assert_eq!(settings.llm_timeout_secs, DEFAULT_LLM_TIMEOUT_SECS);
        assert_eq!(
            settings.backend,
            LlmBackend::Watsonx {
                url: DEFAULT_WATSONX_URL.to_string(),
                api_key: "key".to_string(),
                project_id: "proj".to_string(),
                model_id: DEFAULT_WATSONX_MODEL.to_string(),
            }
        );
    }

    #[test]
    fn test_missing_credentials_fail_fast() {
        let err = Settings::from_vars(&vars(&[("WATSONX_API_KEY", "key")])).unwrap_err();
        assert!(err.to_string().contains("WATSONX_PROJECT_ID"));

        let err = Settings::from_vars(&vars(&[
            ("TEXT2SQL_LLM_BACKEND", "openai"),
            ("OPENAI_API_KEY", "  "),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_openai_backend_and_overrides() {
        let settings = Settings::from_vars(&vars(&[
            ("TEXT2SQL_LLM_BACKEND", "OpenAI"),
            ("OPENAI_API_KEY", "sk"),
            ("OPENAI_MODEL", "local-model"),
            ("DB_PATH", "/data/sales.db"),
            ("DB_READ_ONLY", "false"),
            ("TEXT2SQL_BIND", "127.0.0.1:9000"),
            ("TEXT2SQL_LLM_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();

        assert_eq!(settings.db_path, PathBuf::from("/data/sales.db"));
        assert!(!settings.db_read_only);
        assert_eq!(settings.bind_addr, "127.0.0.1:9000");
        assert_eq!(settings.llm_timeout_secs, 30);
        assert!(matches!(
            settings.backend,
            LlmBackend::OpenAi { ref model, .. } if model == "local-model"
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = [("WATSONX_API_KEY", "k"), ("WATSONX_PROJECT_ID", "p")];
        let mut bad = vars(&base);
        bad.insert("DB_READ_ONLY".to_string(), "maybe".to_string());
        assert!(Settings::from_vars(&bad).is_err());

        let mut bad = vars(&base);
        bad.insert("TEXT2SQL_LLM_BACKEND".to_string(), "bard".to_string());
        assert!(Settings::from_vars(&bad).is_err());
    }
}

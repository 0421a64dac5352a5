mod types;

pub use types::*;

use crate::{Error, Result};
use std::env;
use tracing::debug;

/// Environment variables consulted for the inference credential, in priority order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GROQ_API_KEY", "LLM_API_KEY"];

pub async fn load() -> Result<Config> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

    let mut config = if tokio::fs::try_exists(&config_path).await? {
        debug!("Loading configuration from: {}", config_path);
        let config_str = tokio::fs::read_to_string(&config_path).await?;
        parse(&config_str)?
    } else {
        debug!(
            "No configuration file at {}, using defaults and environment",
            config_path
        );
        Config::default()
    };

    apply_env_overrides(&mut config, |name| env::var(name).ok());
    validate(&config)?;

    Ok(config)
}

pub fn parse(config_str: &str) -> Result<Config> {
    Ok(serde_yaml::from_str(config_str)?)
}

/// Overlays environment values on top of file configuration. `lookup` is injected so
/// tests never have to touch the process environment.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = API_KEY_ENV_VARS
        .iter()
        .filter_map(|name| lookup(*name))
        .find(|value| !value.trim().is_empty())
    {
        config.llm.api_key = key;
    }
}

pub fn validate(config: &Config) -> Result<()> {
    if config.llm.api_key.trim().is_empty() {
        return Err(Error::config(format!(
            "Missing inference API key: set llm.api_key or one of {}",
            API_KEY_ENV_VARS.join(", ")
        )));
    }

    if config.llm.request_timeout_secs == 0 {
        return Err(Error::config("llm.request_timeout_secs must be greater than 0"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = parse("llm:\n  api_key: abc\n").unwrap();

        assert_eq!(config.llm.api_key, "abc");
        assert_eq!(config.llm.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(config.llm.text_model, "llama3-8b-8192");
        assert_eq!(config.llm.vision_model, "llama-3.2-11b-vision-preview");
        assert_eq!(config.llm.request_timeout_secs, 30);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.logs.level, "info");
        assert_eq!(config.server.body_limit_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn test_env_key_overrides_file() {
        let mut config = parse("llm:\n  api_key: from-file\n").unwrap();
        apply_env_overrides(&mut config, lookup_from(&[("GROQ_API_KEY", "from-env")]));
        assert_eq!(config.llm.api_key, "from-env");
    }

    #[test]
    fn test_blank_env_key_is_ignored() {
        let mut config = parse("llm:\n  api_key: from-file\n").unwrap();
        apply_env_overrides(
            &mut config,
            lookup_from(&[("GROQ_API_KEY", "  "), ("LLM_API_KEY", "fallback")]),
        );
        assert_eq!(config.llm.api_key, "fallback");
    }

    #[test]
    fn test_missing_api_key_fails_validation() {
        let err = validate(&Config::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[test]
    fn test_zero_timeout_fails_validation() {
        let mut config = Config::default();
        config.llm.api_key = "key".to_string();
        config.llm.request_timeout_secs = 0;
        assert!(validate(&config).is_err());
    }
}

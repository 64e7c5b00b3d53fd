use std::env;
use std::time::Duration;

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub model: String,
    pub api_url: String,
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl ProviderConfig {
    pub fn from_env(provider: &str) -> Result<Self, String> {
        Self::from_lookup(provider, |key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(provider: &str, lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = provider.to_uppercase();

        let api_key = lookup(&format!("{}_API_KEY", prefix))
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| format!("{}_API_KEY environment variable not set", prefix))?;

        let model = lookup(&format!("{}_MODEL", prefix)).unwrap_or_else(|| match provider {
            "gemini" => DEFAULT_GEMINI_MODEL.to_string(),
            _ => String::new(),
        });

        let api_url = lookup(&format!("{}_API_URL", prefix))
            .unwrap_or_else(|| match provider {
                "gemini" => DEFAULT_GEMINI_API_URL.to_string(),
                _ => String::new(),
            })
            .trim_end_matches('/')
            .to_string();

        let temperature = lookup(&format!("{}_TEMPERATURE", prefix))
            .and_then(|t| t.parse().ok())
            .unwrap_or(0.4);

        let request_timeout = lookup("FOOD_REQUEST_TIMEOUT_SECS")
            .and_then(|t| t.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(60));

        Ok(Self {
            api_key,
            model,
            api_url,
            temperature,
            request_timeout,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_for_gemini() {
        let config = ProviderConfig::from_lookup("gemini", lookup(&[("GEMINI_API_KEY", "abc")])).unwrap();
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.model, "gemini-1.5-flash");
        assert_eq!(config.api_url, "https://generativelanguage.googleapis.com/v1beta");
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_overrides_and_trailing_slash() {
        let config = ProviderConfig::from_lookup(
            "gemini",
            lookup(&[
                ("GEMINI_API_KEY", "abc"),
                ("GEMINI_MODEL", "gemini-2.0-flash-exp"),
                ("GEMINI_API_URL", "http://localhost:9000/v1/"),
                ("GEMINI_TEMPERATURE", "0.9"),
                ("FOOD_REQUEST_TIMEOUT_SECS", "5"),
            ]),
        )
        .unwrap();
        assert_eq!(config.model, "gemini-2.0-flash-exp");
        assert_eq!(config.api_url, "http://localhost:9000/v1");
        assert!((config.temperature - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let err = ProviderConfig::from_lookup("gemini", lookup(&[("GEMINI_API_KEY", "  ")])).unwrap_err();
        assert!(err.contains("GEMINI_API_KEY"));
    }
}

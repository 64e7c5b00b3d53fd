use std::path::PathBuf;
use std::time::Duration;

use crate::food::analyzer::AnalyzerConfig;

#[derive(Debug, Clone)]
pub struct FoodConfig {
    pub database_path: PathBuf,
    pub image_dir: PathBuf,
    pub history_limit: usize,
    pub persist_retries: u32,
    pub retry_delay: Duration,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/food_quality.db"),
            image_dir: PathBuf::from("data/images"),
            history_limit: 10,
            persist_retries: 1,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl FoodConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            database_path: lookup("FOOD_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            image_dir: lookup("FOOD_IMAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.image_dir),
            history_limit: lookup("FOOD_HISTORY_LIMIT")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.history_limit),
            persist_retries: lookup("FOOD_PERSIST_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.persist_retries),
            retry_delay: defaults.retry_delay,
        }
    }

    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            history_limit: self.history_limit,
            persist_retries: self.persist_retries,
            retry_delay: self.retry_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lookup_falls_back_on_bad_values() {
        let config = FoodConfig::from_lookup(|key| match key {
            "FOOD_DB_PATH" => Some("/tmp/food.db".to_string()),
            "FOOD_HISTORY_LIMIT" => Some("0".to_string()),
            "FOOD_PERSIST_RETRIES" => Some("three".to_string()),
            _ => None,
        });
        assert_eq!(config.database_path, PathBuf::from("/tmp/food.db"));
        assert_eq!(config.image_dir, PathBuf::from("data/images"));
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.persist_retries, 1);
    }
}

use serde::Deserialize;
use slog::{warn, o};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::logging::DEFAULT;
use crate::search::{SearchGrid, DEFAULT_TRAIN_RATIO};

// TOML configuration structure
#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct SearchConfig {
    #[serde(default = "default_p_values")]
    pub p_values: Vec<usize>,
    #[serde(default = "default_d_values")]
    pub d_values: Vec<usize>,
    #[serde(default = "default_q_values")]
    pub q_values: Vec<usize>,
    #[serde(default = "default_train_ratio")]
    pub train_ratio: f64,
    #[serde(default)]
    pub parallel: bool,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct ForecastConfig {
    #[serde(default = "default_horizon")]
    pub horizon: usize,
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct DataConfig {
    // Built-in TV seasons dataset when unset
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default = "default_series")]
    pub series: String,
}

// Default values
fn default_p_values() -> Vec<usize> {
    vec![0, 1, 2]
}
fn default_d_values() -> Vec<usize> {
    vec![0, 1]
}
fn default_q_values() -> Vec<usize> {
    vec![0, 1]
}
fn default_train_ratio() -> f64 {
    DEFAULT_TRAIN_RATIO
}
fn default_horizon() -> usize {
    5
}
fn default_series() -> String {
    "us_tv_seasons".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            p_values: default_p_values(),
            d_values: default_d_values(),
            q_values: default_q_values(),
            train_ratio: default_train_ratio(),
            parallel: false,
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
            json: false,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            database: None,
            series: default_series(),
        }
    }
}

impl SearchConfig {
    pub fn grid(&self) -> SearchGrid {
        SearchGrid::new(&self.p_values, &self.d_values, &self.q_values)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let mut config: Config = text.parse()?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file means defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::load(path);
        }

        let log = DEFAULT.new(o!("function" => "Config::load_or_default"));
        warn!(log, "config file not found, using defaults"; "path" => %path.display());
        let mut config = Config::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Override settings from `FORECAST_*` variables provided by `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(v) = get("FORECAST_HORIZON") {
            self.forecast.horizon = parse_var("FORECAST_HORIZON", &v)?;
        }
        if let Some(v) = get("FORECAST_PARALLEL") {
            self.search.parallel = parse_var("FORECAST_PARALLEL", &v)?;
        }
        if let Some(v) = get("FORECAST_DATABASE") {
            self.data.database = Some(v);
        }
        if let Some(v) = get("FORECAST_SERIES") {
            self.data.series = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.forecast.horizon == 0 {
            return Err(ConfigError::Invalid("forecast.horizon must be at least 1".to_string()));
        }
        if self.search.grid().is_empty() {
            return Err(ConfigError::Invalid(
                "search.p_values, d_values and q_values must all be non-empty".to_string(),
            ));
        }
        let ratio = self.search.train_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "search.train_ratio must be in (0, 1), got {}",
                ratio
            )));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} has invalid value {:?}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = "".parse().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.search.p_values, vec![0, 1, 2]);
        assert_eq!(config.search.train_ratio, 0.66);
        assert_eq!(config.forecast.horizon, 5);
        assert_eq!(config.data.database, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config: Config = r#"
            [search]
            p_values = [0, 1]
            parallel = true

            [forecast]
            horizon = 15
        "#
        .parse()
        .unwrap();

        assert_eq!(config.search.p_values, vec![0, 1]);
        assert_eq!(config.search.d_values, vec![0, 1]);
        assert!(config.search.parallel);
        assert_eq!(config.forecast.horizon, 15);
        assert_eq!(config.search.grid().len(), 8);
    }

    #[test]
    fn malformed_toml_is_reported() {
        let err = "[search\np_values = 1".parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn overrides_replace_file_values() {
        let vars: HashMap<&str, &str> = [
            ("FORECAST_HORIZON", "3"),
            ("FORECAST_PARALLEL", "true"),
            ("FORECAST_DATABASE", "/tmp/series.db"),
            ("FORECAST_SERIES", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.forecast.horizon, 3);
        assert!(config.search.parallel);
        assert_eq!(config.data.database.as_deref(), Some("/tmp/series.db"));
        // Empty values are ignored
        assert_eq!(config.data.series, "us_tv_seasons");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|name| (name == "FORECAST_HORIZON").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let mut config = Config::default();
        config.forecast.horizon = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.search.q_values.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.search.train_ratio = 1.0;
        assert!(config.validate().is_err());
    }
}

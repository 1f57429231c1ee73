use thiserror::Error;

use crate::model::{ModelKind, ModelOrder};

pub type Result<T> = std::result::Result<T, ForecastError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// The model could not be fitted at this order.
    #[error("{model}{order} failed to fit: {reason}")]
    FitFailure {
        model: ModelKind,
        order: ModelOrder,
        reason: String,
    },

    /// Every candidate in the grid failed, or the grid was empty.
    #[error("no order in the search grid could be fitted; the series is too short or degenerate")]
    EmptySearchSpace,

    #[error("forecast horizon must be positive, got {0}")]
    InvalidHorizon(usize),

    #[error("invalid series: {0}")]
    InvalidSeries(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ForecastError {
    pub(crate) fn fit(model: ModelKind, order: ModelOrder, reason: impl Into<String>) -> Self {
        ForecastError::FitFailure {
            model,
            order,
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("cannot parse entry {entry:?}: {reason}")]
    Parse { entry: String, reason: String },

    #[error(transparent)]
    Series(#[from] ForecastError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

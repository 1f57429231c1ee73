use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ForecastError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub period: i32,
    pub value: f64,
}

impl Observation {
    pub fn new(period: i32, value: f64) -> Self {
        Observation { period, value }
    }
}

/// A yearly series of non-negative counts with no gaps between periods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    observations: Vec<Observation>,
}

impl Series {
    pub fn new(observations: Vec<Observation>) -> Result<Self> {
        if observations.is_empty() {
            return Err(ForecastError::InvalidSeries("series is empty".to_string()));
        }

        for obs in &observations {
            if !obs.value.is_finite() || obs.value < 0.0 {
                return Err(ForecastError::InvalidSeries(format!(
                    "value {} for period {} is not a non-negative number",
                    obs.value, obs.period
                )));
            }
        }

        for pair in observations.windows(2) {
            if pair[0].period.checked_add(1) != Some(pair[1].period) {
                return Err(ForecastError::InvalidSeries(format!(
                    "period {} does not follow {}",
                    pair[1].period, pair[0].period
                )));
            }
        }

        Ok(Series { observations })
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (i32, f64)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(period, value)| Observation::new(period, value))
                .collect(),
        )
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value).collect()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first_period(&self) -> i32 {
        self.observations[0].period
    }

    pub fn last_period(&self) -> i32 {
        self.observations[self.observations.len() - 1].period
    }
}

/// ARIMA order: autoregressive lags, differencing degree, moving-average lags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ModelOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        ModelOrder { p, d, q }
    }

    /// Smallest number of observations a fit at this order accepts.
    pub fn min_observations(&self) -> usize {
        self.d + self.p + self.q + 1
    }
}

impl fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.p, self.d, self.q)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Plain ARIMA, with a constant term when the series is not differenced.
    Arima,
    /// SARIMAX with no seasonal component, no exogenous regressors and no trend term.
    Sarimax,
}

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Arima => "ARIMA",
            ModelKind::Sarimax => "SARIMAX",
        }
    }

    pub fn includes_mean(&self, order: ModelOrder) -> bool {
        matches!(self, ModelKind::Arima) && order.d == 0
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Score {
    Rmse(f64),
    Invalid { reason: String },
}

impl Score {
    pub fn rmse(&self) -> Option<f64> {
        match self {
            Score::Rmse(rmse) => Some(*rmse),
            Score::Invalid { .. } => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Score::Rmse(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub order: ModelOrder,
    pub score: Score,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub order: ModelOrder,
    pub rmse: f64,
    // Every candidate, in grid order
    pub evaluations: Vec<Evaluation>,
}

impl SearchOutcome {
    pub fn invalid_count(&self) -> usize {
        self.evaluations.iter().filter(|e| !e.score.is_valid()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub period: i32,
    pub arima: f64,
    pub sarimax: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastTable {
    rows: Vec<ForecastRow>,
}

impl ForecastTable {
    pub fn new(rows: Vec<ForecastRow>) -> Self {
        ForecastTable { rows }
    }

    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ForecastRow> {
        self.rows.iter()
    }
}

impl fmt::Display for ForecastTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<8}{:>14}{:>14}", "Year", "ARIMA", "SARIMAX")?;
        for row in &self.rows {
            writeln!(f, "{:<8}{:>14.2}{:>14.2}", row.period, row.arima, row.sarimax)?;
        }
        Ok(())
    }
}

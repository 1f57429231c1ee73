//! ARIMA order search and two-model forecasting for yearly count series.
//!
//! The pipeline has three stages, each a plain function with no shared state:
//! [`search_best_order`] scores every `(p, d, q)` in a grid by walk-forward
//! RMSE, then [`forecast`] fits ARIMA and SARIMAX at the chosen order over
//! the full series and projects both forward, floored at zero.

pub mod arima;
pub mod config;
pub mod error;
pub mod forecast;
pub mod loader;
pub mod logging;
pub mod model;
pub mod optimize;
pub mod search;
pub mod stats;
pub mod summary;

pub use error::{ForecastError, Result};
pub use forecast::{forecast, forecast_report, ForecastReport};
pub use model::{
    Evaluation, ForecastRow, ForecastTable, ModelKind, ModelOrder, Observation, Score,
    SearchOutcome, Series,
};
pub use search::{
    evaluate_order, evaluate_order_with, rolling_predictions, search_best_order, search_grid,
    search_grid_parallel, LogProgress, NoProgress, Progress, ProgressSink, SearchGrid,
    StepPrediction,
};
pub use summary::FitSummary;

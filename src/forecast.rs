use serde::Serialize;
use slog::{info, o};

use crate::arima;
use crate::error::{ForecastError, Result};
use crate::logging::DEFAULT;
use crate::model::{ForecastRow, ForecastTable, ModelKind, ModelOrder, Series};
use crate::stats::clamp_non_negative;
use crate::summary::FitSummary;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    pub order: ModelOrder,
    pub table: ForecastTable,
    pub arima: FitSummary,
    pub sarimax: FitSummary,
}

/// Project `horizon` periods past the end of `series` with ARIMA and SARIMAX
/// fitted at `order` over the whole series. Values are floored at zero.
pub fn forecast(series: &Series, order: ModelOrder, horizon: usize) -> Result<ForecastTable> {
    forecast_report(series, order, horizon).map(|report| report.table)
}

/// Like [`forecast`], also returning a fit summary for each model.
pub fn forecast_report(
    series: &Series,
    order: ModelOrder,
    horizon: usize,
) -> Result<ForecastReport> {
    if horizon == 0 {
        return Err(ForecastError::InvalidHorizon(horizon));
    }

    let last = series.last_period();
    let end = i32::try_from(horizon)
        .ok()
        .and_then(|h| last.checked_add(h))
        .ok_or(ForecastError::InvalidHorizon(horizon))?;

    let log = DEFAULT.new(o!("function" => "forecast_report", "order" => order.to_string()));
    let values = series.values();

    let arima = arima::fit(&values, order, ModelKind::Arima)?;
    let sarimax = arima::fit(&values, order, ModelKind::Sarimax)?;

    let rows: Vec<ForecastRow> = arima
        .checked_forecast(horizon)?
        .into_iter()
        .zip(sarimax.checked_forecast(horizon)?)
        .zip(last + 1..=end)
        .map(|((a, s), period)| ForecastRow {
            period,
            arima: clamp_non_negative(a),
            sarimax: clamp_non_negative(s),
        })
        .collect();

    info!(log, "forecast ready";
        "horizon" => horizon,
        "from" => last + 1,
        "to" => end
    );

    Ok(ForecastReport {
        order,
        table: ForecastTable::new(rows),
        arima: FitSummary::from(&arima),
        sarimax: FitSummary::from(&sarimax),
    })
}

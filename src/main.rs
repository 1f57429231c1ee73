use slog::{error, info, o};
use std::path::PathBuf;
use std::process::ExitCode;

use tv_forecast::config::Config;
use tv_forecast::logging::{self, DEFAULT};
use tv_forecast::{forecast_report, loader, search_grid, search_grid_parallel, LogProgress};

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let log = DEFAULT.new(o!("function" => "run"));

    let path = std::env::var("FORECAST_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("forecast.toml"));
    let config = Config::load_or_default(&path)?;

    let series = match &config.data.database {
        Some(db) => loader::load_series(db, &config.data.series)?,
        None => loader::tv_seasons()?,
    };
    info!(log, "series loaded";
        "name" => &config.data.series,
        "from" => series.first_period(),
        "to" => series.last_period()
    );

    let grid = config.search.grid();
    let mut progress = LogProgress::new(&log);
    let outcome = if config.search.parallel {
        search_grid_parallel(&series, &grid, config.search.train_ratio, &mut progress)?
    } else {
        search_grid(&series, &grid, config.search.train_ratio, &mut progress)?
    };
    info!(log, "search finished"; "best" => %outcome.order, "rmse" => outcome.rmse);

    let report = forecast_report(&series, outcome.order, config.forecast.horizon)?;

    if config.forecast.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Best ARIMA{} RMSE={:.3}\n", outcome.order, outcome.rmse);
        println!("{}\n", report.arima);
        println!("{}\n", report.sarimax);
        println!("Predictions for the next {} years:", config.forecast.horizon);
        print!("{}", report.table);
    }

    Ok(())
}

fn main() -> ExitCode {
    let code = match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(DEFAULT, "forecast failed"; "error" => %e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    };
    logging::flush();
    code
}

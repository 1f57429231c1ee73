//! Invariants that hold for any valid series and order.

use proptest::prelude::*;
use tv_forecast::search::DEFAULT_TRAIN_RATIO;
use tv_forecast::{forecast, rolling_predictions, ForecastError, ModelOrder, Series};

fn counts_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0..500.0_f64, min_len..max_len)
}

fn order_strategy() -> impl Strategy<Value = ModelOrder> {
    (0usize..3, 0usize..3, 0usize..3).prop_map(|(p, d, q)| ModelOrder::new(p, d, q))
}

fn make_series(values: &[f64]) -> Series {
    Series::from_pairs(values.iter().enumerate().map(|(i, v)| (1990 + i as i32, *v))).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn forecasts_are_never_negative(
        values in counts_strategy(2, 30),
        order in order_strategy(),
        horizon in 1usize..12,
    ) {
        let series = make_series(&values);
        match forecast(&series, order, horizon) {
            Ok(table) => {
                prop_assert_eq!(table.len(), horizon);
                for (i, row) in table.iter().enumerate() {
                    prop_assert_eq!(row.period, series.last_period() + 1 + i as i32);
                    prop_assert!(row.arima >= 0.0);
                    prop_assert!(row.sarimax >= 0.0);
                }
            }
            Err(err) => {
                let is_fit_failure = matches!(err, ForecastError::FitFailure { .. });
                prop_assert!(is_fit_failure);
                prop_assert!(values.len() < order.min_observations());
            }
        }
    }

    #[test]
    fn rolling_predictions_are_never_negative(
        values in counts_strategy(3, 24),
        order in order_strategy(),
    ) {
        let series = make_series(&values);
        if let Ok(steps) = rolling_predictions(&series, order, DEFAULT_TRAIN_RATIO) {
            let train = (values.len() as f64 * DEFAULT_TRAIN_RATIO).floor() as usize;
            prop_assert_eq!(steps.len(), values.len() - train);
            for step in steps {
                prop_assert!(step.predicted >= 0.0);
            }
        }
    }
}

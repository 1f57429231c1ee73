//! End-to-end search and forecast scenarios.

use tv_forecast::{
    evaluate_order, forecast, loader, search_best_order, ForecastError, ModelOrder, NoProgress,
    Progress, Series,
};

fn recent_seasons() -> Series {
    Series::from_pairs([
        (2019, 215.0),
        (2020, 170.0),
        (2021, 168.0),
        (2022, 165.0),
        (2023, 119.0),
    ])
    .unwrap()
}

#[test]
fn short_series_search_then_forecast() {
    let series = recent_seasons();
    let mut fractions = Vec::new();
    let outcome = search_best_order(&series, &[0, 1], &[0, 1], &[0, 1], &mut |p: &Progress| {
        fractions.push(p.fraction())
    })
    .unwrap();

    let order = outcome.order;
    assert!(order.p <= 1 && order.d <= 1 && order.q <= 1);
    assert!(outcome.rmse.is_finite() && outcome.rmse >= 0.0);
    assert_eq!(fractions.len(), 8);
    assert!(fractions.windows(2).all(|w| w[0] < w[1]));

    let table = forecast(&series, order, 3).unwrap();
    let periods: Vec<i32> = table.iter().map(|r| r.period).collect();
    assert_eq!(periods, vec![2024, 2025, 2026]);
    for row in table.iter() {
        assert!(row.arima.is_finite() && row.arima >= 0.0);
        assert!(row.sarimax.is_finite() && row.sarimax >= 0.0);
    }
}

#[test]
fn two_points_cannot_be_differenced_twice() {
    let series = Series::from_pairs([(2022, 165.0), (2023, 119.0)]).unwrap();

    let outcome = search_best_order(&series, &[0], &[0, 1, 2], &[0], &mut NoProgress).unwrap();
    assert_eq!(outcome.order, ModelOrder::new(0, 0, 0));
    assert_eq!(outcome.invalid_count(), 2);

    let only_d2 = search_best_order(&series, &[0], &[2], &[0], &mut NoProgress);
    assert_eq!(only_d2.unwrap_err(), ForecastError::EmptySearchSpace);
}

#[test]
fn single_valid_order_is_selected() {
    // Three training points are too few for AR(3)
    let series = recent_seasons();
    let outcome = search_best_order(&series, &[3, 0], &[0], &[0], &mut NoProgress).unwrap();
    assert_eq!(outcome.order, ModelOrder::new(0, 0, 0));
    assert!(!outcome.evaluations[0].score.is_valid());
}

#[test]
fn zero_horizon_is_rejected() {
    let series = recent_seasons();
    assert_eq!(
        forecast(&series, ModelOrder::new(1, 1, 0), 0).unwrap_err(),
        ForecastError::InvalidHorizon(0)
    );
}

#[test]
fn search_is_deterministic() {
    let series = loader::tv_seasons().unwrap();
    let first = search_best_order(&series, &[0, 1], &[0, 1], &[0, 1], &mut NoProgress).unwrap();
    let second = search_best_order(&series, &[0, 1], &[0, 1], &[0, 1], &mut NoProgress).unwrap();
    assert_eq!(first, second);
    assert_eq!(evaluate_order(&series, first.order).unwrap(), first.rmse);
}

#[test]
fn full_dataset_default_grid() {
    let series = loader::tv_seasons().unwrap();
    let outcome =
        search_best_order(&series, &[0, 1, 2], &[0, 1], &[0, 1], &mut NoProgress).unwrap();
    assert_eq!(outcome.evaluations.len(), 12);
    assert!(outcome.rmse > 0.0);

    let table = forecast(&series, outcome.order, 5).unwrap();
    assert_eq!(table.len(), 5);
    assert_eq!(table.rows()[0].period, 2024);
    assert_eq!(table.rows()[4].period, 2028);
    assert!(table.iter().all(|r| r.arima >= 0.0 && r.sarimax >= 0.0));
}

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use slog::{debug, info, o, Logger};
use std::sync::Mutex;

use crate::arima;
use crate::error::{ForecastError, Result};
use crate::logging::DEFAULT;
use crate::model::{Evaluation, ModelKind, ModelOrder, Score, SearchOutcome, Series};
use crate::stats::{clamp_non_negative, rmse, train_size};

pub const DEFAULT_TRAIN_RATIO: f64 = 0.66;

/// Candidate values for each order component. Iterates p outermost, q innermost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchGrid {
    pub p: Vec<usize>,
    pub d: Vec<usize>,
    pub q: Vec<usize>,
}

impl SearchGrid {
    pub fn new(p: &[usize], d: &[usize], q: &[usize]) -> Self {
        SearchGrid {
            p: p.to_vec(),
            d: d.to_vec(),
            q: q.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.p.len() * self.d.len() * self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn orders(&self) -> impl Iterator<Item = ModelOrder> + '_ {
        self.p.iter().flat_map(move |&p| {
            self.d
                .iter()
                .flat_map(move |&d| self.q.iter().map(move |&q| ModelOrder::new(p, d, q)))
        })
    }
}

/// One walk-forward step: fit on `window`, then predict `actual`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step<'a> {
    pub window: &'a [f64],
    pub actual: f64,
}

/// Expanding-window iterator over the held-out tail of a series. Each window is
/// the previous one plus the previous step's true value.
#[derive(Debug, Clone)]
pub struct WalkForward<'a> {
    values: &'a [f64],
    next: usize,
}

impl<'a> WalkForward<'a> {
    pub fn new(values: &'a [f64], train: usize) -> Self {
        WalkForward { values, next: train }
    }
}

impl<'a> Iterator for WalkForward<'a> {
    type Item = Step<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let actual = *self.values.get(self.next)?;
        let step = Step {
            window: &self.values[..self.next],
            actual,
        };
        self.next += 1;
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.values.len().saturating_sub(self.next);
        (left, Some(left))
    }
}

impl ExactSizeIterator for WalkForward<'_> {}

/// Walk-forward RMSE of `order` over the last 34% of `series`.
pub fn evaluate_order(series: &Series, order: ModelOrder) -> Result<f64> {
    evaluate_order_with(series, order, DEFAULT_TRAIN_RATIO)
}

pub fn evaluate_order_with(series: &Series, order: ModelOrder, train_ratio: f64) -> Result<f64> {
    let steps = rolling_predictions(series, order, train_ratio)?;
    let actual: Vec<f64> = steps.iter().map(|s| s.actual).collect();
    let predicted: Vec<f64> = steps.iter().map(|s| s.predicted).collect();
    Ok(rmse(&actual, &predicted))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepPrediction {
    pub period: i32,
    pub actual: f64,
    /// One step ahead from everything before `period`, floored at zero.
    pub predicted: f64,
}

/// The held-out one-step predictions behind [`evaluate_order_with`].
pub fn rolling_predictions(
    series: &Series,
    order: ModelOrder,
    train_ratio: f64,
) -> Result<Vec<StepPrediction>> {
    check_ratio(train_ratio)?;
    let values = series.values();
    let train = train_size(values.len(), train_ratio);
    if train == 0 {
        return Err(ForecastError::fit(
            ModelKind::Arima,
            order,
            format!("training split of {} observations is empty", values.len()),
        ));
    }

    WalkForward::new(&values, train)
        .map(|step| -> Result<StepPrediction> {
            let model = arima::fit(step.window, order, ModelKind::Arima)?;
            Ok(StepPrediction {
                period: series.first_period() + step.window.len() as i32,
                actual: step.actual,
                predicted: clamp_non_negative(model.forecast_one()?),
            })
        })
        .collect()
}

fn check_ratio(train_ratio: f64) -> Result<()> {
    if train_ratio > 0.0 && train_ratio < 1.0 {
        Ok(())
    } else {
        Err(ForecastError::InvalidParameter(format!(
            "train ratio must be in (0, 1), got {}",
            train_ratio
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub order: ModelOrder,
    /// None when this order failed to fit.
    pub rmse: Option<f64>,
    pub best: Option<(ModelOrder, f64)>,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f64 / self.total as f64
    }
}

/// Receives one update after every evaluated grid cell.
pub trait ProgressSink {
    fn report(&mut self, progress: &Progress);
}

impl<F: FnMut(&Progress)> ProgressSink for F {
    fn report(&mut self, progress: &Progress) {
        self(progress)
    }
}

pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _: &Progress) {}
}

/// Writes every update to a logger at info level.
pub struct LogProgress {
    log: Logger,
}

impl LogProgress {
    pub fn new(log: &Logger) -> Self {
        LogProgress {
            log: log.new(o!("sink" => "search_progress")),
        }
    }
}

impl ProgressSink for LogProgress {
    fn report(&mut self, progress: &Progress) {
        let best = progress
            .best
            .map(|(order, rmse)| format!("ARIMA{} RMSE={:.3}", order, rmse))
            .unwrap_or_else(|| "none".to_string());
        match progress.rmse {
            Some(rmse) => info!(self.log, "evaluated";
                "order" => %progress.order,
                "rmse" => format!("{:.3}", rmse),
                "progress" => format!("{:.0}%", progress.fraction() * 100.0),
                "best" => best
            ),
            None => info!(self.log, "skipped unfittable order";
                "order" => %progress.order,
                "progress" => format!("{:.0}%", progress.fraction() * 100.0),
                "best" => best
            ),
        }
    }
}

/// Grid search over `p x d x q` with the default train ratio.
pub fn search_best_order(
    series: &Series,
    p_candidates: &[usize],
    d_candidates: &[usize],
    q_candidates: &[usize],
    progress: &mut dyn ProgressSink,
) -> Result<SearchOutcome> {
    let grid = SearchGrid::new(p_candidates, d_candidates, q_candidates);
    search_grid(series, &grid, DEFAULT_TRAIN_RATIO, progress)
}

pub fn search_grid(
    series: &Series,
    grid: &SearchGrid,
    train_ratio: f64,
    progress: &mut dyn ProgressSink,
) -> Result<SearchOutcome> {
    let log = DEFAULT.new(o!("function" => "search_grid"));
    check_ratio(train_ratio)?;

    let total = grid.len();
    let mut evaluations = Vec::with_capacity(total);
    let mut best: Option<(ModelOrder, f64)> = None;

    for (i, order) in grid.orders().enumerate() {
        let evaluation = evaluate(&log, series, order, train_ratio);
        if let Some(rmse) = evaluation.score.rmse() {
            if best.map_or(true, |(_, b)| rmse < b) {
                best = Some((order, rmse));
            }
        }
        progress.report(&Progress {
            completed: i + 1,
            total,
            order,
            rmse: evaluation.score.rmse(),
            best,
        });
        evaluations.push(evaluation);
    }

    finish(&log, evaluations)
}

/// Same result as [`search_grid`], with grid cells evaluated on the rayon pool.
/// Updates arrive in completion order.
pub fn search_grid_parallel(
    series: &Series,
    grid: &SearchGrid,
    train_ratio: f64,
    progress: &mut (dyn ProgressSink + Send),
) -> Result<SearchOutcome> {
    let log = DEFAULT.new(o!("function" => "search_grid_parallel"));
    check_ratio(train_ratio)?;

    let total = grid.len();
    let orders: Vec<ModelOrder> = grid.orders().collect();
    let state = Mutex::new((progress, 0usize, None::<(ModelOrder, f64)>));

    let evaluations: Vec<Evaluation> = orders
        .into_par_iter()
        .map(|order| {
            let evaluation = evaluate(&log, series, order, train_ratio);
            // Poisoned by a panicking sink
            let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
            let (sink, completed, best) = &mut *guard;
            *completed += 1;
            if let Some(rmse) = evaluation.score.rmse() {
                if best.map_or(true, |(_, b)| rmse < b) {
                    *best = Some((order, rmse));
                }
            }
            sink.report(&Progress {
                completed: *completed,
                total,
                order,
                rmse: evaluation.score.rmse(),
                best: *best,
            });
            evaluation
        })
        .collect();

    finish(&log, evaluations)
}

fn evaluate(log: &Logger, series: &Series, order: ModelOrder, train_ratio: f64) -> Evaluation {
    let score = match evaluate_order_with(series, order, train_ratio) {
        Ok(rmse) => {
            debug!(log, "scored"; "order" => %order, "rmse" => rmse);
            Score::Rmse(rmse)
        }
        Err(err) => {
            debug!(log, "candidate rejected"; "order" => %order, "error" => %err);
            Score::Invalid {
                reason: err.to_string(),
            }
        }
    };
    Evaluation { order, score }
}

// Argmin over valid scores; the first of equal scores in grid order wins.
fn select_best(evaluations: &[Evaluation]) -> Option<(ModelOrder, f64)> {
    let mut best: Option<(ModelOrder, f64)> = None;
    for evaluation in evaluations {
        if let Some(rmse) = evaluation.score.rmse() {
            if best.map_or(true, |(_, b)| rmse < b) {
                best = Some((evaluation.order, rmse));
            }
        }
    }
    best
}

fn finish(log: &Logger, evaluations: Vec<Evaluation>) -> Result<SearchOutcome> {
    let (order, rmse) = select_best(&evaluations).ok_or(ForecastError::EmptySearchSpace)?;
    let outcome = SearchOutcome {
        order,
        rmse,
        evaluations,
    };
    info!(log, "best order selected";
        "order" => %order,
        "rmse" => rmse,
        "candidates" => outcome.evaluations.len(),
        "invalid" => outcome.invalid_count()
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tv_tail() -> Series {
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
    fn grid_iterates_p_then_d_then_q() {
        let grid = SearchGrid::new(&[0, 1], &[0, 1], &[0, 2]);
        let orders: Vec<_> = grid.orders().collect();
        assert_eq!(orders.len(), 8);
        assert_eq!(orders[0], ModelOrder::new(0, 0, 0));
        assert_eq!(orders[1], ModelOrder::new(0, 0, 2));
        assert_eq!(orders[2], ModelOrder::new(0, 1, 0));
        assert_eq!(orders[7], ModelOrder::new(1, 1, 2));
        assert!(SearchGrid::new(&[0], &[], &[0]).is_empty());
    }

    #[test]
    fn walk_forward_windows_grow_by_one() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let steps: Vec<_> = WalkForward::new(&values, 3).collect();
        assert_eq!(steps.len(), 3);
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.window.len(), 3 + i);
            assert_eq!(step.actual, values[3 + i]);
        }
        for pair in steps.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            assert_eq!(&next.window[..prev.window.len()], prev.window);
            assert_eq!(next.window[prev.window.len()], prev.actual);
        }
    }

    #[test]
    fn mean_model_rmse_by_hand() {
        // train = floor(5 * 0.66) = 3: windows [215,170,168] then + 165
        let series = tv_tail();
        let first = (215.0 + 170.0 + 168.0) / 3.0;
        let second = (215.0 + 170.0 + 168.0 + 165.0) / 4.0;
        let squares = (165.0f64 - first).powi(2) + (119.0f64 - second).powi(2);
        let expected = (squares / 2.0).sqrt();

        let rmse = evaluate_order(&series, ModelOrder::new(0, 0, 0)).unwrap();
        assert!((rmse - expected).abs() < 1e-9);
    }

    #[test]
    fn random_walk_prediction_is_last_value() {
        let series = tv_tail();
        // predictions 168 and 165 against 165 and 119
        let expected = ((9.0 + 46.0 * 46.0) / 2.0f64).sqrt();
        let rmse = evaluate_order(&series, ModelOrder::new(0, 1, 0)).unwrap();
        assert!((rmse - expected).abs() < 1e-9);
    }

    #[test]
    fn rolling_predictions_cover_the_test_span() {
        let series = tv_tail();
        let steps =
            rolling_predictions(&series, ModelOrder::new(0, 1, 0), DEFAULT_TRAIN_RATIO).unwrap();
        let periods: Vec<i32> = steps.iter().map(|s| s.period).collect();
        assert_eq!(periods, vec![2022, 2023]);
        assert_eq!(steps[0].predicted, 168.0);
        assert_eq!(steps[1].actual, 119.0);
    }

    #[test]
    fn single_observation_cannot_be_evaluated() {
        let series = Series::from_pairs([(2023, 119.0)]).unwrap();
        assert!(matches!(
            evaluate_order(&series, ModelOrder::new(0, 0, 0)),
            Err(ForecastError::FitFailure { .. })
        ));
    }

    #[test]
    fn bad_train_ratio_is_rejected() {
        let series = tv_tail();
        for ratio in [0.0, 1.0, -0.5, f64::NAN] {
            assert!(matches!(
                evaluate_order_with(&series, ModelOrder::new(0, 0, 0), ratio),
                Err(ForecastError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn progress_reported_for_every_cell_including_failures() {
        let series = tv_tail();
        let mut updates = Vec::new();
        let outcome = search_best_order(&series, &[0, 1], &[0, 1], &[0, 1], &mut |p: &Progress| {
            updates.push(*p)
        })
        .unwrap();

        assert_eq!(updates.len(), 8);
        for (i, update) in updates.iter().enumerate() {
            assert_eq!(update.completed, i + 1);
            assert_eq!(update.total, 8);
        }
        assert_eq!(updates[7].fraction(), 1.0);
        // (1, 1, 1) needs four observations but the training split has three
        assert!(updates[7].rmse.is_none());
        assert_eq!(updates[7].best, Some((outcome.order, outcome.rmse)));
        assert!(outcome.invalid_count() >= 1);
    }

    #[test]
    fn equal_scores_keep_the_first_in_grid_order() {
        let scored = |p, q, rmse| Evaluation {
            order: ModelOrder::new(p, 0, q),
            score: Score::Rmse(rmse),
        };
        let evaluations = vec![
            Evaluation {
                order: ModelOrder::new(0, 0, 0),
                score: Score::Invalid {
                    reason: "too short".into(),
                },
            },
            scored(0, 1, 2.0),
            scored(1, 0, 2.0),
            scored(1, 1, 3.0),
        ];
        assert_eq!(select_best(&evaluations), Some((ModelOrder::new(0, 0, 1), 2.0)));
    }

    #[test]
    fn all_failures_is_an_empty_search_space() {
        let series = tv_tail();
        let result = search_best_order(&series, &[3], &[1], &[3], &mut NoProgress);
        assert_eq!(result.unwrap_err(), ForecastError::EmptySearchSpace);

        let result = search_best_order(&series, &[], &[0], &[0], &mut NoProgress);
        assert_eq!(result.unwrap_err(), ForecastError::EmptySearchSpace);
    }

    #[test]
    fn parallel_matches_sequential() {
        let series = Series::from_pairs(
            (0..20).map(|i| (2000 + i, 50.0 + 3.0 * i as f64 + ((i * 7) % 5) as f64)),
        )
        .unwrap();
        let grid = SearchGrid::new(&[0, 1, 2], &[0, 1], &[0, 1]);

        let sequential =
            search_grid(&series, &grid, DEFAULT_TRAIN_RATIO, &mut NoProgress).unwrap();
        let mut count = 0;
        let mut sink = |p: &Progress| {
            assert!(p.completed <= p.total);
            count += 1;
        };
        let parallel =
            search_grid_parallel(&series, &grid, DEFAULT_TRAIN_RATIO, &mut sink).unwrap();

        assert_eq!(count, grid.len());
        assert_eq!(sequential, parallel);
    }
}

use statrs::statistics::Statistics;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().mean()
}

/// Floors a finite projection at zero. Callers reject non-finite values first.
pub fn clamp_non_negative(value: f64) -> f64 {
    value.max(0.0)
}

pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(actual.len(), predicted.len());
    if actual.is_empty() {
        return 0.0;
    }

    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .mean()
        .sqrt()
}

pub fn sum_of_squares(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}

/// Number of leading observations used for training, floored.
pub fn train_size(len: usize, ratio: f64) -> usize {
    (len as f64 * ratio).floor() as usize
}

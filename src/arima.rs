//! ARIMA-family estimation by conditional sum of squares. AR and MA
//! coefficients are searched through their partial autocorrelations, so every
//! estimate is stationary and invertible.

use crate::error::{ForecastError, Result};
use crate::model::{ModelKind, ModelOrder};
use crate::optimize::{minimize, MinimizeOptions};
use crate::stats::{mean, sum_of_squares};

// tanh(6) ~ 0.99999, keeps partial autocorrelations off the unit circle
const PACF_LIMIT: f64 = 6.0;

#[derive(Debug, Clone)]
pub struct FittedModel {
    kind: ModelKind,
    order: ModelOrder,
    mean: Option<f64>,
    ar: Vec<f64>,
    ma: Vec<f64>,
    css: f64,
    sigma2: f64,
    nobs: usize,
    converged: bool,
    differenced: Vec<f64>,
    residuals: Vec<f64>,
    // Last value of every differencing level below d
    tails: Vec<f64>,
}

/// Fit a model of `kind` at `order` to `values`.
pub fn fit(values: &[f64], order: ModelOrder, kind: ModelKind) -> Result<FittedModel> {
    let needed = order.min_observations();
    if values.len() < needed {
        return Err(ForecastError::fit(
            kind,
            order,
            format!("need at least {} observations, got {}", needed, values.len()),
        ));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::fit(kind, order, "series contains non-finite values"));
    }

    let mut tails = Vec::with_capacity(order.d);
    let mut w = values.to_vec();
    for _ in 0..order.d {
        tails.push(w[w.len() - 1]);
        w = difference(&w, 1);
    }

    let with_mean = kind.includes_mean(order);
    let (p, q) = (order.p, order.q);
    let offset = usize::from(with_mean);

    let mut start = Vec::with_capacity(offset + p + q);
    let mut bounds = Vec::with_capacity(offset + p + q);
    if with_mean {
        start.push(mean(&w));
        bounds.push((f64::NEG_INFINITY, f64::INFINITY));
    }
    start.resize(offset + p + q, 0.0);
    bounds.resize(offset + p + q, (-PACF_LIMIT, PACF_LIMIT));

    let unpack = |params: &[f64]| {
        let mu = if with_mean { params[0] } else { 0.0 };
        let ar = constrain_stationary(&params[offset..offset + p]);
        let ma: Vec<f64> = constrain_stationary(&params[offset + p..])
            .into_iter()
            .map(|c| -c)
            .collect();
        (mu, ar, ma)
    };

    let objective = |params: &[f64]| {
        let (mu, ar, ma) = unpack(params);
        let residuals = css_residuals(&w, mu, &ar, &ma);
        sum_of_squares(&residuals[p..])
    };

    let (params, converged) = if p == 0 && q == 0 {
        // The sample mean is already the least-squares solution
        (start, true)
    } else {
        let min = minimize(objective, &start, &bounds, &MinimizeOptions::default());
        if !min.value.is_finite() {
            return Err(ForecastError::fit(kind, order, "conditional sum of squares diverged"));
        }
        (min.point, min.converged)
    };

    let (mu, ar, ma) = unpack(&params);
    if !is_stationary(&ar) {
        return Err(ForecastError::fit(kind, order, "non-stationary autoregressive parameters"));
    }
    let ma_as_ar: Vec<f64> = ma.iter().map(|c| -c).collect();
    if !is_stationary(&ma_as_ar) {
        return Err(ForecastError::fit(kind, order, "non-invertible moving-average parameters"));
    }

    let residuals = css_residuals(&w, mu, &ar, &ma);
    let css = sum_of_squares(&residuals[p..]);
    let sigma2 = css / (w.len() - p) as f64;
    if !sigma2.is_finite() {
        return Err(ForecastError::fit(kind, order, "residual variance is not finite"));
    }

    Ok(FittedModel {
        kind,
        order,
        mean: with_mean.then_some(mu),
        ar,
        ma,
        css,
        sigma2,
        nobs: values.len(),
        converged,
        differenced: w,
        residuals,
        tails,
    })
}

impl FittedModel {
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn order(&self) -> ModelOrder {
        self.order
    }

    pub fn mean(&self) -> Option<f64> {
        self.mean
    }

    pub fn ar(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma(&self) -> &[f64] {
        &self.ma
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn css(&self) -> f64 {
        self.css
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Length of the series the model was fitted to.
    pub fn nobs(&self) -> usize {
        self.nobs
    }

    /// Residuals that enter the likelihood (after differencing and the first p lags).
    pub fn effective_observations(&self) -> usize {
        self.differenced.len() - self.order.p
    }

    pub fn residuals(&self) -> &[f64] {
        &self.residuals[self.order.p..]
    }

    /// Estimated parameters including sigma2.
    pub fn param_count(&self) -> usize {
        usize::from(self.mean.is_some()) + self.ar.len() + self.ma.len() + 1
    }

    /// Conditional Gaussian log-likelihood. None for a perfect fit.
    pub fn log_likelihood(&self) -> Option<f64> {
        if self.sigma2 <= 0.0 {
            return None;
        }
        let n = self.effective_observations() as f64;
        Some(-0.5 * n * ((2.0 * std::f64::consts::PI * self.sigma2).ln() + 1.0))
    }

    pub fn aic(&self) -> Option<f64> {
        let k = self.param_count() as f64;
        self.log_likelihood().map(|ll| -2.0 * ll + 2.0 * k)
    }

    pub fn bic(&self) -> Option<f64> {
        let k = self.param_count() as f64;
        let n = self.effective_observations() as f64;
        self.log_likelihood().map(|ll| -2.0 * ll + k * n.ln())
    }

    /// Point forecasts for the next `steps` periods, unclamped.
    pub fn forecast(&self, steps: usize) -> Vec<f64> {
        let mu = self.mean.unwrap_or(0.0);
        let start = self.differenced.len();
        let mut w = self.differenced.clone();
        let mut e = self.residuals.clone();

        for _ in 0..steps {
            let t = w.len();
            let mut pred = mu;
            for (i, phi) in self.ar.iter().enumerate() {
                pred += phi * (w[t - 1 - i] - mu);
            }
            for (j, theta) in self.ma.iter().enumerate() {
                if t > j {
                    pred += theta * e[t - 1 - j];
                }
            }
            w.push(pred);
            e.push(0.0);
        }

        integrate(&w[start..], &self.tails)
    }

    /// Like [`FittedModel::forecast`], but an overflowing or NaN projection is a fit failure.
    pub fn checked_forecast(&self, steps: usize) -> Result<Vec<f64>> {
        let values = self.forecast(steps);
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::fit(self.kind, self.order, "forecast is not finite"));
        }
        Ok(values)
    }

    pub fn forecast_one(&self) -> Result<f64> {
        let next = self.checked_forecast(1)?;
        Ok(next[0])
    }
}

/// Difference `values` `d` times.
pub fn difference(values: &[f64], d: usize) -> Vec<f64> {
    let mut out = values.to_vec();
    for _ in 0..d {
        out = out.windows(2).map(|w| w[1] - w[0]).collect();
    }
    out
}

/// Undo differencing. `tails[k]` is the last observed value of the k-th difference.
pub fn integrate(diffs: &[f64], tails: &[f64]) -> Vec<f64> {
    tails.iter().rev().fold(diffs.to_vec(), |level, &last| {
        level
            .iter()
            .scan(last, |acc, x| {
                *acc += x;
                Some(*acc)
            })
            .collect()
    })
}

// One-step residuals conditioned on the first p values; e[t] = 0 for t < p.
fn css_residuals(w: &[f64], mu: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let mut e = vec![0.0; w.len()];
    for t in p..w.len() {
        let mut pred = mu;
        for (i, phi) in ar.iter().enumerate() {
            pred += phi * (w[t - 1 - i] - mu);
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                pred += theta * e[t - 1 - j];
            }
        }
        e[t] = w[t] - pred;
    }
    e
}

/// Map unconstrained values to coefficients of a stationary polynomial
/// `1 - c1 z - ... - ck z^k`.
pub fn constrain_stationary(unconstrained: &[f64]) -> Vec<f64> {
    let mut coefs: Vec<f64> = Vec::with_capacity(unconstrained.len());
    for (k, x) in unconstrained.iter().enumerate() {
        let r = x.tanh();
        let prev = coefs.clone();
        for j in 0..k {
            coefs[j] = prev[j] - r * prev[k - 1 - j];
        }
        coefs.push(r);
    }
    coefs
}

/// Step-down (reverse Durbin-Levinson) check that `1 - c1 z - ... - ck z^k`
/// has every root outside the unit circle.
pub fn is_stationary(coefs: &[f64]) -> bool {
    let mut current = coefs.to_vec();
    while let Some(&r) = current.last() {
        if !r.is_finite() || r.abs() >= 1.0 {
            return false;
        }
        let k = current.len();
        let denom = 1.0 - r * r;
        current = (0..k - 1)
            .map(|j| (current[j] + r * current[k - 2 - j]) / denom)
            .collect();
    }
    true
}

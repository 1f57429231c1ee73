use serde::Serialize;
use std::fmt;

use crate::arima::FittedModel;
use crate::model::{ModelKind, ModelOrder};

/// Text-renderable description of a fitted model, for the host to display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitSummary {
    pub model: ModelKind,
    pub order: ModelOrder,
    pub nobs: usize,
    pub coefficients: Vec<(String, f64)>,
    pub sigma2: f64,
    pub log_likelihood: Option<f64>,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
    pub converged: bool,
}

impl From<&FittedModel> for FitSummary {
    fn from(fit: &FittedModel) -> Self {
        let mut coefficients = Vec::new();
        if let Some(mu) = fit.mean() {
            coefficients.push(("const".to_string(), mu));
        }
        for (i, phi) in fit.ar().iter().enumerate() {
            coefficients.push((format!("ar.L{}", i + 1), *phi));
        }
        for (i, theta) in fit.ma().iter().enumerate() {
            coefficients.push((format!("ma.L{}", i + 1), *theta));
        }

        FitSummary {
            model: fit.kind(),
            order: fit.order(),
            nobs: fit.nobs(),
            coefficients,
            sigma2: fit.sigma2(),
            log_likelihood: fit.log_likelihood(),
            aic: fit.aic(),
            bic: fit.bic(),
            converged: fit.converged(),
        }
    }
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.3}", v))
}

impl fmt::Display for FitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(44);
        writeln!(f, "{}{} Results", self.model, self.order)?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "{:<20}{:>24}", "Observations", self.nobs)?;
        writeln!(f, "{:<20}{:>24}", "Log likelihood", optional(self.log_likelihood))?;
        writeln!(f, "{:<20}{:>24}", "AIC", optional(self.aic))?;
        writeln!(f, "{:<20}{:>24}", "BIC", optional(self.bic))?;
        if !self.converged {
            writeln!(f, "{:<20}{:>24}", "Optimizer", "did not converge")?;
        }
        writeln!(f, "{}", "-".repeat(44))?;
        writeln!(f, "{:<20}{:>24}", "", "coef")?;
        for (name, value) in &self.coefficients {
            writeln!(f, "{:<20}{:>24.4}", name, value)?;
        }
        writeln!(f, "{:<20}{:>24.4}", "sigma2", self.sigma2)?;
        write!(f, "{}", rule)
    }
}

use serde::Serialize;
use smartcore::metrics::{mean_absolute_error, mean_squared_error, r2};
use std::fmt;

/// Regression error on the original price scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

impl Metrics {
    pub fn compute(truth: &[f64], predictions: &[f64]) -> Self {
        let n = truth.len().min(predictions.len());
        if n == 0 {
            return Self {
                mae: 0.0,
                rmse: 0.0,
                r2: 0.0,
            };
        }
        let truth = truth[..n].to_vec();
        let predictions = predictions[..n].to_vec();

        Self {
            mae: mean_absolute_error(&truth, &predictions),
            rmse: mean_squared_error(&truth, &predictions).sqrt(),
            r2: r2(&truth, &predictions),
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MAE: {}", self.mae)?;
        writeln!(f, "RMSE: {}", self.rmse)?;
        write!(f, "R2 Score: {}", self.r2)
    }
}

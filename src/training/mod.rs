//! Price models trained on the prepared rental dataset.
//!
//! Both pipelines follow the same steps: load, `log1p` the price, split,
//! fit the column transformer on the training rows, fit the regressor,
//! map predictions back with `expm1` and report MAE / RMSE / R².

pub mod dataset;
pub mod linear;
pub mod metrics;
pub mod network;
pub mod preprocess;

use crate::config::TrainConfig;
use crate::storage;
use anyhow::{Context, Result};
use dataset::Dataset;
use linear::LinearModel;
use metrics::Metrics;
use network::{Network, TargetScale};
use preprocess::ColumnTransformer;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("no training rows")]
    EmptyTrainingSet,
    #[error("no input features")]
    NoFeatures,
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("model fitting failed: {0}")]
    Fit(String),
}

/// Price → model target
pub fn log_price(price: f64) -> f64 {
    price.ln_1p()
}

/// Model target → price
pub fn restore_price(target: f64) -> f64 {
    target.exp_m1()
}

/// Test-split outcome on the original price scale
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub metrics: Metrics,
    pub truth: Vec<f64>,
    pub predictions: Vec<f64>,
}

impl Evaluation {
    fn new(truth_log: &[f64], predictions_log: &[f64]) -> Self {
        let truth: Vec<f64> = truth_log.iter().map(|&t| restore_price(t)).collect();
        let predictions: Vec<f64> = predictions_log.iter().map(|&p| restore_price(p)).collect();
        Self {
            metrics: Metrics::compute(&truth, &predictions),
            truth,
            predictions,
        }
    }

    fn report(&self, config: &TrainConfig) -> Result<()> {
        println!("{}", self.metrics);
        info!(
            mae = self.metrics.mae,
            rmse = self.metrics.rmse,
            r2 = self.metrics.r2,
            "Evaluation on {} test rows",
            self.truth.len()
        );
        if let Some(path) = &config.predictions {
            storage::write_predictions(path, &self.truth, &self.predictions)?;
            info!("Saved predictions to {:?}", path);
        }
        Ok(())
    }
}

fn load(config: &TrainConfig) -> Result<Dataset> {
    let data = Dataset::load(&config.data)
        .with_context(|| format!("Failed to load dataset {:?}", config.data))?;
    info!(
        "Loaded {} rows, {} dropped ({} numeric, {} categorical columns)",
        data.samples.len(),
        data.dropped,
        data.numeric_columns.len(),
        data.categorical_columns.len()
    );
    Ok(data)
}

/// Fit and evaluate the linear regression pipeline
pub fn run_linear(config: &TrainConfig) -> Result<Evaluation> {
    let data = load(config)?;
    let (train, test) = data.split(config.test_size, config.seed)?;

    info!("Training linear regression on {} rows...", train.len());
    let transformer = ColumnTransformer::fit(&train)?;
    let x_train = transformer.transform_all(&train)?;
    let y_train: Vec<f64> = train.iter().map(|s| s.target).collect();
    let model = LinearModel::fit(&x_train, &y_train, &transformer.reference_columns())?;

    let predictions = model.predict_all(&transformer.transform_all(&test)?)?;
    let truth: Vec<f64> = test.iter().map(|s| s.target).collect();

    let evaluation = Evaluation::new(&truth, &predictions);
    evaluation.report(config)?;
    Ok(evaluation)
}

/// Fit and evaluate the feed-forward network pipeline.
/// The log target is also standardised; the scaler is fitted on the training rows.
pub fn run_network(config: &TrainConfig) -> Result<Evaluation> {
    let data = load(config)?;
    let (train, test) = data.split(config.test_size, config.seed)?;

    let transformer = ColumnTransformer::fit(&train)?;
    let x_train = transformer.transform_all(&train)?;
    let x_test = transformer.transform_all(&test)?;

    let targets: Vec<f64> = train.iter().map(|s| s.target).collect();
    let target_scale = TargetScale::fit(&targets);
    let y_train: Vec<f64> = targets.iter().map(|&t| target_scale.apply(t)).collect();

    info!(
        "Training network on {} rows x {} features for {} epochs...",
        x_train.len(),
        transformer.n_features(),
        config.network.epochs
    );
    let mut network = Network::new(transformer.n_features(), &config.network)?;
    let history = network.fit(&x_train, &y_train, &config.network)?;
    if let (Some(loss), Some(val_loss)) = (history.loss.last(), history.val_loss.last()) {
        info!("Final loss {:.5}, validation loss {:.5}", loss, val_loss);
    }

    let predictions: Vec<f64> = network
        .predict_all(&x_test)
        .into_iter()
        .map(|p| target_scale.restore(p))
        .collect();
    let truth: Vec<f64> = test.iter().map(|s| s.target).collect();

    let evaluation = Evaluation::new(&truth, &predictions);
    evaluation.report(config)?;
    Ok(evaluation)
}

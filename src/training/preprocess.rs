use crate::training::dataset::Sample;
use crate::training::ModelError;
use smartcore::api::{Transformer, UnsupervisedEstimator};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::preprocessing::numerical::{StandardScaler, StandardScalerParameters};

/// Row-major `Vec<Vec<f64>>` → smartcore matrix
pub fn to_matrix(rows: &[Vec<f64>]) -> DenseMatrix<f64> {
    DenseMatrix::from_2d_vec(&rows.to_vec()).expect("rectangular, non-empty rows")
}

/// smartcore matrix → row-major `Vec<Vec<f64>>`
pub fn from_matrix(matrix: &DenseMatrix<f64>, rows: usize, cols: usize) -> Vec<Vec<f64>> {
    (0..rows)
        .map(|r| (0..cols).map(|c| *matrix.get((r, c))).collect())
        .collect()
}

/// Standard scaling of the numeric block.
/// Constant columns come out as 0 instead of NaN.
pub struct NumericScaler {
    width: usize,
    scaler: Option<StandardScaler<f64>>,
}

impl NumericScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, ModelError> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 {
            return Ok(Self { width, scaler: None });
        }
        let scaler = StandardScaler::fit(&to_matrix(rows), StandardScalerParameters::default())
            .map_err(|e| ModelError::Fit(e.to_string()))?;
        Ok(Self {
            width,
            scaler: Some(scaler),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ModelError> {
        let scaler = match &self.scaler {
            Some(scaler) if !rows.is_empty() => scaler,
            _ => return Ok(vec![Vec::new(); rows.len()]),
        };
        if let Some(row) = rows.iter().find(|row| row.len() != self.width) {
            return Err(ModelError::DimensionMismatch {
                expected: self.width,
                got: row.len(),
            });
        }

        let scaled = scaler
            .transform(&to_matrix(rows))
            .map_err(|e| ModelError::Fit(e.to_string()))?;
        let mut out = from_matrix(&scaled, rows.len(), self.width);
        for value in out.iter_mut().flatten() {
            if !value.is_finite() {
                *value = 0.0;
            }
        }
        Ok(out)
    }
}

/// One-hot encoding with categories learnt at fit time.
/// Unseen categories encode as an all-zero block.
#[derive(Debug, Clone, PartialEq)]
pub struct OneHotEncoder {
    /// Sorted distinct values per column
    pub categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    pub fn fit(rows: &[Vec<String>]) -> Self {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let categories = (0..width)
            .map(|col| {
                let mut values: Vec<String> = rows.iter().map(|row| row[col].clone()).collect();
                values.sort();
                values.dedup();
                values
            })
            .collect();
        Self { categories }
    }

    pub fn width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    /// Offset of the first category of each block
    pub fn block_starts(&self) -> Vec<usize> {
        self.categories
            .iter()
            .scan(0, |offset, known| {
                let start = *offset;
                *offset += known.len();
                Some(start)
            })
            .collect()
    }

    pub fn transform(&self, row: &[String]) -> Vec<f64> {
        let mut encoded = Vec::with_capacity(self.width());
        for (value, known) in row.iter().zip(&self.categories) {
            let hot = known.binary_search(value).ok();
            encoded.extend((0..known.len()).map(|i| if Some(i) == hot { 1.0 } else { 0.0 }));
        }
        encoded
    }
}

/// Numeric columns scaled, categorical columns one-hot encoded, concatenated in that order
pub struct ColumnTransformer {
    pub numeric: NumericScaler,
    pub categorical: OneHotEncoder,
}

impl ColumnTransformer {
    /// Fit on the training split only
    pub fn fit(samples: &[Sample]) -> Result<Self, ModelError> {
        if samples.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        let numeric: Vec<Vec<f64>> = samples.iter().map(|s| s.numeric.clone()).collect();
        let categorical: Vec<Vec<String>> = samples.iter().map(|s| s.categorical.clone()).collect();
        Ok(Self {
            numeric: NumericScaler::fit(&numeric)?,
            categorical: OneHotEncoder::fit(&categorical),
        })
    }

    pub fn n_features(&self) -> usize {
        self.numeric.width() + self.categorical.width()
    }

    /// Feature index of the first category of every one-hot block
    pub fn reference_columns(&self) -> Vec<usize> {
        let offset = self.numeric.width();
        self.categorical
            .block_starts()
            .into_iter()
            .map(|start| offset + start)
            .collect()
    }

    pub fn transform_all(&self, samples: &[Sample]) -> Result<Vec<Vec<f64>>, ModelError> {
        let numeric: Vec<Vec<f64>> = samples.iter().map(|s| s.numeric.clone()).collect();
        let scaled = self.numeric.transform(&numeric)?;
        Ok(scaled
            .into_iter()
            .zip(samples)
            .map(|(mut features, sample)| {
                features.extend(self.categorical.transform(&sample.categorical));
                features
            })
            .collect())
    }
}

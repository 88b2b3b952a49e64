use crate::training::preprocess::to_matrix;
use crate::training::ModelError;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};

/// Ordinary least squares with an intercept, fitted by smartcore.
///
/// A full one-hot block always sums to 1 and duplicates the intercept, so the
/// first category of every block is left out of the design (it becomes the
/// reference level), as are columns that are constant on the training rows.
pub struct LinearModel {
    columns: Vec<usize>,
    regression: LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>,
}

impl LinearModel {
    pub fn fit(x: &[Vec<f64>], y: &[f64], reference: &[usize]) -> Result<Self, ModelError> {
        let width = x.first().map(Vec::len).ok_or(ModelError::EmptyTrainingSet)?;
        if x.len() != y.len() {
            return Err(ModelError::DimensionMismatch {
                expected: x.len(),
                got: y.len(),
            });
        }
        if let Some(row) = x.iter().find(|row| row.len() != width) {
            return Err(ModelError::DimensionMismatch {
                expected: width,
                got: row.len(),
            });
        }

        let columns: Vec<usize> = (0..width)
            .filter(|c| !reference.contains(c))
            .filter(|&c| x.iter().any(|row| row[c] != x[0][c]))
            .collect();
        if columns.is_empty() {
            return Err(ModelError::NoFeatures);
        }

        let design = to_matrix(&select(x, &columns));
        let params = LinearRegressionParameters::default().with_solver(LinearRegressionSolverName::SVD);
        let regression = LinearRegression::fit(&design, &y.to_vec(), params)
            .map_err(|e| ModelError::Fit(e.to_string()))?;

        Ok(Self {
            columns,
            regression,
        })
    }

    pub fn predict_all(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        if x.is_empty() {
            return Ok(Vec::new());
        }
        let design = to_matrix(&select(x, &self.columns));
        self.regression
            .predict(&design)
            .map_err(|e| ModelError::Fit(e.to_string()))
    }

    /// Feature indices that entered the fit
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }
}

fn select(x: &[Vec<f64>], columns: &[usize]) -> Vec<Vec<f64>> {
    x.iter()
        .map(|row| columns.iter().map(|&c| row.get(c).copied().unwrap_or(0.0)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovers_exact_linear_relation() {
        let x: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![i as f64, (i * i % 7) as f64])
            .collect();
        let y: Vec<f64> = x.iter().map(|r| 3.0 + 2.0 * r[0] - 0.5 * r[1]).collect();

        let model = LinearModel::fit(&x, &y, &[]).unwrap();
        let predicted = model.predict_all(&[vec![10.0, 4.0]]).unwrap();

        assert!((predicted[0] - 21.0).abs() < 1e-6, "predicted {}", predicted[0]);
    }

    #[test]
    fn test_full_one_hot_block_uses_reference_level() {
        // Both one-hot columns always sum to 1, like the intercept
        let x = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
        ];
        let y = vec![10.0, 20.0, 10.0, 20.0];

        let model = LinearModel::fit(&x, &y, &[0]).unwrap();
        assert_eq!(model.columns(), &[1]);

        let predictions = model.predict_all(&x).unwrap();
        for (p, t) in predictions.iter().zip(&y) {
            assert!((p - t).abs() < 1e-6, "prediction {} for target {}", p, t);
        }
    }

    #[test]
    fn test_constant_columns_are_left_out() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 0.0, 1.0]).collect();
        let y: Vec<f64> = (0..10).map(|i| 5.0 + i as f64).collect();

        let model = LinearModel::fit(&x, &y, &[]).unwrap();

        assert_eq!(model.columns(), &[0]);
        let predicted = model.predict_all(&[vec![20.0, 0.0, 1.0]]).unwrap();
        assert!((predicted[0] - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(matches!(
            LinearModel::fit(&[], &[], &[]),
            Err(ModelError::EmptyTrainingSet)
        ));
        assert!(matches!(
            LinearModel::fit(&[vec![1.0]], &[1.0, 2.0], &[]),
            Err(ModelError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            LinearModel::fit(&[vec![1.0], vec![1.0]], &[1.0, 2.0], &[]),
            Err(ModelError::NoFeatures)
        ));
    }
}

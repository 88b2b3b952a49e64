use crate::storage::{sniff_delimiter, strip_bom};
use crate::training::log_price;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::model_selection::train_test_split;
use std::path::Path;
use tracing::{debug, warn};

/// Column holding the rental price
pub const TARGET: &str = "precio";

/// Columns one-hot encoded by the preprocessor; every other column is numeric
pub const CATEGORICAL: [&str; 6] = [
    "ciudad",
    "antiguedad",
    "comuna",
    "zona",
    "tipo_de_inmueble",
    "estado",
];

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed delimited file: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required column `{0}`")]
    MissingColumn(String),
    #[error("dataset has no usable rows")]
    Empty,
    #[error("cannot hold out {test_size} of {rows} rows")]
    Split { rows: usize, test_size: f64 },
}

/// One model row; the target is already `log1p(precio)`
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub numeric: Vec<f64>,
    pub categorical: Vec<String>,
    pub target: f64,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub samples: Vec<Sample>,
    /// Rows dropped because a numeric cell or the price did not parse
    pub dropped: usize,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_str(&text)
    }

    pub fn parse_str(text: &str) -> Result<Self, DatasetError> {
        let text = strip_bom(text);
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(sniff_delimiter(text))
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
        };

        let target = position(TARGET)?;
        let categorical = CATEGORICAL
            .iter()
            .map(|name| position(*name))
            .collect::<Result<Vec<_>, _>>()?;
        let numeric: Vec<usize> = (0..headers.len())
            .filter(|i| *i != target && !categorical.contains(i))
            .collect();

        let mut samples = Vec::new();
        let mut dropped = 0;

        for (line, record) in rdr.records().enumerate() {
            let record = record?;
            let cell = |i: usize| record.get(i).unwrap_or_default();

            let price = cell(target).parse::<f64>().ok().filter(|p| p.is_finite() && *p >= 0.0);
            let values = numeric
                .iter()
                .map(|&i| cell(i).parse::<f64>().ok().filter(|v| v.is_finite()))
                .collect::<Option<Vec<_>>>();

            match (price, values) {
                (Some(price), Some(values)) => samples.push(Sample {
                    numeric: values,
                    categorical: categorical.iter().map(|&i| cell(i).to_string()).collect(),
                    target: log_price(price),
                }),
                _ => {
                    debug!("Dropping row {}: unparseable numeric cell", line + 2);
                    dropped += 1;
                }
            }
        }

        if dropped > 0 {
            warn!("Dropped {} rows with missing or non-numeric values", dropped);
        }
        if samples.is_empty() {
            return Err(DatasetError::Empty);
        }

        Ok(Self {
            numeric_columns: numeric.iter().map(|&i| headers[i].clone()).collect(),
            categorical_columns: categorical.iter().map(|&i| headers[i].clone()).collect(),
            samples,
            dropped,
        })
    }

    /// Seeded shuffled train/test split; the test side gets `floor(n * test_size)` rows
    pub fn split(&self, test_size: f64, seed: u64) -> Result<(Vec<Sample>, Vec<Sample>), DatasetError> {
        let rows = self.samples.len();
        let n_test = ((rows as f32) * test_size as f32) as usize;
        if !(test_size > 0.0 && test_size <= 1.0) || n_test == 0 {
            return Err(DatasetError::Split { rows, test_size });
        }

        // Split row indices and map them back to samples
        let index: Vec<f64> = (0..rows).map(|i| i as f64).collect();
        let x = DenseMatrix::from_2d_vec(&index.iter().map(|&i| vec![i]).collect())
            .expect("rectangular, non-empty rows");
        let (_, _, train, test) = train_test_split(&x, &index, test_size as f32, true, Some(seed));

        let pick = |idx: &[f64]| -> Vec<Sample> {
            idx.iter()
                .filter_map(|&i| self.samples.get(i as usize).cloned())
                .collect()
        };
        Ok((pick(&train), pick(&test)))
    }
}

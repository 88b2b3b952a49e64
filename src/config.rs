use crate::models::{City, CITIES};
use crate::scrapers::fincaraiz::SEARCH_URL;
use crate::scrapers::types::{DEFAULT_ROWS, MAX_PAGES};
use crate::training::network::NetworkConfig;
use std::path::PathBuf;

/// Settings for the search and detail crawls
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub search_url: String,
    /// The detail lookup goes through the search endpoint unless overridden
    pub detail_url: String,
    /// Pages fetched per city at most
    pub max_pages: u32,
    /// Listings requested per page
    pub rows: u32,
    /// Cities to crawl, in order
    pub cities: Vec<City>,
    /// Where raw listing JSON is saved, if anywhere
    pub raw_dir: Option<PathBuf>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            search_url: SEARCH_URL.to_string(),
            detail_url: SEARCH_URL.to_string(),
            max_pages: MAX_PAGES,
            rows: DEFAULT_ROWS,
            cities: CITIES.to_vec(),
            raw_dir: None,
        }
    }
}

/// Settings shared by both model pipelines
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Prepared dataset, comma- or semicolon-delimited
    pub data: PathBuf,
    /// Fraction of rows held out for evaluation
    pub test_size: f64,
    pub seed: u64,
    /// Optional `real,prediccion` dump of the test split
    pub predictions: Option<PathBuf>,
    pub network: NetworkConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data: PathBuf::from("data/processed/data_arriendos_model.csv"),
            test_size: 0.2,
            seed: 42,
            predictions: None,
            network: NetworkConfig::default(),
        }
    }
}

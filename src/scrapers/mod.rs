pub mod fincaraiz;
pub mod flatten;
pub mod traits;
pub mod types;

pub use fincaraiz::FincaRaizScraper;

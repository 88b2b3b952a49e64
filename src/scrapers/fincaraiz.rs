use crate::config::ScrapeConfig;
use crate::models::{City, ListingDetail, ListingSummary};
use crate::scrapers::flatten;
use crate::scrapers::traits::{ApiResponse, SearchTransport};
use crate::scrapers::types::{DetailPayload, SearchPayload};
use crate::storage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Search endpoint, used for both paged searches and single-listing lookups
pub const SEARCH_URL: &str = "https://search-service.fincaraiz.com.co/api/v1/properties/search";

/// reqwest-backed transport for the search API
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl SearchTransport for HttpTransport {
    async fn post_json(&self, url: &str, payload: &Value) -> Result<ApiResponse> {
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .context("Failed to reach search API")?;

        let status = response.status();
        if status != StatusCode::OK {
            return Ok(ApiResponse {
                status: status.as_u16(),
                body: Value::Null,
            });
        }

        let body = response
            .json::<Value>()
            .await
            .context("Failed to parse search response")?;

        Ok(ApiResponse {
            status: status.as_u16(),
            body,
        })
    }

    fn source_name(&self) -> &'static str {
        "FincaRaíz"
    }
}

/// Why a city's pagination ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// A page came back with no listings
    Exhausted,
    /// The API answered with something other than 200
    Status { code: u16 },
    /// The request could not be sent or the body was not JSON
    Failed { error: String },
    /// The configured page cap was reached
    PageCap,
}

/// Outcome of crawling one city
#[derive(Debug, Clone, Serialize)]
pub struct CityReport {
    pub city: String,
    /// Pages that produced listings
    pub pages: u32,
    pub listings: usize,
    pub stop: StopReason,
    /// Raw listings that could not be saved
    pub raw_errors: usize,
}

/// Result of a full multi-city crawl
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub listings: Vec<ListingSummary>,
    pub cities: Vec<CityReport>,
}

/// Result of the detail pass
#[derive(Debug, Clone)]
pub struct DetailOutcome {
    pub listings: Vec<ListingDetail>,
    /// Ids that failed or came back empty
    pub skipped: usize,
    /// Raw listings that could not be saved
    pub raw_errors: usize,
}

/// Sequential crawler over the FincaRaíz search API
pub struct FincaRaizScraper<T: SearchTransport> {
    transport: T,
    config: ScrapeConfig,
}

impl FincaRaizScraper<HttpTransport> {
    /// Create a scraper that talks to the live API
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new()?, config))
    }
}

impl<T: SearchTransport> FincaRaizScraper<T> {
    pub fn with_transport(transport: T, config: ScrapeConfig) -> Self {
        Self { transport, config }
    }

    /// Crawl every configured city in order
    pub async fn scrape_all(&self) -> Result<ScrapeOutcome> {
        info!(
            "Starting {} crawl of {} cities",
            self.transport.source_name(),
            self.config.cities.len()
        );

        let mut listings = Vec::new();
        let mut cities = Vec::with_capacity(self.config.cities.len());

        for city in &self.config.cities {
            let (rows, report) = self.scrape_city(city).await?;
            info!(
                "{}: {} listings from {} pages ({:?})",
                report.city, report.listings, report.pages, report.stop
            );
            listings.extend(rows);
            cities.push(report);
        }

        info!("Crawl complete: {} listings", listings.len());
        Ok(ScrapeOutcome { listings, cities })
    }

    /// Walk the pages of one city until an error, an empty page or the page cap
    pub async fn scrape_city(&self, city: &City) -> Result<(Vec<ListingSummary>, CityReport)> {
        let mut rows = Vec::new();
        let mut pages = 0;
        let mut page = 1;
        let mut raw_errors = 0;

        let stop = loop {
            if page > self.config.max_pages {
                break StopReason::PageCap;
            }

            info!("Fetching page {} of {}..", page, city.name);
            let payload = serde_json::to_value(SearchPayload::for_city(city, page, self.config.rows))?;

            let response = match self.transport.post_json(&self.config.search_url, &payload).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Request for {} page {} failed: {:#}", city.name, page, e);
                    break StopReason::Failed {
                        error: format!("{:#}", e),
                    };
                }
            };

            if !response.is_success() {
                warn!(
                    "Error fetching data for {}. Status code: {}",
                    city.name, response.status
                );
                break StopReason::Status {
                    code: response.status,
                };
            }

            let page_rows = flatten::flatten_search_page(&response.body);
            if page_rows.is_empty() {
                info!("No more listings for {} or the data is unavailable", city.name);
                break StopReason::Exhausted;
            }

            debug!("{} page {}: {} listings", city.name, page, page_rows.len());
            for (row, raw) in page_rows {
                if !self.capture_raw(&row.id, raw).await {
                    raw_errors += 1;
                }
                rows.push(row);
            }
            pages += 1;
            page += 1;
        };

        let report = CityReport {
            city: city.name.to_string(),
            pages,
            listings: rows.len(),
            stop,
            raw_errors,
        };
        Ok((rows, report))
    }

    /// Fetch and flatten the full record of every id, in order.
    /// Failed or empty lookups are logged and skipped.
    pub async fn fetch_details(&self, ids: &[String]) -> Result<DetailOutcome> {
        info!("Fetching details for {} listings", ids.len());

        let mut listings = Vec::with_capacity(ids.len());
        let mut skipped = 0;
        let mut raw_errors = 0;

        for (i, id) in ids.iter().enumerate() {
            debug!("Detail {}/{}: {}", i + 1, ids.len(), id);
            let payload = serde_json::to_value(DetailPayload::for_listing(id))?;

            let response = match self.transport.post_json(&self.config.detail_url, &payload).await {
                Ok(response) if response.is_success() => response,
                Ok(response) => {
                    warn!("Detail for {} returned status {}", id, response.status);
                    skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Detail request for {} failed: {:#}", id, e);
                    skipped += 1;
                    continue;
                }
            };

            match flatten::flatten_detail(&response.body) {
                Some((detail, raw)) => {
                    if !self.capture_raw(&detail.id, raw).await {
                        raw_errors += 1;
                    }
                    listings.push(detail);
                }
                None => {
                    warn!("No detail available for listing {}", id);
                    skipped += 1;
                }
            }

            if (i + 1) % 50 == 0 {
                info!("Detail progress: {} / {} ({} skipped)", i + 1, ids.len(), skipped);
            }
        }

        info!(
            "Detail pass complete: {} listings, {} skipped",
            listings.len(),
            skipped
        );
        Ok(DetailOutcome {
            listings,
            skipped,
            raw_errors,
        })
    }

    /// Save one raw listing when `raw_dir` is set. Failures are logged, never fatal.
    async fn capture_raw(&self, id: &str, raw: &Value) -> bool {
        let Some(dir) = &self.config.raw_dir else {
            return true;
        };
        match storage::save_raw(dir, id, raw).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Could not save raw listing {}: {:#}", id, e);
                false
            }
        }
    }
}

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Status and body of one search-API call
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body; `Value::Null` for non-success responses
    pub body: Value,
}

impl ApiResponse {
    /// Only a plain 200 counts; any other status ends a city's pagination
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Transport used to talk to the search API.
/// The HTTP implementation lives in `fincaraiz`; tests swap in canned responses.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// POST `payload` as JSON to `url`
    async fn post_json(&self, url: &str, payload: &Value) -> Result<ApiResponse>;

    /// Get the name of the transport
    fn source_name(&self) -> &'static str;
}

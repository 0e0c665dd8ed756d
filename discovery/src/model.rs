//! Inventory records reported to the discovery endpoint.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
/// API Gateway product an API belongs to.
#[serde(rename_all = "UPPERCASE")]
pub enum ApiType {
    /// API Gateway (v1) REST API.
    Rest,
    /// API Gateway v2 HTTP API.
    Http,
}

impl std::fmt::Display for ApiType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiType::Rest => f.write_str("REST"),
            ApiType::Http => f.write_str("HTTP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// One API found in a region, with its deployed stages.
pub struct DiscoveredApi {
    pub account_id: String,
    pub region: String,
    pub api_id: String,
    pub api_name: String,
    pub api_type: ApiType,
    pub stages: Vec<String>,
    pub endpoint: String,
}

/// Public invoke URL of an API (without stage path).
pub fn endpoint_for(api_id: &str, region: &str) -> String {
    format!("https://{api_id}.execute-api.{region}.amazonaws.com")
}

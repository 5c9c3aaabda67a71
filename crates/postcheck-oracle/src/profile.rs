//! Service profile: the capability object an HTTP client is built from.
//!
//! The external service has no public API contract, so everything that
//! tends to change (endpoint, session cookies, browser-like headers, body
//! shape, where the answer sits in the response) is configuration rather
//! than code.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use serde::{Deserialize, Serialize};

use crate::error::{OracleError, Result};

/// Placeholder in [`ServiceProfile::body_template`] replaced by the query,
/// encoded as a JSON string.
pub const QUERY_PLACEHOLDER: &str = "{query}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceProfile {
    /// URL the query is POSTed to.
    pub endpoint: String,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
    /// Session cookies, sent as one `Cookie` header.
    pub cookies: BTreeMap<String, String>,
    pub timeout_secs: u64,
    /// JSON request body containing [`QUERY_PLACEHOLDER`] exactly where the
    /// query string goes.
    pub body_template: String,
    /// JSON pointer to the answer inside the response object. When the
    /// response is an array, the pointer applies to its first element.
    pub result_pointer: String,
}

impl Default for ServiceProfile {
    fn default() -> Self {
        let headers = [
            ("Accept", "application/json"),
            ("Content-Type", "application/json"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            endpoint: String::new(),
            headers,
            cookies: BTreeMap::new(),
            timeout_secs: 30,
            body_template: format!("{{\"query\":{QUERY_PLACEHOLDER}}}"),
            result_pointer: String::new(),
        }
    }
}

impl ServiceProfile {
    /// Profile shape of the address -> postcode lookup.
    pub fn address_lookup(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            body_template: format!("{{\"address\":{QUERY_PLACEHOLDER},\"limit\":1}}"),
            result_pointer: "/postalCode".into(),
            ..Self::default()
        }
    }

    /// Profile shape of the post office finder (postcode -> office address).
    pub fn post_office_finder(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            body_template: format!("{{\"postalCode\":{QUERY_PLACEHOLDER},\"limit\":1}}"),
            result_pointer: "/address/fullAddress".into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check the parts that can be checked without a request.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(OracleError::InvalidTemplate("endpoint is empty".into()));
        }
        if self.body_template.matches(QUERY_PLACEHOLDER).count() != 1 {
            return Err(OracleError::InvalidTemplate(format!(
                "body template must contain {QUERY_PLACEHOLDER} exactly once"
            )));
        }
        if !self.result_pointer.is_empty() && !self.result_pointer.starts_with('/') {
            return Err(OracleError::InvalidTemplate(format!(
                "result pointer {:?} must start with '/'",
                self.result_pointer
            )));
        }
        self.header_map().map(|_| ())
    }

    /// Request body for `query`.
    pub fn render_body(&self, query: &str) -> String {
        let encoded = serde_json::Value::String(query.to_string()).to_string();
        self.body_template.replace(QUERY_PLACEHOLDER, &encoded)
    }

    /// Default headers of every request, cookies included.
    pub fn header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                OracleError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                }
            })?;
            map.insert(header, header_value(name, value)?);
        }

        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            map.insert(COOKIE, header_value("Cookie", &cookie)?);
        }
        Ok(map)
    }

    /// Build the HTTP client this profile describes.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        self.validate()?;
        let client = reqwest::Client::builder()
            .default_headers(self.header_map()?)
            .timeout(self.timeout())
            .build()?;
        Ok(client)
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| OracleError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

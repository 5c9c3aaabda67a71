//! HTTP/JSON implementations of the oracle traits.
//!
//! Both services answer a POSTed JSON query with a JSON array of matches.
//! The first match is taken and the answer is read from it with the
//! profile's JSON pointer.

use async_trait::async_trait;
use postcheck_core::Postcode;
use serde_json::Value;
use tracing::debug;

use crate::error::{LookupError, Result};
use crate::profile::ServiceProfile;
use crate::traits::{LookupOracle, SecondaryDirectory};

/// One configured JSON endpoint.
struct JsonEndpoint {
    client: reqwest::Client,
    profile: ServiceProfile,
}

impl JsonEndpoint {
    fn new(profile: ServiceProfile) -> Result<Self> {
        Ok(Self {
            client: profile.build_client()?,
            profile,
        })
    }

    async fn query(&self, query: &str) -> std::result::Result<String, LookupError> {
        let response = self
            .client
            .post(&self.profile.endpoint)
            .body(self.profile.render_body(query))
            .send()
            .await
            .map_err(|e| LookupError::Transient(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| LookupError::Transient(e.to_string()))?;

        extract_answer(status, &body, &self.profile.result_pointer)
    }
}

/// Interpret one response.
///
/// - non-2xx other than 404, malformed JSON, or a match without the
///   answer field: transient
/// - 404, `null`, an empty array, or an empty answer: no data
pub fn extract_answer(
    status: u16,
    body: &str,
    pointer: &str,
) -> std::result::Result<String, LookupError> {
    match status {
        200..=299 => {}
        404 => return Err(LookupError::NoData),
        other => return Err(LookupError::Transient(format!("unexpected status {other}"))),
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| LookupError::Transient(format!("malformed response: {e}")))?;

    let first = match &value {
        Value::Null => return Err(LookupError::NoData),
        Value::Array(items) => items.first().ok_or(LookupError::NoData)?,
        other => other,
    };

    let answer = if pointer.is_empty() {
        Some(first)
    } else {
        first.pointer(pointer)
    };

    match answer {
        None => Err(LookupError::Transient(format!("response has no {pointer}"))),
        Some(Value::Null) => Err(LookupError::NoData),
        Some(Value::String(s)) if s.trim().is_empty() => Err(LookupError::NoData),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(LookupError::Transient(format!("unexpected answer {other}"))),
    }
}

/// Address -> postcode lookup over HTTP.
pub struct HttpOracle {
    endpoint: JsonEndpoint,
}

impl HttpOracle {
    pub fn new(profile: ServiceProfile) -> Result<Self> {
        Ok(Self {
            endpoint: JsonEndpoint::new(profile)?,
        })
    }
}

#[async_trait]
impl LookupOracle for HttpOracle {
    async fn resolve(&self, address: &str) -> std::result::Result<Postcode, LookupError> {
        let answer = self.endpoint.query(address).await?;
        Postcode::new(&answer).map_err(|e| {
            debug!(answer = %answer, error = %e, "oracle answer is not a postcode");
            LookupError::NoData
        })
    }
}

/// Post office finder: postcode -> address of the office over HTTP.
pub struct HttpPostOffices {
    endpoint: JsonEndpoint,
}

impl HttpPostOffices {
    pub fn new(profile: ServiceProfile) -> Result<Self> {
        Ok(Self {
            endpoint: JsonEndpoint::new(profile)?,
        })
    }
}

#[async_trait]
impl SecondaryDirectory for HttpPostOffices {
    async fn representative_address(
        &self,
        postcode: &Postcode,
    ) -> std::result::Result<String, LookupError> {
        self.endpoint.query(postcode.as_str()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFICE: &str = r#"[{"postalCode":"630000","address":{"fullAddress":"Новосибирск, ул Ленина, 5"}}]"#;

    #[test]
    fn test_extract_first_match() {
        let answer = extract_answer(200, OFFICE, "/address/fullAddress").unwrap();
        assert_eq!(answer, "Новосибирск, ул Ленина, 5");
        assert_eq!(extract_answer(200, OFFICE, "/postalCode").unwrap(), "630000");
    }

    #[test]
    fn test_extract_empty_is_no_data() {
        assert_eq!(extract_answer(200, "[]", "/postalCode"), Err(LookupError::NoData));
        assert_eq!(extract_answer(200, "null", "/postalCode"), Err(LookupError::NoData));
        assert_eq!(
            extract_answer(200, r#"[{"postalCode":""}]"#, "/postalCode"),
            Err(LookupError::NoData)
        );
        assert_eq!(extract_answer(404, "", "/postalCode"), Err(LookupError::NoData));
    }

    #[test]
    fn test_extract_failures_are_transient() {
        let transient = |r: std::result::Result<String, LookupError>| {
            matches!(r, Err(LookupError::Transient(_)))
        };
        assert!(transient(extract_answer(200, "<html>", "/postalCode")));
        assert!(transient(extract_answer(503, OFFICE, "/postalCode")));
        assert!(transient(extract_answer(200, OFFICE, "/missing")));
    }

    #[test]
    fn test_extract_numeric_answer() {
        assert_eq!(
            extract_answer(200, r#"{"postalCode":101000}"#, "/postalCode").unwrap(),
            "101000"
        );
    }

    #[test]
    fn test_new_rejects_invalid_profile() {
        assert!(HttpOracle::new(ServiceProfile::default()).is_err());
        assert!(HttpPostOffices::new(ServiceProfile::post_office_finder("http://127.0.0.1:9")).is_ok());
    }
}

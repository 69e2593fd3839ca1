//! Endpoint registration
//!
//! One POST per call, the whole batch at once. The backend decides whether
//! a partially-invalid batch is rejected; nothing is retried per number.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::phone::PhoneNumberSet;
use crate::api::error::ApiError;
use crate::api::http::ApiHttpClient;

/// A single registration request
#[derive(Debug, Clone, Serialize)]
pub struct EndpointCreationRequest {
    pub phone_numbers: Vec<String>,
    pub base_url: String,
    #[serde(skip)]
    pub token: String,
}

impl EndpointCreationRequest {
    pub fn new(phone_numbers: Vec<String>, base_url: &str, token: &str) -> Self {
        Self {
            phone_numbers,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn url(&self) -> String {
        format!("{}/endpoints", self.base_url)
    }

    pub fn payload(&self) -> Value {
        json!({ "endpoints": self.phone_numbers })
    }

    /// Send the request, consuming it
    pub fn send(self, http: &ApiHttpClient) -> Result<Value, ApiError> {
        let url = self.url();
        info!(
            "Creating {} endpoint(s) at {}",
            self.phone_numbers.len(),
            url
        );
        debug!("Payload: {}", self.payload());

        let response = http
            .post_json(&url, Some(&self.token), &self.payload())?
            .error_for_status()?;
        response.json()
    }
}

/// Register `phone_numbers` as endpoints under `base_url`.
///
/// Returns the decoded response body verbatim on success. A body mentioning
/// that the numbers already exist fails with [`ApiError::Conflict`].
pub fn create(
    http: &ApiHttpClient,
    phone_numbers: &[String],
    base_url: &str,
    token: &str,
) -> Result<Value, ApiError> {
    EndpointCreationRequest::new(phone_numbers.to_vec(), base_url, token).send(http)
}

/// Numbers split by whether they appear in the free set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AvailabilityPartition {
    pub available: Vec<String>,
    pub unavailable: Vec<String>,
}

/// Split candidate numbers against the set of free numbers, keeping input order
pub fn partition_available(candidates: &[String], free: &PhoneNumberSet) -> AvailabilityPartition {
    let (available, unavailable): (Vec<String>, Vec<String>) = candidates
        .iter()
        .cloned()
        .partition(|n| free.contains_number(n));
    AvailabilityPartition {
        available,
        unavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use reqwest::StatusCode;
    use std::time::Duration;

    fn http() -> ApiHttpClient {
        ApiHttpClient::new(Duration::from_secs(5)).expect("client")
    }

    #[test]
    fn test_create_posts_endpoints_payload() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/conn/endpoints")
                .header("authorization", "Bearer tok")
                .json_body(json!({"endpoints": ["+911111111111", "+912222222222"]}));
            then.status(201).json_body(json!({"created": 2}));
        });

        let numbers = vec!["+911111111111".to_string(), "+912222222222".to_string()];
        let result = create(&http(), &numbers, &server.url("/conn/"), "tok").expect("created");

        mock.assert();
        assert_eq!(result, json!({"created": 2}));
    }

    #[test]
    fn test_already_exists_is_a_conflict() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/endpoints");
            then.status(409).json_body(json!({"detail": "already exists"}));
        });

        let err = create(
            &http(),
            &["+911111111111".to_string()],
            &server.base_url(),
            "tok",
        )
        .expect_err("conflict");
        assert!(err.is_conflict(), "got {err:?}");
        assert_eq!(err.status(), Some(StatusCode::CONFLICT));
    }

    #[test]
    fn test_other_failures_are_upstream_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/endpoints");
            then.status(422).body("invalid number format");
        });

        let err = create(&http(), &["123".to_string()], &server.base_url(), "tok")
            .expect_err("rejected");
        match err {
            ApiError::Upstream { status, body } => {
                assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
                assert_eq!(body, "invalid number format");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unreachable_server_is_transport_error() {
        let err = create(
            &http(),
            &["+911111111111".to_string()],
            "http://127.0.0.1:9",
            "tok",
        )
        .expect_err("no server");
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[test]
    fn test_partition_available() {
        let free: PhoneNumberSet = ["+911111111111", "+912222222222"].into_iter().collect();
        let candidates = vec![
            "+91 1111-111111".to_string(),
            "+913333333333".to_string(),
            "+912222222222".to_string(),
        ];
        let split = partition_available(&candidates, &free);
        assert_eq!(split.available, vec!["+91 1111-111111", "+912222222222"]);
        assert_eq!(split.unavailable, vec!["+913333333333"]);
    }
}

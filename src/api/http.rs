//! Blocking HTTP client for the telephony backend
//!
//! Every call is a single round trip with a fixed timeout. Nothing here
//! retries; status interpretation is left to the caller.

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::error::ApiError;

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Mask bearer tokens for logging
pub fn mask_token(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Truncate a body for log output without splitting a UTF-8 sequence
fn preview(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Raw response: status plus body text, read eagerly
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub url: String,
    pub text: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON. An empty body decodes to `null`.
    pub fn json(&self) -> Result<Value, ApiError> {
        if self.text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&self.text)?)
    }

    /// Turn a non-2xx response into the matching [`ApiError`]
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_status(self.status, &self.url, self.text))
        }
    }
}

/// Thin wrapper over `reqwest::blocking::Client`
#[derive(Debug, Clone)]
pub struct ApiHttpClient {
    http_client: Client,
    timeout: Duration,
}

impl ApiHttpClient {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` with the given query pairs appended to any existing query
    pub fn get(
        &self,
        url: &str,
        token: Option<&str>,
        query: &[(String, String)],
    ) -> Result<ApiResponse, ApiError> {
        debug!("GET {} query={:?}", url, query);
        let request = self.http_client.get(url).query(query);
        self.send("GET", url, token, request)
    }

    /// POST a JSON body to `url`
    pub fn post_json(
        &self,
        url: &str,
        token: Option<&str>,
        body: &Value,
    ) -> Result<ApiResponse, ApiError> {
        debug!("POST {}", url);
        trace!("POST body: {}", body);
        let request = self.http_client.post(url).json(body);
        self.send("POST", url, token, request)
    }

    fn send(
        &self,
        method: &str,
        url: &str,
        token: Option<&str>,
        request: RequestBuilder,
    ) -> Result<ApiResponse, ApiError> {
        let mut request = request.header("Accept", "application/json");
        if let Some(token) = token {
            trace!("Using bearer token {}", mask_token(token));
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|e| {
            warn!("{} {} failed: {}", method, url, e);
            ApiError::Transport(e)
        })?;
        let status = response.status();
        let final_url = response.url().to_string();
        let text = response.text()?;

        debug!("Response status: {}", status);
        trace!("Response body (first 2000 chars): {}", preview(&text, 2000));

        if !status.is_success() {
            warn!(
                "{} request failed: status={}, body={}",
                method,
                status,
                preview(&text, 500)
            );
        }

        Ok(ApiResponse {
            status,
            url: final_url,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client() -> ApiHttpClient {
        ApiHttpClient::new(Duration::from_secs(5)).expect("client")
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("short"), "*****");
        assert_eq!(mask_token("abcdefghijklmnop"), "abcd...mnop");
    }

    #[test]
    fn test_mask_token_counts_chars_not_bytes() {
        assert_eq!(mask_token("aéééé"), "*****");
        assert_eq!(mask_token("éééééééééé"), "éééé...éééé");
        assert_eq!(mask_token("ключ-доступа-42"), "ключ...а-42");
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        let text = "ab\u{00e9}cd";
        assert_eq!(preview(text, 3), "ab");
        assert_eq!(preview(text, 100), text);
    }

    #[test]
    fn test_get_sends_bearer_and_query() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/phone-numbers")
                .header("authorization", "Bearer tok-123")
                .header("accept", "application/json")
                .query_param("existing", "1")
                .query_param("offset", "0");
            then.status(200).json_body(json!({"items": []}));
        });

        let url = format!("{}?existing=1", server.url("/phone-numbers"));
        let response = client()
            .get(
                &url,
                Some("tok-123"),
                &[("offset".to_string(), "0".to_string())],
            )
            .expect("response");

        mock.assert();
        assert!(response.is_success());
        assert_eq!(response.json().expect("json"), json!({"items": []}));
    }

    #[test]
    fn test_error_status_is_returned_not_raised() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).body("not here");
        });

        let response = client()
            .get(&server.url("/missing"), None, &[])
            .expect("response");
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(matches!(
            response.error_for_status(),
            Err(ApiError::NotFound { .. })
        ));
    }

    #[test]
    fn test_empty_body_decodes_to_null() {
        let response = ApiResponse {
            status: StatusCode::OK,
            url: "http://x".into(),
            text: "  ".into(),
        };
        assert_eq!(response.json().expect("json"), Value::Null);
    }

    #[test]
    fn test_connection_refused_is_transport_error() {
        // Port 9 (discard) is not expected to be listening in test environments
        let err = client()
            .get("http://127.0.0.1:9/phone-numbers", None, &[])
            .expect_err("no server");
        assert!(matches!(err, ApiError::Transport(_)));
    }
}

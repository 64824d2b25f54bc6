//! Blocking REST client for the console API.
//!
//! One `ApiClient` lives for the duration of a command invocation. All I/O is
//! synchronous; HTTP statuses are surfaced as data so the service layer can
//! tell an expected 202 apart from a failure without exception gymnastics.
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use ureq::http::Response;
use ureq::{Agent, Body};

mod error;
pub mod types;

pub use error::ApiError;

use types::PendingResult;

/// How a command authenticates against the console.
#[derive(Debug, Clone)]
pub enum AuthScheme {
    /// `X-API-KEY` header, the default.
    ApiKey(String),
    /// HTTP Basic with the API key standing in for the password.
    Basic { username: String, key: String },
}

/// Result of a POST against an endpoint that may defer its answer.
#[derive(Debug)]
pub enum PostOutcome<T> {
    /// 200: the body was computed synchronously.
    Done(T),
    /// 202: the body will be available under the pending-results endpoint.
    Pending(PendingResult),
}

pub struct ApiClient {
    agent: Agent,
    base_url: String,
    auth: AuthScheme,
}

impl ApiClient {
    pub fn new(base_url: &str, auth: AuthScheme, timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        ApiClient {
            agent: config.new_agent(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_header(&self) -> (&'static str, String) {
        match &self.auth {
            AuthScheme::ApiKey(key) => ("X-API-KEY", key.clone()),
            AuthScheme::Basic { username, key } => (
                "Authorization",
                format!("Basic {}", BASE64.encode(format!("{username}:{key}"))),
            ),
        }
    }

    pub fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let (name, value) = self.auth_header();
        let response = self
            .agent
            .get(self.url(path))
            .header(name, value.as_str())
            .call()
            .map_err(|source| transport(path, source))?;
        read_expected_json("GET", path, response)
    }

    /// GET an endpoint that answers 202 while its result is still pending.
    pub fn get_json_if_ready<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, ApiError> {
        let (name, value) = self.auth_header();
        let response = self
            .agent
            .get(self.url(path))
            .header(name, value.as_str())
            .call()
            .map_err(|source| transport(path, source))?;
        if response.status().as_u16() == 202 {
            return Ok(None);
        }
        read_expected_json("GET", path, response).map(Some)
    }

    pub fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ApiError> {
        let (name, value) = self.auth_header();
        let response = self
            .agent
            .post(self.url(path))
            .header(name, value.as_str())
            .send_json(body)
            .map_err(|source| transport(path, source))?;
        read_expected_json("POST", path, response)
    }

    /// POST where the response body is irrelevant; only the status counts.
    pub fn post_unit(&self, path: &str, body: &impl Serialize) -> Result<(), ApiError> {
        let (name, value) = self.auth_header();
        let response = self
            .agent
            .post(self.url(path))
            .header(name, value.as_str())
            .send_json(body)
            .map_err(|source| transport(path, source))?;
        expect_success("POST", path, response).map(|_| ())
    }

    /// POST that may be answered with 202 + a pending-result handle.
    pub fn post_accepting_pending<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<PostOutcome<T>, ApiError> {
        let (name, value) = self.auth_header();
        let response = self
            .agent
            .post(self.url(path))
            .header(name, value.as_str())
            .send_json(body)
            .map_err(|source| transport(path, source))?;
        if response.status().as_u16() == 202 {
            let pending = read_body(path, response)?;
            return Ok(PostOutcome::Pending(pending));
        }
        read_expected_json("POST", path, response).map(PostOutcome::Done)
    }

    pub fn put_json(&self, path: &str, body: &impl Serialize) -> Result<(), ApiError> {
        let (name, value) = self.auth_header();
        let response = self
            .agent
            .put(self.url(path))
            .header(name, value.as_str())
            .send_json(body)
            .map_err(|source| transport(path, source))?;
        expect_success("PUT", path, response).map(|_| ())
    }

    /// Upload a raw body, e.g. a source archive.
    pub fn put_bytes(&self, path: &str, content_type: &str, bytes: &[u8]) -> Result<(), ApiError> {
        let (name, value) = self.auth_header();
        let response = self
            .agent
            .put(self.url(path))
            .header(name, value.as_str())
            .header("Content-Type", content_type)
            .send(bytes)
            .map_err(|source| transport(path, source))?;
        expect_success("PUT", path, response).map(|_| ())
    }

    pub fn delete(&self, path: &str) -> Result<(), ApiError> {
        let (name, value) = self.auth_header();
        let response = self
            .agent
            .delete(self.url(path))
            .header(name, value.as_str())
            .call()
            .map_err(|source| transport(path, source))?;
        expect_success("DELETE", path, response).map(|_| ())
    }
}

fn transport(path: &str, source: ureq::Error) -> ApiError {
    ApiError::Transport {
        path: path.to_string(),
        source,
    }
}

fn expect_success(
    method: &'static str,
    path: &str,
    response: Response<Body>,
) -> Result<Response<Body>, ApiError> {
    if response.status().is_success() {
        return Ok(response);
    }
    Err(status_error(method, path, response))
}

fn read_expected_json<T: DeserializeOwned>(
    method: &'static str,
    path: &str,
    response: Response<Body>,
) -> Result<T, ApiError> {
    let response = expect_success(method, path, response)?;
    read_body(path, response)
}

fn read_body<T: DeserializeOwned>(
    path: &str,
    mut response: Response<Body>,
) -> Result<T, ApiError> {
    response.body_mut().read_json().map_err(|source| ApiError::Decode {
        path: path.to_string(),
        source,
    })
}

fn status_error(method: &'static str, path: &str, mut response: Response<Body>) -> ApiError {
    let status = response.status().as_u16();
    let raw = response.body_mut().read_to_string().unwrap_or_default();
    ApiError::Status {
        method,
        path: path.to_string(),
        status,
        message: extract_message(&raw),
    }
}

/// Pull the console's error message out of a failure body when present.
fn extract_message(raw: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "<no body>".to_string();
    }
    let mut message: String = trimmed.chars().take(200).collect();
    if message.len() < trimmed.len() {
        message.push('…');
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_message_prefers_json_field() {
        let raw = r#"{"message": "version not found", "status": 404}"#;
        assert_eq!(extract_message(raw), "version not found");
    }

    #[test]
    fn extract_message_falls_back_to_truncated_body() {
        assert_eq!(extract_message("  plain failure  "), "plain failure");
        assert_eq!(extract_message(""), "<no body>");
        let long = "x".repeat(500);
        assert!(extract_message(&long).len() < 500);
    }

    #[test]
    fn auth_header_shapes() {
        let key_client = ApiClient::new(
            "http://console.local/",
            AuthScheme::ApiKey("secret".into()),
            Duration::from_secs(5),
        );
        assert_eq!(key_client.base_url, "http://console.local");
        let (name, value) = key_client.auth_header();
        assert_eq!(name, "X-API-KEY");
        assert_eq!(value, "secret");

        let basic_client = ApiClient::new(
            "http://console.local",
            AuthScheme::Basic {
                username: "cast".into(),
                key: "secret".into(),
            },
            Duration::from_secs(5),
        );
        let (name, value) = basic_client.auth_header();
        assert_eq!(name, "Authorization");
        assert!(value.starts_with("Basic "));
    }
}

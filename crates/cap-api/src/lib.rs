//! Remote estimate backend for capacity planning.
//!
//! Provides the collaborator calls the engine depends on:
//! - Fetching and persisting estimate configurations
//! - Requesting an FTE computation for an estimate

use std::fmt;
use std::time::Duration;

use cap_core::{EstimateConfig, FteRequest, FteResult};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote backend errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The configured base URL is unusable.
    #[error("invalid base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The estimate does not exist remotely.
    #[error("estimate not found: {0}")]
    NotFound(String),
    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Estimate backend client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct EstimateEnvelope {
    config: EstimateConfig,
}

impl Client {
    /// Creates a client for the backend at `base_url`.
    ///
    /// A blank token is treated as no token.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        let base_url = parse_base_url(base_url)?;
        let token = token.filter(|token| !token.trim().is_empty());

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(ApiError::ClientBuild)?;

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    /// Loads the configuration of an estimate.
    pub async fn fetch_estimate(&self, id: &str) -> Result<EstimateConfig, ApiError> {
        let url = self.estimate_url(id, &[])?;
        tracing::debug!(%url, "fetching estimate");
        let response = self.authorized(self.http.get(url)).send().await?;
        let body = read_body(id, response).await?;
        let envelope: EstimateEnvelope = serde_json::from_str(&body)
            .map_err(|err| ApiError::InvalidResponse(err.to_string()))?;
        Ok(envelope.config)
    }

    /// Replaces the stored configuration of an estimate.
    pub async fn persist_estimate_config(
        &self,
        id: &str,
        config: &EstimateConfig,
    ) -> Result<(), ApiError> {
        let url = self.estimate_url(id, &["config"])?;
        tracing::debug!(%url, "persisting estimate config");
        let response = self
            .authorized(self.http.put(url))
            .json(config)
            .send()
            .await?;
        read_body(id, response).await?;
        Ok(())
    }

    /// Asks the backend to compute FTE per slot and category.
    pub async fn compute_fte(&self, id: &str, request: &FteRequest) -> Result<FteResult, ApiError> {
        let url = self.estimate_url(id, &["fte"])?;
        tracing::debug!(%url, total_days = request.total_days.days(), "requesting FTE computation");
        let response = self
            .authorized(self.http.post(url))
            .json(request)
            .send()
            .await?;
        let body = read_body(id, response).await?;
        serde_json::from_str(&body).map_err(|err| ApiError::InvalidResponse(err.to_string()))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// `{base}/estimates/{id}/{tail...}` with every segment escaped.
    fn estimate_url(&self, id: &str, tail: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| ApiError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "cannot be a base".to_string(),
            })?;
            segments.pop_if_empty().push("estimates").push(id);
            segments.extend(tail);
        }
        Ok(url)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let invalid = |reason: String| ApiError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw.trim()).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("cannot be a base".to_string()));
    }
    Ok(url)
}

async fn read_body(id: &str, response: reqwest::Response) -> Result<String, ApiError> {
    let status = response.status();
    let body = response.text().await?;
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(id.to_string()));
    }
    if !status.is_success() {
        return Err(parse_api_error(status, &body).unwrap_or_else(|| ApiError::Api {
            status: status.as_u16(),
            message: body,
        }));
    }
    Ok(body)
}

fn parse_api_error(status: StatusCode, body: &str) -> Option<ApiError> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: ErrorDetails,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| ApiError::Api {
            status: status.as_u16(),
            message: payload.error.message,
        })
}

#[cfg(test)]
mod tests {
    use cap_core::TotalDays;
    use mockito::{Matcher, Server};

    use super::*;

    /// Base URL with a path prefix, so joins under `/api` are exercised too.
    fn api_base(server: &Server) -> String {
        format!("{}/api", server.url())
    }

    #[test]
    fn client_rejects_bad_base_urls() {
        assert!(matches!(
            Client::new("not a url", None),
            Err(ApiError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            Client::new("ftp://example.com", None),
            Err(ApiError::InvalidBaseUrl { .. })
        ));
        assert!(Client::new("https://plan.example.com/api/", None).is_ok());
    }

    #[test]
    fn client_debug_redacts_token() {
        let client = Client::new("https://plan.example.com", Some("secret-token".into())).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn blank_token_is_dropped() {
        let client = Client::new("https://plan.example.com", Some("  ".into())).unwrap();
        assert!(client.token.is_none());
    }

    #[test]
    fn estimate_urls_escape_ids() {
        let client = Client::new("https://plan.example.com/api/", None).unwrap();
        let url = client.estimate_url("a b/c", &["fte"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://plan.example.com/api/estimates/a%20b%2Fc/fte"
        );
    }

    #[test]
    fn parse_api_error_reads_message() {
        let err = parse_api_error(StatusCode::BAD_REQUEST, r#"{"error":{"message":"bad slots"}}"#);
        assert!(matches!(err, Some(ApiError::Api { status: 400, ref message }) if message == "bad slots"));
        assert!(parse_api_error(StatusCode::BAD_REQUEST, "oops").is_none());
    }

    #[tokio::test]
    async fn fetch_estimate_reads_envelope() {
        let config = EstimateConfig::legacy_default().with_elapsed_days(TotalDays::D20);
        let body = serde_json::json!({ "id": "est-1", "config": config }).to_string();
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/estimates/est-1")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let client = Client::new(&api_base(&server), Some("tok".into())).unwrap();
        let fetched = client.fetch_estimate("est-1").await.unwrap();

        assert_eq!(fetched, config);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_estimate_maps_to_not_found() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/estimates/gone")
            .with_status(404)
            .with_body("{}")
            .create_async()
            .await;

        let client = Client::new(&api_base(&server), None).unwrap();
        let err = client.fetch_estimate("gone").await.unwrap_err();

        assert!(matches!(err, ApiError::NotFound(id) if id == "gone"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn persist_sends_config_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/estimates/est-1/config")
            .match_header("authorization", Matcher::Missing)
            .match_body(Matcher::PartialJson(serde_json::json!({
                "elapsed_days": 60,
                "uat": { "values": [8, 9] }
            })))
            .with_status(204)
            .create_async()
            .await;

        let client = Client::new(&api_base(&server), None).unwrap();
        client
            .persist_estimate_config("est-1", &EstimateConfig::legacy_default())
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn compute_fte_posts_request_and_parses_result() {
        let body = r#"{"category_keys":["functional"],"intervals":[{"interval":1,"categories":{"functional":{"hours":8,"fte":1}}}]}"#;
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/estimates/est-1/fte")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "total_days": 60,
                "intervals_by_phase": { "analysis": [1, 2], "release": [10] }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let client = Client::new(&api_base(&server), Some("tok".into())).unwrap();
        let request = FteRequest::from_config(&EstimateConfig::legacy_default());
        let result = client.compute_fte("est-1", &request).await.unwrap();

        assert!(result.is_populated());
        assert_eq!(result.category_keys, ["functional"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_surface_message() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/estimates/est-1/fte")
            .with_status(500)
            .with_body(r#"{"error":{"message":"model offline"}}"#)
            .create_async()
            .await;

        let client = Client::new(&api_base(&server), None).unwrap();
        let err = client
            .compute_fte("est-1", &FteRequest::from_config(&EstimateConfig::legacy_default()))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Api { status: 500, ref message } if message == "model offline"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unparseable_error_body_is_kept_verbatim() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/estimates/est-1/config")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = Client::new(&api_base(&server), None).unwrap();
        let err = client
            .persist_estimate_config("est-1", &EstimateConfig::legacy_default())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Api { status: 502, ref message } if message == "bad gateway"));
        mock.assert_async().await;
    }
}

//! HTTP verifier against OpenAI-compatible model listing endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use tracing::debug;

use super::types::{ModelEntry, ModelListResponse};
use super::{CredentialVerifier, ValidationError, ValidationOutcome};
use crate::providers::Provider;
use crate::store::AvailableModel;
use crate::ApiKey;

/// Fixed bound on one validation request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Verifies keys with `GET {base_url}/models` and a bearer token.
#[derive(Debug, Clone)]
pub struct HttpVerifier {
    client: reqwest::Client,
}

impl HttpVerifier {
    /// Create a verifier whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ValidationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ValidationError::RequestFailed(e.to_string()))?;
        Ok(Self { client })
    }

    /// Build the listing URL for a provider base URL.
    pub fn models_url(base_url: &str) -> Result<reqwest::Url, ValidationError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ValidationError::MissingEndpoint);
        }

        let url = reqwest::Url::parse(&format!("{trimmed}/models"))
            .map_err(|e| ValidationError::InvalidUrl(format!("{base_url}: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidUrl(format!(
                "{base_url}: unsupported scheme {}",
                url.scheme()
            )));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(ValidationError::InvalidUrl(format!("{base_url}: missing host")));
        }
        Ok(url)
    }

    /// Fetch the provider's model listing using `secret`.
    pub async fn list_models(
        &self,
        base_url: &str,
        secret: &ApiKey,
    ) -> Result<Vec<AvailableModel>, ValidationError> {
        let url = Self::models_url(base_url)?;
        debug!(url = %url, "requesting model listing");

        let response = self
            .client
            .get(url)
            .bearer_auth(secret.expose_secret())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ValidationError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ValidationError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ValidationError::ServerError(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ValidationError::RequestFailed(e.to_string())
            } else {
                ValidationError::InvalidResponse
            }
        })?;

        parse_listing(&body)
    }
}

/// Parse a success body. An empty body is a valid listing with no models.
pub(crate) fn parse_listing(body: &[u8]) -> Result<Vec<AvailableModel>, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let listing: ModelListResponse = serde_json::from_slice(body)
        .map_err(|e| ValidationError::DecodingError(e.to_string()))?;
    Ok(listing.data.iter().map(ModelEntry::to_available_model).collect())
}

#[async_trait]
impl CredentialVerifier for HttpVerifier {
    async fn verify(&self, provider: &Provider, secret: &ApiKey) -> ValidationOutcome {
        match self.list_models(&provider.base_url, secret).await {
            Ok(models) => ValidationOutcome::Valid { models },
            Err(err) => ValidationOutcome::Invalid(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn verifier() -> HttpVerifier {
        HttpVerifier::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn models_url_appends_path() {
        let url = HttpVerifier::models_url("https://api.openai.com/v1").unwrap();
        assert_eq!(url.as_str(), "https://api.openai.com/v1/models");

        let url = HttpVerifier::models_url("https://api.deepseek.com/").unwrap();
        assert_eq!(url.as_str(), "https://api.deepseek.com/models");
    }

    #[test]
    fn models_url_rejects_bad_input() {
        assert_eq!(
            HttpVerifier::models_url("  "),
            Err(ValidationError::MissingEndpoint)
        );
        assert!(matches!(
            HttpVerifier::models_url("not a url"),
            Err(ValidationError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpVerifier::models_url("ftp://example.com"),
            Err(ValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn empty_body_is_zero_models() {
        assert_eq!(parse_listing(b""), Ok(vec![]));
        assert_eq!(parse_listing(b" \n"), Ok(vec![]));
        assert_eq!(parse_listing(br#"{"object":"list","data":[]}"#), Ok(vec![]));
    }

    #[test]
    fn unparsable_body_is_decoding_error() {
        assert!(matches!(
            parse_listing(b"<html>gateway</html>"),
            Err(ValidationError::DecodingError(_))
        ));
    }

    #[tokio::test]
    async fn sends_bearer_and_accept_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .and(header("authorization", "Bearer sk-test"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": [{"id": "gpt-4o", "object": "model", "owned_by": "system"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let models = verifier()
            .list_models(&format!("{}/v1", server.uri()), &ApiKey::new("sk-test"))
            .await
            .unwrap();
        assert_eq!(models, vec![AvailableModel::new("gpt-4o", "system")]);
    }

    #[tokio::test]
    async fn classifies_status_codes() {
        let cases = [
            (401, ValidationError::Unauthorized),
            (403, ValidationError::ServerError(403)),
            (429, ValidationError::ServerError(429)),
            (500, ValidationError::ServerError(500)),
        ];

        for (status, expected) in cases {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/models"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let err = verifier()
                .list_models(&server.uri(), &ApiKey::new("sk"))
                .await
                .unwrap_err();
            assert_eq!(err, expected, "status {status}");
        }
    }

    #[tokio::test]
    async fn success_with_empty_body_is_valid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let provider = Provider::new("Test", "", server.uri(), "", "");
        let outcome = verifier().verify(&provider, &ApiKey::new("sk")).await;
        assert_eq!(outcome, ValidationOutcome::Valid { models: vec![] });
    }

    #[tokio::test]
    async fn success_with_garbage_body_is_decoding_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_string("definitely not json"))
            .mount(&server)
            .await;

        let err = verifier()
            .list_models(&server.uri(), &ApiKey::new("sk"))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::DecodingError(_)));
    }

    #[tokio::test]
    async fn timeout_is_request_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let verifier = HttpVerifier::new(Duration::from_millis(50)).unwrap();
        let err = verifier
            .list_models(&server.uri(), &ApiKey::new("sk"))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::RequestFailed(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_request_failure() {
        // Port 9 (discard) on localhost is closed in test environments.
        let err = verifier()
            .list_models("http://127.0.0.1:9", &ApiKey::new("sk"))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::RequestFailed(_)));
    }
}

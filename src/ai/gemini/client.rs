use super::types::ApiErrorEnvelope;
use crate::{Error, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// `generateContent` transport shared by the refine and variant clients.
///
/// Each owner picks its own per-request timeout; the underlying
/// `reqwest::Client` (and its connection pool) can be shared.
pub struct GeminiHttpClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiHttpClient {
    pub fn new_with_client(
        api_key: String,
        model: String,
        timeout: Duration,
        client: Client,
    ) -> Self {
        // Accept both `gemini-2.5-flash` and `models/gemini-2.5-flash`.
        let model = match model.strip_prefix("models/") {
            Some(bare) => bare.to_string(),
            None => model,
        };

        Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    /// POSTs `request` to the model's `generateContent` endpoint.
    ///
    /// Non-2xx responses become [`Error::AiProvider`] carrying the status,
    /// the API's own status code name when present, and the raw body. The
    /// diagnostics classifier matches on that text.
    pub async fn generate_content<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        request: &Req,
    ) -> Result<Resp> {
        debug!("POST generateContent ({})", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("Request to {} failed: {}", self.model, e);
                e
            })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = describe_api_error(status, &body);
            error!("{}", message);
            return Err(Error::AiProvider(message));
        }

        serde_json::from_str(&body).map_err(|e| {
            error!("Unparseable response from {}: {}\nBody: {}", self.model, e, body);
            Error::AiProvider(format!("Failed to parse Gemini response: {}", e))
        })
    }
}

fn describe_api_error(status: StatusCode, body: &str) -> String {
    let api_status = serde_json::from_str::<ApiErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.status);

    match api_status {
        Some(api_status) => format!(
            "Gemini API error (status {}, {}): {}",
            status, api_status, body
        ),
        None => format!("Gemini API error (status {}): {}", status, body),
    }
}

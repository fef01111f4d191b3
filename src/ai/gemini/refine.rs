use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentResponse, Part};
use crate::ai::RefineService;
use crate::data_uri::DataUri;
use crate::{prompts, Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct RefineRequest {
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: Option<RefineGenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefineGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Gemini vision model that rewrites the user's request against the photo.
pub struct GeminiRefineClient {
    http: GeminiHttpClient,
}

impl GeminiRefineClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(
                api_key,
                model,
                Duration::from_secs(30),
                client,
            ),
        }
    }

    fn extract_text(response: &GenerateContentResponse) -> Option<String> {
        response
            .first_parts()
            .iter()
            .find_map(|p| match p {
                Part::Text { text } => Some(text.trim().to_string()),
                Part::InlineData { .. } => None,
            })
            .filter(|text| !text.is_empty())
    }
}

#[cfg(test)]
super::impl_with_gemini_base_url!(GeminiRefineClient);

#[async_trait]
impl RefineService for GeminiRefineClient {
    async fn refine_instructions(&self, image_data_uri: &str, prompt: &str) -> Result<String> {
        let image = DataUri::parse(image_data_uri)?;
        tracing::debug!(
            "Refining instructions ({} chars) with {}",
            prompt.len(),
            self.http.model()
        );

        let request = RefineRequest {
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::text(prompts::REFINE_SYSTEM)],
            }),
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::inline(&image),
                    Part::text(prompts::render(prompts::REFINE_USER, &[("prompt", prompt)])),
                ],
            }],
            generation_config: Some(RefineGenerationConfig {
                max_output_tokens: Some(1024),
                temperature: Some(0.2),
            }),
        };

        let response: GenerateContentResponse = self.http.generate_content(&request).await?;

        Self::extract_text(&response).ok_or_else(|| {
            Error::AiProvider(format!(
                "No refined instruction in Gemini response (finish reason: {})",
                response.finish_reason().unwrap_or("unknown")
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::gemini::test_support;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DEFAULT_MODEL: &str = "gemini-2.5-flash";
    const IMAGE: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn make_client(server: &MockServer, api_key: &str, model: &str) -> GeminiRefineClient {
        GeminiRefineClient::new(api_key.to_string(), model.to_string())
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_refine_parses_and_trims_response() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "parts": [{ "text": "  Replace the bare branches with spring foliage.\n" }]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let client = make_client(&server, "test-key", DEFAULT_MODEL);

        let refined = client
            .refine_instructions(IMAGE, "把背景的枯树枝去掉")
            .await
            .unwrap();
        assert_eq!(refined, "Replace the bare branches with spring foliage.");
    }

    #[tokio::test]
    async fn test_refine_sends_image_inline_with_prompt() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .and(body_string_contains("\"mimeType\":\"image/png\""))
            .and(body_string_contains("\"data\":\"iVBORw0KGgo=\""))
            .and(body_string_contains("make the sky purple"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server, "test-key", DEFAULT_MODEL);
        client
            .refine_instructions(IMAGE, "make the sky purple")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_api_error_keeps_status_and_body() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(
                ResponseTemplate::new(429).set_body_string("{\"status\":\"RESOURCE_EXHAUSTED\"}"),
            )
            .mount(&server)
            .await;

        let client = make_client(&server, "test-key", DEFAULT_MODEL);

        let err = client.refine_instructions(IMAGE, "x").await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
        let message = err.to_string();
        assert!(message.contains("429"));
        assert!(message.contains("RESOURCE_EXHAUSTED"));
    }

    #[tokio::test]
    async fn test_refine_rejects_empty_candidates() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "finishReason": "SAFETY" }]
            })))
            .mount(&server)
            .await;

        let client = make_client(&server, "test-key", DEFAULT_MODEL);
        let err = client.refine_instructions(IMAGE, "x").await.unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_refine_rejects_non_data_uri_image() {
        let client = GeminiRefineClient::new("k".to_string(), DEFAULT_MODEL.to_string());
        let err = client
            .refine_instructions("/tmp/photo.jpg", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_refine_strips_models_prefix_from_model_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "refined" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server, "test-key", "models/gemini-2.5-flash");
        client.refine_instructions(IMAGE, "x").await.unwrap();
    }
}

use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentResponse, Part};
use crate::ai::VariantService;
use crate::data_uri::DataUri;
use crate::models::{GenerationMode, ModificationResult, ModificationTask, DEFAULT_ASPECT_RATIO};
use crate::{prompts, Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct VariantRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: VariantGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VariantGenerationConfig {
    response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

/// Gemini image model producing one edited variant per call.
pub struct GeminiVariantClient {
    http: GeminiHttpClient,
    aspect_ratio: String,
}

impl GeminiVariantClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(
                api_key,
                model,
                Duration::from_secs(120),
                client,
            ),
            aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
        }
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: String) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }
}

#[cfg(test)]
super::impl_with_gemini_base_url!(GeminiVariantClient);

#[async_trait]
impl VariantService for GeminiVariantClient {
    async fn generate_variant(
        &self,
        task: &ModificationTask,
        mode: GenerationMode,
    ) -> Result<ModificationResult> {
        let source = DataUri::parse(&task.original_image)?;
        let prompt = prompts::variant_prompt(task, mode);

        let request = VariantRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::inline(&source), Part::text(prompt.clone())],
            }],
            generation_config: VariantGenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
                image_config: Some(ImageConfig {
                    aspect_ratio: self.aspect_ratio.clone(),
                }),
            },
        };

        let response: GenerateContentResponse = self.http.generate_content(&request).await?;

        let image_data = response
            .first_parts()
            .iter()
            .find_map(|p| match p {
                Part::InlineData { inline_data } => Some(inline_data),
                _ => None,
            })
            .ok_or_else(|| {
                Error::AiProvider(format!(
                    "No image data in Gemini response for {} (finish reason: {})",
                    mode,
                    response.finish_reason().unwrap_or("unknown")
                ))
            })?;

        tracing::debug!(
            "[{}] Gemini returned image with mime_type: {}",
            mode,
            image_data.mime_type
        );

        let image = DataUri {
            mime_type: image_data.mime_type.clone(),
            data: image_data.data.clone(),
        };
        // Reject payloads that would only fail later at download time.
        image
            .decode()
            .map_err(|e| Error::AiProvider(format!("Failed to decode Gemini image: {}", e)))?;

        Ok(ModificationResult::new(image.to_uri(), mode, prompt))
    }
}

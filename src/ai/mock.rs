use super::{RefineService, VariantService};
use crate::models::{GenerationMode, ModificationResult, ModificationTask};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// 1x1 PNG used as the default mock variant payload.
pub const MOCK_PNG_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAIAAACQd1PeAAAADElEQVR4nGP4z8AAAAMBAQDJ/pLvAAAAAElFTkSuQmCC";

#[derive(Clone)]
pub struct MockRefineClient {
    responses: Arc<Mutex<Vec<String>>>,
    failure: Arc<Mutex<Option<String>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockRefineClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_refined_response(self, response: String) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    pub fn with_failure(self, message: String) -> Self {
        *self.failure.lock().unwrap() = Some(message);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockRefineClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RefineService for MockRefineClient {
    async fn refine_instructions(&self, _image_data_uri: &str, prompt: &str) -> Result<String> {
        let count = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count
        };

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(Error::AiProvider(message));
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(format!("Refined: {}", prompt))
        } else {
            let index = (count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}

/// Scripted behaviour for one mode: how long the call takes and whether it
/// fails.
#[derive(Debug, Clone, Default)]
struct ModeScript {
    latency: Duration,
    failure: Option<String>,
}

/// A recorded variant call, in the order calls started.
#[derive(Debug, Clone)]
pub struct VariantCall {
    pub mode: GenerationMode,
    pub prompt: String,
    pub started_at: Instant,
}

#[derive(Clone)]
pub struct MockVariantClient {
    scripts: Arc<Mutex<HashMap<GenerationMode, ModeScript>>>,
    calls: Arc<Mutex<Vec<VariantCall>>>,
    image_url: String,
}

impl MockVariantClient {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            image_url: MOCK_PNG_DATA_URI.to_string(),
        }
    }

    pub fn with_image_url(mut self, url: String) -> Self {
        self.image_url = url;
        self
    }

    /// Makes calls for `mode` take `latency` before settling.
    pub fn with_latency(self, mode: GenerationMode, latency: Duration) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(mode)
            .or_default()
            .latency = latency;
        self
    }

    /// Makes calls for `mode` fail with an [`Error::AiProvider`] carrying `message`.
    pub fn with_failure(self, mode: GenerationMode, message: String) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(mode)
            .or_default()
            .failure = Some(message);
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn get_calls(&self) -> Vec<VariantCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockVariantClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VariantService for MockVariantClient {
    async fn generate_variant(
        &self,
        task: &ModificationTask,
        mode: GenerationMode,
    ) -> Result<ModificationResult> {
        self.calls.lock().unwrap().push(VariantCall {
            mode,
            prompt: task.prompt.clone(),
            started_at: Instant::now(),
        });

        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(&mode)
            .cloned()
            .unwrap_or_default();

        if !script.latency.is_zero() {
            tokio::time::sleep(script.latency).await;
        }

        match script.failure {
            Some(message) => Err(Error::AiProvider(message)),
            None => Ok(ModificationResult::new(
                self.image_url.clone(),
                mode,
                task.prompt.clone(),
            )),
        }
    }
}

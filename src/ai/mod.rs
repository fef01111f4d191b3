//! AI service integration for instruction refinement and variant generation
//!
//! Provides the service traits the orchestrator depends on, Gemini-backed
//! implementations, and scriptable mocks for tests and local harnesses.

pub mod gemini;
pub mod mime;
pub mod mock;

pub use gemini::{GeminiRefineClient, GeminiVariantClient};
pub use mock::{MockRefineClient, MockVariantClient};

use crate::models::{GenerationMode, ModificationResult, ModificationTask};
use crate::Result;
use async_trait::async_trait;

/// Turns a raw user request into a precise editing instruction.
#[async_trait]
pub trait RefineService: Send + Sync {
    async fn refine_instructions(&self, image_data_uri: &str, prompt: &str) -> Result<String>;
}

/// Produces one image variant of a task for the given mode.
#[async_trait]
pub trait VariantService: Send + Sync {
    async fn generate_variant(
        &self,
        task: &ModificationTask,
        mode: GenerationMode,
    ) -> Result<ModificationResult>;
}

//! Generation run: refine once, fan out one staggered call per mode, wait for
//! every call to settle, then partition successes from failures.

use crate::ai::{RefineService, VariantService};
use crate::models::{GenerationMode, ModificationResult, ModificationTask};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{self, JoinSet};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// A mode whose call settled with an error while at least one sibling succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantFailure {
    pub mode: GenerationMode,
    pub message: String,
}

/// Successful variants in settlement order plus the modes that were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOutcome {
    pub refined_prompt: String,
    pub results: Vec<ModificationResult>,
    pub failures: Vec<VariantFailure>,
}

impl GenerationOutcome {
    /// Human-readable note about dropped variants, if any were dropped.
    pub fn partial_failure_notice(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let total = self.results.len() + self.failures.len();
        let modes: Vec<&str> = self.failures.iter().map(|f| f.mode.as_tag()).collect();
        Some(format!(
            "{}/{} variants failed: {}",
            self.failures.len(),
            total,
            modes.join(", ")
        ))
    }
}

pub struct Orchestrator {
    refiner: Arc<dyn RefineService>,
    generator: Arc<dyn VariantService>,
    stagger: Duration,
}

impl Orchestrator {
    pub fn new(
        refiner: Arc<dyn RefineService>,
        generator: Arc<dyn VariantService>,
        stagger: Duration,
    ) -> Self {
        Self {
            refiner,
            generator,
            stagger,
        }
    }

    pub fn stagger(&self) -> Duration {
        self.stagger
    }

    /// Runs one generation for `task`.
    ///
    /// The i-th mode is dispatched `i * stagger` after dispatch start,
    /// regardless of how long earlier calls take. A refinement failure aborts
    /// the run before any variant is attempted. If every variant fails, the
    /// error of the first call to settle is returned.
    ///
    /// Dropping the returned future aborts every in-flight variant call.
    pub async fn run(&self, task: &ModificationTask) -> Result<GenerationOutcome> {
        let refined_prompt = self
            .refiner
            .refine_instructions(&task.original_image, &task.prompt)
            .await
            .map_err(|e| {
                error!("Instruction refinement failed: {}", e);
                e
            })?;
        info!(
            "Refined prompt ({} chars): {}",
            refined_prompt.len(),
            refined_prompt
        );

        let refined_task = Arc::new(task.with_prompt(refined_prompt.clone()));
        let start = Instant::now();
        let mut in_flight = JoinSet::new();
        // A panicked task yields only its id, so keep the mode per task.
        let mut task_modes: HashMap<task::Id, GenerationMode> = HashMap::new();

        for (index, mode) in GenerationMode::ALL.into_iter().enumerate() {
            let generator = Arc::clone(&self.generator);
            let task = Arc::clone(&refined_task);
            let dispatch_at = start + self.stagger * index as u32;

            let handle = in_flight.spawn(async move {
                tokio::time::sleep_until(dispatch_at).await;
                debug!("[{}] Dispatching variant request", mode);
                generator.generate_variant(&task, mode).await
            });
            task_modes.insert(handle.id(), mode);
        }

        let mut results = Vec::new();
        let mut failures = Vec::new();
        let mut first_error: Option<Error> = None;

        while let Some(joined) = in_flight.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, outcome)) => (id, outcome),
                Err(e) => (
                    e.id(),
                    Err(Error::Invariant(format!("Variant task failed: {}", e))),
                ),
            };
            let mode = task_modes.get(&id).copied().ok_or_else(|| {
                Error::Invariant(format!("Settled variant task {} has no mode", id))
            })?;

            match outcome {
                Ok(result) => {
                    info!("[{}] Variant ready ({})", mode, result.id);
                    results.push(result);
                }
                Err(e) => {
                    warn!("[{}] Variant failed: {}", mode, e);
                    failures.push(VariantFailure {
                        mode,
                        message: e.to_string(),
                    });
                    first_error.get_or_insert(e);
                }
            }
        }

        if results.is_empty() {
            return Err(first_error.unwrap_or_else(|| {
                Error::Invariant("Generation settled with no outcomes".to_string())
            }));
        }

        if !failures.is_empty() {
            warn!(
                "{} of {} variants failed and were dropped",
                failures.len(),
                GenerationMode::ALL.len()
            );
        }

        Ok(GenerationOutcome {
            refined_prompt,
            results,
            failures,
        })
    }
}

//! Runtime for the Upload → Describe → Generate wizard.
//!
//! [`App`] owns the [`AppState`], applies actions through the reducer and
//! executes the effects it returns. Generation runs execute as tokio tasks
//! and report back over a channel; their completions are applied through the
//! reducer like any other action.

use crate::ai::{GeminiRefineClient, GeminiVariantClient, RefineService, VariantService};
use crate::image::{read_upload, ImageProcessor, ImageService};
use crate::models::{Config, ModificationResult};
use crate::orchestrator::Orchestrator;
use crate::state::{reduce, Action, AppState, Effect, RunId};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub refiner: Arc<dyn RefineService>,
    pub generator: Arc<dyn VariantService>,
    pub image: Box<dyn ImageService>,
    pub stagger: Duration,
}

pub struct App {
    state: AppState,
    orchestrator: Arc<Orchestrator>,
    image: Box<dyn ImageService>,
    in_flight: Option<(RunId, JoinHandle<()>)>,
    completions_tx: mpsc::UnboundedSender<Action>,
    completions_rx: mpsc::UnboundedReceiver<Action>,
}

impl App {
    /// Build an app from concrete service dependencies.
    pub fn with_services(services: AppServices) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            state: AppState::default(),
            orchestrator: Arc::new(Orchestrator::new(
                services.refiner,
                services.generator,
                services.stagger,
            )),
            image: services.image,
            in_flight: None,
            completions_tx,
            completions_rx,
        }
    }

    /// Construct an app backed by Gemini, writing files to `output_dir`.
    pub fn new(config: &Config, output_dir: &Path) -> Result<Self> {
        // Reuse one HTTP connection pool across provider clients.
        let http_client = reqwest::Client::new();

        info!("Refine model: {}", config.refine_model);
        info!(
            "Image model: {} (aspect ratio {})",
            config.image_model, config.aspect_ratio
        );

        let refiner = GeminiRefineClient::new_with_client(
            config.gemini_api_key.clone(),
            config.refine_model.clone(),
            http_client.clone(),
        );
        let generator = GeminiVariantClient::new_with_client(
            config.gemini_api_key.clone(),
            config.image_model.clone(),
            http_client.clone(),
        )
        .with_aspect_ratio(config.aspect_ratio.clone());
        let image = ImageProcessor::new_with_client(output_dir, http_client)?;
        info!("Writing downloads to {}", output_dir.display());

        Ok(Self::with_services(AppServices {
            refiner: Arc::new(refiner),
            generator: Arc::new(generator),
            image: Box::new(image),
            stagger: config.stagger,
        }))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Applies an action and executes whatever effects it produces.
    pub fn dispatch(&mut self, action: Action) {
        let completed_run = match &action {
            Action::GenerationSucceeded { run, .. } | Action::GenerationFailed { run, .. } => {
                Some(*run)
            }
            _ => None,
        };
        if let Some(run) = completed_run {
            if matches!(&self.in_flight, Some((active, _)) if *active == run) {
                self.in_flight = None;
            }
        }

        for effect in reduce(&mut self.state, action) {
            self.execute(effect);
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::StartGeneration { run, task } => {
                if let Some((previous, handle)) = self.in_flight.take() {
                    warn!("Run {} still in flight when {} started; aborting it", previous, run);
                    handle.abort();
                }

                info!("Starting generation run {}", run);
                let orchestrator = Arc::clone(&self.orchestrator);
                let completions = self.completions_tx.clone();
                let handle = tokio::spawn(async move {
                    let action = match orchestrator.run(&task).await {
                        Ok(outcome) => Action::GenerationSucceeded { run, outcome },
                        Err(e) => {
                            tracing::error!("Critical API error in run {}: {}", run, e);
                            Action::GenerationFailed {
                                run,
                                message: failure_message(e),
                            }
                        }
                    };
                    // The receiver lives as long as the app.
                    let _ = completions.send(action);
                });
                self.in_flight = Some((run, handle));
            }
            Effect::CancelGeneration { run } => {
                if let Some((active, handle)) = self.in_flight.take() {
                    if active == run {
                        info!("Cancelling generation run {}", run);
                        handle.abort();
                    } else {
                        self.in_flight = Some((active, handle));
                    }
                }
            }
        }
    }

    /// Waits for the next run completion and applies it.
    ///
    /// Cancel-safe: dropping the future before it resolves loses nothing.
    pub async fn poll_generation(&mut self) {
        if let Some(action) = self.completions_rx.recv().await {
            self.dispatch(action);
        }
    }

    /// Drives completions until no run is active.
    pub async fn wait_for_generation(&mut self) {
        while self.state.is_generating {
            self.poll_generation().await;
        }
    }

    /// Starts a run for the current task, or says why one cannot start.
    pub fn generate(&mut self) -> Result<()> {
        if self.state.is_generating {
            return Err(Error::InvalidInput(
                "A generation is still running; wait for it or reset".to_string(),
            ));
        }
        if self.state.original_image.is_none() {
            return Err(Error::InvalidInput("No image uploaded".to_string()));
        }
        if self.state.current_task.prompt.trim().is_empty() {
            return Err(Error::InvalidInput("Prompt is empty".to_string()));
        }
        self.dispatch(Action::Generate);
        Ok(())
    }

    pub async fn upload_file(&mut self, path: &Path) -> Result<()> {
        let image = read_upload(path).await?;
        self.dispatch(Action::Upload(image));
        Ok(())
    }

    fn result_at(&self, index: usize) -> Result<&ModificationResult> {
        index
            .checked_sub(1)
            .and_then(|i| self.state.results.get(i))
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "No variant #{} (have {})",
                    index,
                    self.state.results.len()
                ))
            })
    }

    /// Selects the 1-based `index`-th current result.
    pub fn select(&mut self, index: usize) -> Result<()> {
        let id = self.result_at(index)?.id;
        self.dispatch(Action::Select(id));
        Ok(())
    }

    /// Downloads one result as `variant-<MODE>_<HHMMSS>.jpg`.
    pub async fn download(&self, index: usize) -> Result<PathBuf> {
        let result = self.result_at(index)?;
        self.image
            .export_jpeg(&result.url, &format!("variant-{}", result.mode))
            .await
    }

    /// Downloads every current result as `variant-<n>_<HHMMSS>.jpg`.
    pub async fn download_all(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(self.state.results.len());
        for (index, result) in self.state.results.iter().enumerate() {
            let path = self
                .image
                .export_jpeg(&result.url, &format!("variant-{}", index + 1))
                .await?;
            paths.push(path);
        }
        Ok(paths)
    }

    /// Writes a before/after comparison for the 1-based `index`-th result.
    pub async fn compare(&self, index: usize, position: f32) -> Result<PathBuf> {
        let result = self.result_at(index)?;
        let original = self
            .state
            .original_image
            .as_deref()
            .ok_or_else(|| Error::InvalidInput("No image uploaded".to_string()))?;
        self.image
            .export_comparison(
                original,
                &result.url,
                position,
                &format!("compare-{}", result.mode),
            )
            .await
    }
}

/// Provider failures carry the provider's own text; the classifier shows it
/// to the user verbatim.
fn failure_message(error: Error) -> String {
    match error {
        Error::AiProvider(message) => message,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{App, AppServices};
    use crate::ai::mock::MOCK_PNG_DATA_URI;
    use crate::ai::{MockRefineClient, MockVariantClient};
    use crate::diagnostics;
    use crate::image::ImageProcessor;
    use crate::models::GenerationMode;
    use crate::state::{Action, AppStep};
    use crate::Error;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn build_test_app(dir: &TempDir, refiner: MockRefineClient, generator: MockVariantClient) -> App {
        App::with_services(AppServices {
            refiner: Arc::new(refiner),
            generator: Arc::new(generator),
            image: Box::new(ImageProcessor::new(dir.path()).unwrap()),
            stagger: Duration::from_millis(750),
        })
    }

    fn describe(app: &mut App) {
        app.dispatch(Action::Upload(MOCK_PNG_DATA_URI.to_string()));
        app.dispatch(Action::SetPrompt("add falling snow".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_populates_results_and_history() {
        let dir = tempdir().unwrap();
        let mut app = build_test_app(&dir, MockRefineClient::new(), MockVariantClient::new());
        describe(&mut app);

        app.dispatch(Action::Generate);
        assert!(app.state().is_generating);
        app.wait_for_generation().await;

        let state = app.state();
        assert_eq!(state.step, AppStep::Generate);
        assert_eq!(state.results.len(), 4);
        assert_eq!(state.history.len(), 4);
        assert_eq!(state.error, None);
        assert!(state
            .results
            .iter()
            .all(|r| r.prompt_used == "Refined: add falling snow"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_failure_surfaces_classified_error() {
        let dir = tempdir().unwrap();
        let mut generator = MockVariantClient::new();
        for mode in GenerationMode::ALL {
            generator = generator.with_failure(mode, "Quota exceeded: RPD".to_string());
        }
        let mut app = build_test_app(&dir, MockRefineClient::new(), generator);
        describe(&mut app);

        app.dispatch(Action::Generate);
        app.wait_for_generation().await;

        assert_eq!(
            app.state().error.as_deref(),
            Some(diagnostics::DAILY_QUOTA_MESSAGE)
        );
        assert!(app.state().results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generic_failure_shows_provider_text_only() {
        let dir = tempdir().unwrap();
        let mut generator = MockVariantClient::new();
        for mode in GenerationMode::ALL {
            generator = generator.with_failure(mode, "network unreachable".to_string());
        }
        let mut app = build_test_app(&dir, MockRefineClient::new(), generator);
        describe(&mut app);

        app.dispatch(Action::Generate);
        app.wait_for_generation().await;

        assert_eq!(
            app.state().error.as_deref(),
            Some("【生成异常】network unreachable。建议稍后重试或简化指令。")
        );
    }

    #[tokio::test]
    async fn test_generate_rejects_blank_prompt() {
        let dir = tempdir().unwrap();
        let generator = MockVariantClient::new();
        let probe = generator.clone();
        let mut app = build_test_app(&dir, MockRefineClient::new(), generator);
        app.dispatch(Action::Upload(MOCK_PNG_DATA_URI.to_string()));
        app.dispatch(Action::SetPrompt("   ".to_string()));

        let err = app.generate().unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains("Prompt is empty"));
        assert!(!app.state().is_generating);
        assert_eq!(app.state().step, AppStep::Describe);
        assert_eq!(probe.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_without_upload_is_rejected() {
        let dir = tempdir().unwrap();
        let mut app = build_test_app(&dir, MockRefineClient::new(), MockVariantClient::new());
        app.dispatch(Action::SetPrompt("add snow".to_string()));

        let err = app.generate().unwrap_err();
        assert!(err.to_string().contains("No image uploaded"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_while_running_reports_running_run() {
        let dir = tempdir().unwrap();
        let generator = MockVariantClient::new()
            .with_latency(GenerationMode::LocalEdit, Duration::from_secs(5));
        let mut app = build_test_app(&dir, MockRefineClient::new(), generator);
        describe(&mut app);

        app.generate().unwrap();
        app.dispatch(Action::BackToDescribe);
        let err = app.generate().unwrap_err();

        assert!(err.to_string().contains("still running"), "{}", err);
        app.wait_for_generation().await;
        assert_eq!(app.state().results.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_during_run_discards_late_results() {
        let dir = tempdir().unwrap();
        let generator = MockVariantClient::new()
            .with_latency(GenerationMode::LocalEdit, Duration::from_secs(5));
        let probe = generator.clone();
        let mut app = build_test_app(&dir, MockRefineClient::new(), generator);
        describe(&mut app);

        app.dispatch(Action::Generate);
        tokio::time::sleep(Duration::from_millis(100)).await;
        app.dispatch(Action::Reset);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(app.state().step, AppStep::Upload);
        assert!(app.state().results.is_empty());
        assert!(app.state().history.is_empty());
        // Only LOCAL_EDIT had been dispatched before the reset aborted the run.
        assert_eq!(probe.get_call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_all_names_files_by_position() {
        let dir = tempdir().unwrap();
        let mut app = build_test_app(&dir, MockRefineClient::new(), MockVariantClient::new());
        describe(&mut app);
        app.dispatch(Action::Generate);
        app.wait_for_generation().await;

        let paths = app.download_all().await.unwrap();

        assert_eq!(paths.len(), 4);
        for (i, path) in paths.iter().enumerate() {
            let name = path.file_name().unwrap().to_str().unwrap();
            assert!(name.starts_with(&format!("variant-{}_", i + 1)), "{}", name);
            assert!(name.ends_with(".jpg"));
            assert!(path.exists());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_and_compare_single_result() {
        let dir = tempdir().unwrap();
        let mut app = build_test_app(&dir, MockRefineClient::new(), MockVariantClient::new());
        describe(&mut app);
        app.dispatch(Action::Generate);
        app.wait_for_generation().await;

        let mode = app.state().results[0].mode;
        let path = app.download(1).await.unwrap();
        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with(&format!("variant-{}_", mode)), "{}", name);

        let compare = app.compare(1, 50.0).await.unwrap();
        assert!(compare.exists());

        assert!(app.download(5).await.is_err());
        assert!(app.download(0).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_by_position() {
        let dir = tempdir().unwrap();
        let mut app = build_test_app(&dir, MockRefineClient::new(), MockVariantClient::new());
        describe(&mut app);
        app.dispatch(Action::Generate);
        app.wait_for_generation().await;

        app.select(2).unwrap();
        assert_eq!(app.state().selected, Some(app.state().results[1].id));
        assert!(app.select(9).is_err());
    }

    #[tokio::test]
    async fn test_upload_file_moves_to_describe() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
        let mut app = build_test_app(&dir, MockRefineClient::new(), MockVariantClient::new());

        app.upload_file(&path).await.unwrap();

        assert_eq!(app.state().step, AppStep::Describe);
        assert_eq!(
            app.state().original_image.as_deref(),
            Some("data:image/jpeg;base64,/9j/4A==")
        );
    }
}

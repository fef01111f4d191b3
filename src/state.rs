//! Wizard state and the reducer that drives it.
//!
//! All mutations go through [`reduce`]. Side effects the reducer wants (start
//! or cancel a generation run) are returned as [`Effect`]s for the shell
//! runtime to execute.

use crate::diagnostics;
use crate::models::{ModificationResult, ModificationTask};
use crate::orchestrator::GenerationOutcome;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AppStep {
    Upload = 1,
    Describe = 2,
    Generate = 3,
}

impl AppStep {
    pub fn label(&self) -> &'static str {
        match self {
            AppStep::Upload => "上传 / Upload",
            AppStep::Describe => "描述 / Describe",
            AppStep::Generate => "生成 / Result",
        }
    }
}

/// Identifies one Generate/Redo invocation. Completions carrying any other id
/// than the active one are stale and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub step: AppStep,
    pub original_image: Option<String>,
    pub current_task: ModificationTask,
    pub results: Vec<ModificationResult>,
    pub is_generating: bool,
    pub error: Option<String>,
    /// Set when a run succeeded but some variants were dropped.
    pub notice: Option<String>,
    /// Newest first.
    pub history: Vec<ModificationResult>,
    pub selected: Option<Uuid>,
    pub active_run: Option<RunId>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            step: AppStep::Upload,
            original_image: None,
            current_task: ModificationTask::default(),
            results: Vec::new(),
            is_generating: false,
            error: None,
            notice: None,
            history: Vec::new(),
            selected: None,
            active_run: None,
        }
    }
}

impl AppState {
    pub fn can_generate(&self) -> bool {
        self.original_image.is_some()
            && !self.current_task.prompt.trim().is_empty()
            && !self.is_generating
    }

    pub fn selected_result(&self) -> Option<&ModificationResult> {
        let id = self.selected?;
        self.results.iter().find(|r| r.id == id)
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    /// A new image (as a data URI) was uploaded.
    Upload(String),
    /// Go back from Describe to pick a different image.
    ChangeImage,
    SetPrompt(String),
    SetPerspective(Option<String>),
    SetScene(Option<String>),
    SetIntensity(u32),
    Generate,
    Redo,
    GenerationSucceeded {
        run: RunId,
        outcome: GenerationOutcome,
    },
    GenerationFailed {
        run: RunId,
        message: String,
    },
    BackToDescribe,
    Select(Uuid),
    ClearSelection,
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartGeneration { run: RunId, task: ModificationTask },
    CancelGeneration { run: RunId },
}

pub fn reduce(state: &mut AppState, action: Action) -> Vec<Effect> {
    match action {
        Action::Upload(image) => {
            let effects = cancel_active(state);
            state.original_image = Some(image.clone());
            state.current_task.original_image = image;
            state.results.clear();
            state.selected = None;
            state.error = None;
            state.notice = None;
            state.step = AppStep::Describe;
            effects
        }
        Action::ChangeImage => {
            if state.step == AppStep::Describe {
                state.step = AppStep::Upload;
            }
            Vec::new()
        }
        Action::SetPrompt(prompt) => {
            state.current_task.prompt = prompt;
            Vec::new()
        }
        Action::SetPerspective(perspective) => {
            state.current_task.perspective_angle = perspective;
            Vec::new()
        }
        Action::SetScene(scene) => {
            state.current_task.scene_type = scene;
            Vec::new()
        }
        Action::SetIntensity(intensity) => {
            state.current_task.set_intensity(intensity);
            Vec::new()
        }
        Action::Generate => start_generation(state),
        Action::Redo => {
            if state.step != AppStep::Generate {
                debug!("Ignoring redo outside the result step");
                return Vec::new();
            }
            start_generation(state)
        }
        Action::GenerationSucceeded { run, outcome } => {
            if state.active_run != Some(run) {
                debug!("Dropping stale generation result for run {}", run);
                return Vec::new();
            }
            let mut history = outcome.results.clone();
            history.append(&mut state.history);
            state.history = history;
            state.notice = outcome.partial_failure_notice();
            state.results = outcome.results;
            state.is_generating = false;
            state.active_run = None;
            Vec::new()
        }
        Action::GenerationFailed { run, message } => {
            if state.active_run != Some(run) {
                debug!("Dropping stale generation failure for run {}", run);
                return Vec::new();
            }
            state.error = Some(diagnostics::classify(&message).message);
            state.is_generating = false;
            state.active_run = None;
            Vec::new()
        }
        Action::BackToDescribe => {
            state.selected = None;
            if state.step == AppStep::Generate {
                state.step = AppStep::Describe;
            }
            Vec::new()
        }
        Action::Select(id) => {
            if state.results.iter().any(|r| r.id == id) {
                state.selected = Some(id);
            }
            Vec::new()
        }
        Action::ClearSelection => {
            state.selected = None;
            Vec::new()
        }
        Action::Reset => {
            let effects = cancel_active(state);
            let history = std::mem::take(&mut state.history);
            *state = AppState {
                history,
                ..AppState::default()
            };
            effects
        }
    }
}

fn start_generation(state: &mut AppState) -> Vec<Effect> {
    if !state.can_generate() {
        debug!(
            "Generate ignored (image: {}, prompt: {}, generating: {})",
            state.original_image.is_some(),
            !state.current_task.prompt.trim().is_empty(),
            state.is_generating
        );
        return Vec::new();
    }

    let run = RunId::new();
    state.step = AppStep::Generate;
    state.is_generating = true;
    state.error = None;
    state.notice = None;
    state.results.clear();
    state.selected = None;
    state.active_run = Some(run);

    vec![Effect::StartGeneration {
        run,
        task: state.current_task.clone(),
    }]
}

fn cancel_active(state: &mut AppState) -> Vec<Effect> {
    state.is_generating = false;
    match state.active_run.take() {
        Some(run) => vec![Effect::CancelGeneration { run }],
        None => Vec::new(),
    }
}

use crate::models::{GenerationMode, ModificationTask};
use crate::presets;

pub const REFINE_SYSTEM: &str = include_str!("../data/prompts/refine_system.txt");
pub const REFINE_USER: &str = include_str!("../data/prompts/refine_user.txt");
pub const VARIANT_BASE: &str = include_str!("../data/prompts/variant_base.txt");
pub const MODE_LOCAL_EDIT: &str = include_str!("../data/prompts/mode_local_edit.txt");
pub const MODE_PERSPECTIVE: &str = include_str!("../data/prompts/mode_perspective.txt");
pub const MODE_SCENE_SWAP: &str = include_str!("../data/prompts/mode_scene_swap.txt");
pub const MODE_COMPREHENSIVE: &str = include_str!("../data/prompts/mode_comprehensive.txt");

const FALLBACK_PERSPECTIVE: &str = "from a noticeably different camera angle";
const FALLBACK_SCENE: &str = "in a new environment that suits the subject";

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

fn mode_template(mode: GenerationMode) -> &'static str {
    match mode {
        GenerationMode::LocalEdit => MODE_LOCAL_EDIT,
        GenerationMode::Perspective => MODE_PERSPECTIVE,
        GenerationMode::SceneSwap => MODE_SCENE_SWAP,
        GenerationMode::Comprehensive => MODE_COMPREHENSIVE,
    }
}

/// Builds the full image prompt for one variant of a (refined) task.
///
/// Perspective and scene choices left at their defaults fall back to a
/// generic directive so the perspective/scene modes still differ from a
/// local edit.
pub fn variant_prompt(task: &ModificationTask, mode: GenerationMode) -> String {
    let perspective = task
        .perspective_angle
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or(FALLBACK_PERSPECTIVE);
    let scene = task
        .scene_type
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(FALLBACK_SCENE);

    let directive = render(
        mode_template(mode),
        &[("perspective", perspective), ("scene", scene)],
    );
    let intensity_value = task.intensity.to_string();

    render(
        VARIANT_BASE,
        &[
            ("prompt", task.prompt.trim()),
            ("directive", directive.trim()),
            ("intensity", presets::intensity_label(task.intensity)),
            ("intensity_value", &intensity_value),
        ],
    )
}

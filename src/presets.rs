//! Fixed option lists offered while describing a modification.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextOption {
    pub label: &'static str,
    pub value: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntensityLevel {
    pub label: &'static str,
    pub value: u8,
}

pub const PERSPECTIVE_OPTIONS: &[TextOption] = &[
    TextOption { label: "Default", value: "" },
    TextOption { label: "Top Down (30°)", value: "from a high angle top down 30 degree view" },
    TextOption { label: "Side View (45°)", value: "from a 45 degree side perspective" },
    TextOption { label: "Cinematic Low", value: "from a dramatic low angle" },
    TextOption { label: "Bird's Eye", value: "from a vertical bird's eye view" },
];

pub const SCENE_OPTIONS: &[TextOption] = &[
    TextOption { label: "Original", value: "" },
    TextOption { label: "Cyberpunk City", value: "in a neon cyberpunk cityscape at night" },
    TextOption { label: "Tropical Beach", value: "on a sunny tropical beach with white sand" },
    TextOption { label: "Mist Forest", value: "in a mysterious misty pine forest" },
    TextOption { label: "Modern Studio", value: "in a clean minimalist modern studio background" },
    TextOption { label: "Snowy Mountain", value: "amidst majestic snowy mountain peaks" },
];

pub const INTENSITY_LEVELS: &[IntensityLevel] = &[
    IntensityLevel { label: "Subtle", value: 25 },
    IntensityLevel { label: "Medium", value: 50 },
    IntensityLevel { label: "Strong", value: 75 },
    IntensityLevel { label: "Extreme", value: 100 },
];

/// Looks up an option by 1-based index or case-insensitive label prefix.
///
/// Returns `None` for the empty-valued defaults so callers can store the
/// absence of a choice directly.
pub fn resolve_option(options: &[TextOption], query: &str) -> Option<Option<String>> {
    let query = query.trim();
    let found = if let Ok(index) = query.parse::<usize>() {
        index.checked_sub(1).and_then(|i| options.get(i))
    } else {
        let lowered = query.to_lowercase();
        options
            .iter()
            .find(|o| o.label.to_lowercase() == lowered)
            .or_else(|| {
                options
                    .iter()
                    .find(|o| o.label.to_lowercase().starts_with(&lowered))
            })
    }?;

    Some((!found.value.is_empty()).then(|| found.value.to_string()))
}

/// Accepts either a number or one of the intensity labels.
pub fn resolve_intensity(query: &str) -> Option<u32> {
    let query = query.trim();
    if let Ok(value) = query.parse::<u32>() {
        return Some(value);
    }
    INTENSITY_LEVELS
        .iter()
        .find(|level| level.label.eq_ignore_ascii_case(query))
        .map(|level| level.value as u32)
}

/// The named level an intensity falls into (rounded up to the next level).
pub fn intensity_label(intensity: u8) -> &'static str {
    INTENSITY_LEVELS
        .iter()
        .find(|level| intensity <= level.value)
        .map(|level| level.label)
        .unwrap_or("Extreme")
}

pub fn label_for_value(options: &[TextOption], value: Option<&str>) -> &'static str {
    let value = value.unwrap_or("");
    options
        .iter()
        .find(|o| o.value == value)
        .map(|o| o.label)
        .unwrap_or("Custom")
}

//! Data models and structures
//!
//! Defines the generation modes, the modification task the user builds up in
//! the wizard, the immutable result records produced per variant, and the
//! environment configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// One of the four fixed transformation strategies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationMode {
    LocalEdit,
    Perspective,
    SceneSwap,
    Comprehensive,
}

impl GenerationMode {
    /// Dispatch order used by the orchestrator.
    pub const ALL: [GenerationMode; 4] = [
        GenerationMode::LocalEdit,
        GenerationMode::Perspective,
        GenerationMode::SceneSwap,
        GenerationMode::Comprehensive,
    ];

    pub fn as_tag(&self) -> &'static str {
        match self {
            GenerationMode::LocalEdit => "LOCAL_EDIT",
            GenerationMode::Perspective => "PERSPECTIVE",
            GenerationMode::SceneSwap => "SCENE_SWAP",
            GenerationMode::Comprehensive => "COMPREHENSIVE",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GenerationMode::LocalEdit => "Precise Edit",
            GenerationMode::Perspective => "Perspective Shift",
            GenerationMode::SceneSwap => "Scene Swap",
            GenerationMode::Comprehensive => "Full Re-imagining",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            GenerationMode::LocalEdit => "Pixel-perfect local modifications",
            GenerationMode::Perspective => "Modified with camera angle adjustment",
            GenerationMode::SceneSwap => "Modified within a new environment",
            GenerationMode::Comprehensive => "Complete scene and angle overhaul",
        }
    }

    /// 1-based path number shown next to each variant.
    pub fn path_number(&self) -> usize {
        Self::ALL.iter().position(|m| m == self).unwrap_or(0) + 1
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

pub const DEFAULT_INTENSITY: u8 = 50;
pub const MAX_INTENSITY: u8 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModificationTask {
    /// Data URI of the uploaded image; empty until an upload happens.
    pub original_image: String,
    pub prompt: String,
    pub perspective_angle: Option<String>,
    pub scene_type: Option<String>,
    pub intensity: u8,
}

impl Default for ModificationTask {
    fn default() -> Self {
        Self {
            original_image: String::new(),
            prompt: String::new(),
            perspective_angle: None,
            scene_type: None,
            intensity: DEFAULT_INTENSITY,
        }
    }
}

impl ModificationTask {
    pub fn set_intensity(&mut self, intensity: u32) {
        self.intensity = intensity.min(MAX_INTENSITY as u32) as u8;
    }

    /// Copy of this task with the prompt swapped for a refined instruction.
    pub fn with_prompt(&self, prompt: String) -> Self {
        Self {
            prompt,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModificationResult {
    pub id: Uuid,
    pub url: String,
    pub mode: GenerationMode,
    pub prompt_used: String,
    pub timestamp: DateTime<Utc>,
}

impl ModificationResult {
    pub fn new(url: String, mode: GenerationMode, prompt_used: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            url,
            mode,
            prompt_used,
            timestamp: Utc::now(),
        }
    }
}

// Configuration
pub const DEFAULT_REFINE_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_STAGGER_MS: u64 = 750;
pub const DEFAULT_ASPECT_RATIO: &str = "16:9";

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub refine_model: String,
    pub image_model: String,
    pub stagger: Duration,
    pub output_dir: PathBuf,
    pub aspect_ratio: String,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let gemini_api_key = lookup("GEMINI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| crate::Error::Config("GEMINI_API_KEY not set".to_string()))?;

        let stagger_ms = match lookup("STAGGER_MS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                crate::Error::Config(format!(
                    "STAGGER_MS must be a whole number of milliseconds, got '{}'",
                    raw
                ))
            })?,
            None => DEFAULT_STAGGER_MS,
        };

        Ok(Self {
            gemini_api_key,
            refine_model: lookup("REFINE_MODEL").unwrap_or_else(|| DEFAULT_REFINE_MODEL.to_string()),
            image_model: lookup("IMAGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            stagger: Duration::from_millis(stagger_ms),
            output_dir: lookup("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output")),
            aspect_ratio: lookup("ASPECT_RATIO")
                .unwrap_or_else(|| DEFAULT_ASPECT_RATIO.to_string()),
        })
    }
}

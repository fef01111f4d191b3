//! Vision Artisan - turns one uploaded photo and a plain-language request
//! into four AI-generated variants.
//!
//! The request is first refined into precise edit instructions, then four
//! image generations (local edit, perspective, scene swap, comprehensive)
//! are dispatched with a fixed stagger and collected as they settle.

pub mod ai;
pub mod app;
pub mod data_uri;
pub mod diagnostics;
pub mod error;
pub mod image;
pub mod models;
pub mod orchestrator;
pub mod presets;
pub mod prompts;
pub mod shell;
pub mod state;

pub use error::{Error, Result};

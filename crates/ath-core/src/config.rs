//! Configuration parsing for the all-time-high recipe.
//!
//! The runner reads a single JSON file. Only `debounce_ms` is required; every
//! other field falls back to the defaults of the original deployment.
//!
//! # Example config
//!
//! ```json
//! {
//!   "recipe": { "module_name": "all_time_high", "log_path": "/tmp/log" },
//!   "debounce_ms": 1000,
//!   "highs_path": "data/highs.json",
//!   "asset_name": "Bitcoin",
//!   "caption_utc_offset_minutes": -300,
//!   "media": {
//!     "image": "./images/bitcoin-clouds-1012x506.png",
//!     "width": 1012, "height": 506,
//!     "font": "images/Roboto-Bold.ttf",
//!     "texts": [{ "size": 120, "color": "#ffffff", "x": 400, "y": 190 }]
//!   }
//! }
//! ```

use std::time::Duration;

use chrono::FixedOffset;
use serde::Deserialize;

use crate::error::{AthError, Result};

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Module metadata (name, log path).
    pub recipe: Option<ModuleMeta>,

    /// Quiet period before a burst of new highs is persisted and announced.
    pub debounce_ms: u64,

    /// JSON file backing the highs collection. `None` keeps highs in memory.
    pub highs_path: Option<String>,

    /// Asset named in the caption (`1 <asset> = $... USD`).
    #[serde(default = "default_asset_name")]
    pub asset_name: String,

    /// Offset applied to the trade time shown in the caption.
    #[serde(default)]
    pub caption_utc_offset_minutes: i32,

    /// Image template sent to the renderer.
    #[serde(default)]
    pub media: MediaTemplate,
}

/// Module metadata block.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
}

fn default_asset_name() -> String {
    "Bitcoin".to_string()
}

impl AppConfig {
    /// Config with the given debounce and every other field defaulted.
    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            recipe: None,
            debounce_ms: debounce.as_millis() as u64,
            highs_path: None,
            asset_name: default_asset_name(),
            caption_utc_offset_minutes: 0,
            media: MediaTemplate::default(),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Returns the module name, defaulting to `"all_time_high"`.
    pub fn module_name(&self) -> String {
        self.recipe
            .as_ref()
            .and_then(|m| m.module_name.clone())
            .unwrap_or_else(|| "all_time_high".to_string())
    }

    /// Returns the log path.
    pub fn log_path(&self) -> Option<String> {
        self.recipe.as_ref().and_then(|m| m.log_path.clone())
    }

    /// Offset used to render caption timestamps.
    pub fn caption_offset(&self) -> Result<FixedOffset> {
        self.caption_utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                AthError::Config(format!(
                    "caption_utc_offset_minutes out of range: {}",
                    self.caption_utc_offset_minutes
                ))
            })
    }

    /// Reject configs the recipe cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.caption_offset()?;
        let m = &self.media;
        if m.width == 0 || m.height == 0 {
            return Err(AthError::Config(format!(
                "media size must be non-zero, got {}x{}",
                m.width, m.height
            )));
        }
        if m.texts.is_empty() {
            return Err(AthError::Config("media.texts must contain at least one overlay".into()));
        }
        if let Some(t) = m.texts.iter().find(|t| t.size == 0) {
            return Err(AthError::Config(format!(
                "media text at ({}, {}) has zero font size",
                t.x, t.y
            )));
        }
        Ok(())
    }
}

/// Image composition template. Every overlay is drawn with the formatted
/// price as its text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaTemplate {
    pub image: String,
    pub width: u32,
    pub height: u32,
    pub font: String,
    pub texts: Vec<TextStyle>,
}

/// Placement and style of one overlay.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextStyle {
    pub size: u32,
    pub color: String,
    pub x: i32,
    pub y: i32,
}

impl Default for MediaTemplate {
    fn default() -> Self {
        const LIGHT: &str = "#50b8ef";
        const DARK: &str = "#2d97e5";
        let small = |color: &str, x, y| TextStyle { size: 40, color: color.to_string(), x, y };

        Self {
            image: "./images/bitcoin-clouds-1012x506.png".to_string(),
            width: 1012,
            height: 506,
            font: "images/Roboto-Bold.ttf".to_string(),
            texts: vec![
                small(LIGHT, 240, 50),
                small(LIGHT, 640, 290),
                small(LIGHT, 560, 130),
                small(DARK, 40, 40),
                small(DARK, 400, 70),
                small(DARK, 800, 130),
                small(DARK, 300, 230),
                TextStyle { size: 120, color: "#ffffff".to_string(), x: 400, y: 190 },
            ],
        }
    }
}

/// Load, parse and validate a JSON config file.
pub fn load_config(path: &std::path::Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate config JSON.
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
}

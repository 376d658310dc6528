// src/config.rs

//! Defines the construction-time configuration of a `Display`.
//!
//! The structs deserialize from JSON; every field has a default so a config
//! file only needs to mention what it changes. The presentation surface is
//! not part of this file: it is the driver value handed to `Display::new`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::framebuffer::DrawPath;

/// Complete configuration of the display core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)] // Apply default values for the entire struct if a field is missing.
pub struct DisplayConfig {
    /// Use the primitive fallbacks instead of in-place accelerated paths.
    pub prefer_software_path: bool,
    /// Whether the viewport starts out enabled.
    pub viewport_enabled: bool,
    /// Whether cursors may be handed to the surface as data URIs.
    pub cursor_uri_support: CursorUriSupport,
    /// Scale factor applied to the presented size. Must be positive.
    pub initial_scale: f64,
    /// Framebuffer width before the server announces its size.
    pub initial_width: u32,
    /// Framebuffer height before the server announces its size.
    pub initial_height: u32,
    /// Placeholder image drawn by `clear`.
    pub logo: Option<LogoConfig>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            prefer_software_path: false,
            viewport_enabled: false,
            cursor_uri_support: CursorUriSupport::default(),
            initial_scale: 1.0,
            initial_width: 640,
            initial_height: 480,
            logo: None,
        }
    }
}

impl DisplayConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse display configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn draw_path(&self) -> DrawPath {
        if self.prefer_software_path {
            DrawPath::Software
        } else {
            DrawPath::Native
        }
    }
}

/// `true`, `false` or `"auto"` in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CursorUriSupport {
    Forced(bool),
    Detect(AutoDetect),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoDetect {
    Auto,
}

impl Default for CursorUriSupport {
    fn default() -> Self {
        CursorUriSupport::Detect(AutoDetect::Auto)
    }
}

impl CursorUriSupport {
    /// Resolves the setting against what the surface reported.
    pub fn resolve(self, surface_supports: bool) -> bool {
        match self {
            CursorUriSupport::Forced(enabled) => enabled,
            CursorUriSupport::Detect(AutoDetect::Auto) => surface_supports,
        }
    }
}

/// Where to find the placeholder image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoConfig {
    pub path: PathBuf,
    #[serde(default = "default_logo_mime_type")]
    pub mime_type: String,
}

fn default_logo_mime_type() -> String {
    crate::image::MIME_PNG.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn empty_object_yields_defaults() {
        let config = DisplayConfig::from_json_str("{}").unwrap();
        assert_eq!(config, DisplayConfig::default());
        assert_eq!(config.draw_path(), DrawPath::Native);
    }

    #[test]
    fn cursor_uri_support_accepts_bool_or_auto() {
        let forced = DisplayConfig::from_json_str(r#"{"cursor_uri_support": false}"#).unwrap();
        assert_eq!(forced.cursor_uri_support, CursorUriSupport::Forced(false));
        assert!(!forced.cursor_uri_support.resolve(true));

        let auto = DisplayConfig::from_json_str(r#"{"cursor_uri_support": "auto"}"#).unwrap();
        assert!(auto.cursor_uri_support.resolve(true));
        assert!(!auto.cursor_uri_support.resolve(false));

        assert!(DisplayConfig::from_json_str(r#"{"cursor_uri_support": "sometimes"}"#).is_err());
    }

    #[test]
    fn partial_config_overrides_only_named_fields() {
        let config = DisplayConfig::from_json_str(
            r#"{"prefer_software_path": true, "initial_scale": 2.5,
                "logo": {"path": "/usr/share/logo.png"}}"#,
        )
        .unwrap();
        assert_eq!(config.draw_path(), DrawPath::Software);
        assert_eq!(config.initial_scale, 2.5);
        assert!(!config.viewport_enabled);
        let logo = config.logo.unwrap();
        assert_eq!(logo.path, PathBuf::from("/usr/share/logo.png"));
        assert_eq!(logo.mime_type, "image/png");
    }
}

//! Widget configuration
//!
//! One explicit `WidgetConfig` is built by the host and handed to every
//! component at construction. Every field has a default, so a partial JSON
//! file (or none at all) still yields a complete configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::{paths, validation::*};

/// Horizontal side the trigger anchors to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    #[default]
    Right,
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub position: PositionConfig,
    pub focus: FocusConfig,
    pub device: DeviceConfig,
}

/// Trigger geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    /// Side of the default anchor
    pub side: Side,
    /// Inset kept between the trigger and every viewport edge
    pub margin_from_edge: f64,
    /// Distance of the default anchor from the bottom edge
    pub bottom_margin: f64,
    /// Edge distance below which a drag-end snaps to the edge (0 = disabled)
    pub snap_threshold: f64,
    /// Pointer travel up to which a press/release counts as a click
    pub click_tolerance: f64,
}

fn default_margin_from_edge() -> f64 {
    16.0
}

fn default_bottom_margin() -> f64 {
    24.0
}

fn default_snap_threshold() -> f64 {
    24.0
}

fn default_click_tolerance() -> f64 {
    4.0
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            side: Side::default(),
            margin_from_edge: default_margin_from_edge(),
            bottom_margin: default_bottom_margin(),
            snap_threshold: default_snap_threshold(),
            click_tolerance: default_click_tolerance(),
        }
    }
}

/// Focus containment timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Delay before the initial focus move (0 = immediate). Lets an opening
    /// transition finish before focus lands.
    pub initial_focus_delay_ms: u64,
}

/// Device classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Viewports narrower than this are treated as mobile
    pub mobile_breakpoint: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            mobile_breakpoint: 768,
        }
    }
}

impl PositionConfig {
    /// Clamp margins and thresholds. Also applied to admin trigger offsets
    /// merged over a loaded config.
    pub fn validate_and_clamp(&mut self) {
        self.margin_from_edge =
            clamp_non_negative("margin_from_edge", self.margin_from_edge, MAX_MARGIN, default_margin_from_edge());
        self.bottom_margin = clamp_non_negative("bottom_margin", self.bottom_margin, MAX_MARGIN, default_bottom_margin());
        self.snap_threshold =
            clamp_non_negative("snap_threshold", self.snap_threshold, MAX_SNAP_THRESHOLD, default_snap_threshold());
        self.click_tolerance =
            clamp_non_negative("click_tolerance", self.click_tolerance, MAX_CLICK_TOLERANCE, default_click_tolerance());
    }
}

impl WidgetConfig {
    /// Default location: `<config_dir>/a11y-overlay/config.json`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(paths::APP_DIR);
        path.push(paths::CONFIG_FILENAME);
        path
    }

    /// Load from a JSON file. A missing file yields defaults; a file that
    /// exists but does not parse is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No config file found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let mut config: WidgetConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config JSON from {}", path.display()))?;

        config.validate_and_clamp();
        info!(path = %path.display(), "Loaded widget config");
        Ok(config)
    }

    /// Clamp values to safe ranges. Called after loading from disk.
    pub fn validate_and_clamp(&mut self) {
        self.position.validate_and_clamp();

        if self.focus.initial_focus_delay_ms > MAX_FOCUS_DELAY_MS {
            warn!(initial_focus_delay_ms = self.focus.initial_focus_delay_ms, max = MAX_FOCUS_DELAY_MS, "initial_focus_delay_ms exceeds maximum, clamping");
            self.focus.initial_focus_delay_ms = MAX_FOCUS_DELAY_MS;
        }

        let bp = self.device.mobile_breakpoint;
        if !(MIN_BREAKPOINT..=MAX_BREAKPOINT).contains(&bp) {
            let clamped = bp.clamp(MIN_BREAKPOINT, MAX_BREAKPOINT);
            warn!(mobile_breakpoint = bp, using = clamped, "mobile_breakpoint out of range, clamping");
            self.device.mobile_breakpoint = clamped;
        }
    }
}

fn clamp_non_negative(name: &str, value: f64, max: f64, fallback: f64) -> f64 {
    if !value.is_finite() || value < 0.0 {
        warn!(field = name, value, using = fallback, "invalid value, using default");
        fallback
    } else if value > max {
        warn!(field = name, value, max, "value exceeds maximum, clamping");
        max
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: WidgetConfig =
            serde_json::from_str(r#"{"position": {"side": "left", "snap_threshold": 10}}"#).unwrap();
        assert_eq!(config.position.side, Side::Left);
        assert_eq!(config.position.snap_threshold, 10.0);
        assert_eq!(config.position.margin_from_edge, 16.0);
        assert_eq!(config.device.mobile_breakpoint, 768);
        assert_eq!(config.focus, FocusConfig::default());
    }

    #[test]
    fn test_validate_and_clamp() {
        let mut config = WidgetConfig::default();
        config.position.margin_from_edge = -5.0;
        config.position.snap_threshold = 10_000.0;
        config.focus.initial_focus_delay_ms = 60_000;
        config.device.mobile_breakpoint = 10;
        config.validate_and_clamp();

        assert_eq!(config.position.margin_from_edge, 16.0);
        assert_eq!(config.position.snap_threshold, MAX_SNAP_THRESHOLD);
        assert_eq!(config.focus.initial_focus_delay_ms, MAX_FOCUS_DELAY_MS);
        assert_eq!(config.device.mobile_breakpoint, MIN_BREAKPOINT);
    }

    #[test]
    fn test_position_clamp_rejects_negative_and_huge_margins() {
        let mut position = PositionConfig {
            margin_from_edge: -200.0,
            bottom_margin: 5_000.0,
            ..PositionConfig::default()
        };
        position.validate_and_clamp();
        assert_eq!(position.margin_from_edge, default_margin_from_edge());
        assert_eq!(position.bottom_margin, MAX_MARGIN);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = WidgetConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, WidgetConfig::default());
    }

    #[test]
    fn test_load_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ position: ").unwrap();
        assert!(WidgetConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_load_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"focus": {"initial_focus_delay_ms": 150}}"#).unwrap();
        let config = WidgetConfig::load_from(&path).unwrap();
        assert_eq!(config.focus.initial_focus_delay_ms, 150);
    }
}

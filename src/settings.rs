//! End-user accessibility settings
//!
//! Settings are loaded fail-closed: a record that is missing, unparseable or
//! has any field of the wrong type or range is replaced by the full defaults.
//! Boolean fields absent from an otherwise valid record default to `false`,
//! which keeps records written by older versions readable.
//!
//! Every mutation persists the whole record and publishes it on the bus so
//! the style-application layer can react.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::bus::{ChangeBus, ChangeEvent};
use crate::constants::{font, keys};
use crate::error::UnknownNameError;
use crate::storage::PersistentConfigStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilitySettings {
    pub font_size_level: u8,
    #[serde(default)]
    pub high_contrast: bool,
    #[serde(default)]
    pub highlight_links: bool,
    #[serde(default)]
    pub pause_animations: bool,
    #[serde(default)]
    pub large_cursor: bool,
    #[serde(default)]
    pub reading_mask: bool,
    #[serde(default)]
    pub grayscale: bool,
    #[serde(default)]
    pub text_spacing: bool,
    #[serde(default)]
    pub dyslexia_font: bool,
}

impl AccessibilitySettings {
    /// Parse and validate a stored record. `None` means "use defaults".
    pub fn from_stored(raw: &str) -> Option<Self> {
        let settings: AccessibilitySettings = match serde_json::from_str(raw) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Stored settings rejected, using defaults");
                return None;
            }
        };
        if !(font::MIN_LEVEL..=font::MAX_LEVEL).contains(&settings.font_size_level) {
            warn!(font_size_level = settings.font_size_level, "Stored font size level out of range, using defaults");
            return None;
        }
        Some(settings)
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn get(&self, key: SettingKey) -> SettingValue {
        let mut copy = *self;
        match key {
            SettingKey::FontSizeLevel => SettingValue::Level(self.font_size_level),
            other => SettingValue::Bool(copy.flag(other).is_some_and(|b| *b)),
        }
    }

    fn flag(&mut self, key: SettingKey) -> Option<&mut bool> {
        match key {
            SettingKey::FontSizeLevel => None,
            SettingKey::HighContrast => Some(&mut self.high_contrast),
            SettingKey::HighlightLinks => Some(&mut self.highlight_links),
            SettingKey::PauseAnimations => Some(&mut self.pause_animations),
            SettingKey::LargeCursor => Some(&mut self.large_cursor),
            SettingKey::ReadingMask => Some(&mut self.reading_mask),
            SettingKey::Grayscale => Some(&mut self.grayscale),
            SettingKey::TextSpacing => Some(&mut self.text_spacing),
            SettingKey::DyslexiaFont => Some(&mut self.dyslexia_font),
        }
    }

    /// Overlay every field set in `patch`; the level is clamped
    pub fn merged(mut self, patch: &SettingsPatch) -> Self {
        if let Some(level) = patch.font_size_level {
            self.font_size_level = clamp_level(level);
        }
        for key in SettingKey::FLAGS {
            if let (Some(value), Some(slot)) = (patch.flag(key), self.flag(key)) {
                *slot = value;
            }
        }
        self
    }
}

fn clamp_level(level: u8) -> u8 {
    level.clamp(font::MIN_LEVEL, font::MAX_LEVEL)
}

/// Addressable settings field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    FontSizeLevel,
    HighContrast,
    HighlightLinks,
    PauseAnimations,
    LargeCursor,
    ReadingMask,
    Grayscale,
    TextSpacing,
    DyslexiaFont,
}

impl SettingKey {
    pub const FLAGS: [SettingKey; 8] = [
        SettingKey::HighContrast,
        SettingKey::HighlightLinks,
        SettingKey::PauseAnimations,
        SettingKey::LargeCursor,
        SettingKey::ReadingMask,
        SettingKey::Grayscale,
        SettingKey::TextSpacing,
        SettingKey::DyslexiaFont,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SettingKey::FontSizeLevel => "fontSizeLevel",
            SettingKey::HighContrast => "highContrast",
            SettingKey::HighlightLinks => "highlightLinks",
            SettingKey::PauseAnimations => "pauseAnimations",
            SettingKey::LargeCursor => "largeCursor",
            SettingKey::ReadingMask => "readingMask",
            SettingKey::Grayscale => "grayscale",
            SettingKey::TextSpacing => "textSpacing",
            SettingKey::DyslexiaFont => "dyslexiaFont",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SettingKey {
    type Err = UnknownNameError;

    /// Accepts the stored camelCase name or a kebab/snake spelling
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        std::iter::once(SettingKey::FontSizeLevel)
            .chain(SettingKey::FLAGS)
            .find(|k| k.name().to_ascii_lowercase() == normalized)
            .ok_or_else(|| UnknownNameError::new("setting", s))
    }
}

/// Value for [`SettingsReconciler::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingValue {
    Bool(bool),
    Level(u8),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{b}"),
            SettingValue::Level(l) => write!(f, "{l}"),
        }
    }
}

/// Partial settings overlay; unset fields are left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub font_size_level: Option<u8>,
    pub high_contrast: Option<bool>,
    pub highlight_links: Option<bool>,
    pub pause_animations: Option<bool>,
    pub large_cursor: Option<bool>,
    pub reading_mask: Option<bool>,
    pub grayscale: Option<bool>,
    pub text_spacing: Option<bool>,
    pub dyslexia_font: Option<bool>,
}

impl SettingsPatch {
    fn flag(&self, key: SettingKey) -> Option<bool> {
        match key {
            SettingKey::FontSizeLevel => None,
            SettingKey::HighContrast => self.high_contrast,
            SettingKey::HighlightLinks => self.highlight_links,
            SettingKey::PauseAnimations => self.pause_animations,
            SettingKey::LargeCursor => self.large_cursor,
            SettingKey::ReadingMask => self.reading_mask,
            SettingKey::Grayscale => self.grayscale,
            SettingKey::TextSpacing => self.text_spacing,
            SettingKey::DyslexiaFont => self.dyslexia_font,
        }
    }
}

/// One-click presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessibilityProfile {
    VisionImpaired,
    SeizureSafe,
    AdhdFriendly,
    Dyslexia,
    CognitiveDisability,
}

impl AccessibilityProfile {
    pub const ALL: [AccessibilityProfile; 5] = [
        AccessibilityProfile::VisionImpaired,
        AccessibilityProfile::SeizureSafe,
        AccessibilityProfile::AdhdFriendly,
        AccessibilityProfile::Dyslexia,
        AccessibilityProfile::CognitiveDisability,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AccessibilityProfile::VisionImpaired => "vision-impaired",
            AccessibilityProfile::SeizureSafe => "seizure-safe",
            AccessibilityProfile::AdhdFriendly => "adhd-friendly",
            AccessibilityProfile::Dyslexia => "dyslexia",
            AccessibilityProfile::CognitiveDisability => "cognitive-disability",
        }
    }

    pub fn patch(&self) -> SettingsPatch {
        match self {
            AccessibilityProfile::VisionImpaired => SettingsPatch {
                font_size_level: Some(2),
                high_contrast: Some(true),
                highlight_links: Some(true),
                large_cursor: Some(true),
                ..SettingsPatch::default()
            },
            AccessibilityProfile::SeizureSafe => SettingsPatch {
                pause_animations: Some(true),
                grayscale: Some(true),
                ..SettingsPatch::default()
            },
            AccessibilityProfile::AdhdFriendly => SettingsPatch {
                pause_animations: Some(true),
                reading_mask: Some(true),
                ..SettingsPatch::default()
            },
            AccessibilityProfile::Dyslexia => SettingsPatch {
                font_size_level: Some(1),
                dyslexia_font: Some(true),
                text_spacing: Some(true),
                ..SettingsPatch::default()
            },
            AccessibilityProfile::CognitiveDisability => SettingsPatch {
                highlight_links: Some(true),
                pause_animations: Some(true),
                text_spacing: Some(true),
                ..SettingsPatch::default()
            },
        }
    }
}

impl FromStr for AccessibilityProfile {
    type Err = UnknownNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        AccessibilityProfile::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| UnknownNameError::new("profile", s))
    }
}

/// Owns the in-memory settings and keeps storage and listeners in sync
#[derive(Debug)]
pub struct SettingsReconciler {
    store: PersistentConfigStore,
    bus: ChangeBus,
    current: AccessibilitySettings,
}

impl SettingsReconciler {
    pub fn new(store: PersistentConfigStore, bus: ChangeBus) -> Self {
        let mut reconciler = Self {
            store,
            bus,
            current: AccessibilitySettings::default(),
        };
        reconciler.load();
        reconciler
    }

    /// Re-read the durable record, falling back to defaults on any defect
    pub fn load(&mut self) -> AccessibilitySettings {
        self.current = self
            .store
            .get_raw(keys::SETTINGS)
            .and_then(|raw| AccessibilitySettings::from_stored(&raw))
            .unwrap_or_default();
        debug!(settings = ?self.current, "Loaded accessibility settings");
        self.current
    }

    pub fn current(&self) -> AccessibilitySettings {
        self.current
    }

    /// Set one field. A value of the wrong kind for `key` is rejected and
    /// returns `false`; levels are clamped.
    pub fn update(&mut self, key: SettingKey, value: SettingValue) -> bool {
        let mut next = self.current;
        match (key, value) {
            (SettingKey::FontSizeLevel, SettingValue::Level(level)) => next.font_size_level = clamp_level(level),
            (SettingKey::FontSizeLevel, SettingValue::Bool(_)) | (_, SettingValue::Level(_)) => {
                warn!(key = %key, value = %value, "Setting value has the wrong type, ignoring");
                return false;
            }
            (flag, SettingValue::Bool(b)) => {
                if let Some(slot) = next.flag(flag) {
                    *slot = b;
                }
            }
        }
        info!(key = %key, value = %next.get(key), "Setting updated");
        self.commit(next);
        true
    }

    /// Flip a boolean field; returns the new value
    pub fn toggle(&mut self, key: SettingKey) -> Option<bool> {
        let SettingValue::Bool(current) = self.current.get(key) else {
            warn!(key = %key, "Cannot toggle a non-boolean setting");
            return None;
        };
        self.update(key, SettingValue::Bool(!current));
        Some(!current)
    }

    pub fn reset(&mut self) {
        info!("Settings reset to defaults");
        self.commit(AccessibilitySettings::default());
    }

    /// Raise the font level by one; no-op at the ceiling
    pub fn increase_font_size(&mut self) -> u8 {
        self.step_font(1)
    }

    /// Lower the font level by one; no-op at the floor
    pub fn decrease_font_size(&mut self) -> u8 {
        self.step_font(-1)
    }

    fn step_font(&mut self, delta: i8) -> u8 {
        let level = self.current.font_size_level;
        let next = clamp_level(level.saturating_add_signed(delta));
        if next == level {
            debug!(level, "Font size already at bound");
            return level;
        }
        let mut settings = self.current;
        settings.font_size_level = next;
        info!(from = level, to = next, "Font size changed");
        self.commit(settings);
        next
    }

    /// Overlay a partial record
    pub fn apply_patch(&mut self, patch: &SettingsPatch) {
        self.commit(self.current.merged(patch));
    }

    pub fn apply_profile(&mut self, profile: AccessibilityProfile) {
        info!(profile = profile.name(), "Applying accessibility profile");
        self.apply_patch(&profile.patch());
    }

    fn commit(&mut self, next: AccessibilitySettings) {
        self.current = next;
        self.store.set_json(keys::SETTINGS, &next);
        self.bus.publish(ChangeEvent::SettingsChanged(next));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Topic;
    use crate::storage::testing::denied_durable;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn reconciler_with(raw: Option<&str>) -> (SettingsReconciler, PersistentConfigStore) {
        let store = PersistentConfigStore::in_memory();
        if let Some(raw) = raw {
            store.set_raw(keys::SETTINGS, raw);
        }
        (SettingsReconciler::new(store.clone(), ChangeBus::new()), store)
    }

    #[test]
    fn test_missing_record_is_default() {
        let (r, _) = reconciler_with(None);
        assert!(r.current().is_default());
    }

    #[test]
    fn test_malformed_records_load_exact_defaults() {
        let cases = [
            "not json",
            "[]",
            "null",
            r#"{"highContrast": true}"#,
            r#"{"fontSizeLevel": "2"}"#,
            r#"{"fontSizeLevel": 7, "highContrast": true}"#,
            r#"{"fontSizeLevel": -1}"#,
            r#"{"fontSizeLevel": 1.5}"#,
            r#"{"fontSizeLevel": 1, "grayscale": "yes"}"#,
            r#"{"fontSizeLevel": 1, "grayscale": null}"#,
        ];
        for raw in cases {
            let (r, _) = reconciler_with(Some(raw));
            assert_eq!(r.current(), AccessibilitySettings::default(), "payload {raw}");
        }
    }

    #[test]
    fn test_missing_booleans_default_false_others_kept() {
        let (r, _) = reconciler_with(Some(r#"{"fontSizeLevel": 2, "highContrast": true, "dyslexiaFont": true}"#));
        assert_eq!(
            r.current(),
            AccessibilitySettings {
                font_size_level: 2,
                high_contrast: true,
                dyslexia_font: true,
                ..AccessibilitySettings::default()
            }
        );
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let (r, _) = reconciler_with(Some(r#"{"fontSizeLevel": 1, "legacyZoom": 3}"#));
        assert_eq!(r.current().font_size_level, 1);
    }

    #[test]
    fn test_update_persists_and_publishes() {
        let store = PersistentConfigStore::in_memory();
        let bus = ChangeBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = bus.subscribe(Topic::Settings, move |event| {
            if let ChangeEvent::SettingsChanged(settings) = event {
                s.borrow_mut().push(*settings);
            }
        });

        let mut r = SettingsReconciler::new(store.clone(), bus);
        assert!(r.update(SettingKey::HighContrast, SettingValue::Bool(true)));

        let stored = store.get_json::<AccessibilitySettings>(keys::SETTINGS).unwrap();
        assert!(stored.high_contrast);
        assert_eq!(seen.borrow().as_slice(), &[stored]);
    }

    #[test]
    fn test_update_rejects_wrong_type() {
        let (mut r, store) = reconciler_with(None);
        assert!(!r.update(SettingKey::FontSizeLevel, SettingValue::Bool(true)));
        assert!(!r.update(SettingKey::Grayscale, SettingValue::Level(2)));
        assert_eq!(store.get_raw(keys::SETTINGS), None);
    }

    #[test]
    fn test_update_level_clamps() {
        let (mut r, _) = reconciler_with(None);
        r.update(SettingKey::FontSizeLevel, SettingValue::Level(42));
        assert_eq!(r.current().font_size_level, font::MAX_LEVEL);
    }

    #[test]
    fn test_toggle() {
        let (mut r, _) = reconciler_with(None);
        assert_eq!(r.toggle(SettingKey::ReadingMask), Some(true));
        assert_eq!(r.toggle(SettingKey::ReadingMask), Some(false));
        assert_eq!(r.toggle(SettingKey::FontSizeLevel), None);
    }

    #[test]
    fn test_font_bounds_are_noops() {
        let (mut r, store) = reconciler_with(None);
        assert_eq!(r.decrease_font_size(), font::MIN_LEVEL);
        assert_eq!(store.get_raw(keys::SETTINGS), None);

        for _ in 0..10 {
            r.increase_font_size();
        }
        assert_eq!(r.current().font_size_level, font::MAX_LEVEL);
    }

    #[test]
    fn test_reset_persists_defaults() {
        let (mut r, store) = reconciler_with(Some(r#"{"fontSizeLevel": 3, "grayscale": true}"#));
        r.reset();
        assert!(r.current().is_default());
        assert_eq!(
            store.get_json::<AccessibilitySettings>(keys::SETTINGS),
            Some(AccessibilitySettings::default())
        );
    }

    #[test]
    fn test_profile_overlays_only_set_fields() {
        let (mut r, _) = reconciler_with(Some(r#"{"fontSizeLevel": 3, "grayscale": true}"#));
        r.apply_profile(AccessibilityProfile::Dyslexia);
        let s = r.current();
        assert_eq!(s.font_size_level, 1);
        assert!(s.dyslexia_font && s.text_spacing && s.grayscale);
        assert!(!s.high_contrast);
    }

    #[test]
    fn test_denied_storage_keeps_memory_state() {
        let mut r = SettingsReconciler::new(denied_durable(), ChangeBus::new());
        r.update(SettingKey::LargeCursor, SettingValue::Bool(true));
        assert!(r.current().large_cursor);
        assert!(r.load().is_default());
    }

    #[test]
    fn test_key_and_profile_parsing() {
        assert_eq!("high-contrast".parse::<SettingKey>(), Ok(SettingKey::HighContrast));
        assert_eq!("fontSizeLevel".parse::<SettingKey>(), Ok(SettingKey::FontSizeLevel));
        assert_eq!("dyslexia_font".parse::<SettingKey>(), Ok(SettingKey::DyslexiaFont));
        assert_eq!("zoom".parse::<SettingKey>(), Err(UnknownNameError::new("setting", "zoom")));
        assert_eq!("Seizure_Safe".parse::<AccessibilityProfile>(), Ok(AccessibilityProfile::SeizureSafe));
    }

    proptest! {
        #[test]
        fn prop_increase_never_exceeds_max(start in font::MIN_LEVEL..=font::MAX_LEVEL, steps in 0usize..8) {
            let (mut r, _) = reconciler_with(None);
            r.update(SettingKey::FontSizeLevel, SettingValue::Level(start));
            for _ in 0..steps {
                let level = r.increase_font_size();
                prop_assert!(level <= font::MAX_LEVEL);
            }
            let level = r.increase_font_size();
            prop_assert!(level <= font::MAX_LEVEL);
            prop_assert!(level >= start);
        }

        #[test]
        fn prop_decrease_never_below_min(start in font::MIN_LEVEL..=font::MAX_LEVEL, steps in 0usize..8) {
            let (mut r, _) = reconciler_with(None);
            r.update(SettingKey::FontSizeLevel, SettingValue::Level(start));
            for _ in 0..steps {
                prop_assert!(r.decrease_font_size() >= font::MIN_LEVEL);
            }
            if steps >= usize::from(start) {
                prop_assert_eq!(r.current().font_size_level, font::MIN_LEVEL);
            }
        }

        #[test]
        fn prop_valid_level_roundtrips(level in font::MIN_LEVEL..=font::MAX_LEVEL, contrast: bool) {
            let raw = format!(r#"{{"fontSizeLevel": {level}, "highContrast": {contrast}}}"#);
            let (r, _) = reconciler_with(Some(&raw));
            prop_assert_eq!(r.current().font_size_level, level);
            prop_assert_eq!(r.current().high_contrast, contrast);
            prop_assert!(!r.current().grayscale);
        }
    }
}

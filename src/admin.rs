//! Site-owner configuration
//!
//! Admin configuration is written by a different actor than the end user and
//! changes rarely, so partial records are normal. It is therefore loaded per
//! section: each of `trigger`, `interface`, `statement` and `advanced` is
//! parsed on its own, fields missing inside a section take their defaults,
//! and a section that fails to parse falls back to its defaults without
//! affecting the others.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::bus::{ChangeBus, ChangeEvent, Subscription, Topic};
use crate::config::Side;
use crate::constants::keys;
use crate::error::UnknownNameError;
use crate::settings::SettingKey;
use crate::shortcut::Shortcut;
use crate::storage::PersistentConfigStore;
use crate::types::Size;

/// Accessibility control that the site owner may switch off
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureKey {
    FontSize,
    HighContrast,
    HighlightLinks,
    PauseAnimations,
    LargeCursor,
    ReadingMask,
    Grayscale,
    TextSpacing,
    DyslexiaFont,
    Profiles,
}

impl FeatureKey {
    pub const ALL: [FeatureKey; 10] = [
        FeatureKey::FontSize,
        FeatureKey::HighContrast,
        FeatureKey::HighlightLinks,
        FeatureKey::PauseAnimations,
        FeatureKey::LargeCursor,
        FeatureKey::ReadingMask,
        FeatureKey::Grayscale,
        FeatureKey::TextSpacing,
        FeatureKey::DyslexiaFont,
        FeatureKey::Profiles,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureKey::FontSize => "fontSize",
            FeatureKey::HighContrast => "highContrast",
            FeatureKey::HighlightLinks => "highlightLinks",
            FeatureKey::PauseAnimations => "pauseAnimations",
            FeatureKey::LargeCursor => "largeCursor",
            FeatureKey::ReadingMask => "readingMask",
            FeatureKey::Grayscale => "grayscale",
            FeatureKey::TextSpacing => "textSpacing",
            FeatureKey::DyslexiaFont => "dyslexiaFont",
            FeatureKey::Profiles => "profiles",
        }
    }
}

impl From<SettingKey> for FeatureKey {
    fn from(key: SettingKey) -> Self {
        match key {
            SettingKey::FontSizeLevel => FeatureKey::FontSize,
            SettingKey::HighContrast => FeatureKey::HighContrast,
            SettingKey::HighlightLinks => FeatureKey::HighlightLinks,
            SettingKey::PauseAnimations => FeatureKey::PauseAnimations,
            SettingKey::LargeCursor => FeatureKey::LargeCursor,
            SettingKey::ReadingMask => FeatureKey::ReadingMask,
            SettingKey::Grayscale => FeatureKey::Grayscale,
            SettingKey::TextSpacing => FeatureKey::TextSpacing,
            SettingKey::DyslexiaFont => FeatureKey::DyslexiaFont,
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureKey {
    type Err = UnknownNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        FeatureKey::ALL
            .into_iter()
            .find(|k| k.name().to_ascii_lowercase() == normalized)
            .ok_or_else(|| UnknownNameError::new("feature", s))
    }
}

/// Device class derived from the viewport width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Desktop,
    Mobile,
}

impl DeviceClass {
    /// Viewports narrower than `breakpoint` are mobile
    pub fn from_viewport_width(width: f64, breakpoint: u32) -> Self {
        if width < f64::from(breakpoint) {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl TriggerSize {
    /// Rendered diameter in px
    pub fn diameter(&self) -> f64 {
        match self {
            TriggerSize::Small => 44.0,
            TriggerSize::Medium => 56.0,
            TriggerSize::Large => 68.0,
        }
    }

    pub fn control_size(&self) -> Size {
        Size::new(self.diameter(), self.diameter())
    }
}

/// Floating trigger appearance and placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriggerSection {
    /// Overrides the widget config side when set
    pub side: Option<Side>,
    pub color: String,
    pub size: TriggerSize,
    /// Overrides the edge margin when set
    pub offset_x: Option<f64>,
    /// Overrides the bottom margin when set
    pub offset_y: Option<f64>,
    pub show_on_desktop: bool,
    pub show_on_mobile: bool,
    pub hide_trigger: bool,
}

impl Default for TriggerSection {
    fn default() -> Self {
        Self {
            side: None,
            color: "#1a56db".to_string(),
            size: TriggerSize::default(),
            offset_x: None,
            offset_y: None,
            show_on_desktop: true,
            show_on_mobile: true,
            hide_trigger: false,
        }
    }
}

/// Panel chrome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InterfaceSection {
    pub title: String,
    pub lead_color: String,
    pub show_footer: bool,
}

impl Default for InterfaceSection {
    fn default() -> Self {
        Self {
            title: "Accessibility".to_string(),
            lead_color: "#1a56db".to_string(),
            show_footer: true,
        }
    }
}

/// Accessibility statement link
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatementSection {
    pub enabled: bool,
    pub url: String,
    pub company_name: String,
    pub contact_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdvancedSection {
    #[serde(deserialize_with = "known_features")]
    pub enabled_features: BTreeSet<FeatureKey>,
    pub shortcut: String,
    pub collect_stats: bool,
}

impl Default for AdvancedSection {
    fn default() -> Self {
        Self {
            enabled_features: FeatureKey::ALL.into_iter().collect(),
            shortcut: Shortcut::default().to_string(),
            collect_stats: false,
        }
    }
}

/// Feature names from a newer admin panel are skipped, not fatal
fn known_features<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeSet<FeatureKey>, D::Error> {
    let names = Vec::<String>::deserialize(deserializer)?;
    Ok(names
        .iter()
        .filter_map(|name| match name.parse::<FeatureKey>() {
            Ok(key) => Some(key),
            Err(e) => {
                debug!(error = %e, "Ignoring unknown admin feature");
                None
            }
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminConfiguration {
    pub trigger: TriggerSection,
    pub interface: InterfaceSection,
    pub statement: StatementSection,
    pub advanced: AdvancedSection,
}

impl AdminConfiguration {
    /// Build from a stored JSON record, defaulting each section independently
    pub fn from_stored(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                warn!(error = %e, "Stored admin configuration is not JSON, using defaults");
                Self::default()
            }
        }
    }

    pub fn from_value(value: &Value) -> Self {
        let Some(record) = value.as_object() else {
            warn!("Stored admin configuration is not an object, using defaults");
            return Self::default();
        };

        Self {
            trigger: section(record, "trigger"),
            interface: section(record, "interface"),
            statement: section(record, "statement"),
            advanced: section(record, "advanced"),
        }
    }

    pub fn is_feature_enabled(&self, key: FeatureKey) -> bool {
        self.advanced.enabled_features.contains(&key)
    }

    pub fn should_render_on(&self, device: DeviceClass) -> bool {
        match device {
            DeviceClass::Desktop => self.trigger.show_on_desktop,
            DeviceClass::Mobile => self.trigger.show_on_mobile,
        }
    }

    /// Parsed shortcut; an invalid string falls back to the default
    pub fn shortcut(&self) -> Shortcut {
        self.advanced.shortcut.parse().unwrap_or_else(|e| {
            warn!(shortcut = %self.advanced.shortcut, error = %e, "Invalid admin shortcut, using default");
            Shortcut::default()
        })
    }
}

fn section<T: DeserializeOwned + Default>(record: &serde_json::Map<String, Value>, name: &str) -> T {
    match record.get(name) {
        None | Some(Value::Null) => T::default(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            warn!(section = name, error = %e, "Malformed admin section, using its defaults");
            T::default()
        }),
    }
}

fn read_store(store: &PersistentConfigStore) -> AdminConfiguration {
    store
        .get_raw(keys::ADMIN_SETTINGS)
        .map(|raw| AdminConfiguration::from_stored(&raw))
        .unwrap_or_default()
}

/// Keeps the in-memory admin configuration in step with storage and the bus
pub struct AdminSyncReconciler {
    store: PersistentConfigStore,
    bus: ChangeBus,
    state: Rc<RefCell<AdminConfiguration>>,
    _subscription: Subscription,
}

impl AdminSyncReconciler {
    pub fn new(store: PersistentConfigStore, bus: ChangeBus) -> Self {
        let state = Rc::new(RefCell::new(read_store(&store)));

        let listener_state = Rc::clone(&state);
        let listener_store = store.clone();
        let subscription = bus.subscribe(Topic::Admin, move |event| {
            let ChangeEvent::AdminChanged(payload) = event else {
                return;
            };
            let next = match payload {
                Some(config) => config.clone(),
                None => read_store(&listener_store),
            };
            debug!(from_payload = payload.is_some(), "Admin configuration refreshed");
            *listener_state.borrow_mut() = next;
        });

        Self {
            store,
            bus,
            state,
            _subscription: subscription,
        }
    }

    /// Re-read durable storage and replace the in-memory state
    pub fn load(&self) -> AdminConfiguration {
        let config = read_store(&self.store);
        *self.state.borrow_mut() = config.clone();
        config
    }

    pub fn config(&self) -> AdminConfiguration {
        self.state.borrow().clone()
    }

    pub fn is_feature_enabled(&self, key: FeatureKey) -> bool {
        self.state.borrow().is_feature_enabled(key)
    }

    pub fn should_render_on_current_device(&self, device: DeviceClass) -> bool {
        self.state.borrow().should_render_on(device)
    }

    pub fn trigger_hidden(&self) -> bool {
        self.state.borrow().trigger.hide_trigger
    }

    pub fn shortcut(&self) -> Shortcut {
        self.state.borrow().shortcut()
    }

    /// Admin-side write: persist and notify every reconciler on this bus
    pub fn save(&self, config: AdminConfiguration) {
        self.store.set_json(keys::ADMIN_SETTINGS, &config);
        info!(features = config.advanced.enabled_features.len(), "Admin configuration saved");
        self.bus.publish(ChangeEvent::AdminChanged(Some(config)));
    }
}

impl fmt::Debug for AdminSyncReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSyncReconciler")
            .field("state", &self.state.borrow())
            .finish_non_exhaustive()
    }
}

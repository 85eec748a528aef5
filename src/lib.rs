//! Runtime state core for an accessibility overlay widget
//!
//! The crate keeps a floating trigger positioned and snapped to viewport
//! edges ([`position`]), derives the widget's visibility from persisted
//! hide/minimize markers ([`visibility`]), traps keyboard focus inside the
//! open panel ([`focus`]), and keeps end-user settings ([`settings`]) and
//! site-owner configuration ([`admin`]) in sync with storage and with each
//! other through an in-process bus ([`bus`]). [`widget::Widget`] composes
//! all of them behind one host-facing API.

#![forbid(unsafe_code)]

pub mod admin;
pub mod bus;
pub mod cli;
pub mod clock;
pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod focus;
pub mod input;
pub mod notify;
pub mod position;
pub mod settings;
pub mod shortcut;
pub mod snapping;
pub mod storage;
pub mod types;
pub mod visibility;
pub mod widget;

pub use admin::{AdminConfiguration, AdminSyncReconciler, DeviceClass, FeatureKey};
pub use bus::{ChangeBus, ChangeEvent, Subscription, Topic};
pub use config::WidgetConfig;
pub use error::UnknownNameError;
pub use focus::{FocusContainment, FocusHost, KeyOutcome};
pub use position::PositionEngine;
pub use settings::{AccessibilitySettings, SettingsReconciler};
pub use storage::{EphemeralConfigStore, FileStore, KeyValueStore, MemoryStore, PersistentConfigStore};
pub use types::{Position, Size};
pub use visibility::{HideOption, VisibilityState, VisibilityStateMachine};
pub use widget::{RenderMode, Widget, WidgetContext};

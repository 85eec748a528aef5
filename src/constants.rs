//! Application-wide constants
//!
//! Storage key names, fixed durations and level bounds shared by the
//! widget components. Tunable geometry lives in [`crate::config`].

/// Storage key names (durable and ephemeral stores share the namespace)
pub mod keys {
    /// Durable: serialized `AccessibilitySettings`
    pub const SETTINGS: &str = "settings";

    /// Durable and ephemeral: widget hidden flag
    pub const WIDGET_HIDDEN: &str = "widget-hidden";

    /// Durable: epoch-millis expiry for the hidden flag (absent = permanent)
    pub const WIDGET_HIDDEN_UNTIL: &str = "widget-hidden-until";

    /// Durable: widget collapsed to the minimized dot
    pub const WIDGET_MINIMIZED: &str = "widget-minimized";

    /// Durable: trigger offset from its default anchor
    pub const WIDGET_POSITION: &str = "widget-position";

    /// Durable: serialized `AdminConfiguration`
    pub const ADMIN_SETTINGS: &str = "admin-settings";
}

/// Fixed hide durations. Not calendar aware.
pub mod durations {
    pub const HOUR_MS: u64 = 60 * 60 * 1000;
    pub const DAY_MS: u64 = 24 * HOUR_MS;
    pub const WEEK_MS: u64 = 7 * DAY_MS;
    pub const MONTH_MS: u64 = 30 * DAY_MS;
}

/// Font size level bounds
pub mod font {
    pub const MIN_LEVEL: u8 = 0;
    pub const MAX_LEVEL: u8 = 3;
}

/// Stored flag value
pub const FLAG_TRUE: &str = "true";

/// Validation bounds for loaded configuration
pub mod validation {
    pub const MAX_MARGIN: f64 = 200.0;
    pub const MAX_SNAP_THRESHOLD: f64 = 200.0;
    pub const MAX_CLICK_TOLERANCE: f64 = 50.0;
    pub const MAX_FOCUS_DELAY_MS: u64 = 5_000;
    pub const MIN_BREAKPOINT: u32 = 200;
    pub const MAX_BREAKPOINT: u32 = 4_096;
}

/// File-backed store defaults
pub mod paths {
    /// Directory under the platform data dir
    pub const APP_DIR: &str = "a11y-overlay";

    /// Durable store file name
    pub const STORE_FILENAME: &str = "store.json";

    /// Config file name (under the platform config dir)
    pub const CONFIG_FILENAME: &str = "config.json";
}

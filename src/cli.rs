//! Command-line front end over a file-backed durable store
//!
//! Each invocation is its own session: the ephemeral store is in-memory and
//! discarded on exit, so `hide session` only lasts for the command itself.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::info;

use crate::admin::{AdminSyncReconciler, FeatureKey};
use crate::bus::ChangeBus;
use crate::clock::{Clock, SystemClock};
use crate::config::WidgetConfig;
use crate::constants::keys;
use crate::notify::{Notifier, TracingNotifier};
use crate::settings::{AccessibilityProfile, SettingKey, SettingValue, SettingsReconciler};
use crate::storage::{EphemeralConfigStore, FileStore, PersistentConfigStore};
use crate::types::Position;
use crate::visibility::{HideOption, VisibilityState, VisibilityStateMachine};

#[derive(Debug, Parser)]
#[command(
    name = "a11y-overlay",
    about = "Inspect and change persisted accessibility widget state",
    version
)]
pub struct Cli {
    /// Durable store file (defaults to the per-user data directory)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Widget configuration file (defaults to the per-user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print visibility, settings and admin summary.
    Status,

    /// Clear every hide and minimize marker.
    Show,

    /// Hide the widget for a period (session, day, week, month, forever).
    Hide { option: HideOption },

    /// Collapse the widget to its minimized dot.
    Minimize,

    /// Restore the widget from its minimized dot.
    Expand,

    /// End-user accessibility settings.
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Site-owner configuration.
    #[command(subcommand)]
    Admin(AdminCommand),

    /// Persisted trigger position.
    #[command(subcommand)]
    Position(PositionCommand),
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Show,
    /// Set one field, e.g. `set high-contrast true` or `set font-size-level 2`.
    Set(SetArgs),
    Toggle { key: SettingKey },
    Reset,
    #[command(name = "font-up")]
    FontUp,
    #[command(name = "font-down")]
    FontDown,
    /// Apply a preset (vision-impaired, seizure-safe, adhd-friendly, dyslexia, cognitive-disability).
    Profile { profile: AccessibilityProfile },
}

#[derive(Debug, Args)]
pub struct SetArgs {
    pub key: SettingKey,
    pub value: String,
}

#[derive(Debug, Subcommand)]
pub enum AdminCommand {
    Show,
    /// Report whether a feature is enabled.
    Feature { key: FeatureKey },
}

#[derive(Debug, Subcommand)]
pub enum PositionCommand {
    Show,
    Reset,
}

/// Components opened over the durable store for one invocation
struct Session {
    durable: PersistentConfigStore,
    bus: ChangeBus,
    clock: Rc<dyn Clock>,
    notifier: Rc<dyn Notifier>,
}

impl Session {
    fn open(cli: &Cli) -> Self {
        let path = cli.store.clone().unwrap_or_else(FileStore::default_path);
        info!(path = %path.display(), "Opening durable store");
        Self {
            durable: PersistentConfigStore::new(Rc::new(FileStore::open(path))),
            bus: ChangeBus::new(),
            clock: Rc::new(SystemClock),
            notifier: Rc::new(TracingNotifier),
        }
    }

    fn visibility(&self) -> VisibilityStateMachine {
        VisibilityStateMachine::new(
            self.durable.clone(),
            EphemeralConfigStore::in_memory(),
            Rc::clone(&self.clock),
            Rc::clone(&self.notifier),
        )
    }

    fn settings(&self) -> SettingsReconciler {
        SettingsReconciler::new(self.durable.clone(), self.bus.clone())
    }

    fn admin(&self) -> AdminSyncReconciler {
        AdminSyncReconciler::new(self.durable.clone(), self.bus.clone())
    }
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    run(cli, &mut std::io::stdout().lock())
}

pub fn run(cli: Cli, out: &mut dyn Write) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(WidgetConfig::default_path);
    let config = WidgetConfig::load_from(&config_path)?;

    let session = Session::open(&cli);

    match cli.command {
        Commands::Status => {
            let state = session.visibility().evaluate();
            writeln!(out, "visibility: {}", describe(state, session.clock.now_millis()))?;
            print_json(out, "settings", &session.settings().current())?;
            let admin = session.admin().config();
            writeln!(out, "trigger hidden by admin: {}", admin.trigger.hide_trigger)?;
            writeln!(out, "shortcut: {}", admin.shortcut())?;
            writeln!(out, "mobile breakpoint: {}px", config.device.mobile_breakpoint)?;
        }
        Commands::Show => report_state(out, &session, |v| v.show())?,
        Commands::Hide { option } => report_state(out, &session, |v| v.choose_hide(option))?,
        Commands::Minimize => report_state(out, &session, |v| v.minimize())?,
        Commands::Expand => report_state(out, &session, |v| v.expand())?,
        Commands::Settings(cmd) => run_settings(out, &session, cmd)?,
        Commands::Admin(cmd) => {
            let admin = session.admin();
            match cmd {
                AdminCommand::Show => print_json(out, "admin", &admin.config())?,
                AdminCommand::Feature { key } => {
                    writeln!(out, "{key}: {}", enabled_label(admin.is_feature_enabled(key)))?
                }
            }
        }
        Commands::Position(cmd) => match cmd {
            PositionCommand::Show => {
                let offset = session
                    .durable
                    .get_json::<Position>(keys::WIDGET_POSITION)
                    .unwrap_or_default();
                writeln!(out, "offset: ({}, {}) from the {:?} anchor", offset.x, offset.y, config.position.side)?;
            }
            PositionCommand::Reset => {
                session.durable.remove(keys::WIDGET_POSITION);
                writeln!(out, "offset: reset")?;
            }
        },
    }
    Ok(())
}

fn run_settings(out: &mut dyn Write, session: &Session, cmd: SettingsCommand) -> Result<()> {
    let mut settings = session.settings();
    match cmd {
        SettingsCommand::Show => {}
        SettingsCommand::Set(SetArgs { key, value }) => {
            let value = parse_value(key, &value)?;
            if !settings.update(key, value) {
                bail!("value {value} does not fit setting {key}");
            }
        }
        SettingsCommand::Toggle { key } => {
            if settings.toggle(key).is_none() {
                bail!("setting {key} is not a switch");
            }
        }
        SettingsCommand::Reset => settings.reset(),
        SettingsCommand::FontUp => {
            settings.increase_font_size();
        }
        SettingsCommand::FontDown => {
            settings.decrease_font_size();
        }
        SettingsCommand::Profile { profile } => settings.apply_profile(profile),
    }
    print_json(out, "settings", &settings.current())
}

fn parse_value(key: SettingKey, raw: &str) -> Result<SettingValue> {
    if key == SettingKey::FontSizeLevel {
        let level = raw
            .trim()
            .parse::<u8>()
            .with_context(|| format!("{key} expects a level, got '{raw}'"))?;
        return Ok(SettingValue::Level(level));
    }
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "1" => Ok(SettingValue::Bool(true)),
        "false" | "off" | "0" => Ok(SettingValue::Bool(false)),
        _ => bail!("{key} expects true or false, got '{raw}'"),
    }
}

fn report_state(
    out: &mut dyn Write,
    session: &Session,
    action: impl FnOnce(&mut VisibilityStateMachine) -> VisibilityState,
) -> Result<()> {
    let mut visibility = session.visibility();
    let state = action(&mut visibility);
    writeln!(out, "visibility: {}", describe(state, session.clock.now_millis()))?;
    Ok(())
}

fn describe(state: VisibilityState, now: u64) -> String {
    match state {
        VisibilityState::Visible => "visible".to_string(),
        VisibilityState::Minimized => "minimized".to_string(),
        VisibilityState::HiddenSession => "hidden for this session".to_string(),
        VisibilityState::HiddenUntil(ts) => {
            let minutes = ts.saturating_sub(now) / 60_000;
            format!("hidden until {ts} ({minutes} min left)")
        }
        VisibilityState::HiddenForever => "hidden forever".to_string(),
    }
}

fn enabled_label(enabled: bool) -> &'static str {
    if enabled { "enabled" } else { "disabled" }
}

fn print_json<T: serde::Serialize>(out: &mut dyn Write, label: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).with_context(|| format!("Failed to render {label}"))?;
    writeln!(out, "{label}: {json}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn run_args(dir: &std::path::Path, args: &[&str]) -> Result<String> {
        let store = dir.join("store.json");
        let config = dir.join("config.json");
        let mut argv = vec![
            "a11y-overlay",
            "--store",
            store.to_str().unwrap_or_default(),
            "--config",
            config.to_str().unwrap_or_default(),
        ];
        argv.extend_from_slice(args);

        let cli = Cli::try_parse_from(argv)?;
        let mut out = Vec::new();
        run(cli, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_hide_forever_persists_across_invocations() {
        let dir = tempdir().unwrap();
        let out = run_args(dir.path(), &["hide", "forever"]).unwrap();
        assert!(out.contains("hidden forever"));

        let status = run_args(dir.path(), &["status"]).unwrap();
        assert!(status.contains("visibility: hidden forever"));

        let shown = run_args(dir.path(), &["show"]).unwrap();
        assert!(shown.contains("visibility: visible"));
    }

    #[test]
    fn test_hide_session_does_not_outlive_invocation() {
        let dir = tempdir().unwrap();
        run_args(dir.path(), &["hide", "session"]).unwrap();
        let status = run_args(dir.path(), &["status"]).unwrap();
        assert!(status.contains("visibility: visible"));
    }

    #[test]
    fn test_settings_set_and_toggle() {
        let dir = tempdir().unwrap();
        run_args(dir.path(), &["settings", "set", "high-contrast", "on"]).unwrap();
        run_args(dir.path(), &["settings", "toggle", "grayscale"]).unwrap();
        let out = run_args(dir.path(), &["settings", "font-up"]).unwrap();
        assert!(out.contains("\"highContrast\": true"));
        assert!(out.contains("\"grayscale\": true"));
        assert!(out.contains("\"fontSizeLevel\": 1"));
    }

    #[test]
    fn test_settings_rejects_bad_values() {
        let dir = tempdir().unwrap();
        assert!(run_args(dir.path(), &["settings", "set", "grayscale", "maybe"]).is_err());
        assert!(run_args(dir.path(), &["settings", "set", "font-size-level", "big"]).is_err());
        assert!(run_args(dir.path(), &["settings", "toggle", "font-size-level"]).is_err());
    }

    #[test]
    fn test_profile_and_admin_feature() {
        let dir = tempdir().unwrap();
        let out = run_args(dir.path(), &["settings", "profile", "seizure-safe"]).unwrap();
        assert!(out.contains("\"pauseAnimations\": true"));

        let feature = run_args(dir.path(), &["admin", "feature", "reading-mask"]).unwrap();
        assert_eq!(feature.trim(), "readingMask: enabled");
    }

    #[test]
    fn test_position_reset() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("store.json"), r#"{"widget-position": "{\"x\":-40.0,\"y\":-12.5}"}"#).unwrap();
        let shown = run_args(dir.path(), &["position", "show"]).unwrap();
        assert!(shown.contains("(-40, -12.5)"));

        run_args(dir.path(), &["position", "reset"]).unwrap();
        let shown = run_args(dir.path(), &["position", "show"]).unwrap();
        assert!(shown.contains("(0, 0)"));
    }

    #[test]
    fn test_unknown_arguments_rejected() {
        assert!(Cli::try_parse_from(["a11y-overlay", "hide", "fortnight"]).is_err());
        assert!(Cli::try_parse_from(["a11y-overlay", "settings", "toggle", "zoom"]).is_err());
    }
}

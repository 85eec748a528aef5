//! Widget visibility state machine
//!
//! The displayed state is derived on every evaluation from three markers:
//! - ephemeral `widget-hidden` (hidden for this session)
//! - durable `widget-hidden` + optional `widget-hidden-until` (epoch millis)
//! - durable `widget-minimized`
//!
//! # Invariants
//!
//! 1. A session hide wins over every durable marker.
//! 2. An expired `widget-hidden-until` evaluates to visible and both durable
//!    hidden markers are removed during that evaluation.
//! 3. Only `show()` leaves `HiddenForever`.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::constants::{durations, keys};
use crate::error::UnknownNameError;
use crate::notify::Notifier;
use crate::storage::{EphemeralConfigStore, PersistentConfigStore};

/// What the host should display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityState {
    Visible,
    Minimized,
    HiddenSession,
    /// Hidden until the given epoch-millis instant
    HiddenUntil(u64),
    HiddenForever,
}

impl VisibilityState {
    pub fn is_hidden(&self) -> bool {
        matches!(
            self,
            VisibilityState::HiddenSession | VisibilityState::HiddenUntil(_) | VisibilityState::HiddenForever
        )
    }
}

/// Hide duration picked in the hide dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HideOption {
    Session,
    Day,
    Week,
    Month,
    Forever,
}

impl HideOption {
    /// Fixed duration for timed options
    pub fn duration_ms(&self) -> Option<u64> {
        match self {
            HideOption::Day => Some(durations::DAY_MS),
            HideOption::Week => Some(durations::WEEK_MS),
            HideOption::Month => Some(durations::MONTH_MS),
            HideOption::Session | HideOption::Forever => None,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            HideOption::Session => "for this session",
            HideOption::Day => "for 1 day",
            HideOption::Week => "for 1 week",
            HideOption::Month => "for 1 month",
            HideOption::Forever => "until you show it again",
        }
    }
}

impl fmt::Display for HideOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HideOption::Session => "session",
            HideOption::Day => "day",
            HideOption::Week => "week",
            HideOption::Month => "month",
            HideOption::Forever => "forever",
        };
        f.write_str(name)
    }
}

impl FromStr for HideOption {
    type Err = UnknownNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" => Ok(HideOption::Session),
            "day" => Ok(HideOption::Day),
            "week" => Ok(HideOption::Week),
            "month" => Ok(HideOption::Month),
            "forever" => Ok(HideOption::Forever),
            _ => Err(UnknownNameError::new("hide option", s)),
        }
    }
}

/// Evaluates and mutates the persisted visibility markers
pub struct VisibilityStateMachine {
    durable: PersistentConfigStore,
    ephemeral: EphemeralConfigStore,
    clock: Rc<dyn Clock>,
    notifier: Rc<dyn Notifier>,
    /// Hide chosen while storage rejected the write. `Visible` records a
    /// `show()` whose marker removal failed.
    unpersisted_hidden: Option<VisibilityState>,
    /// Minimized flag set or cleared while storage rejected the write
    unpersisted_minimized: Option<bool>,
}

impl VisibilityStateMachine {
    pub fn new(
        durable: PersistentConfigStore,
        ephemeral: EphemeralConfigStore,
        clock: Rc<dyn Clock>,
        notifier: Rc<dyn Notifier>,
    ) -> Self {
        Self {
            durable,
            ephemeral,
            clock,
            notifier,
            unpersisted_hidden: None,
            unpersisted_minimized: None,
        }
    }

    /// Current state. Clears expired hide markers as a side effect.
    ///
    /// In-memory fallbacks take the place of their stored marker, so the
    /// precedence is the same whether or not storage accepted the writes.
    pub fn evaluate(&mut self) -> VisibilityState {
        if self.ephemeral.get_flag(keys::WIDGET_HIDDEN) {
            return VisibilityState::HiddenSession;
        }

        let now = self.clock.now_millis();
        if let Some(hidden) = self.hidden_state(now) {
            return hidden;
        }

        let minimized = self
            .unpersisted_minimized
            .unwrap_or_else(|| self.durable.get_flag(keys::WIDGET_MINIMIZED));
        if minimized {
            VisibilityState::Minimized
        } else {
            VisibilityState::Visible
        }
    }

    fn hidden_state(&mut self, now: u64) -> Option<VisibilityState> {
        match self.unpersisted_hidden {
            Some(VisibilityState::Visible) => return None,
            Some(VisibilityState::HiddenUntil(ts)) if now >= ts => {
                info!(hidden_until = ts, now, "Unpersisted hide period expired");
                self.unpersisted_hidden = None;
            }
            Some(state) => return Some(state),
            None => {}
        }

        let until = self.durable.get_raw(keys::WIDGET_HIDDEN_UNTIL);
        if self.durable.get_flag(keys::WIDGET_HIDDEN) {
            match until.as_deref().map(|raw| raw.trim().parse::<u64>()) {
                None => return Some(VisibilityState::HiddenForever),
                Some(Ok(ts)) if now < ts => return Some(VisibilityState::HiddenUntil(ts)),
                Some(Ok(ts)) => {
                    info!(hidden_until = ts, now, "Hide period expired, showing widget");
                    self.clear_hidden_markers();
                }
                Some(Err(e)) => {
                    warn!(raw = ?until, error = %e, "Malformed hidden-until marker, showing widget");
                    self.clear_hidden_markers();
                }
            }
        } else if until.is_some() {
            // Expiry without its flag is stale
            self.durable.remove(keys::WIDGET_HIDDEN_UNTIL);
        }
        None
    }

    /// Hide the widget for the chosen period
    pub fn choose_hide(&mut self, option: HideOption) -> VisibilityState {
        let (target, persisted) = match option {
            HideOption::Session => (
                VisibilityState::HiddenSession,
                self.ephemeral.set_flag(keys::WIDGET_HIDDEN),
            ),
            HideOption::Day | HideOption::Week | HideOption::Month => {
                let duration = option.duration_ms().unwrap_or(durations::DAY_MS);
                let ts = self.clock.now_millis().saturating_add(duration);
                let flag = self.durable.set_flag(keys::WIDGET_HIDDEN);
                let until = self.durable.set_raw(keys::WIDGET_HIDDEN_UNTIL, &ts.to_string());
                (VisibilityState::HiddenUntil(ts), flag && until)
            }
            HideOption::Forever => {
                let flag = self.durable.set_flag(keys::WIDGET_HIDDEN);
                let cleared = self.durable.remove(keys::WIDGET_HIDDEN_UNTIL);
                (VisibilityState::HiddenForever, flag && cleared)
            }
        };
        let held = hold(persisted, target);
        // A session hide leaves the durable markers alone
        if held.is_some() || option != HideOption::Session {
            self.unpersisted_hidden = held;
        }
        info!(option = %option, state = ?target, "Widget hidden");

        let message = format!("Accessibility widget hidden {}", option.description());
        self.notifier.announce(&message);
        if option != HideOption::Session {
            self.notifier.toast("Accessibility widget hidden", Some(option.description()));
        }
        target
    }

    /// Collapse to the minimized dot. An active hide still wins.
    pub fn minimize(&mut self) -> VisibilityState {
        let persisted = self.durable.set_flag(keys::WIDGET_MINIMIZED);
        self.unpersisted_minimized = hold(persisted, true);
        info!("Widget minimized");

        self.notifier.announce("Accessibility widget minimized");
        self.notifier
            .toast("Accessibility widget minimized", Some("Select the dot to expand it again"));
        self.evaluate()
    }

    /// Leave the minimized dot
    pub fn expand(&mut self) -> VisibilityState {
        let persisted = self.durable.remove(keys::WIDGET_MINIMIZED);
        self.unpersisted_minimized = hold(persisted, false);
        info!("Widget expanded");

        self.notifier.announce("Accessibility widget expanded");
        self.evaluate()
    }

    /// Clear every marker and return to `Visible`
    pub fn show(&mut self) -> VisibilityState {
        self.ephemeral.remove(keys::WIDGET_HIDDEN);
        let hidden_cleared = self.clear_hidden_markers();
        let minimized_cleared = self.durable.remove(keys::WIDGET_MINIMIZED);
        self.unpersisted_hidden = hold(hidden_cleared, VisibilityState::Visible);
        self.unpersisted_minimized = hold(minimized_cleared, false);
        info!("Widget shown");

        self.notifier.announce("Accessibility widget shown");
        self.evaluate()
    }

    fn clear_hidden_markers(&self) -> bool {
        let flag = self.durable.remove(keys::WIDGET_HIDDEN);
        let until = self.durable.remove(keys::WIDGET_HIDDEN_UNTIL);
        flag && until
    }
}

/// In-memory fallback for a write that storage rejected
fn hold<T: Copy + fmt::Debug>(persisted: bool, value: T) -> Option<T> {
    if persisted {
        None
    } else {
        warn!(value = ?value, "Visibility change not persisted, holding it in memory");
        Some(value)
    }
}

impl fmt::Debug for VisibilityStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisibilityStateMachine")
            .field("unpersisted_hidden", &self.unpersisted_hidden)
            .field("unpersisted_minimized", &self.unpersisted_minimized)
            .finish_non_exhaustive()
    }
}

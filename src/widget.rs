//! Widget host
//!
//! `Widget` owns one instance of every runtime component and routes host
//! events (viewport changes, pointer and keyboard input, menu actions) to
//! them. It decides what to render from the admin configuration, the device
//! class and the visibility state, and keeps the panel's focus trap bound to
//! the panel's open state.

use std::rc::Rc;
use tracing::{debug, info};

use crate::admin::{AdminSyncReconciler, DeviceClass, FeatureKey, TriggerSection};
use crate::bus::ChangeBus;
use crate::clock::Clock;
use crate::config::{PositionConfig, WidgetConfig};
use crate::focus::{ElementId, FocusContainment, FocusHost, KeyOutcome, TimerId};
use crate::input::KeyInput;
use crate::notify::Notifier;
use crate::position::{DragEnd, PositionEngine};
use crate::settings::{AccessibilityProfile, SettingKey, SettingValue, SettingsReconciler};
use crate::storage::{EphemeralConfigStore, PersistentConfigStore};
use crate::types::{Position, Size};
use crate::visibility::{HideOption, VisibilityState, VisibilityStateMachine};

/// What the host should draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Trigger,
    MinimizedDot,
    Nothing,
}

impl RenderMode {
    fn from_state(state: VisibilityState) -> Self {
        match state {
            VisibilityState::Visible => RenderMode::Trigger,
            VisibilityState::Minimized => RenderMode::MinimizedDot,
            _ => RenderMode::Nothing,
        }
    }
}

/// Shared collaborators handed to a widget
#[derive(Clone)]
pub struct WidgetContext {
    pub durable: PersistentConfigStore,
    pub ephemeral: EphemeralConfigStore,
    pub bus: ChangeBus,
    pub clock: Rc<dyn Clock>,
    pub notifier: Rc<dyn Notifier>,
}

pub struct Widget<H: FocusHost> {
    config: WidgetConfig,
    notifier: Rc<dyn Notifier>,
    settings: SettingsReconciler,
    admin: AdminSyncReconciler,
    visibility: VisibilityStateMachine,
    position: PositionEngine,
    /// Admin trigger section the position engine was last configured from
    trigger: TriggerSection,
    focus: FocusContainment<H>,
    panel: ElementId,
    panel_open: bool,
    render: RenderMode,
    device: DeviceClass,
}

impl<H: FocusHost> Widget<H> {
    /// Build every component. Nothing is rendered until [`Widget::mount`].
    pub fn new(config: WidgetConfig, host: H, panel: ElementId, ctx: WidgetContext) -> Self {
        let settings = SettingsReconciler::new(ctx.durable.clone(), ctx.bus.clone());
        let admin = AdminSyncReconciler::new(ctx.durable.clone(), ctx.bus.clone());
        let visibility = VisibilityStateMachine::new(
            ctx.durable.clone(),
            ctx.ephemeral,
            ctx.clock,
            Rc::clone(&ctx.notifier),
        );

        let trigger = admin.config().trigger;
        let mut position = PositionEngine::new(trigger_geometry(config.position, &trigger), ctx.durable);
        position.set_control_size(trigger.size.control_size());

        let focus = FocusContainment::new(host, config.focus);

        Self {
            config,
            notifier: ctx.notifier,
            settings,
            admin,
            visibility,
            position,
            trigger,
            focus,
            panel,
            panel_open: false,
            render: RenderMode::Nothing,
            device: DeviceClass::Desktop,
        }
    }

    /// First layout pass
    pub fn mount(&mut self, viewport: Size) -> RenderMode {
        let mode = self.resize(viewport);
        info!(mode = ?mode, device = ?self.device, "Widget mounted");
        mode
    }

    /// Viewport changed: re-clamp the trigger and re-evaluate rendering
    pub fn resize(&mut self, viewport: Size) -> RenderMode {
        self.device = DeviceClass::from_viewport_width(viewport.width, self.config.device.mobile_breakpoint);
        self.position.reconcile_to_viewport(viewport);
        self.refresh()
    }

    /// Re-evaluate what to render, closing the panel if the trigger went away
    pub fn refresh(&mut self) -> RenderMode {
        let trigger = self.admin.config().trigger;
        if trigger != self.trigger {
            self.apply_trigger(trigger);
        }

        let mode = if self.admin.trigger_hidden() || !self.admin.should_render_on_current_device(self.device) {
            RenderMode::Nothing
        } else {
            RenderMode::from_state(self.visibility.evaluate())
        };

        if mode != self.render {
            debug!(from = ?self.render, to = ?mode, "Render mode changed");
        }
        self.render = mode;
        if mode != RenderMode::Trigger {
            self.position.cancel_drag();
            self.close_panel();
        }
        mode
    }

    fn apply_trigger(&mut self, trigger: TriggerSection) {
        self.position.set_config(trigger_geometry(self.config.position, &trigger));
        self.position.set_control_size(trigger.size.control_size());
        let viewport = self.position.viewport();
        self.position.reconcile_to_viewport(viewport);
        info!(side = ?trigger.side, size = ?trigger.size, "Admin trigger geometry applied");
        self.trigger = trigger;
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render
    }

    pub fn device(&self) -> DeviceClass {
        self.device
    }

    pub fn is_panel_open(&self) -> bool {
        self.panel_open
    }

    /// Open the panel and trap focus inside it. Only possible while the
    /// trigger is rendered.
    pub fn open_panel(&mut self) -> bool {
        if self.panel_open {
            return true;
        }
        if self.render != RenderMode::Trigger {
            debug!(mode = ?self.render, "Panel not opened, trigger is not rendered");
            return false;
        }

        let notifier = Rc::clone(&self.notifier);
        self.focus
            .activate(self.panel, move || notifier.announce("Accessibility menu closed"));
        self.panel_open = true;
        info!("Panel opened");
        true
    }

    pub fn close_panel(&mut self) {
        if !self.panel_open {
            return;
        }
        self.focus.deactivate();
        self.panel_open = false;
        info!("Panel closed");
    }

    /// Returns whether the panel is open afterwards
    pub fn toggle_panel(&mut self) -> bool {
        if self.panel_open {
            self.close_panel();
            false
        } else {
            self.open_panel()
        }
    }

    /// Document-level key-down
    pub fn handle_key(&mut self, input: &KeyInput) -> KeyOutcome {
        if self.render == RenderMode::Trigger && self.admin.shortcut().matches(input) {
            if self.focus_in_text_field() {
                debug!("Shortcut ignored inside editable field");
            } else {
                self.toggle_panel();
                return KeyOutcome::Handled;
            }
        }

        if !self.panel_open {
            return KeyOutcome::Default;
        }
        let outcome = self.focus.handle_key(input);
        if outcome == KeyOutcome::Escaped {
            self.close_panel();
        }
        outcome
    }

    /// Document-level focus-in; returns `true` when focus was pulled back
    pub fn handle_focus_in(&mut self, target: ElementId) -> bool {
        self.focus.handle_focus_in(target)
    }

    /// Host timer fired
    pub fn on_timer(&mut self, timer: TimerId) -> bool {
        self.focus.on_timer(timer)
    }

    fn focus_in_text_field(&self) -> bool {
        let host = self.focus.host();
        host.active_element()
            .and_then(|id| host.element(id))
            .is_some_and(|e| e.is_text_editable())
    }

    pub fn pointer_down(&mut self, pointer: Position) {
        if self.render == RenderMode::Trigger {
            self.position.start_drag(pointer);
        }
    }

    /// New trigger offset while dragging
    pub fn pointer_move(&mut self, pointer: Position) -> Option<Position> {
        self.position.move_drag(pointer)
    }

    /// Finish a press. A release without movement is a click on the trigger
    /// and toggles the panel.
    pub fn pointer_up(&mut self) -> Option<DragEnd> {
        let end = self.position.end_drag()?;
        if !end.moved {
            self.toggle_panel();
        }
        Some(end)
    }

    pub fn hide(&mut self, option: HideOption) -> RenderMode {
        self.visibility.choose_hide(option);
        self.refresh()
    }

    pub fn minimize(&mut self) -> RenderMode {
        self.visibility.minimize();
        self.refresh()
    }

    pub fn expand(&mut self) -> RenderMode {
        self.visibility.expand();
        self.refresh()
    }

    pub fn show(&mut self) -> RenderMode {
        self.visibility.show();
        self.refresh()
    }

    /// Change one setting if the site owner left the control enabled
    pub fn update_setting(&mut self, key: SettingKey, value: SettingValue) -> bool {
        if !self.admin.is_feature_enabled(FeatureKey::from(key)) {
            debug!(key = %key, "Setting change blocked, feature disabled by admin");
            return false;
        }
        self.settings.update(key, value)
    }

    pub fn apply_profile(&mut self, profile: AccessibilityProfile) -> bool {
        if !self.admin.is_feature_enabled(FeatureKey::Profiles) {
            debug!(profile = profile.name(), "Profile blocked, feature disabled by admin");
            return false;
        }
        self.settings.apply_profile(profile);
        true
    }

    pub fn settings(&mut self) -> &mut SettingsReconciler {
        &mut self.settings
    }

    pub fn admin(&self) -> &AdminSyncReconciler {
        &self.admin
    }

    pub fn position(&self) -> &PositionEngine {
        &self.position
    }

    pub fn focus(&self) -> &FocusContainment<H> {
        &self.focus
    }
}

/// Admin trigger overrides merged over the widget's own position config,
/// then clamped like a loaded config
fn trigger_geometry(base: PositionConfig, trigger: &TriggerSection) -> PositionConfig {
    let mut merged = PositionConfig {
        side: trigger.side.unwrap_or(base.side),
        margin_from_edge: trigger.offset_x.unwrap_or(base.margin_from_edge),
        bottom_margin: trigger.offset_y.unwrap_or(base.bottom_margin),
        ..base
    };
    merged.validate_and_clamp();
    merged
}

impl<H: FocusHost> Drop for Widget<H> {
    fn drop(&mut self) {
        self.position.cancel_drag();
        self.close_panel();
        debug!("Widget unmounted");
    }
}

//! Focus containment for modal regions
//!
//! `FocusContainment` keeps keyboard focus inside one container while it is
//! active and hands focus back to where it was when it deactivates. The
//! document itself is reached through [`FocusHost`].
//!
//! # Invariants
//!
//! 1. **Closed loop**: Tab on the last focusable descendant moves to the
//!    first; Shift+Tab on the first moves to the last. The focusable list is
//!    recomputed on every key press.
//! 2. **No escape**: focus landing outside the container is pulled back to
//!    the first focusable descendant.
//! 3. **Restoration**: deactivation returns focus to the element focused
//!    before activation, if it is still in the document.
//! 4. **Release**: every listener and pending timer acquired on activation is
//!    released on deactivation, on re-activation and on drop.
//!
//! # Failure Modes
//!
//! - A container without focusable descendants receives focus itself.
//! - A snapshot element removed while active is a no-op restore.

use std::fmt;
use std::rc::Rc;
use tracing::{debug, info};

use crate::config::FocusConfig;
use crate::input::{Key, KeyInput};

/// Opaque element handle issued by the host
pub type ElementId = u64;

/// Listener registration handle
pub type ListenerId = u64;

/// Timer registration handle
pub type TimerId = u64;

/// Document-level listener kinds the trap installs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    KeyDown,
    FocusIn,
}

/// Tab index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TabIndex {
    /// Attribute absent; native focusability applies
    #[default]
    Unset,
    /// Negative value: focusable by script only
    Programmatic,
    /// Zero or positive value
    Sequential(i32),
}

impl TabIndex {
    pub fn parse(value: &str) -> Self {
        match value.trim().parse::<i32>() {
            Ok(n) if n < 0 => Self::Programmatic,
            Ok(n) => Self::Sequential(n),
            Err(_) => Self::Unset,
        }
    }
}

/// Element category relevant to focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Link,
    Button,
    /// Free-text input (text, search, email, ...)
    TextInput,
    /// Non-text input (checkbox, radio, range, ...)
    Input,
    HiddenInput,
    Select,
    TextArea,
    Summary,
    Generic,
}

/// Focus-relevant snapshot of one element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementInfo {
    pub id: ElementId,
    pub kind: ElementKind,
    pub has_href: bool,
    pub tab_index: TabIndex,
    pub disabled: bool,
    /// Has a layout box (not `display: none`)
    pub rendered: bool,
    /// Not `visibility: hidden`
    pub visible: bool,
    /// Inside an inert subtree
    pub inert: bool,
    pub content_editable: bool,
}

impl ElementInfo {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            id: 0,
            kind,
            has_href: false,
            tab_index: TabIndex::Unset,
            disabled: false,
            rendered: true,
            visible: true,
            inert: false,
            content_editable: false,
        }
    }

    pub fn link() -> Self {
        Self {
            has_href: true,
            ..Self::new(ElementKind::Link)
        }
    }

    pub fn button() -> Self {
        Self::new(ElementKind::Button)
    }

    pub fn generic() -> Self {
        Self::new(ElementKind::Generic)
    }

    pub fn with_tab_index(mut self, tab_index: i32) -> Self {
        self.tab_index = if tab_index < 0 {
            TabIndex::Programmatic
        } else {
            TabIndex::Sequential(tab_index)
        };
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn not_rendered(mut self) -> Self {
        self.rendered = false;
        self
    }

    pub fn invisible(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn inert(mut self) -> Self {
        self.inert = true;
        self
    }

    pub fn editable(mut self) -> Self {
        self.content_editable = true;
        self
    }

    fn is_available(&self) -> bool {
        !self.disabled && self.rendered && self.visible && !self.inert
    }

    fn is_natively_focusable(&self) -> bool {
        match self.kind {
            ElementKind::Link => self.has_href,
            ElementKind::Button
            | ElementKind::TextInput
            | ElementKind::Input
            | ElementKind::Select
            | ElementKind::TextArea
            | ElementKind::Summary => true,
            ElementKind::HiddenInput => false,
            ElementKind::Generic => self.content_editable,
        }
    }

    /// Reachable with Tab
    pub fn is_tabbable(&self) -> bool {
        if !self.is_available() {
            return false;
        }
        match self.tab_index {
            TabIndex::Programmatic => false,
            TabIndex::Sequential(_) => true,
            TabIndex::Unset => self.is_natively_focusable(),
        }
    }

    /// Focusable by script
    pub fn is_focusable(&self) -> bool {
        self.is_available() && (self.tab_index != TabIndex::Unset || self.is_natively_focusable())
    }

    /// Accepts typed text, so single-letter shortcuts must not fire here
    pub fn is_text_editable(&self) -> bool {
        matches!(self.kind, ElementKind::TextInput | ElementKind::TextArea) || self.content_editable
    }
}

/// Document operations the trap needs
pub trait FocusHost {
    fn active_element(&self) -> Option<ElementId>;

    /// Move focus; `false` when the element is gone or not focusable
    fn focus(&self, id: ElementId) -> bool;

    fn is_connected(&self, id: ElementId) -> bool;

    /// Inclusive containment, like `Node.contains`
    fn contains(&self, container: ElementId, id: ElementId) -> bool;

    /// Live descendants of `container` in document order, with inherited
    /// inert/rendered/visible state already applied
    fn descendants(&self, container: ElementId) -> Vec<ElementInfo>;

    fn element(&self, id: ElementId) -> Option<ElementInfo>;

    /// Give `id` a negative tab index if it has none
    fn ensure_programmatic_focus(&self, id: ElementId);

    fn add_listener(&self, kind: ListenerKind) -> ListenerId;
    fn remove_listener(&self, id: ListenerId);
    fn set_timeout(&self, delay_ms: u64) -> TimerId;
    fn clear_timeout(&self, id: TimerId);
}

impl<H: FocusHost + ?Sized> FocusHost for Rc<H> {
    fn active_element(&self) -> Option<ElementId> {
        (**self).active_element()
    }

    fn focus(&self, id: ElementId) -> bool {
        (**self).focus(id)
    }

    fn is_connected(&self, id: ElementId) -> bool {
        (**self).is_connected(id)
    }

    fn contains(&self, container: ElementId, id: ElementId) -> bool {
        (**self).contains(container, id)
    }

    fn descendants(&self, container: ElementId) -> Vec<ElementInfo> {
        (**self).descendants(container)
    }

    fn element(&self, id: ElementId) -> Option<ElementInfo> {
        (**self).element(id)
    }

    fn ensure_programmatic_focus(&self, id: ElementId) {
        (**self).ensure_programmatic_focus(id)
    }

    fn add_listener(&self, kind: ListenerKind) -> ListenerId {
        (**self).add_listener(kind)
    }

    fn remove_listener(&self, id: ListenerId) {
        (**self).remove_listener(id)
    }

    fn set_timeout(&self, delay_ms: u64) -> TimerId {
        (**self).set_timeout(delay_ms)
    }

    fn clear_timeout(&self, id: TimerId) {
        (**self).clear_timeout(id)
    }
}

/// What the caller should do with the key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Focus was moved; suppress the default action
    Handled,
    /// Let the default tab order proceed
    Default,
    /// Escape was pressed and the cancellation callback ran
    Escaped,
}

/// Snapshot taken at activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusSession {
    pub previously_focused: Option<ElementId>,
    pub container: ElementId,
}

struct ActiveTrap {
    session: FocusSession,
    listeners: Vec<ListenerId>,
    pending_focus: Option<TimerId>,
    on_escape: Box<dyn FnMut()>,
}

enum TrapState {
    Inactive,
    Active(ActiveTrap),
}

/// Keyboard focus trap over one container at a time
pub struct FocusContainment<H: FocusHost> {
    host: H,
    config: FocusConfig,
    state: TrapState,
}

impl<H: FocusHost> FocusContainment<H> {
    pub fn new(host: H, config: FocusConfig) -> Self {
        Self {
            host,
            config,
            state: TrapState::Inactive,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, TrapState::Active(_))
    }

    pub fn session(&self) -> Option<FocusSession> {
        match &self.state {
            TrapState::Active(trap) => Some(trap.session),
            TrapState::Inactive => None,
        }
    }

    /// Timer awaiting the delayed initial focus, if any
    pub fn pending_timer(&self) -> Option<TimerId> {
        match &self.state {
            TrapState::Active(trap) => trap.pending_focus,
            TrapState::Inactive => None,
        }
    }

    /// Start trapping focus inside `container`. `on_escape` runs when Escape
    /// is pressed while active. An already active trap is released first.
    pub fn activate(&mut self, container: ElementId, on_escape: impl FnMut() + 'static) {
        if self.is_active() {
            self.deactivate();
        }

        let previously_focused = self.host.active_element();
        let listeners = vec![
            self.host.add_listener(ListenerKind::KeyDown),
            self.host.add_listener(ListenerKind::FocusIn),
        ];

        let delay = self.config.initial_focus_delay_ms;
        let pending_focus = if delay == 0 {
            self.focus_first(container);
            None
        } else {
            Some(self.host.set_timeout(delay))
        };

        info!(container, previous = ?previously_focused, delay_ms = delay, "Focus trap activated");
        self.state = TrapState::Active(ActiveTrap {
            session: FocusSession {
                previously_focused,
                container,
            },
            listeners,
            pending_focus,
            on_escape: Box::new(on_escape),
        });
    }

    /// Delayed initial focus fired. Returns `true` when `timer` belonged to
    /// the active trap.
    pub fn on_timer(&mut self, timer: TimerId) -> bool {
        let container = match &mut self.state {
            TrapState::Active(trap) if trap.pending_focus == Some(timer) => {
                trap.pending_focus = None;
                trap.session.container
            }
            _ => return false,
        };
        self.focus_first(container);
        true
    }

    /// Document-level key-down while the trap may be active
    pub fn handle_key(&mut self, key: &KeyInput) -> KeyOutcome {
        let TrapState::Active(trap) = &mut self.state else {
            return KeyOutcome::Default;
        };

        match key.key {
            Key::Escape => {
                debug!(container = trap.session.container, "Escape pressed in focus trap");
                (trap.on_escape)();
                KeyOutcome::Escaped
            }
            Key::Tab => {
                let container = trap.session.container;
                self.cycle(container, key.modifiers.shift)
            }
            _ => KeyOutcome::Default,
        }
    }

    /// Document-level focus-in. Returns `true` when focus was pulled back.
    pub fn handle_focus_in(&mut self, target: ElementId) -> bool {
        let TrapState::Active(trap) = &self.state else {
            return false;
        };
        let container = trap.session.container;
        if self.host.contains(container, target) {
            return false;
        }

        debug!(container, target, "Focus escaped trap, redirecting");
        self.focus_first(container);
        true
    }

    /// Stop trapping, release listeners and timers, and restore focus
    pub fn deactivate(&mut self) {
        let TrapState::Active(trap) = std::mem::replace(&mut self.state, TrapState::Inactive) else {
            return;
        };

        if let Some(timer) = trap.pending_focus {
            self.host.clear_timeout(timer);
        }
        for listener in trap.listeners {
            self.host.remove_listener(listener);
        }

        match trap.session.previously_focused {
            Some(previous) if self.host.is_connected(previous) => {
                self.host.focus(previous);
                info!(container = trap.session.container, restored = previous, "Focus trap released");
            }
            previous => {
                debug!(container = trap.session.container, previous = ?previous, "Focus trap released without restore target");
            }
        }
    }

    /// Tabbable descendants of `container` in sequential navigation order,
    /// recomputed from the live document. Positive tab indices come first in
    /// ascending order, then everything else in document order.
    pub fn tabbable(&self, container: ElementId) -> Vec<ElementId> {
        let mut elements: Vec<ElementInfo> = self
            .host
            .descendants(container)
            .into_iter()
            .filter(ElementInfo::is_tabbable)
            .collect();
        // Stable sort keeps document order within equal keys
        elements.sort_by_key(|e| match e.tab_index {
            TabIndex::Sequential(n) if n > 0 => n,
            _ => i32::MAX,
        });
        elements.into_iter().map(|e| e.id).collect()
    }

    fn focus_first(&self, container: ElementId) {
        match self.tabbable(container).first() {
            Some(&first) => {
                self.host.focus(first);
            }
            None => self.focus_container(container),
        }
    }

    fn focus_container(&self, container: ElementId) {
        self.host.ensure_programmatic_focus(container);
        self.host.focus(container);
    }

    fn cycle(&self, container: ElementId, backwards: bool) -> KeyOutcome {
        let focusables = self.tabbable(container);
        let (Some(&first), Some(&last)) = (focusables.first(), focusables.last()) else {
            self.focus_container(container);
            return KeyOutcome::Handled;
        };

        let active = self.host.active_element();
        let outside = !active.is_some_and(|a| self.host.contains(container, a));

        if backwards && (outside || active == Some(first) || active == Some(container)) {
            self.host.focus(last);
            KeyOutcome::Handled
        } else if !backwards && (outside || active == Some(last)) {
            self.host.focus(first);
            KeyOutcome::Handled
        } else {
            KeyOutcome::Default
        }
    }
}

impl<H: FocusHost> Drop for FocusContainment<H> {
    fn drop(&mut self) {
        self.deactivate();
    }
}

impl<H: FocusHost> fmt::Debug for FocusContainment<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusContainment")
            .field("session", &self.session())
            .field("pending_timer", &self.pending_timer())
            .finish()
    }
}

//! Keyboard input as seen by the widget

/// Logical key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Tab,
    Escape,
    Enter,
    Space,
    /// Printable character (layout-independent letter for shortcuts)
    Char(char),
    Other,
}

/// Held modifier keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ..Modifiers::NONE
    };

    pub const ALT: Modifiers = Modifiers {
        alt: true,
        ..Modifiers::NONE
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };

    pub const META: Modifiers = Modifiers {
        meta: true,
        ..Modifiers::NONE
    };
}

/// One key-down event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyInput {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn tab() -> Self {
        Self::new(Key::Tab, Modifiers::NONE)
    }

    pub fn shift_tab() -> Self {
        Self::new(Key::Tab, Modifiers::SHIFT)
    }

    pub fn escape() -> Self {
        Self::new(Key::Escape, Modifiers::NONE)
    }

    pub fn chord(modifiers: Modifiers, c: char) -> Self {
        Self::new(Key::Char(c), modifiers)
    }
}

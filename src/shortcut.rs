//! Global keyboard shortcut (`Modifier+Letter`)

use std::fmt;
use std::str::FromStr;

use crate::input::{Key, KeyInput, Modifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Alt,
    Ctrl,
    Shift,
    Meta,
}

impl Modifier {
    fn held(&self) -> Modifiers {
        match self {
            Modifier::Alt => Modifiers::ALT,
            Modifier::Ctrl => Modifiers::CTRL,
            Modifier::Shift => Modifiers::SHIFT,
            Modifier::Meta => Modifiers::META,
        }
    }
}

impl FromStr for Modifier {
    type Err = ShortcutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alt" | "option" => Ok(Modifier::Alt),
            "ctrl" | "control" => Ok(Modifier::Ctrl),
            "shift" => Ok(Modifier::Shift),
            "meta" | "cmd" | "command" | "super" => Ok(Modifier::Meta),
            _ => Err(ShortcutParseError::UnknownModifier(s.to_string())),
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Modifier::Alt => "Alt",
            Modifier::Ctrl => "Ctrl",
            Modifier::Shift => "Shift",
            Modifier::Meta => "Meta",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShortcutParseError {
    #[error("shortcut is empty")]
    Empty,

    #[error("shortcut '{0}' must be exactly one modifier and one letter")]
    WrongShape(String),

    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),

    #[error("shortcut key '{0}' is not a single letter")]
    InvalidKey(String),
}

/// One modifier plus one ASCII letter; the letter is stored lowercase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortcut {
    pub modifier: Modifier,
    pub key: char,
}

impl Default for Shortcut {
    fn default() -> Self {
        Self {
            modifier: Modifier::Alt,
            key: 'a',
        }
    }
}

impl Shortcut {
    /// Exactly the configured modifier held and the letter pressed, any case
    pub fn matches(&self, input: &KeyInput) -> bool {
        match input.key {
            Key::Char(c) => c.eq_ignore_ascii_case(&self.key) && input.modifiers == self.modifier.held(),
            _ => false,
        }
    }
}

impl FromStr for Shortcut {
    type Err = ShortcutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ShortcutParseError::Empty);
        }

        let parts: Vec<&str> = trimmed.split('+').map(str::trim).collect();
        let [modifier, key] = parts.as_slice() else {
            return Err(ShortcutParseError::WrongShape(trimmed.to_string()));
        };
        let modifier: Modifier = modifier.parse()?;

        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => Ok(Self {
                modifier,
                key: c.to_ascii_lowercase(),
            }),
            _ => Err(ShortcutParseError::InvalidKey(key.to_string())),
        }
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.modifier, self.key.to_ascii_uppercase())
    }
}

//! Pointer and keyboard event types delivered by the host.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn primary(&self) -> bool {
        self.ctrl || self.meta
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_primary(mut self) -> Self {
        self.ctrl = true;
        self
    }
}

/// Keys the editor reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Escape,
    Delete,
    Backspace,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Character(char),
    Other(String),
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Key::Escape,
            "Delete" | "Del" => Key::Delete,
            "Backspace" => Key::Backspace,
            "ArrowUp" | "Up" => Key::ArrowUp,
            "ArrowDown" | "Down" => Key::ArrowDown,
            "ArrowLeft" | "Left" => Key::ArrowLeft,
            "ArrowRight" | "Right" => Key::ArrowRight,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Character(c.to_ascii_lowercase()),
                    _ => Key::Other(name.to_string()),
                }
            }
        }
    }

    /// Unit direction of an arrow key.
    pub fn arrow_direction(&self) -> Option<(f64, f64)> {
        match self {
            Key::ArrowUp => Some((0.0, -1.0)),
            Key::ArrowDown => Some((0.0, 1.0)),
            Key::ArrowLeft => Some((-1.0, 0.0)),
            Key::ArrowRight => Some((1.0, 0.0)),
            _ => None,
        }
    }
}

/// Where keyboard focus was when the key went down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyTarget {
    /// The editing surface or page body.
    #[default]
    Surface,
    /// A plain text field elsewhere in the UI.
    TextInput,
    /// A content-editable region (text-edit mode).
    ContentEditable,
}

impl KeyTarget {
    pub fn is_editable(&self) -> bool {
        !matches!(self, KeyTarget::Surface)
    }
}

/// Keyboard event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: Key,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub target: KeyTarget,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
            target: KeyTarget::Surface,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_target(mut self, target: KeyTarget) -> Self {
        self.target = target;
        self
    }
}

/// What the host should do with a key after the editor saw it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyOutcome {
    /// The editor acted on the key.
    pub handled: bool,
    /// The host should suppress the browser default.
    pub prevent_default: bool,
}

impl KeyOutcome {
    pub const IGNORED: Self = Self {
        handled: false,
        prevent_default: false,
    };
    pub const HANDLED: Self = Self {
        handled: true,
        prevent_default: true,
    };
}

/// Pointer event type, viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Move {
        position: Point,
    },
    Up {
        position: Point,
    },
    Hover {
        position: Point,
    },
}

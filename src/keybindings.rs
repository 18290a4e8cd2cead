//! Customizable keybindings for BBAT.
//!
//! Holding the mode key (Alt by default) switches the annotator into adjust mode,
//! where boxes can be created and edited; releasing it returns to view mode.
//! Everything else is a one-shot [`Shortcut`].

use serde::{Deserialize, Serialize};

/// Maximum number of classes that can have hotkeys (0-9 keys).
pub const MAX_CLASS_HOTKEYS: usize = 10;

/// A physical key, as reported by the surrounding UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCode {
    Alt,
    Control,
    Shift,
    Meta,
    Escape,
    Delete,
    Backspace,
    /// Top-row digit 0-9.
    Digit(u8),
    /// Any other printable key.
    Char(char),
}

impl KeyCode {
    /// Case-insensitive identity for printable keys.
    fn normalized(self) -> Self {
        match self {
            KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
            other => other,
        }
    }
}

/// Modifier keys held during a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
    /// Cmd on macOS.
    #[serde(default)]
    pub meta: bool,
}

impl Modifiers {
    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::default()
        }
    }

    pub fn ctrl_shift() -> Self {
        Self {
            ctrl: true,
            shift: true,
            ..Self::default()
        }
    }

    /// Ctrl or Cmd.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Action triggered by a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Undo,
    Redo,
    /// Abort the gesture in progress.
    Cancel,
    /// Delete the box being edited.
    DeleteSelected,
    /// Make the class at this index the one given to new boxes.
    SelectClass(usize),
}

/// Keybinding configuration for the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    /// Held to enable box creation and adjustment
    pub mode: KeyCode,
    /// With Ctrl/Cmd: undo. With Ctrl/Cmd+Shift: redo.
    pub undo: KeyCode,
    /// With Ctrl/Cmd: redo
    pub redo: KeyCode,
    pub cancel: KeyCode,
    pub delete: Vec<KeyCode>,

    /// Hotkeys for class selection (indices 0-9 map to classes 0-9)
    /// None means no hotkey assigned for that slot
    pub class_hotkeys: Vec<Option<KeyCode>>,
}

fn default_class_hotkeys() -> Vec<Option<KeyCode>> {
    // 1-9 then 0, matching the keyboard row.
    (1..=9u8)
        .chain(std::iter::once(0))
        .map(|d| Some(KeyCode::Digit(d)))
        .collect()
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            mode: KeyCode::Alt,
            undo: KeyCode::Char('z'),
            redo: KeyCode::Char('y'),
            cancel: KeyCode::Escape,
            delete: vec![KeyCode::Delete, KeyCode::Backspace],
            class_hotkeys: default_class_hotkeys(),
        }
    }
}

impl KeyBindings {
    /// Create new keybindings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is the adjust-mode key.
    pub fn is_mode_key(&self, key: KeyCode) -> bool {
        key.normalized() == self.mode.normalized()
    }

    /// Get the shortcut that corresponds to a key press, if any.
    pub fn shortcut_for(&self, key: KeyCode, modifiers: Modifiers) -> Option<Shortcut> {
        let key = key.normalized();

        if modifiers.command() {
            if key == self.undo.normalized() {
                return Some(if modifiers.shift {
                    Shortcut::Redo
                } else {
                    Shortcut::Undo
                });
            }
            if key == self.redo.normalized() {
                return Some(Shortcut::Redo);
            }
            return None;
        }

        if key == self.cancel.normalized() {
            return Some(Shortcut::Cancel);
        }
        if self.delete.iter().any(|k| k.normalized() == key) {
            return Some(Shortcut::DeleteSelected);
        }
        self.class_index_for_key(key).map(Shortcut::SelectClass)
    }

    /// Get the class index that corresponds to a key press, if any.
    pub fn class_index_for_key(&self, key: KeyCode) -> Option<usize> {
        let key = key.normalized();
        self.class_hotkeys
            .iter()
            .take(MAX_CLASS_HOTKEYS)
            .position(|hotkey| hotkey.map(KeyCode::normalized) == Some(key))
    }

    /// Set the hotkey for a class slot. Slots beyond the maximum are ignored.
    pub fn set_class_key(&mut self, index: usize, key: Option<KeyCode>) {
        if index >= MAX_CLASS_HOTKEYS {
            return;
        }
        if self.class_hotkeys.len() <= index {
            self.class_hotkeys.resize(index + 1, None);
        }
        self.class_hotkeys[index] = key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo() {
        let bindings = KeyBindings::default();
        assert_eq!(
            bindings.shortcut_for(KeyCode::Char('z'), Modifiers::ctrl()),
            Some(Shortcut::Undo)
        );
        assert_eq!(
            bindings.shortcut_for(KeyCode::Char('Z'), Modifiers::ctrl_shift()),
            Some(Shortcut::Redo)
        );
        let cmd = Modifiers {
            meta: true,
            ..Modifiers::default()
        };
        assert_eq!(
            bindings.shortcut_for(KeyCode::Char('z'), cmd),
            Some(Shortcut::Undo)
        );
        assert_eq!(
            bindings.shortcut_for(KeyCode::Char('y'), Modifiers::ctrl()),
            Some(Shortcut::Redo)
        );
    }

    #[test]
    fn test_plain_z_is_not_undo() {
        let bindings = KeyBindings::default();
        assert_eq!(
            bindings.shortcut_for(KeyCode::Char('z'), Modifiers::default()),
            None
        );
    }

    #[test]
    fn test_cancel_delete_and_classes() {
        let bindings = KeyBindings::default();
        let none = Modifiers::default();
        assert_eq!(
            bindings.shortcut_for(KeyCode::Escape, none),
            Some(Shortcut::Cancel)
        );
        assert_eq!(
            bindings.shortcut_for(KeyCode::Backspace, none),
            Some(Shortcut::DeleteSelected)
        );
        assert_eq!(
            bindings.shortcut_for(KeyCode::Digit(1), none),
            Some(Shortcut::SelectClass(0))
        );
        assert_eq!(
            bindings.shortcut_for(KeyCode::Digit(0), none),
            Some(Shortcut::SelectClass(9))
        );
    }

    #[test]
    fn test_mode_key() {
        let bindings = KeyBindings::default();
        assert!(bindings.is_mode_key(KeyCode::Alt));
        assert!(!bindings.is_mode_key(KeyCode::Shift));
    }

    #[test]
    fn test_modifier_keys_as_mode_key() {
        let bindings: KeyBindings = serde_json::from_str(r#"{"mode":"control"}"#).expect("parse");
        assert!(bindings.is_mode_key(KeyCode::Control));
        assert!(!bindings.is_mode_key(KeyCode::Alt));

        let bindings = KeyBindings {
            mode: KeyCode::Meta,
            ..KeyBindings::default()
        };
        assert!(bindings.is_mode_key(KeyCode::Meta));
        assert_eq!(bindings.shortcut_for(KeyCode::Meta, Modifiers::default()), None);
    }

    #[test]
    fn test_set_class_key() {
        let mut bindings = KeyBindings::default();
        bindings.set_class_key(0, Some(KeyCode::Char('q')));
        assert_eq!(bindings.class_index_for_key(KeyCode::Char('Q')), Some(0));
        assert_eq!(bindings.class_index_for_key(KeyCode::Digit(1)), None);
        bindings.set_class_key(42, Some(KeyCode::Char('w')));
        assert_eq!(bindings.class_index_for_key(KeyCode::Char('w')), None);
    }
}

//! Hotkey system
//!
//! Centralized hotkey management for the editor.
//!
//! # Architecture
//!
//! - **Key**: The key that was pressed, independent of any windowing toolkit
//! - **HotkeyAction**: Enum of all possible actions that can be triggered by hotkeys
//! - **HotkeyContext**: Determines which hotkeys are active based on editor state
//! - **handle_hotkey()**: Main dispatch function that maps key events to actions
//!
//! # Adding New Hotkeys
//!
//! 1. Add a variant to `HotkeyAction`
//! 2. Add the key binding in `handle_hotkey()`
//! 3. Handle the action in `EditorSession::apply_hotkey`

/// A pressed key as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// A printable key; the string is what the key produces.
    Character(String),
    Delete,
    Backspace,
    Escape,
    Enter,
    Other(String),
}

impl Key {
    pub fn character(value: &str) -> Self {
        Key::Character(value.to_string())
    }

    fn is_char(&self, expected: &str) -> bool {
        matches!(self, Key::Character(c) if c.eq_ignore_ascii_case(expected))
    }
}

/// All possible actions that can be triggered by hotkeys.
///
/// Each variant represents a semantic action, not a key binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    // ═══════════════════════════════════════════════════════════════
    // History
    // ═══════════════════════════════════════════════════════════════
    Undo,
    Redo,

    // ═══════════════════════════════════════════════════════════════
    // Editing
    // ═══════════════════════════════════════════════════════════════
    /// Split the selected clip at the playhead.
    SplitAtPlayhead,
    /// Delete the selected clip.
    DeleteSelection,
    /// Delete the selected clip and close the gap on its track.
    RippleDeleteSelection,

    // ═══════════════════════════════════════════════════════════════
    // Transport and view
    // ═══════════════════════════════════════════════════════════════
    /// Toggle playback.
    PlayPause,
    /// Zoom in on the timeline (increase pixels per second)
    TimelineZoomIn,
    /// Zoom out on the timeline (decrease pixels per second)
    TimelineZoomOut,
}

/// Context information that affects which hotkeys are active.
#[derive(Debug, Clone, Default)]
pub struct HotkeyContext {
    /// Whether any clip is selected
    pub has_selection: bool,
    /// Whether an input field has focus (suppresses every hotkey)
    pub input_focused: bool,
}

/// Result of processing a key event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotkeyResult {
    /// A hotkey action was matched and should be executed
    Action(HotkeyAction),
    /// No matching hotkey for this key/context combination
    NoMatch,
    /// Hotkey would match but is suppressed (e.g., input field focused)
    Suppressed,
}

/// Maps a key event to an action, considering the current context.
///
/// Ctrl and Cmd (meta) are interchangeable.
pub fn handle_hotkey(
    key: &Key,
    shift: bool,
    ctrl: bool,
    _alt: bool,
    meta: bool,
    context: &HotkeyContext,
) -> HotkeyResult {
    // Suppress hotkeys when typing in an input field
    if context.input_focused {
        return HotkeyResult::Suppressed;
    }
    let command = ctrl || meta;

    // ═══════════════════════════════════════════════════════════════
    // Command Hotkeys
    // ═══════════════════════════════════════════════════════════════
    if command {
        if key.is_char("z") {
            let action = if shift {
                HotkeyAction::Redo
            } else {
                HotkeyAction::Undo
            };
            return HotkeyResult::Action(action);
        }
        if key.is_char("y") {
            return HotkeyResult::Action(HotkeyAction::Redo);
        }
        if key.is_char("b") {
            return HotkeyResult::Action(HotkeyAction::SplitAtPlayhead);
        }
        return HotkeyResult::NoMatch;
    }

    // ═══════════════════════════════════════════════════════════════
    // Global Hotkeys
    // ═══════════════════════════════════════════════════════════════
    match key {
        Key::Character(c) if c == "+" || c == "=" => {
            return HotkeyResult::Action(HotkeyAction::TimelineZoomIn)
        }
        Key::Character(c) if c == "-" => return HotkeyResult::Action(HotkeyAction::TimelineZoomOut),
        Key::Character(c) if c == " " => return HotkeyResult::Action(HotkeyAction::PlayPause),
        _ => {}
    }

    // ═══════════════════════════════════════════════════════════════
    // Selection Hotkeys
    // ═══════════════════════════════════════════════════════════════
    if context.has_selection && *key == Key::Delete {
        let action = if shift {
            HotkeyAction::RippleDeleteSelection
        } else {
            HotkeyAction::DeleteSelection
        };
        return HotkeyResult::Action(action);
    }

    HotkeyResult::NoMatch
}

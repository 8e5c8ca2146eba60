//! Mode-aware key resolution.
//!
//! Keys are resolved against the active [`KeyContext`] into a [`KeyBinding`];
//! anything unbound falls through to text entry (chat input or picker
//! filter).

use std::collections::HashMap;

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Pattern for matching key events
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPattern {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyPattern {
    pub fn simple(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::CONTROL,
        }
    }

    pub fn ch(c: char) -> Self {
        Self::simple(KeyCode::Char(c))
    }
}

impl From<&KeyEvent> for KeyPattern {
    fn from(key: &KeyEvent) -> Self {
        // Terminals report SHIFT for upper-case letters; the char already says so.
        let modifiers = match key.code {
            KeyCode::Char(_) => key.modifiers.difference(KeyModifiers::SHIFT),
            _ => key.modifiers,
        };
        Self {
            code: key.code,
            modifiers,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyContext {
    Chat,
    /// Filterable list (gems, history)
    Picker,
    /// Picker navigation letters, active only while the filter is empty
    PickerNav,
    ImagePicker,
    ConfirmTool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyBinding {
    Quit,
    Cancel,
    Submit,
    OpenGems,
    OpenExport,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    Up,
    Down,
    Home,
    End,
    Backspace,
    Toggle,
    SelectAll,
    SelectNone,
    Approve,
    Deny,
}

pub struct Keymap {
    bindings: HashMap<KeyContext, HashMap<KeyPattern, KeyBinding>>,
}

impl Keymap {
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    pub fn bind(&mut self, context: KeyContext, pattern: KeyPattern, binding: KeyBinding) {
        self.bindings
            .entry(context)
            .or_default()
            .insert(pattern, binding);
    }

    pub fn standard() -> Self {
        use KeyBinding::*;
        use KeyContext::*;

        let mut map = Self::new();

        map.bind(Chat, KeyPattern::ctrl(KeyCode::Char('c')), Quit);
        map.bind(Chat, KeyPattern::simple(KeyCode::Esc), Cancel);
        map.bind(Chat, KeyPattern::simple(KeyCode::Enter), Submit);
        map.bind(Chat, KeyPattern::ctrl(KeyCode::Char('g')), OpenGems);
        map.bind(Chat, KeyPattern::ctrl(KeyCode::Char('e')), OpenExport);
        map.bind(Chat, KeyPattern::ctrl(KeyCode::Up), ScrollUp);
        map.bind(Chat, KeyPattern::ctrl(KeyCode::Down), ScrollDown);
        map.bind(Chat, KeyPattern::simple(KeyCode::PageUp), PageUp);
        map.bind(Chat, KeyPattern::simple(KeyCode::PageDown), PageDown);

        map.bind(Picker, KeyPattern::ctrl(KeyCode::Char('c')), Quit);
        map.bind(Picker, KeyPattern::simple(KeyCode::Esc), Cancel);
        map.bind(Picker, KeyPattern::simple(KeyCode::Enter), Submit);
        map.bind(Picker, KeyPattern::simple(KeyCode::Up), Up);
        map.bind(Picker, KeyPattern::simple(KeyCode::Down), Down);
        map.bind(Picker, KeyPattern::simple(KeyCode::Home), Home);
        map.bind(Picker, KeyPattern::simple(KeyCode::End), End);
        map.bind(Picker, KeyPattern::simple(KeyCode::Backspace), Backspace);

        map.bind(PickerNav, KeyPattern::ch('k'), Up);
        map.bind(PickerNav, KeyPattern::ch('j'), Down);
        map.bind(PickerNav, KeyPattern::ch('g'), Home);
        map.bind(PickerNav, KeyPattern::ch('G'), End);

        map.bind(ImagePicker, KeyPattern::ctrl(KeyCode::Char('c')), Cancel);
        map.bind(ImagePicker, KeyPattern::simple(KeyCode::Esc), Cancel);
        map.bind(ImagePicker, KeyPattern::ch('q'), Cancel);
        map.bind(ImagePicker, KeyPattern::simple(KeyCode::Enter), Submit);
        map.bind(ImagePicker, KeyPattern::simple(KeyCode::Up), Up);
        map.bind(ImagePicker, KeyPattern::ch('k'), Up);
        map.bind(ImagePicker, KeyPattern::simple(KeyCode::Down), Down);
        map.bind(ImagePicker, KeyPattern::ch('j'), Down);
        map.bind(ImagePicker, KeyPattern::ch(' '), Toggle);
        map.bind(ImagePicker, KeyPattern::ch('a'), SelectAll);
        map.bind(ImagePicker, KeyPattern::ch('n'), SelectNone);

        map.bind(ConfirmTool, KeyPattern::ctrl(KeyCode::Char('c')), Quit);
        map.bind(ConfirmTool, KeyPattern::ch('y'), Approve);
        map.bind(ConfirmTool, KeyPattern::ch('Y'), Approve);
        map.bind(ConfirmTool, KeyPattern::ch('n'), Deny);
        map.bind(ConfirmTool, KeyPattern::ch('N'), Deny);
        map.bind(ConfirmTool, KeyPattern::simple(KeyCode::Esc), Deny);

        map
    }

    pub fn resolve(&self, context: KeyContext, key: &KeyEvent) -> Option<KeyBinding> {
        self.bindings
            .get(&context)?
            .get(&KeyPattern::from(key))
            .copied()
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::standard()
    }
}

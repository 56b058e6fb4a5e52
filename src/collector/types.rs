//! Key event types delivered by the capture side.

use std::time::Instant;

/// What a single keystroke means to word tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// A printable character that extends the current word
    Char(char),
    /// Remove the last buffered character
    Backspace,
    /// Space or enter: finishes the current word
    Boundary,
}

impl KeyInput {
    /// Classify a decoded character. Returns `None` for control input that
    /// carries no meaning for word tracking.
    pub fn classify(ch: char) -> Option<Self> {
        match ch {
            ' ' | '\n' | '\r' | '\t' => Some(KeyInput::Boundary),
            '\u{8}' | '\u{7f}' => Some(KeyInput::Backspace),
            c if c.is_control() => None,
            c => Some(KeyInput::Char(c)),
        }
    }
}

/// A keystroke stamped with the instant it was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub input: KeyInput,
    pub at: Instant,
}

impl KeyEvent {
    pub fn new(input: KeyInput) -> Self {
        Self {
            input,
            at: Instant::now(),
        }
    }

    pub fn at(input: KeyInput, at: Instant) -> Self {
        Self { input, at }
    }
}

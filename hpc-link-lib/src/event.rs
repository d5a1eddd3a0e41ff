use crate::keymap::KeyCode;
use serde::Serialize;
use std::fmt;

/// A key changing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub pressed: bool,
}

impl KeyEvent {
    pub fn press(code: KeyCode) -> Self {
        Self { code, pressed: true }
    }

    pub fn release(code: KeyCode) -> Self {
        Self { code, pressed: false }
    }
}

/// One touchscreen report. A lifted stylus reports zero coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TouchSample {
    pub x: u16,
    pub y: u16,
    pub pressed: bool,
}

impl TouchSample {
    pub fn down(x: u16, y: u16) -> Self {
        Self { x, y, pressed: true }
    }

    pub fn lifted() -> Self {
        Self {
            x: 0,
            y: 0,
            pressed: false,
        }
    }
}

/// Everything a link can report upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputEvent {
    Key(KeyEvent),
    Touch(TouchSample),
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = if self.pressed { "pressed" } else { "released" };
        write!(f, "{} {}", self.code, action)
    }
}

impl fmt::Display for TouchSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pressed {
            write!(f, "touch down at ({}, {})", self.x, self.y)
        } else {
            write!(f, "touch lifted")
        }
    }
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputEvent::Key(key) => key.fmt(f),
            InputEvent::Touch(touch) => touch.fmt(f),
        }
    }
}

impl From<KeyEvent> for InputEvent {
    fn from(event: KeyEvent) -> Self {
        InputEvent::Key(event)
    }
}

impl From<TouchSample> for InputEvent {
    fn from(sample: TouchSample) -> Self {
        InputEvent::Touch(sample)
    }
}

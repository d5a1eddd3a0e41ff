//! Scancode to key code tables.
//!
//! Key codes use the Linux input event numbering, so hosts that forward events
//! to evdev/uinput can pass them through unchanged. Index 0 of every table and
//! any slot holding [`KeyCode::RESERVED`] is unmapped: a scancode landing there
//! produces no event.

use serde::{Deserialize, Serialize};
use std::fmt;

use self::KeyCode as K;

/// Linux input key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub const RESERVED: Self = Self(0);
    pub const ESC: Self = Self(1);
    pub const DIGIT_1: Self = Self(2);
    pub const DIGIT_2: Self = Self(3);
    pub const DIGIT_3: Self = Self(4);
    pub const DIGIT_4: Self = Self(5);
    pub const DIGIT_5: Self = Self(6);
    pub const DIGIT_6: Self = Self(7);
    pub const DIGIT_7: Self = Self(8);
    pub const DIGIT_8: Self = Self(9);
    pub const DIGIT_9: Self = Self(10);
    pub const DIGIT_0: Self = Self(11);
    pub const MINUS: Self = Self(12);
    pub const EQUAL: Self = Self(13);
    pub const BACKSPACE: Self = Self(14);
    pub const TAB: Self = Self(15);
    pub const Q: Self = Self(16);
    pub const W: Self = Self(17);
    pub const E: Self = Self(18);
    pub const R: Self = Self(19);
    pub const T: Self = Self(20);
    pub const Y: Self = Self(21);
    pub const U: Self = Self(22);
    pub const I: Self = Self(23);
    pub const O: Self = Self(24);
    pub const P: Self = Self(25);
    pub const LEFTBRACE: Self = Self(26);
    pub const RIGHTBRACE: Self = Self(27);
    pub const ENTER: Self = Self(28);
    pub const LEFTCTRL: Self = Self(29);
    pub const A: Self = Self(30);
    pub const S: Self = Self(31);
    pub const D: Self = Self(32);
    pub const F: Self = Self(33);
    pub const G: Self = Self(34);
    pub const H: Self = Self(35);
    pub const J: Self = Self(36);
    pub const K: Self = Self(37);
    pub const L: Self = Self(38);
    pub const SEMICOLON: Self = Self(39);
    pub const APOSTROPHE: Self = Self(40);
    pub const GRAVE: Self = Self(41);
    pub const LEFTSHIFT: Self = Self(42);
    pub const BACKSLASH: Self = Self(43);
    pub const Z: Self = Self(44);
    pub const X: Self = Self(45);
    pub const C: Self = Self(46);
    pub const V: Self = Self(47);
    pub const B: Self = Self(48);
    pub const N: Self = Self(49);
    pub const M: Self = Self(50);
    pub const COMMA: Self = Self(51);
    pub const DOT: Self = Self(52);
    pub const SLASH: Self = Self(53);
    pub const RIGHTSHIFT: Self = Self(54);
    pub const KPASTERISK: Self = Self(55);
    pub const LEFTALT: Self = Self(56);
    pub const SPACE: Self = Self(57);
    pub const CAPSLOCK: Self = Self(58);
    pub const F1: Self = Self(59);
    pub const F2: Self = Self(60);
    pub const F3: Self = Self(61);
    pub const F4: Self = Self(62);
    pub const F5: Self = Self(63);
    pub const F6: Self = Self(64);
    pub const F7: Self = Self(65);
    pub const F8: Self = Self(66);
    pub const F9: Self = Self(67);
    pub const F10: Self = Self(68);
    pub const KPMINUS: Self = Self(74);
    pub const F11: Self = Self(87);
    pub const RIGHTALT: Self = Self(100);
    pub const UP: Self = Self(103);
    pub const LEFT: Self = Self(105);
    pub const RIGHT: Self = Self(106);
    pub const DOWN: Self = Self(108);
    pub const DELETE: Self = Self(111);
    pub const MUTE: Self = Self(113);
    pub const VOLUMEDOWN: Self = Self(114);
    pub const VOLUMEUP: Self = Self(115);
    pub const POWER: Self = Self(116);
    pub const CALC: Self = Self(140);
    pub const PROG1: Self = Self(148);
    pub const PROG2: Self = Self(149);
    pub const WWW: Self = Self(150);
    pub const MSDOS: Self = Self(151);
    pub const CYCLEWINDOWS: Self = Self(154);
    pub const MAIL: Self = Self(155);
    pub const RECORD: Self = Self(167);
    pub const PROG3: Self = Self(202);
    pub const SUSPEND: Self = Self(205);
    pub const EMAIL: Self = Self(215);
    pub const BRIGHTNESSDOWN: Self = Self(224);
    pub const BRIGHTNESSUP: Self = Self(225);
    pub const CALENDAR: Self = Self(397);
    pub const FN: Self = Self(464);

    pub fn is_reserved(&self) -> bool {
        *self == Self::RESERVED
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key {}", self.0)
    }
}

/// A 128-entry scancode table.
#[derive(Debug)]
pub struct Keymap {
    name: &'static str,
    codes: [KeyCode; 128],
}

impl Keymap {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Look up a scancode index (release bit already stripped).
    pub fn get(&self, index: u8) -> Option<KeyCode> {
        self.codes
            .get(usize::from(index))
            .copied()
            .filter(|code| !code.is_reserved())
    }

    /// Every key this table can produce, in table order, without duplicates.
    pub fn keys(&self) -> Vec<KeyCode> {
        let mut keys: Vec<KeyCode> = Vec::new();
        for code in self.codes.iter().filter(|c| !c.is_reserved()) {
            if !keys.contains(code) {
                keys.push(*code);
            }
        }
        keys
    }
}

/// HP Jornada 720 MCU scan codes.
pub static JORNADA720: Keymap = Keymap {
    name: "jornada720",
    codes: JORNADA720_KEYS,
};

/// NEC MobilePro 900/c matrix, function row as F1..F10.
pub static MOBILEPRO: Keymap = Keymap {
    name: "mobilepro-function-keys",
    codes: MOBILEPRO_FUNCTION_KEYS,
};

/// NEC MobilePro 900/c matrix, function row as launch keys.
pub static MOBILEPRO_SPECIAL: Keymap = Keymap {
    name: "mobilepro-special-keys",
    codes: MOBILEPRO_SPECIAL_KEYS,
};

const __: KeyCode = KeyCode::RESERVED;

// Top row reads as F1..F10.
const MOBILEPRO_FUNCTION_KEYS: [KeyCode; 128] = [
    __, __, K::F1, K::F5, K::F9, K::FN, K::ESC, K::DIGIT_1,
    K::DIGIT_9, K::Q, K::A, K::Z, K::O, K::L, __, __,
    __, __, K::F2, K::F6, K::F10, K::TAB, K::DELETE, K::DIGIT_2,
    K::DIGIT_0, K::W, K::S, K::X, K::DOT, K::ENTER, __, __,
    __, __, K::F3, K::F7, K::BRIGHTNESSUP, K::P, K::CAPSLOCK, K::DIGIT_3,
    __, K::E, K::D, K::C, K::DOWN, K::RIGHT, __, __,
    __, __, K::F4, K::F8, K::BRIGHTNESSDOWN, K::BACKSPACE, __, K::DIGIT_4,
    __, K::R, K::F, K::V, K::UP, K::LEFT, __, __,
    __, __, K::LEFTSHIFT, __, __, __, K::T, K::G,
    K::B, K::DIGIT_5, K::GRAVE, K::MSDOS, K::SEMICOLON, K::SLASH, __, __,
    __, __, __, K::LEFTCTRL, __, __, K::Y, K::H,
    K::N, K::DIGIT_6, K::MINUS, __, K::APOSTROPHE, K::BACKSLASH, __, __,
    __, __, __, __, K::LEFTALT, __, K::U, K::J,
    K::M, K::DIGIT_7, K::EQUAL, __, K::LEFTBRACE, K::RIGHTBRACE, __, __,
    __, __, __, __, __, K::RIGHTALT, K::I, K::K,
    K::COMMA, K::DIGIT_8, __, __, __, K::SPACE, K::POWER, __,
];

// Top row reads as application launch keys.
const MOBILEPRO_SPECIAL_KEYS: [KeyCode; 128] = [
    __, __, K::MAIL, K::CYCLEWINDOWS, K::RECORD, K::FN, K::ESC, K::DIGIT_1,
    K::DIGIT_9, K::Q, K::A, K::Z, K::O, K::L, __, __,
    __, __, K::WWW, K::PROG1, K::CALC, K::TAB, K::DELETE, K::DIGIT_2,
    K::DIGIT_0, K::W, K::S, K::X, K::DOT, K::ENTER, __, __,
    __, __, K::CALENDAR, K::PROG2, K::BRIGHTNESSUP, K::P, K::CAPSLOCK, K::DIGIT_3,
    __, K::E, K::D, K::C, K::DOWN, K::RIGHT, __, __,
    __, __, K::EMAIL, K::PROG3, K::BRIGHTNESSDOWN, K::BACKSPACE, __, K::DIGIT_4,
    __, K::R, K::F, K::V, K::UP, K::LEFT, __, __,
    __, __, K::LEFTSHIFT, __, __, __, K::T, K::G,
    K::B, K::DIGIT_5, K::GRAVE, K::MSDOS, K::SEMICOLON, K::SLASH, __, __,
    __, __, __, K::LEFTCTRL, __, __, K::Y, K::H,
    K::N, K::DIGIT_6, K::MINUS, __, K::APOSTROPHE, K::BACKSLASH, __, __,
    __, __, __, __, K::LEFTALT, __, K::U, K::J,
    K::M, K::DIGIT_7, K::EQUAL, __, K::LEFTBRACE, K::RIGHTBRACE, __, __,
    __, __, __, __, __, K::RIGHTALT, K::I, K::K,
    K::COMMA, K::DIGIT_8, __, __, __, K::SPACE, K::POWER, __,
];

const JORNADA720_KEYS: [KeyCode; 128] = [
    __, K::ESC, K::F1, K::F2, K::F3, K::F4, K::F5, K::F6,
    K::F7, K::F8, K::F9, K::F10, K::F11, K::VOLUMEUP, K::VOLUMEDOWN, K::MUTE,
    __, K::DIGIT_1, K::DIGIT_2, K::DIGIT_3, K::DIGIT_4, K::DIGIT_5, K::DIGIT_6, K::DIGIT_7,
    K::DIGIT_8, K::DIGIT_9, K::DIGIT_0, K::MINUS, K::EQUAL, __, __, __,
    __, K::Q, K::W, K::E, K::R, K::T, K::Y, K::U,
    K::I, K::O, K::P, K::BACKSLASH, K::BACKSPACE, __, __, __,
    __, K::A, K::S, K::D, K::F, K::G, K::H, K::J,
    K::K, K::L, K::SEMICOLON, K::LEFTBRACE, K::RIGHTBRACE, __, __, __,
    __, K::Z, K::X, K::C, K::V, K::B, K::N, K::M,
    K::COMMA, K::DOT, K::KPMINUS, K::APOSTROPHE, K::ENTER, __, __, __,
    __, K::TAB, __, K::LEFTSHIFT, __, K::APOSTROPHE, __, __,
    __, __, K::UP, __, K::RIGHTSHIFT, __, __, __,
    __, __, __, __, __, K::LEFTALT, K::GRAVE, __,
    __, K::LEFT, K::DOWN, K::RIGHT, __, __, __, __,
    __, K::KPASTERISK, K::LEFTCTRL, __, K::SPACE, __, __, __,
    K::SLASH, K::DELETE, __, __, __, __, __, K::POWER,
];

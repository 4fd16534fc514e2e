//! Key-symbol table for keyboard-emulation scanners
//!
//! Scanners type barcodes as letters and digits. Every other key (space,
//! punctuation, function keys) has no entry and is dropped from the payload.

use evdev::Key;

/// Characters produced by a key: `(plain, shifted)`
///
/// Digits produce the digit in both columns.
pub fn key_symbol(key: Key) -> Option<(char, char)> {
    let symbol = match key {
        Key::KEY_A => ('a', 'A'),
        Key::KEY_B => ('b', 'B'),
        Key::KEY_C => ('c', 'C'),
        Key::KEY_D => ('d', 'D'),
        Key::KEY_E => ('e', 'E'),
        Key::KEY_F => ('f', 'F'),
        Key::KEY_G => ('g', 'G'),
        Key::KEY_H => ('h', 'H'),
        Key::KEY_I => ('i', 'I'),
        Key::KEY_J => ('j', 'J'),
        Key::KEY_K => ('k', 'K'),
        Key::KEY_L => ('l', 'L'),
        Key::KEY_M => ('m', 'M'),
        Key::KEY_N => ('n', 'N'),
        Key::KEY_O => ('o', 'O'),
        Key::KEY_P => ('p', 'P'),
        Key::KEY_Q => ('q', 'Q'),
        Key::KEY_R => ('r', 'R'),
        Key::KEY_S => ('s', 'S'),
        Key::KEY_T => ('t', 'T'),
        Key::KEY_U => ('u', 'U'),
        Key::KEY_V => ('v', 'V'),
        Key::KEY_W => ('w', 'W'),
        Key::KEY_X => ('x', 'X'),
        Key::KEY_Y => ('y', 'Y'),
        Key::KEY_Z => ('z', 'Z'),
        Key::KEY_1 => ('1', '1'),
        Key::KEY_2 => ('2', '2'),
        Key::KEY_3 => ('3', '3'),
        Key::KEY_4 => ('4', '4'),
        Key::KEY_5 => ('5', '5'),
        Key::KEY_6 => ('6', '6'),
        Key::KEY_7 => ('7', '7'),
        Key::KEY_8 => ('8', '8'),
        Key::KEY_9 => ('9', '9'),
        Key::KEY_0 => ('0', '0'),
        _ => return None,
    };
    Some(symbol)
}

/// Keys toggling the shifted column
pub fn is_shift(key: Key) -> bool {
    matches!(key, Key::KEY_LEFTSHIFT | Key::KEY_RIGHTSHIFT)
}

/// Keys terminating a barcode
pub fn is_terminator(key: Key) -> bool {
    matches!(key, Key::KEY_ENTER | Key::KEY_KPENTER)
}

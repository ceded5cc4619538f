use crate::definitions::{Word, BACKSPACE_KEY, NEWLINE_KEY};
use lazy_static::lazy_static;
use std::collections::HashMap;

// browser key names and their codes in RAM[KBD]
const ACTION_KEYS: [(&str, Word); 26] = [
    ("Space", 32),
    ("Enter", NEWLINE_KEY),
    ("Backspace", BACKSPACE_KEY),
    ("ArrowLeft", 130),
    ("ArrowUp", 131),
    ("ArrowRight", 132),
    ("ArrowDown", 133),
    ("Home", 134),
    ("End", 135),
    ("PageUp", 136),
    ("PageDown", 137),
    ("Insert", 138),
    ("Delete", 139),
    ("Escape", 140),
    ("F1", 141),
    ("F2", 142),
    ("F3", 143),
    ("F4", 144),
    ("F5", 145),
    ("F6", 146),
    ("F7", 147),
    ("F8", 148),
    ("F9", 149),
    ("F10", 150),
    ("F11", 151),
    ("F12", 152),
];

lazy_static! {
    static ref ACTION_KEY_CODES: HashMap<&'static str, Word> = ACTION_KEYS.into_iter().collect();
}

/// The Hack key code for a key name as the browser reports it.
///
/// Printable keys are a single character and map to their (uppercase) ascii code
pub fn get_key_code(key: &str) -> Option<Word> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        // a lot of programs only check for uppercase letters
        (Some(c), None) if c.is_ascii() => Some(c.to_ascii_uppercase() as Word),
        (Some(_), None) => None,
        _ => ACTION_KEY_CODES.get(key).copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printable_keys() {
        assert_eq!(Some(65), get_key_code("a"));
        assert_eq!(Some(65), get_key_code("A"));
        assert_eq!(Some(49), get_key_code("1"));
        assert_eq!(Some(43), get_key_code("+"));
        assert_eq!(None, get_key_code("ä"));
    }

    #[test]
    fn test_action_keys() {
        assert_eq!(Some(NEWLINE_KEY), get_key_code("Enter"));
        assert_eq!(Some(32), get_key_code("Space"));
        assert_eq!(Some(130), get_key_code("ArrowLeft"));
        assert_eq!(Some(152), get_key_code("F12"));
        assert_eq!(None, get_key_code("Shift"));
        assert_eq!(None, get_key_code(""));
    }
}

use crate::definitions::ROM_SIZE;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RomError {
    #[error("the program has {size} words, but the rom only has {}", ROM_SIZE)]
    TooLarge { size: usize },
    #[error("line {line}: expected 16 binary digits")]
    InvalidWord { line: usize },
}

pub type RomResult<T> = Result<T, RomError>;

const EMPTY_WORD: &str = "0000000000000000";

lazy_static! {
    // leading whitespace, then the 16 bits, anything after that is ignored
    static ref WORD: Regex = Regex::new(r"^\s*([01]{16})").unwrap();
}

/// Writes the words as a full rom image: one line of 16 binary digits for each of the 2^15
/// addresses, with the unused ones set to zero
pub fn rom_literal(words: &[u16]) -> RomResult<String> {
    if words.len() > ROM_SIZE {
        return Err(RomError::TooLarge { size: words.len() });
    }

    let mut lines = Vec::with_capacity(ROM_SIZE);
    lines.extend(words.iter().map(|word| format!("{:016b}", word)));
    lines.resize(ROM_SIZE, EMPTY_WORD.to_owned());
    Ok(lines.join("\n"))
}

/// Reads a textual .hack file. Empty lines are skipped
pub fn load_hack(text: &str) -> RomResult<Vec<u16>> {
    let mut words = Vec::new();

    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let bits = WORD
            .captures(line)
            .and_then(|captures| captures.get(1))
            .ok_or(RomError::InvalidWord { line: i + 1 })?;
        let word = u16::from_str_radix(bits.as_str(), 2)
            .map_err(|_| RomError::InvalidWord { line: i + 1 })?;
        words.push(word);
    }

    if words.len() > ROM_SIZE {
        return Err(RomError::TooLarge { size: words.len() });
    }
    Ok(words)
}

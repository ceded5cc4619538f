pub mod assembly;
pub mod bytecode;
pub mod jack;
mod string_lexer;
pub mod symbols;

pub use string_lexer::{Spanned, StringLexer};

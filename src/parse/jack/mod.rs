pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use lexer::{tokenize, LexError, LexResult};
pub use parser::{parse_class, parse_expression, parse_statement, ParseError, ParseResult};

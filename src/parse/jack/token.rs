use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Serialize)]
pub enum Keyword {
    Class,
    Constructor,
    Function,
    Method,
    Field,
    Static,
    Var,
    Int,
    Char,
    Boolean,
    Void,
    True,
    False,
    Null,
    This,
    Let,
    Do,
    If,
    Else,
    While,
    Return,
}

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, Keyword> = {
        let mut map = HashMap::new();
        map.insert("class", Keyword::Class);
        map.insert("constructor", Keyword::Constructor);
        map.insert("function", Keyword::Function);
        map.insert("method", Keyword::Method);
        map.insert("field", Keyword::Field);
        map.insert("static", Keyword::Static);
        map.insert("var", Keyword::Var);
        map.insert("int", Keyword::Int);
        map.insert("char", Keyword::Char);
        map.insert("boolean", Keyword::Boolean);
        map.insert("void", Keyword::Void);
        map.insert("true", Keyword::True);
        map.insert("false", Keyword::False);
        map.insert("null", Keyword::Null);
        map.insert("this", Keyword::This);
        map.insert("let", Keyword::Let);
        map.insert("do", Keyword::Do);
        map.insert("if", Keyword::If);
        map.insert("else", Keyword::Else);
        map.insert("while", Keyword::While);
        map.insert("return", Keyword::Return);
        map
    };
}

impl Keyword {
    /// exact match against the reserved words, identifiers never match
    pub fn lookup(word: &str) -> Option<Keyword> {
        KEYWORDS.get(word).copied()
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Serialize)]
pub enum Symbol {
    LCurly,
    RCurly,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Comma,
    Semicolon,
    Plus,
    Minus,
    Star,
    Slash,
    Ampersand,
    Pipe,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
    Equals,
    Tilde,
}

impl Symbol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LCurly => "{",
            Self::RCurly => "}",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Dot => ".",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Ampersand => "&",
            Self::Pipe => "|",
            Self::LessThan => "<",
            Self::LessThanOrEquals => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEquals => ">=",
            Self::Equals => "=",
            Self::Tilde => "~",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub enum TokenKind {
    Keyword(Keyword),
    Symbol(Symbol),
    Identifier,
    IntLiteral(u16),
    /// the value without the surrounding quotes
    StringLiteral(String),
}

impl TokenKind {
    /// used for the "found" part of parse errors
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Keyword(_) => "keyword",
            Self::Symbol(_) => "symbol",
            Self::Identifier => "identifier",
            Self::IntLiteral(_) => "integer constant",
            Self::StringLiteral(_) => "string constant",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// the exact source text (string literals include their quotes)
    pub source: String,
    /// the position in the token stream of the file
    pub idx: usize,
    pub line_nr: u32,
}

impl Token {
    pub fn new(kind: TokenKind, source: impl Into<String>, idx: usize, line_nr: u32) -> Self {
        Self {
            kind,
            source: source.into(),
            idx,
            line_nr,
        }
    }

    pub fn is_symbol(&self, symbol: Symbol) -> bool {
        self.kind == TokenKind::Symbol(symbol)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} '{}'", self.kind.describe(), self.source)
    }
}

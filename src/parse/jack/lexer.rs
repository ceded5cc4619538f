use super::token::{Keyword, Symbol, Token, TokenKind};
use crate::definitions::MAX_CONSTANT;
use crate::parse::{Spanned, StringLexer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum LexError {
    #[error("line {line}: unexpected character '{found}'")]
    UnexpectedCharacter { found: char, line: u32 },
    #[error("line {line}: integer constant {literal} is out of range (0..={max})", max = MAX_CONSTANT)]
    IntegerOutOfRange { literal: String, line: u32 },
    #[error("line {line}: unterminated string constant")]
    UnterminatedString { line: u32 },
    #[error("line {line}: unterminated comment")]
    UnterminatedComment { line: u32 },
}

pub type LexResult<T> = Result<T, LexError>;

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub struct Lexer<'src> {
    walker: StringLexer<'src>,
    next_idx: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            walker: StringLexer::new(source),
            next_idx: 0,
        }
    }

    fn token(&mut self, spanned: Spanned<&'src str>, kind: TokenKind) -> Token {
        let token = Token::new(kind, spanned.content, self.next_idx, spanned.line_nr);
        self.next_idx += 1;
        token
    }

    fn single(&mut self, symbol: Symbol) -> LexResult<Token> {
        let c = self.walker.advance();
        let line = self.walker.line_nr();
        let spanned = c.ok_or(LexError::UnexpectedCharacter { found: '\0', line })?;
        Ok(self.token(spanned.with_new_content(symbol.as_str()), TokenKind::Symbol(symbol)))
    }

    /// `<` and `>` may be followed by `=`
    fn maybe_double(&mut self, single: Symbol, double: Symbol) -> LexResult<Token> {
        let first = self.walker.advance();
        let line = self.walker.line_nr();
        let first = first.ok_or(LexError::UnexpectedCharacter { found: '\0', line })?;
        if self.walker.current_eq('=') {
            self.walker.advance();
            let spanned = Spanned::new(first.start_idx, first.end_idx + 1, first.line_nr, double.as_str());
            Ok(self.token(spanned, TokenKind::Symbol(double)))
        } else {
            Ok(self.token(first.with_new_content(single.as_str()), TokenKind::Symbol(single)))
        }
    }

    fn scan_string(&mut self, line: u32) -> LexResult<Token> {
        // skip the opening "
        self.walker.advance();

        let content = self
            .walker
            .take_chars_while(|c| c != '"' && c != '\n')
            .map(|s| s.content)
            .unwrap_or("");

        // strings can neither span lines nor escape quotes
        if !self.walker.current_eq('"') {
            return Err(LexError::UnterminatedString { line });
        }
        self.walker.advance();

        let quoted = format!("\"{}\"", content);
        let token = Token::new(
            TokenKind::StringLiteral(content.to_owned()),
            quoted,
            self.next_idx,
            line,
        );
        self.next_idx += 1;
        Ok(token)
    }

    fn scan_int(&mut self, line: u32) -> LexResult<Token> {
        let spanned = self
            .walker
            .take_chars_while(|c| c.is_ascii_digit())
            .ok_or(LexError::UnexpectedCharacter { found: '\0', line })?;

        let out_of_range = || LexError::IntegerOutOfRange {
            literal: spanned.content.to_owned(),
            line,
        };

        // anything that doesn't even fit into a u32 is certainly too big
        let value: u32 = spanned.content.parse().map_err(|_| out_of_range())?;
        if value > MAX_CONSTANT as u32 {
            return Err(out_of_range());
        }

        Ok(self.token(spanned, TokenKind::IntLiteral(value as u16)))
    }

    /// Returns Ok(None) once the source is exhausted
    pub fn scan_token(&mut self) -> LexResult<Option<Token>> {
        loop {
            // skip whitespace
            self.walker.take_chars_while(char::is_whitespace);

            let Some(Spanned {
                content: current_char,
                line_nr: line,
                ..
            }) = self.walker.current_char()
            else {
                return Ok(None);
            };

            let token = match current_char {
                '/' => {
                    let slash = self.walker.advance();
                    if self.walker.current_eq('/') {
                        self.walker.take_chars_while(|c| c != '\n');
                        continue;
                    }
                    if self.walker.current_eq('*') {
                        // this also covers /** api comments */
                        self.walker.advance();
                        if self.walker.take_past_substr("*/").is_none() {
                            return Err(LexError::UnterminatedComment { line });
                        }
                        continue;
                    }
                    let slash = slash.ok_or(LexError::UnexpectedCharacter { found: '/', line })?;
                    self.token(slash.with_new_content("/"), TokenKind::Symbol(Symbol::Slash))
                }
                '{' => self.single(Symbol::LCurly)?,
                '}' => self.single(Symbol::RCurly)?,
                '(' => self.single(Symbol::LParen)?,
                ')' => self.single(Symbol::RParen)?,
                '[' => self.single(Symbol::LBracket)?,
                ']' => self.single(Symbol::RBracket)?,
                '.' => self.single(Symbol::Dot)?,
                ',' => self.single(Symbol::Comma)?,
                ';' => self.single(Symbol::Semicolon)?,
                '+' => self.single(Symbol::Plus)?,
                '-' => self.single(Symbol::Minus)?,
                '*' => self.single(Symbol::Star)?,
                '&' => self.single(Symbol::Ampersand)?,
                '|' => self.single(Symbol::Pipe)?,
                '=' => self.single(Symbol::Equals)?,
                '~' => self.single(Symbol::Tilde)?,
                '<' => self.maybe_double(Symbol::LessThan, Symbol::LessThanOrEquals)?,
                '>' => self.maybe_double(Symbol::GreaterThan, Symbol::GreaterThanOrEquals)?,
                '"' => self.scan_string(line)?,
                c if c.is_ascii_digit() => self.scan_int(line)?,
                c if is_ident_start(c) => {
                    let ident = self
                        .walker
                        .take_chars_while(is_ident_char)
                        .ok_or(LexError::UnexpectedCharacter { found: c, line })?;
                    let kind = Keyword::lookup(ident.content)
                        .map_or(TokenKind::Identifier, TokenKind::Keyword);
                    self.token(ident, kind)
                }
                found => return Err(LexError::UnexpectedCharacter { found, line }),
            };

            return Ok(Some(token));
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = LexResult<Token>;
    fn next(&mut self) -> Option<Self::Item> {
        self.scan_token().transpose()
    }
}

/// Tokenizes a whole file, stopping at the first error
pub fn tokenize(source: &str) -> LexResult<Vec<Token>> {
    let tokens = Lexer::new(source).collect::<LexResult<Vec<_>>>()?;
    log::trace!("lexed {} tokens", tokens.len());
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_let_statement_tokens() {
        let tokens = tokenize("let x = 5;").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Keyword(Keyword::Let), "let", 0, 1),
                Token::new(TokenKind::Identifier, "x", 1, 1),
                Token::new(TokenKind::Symbol(Symbol::Equals), "=", 2, 1),
                Token::new(TokenKind::IntLiteral(5), "5", 3, 1),
                Token::new(TokenKind::Symbol(Symbol::Semicolon), ";", 4, 1),
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let src = r#"
            /** api
             * documentation */
            class /* inline */ Main { // trailing
                // a whole line
            }"#;
        let tokens = tokenize(src).unwrap();
        let sources: Vec<_> = tokens.iter().map(|t| t.source.as_str()).collect();
        assert_eq!(sources, vec!["class", "Main", "{", "}"]);
        assert_eq!(tokens.iter().map(|t| t.idx).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(tokens[0].line_nr, 4);
    }

    #[test]
    fn test_division_is_not_a_comment() {
        assert_eq!(
            kinds("a/b"),
            vec![
                TokenKind::Identifier,
                TokenKind::Symbol(Symbol::Slash),
                TokenKind::Identifier
            ]
        );
    }

    #[test]
    fn test_keywords_need_an_exact_match() {
        assert_eq!(
            kinds("do done classy class"),
            vec![
                TokenKind::Keyword(Keyword::Do),
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Keyword(Keyword::Class),
            ]
        );
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(
            kinds("a<=b>c>=d<e"),
            vec![
                TokenKind::Identifier,
                TokenKind::Symbol(Symbol::LessThanOrEquals),
                TokenKind::Identifier,
                TokenKind::Symbol(Symbol::GreaterThan),
                TokenKind::Identifier,
                TokenKind::Symbol(Symbol::GreaterThanOrEquals),
                TokenKind::Identifier,
                TokenKind::Symbol(Symbol::LessThan),
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_string_literal() {
        let tokens = tokenize("do Output.printString(\"Hello, world\");").unwrap();
        assert_eq!(
            tokens[5].kind,
            TokenKind::StringLiteral("Hello, world".to_owned())
        );
        assert_eq!(tokens[5].source, "\"Hello, world\"");
    }

    #[test]
    fn test_integer_range() {
        assert_eq!(kinds("32767"), vec![TokenKind::IntLiteral(32767)]);
        assert_eq!(
            tokenize("let x = 32768;"),
            Err(LexError::IntegerOutOfRange {
                literal: "32768".to_owned(),
                line: 1
            })
        );
        assert!(matches!(
            tokenize("99999999999999999999"),
            Err(LexError::IntegerOutOfRange { .. })
        ));
    }

    #[test]
    fn test_lex_errors() {
        assert_eq!(
            tokenize("let x = \"abc\n\";"),
            Err(LexError::UnterminatedString { line: 1 })
        );
        assert_eq!(
            tokenize("\n let x = #;"),
            Err(LexError::UnexpectedCharacter { found: '#', line: 2 })
        );
        assert_eq!(
            tokenize("/* never closed"),
            Err(LexError::UnterminatedComment { line: 1 })
        );
    }
}

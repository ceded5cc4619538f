use super::{Spanned, StringLexer};
use crate::definitions::{MAX_ARGS, MAX_CONSTANT, POINTER_SIZE, TEMP_SIZE};
use crate::vm::command::{Command, Segment};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum VmParseError {
    #[error("line {line}: unexpected character '{found}'")]
    UnexpectedCharacter { found: char, line: u32 },
    #[error("line {line}: unexpected end of file")]
    UnexpectedEndOfFile { line: u32 },
    #[error("line {line}: could not parse int '{literal}'")]
    InvalidIntLiteral { literal: String, line: u32 },
    #[error("line {line}: expected an identifier")]
    ExpectedIdent { line: u32 },
    #[error("line {line}: expected an integer")]
    ExpectedInt { line: u32 },
    #[error("line {line}: illegal segment '{segment}'")]
    IllegalSegment { segment: String, line: u32 },
    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand { command: String, line: u32 },
    #[error("line {line}: index {index} is out of range for segment {segment}")]
    IndexOutOfRange {
        segment: Segment,
        index: u16,
        line: u32,
    },
    #[error("line {line}: cannot pop into the constant segment")]
    PopConstant { line: u32 },
    #[error("line {line}: {n_args} arguments are too many, the limit is {max}", max = MAX_ARGS)]
    TooManyArguments { n_args: u16, line: u32 },
}

pub type VmParseResult<T> = Result<T, VmParseError>;

#[derive(Eq, PartialEq, Debug)]
enum Token<'src> {
    Identifier(&'src str),
    IntLiteral(&'src str),
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '_' | '.' | '$' | ':')
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | ':' | '-')
}

struct Lexer<'src> {
    walker: StringLexer<'src>,
}

impl<'src> Lexer<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            walker: StringLexer::new(source),
        }
    }

    fn line_nr(&self) -> u32 {
        self.walker.line_nr()
    }

    /// Returns Ok(None) at the end of the file
    fn scan_token(&mut self) -> VmParseResult<Option<Spanned<Token<'src>>>> {
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

            return match current_char {
                '/' => {
                    self.walker.advance();
                    if self.walker.current_eq('/') {
                        self.walker.take_chars_while(|c| c != '\n');
                        continue;
                    }
                    Err(VmParseError::UnexpectedCharacter {
                        found: current_char,
                        line,
                    })
                }
                c if is_ident_start(c) => {
                    let ident = self
                        .walker
                        .take_chars_while(is_ident_char)
                        .ok_or(VmParseError::UnexpectedEndOfFile { line })?;
                    let wrapped_content = Token::Identifier(ident.content);
                    Ok(Some(ident.with_new_content(wrapped_content)))
                }
                c if c.is_ascii_digit() => {
                    let spanned = self
                        .walker
                        .take_chars_while(|c| c.is_ascii_digit())
                        .ok_or(VmParseError::UnexpectedEndOfFile { line })?;
                    let wrapped_content = Token::IntLiteral(spanned.content);
                    Ok(Some(spanned.with_new_content(wrapped_content)))
                }
                found => Err(VmParseError::UnexpectedCharacter { found, line }),
            };
        }
    }
}

struct Parser<'src> {
    lexer: Lexer<'src>,
}

impl<'src> Parser<'src> {
    fn next_token(&mut self) -> VmParseResult<Spanned<Token<'src>>> {
        let line = self.lexer.line_nr();
        self.lexer
            .scan_token()?
            .ok_or(VmParseError::UnexpectedEndOfFile { line })
    }

    fn consume_ident(&mut self) -> VmParseResult<&'src str> {
        let token = self.next_token()?;
        match token.content {
            Token::Identifier(ident) => Ok(ident),
            _ => Err(VmParseError::ExpectedIdent {
                line: token.line_nr,
            }),
        }
    }

    fn consume_int(&mut self) -> VmParseResult<(u16, u32)> {
        let token = self.next_token()?;
        let line = token.line_nr;
        match token.content {
            Token::IntLiteral(literal) => literal
                .parse()
                .map(|value| (value, line))
                .map_err(|_| VmParseError::InvalidIntLiteral {
                    literal: literal.to_owned(),
                    line,
                }),
            _ => Err(VmParseError::ExpectedInt { line }),
        }
    }

    fn consume_segment_with_index(&mut self) -> VmParseResult<(Segment, u16)> {
        let line = self.lexer.line_nr();
        let ident = self.consume_ident()?;
        let segment = ident
            .parse::<Segment>()
            .map_err(|_| VmParseError::IllegalSegment {
                segment: ident.to_owned(),
                line,
            })?;
        let (index, line) = self.consume_int()?;

        let limit = match segment {
            Segment::Temp => TEMP_SIZE as u16,
            Segment::Pointer => POINTER_SIZE as u16,
            Segment::Constant => MAX_CONSTANT + 1,
            _ => u16::MAX,
        };
        if index >= limit {
            return Err(VmParseError::IndexOutOfRange {
                segment,
                index,
                line,
            });
        }

        Ok((segment, index))
    }

    fn parse(&mut self) -> VmParseResult<Vec<Command>> {
        let mut commands = Vec::with_capacity(128);

        while let Some(token) = self.lexer.scan_token()? {
            let line = token.line_nr;
            let command = match token.content {
                Token::Identifier("push") => {
                    let (segment, index) = self.consume_segment_with_index()?;
                    Command::Push { segment, index }
                }
                Token::Identifier("pop") => {
                    let (segment, index) = self.consume_segment_with_index()?;
                    if segment == Segment::Constant {
                        return Err(VmParseError::PopConstant { line });
                    }
                    Command::Pop { segment, index }
                }
                Token::Identifier("label") => Command::label(self.consume_ident()?),
                Token::Identifier("goto") => Command::goto(self.consume_ident()?),
                Token::Identifier("if-goto") => Command::if_goto(self.consume_ident()?),
                Token::Identifier("function") => {
                    let name = self.consume_ident()?;
                    let (n_locals, _) = self.consume_int()?;
                    Command::function(name, n_locals)
                }
                Token::Identifier("call") => {
                    let name = self.consume_ident()?;
                    let (n_args, line) = self.consume_int()?;
                    if n_args > MAX_ARGS {
                        return Err(VmParseError::TooManyArguments { n_args, line });
                    }
                    Command::call(name, n_args)
                }
                Token::Identifier("return") => Command::Return,
                Token::Identifier("add") => Command::Add,
                Token::Identifier("sub") => Command::Sub,
                Token::Identifier("neg") => Command::Neg,
                Token::Identifier("eq") => Command::Eq,
                Token::Identifier("gt") => Command::Gt,
                Token::Identifier("lt") => Command::Lt,
                Token::Identifier("and") => Command::And,
                Token::Identifier("or") => Command::Or,
                Token::Identifier("not") => Command::Not,
                Token::Identifier(command) | Token::IntLiteral(command) => {
                    return Err(VmParseError::UnknownCommand {
                        command: command.to_owned(),
                        line,
                    })
                }
            };
            commands.push(command);
        }

        Ok(commands)
    }
}

/// Parses the text of a single .vm file
pub fn parse_vm(source: &str) -> VmParseResult<Vec<Command>> {
    let mut parser = Parser {
        lexer: Lexer::new(source),
    };
    let commands = parser.parse()?;
    log::trace!("parsed {} vm commands", commands.len());
    Ok(commands)
}

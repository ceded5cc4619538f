use super::{Spanned, StringLexer};
use crate::definitions::MAX_CONSTANT;
use crate::hack::instruction::{AsmInstruction, Computation, Destination, Jump, Register};
use std::iter::Peekable;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum AsmParseError {
    #[error("line {line}: unexpected character '{found}'")]
    UnexpectedCharacter { found: char, line: u32 },
    #[error("line {line}: unexpected end of file")]
    UnexpectedEndOfFile { line: u32 },
    #[error("line {line}: could not parse int '{literal}'")]
    InvalidIntLiteral { literal: String, line: u32 },
    #[error("line {line}: only 0, 1 and -1 are allowed, but got {value}")]
    InvalidIntComp { value: i32, line: u32 },
    #[error("line {line}: invalid destination '{dest}'")]
    InvalidDestination { dest: String, line: u32 },
    #[error("line {line}: expected a label or a positive integer literal after an @")]
    ExpectedLabelOrConstant { line: u32 },
    #[error("line {line}: expected a computation")]
    ExpectedComputation { line: u32 },
    #[error("line {line}: expected a register")]
    ExpectedRegister { line: u32 },
    #[error("line {line}: expected an operator")]
    ExpectedOperator { line: u32 },
    #[error("line {line}: expected a jump")]
    ExpectedJump { line: u32 },
    #[error("line {line}: the alu cannot compute {comp}")]
    UnsupportedComputation { comp: String, line: u32 },
    #[error("line {line}: invalid token")]
    InvalidToken { line: u32 },
}

pub type AsmParseResult<T> = Result<T, AsmParseError>;

#[derive(Eq, PartialEq, Debug)]
enum Token<'src> {
    ASym(&'src str),
    AConst(u16),
    Identifier(&'src str),
    Label(&'src str),
    IntLiteral(i32),
    Semi,
    Eq,
    Plus,
    Minus,
    Bang,
    Ampersand,
    Pipe,
}

impl<'src> Token<'src> {
    fn is_binary_operator(&self) -> bool {
        matches!(self, Self::Plus | Self::Minus | Self::Ampersand | Self::Pipe)
    }
}

// symbols may contain letters, digits, _ . $ : but not start with a digit
fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | ':')
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

    fn eof(&self) -> AsmParseError {
        AsmParseError::UnexpectedEndOfFile {
            line: self.walker.line_nr(),
        }
    }

    fn consume_single(&mut self, tok: Token<'src>) -> AsmParseResult<Spanned<Token<'src>>> {
        let eof = self.eof();
        self.walker
            .advance()
            .map(|spanned| spanned.with_new_content(tok))
            .ok_or(eof)
    }

    fn consume_int(&mut self, line: u32) -> AsmParseResult<Spanned<&'src str>> {
        self.walker
            .take_chars_while(|c| c.is_ascii_digit())
            .ok_or(AsmParseError::UnexpectedEndOfFile { line })
    }

    fn parse_int(literal: &str, line: u32) -> AsmParseResult<i32> {
        literal
            .parse()
            .map_err(|_| AsmParseError::InvalidIntLiteral {
                literal: literal.to_owned(),
                line,
            })
    }

    /// Returns Ok(None) at the end of the file
    fn scan_token(&mut self) -> AsmParseResult<Option<Spanned<Token<'src>>>> {
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
                    self.walker.advance();
                    if self.walker.current_eq('/') {
                        self.walker.take_chars_while(|c| c != '\n');
                        continue;
                    }
                    return Err(AsmParseError::UnexpectedCharacter {
                        found: current_char,
                        line,
                    });
                }
                ';' => self.consume_single(Token::Semi)?,
                '=' => self.consume_single(Token::Eq)?,
                '+' => self.consume_single(Token::Plus)?,
                '!' => self.consume_single(Token::Bang)?,
                '&' => self.consume_single(Token::Ampersand)?,
                '|' => self.consume_single(Token::Pipe)?,
                '-' => {
                    let mut minus = self.consume_single(Token::Minus)?;
                    // -1 is a special case
                    if self.walker.current_eq('1') {
                        let one = self.consume_single(Token::IntLiteral(1))?;
                        minus.end_idx = one.end_idx;
                        minus.content = Token::IntLiteral(-1);
                    }
                    minus
                }
                c if c.is_ascii_digit() => {
                    let spanned = self.consume_int(line)?;
                    let parsed_int = Self::parse_int(spanned.content, line)?;
                    spanned.with_new_content(Token::IntLiteral(parsed_int))
                }
                '@' => {
                    // skip @
                    let at = self.walker.advance().ok_or(self.eof())?;

                    let mut next = match self.walker.current_char() {
                        Some(c) if c.content.is_ascii_digit() => {
                            let spanned = self.consume_int(line)?;
                            let value = Self::parse_int(spanned.content, line)?;
                            if value > MAX_CONSTANT as i32 {
                                return Err(AsmParseError::ExpectedLabelOrConstant { line });
                            }
                            spanned.with_new_content(Token::AConst(value as u16))
                        }
                        Some(c) if is_symbol_char(c.content) => {
                            let spanned = self
                                .walker
                                .take_chars_while(is_symbol_char)
                                .ok_or(AsmParseError::ExpectedLabelOrConstant { line })?;
                            spanned.with_new_content(Token::ASym(spanned.content))
                        }
                        _ => return Err(AsmParseError::ExpectedLabelOrConstant { line }),
                    };
                    next.start_idx = at.start_idx;
                    next
                }
                '(' => {
                    // skip (
                    self.walker.advance();

                    let label = self
                        .walker
                        .take_chars_while(|c| c != ')' && c != '\n')
                        .ok_or(AsmParseError::UnexpectedEndOfFile { line })?;

                    // the next char has to be )
                    if !self.walker.current_eq(')') {
                        return Err(AsmParseError::UnexpectedEndOfFile { line });
                    }
                    self.walker.advance();

                    let name = label.content.trim();
                    if name.is_empty() {
                        return Err(AsmParseError::InvalidToken { line });
                    }
                    label.with_new_content(Token::Label(name))
                }
                c if c.is_ascii_alphabetic() => {
                    let ident = self
                        .walker
                        .take_chars_while(|c| c.is_ascii_alphanumeric())
                        .ok_or(AsmParseError::UnexpectedEndOfFile { line })?;
                    let wrapped_content = Token::Identifier(ident.content);
                    ident.with_new_content(wrapped_content)
                }
                found => return Err(AsmParseError::UnexpectedCharacter { found, line }),
            };

            return Ok(Some(token));
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = AsmParseResult<Spanned<Token<'src>>>;
    fn next(&mut self) -> Option<Self::Item> {
        self.scan_token().transpose()
    }
}

struct Parser<'src> {
    lexer: Peekable<Lexer<'src>>,
    // the line of the last consumed token
    line: u32,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            lexer: Lexer::new(source).peekable(),
            line: 1,
        }
    }

    fn next_token(&mut self) -> AsmParseResult<Option<Token<'src>>> {
        match self.lexer.next().transpose()? {
            Some(spanned) => {
                self.line = spanned.line_nr;
                Ok(Some(spanned.content))
            }
            None => Ok(None),
        }
    }

    fn expect_token(&mut self) -> AsmParseResult<Token<'src>> {
        let line = self.line;
        self.next_token()?
            .ok_or(AsmParseError::UnexpectedEndOfFile { line })
    }

    fn peek_content(&mut self) -> Option<&Token<'src>> {
        match self.lexer.peek() {
            Some(Ok(spanned)) => Some(&spanned.content),
            _ => None,
        }
    }

    fn int_as_comp(&self, value: i32) -> AsmParseResult<Computation> {
        Ok(match value {
            0 => Computation::ConstZero,
            1 => Computation::ConstOne,
            -1 => Computation::ConstNegOne,
            _ => {
                return Err(AsmParseError::InvalidIntComp {
                    value,
                    line: self.line,
                })
            }
        })
    }

    fn register(&self, ident: &str) -> AsmParseResult<Register> {
        ident
            .try_into()
            .map_err(|_| AsmParseError::ExpectedRegister { line: self.line })
    }

    fn consume_reg(&mut self) -> AsmParseResult<Register> {
        match self.expect_token()? {
            Token::Identifier(ident) => self.register(ident),
            _ => Err(AsmParseError::ExpectedRegister { line: self.line }),
        }
    }

    fn consume_comp(&mut self) -> AsmParseResult<Computation> {
        let comp = match self.expect_token()? {
            // literal
            Token::IntLiteral(value) => self.int_as_comp(value)?,
            // unary
            Token::Bang => Computation::UnaryBoolNeg(self.consume_reg()?),
            Token::Minus => Computation::UnaryIntNeg(self.consume_reg()?),
            // binary
            Token::Identifier(lhs) => {
                let lhs = self.register(lhs)?;

                match self.peek_content() {
                    // the lexer reads A-1 as token(A), token(-1)
                    Some(Token::IntLiteral(-1)) => {
                        self.next_token()?;
                        return Ok(Computation::BinaryDec(lhs));
                    }
                    Some(token) if token.is_binary_operator() => {}
                    // something like D=M at the end of a line
                    _ => return Ok(Computation::UnaryNone(lhs)),
                }

                let operator = self.expect_token()?;
                let rhs_is_register = matches!(self.peek_content(), Some(Token::Identifier(_)));
                let rhs_is_one = matches!(self.peek_content(), Some(Token::IntLiteral(1)));

                let comp = match (operator, rhs_is_register, rhs_is_one) {
                    (Token::Plus, true, _) => Computation::BinaryAdd(lhs, self.consume_reg()?),
                    (Token::Plus, _, true) => {
                        self.next_token()?;
                        Computation::BinaryInc(lhs)
                    }
                    (Token::Minus, true, _) => Computation::BinarySub(lhs, self.consume_reg()?),
                    (Token::Minus, _, true) => {
                        self.next_token()?;
                        Computation::BinaryDec(lhs)
                    }
                    (Token::Ampersand, true, _) => {
                        Computation::BinaryAnd(lhs, self.consume_reg()?)
                    }
                    (Token::Pipe, true, _) => Computation::BinaryOr(lhs, self.consume_reg()?),
                    _ => return Err(AsmParseError::ExpectedOperator { line: self.line }),
                };
                comp.canonical()
            }
            _ => return Err(AsmParseError::ExpectedComputation { line: self.line }),
        };

        if comp.encode().is_none() {
            return Err(AsmParseError::UnsupportedComputation {
                comp: comp.to_string(),
                line: self.line,
            });
        }
        Ok(comp)
    }

    fn consume_jump(&mut self) -> AsmParseResult<Jump> {
        if self.peek_content() != Some(&Token::Semi) {
            return Ok(Jump::Next);
        }
        self.next_token()?;

        match self.expect_token()? {
            Token::Identifier(mnemonic) => Jump::from_mnemonic(mnemonic)
                .filter(|jump| *jump != Jump::Next)
                .ok_or(AsmParseError::ExpectedJump { line: self.line }),
            _ => Err(AsmParseError::ExpectedJump { line: self.line }),
        }
    }

    fn parse(&mut self) -> AsmParseResult<Vec<AsmInstruction>> {
        let mut instructions = Vec::with_capacity(128);

        while let Some(token) = self.next_token()? {
            let instruction = match token {
                Token::AConst(value) => AsmInstruction::constant(value),
                Token::ASym(name) => AsmInstruction::symbol(name),
                Token::Label(label) => AsmInstruction::label(label),
                Token::IntLiteral(value) => AsmInstruction::c(
                    Destination::None,
                    self.int_as_comp(value)?,
                    self.consume_jump()?,
                ),
                Token::Identifier(ident) => {
                    if self.peek_content() == Some(&Token::Eq) {
                        let dest = Destination::try_from(ident).map_err(|_| {
                            AsmParseError::InvalidDestination {
                                dest: ident.to_owned(),
                                line: self.line,
                            }
                        })?;
                        self.next_token()?;
                        AsmInstruction::c(dest, self.consume_comp()?, self.consume_jump()?)
                    } else {
                        // no dest, like D;JGT
                        let reg = self.register(ident)?;
                        AsmInstruction::c(
                            Destination::None,
                            Computation::UnaryNone(reg),
                            self.consume_jump()?,
                        )
                    }
                }
                _ => return Err(AsmParseError::InvalidToken { line: self.line }),
            };
            instructions.push(instruction);
        }

        Ok(instructions)
    }
}

/// Parses the text of a .asm file into symbolic instructions
pub fn parse_asm(source: &str) -> AsmParseResult<Vec<AsmInstruction>> {
    let instructions = Parser::new(source).parse()?;
    log::trace!("parsed {} assembly instructions", instructions.len());
    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use Register::*;

    fn c(dest: Destination, comp: Computation, jump: Jump) -> AsmInstruction {
        AsmInstruction::c(dest, comp, jump)
    }

    #[test]
    fn test_minus_one_edge_case() {
        let expected = Ok(vec![c(Destination::D, Computation::BinaryDec(A), Jump::Next)]);
        assert_eq!(expected, parse_asm("D=A-1"));
        assert_eq!(expected, parse_asm("D = A - 1 "));
    }

    #[test]
    fn test_minus_one_edge_case_with_jump() {
        let expected = Ok(vec![c(Destination::D, Computation::BinaryDec(A), Jump::Eq)]);
        assert_eq!(expected, parse_asm("D=A-1;JEQ"));
        assert_eq!(expected, parse_asm("D = A - 1 ; JEQ "));
    }

    #[test]
    fn test_parse_multiple() {
        assert_eq!(
            parse_asm("D=A-1;JEQ\nA=-1\nAM=M-1\nD=!M\nMD=-D"),
            Ok(vec![
                c(Destination::D, Computation::BinaryDec(A), Jump::Eq),
                c(Destination::A, Computation::ConstNegOne, Jump::Next),
                c(Destination::AM, Computation::BinaryDec(M), Jump::Next),
                c(Destination::D, Computation::UnaryBoolNeg(M), Jump::Next),
                c(Destination::DM, Computation::UnaryIntNeg(D), Jump::Next),
            ])
        );
    }

    #[test]
    fn test_commutative_forms_are_normalised() {
        assert_eq!(
            parse_asm("M=M+D\nD=A&D\nD=M|D"),
            Ok(vec![
                c(Destination::M, Computation::BinaryAdd(D, M), Jump::Next),
                c(Destination::D, Computation::BinaryAnd(D, A), Jump::Next),
                c(Destination::D, Computation::BinaryOr(D, M), Jump::Next),
            ])
        );
    }

    #[test]
    fn test_parse_full_program() {
        let src = r#"
            // Adds 1 + ... + 100
            @i
            M=1
            @sum
            M=0
            (LOOP)
            @i
            D=M
            @100
            D=D-A // D=i-100
            @END
            D;JGT // if (i-100)>0 goto END
            @i
            D=M
            @sum
            M=D+M // sum=sum+i
            @i
            M=M+1 // i=i+1
            @LOOP
            0;JMP // goto LOOP
            (END)
            @END
            0;JMP // infinite loop"#;

        let instructions = parse_asm(src).unwrap();
        assert_eq!(22, instructions.len());
        assert_eq!(
            &instructions[..8],
            &[
                AsmInstruction::symbol("i"),
                c(Destination::M, Computation::ConstOne, Jump::Next),
                AsmInstruction::symbol("sum"),
                c(Destination::M, Computation::ConstZero, Jump::Next),
                AsmInstruction::label("LOOP"),
                AsmInstruction::symbol("i"),
                c(Destination::D, Computation::UnaryNone(M), Jump::Next),
                AsmInstruction::constant(100),
            ]
        );
        assert_eq!(
            instructions[10],
            c(Destination::None, Computation::UnaryNone(D), Jump::Gt)
        );
        assert_eq!(instructions[20], AsmInstruction::symbol("END"));
    }

    #[test]
    fn test_symbols_with_special_characters() {
        assert_eq!(
            parse_asm("@Main.main$ret.0\n(Main.main$WHILE_END_0)\n@R13"),
            Ok(vec![
                AsmInstruction::symbol("Main.main$ret.0"),
                AsmInstruction::label("Main.main$WHILE_END_0"),
                AsmInstruction::symbol("R13"),
            ])
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse_asm("D=A\n@32768"),
            Err(AsmParseError::ExpectedLabelOrConstant { line: 2 })
        );
        assert_eq!(
            parse_asm("D=2"),
            Err(AsmParseError::InvalidIntComp { value: 2, line: 1 })
        );
        assert_eq!(
            parse_asm("X=A"),
            Err(AsmParseError::InvalidDestination {
                dest: "X".to_owned(),
                line: 1
            })
        );
        assert_eq!(
            parse_asm("D;JXX"),
            Err(AsmParseError::ExpectedJump { line: 1 })
        );
        assert_eq!(
            parse_asm("D=A+M"),
            Err(AsmParseError::UnsupportedComputation {
                comp: "A+M".to_owned(),
                line: 1
            })
        );
        assert!(matches!(
            parse_asm("(LOOP"),
            Err(AsmParseError::UnexpectedEndOfFile { .. })
        ));
    }
}

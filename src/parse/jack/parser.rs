use super::ast::*;
use super::token::{Keyword, Symbol, Token, TokenKind};
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ParseError {
    #[error("token {token_idx} (line {line}): expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        token_idx: usize,
        line: u32,
    },
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEndOfInput { expected: String },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parses a whole file, which has to contain exactly one class
pub fn parse_class(tokens: &[Token]) -> ParseResult<Ast> {
    let mut parser = Parser::new(tokens);
    parser.class()?;
    parser.finish()
}

/// Parses a single statement. Mostly useful for tooling and tests
pub fn parse_statement(tokens: &[Token]) -> ParseResult<Ast> {
    let mut parser = Parser::new(tokens);
    parser.statement()?;
    parser.finish()
}

pub fn parse_expression(tokens: &[Token]) -> ParseResult<Ast> {
    let mut parser = Parser::new(tokens);
    parser.expression()?;
    parser.finish()
}

struct Parser<'t> {
    tokens: &'t [Token],
    // the index of the next token
    pos: usize,
    ast: Ast,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            ast: Ast::default(),
        }
    }

    fn finish(self) -> ParseResult<Ast> {
        if let Some(token) = self.peek() {
            return Err(Self::unexpected(token, "end of input"));
        }
        log::trace!(
            "parsed {} nodes from {} tokens",
            self.ast.len(),
            self.tokens.len()
        );
        Ok(self.ast)
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_nth(&self, n: usize) -> Option<&'t Token> {
        self.tokens.get(self.pos + n)
    }

    fn peek_is_symbol(&self, symbol: Symbol) -> bool {
        self.peek().map_or(false, |t| t.is_symbol(symbol))
    }

    fn peek_is_keyword(&self, keyword: Keyword) -> bool {
        self.peek().map_or(false, |t| t.is_keyword(keyword))
    }

    fn unexpected(token: &Token, expected: impl Into<String>) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: token.to_string(),
            token_idx: token.idx,
            line: token.line_nr,
        }
    }

    fn error_here(&self, expected: impl Into<String>) -> ParseError {
        match self.peek() {
            Some(token) => Self::unexpected(token, expected),
            None => ParseError::UnexpectedEndOfInput {
                expected: expected.into(),
            },
        }
    }

    fn advance(&mut self, expected: &str) -> ParseResult<&'t Token> {
        let token = self.peek().ok_or_else(|| ParseError::UnexpectedEndOfInput {
            expected: expected.to_owned(),
        })?;
        self.pos += 1;
        Ok(token)
    }

    fn consume_symbol(&mut self, symbol: Symbol) -> ParseResult<&'t Token> {
        if self.peek_is_symbol(symbol) {
            self.advance(symbol.as_str())
        } else {
            Err(self.error_here(format!("'{}'", symbol.as_str())))
        }
    }

    fn consume_keyword(&mut self, keyword: Keyword) -> ParseResult<&'t Token> {
        if self.peek_is_keyword(keyword) {
            self.advance("keyword")
        } else {
            Err(self.error_here(format!("{:?}", keyword).to_lowercase()))
        }
    }

    fn consume_ident(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Identifier => {
                self.pos += 1;
                Ok(token.source.clone())
            }
            _ => Err(self.error_here("identifier")),
        }
    }

    fn range_from(&self, start: usize) -> Range<usize> {
        start..self.pos
    }

    fn push(&mut self, kind: NodeKind, start: usize, children: Vec<NodeIdx>) -> NodeIdx {
        let range = self.range_from(start);
        self.ast.push(kind, range, children)
    }

    /// type: 'int' | 'char' | 'boolean' | className
    fn type_name(&mut self) -> ParseResult<Type> {
        let token = self.peek().ok_or_else(|| self.error_here("type"))?;
        let type_name = match &token.kind {
            TokenKind::Keyword(Keyword::Int) => Type::Int,
            TokenKind::Keyword(Keyword::Char) => Type::Char,
            TokenKind::Keyword(Keyword::Boolean) => Type::Boolean,
            TokenKind::Identifier => Type::ClassName(token.source.clone()),
            _ => return Err(Self::unexpected(token, "type")),
        };
        self.pos += 1;
        Ok(type_name)
    }

    /// varName (',' varName)* ';'
    fn var_names(&mut self) -> ParseResult<Vec<String>> {
        let mut names = vec![self.consume_ident()?];
        while self.peek_is_symbol(Symbol::Comma) {
            self.pos += 1;
            names.push(self.consume_ident()?);
        }
        self.consume_symbol(Symbol::Semicolon)?;
        Ok(names)
    }

    /// 'class' className '{' classVarDec* subroutineDec* '}'
    fn class(&mut self) -> ParseResult<NodeIdx> {
        let start = self.pos;
        self.consume_keyword(Keyword::Class)?;
        let name = self.consume_ident()?;
        self.consume_symbol(Symbol::LCurly)?;

        let mut var_declarations = Vec::new();
        while self.peek_is_keyword(Keyword::Static) || self.peek_is_keyword(Keyword::Field) {
            var_declarations.push(self.class_var_declaration()?);
        }

        let mut subroutines = Vec::new();
        while !self.peek_is_symbol(Symbol::RCurly) {
            subroutines.push(self.subroutine()?);
        }
        self.consume_symbol(Symbol::RCurly)?;

        let children = var_declarations.iter().chain(&subroutines).copied().collect();
        let class = Class {
            name,
            var_declarations,
            subroutines,
        };
        Ok(self.push(NodeKind::Class(class), start, children))
    }

    /// ('static' | 'field') type varName (',' varName)* ';'
    fn class_var_declaration(&mut self) -> ParseResult<NodeIdx> {
        let start = self.pos;
        let kind = if self.peek_is_keyword(Keyword::Static) {
            ClassVarKind::Static
        } else {
            ClassVarKind::Field
        };
        self.pos += 1;

        let type_name = self.type_name()?;
        let var_names = self.var_names()?;
        let declaration = ClassVarDeclaration {
            kind,
            type_name,
            var_names,
        };
        Ok(self.push(NodeKind::ClassVarDeclaration(declaration), start, vec![]))
    }

    /// ('constructor' | 'function' | 'method') ('void' | type) subroutineName
    /// '(' parameterList ')' subroutineBody
    fn subroutine(&mut self) -> ParseResult<NodeIdx> {
        let start = self.pos;
        let token = self.advance("subroutine declaration")?;
        let kind = match token.kind {
            TokenKind::Keyword(Keyword::Constructor) => SubroutineKind::Constructor,
            TokenKind::Keyword(Keyword::Function) => SubroutineKind::Function,
            TokenKind::Keyword(Keyword::Method) => SubroutineKind::Method,
            _ => {
                return Err(Self::unexpected(
                    token,
                    "'constructor', 'function', 'method' or '}'",
                ))
            }
        };

        let return_type = if self.peek_is_keyword(Keyword::Void) {
            self.pos += 1;
            None
        } else {
            Some(self.type_name()?)
        };
        let name = self.consume_ident()?;

        self.consume_symbol(Symbol::LParen)?;
        let mut parameters = Vec::new();
        if !self.peek_is_symbol(Symbol::RParen) {
            parameters.push(self.parameter()?);
            while self.peek_is_symbol(Symbol::Comma) {
                self.pos += 1;
                parameters.push(self.parameter()?);
            }
        }
        self.consume_symbol(Symbol::RParen)?;

        let body = self.subroutine_body()?;

        let mut children = parameters.clone();
        children.push(body);
        let subroutine = Subroutine {
            kind,
            return_type,
            name,
            parameters,
            body,
        };
        Ok(self.push(NodeKind::Subroutine(subroutine), start, children))
    }

    fn parameter(&mut self) -> ParseResult<NodeIdx> {
        let start = self.pos;
        let type_name = self.type_name()?;
        let var_name = self.consume_ident()?;
        let parameter = Parameter {
            type_name,
            var_name,
        };
        Ok(self.push(NodeKind::Parameter(parameter), start, vec![]))
    }

    /// '{' varDec* statements '}'
    fn subroutine_body(&mut self) -> ParseResult<NodeIdx> {
        let start = self.pos;
        self.consume_symbol(Symbol::LCurly)?;

        let mut var_declarations = Vec::new();
        while self.peek_is_keyword(Keyword::Var) {
            var_declarations.push(self.var_declaration()?);
        }
        let statements = self.statements()?;
        self.consume_symbol(Symbol::RCurly)?;

        let children = var_declarations.iter().chain(&statements).copied().collect();
        let body = SubroutineBody {
            var_declarations,
            statements,
        };
        Ok(self.push(NodeKind::SubroutineBody(body), start, children))
    }

    /// 'var' type varName (',' varName)* ';'
    fn var_declaration(&mut self) -> ParseResult<NodeIdx> {
        let start = self.pos;
        self.consume_keyword(Keyword::Var)?;
        let type_name = self.type_name()?;
        let var_names = self.var_names()?;
        let declaration = VarDeclaration {
            type_name,
            var_names,
        };
        Ok(self.push(NodeKind::VarDeclaration(declaration), start, vec![]))
    }

    fn statements(&mut self) -> ParseResult<Vec<NodeIdx>> {
        let mut statements = Vec::new();
        while let Some(TokenKind::Keyword(
            Keyword::Let | Keyword::If | Keyword::While | Keyword::Do | Keyword::Return,
        )) = self.peek().map(|t| &t.kind)
        {
            statements.push(self.statement()?);
        }
        Ok(statements)
    }

    /// '{' statements '}'
    fn block(&mut self) -> ParseResult<Vec<NodeIdx>> {
        self.consume_symbol(Symbol::LCurly)?;
        let statements = self.statements()?;
        self.consume_symbol(Symbol::RCurly)?;
        Ok(statements)
    }

    fn statement(&mut self) -> ParseResult<NodeIdx> {
        let start = self.pos;
        let token = self.advance("statement")?;

        let (statement, children) = match token.kind {
            TokenKind::Keyword(Keyword::Let) => {
                let var_name = self.consume_ident()?;
                let index = if self.peek_is_symbol(Symbol::LBracket) {
                    self.pos += 1;
                    let index = self.expression()?;
                    self.consume_symbol(Symbol::RBracket)?;
                    Some(index)
                } else {
                    None
                };
                self.consume_symbol(Symbol::Equals)?;
                let value = self.expression()?;
                self.consume_symbol(Symbol::Semicolon)?;

                let children = index.into_iter().chain([value]).collect();
                let statement = Statement::Let {
                    var_name,
                    index,
                    value,
                };
                (statement, children)
            }
            TokenKind::Keyword(Keyword::If) => {
                let condition = self.parenthesized_condition()?;
                let then_branch = self.block()?;
                let else_branch = if self.peek_is_keyword(Keyword::Else) {
                    self.pos += 1;
                    Some(self.block()?)
                } else {
                    None
                };

                let mut children = vec![condition];
                children.extend(&then_branch);
                children.extend(else_branch.iter().flatten());
                let statement = Statement::If {
                    condition,
                    then_branch,
                    else_branch,
                };
                (statement, children)
            }
            TokenKind::Keyword(Keyword::While) => {
                let condition = self.parenthesized_condition()?;
                let body = self.block()?;

                let mut children = vec![condition];
                children.extend(&body);
                (Statement::While { condition, body }, children)
            }
            TokenKind::Keyword(Keyword::Do) => {
                let call_start = self.pos;
                let name = self.consume_ident()?;
                let call = self.subroutine_call(name, call_start)?;
                self.consume_symbol(Symbol::Semicolon)?;
                (Statement::Do(call), vec![call])
            }
            TokenKind::Keyword(Keyword::Return) => {
                let value = if self.peek_is_symbol(Symbol::Semicolon) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.consume_symbol(Symbol::Semicolon)?;
                (Statement::Return(value), value.into_iter().collect())
            }
            _ => return Err(Self::unexpected(token, "statement")),
        };

        Ok(self.push(NodeKind::Statement(statement), start, children))
    }

    /// '(' expression ')' as used by if and while. The parentheses belong to the statement
    fn parenthesized_condition(&mut self) -> ParseResult<NodeIdx> {
        self.consume_symbol(Symbol::LParen)?;
        let condition = self.expression()?;
        self.consume_symbol(Symbol::RParen)?;
        Ok(condition)
    }

    fn binary_operator(&self) -> Option<BinaryOperator> {
        let TokenKind::Symbol(symbol) = &self.peek()?.kind else {
            return None;
        };
        Some(match *symbol {
            Symbol::Plus => BinaryOperator::Plus,
            Symbol::Minus => BinaryOperator::Minus,
            Symbol::Star => BinaryOperator::Multiply,
            Symbol::Slash => BinaryOperator::Divide,
            Symbol::Ampersand => BinaryOperator::And,
            Symbol::Pipe => BinaryOperator::Or,
            Symbol::LessThan => BinaryOperator::LessThan,
            Symbol::LessThanOrEquals => BinaryOperator::LessThanOrEquals,
            Symbol::GreaterThan => BinaryOperator::GreaterThan,
            Symbol::GreaterThanOrEquals => BinaryOperator::GreaterThanOrEquals,
            Symbol::Equals => BinaryOperator::Equals,
            _ => return None,
        })
    }

    /// term (op term)*
    ///
    /// jack has no operator precedence, so the operators simply associate to the left
    fn expression(&mut self) -> ParseResult<NodeIdx> {
        let start = self.pos;
        let mut lhs = self.term()?;

        while let Some(operator) = self.binary_operator() {
            self.pos += 1;
            let rhs = self.term()?;
            let expression = Expression::Binary { operator, lhs, rhs };
            lhs = self.push(NodeKind::Expression(expression), start, vec![lhs, rhs]);
        }

        Ok(lhs)
    }

    fn term(&mut self) -> ParseResult<NodeIdx> {
        let start = self.pos;
        let token = self.advance("expression")?;

        let (expression, children) = match &token.kind {
            TokenKind::IntLiteral(value) => (Expression::IntConstant(*value), vec![]),
            TokenKind::StringLiteral(value) => (Expression::StringConstant(value.clone()), vec![]),
            TokenKind::Keyword(keyword) => {
                let constant = match keyword {
                    Keyword::True => KeywordConstant::True,
                    Keyword::False => KeywordConstant::False,
                    Keyword::Null => KeywordConstant::Null,
                    Keyword::This => KeywordConstant::This,
                    _ => return Err(Self::unexpected(token, "expression")),
                };
                (Expression::KeywordConstant(constant), vec![])
            }
            TokenKind::Symbol(Symbol::LParen) => {
                let inner = self.expression()?;
                self.consume_symbol(Symbol::RParen)?;
                (Expression::Parenthesized(inner), vec![inner])
            }
            TokenKind::Symbol(symbol @ (Symbol::Minus | Symbol::Tilde)) => {
                let operator = if *symbol == Symbol::Minus {
                    UnaryOperator::Minus
                } else {
                    UnaryOperator::Not
                };
                let operand = self.term()?;
                (Expression::Unary { operator, operand }, vec![operand])
            }
            TokenKind::Identifier => {
                let name = token.source.clone();
                match self.peek().map(|t| &t.kind) {
                    Some(TokenKind::Symbol(Symbol::LBracket)) => {
                        self.pos += 1;
                        let index = self.expression()?;
                        self.consume_symbol(Symbol::RBracket)?;
                        let expression = Expression::ArrayAccess {
                            var_name: name,
                            index,
                        };
                        (expression, vec![index])
                    }
                    Some(TokenKind::Symbol(Symbol::LParen | Symbol::Dot)) => {
                        return self.subroutine_call(name, start);
                    }
                    _ => (Expression::Variable(name), vec![]),
                }
            }
            _ => return Err(Self::unexpected(token, "expression")),
        };

        Ok(self.push(NodeKind::Expression(expression), start, children))
    }

    /// subroutineName '(' expressionList ')' | (className | varName) '.' subroutineName '(' expressionList ')'
    ///
    /// the first identifier was already consumed by the caller
    fn subroutine_call(&mut self, first: String, start: usize) -> ParseResult<NodeIdx> {
        let (receiver, name) = if self.peek_is_symbol(Symbol::Dot) {
            self.pos += 1;
            (Some(first), self.consume_ident()?)
        } else {
            (None, first)
        };

        self.consume_symbol(Symbol::LParen)?;
        let mut arguments = Vec::new();
        if !self.peek_is_symbol(Symbol::RParen) {
            arguments.push(self.expression()?);
            while self.peek_is_symbol(Symbol::Comma) {
                self.pos += 1;
                arguments.push(self.expression()?);
            }
        }
        self.consume_symbol(Symbol::RParen)?;

        let children = arguments.clone();
        let call = SubroutineCall {
            receiver,
            name,
            arguments,
        };
        Ok(self.push(NodeKind::Expression(Expression::Call(call)), start, children))
    }
}

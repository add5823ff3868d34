pub mod error;
mod expr;
mod stmt;

pub use error::{ParseError, ParseErrorFormatter};

use crate::ast::Module;
use crate::lexer::{Token, TokenType};

/// Parse a token stream into a module, accumulating parse errors.
pub fn parse(tokens: Vec<Token>) -> Result<Module, Vec<ParseError>> {
    let mut parser = Parser::new(tokens);
    parser.parse()
}

/// Recursive-descent parser over the lexer's token stream.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            position: 0,
            errors: Vec::new(),
        }
    }

    pub fn parse(&mut self) -> Result<Module, Vec<ParseError>> {
        let mut body = Vec::new();

        while !self.at_end() {
            if self.match_token(&TokenType::Newline) {
                continue;
            }
            match self.parse_statement() {
                Ok(stmt) => body.push(Box::new(stmt)),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }

        if self.errors.is_empty() {
            Ok(Module { body })
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    /// Skip forward to the start of the next statement after an error.
    fn synchronize(&mut self) {
        let mut depth = 0usize;
        while !self.at_end() {
            match self.current().token_type {
                TokenType::Newline if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenType::Indent => {
                    depth += 1;
                    self.advance();
                }
                TokenType::Dedent => {
                    depth = depth.saturating_sub(1);
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.current().token_type, TokenType::EOF)
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !self.at_end() {
            self.position += 1;
        }
        token
    }

    pub(crate) fn check(&self, token_type: &TokenType) -> bool {
        &self.current().token_type == token_type
    }

    pub(crate) fn match_token(&mut self, token_type: &TokenType) -> bool {
        if self.check(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(
        &mut self,
        token_type: &TokenType,
        expected: &str,
    ) -> Result<Token, ParseError> {
        if self.check(token_type) {
            Ok(self.advance())
        } else {
            let token = self.current();
            if matches!(token.token_type, TokenType::EOF) {
                Err(ParseError::eof(expected, token.line, token.column))
            } else {
                Err(ParseError::unexpected_token(
                    expected,
                    token.token_type.clone(),
                    token.line,
                    token.column,
                ))
            }
        }
    }

    pub(crate) fn expect_identifier(&mut self, expected: &str) -> Result<(String, Token), ParseError> {
        let token = self.current().clone();
        match &token.token_type {
            TokenType::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok((name, token))
            }
            TokenType::EOF => Err(ParseError::eof(expected, token.line, token.column)),
            other => Err(ParseError::unexpected_token(
                expected,
                other.clone(),
                token.line,
                token.column,
            )),
        }
    }
}

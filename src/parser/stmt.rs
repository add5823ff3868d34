use crate::ast::{Expr, Operator, Parameter, Stmt};
use crate::lexer::TokenType;

use super::{ParseError, Parser};

impl Parser {
    pub(crate) fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let token_type = self.current().token_type.clone();
        match token_type {
            TokenType::At => self.parse_decorated(),
            TokenType::Def => self.parse_function_def(Vec::new(), false),
            TokenType::Async => {
                let token = self.advance();
                if self.check(&TokenType::Def) {
                    self.parse_function_def(Vec::new(), true)
                } else {
                    Err(ParseError::unexpected_token(
                        "'def' after 'async'",
                        self.current().token_type.clone(),
                        token.line,
                        token.column,
                    ))
                }
            }
            TokenType::If => self.parse_if(),
            TokenType::While => self.parse_while(),
            TokenType::For => self.parse_for(),
            _ => self.parse_simple_statement(),
        }
    }

    fn parse_decorated(&mut self) -> Result<Stmt, ParseError> {
        let mut decorators = Vec::new();
        while self.match_token(&TokenType::At) {
            let decorator = self.parse_expression()?;
            decorators.push(Box::new(decorator));
            self.expect(&TokenType::Newline, "newline after decorator")?;
            while self.match_token(&TokenType::Newline) {}
        }

        let token_type = self.current().token_type.clone();
        match token_type {
            TokenType::Def => self.parse_function_def(decorators, false),
            TokenType::Async => {
                self.advance();
                if self.check(&TokenType::Def) {
                    self.parse_function_def(decorators, true)
                } else {
                    let token = self.current();
                    Err(ParseError::unexpected_token(
                        "'def' after 'async'",
                        token.token_type.clone(),
                        token.line,
                        token.column,
                    ))
                }
            }
            _ => {
                let token = self.current();
                Err(ParseError::unexpected_token(
                    "function definition after decorator",
                    token.token_type.clone(),
                    token.line,
                    token.column,
                ))
            }
        }
    }

    fn parse_function_def(
        &mut self,
        decorator_list: Vec<Box<Expr>>,
        is_async: bool,
    ) -> Result<Stmt, ParseError> {
        let def_token = self.expect(&TokenType::Def, "'def'")?;
        let (name, _) = self.expect_identifier("function name")?;

        self.expect(&TokenType::LeftParen, "'(' after function name")?;
        let params = self.parse_parameters()?;
        self.expect(&TokenType::RightParen, "')' after parameters")?;

        let returns = if self.match_token(&TokenType::Arrow) {
            Some(Box::new(self.parse_ternary()?))
        } else {
            None
        };

        self.expect(&TokenType::Colon, "':' after function signature")?;
        let body = self.parse_suite()?;

        Ok(Stmt::FunctionDef {
            name,
            params,
            body,
            decorator_list,
            returns,
            is_async,
            line: def_token.line,
            column: def_token.column,
        })
    }

    fn parse_parameters(&mut self) -> Result<Vec<Parameter>, ParseError> {
        let mut params = Vec::new();

        while !self.check(&TokenType::RightParen) {
            let is_vararg = self.match_token(&TokenType::Multiply);
            let is_kwarg = !is_vararg && self.match_token(&TokenType::Power);

            let (name, _) = self.expect_identifier("parameter name")?;

            let typ = if self.match_token(&TokenType::Colon) {
                Some(Box::new(self.parse_ternary()?))
            } else {
                None
            };

            let default = if self.match_token(&TokenType::Assign) {
                Some(Box::new(self.parse_ternary()?))
            } else {
                None
            };

            params.push(Parameter {
                name,
                typ,
                default,
                is_vararg,
                is_kwarg,
            });

            if !self.match_token(&TokenType::Comma) {
                break;
            }
        }

        Ok(params)
    }

    /// Parse an indented block, or a single simple statement on the same
    /// line (`if x: return y`).
    fn parse_suite(&mut self) -> Result<Vec<Box<Stmt>>, ParseError> {
        if self.match_token(&TokenType::Newline) {
            self.expect(&TokenType::Indent, "indented block")?;

            let mut body = Vec::new();
            while !self.check(&TokenType::Dedent) && !self.at_end() {
                if self.match_token(&TokenType::Newline) {
                    continue;
                }
                body.push(Box::new(self.parse_statement()?));
            }
            self.match_token(&TokenType::Dedent);

            if body.is_empty() {
                let token = self.current();
                return Err(ParseError::invalid_syntax(
                    "expected at least one statement in block",
                    token.line,
                    token.column,
                ));
            }
            Ok(body)
        } else {
            let stmt = self.parse_simple_statement()?;
            Ok(vec![Box::new(stmt)])
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let if_token = self.expect(&TokenType::If, "'if'")?;
        let test = self.parse_expression()?;
        self.expect(&TokenType::Colon, "':' after condition")?;
        let body = self.parse_suite()?;
        let orelse = self.parse_else_clause()?;

        Ok(Stmt::If {
            test: Box::new(test),
            body,
            orelse,
            line: if_token.line,
            column: if_token.column,
        })
    }

    fn parse_else_clause(&mut self) -> Result<Vec<Box<Stmt>>, ParseError> {
        if self.check(&TokenType::Elif) {
            let elif_token = self.advance();
            let test = self.parse_expression()?;
            self.expect(&TokenType::Colon, "':' after condition")?;
            let body = self.parse_suite()?;
            let orelse = self.parse_else_clause()?;
            Ok(vec![Box::new(Stmt::If {
                test: Box::new(test),
                body,
                orelse,
                line: elif_token.line,
                column: elif_token.column,
            })])
        } else if self.match_token(&TokenType::Else) {
            self.expect(&TokenType::Colon, "':' after 'else'")?;
            self.parse_suite()
        } else {
            Ok(Vec::new())
        }
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let while_token = self.expect(&TokenType::While, "'while'")?;
        let test = self.parse_expression()?;
        self.expect(&TokenType::Colon, "':' after condition")?;
        let body = self.parse_suite()?;

        let orelse = if self.match_token(&TokenType::Else) {
            self.expect(&TokenType::Colon, "':' after 'else'")?;
            self.parse_suite()?
        } else {
            Vec::new()
        };

        Ok(Stmt::While {
            test: Box::new(test),
            body,
            orelse,
            line: while_token.line,
            column: while_token.column,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let for_token = self.expect(&TokenType::For, "'for'")?;
        let target = self.parse_target_list()?;
        self.expect(&TokenType::In, "'in' after loop target")?;
        let iter = self.parse_expression_list()?;
        self.expect(&TokenType::Colon, "':' after loop iterable")?;
        let body = self.parse_suite()?;

        let orelse = if self.match_token(&TokenType::Else) {
            self.expect(&TokenType::Colon, "':' after 'else'")?;
            self.parse_suite()?
        } else {
            Vec::new()
        };

        Ok(Stmt::For {
            target: Box::new(target),
            iter: Box::new(iter),
            body,
            orelse,
            line: for_token.line,
            column: for_token.column,
        })
    }

    fn parse_simple_statement(&mut self) -> Result<Stmt, ParseError> {
        let token_type = self.current().token_type.clone();
        let stmt = match token_type {
            TokenType::Return => {
                let token = self.advance();
                let value = if self.check(&TokenType::Newline) {
                    None
                } else {
                    Some(Box::new(self.parse_expression_list()?))
                };
                Stmt::Return {
                    value,
                    line: token.line,
                    column: token.column,
                }
            }
            TokenType::Pass => {
                let token = self.advance();
                Stmt::Pass {
                    line: token.line,
                    column: token.column,
                }
            }
            TokenType::Break => {
                let token = self.advance();
                Stmt::Break {
                    line: token.line,
                    column: token.column,
                }
            }
            TokenType::Continue => {
                let token = self.advance();
                Stmt::Continue {
                    line: token.line,
                    column: token.column,
                }
            }
            TokenType::Assert => {
                let token = self.advance();
                let test = self.parse_ternary()?;
                let msg = if self.match_token(&TokenType::Comma) {
                    Some(Box::new(self.parse_ternary()?))
                } else {
                    None
                };
                Stmt::Assert {
                    test: Box::new(test),
                    msg,
                    line: token.line,
                    column: token.column,
                }
            }
            _ => self.parse_expr_or_assign()?,
        };

        self.expect(&TokenType::Newline, "newline after statement")?;
        Ok(stmt)
    }

    fn parse_expr_or_assign(&mut self) -> Result<Stmt, ParseError> {
        let line = self.current().line;
        let column = self.current().column;
        let first = self.parse_expression_list()?;

        if self.match_token(&TokenType::Assign) {
            let mut targets = vec![Box::new(Self::to_store(first)?)];
            let mut value = self.parse_expression_list()?;
            while self.match_token(&TokenType::Assign) {
                targets.push(Box::new(Self::to_store(value)?));
                value = self.parse_expression_list()?;
            }
            return Ok(Stmt::Assign {
                targets,
                value: Box::new(value),
                line,
                column,
            });
        }

        let op = match self.current().token_type {
            TokenType::PlusAssign => Some(Operator::Add),
            TokenType::MinusAssign => Some(Operator::Sub),
            TokenType::MulAssign => Some(Operator::Mult),
            TokenType::DivAssign => Some(Operator::Div),
            TokenType::FloorDivAssign => Some(Operator::FloorDiv),
            TokenType::ModAssign => Some(Operator::Mod),
            TokenType::PowAssign => Some(Operator::Pow),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let target = Self::to_store(first)?;
            if matches!(target, Expr::Tuple { .. } | Expr::List { .. }) {
                return Err(ParseError::invalid_syntax(
                    "augmented assignment target cannot be a tuple",
                    line,
                    column,
                ));
            }
            let value = self.parse_expression_list()?;
            return Ok(Stmt::AugAssign {
                target: Box::new(target),
                op,
                value: Box::new(value),
                line,
                column,
            });
        }

        Ok(Stmt::Expr {
            value: Box::new(first),
            line,
            column,
        })
    }
}

use crate::ast::{
    BoolOperator, CmpOperator, Expr, ExprContext, NameConstant, Number, Operator, UnaryOperator,
};
use crate::lexer::TokenType;

use super::{ParseError, Parser};

impl Parser {
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_ternary()
    }

    /// Parse `expr (',' expr)*`, producing a tuple node when more than one
    /// element (or a trailing comma) is present.
    pub(crate) fn parse_expression_list(&mut self) -> Result<Expr, ParseError> {
        let line = self.current().line;
        let column = self.current().column;
        let first = self.parse_ternary()?;

        if !self.check(&TokenType::Comma) {
            return Ok(first);
        }

        let mut elts = vec![Box::new(first)];
        while self.match_token(&TokenType::Comma) {
            if !starts_expression(&self.current().token_type) {
                break;
            }
            elts.push(Box::new(self.parse_ternary()?));
        }

        Ok(Expr::Tuple {
            elts,
            ctx: ExprContext::Load,
            line,
            column,
        })
    }

    pub(crate) fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let body = self.parse_or()?;

        if self.check(&TokenType::If) {
            let token = self.advance();
            let test = self.parse_or()?;
            self.expect(&TokenType::Else, "'else' in conditional expression")?;
            let orelse = self.parse_ternary()?;
            return Ok(Expr::IfExp {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
                line: token.line,
                column: token.column,
            });
        }

        Ok(body)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_and()?;
        if !self.check(&TokenType::Or) {
            return Ok(first);
        }

        let line = first.line();
        let mut values = vec![Box::new(first)];
        while self.match_token(&TokenType::Or) {
            values.push(Box::new(self.parse_and()?));
        }

        Ok(Expr::BoolOp {
            op: BoolOperator::Or,
            values,
            line,
            column: 0,
        })
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_not()?;
        if !self.check(&TokenType::And) {
            return Ok(first);
        }

        let line = first.line();
        let mut values = vec![Box::new(first)];
        while self.match_token(&TokenType::And) {
            values.push(Box::new(self.parse_not()?));
        }

        Ok(Expr::BoolOp {
            op: BoolOperator::And,
            values,
            line,
            column: 0,
        })
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenType::Not)
            && !matches!(self.peek_type_at(1), Some(TokenType::In))
        {
            let token = self.advance();
            let operand = self.parse_not()?;
            return Ok(Expr::UnaryOp {
                op: UnaryOperator::Not,
                operand: Box::new(operand),
                line: token.line,
                column: token.column,
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_bit_or()?;

        let mut ops = Vec::new();
        let mut comparators = Vec::new();

        loop {
            let token_type = self.current().token_type.clone();
            let op = match token_type {
                TokenType::Equal => {
                    self.advance();
                    CmpOperator::Eq
                }
                TokenType::NotEqual => {
                    self.advance();
                    CmpOperator::NotEq
                }
                TokenType::LessThan => {
                    self.advance();
                    CmpOperator::Lt
                }
                TokenType::LessEqual => {
                    self.advance();
                    CmpOperator::LtE
                }
                TokenType::GreaterThan => {
                    self.advance();
                    CmpOperator::Gt
                }
                TokenType::GreaterEqual => {
                    self.advance();
                    CmpOperator::GtE
                }
                TokenType::Is => {
                    self.advance();
                    if self.match_token(&TokenType::Not) {
                        CmpOperator::IsNot
                    } else {
                        CmpOperator::Is
                    }
                }
                TokenType::In => {
                    self.advance();
                    CmpOperator::In
                }
                TokenType::Not => {
                    if matches!(self.peek_type_at(1), Some(TokenType::In)) {
                        self.advance();
                        self.advance();
                        CmpOperator::NotIn
                    } else {
                        break;
                    }
                }
                _ => break,
            };
            ops.push(op);
            comparators.push(Box::new(self.parse_bit_or()?));
        }

        if ops.is_empty() {
            return Ok(left);
        }

        let line = left.line();
        Ok(Expr::Compare {
            left: Box::new(left),
            ops,
            comparators,
            line,
            column: 0,
        })
    }

    fn parse_bit_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bit_xor()?;
        while self.match_token(&TokenType::BitwiseOr) {
            let right = self.parse_bit_xor()?;
            left = binop(left, Operator::BitOr, right);
        }
        Ok(left)
    }

    fn parse_bit_xor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bit_and()?;
        while self.match_token(&TokenType::BitwiseXor) {
            let right = self.parse_bit_and()?;
            left = binop(left, Operator::BitXor, right);
        }
        Ok(left)
    }

    fn parse_bit_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_shift()?;
        while self.match_token(&TokenType::BitwiseAnd) {
            let right = self.parse_shift()?;
            left = binop(left, Operator::BitAnd, right);
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_arith()?;
        loop {
            let op = match self.current().token_type {
                TokenType::ShiftLeft => Operator::LShift,
                TokenType::ShiftRight => Operator::RShift,
                _ => break,
            };
            self.advance();
            let right = self.parse_arith()?;
            left = binop(left, op, right);
        }
        Ok(left)
    }

    fn parse_arith(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.current().token_type {
                TokenType::Plus => Operator::Add,
                TokenType::Minus => Operator::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = binop(left, op, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.current().token_type {
                TokenType::Multiply => Operator::Mult,
                TokenType::Divide => Operator::Div,
                TokenType::FloorDivide => Operator::FloorDiv,
                TokenType::Modulo => Operator::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = binop(left, op, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let op = match self.current().token_type {
            TokenType::Plus => Some(UnaryOperator::UAdd),
            TokenType::Minus => Some(UnaryOperator::USub),
            TokenType::BitwiseNot => Some(UnaryOperator::Invert),
            _ => None,
        };

        if let Some(op) = op {
            let token = self.advance();
            let operand = self.parse_factor()?;
            return Ok(Expr::UnaryOp {
                op,
                operand: Box::new(operand),
                line: token.line,
                column: token.column,
            });
        }

        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_postfix()?;
        if self.match_token(&TokenType::Power) {
            let exponent = self.parse_factor()?;
            return Ok(binop(base, Operator::Pow, exponent));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_atom()?;

        loop {
            let token_type = self.current().token_type.clone();
            match token_type {
                TokenType::LeftParen => {
                    let token = self.advance();
                    let (args, keywords) = self.parse_call_args()?;
                    expr = Expr::Call {
                        func: Box::new(expr),
                        args,
                        keywords,
                        line: token.line,
                        column: token.column,
                    };
                }
                TokenType::LeftBracket => {
                    let token = self.advance();
                    let slice = self.parse_subscript()?;
                    self.expect(&TokenType::RightBracket, "']' after subscript")?;
                    expr = Expr::Subscript {
                        value: Box::new(expr),
                        slice: Box::new(slice),
                        ctx: ExprContext::Load,
                        line: token.line,
                        column: token.column,
                    };
                }
                TokenType::Dot => {
                    let token = self.advance();
                    let (attr, _) = self.expect_identifier("attribute name")?;
                    expr = Expr::Attribute {
                        value: Box::new(expr),
                        attr,
                        ctx: ExprContext::Load,
                        line: token.line,
                        column: token.column,
                    };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    #[allow(clippy::type_complexity)]
    fn parse_call_args(
        &mut self,
    ) -> Result<(Vec<Box<Expr>>, Vec<(Option<String>, Box<Expr>)>), ParseError> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();

        while !self.check(&TokenType::RightParen) {
            if self.check(&TokenType::Multiply) {
                let token = self.advance();
                let value = self.parse_ternary()?;
                args.push(Box::new(Expr::Starred {
                    value: Box::new(value),
                    ctx: ExprContext::Load,
                    line: token.line,
                    column: token.column,
                }));
            } else if self.match_token(&TokenType::Power) {
                let value = self.parse_ternary()?;
                keywords.push((None, Box::new(value)));
            } else {
                let expr = self.parse_ternary()?;
                if self.match_token(&TokenType::Assign) {
                    match expr {
                        Expr::Name { id, .. } => {
                            let value = self.parse_ternary()?;
                            keywords.push((Some(id), Box::new(value)));
                        }
                        other => {
                            return Err(ParseError::invalid_syntax(
                                "keyword argument name must be an identifier",
                                other.line(),
                                0,
                            ));
                        }
                    }
                } else {
                    args.push(Box::new(expr));
                }
            }

            if !self.match_token(&TokenType::Comma) {
                break;
            }
        }

        self.expect(&TokenType::RightParen, "')' after arguments")?;
        Ok((args, keywords))
    }

    fn parse_subscript(&mut self) -> Result<Expr, ParseError> {
        let line = self.current().line;
        let column = self.current().column;

        let lower = if self.check(&TokenType::Colon) {
            None
        } else {
            Some(Box::new(self.parse_ternary()?))
        };

        if self.match_token(&TokenType::Colon) {
            let upper = if self.check(&TokenType::Colon) || self.check(&TokenType::RightBracket) {
                None
            } else {
                Some(Box::new(self.parse_ternary()?))
            };
            let step = if self.match_token(&TokenType::Colon) {
                if self.check(&TokenType::RightBracket) {
                    None
                } else {
                    Some(Box::new(self.parse_ternary()?))
                }
            } else {
                None
            };
            return Ok(Expr::Slice {
                lower,
                upper,
                step,
                line,
                column,
            });
        }

        match lower {
            Some(index) => Ok(*index),
            None => Err(ParseError::invalid_syntax(
                "empty subscript",
                line,
                column,
            )),
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let token = self.current().clone();

        match token.token_type {
            TokenType::Identifier(ref name) => {
                let name = name.clone();
                self.advance();
                Ok(Expr::Name {
                    id: name,
                    ctx: ExprContext::Load,
                    line: token.line,
                    column: token.column,
                })
            }
            TokenType::IntLiteral(value) => {
                self.advance();
                Ok(Expr::Num {
                    value: Number::Integer(value),
                    line: token.line,
                    column: token.column,
                })
            }
            TokenType::FloatLiteral(value) => {
                self.advance();
                Ok(Expr::Num {
                    value: Number::Float(value),
                    line: token.line,
                    column: token.column,
                })
            }
            TokenType::StringLiteral(ref value) => {
                let value = value.clone();
                self.advance();
                Ok(Expr::Str {
                    value,
                    line: token.line,
                    column: token.column,
                })
            }
            TokenType::True => {
                self.advance();
                Ok(Expr::NameConstant {
                    value: NameConstant::True,
                    line: token.line,
                    column: token.column,
                })
            }
            TokenType::False => {
                self.advance();
                Ok(Expr::NameConstant {
                    value: NameConstant::False,
                    line: token.line,
                    column: token.column,
                })
            }
            TokenType::None => {
                self.advance();
                Ok(Expr::NameConstant {
                    value: NameConstant::None,
                    line: token.line,
                    column: token.column,
                })
            }
            TokenType::Yield => {
                self.advance();
                let value = if starts_expression(&self.current().token_type) {
                    Some(Box::new(self.parse_expression_list()?))
                } else {
                    None
                };
                Ok(Expr::Yield {
                    value,
                    line: token.line,
                    column: token.column,
                })
            }
            TokenType::Lambda => Err(ParseError::invalid_syntax(
                "lambda expressions are not supported",
                token.line,
                token.column,
            )),
            TokenType::LeftParen => {
                self.advance();
                if self.match_token(&TokenType::RightParen) {
                    return Ok(Expr::Tuple {
                        elts: Vec::new(),
                        ctx: ExprContext::Load,
                        line: token.line,
                        column: token.column,
                    });
                }
                let inner = self.parse_expression_list()?;
                self.expect(&TokenType::RightParen, "')'")?;
                Ok(inner)
            }
            TokenType::LeftBracket => {
                self.advance();
                let mut elts = Vec::new();
                while !self.check(&TokenType::RightBracket) {
                    elts.push(Box::new(self.parse_ternary()?));
                    if !self.match_token(&TokenType::Comma) {
                        break;
                    }
                }
                self.expect(&TokenType::RightBracket, "']'")?;
                Ok(Expr::List {
                    elts,
                    ctx: ExprContext::Load,
                    line: token.line,
                    column: token.column,
                })
            }
            TokenType::LeftBrace => Err(ParseError::invalid_syntax(
                "dict and set displays are not supported",
                token.line,
                token.column,
            )),
            TokenType::EOF => Err(ParseError::eof("expression", token.line, token.column)),
            ref other => Err(ParseError::unexpected_token(
                "expression",
                other.clone(),
                token.line,
                token.column,
            )),
        }
    }

    /// Parse a `for` loop target: names, attributes, subscripts, tuples.
    pub(crate) fn parse_target_list(&mut self) -> Result<Expr, ParseError> {
        let line = self.current().line;
        let column = self.current().column;
        let first = self.parse_target()?;

        if !self.check(&TokenType::Comma) {
            return Self::to_store(first);
        }

        let mut elts = vec![Box::new(first)];
        while self.match_token(&TokenType::Comma) {
            if !starts_expression(&self.current().token_type) {
                break;
            }
            elts.push(Box::new(self.parse_target()?));
        }

        Self::to_store(Expr::Tuple {
            elts,
            ctx: ExprContext::Load,
            line,
            column,
        })
    }

    fn parse_target(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenType::Multiply) {
            let token = self.advance();
            let value = self.parse_target()?;
            return Ok(Expr::Starred {
                value: Box::new(value),
                ctx: ExprContext::Load,
                line: token.line,
                column: token.column,
            });
        }
        self.parse_postfix()
    }

    /// Convert a parsed expression into an assignment target, flipping name
    /// contexts to Store.
    pub(crate) fn to_store(expr: Expr) -> Result<Expr, ParseError> {
        match expr {
            Expr::Name {
                id, line, column, ..
            } => Ok(Expr::Name {
                id,
                ctx: ExprContext::Store,
                line,
                column,
            }),
            Expr::Attribute {
                value,
                attr,
                line,
                column,
                ..
            } => Ok(Expr::Attribute {
                value,
                attr,
                ctx: ExprContext::Store,
                line,
                column,
            }),
            Expr::Subscript {
                value,
                slice,
                line,
                column,
                ..
            } => Ok(Expr::Subscript {
                value,
                slice,
                ctx: ExprContext::Store,
                line,
                column,
            }),
            Expr::Starred {
                value,
                line,
                column,
                ..
            } => {
                let inner = Self::to_store(*value)?;
                Ok(Expr::Starred {
                    value: Box::new(inner),
                    ctx: ExprContext::Store,
                    line,
                    column,
                })
            }
            Expr::Tuple {
                elts, line, column, ..
            } => {
                let mut stored = Vec::new();
                for elt in elts {
                    stored.push(Box::new(Self::to_store(*elt)?));
                }
                Ok(Expr::Tuple {
                    elts: stored,
                    ctx: ExprContext::Store,
                    line,
                    column,
                })
            }
            Expr::List {
                elts, line, column, ..
            } => {
                let mut stored = Vec::new();
                for elt in elts {
                    stored.push(Box::new(Self::to_store(*elt)?));
                }
                Ok(Expr::List {
                    elts: stored,
                    ctx: ExprContext::Store,
                    line,
                    column,
                })
            }
            other => Err(ParseError::invalid_syntax(
                "cannot assign to this expression",
                other.line(),
                0,
            )),
        }
    }

    fn peek_type_at(&self, offset: usize) -> Option<&TokenType> {
        self.tokens
            .get(self.position + offset)
            .map(|t| &t.token_type)
    }
}

fn binop(left: Expr, op: Operator, right: Expr) -> Expr {
    let line = left.line();
    Expr::BinOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
        line,
        column: 0,
    }
}

/// Whether a token can begin an expression.
pub(crate) fn starts_expression(token_type: &TokenType) -> bool {
    matches!(
        token_type,
        TokenType::Identifier(_)
            | TokenType::IntLiteral(_)
            | TokenType::FloatLiteral(_)
            | TokenType::StringLiteral(_)
            | TokenType::True
            | TokenType::False
            | TokenType::None
            | TokenType::Not
            | TokenType::Plus
            | TokenType::Minus
            | TokenType::BitwiseNot
            | TokenType::LeftParen
            | TokenType::LeftBracket
            | TokenType::Yield
            | TokenType::Lambda
            | TokenType::Multiply
    )
}

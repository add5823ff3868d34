pub mod error;
pub mod token;

pub use error::LexerError;
pub use token::{Token, TokenType};

/// Indentation-aware tokenizer for the Python-like source language.
///
/// Produces a flat token stream with synthetic `Indent`/`Dedent`/`Newline`
/// tokens. Newlines inside parentheses, brackets and braces are treated as
/// plain whitespace, the way the host language's tokenizer treats implicit
/// line joining.
pub struct Lexer {
    chars: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    indent_stack: Vec<usize>,
    nesting: usize,
    at_line_start: bool,
    errors: Vec<LexerError>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            chars: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            indent_stack: vec![0],
            nesting: 0,
            at_line_start: true,
            errors: Vec::new(),
        }
    }

    pub fn get_errors(&self) -> &[LexerError] {
        &self.errors
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            if self.at_line_start && self.nesting == 0 {
                self.handle_indentation(&mut tokens);
                continue;
            }

            let c = match self.peek() {
                Some(c) => c,
                None => break,
            };

            match c {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '\n' => {
                    let line = self.line;
                    let column = self.column;
                    self.advance();
                    if self.nesting == 0 {
                        tokens.push(Token::new(TokenType::Newline, line, column, "\n".to_string()));
                        self.at_line_start = true;
                    }
                }
                '#' => self.skip_comment(),
                '\\' => {
                    let line = self.line;
                    let column = self.column;
                    self.advance();
                    if self.peek() == Some('\n') {
                        self.advance();
                    } else {
                        self.errors.push(LexerError::new(
                            "unexpected character after line continuation",
                            line,
                            column,
                        ));
                    }
                }
                c if c.is_ascii_digit() => {
                    let token = self.read_number();
                    tokens.push(token);
                }
                c if c.is_alphabetic() || c == '_' => {
                    let token = self.read_identifier();
                    tokens.push(token);
                }
                '"' | '\'' => {
                    let token = self.read_string(c);
                    tokens.push(token);
                }
                _ => {
                    let token = self.read_operator();
                    tokens.push(token);
                }
            }
        }

        // A final line without a trailing newline still terminates
        if let Some(last) = tokens.last() {
            if last.token_type != TokenType::Newline {
                tokens.push(Token::new(
                    TokenType::Newline,
                    self.line,
                    self.column,
                    String::new(),
                ));
            }
        }

        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            tokens.push(Token::new(
                TokenType::Dedent,
                self.line,
                self.column,
                String::new(),
            ));
        }

        tokens.push(Token::new(
            TokenType::EOF,
            self.line,
            self.column,
            String::new(),
        ));

        tokens
    }

    /// Measure the indentation of the next logical line, emitting Indent and
    /// Dedent tokens. Blank lines and comment-only lines are consumed whole.
    fn handle_indentation(&mut self, tokens: &mut Vec<Token>) {
        loop {
            let mut width = 0usize;
            loop {
                match self.peek() {
                    Some(' ') => {
                        self.advance();
                        width += 1;
                    }
                    Some('\t') => {
                        self.errors.push(LexerError::with_suggestion(
                            "tab character in indentation",
                            self.line,
                            self.column,
                            "indent with spaces",
                        ));
                        self.advance();
                        width += 4;
                    }
                    _ => break,
                }
            }

            match self.peek() {
                None => {
                    self.at_line_start = false;
                    return;
                }
                Some('\r') => {
                    self.advance();
                }
                Some('\n') => {
                    self.advance();
                }
                Some('#') => {
                    self.skip_comment();
                    if self.peek() == Some('\n') {
                        self.advance();
                    }
                }
                Some(_) => {
                    self.at_line_start = false;
                    let current = *self.indent_stack.last().unwrap();
                    if width > current {
                        self.indent_stack.push(width);
                        tokens.push(Token::new(TokenType::Indent, self.line, 1, String::new()));
                    } else if width < current {
                        while *self.indent_stack.last().unwrap() > width {
                            self.indent_stack.pop();
                            tokens.push(Token::new(
                                TokenType::Dedent,
                                self.line,
                                1,
                                String::new(),
                            ));
                        }
                        if *self.indent_stack.last().unwrap() != width {
                            self.errors.push(LexerError::new(
                                "unindent does not match any outer indentation level",
                                self.line,
                                1,
                            ));
                        }
                    }
                    return;
                }
            }
        }
    }

    fn read_number(&mut self) -> Token {
        let line = self.line;
        let column = self.column;
        let mut text = String::new();

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_at(1).map_or(false, |c| c.is_ascii_digit()) {
            is_float = true;
            text.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() || c == '_' {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        let cleaned: String = text.chars().filter(|c| *c != '_').collect();
        let token_type = if is_float {
            match cleaned.parse::<f64>() {
                Ok(value) => TokenType::FloatLiteral(value),
                Err(_) => {
                    self.errors
                        .push(LexerError::new("invalid float literal", line, column));
                    TokenType::Invalid(text.clone())
                }
            }
        } else {
            match cleaned.parse::<i64>() {
                Ok(value) => TokenType::IntLiteral(value),
                Err(_) => {
                    self.errors
                        .push(LexerError::new("integer literal out of range", line, column));
                    TokenType::Invalid(text.clone())
                }
            }
        };

        Token::new(token_type, line, column, text)
    }

    fn read_identifier(&mut self) -> Token {
        let line = self.line;
        let column = self.column;
        let mut text = String::new();

        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let token_type = match text.as_str() {
            "def" => TokenType::Def,
            "return" => TokenType::Return,
            "if" => TokenType::If,
            "elif" => TokenType::Elif,
            "else" => TokenType::Else,
            "while" => TokenType::While,
            "for" => TokenType::For,
            "in" => TokenType::In,
            "break" => TokenType::Break,
            "continue" => TokenType::Continue,
            "pass" => TokenType::Pass,
            "assert" => TokenType::Assert,
            "True" => TokenType::True,
            "False" => TokenType::False,
            "None" => TokenType::None,
            "and" => TokenType::And,
            "or" => TokenType::Or,
            "not" => TokenType::Not,
            "is" => TokenType::Is,
            "async" => TokenType::Async,
            "yield" => TokenType::Yield,
            "lambda" => TokenType::Lambda,
            _ => TokenType::Identifier(text.clone()),
        };

        Token::new(token_type, line, column, text)
    }

    fn read_string(&mut self, quote: char) -> Token {
        let line = self.line;
        let column = self.column;

        self.advance();
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }

        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    self.errors
                        .push(LexerError::new("unterminated string literal", line, column));
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('\\') => value.push('\\'),
                        Some('\'') => value.push('\''),
                        Some('"') => value.push('"'),
                        Some('\n') => {}
                        Some(other) => {
                            value.push('\\');
                            value.push(other);
                        }
                        None => {
                            self.errors.push(LexerError::new(
                                "unterminated string literal",
                                line,
                                column,
                            ));
                            break;
                        }
                    }
                }
                Some(c) if c == quote => {
                    if triple {
                        if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                            self.advance();
                            self.advance();
                            self.advance();
                            break;
                        }
                        value.push(c);
                        self.advance();
                    } else {
                        self.advance();
                        break;
                    }
                }
                Some('\n') if !triple => {
                    self.errors
                        .push(LexerError::new("unterminated string literal", line, column));
                    break;
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        Token::new(
            TokenType::StringLiteral(value.clone()),
            line,
            column,
            value,
        )
    }

    fn read_operator(&mut self) -> Token {
        let line = self.line;
        let column = self.column;
        let c = self.advance().unwrap();

        let (token_type, lexeme) = match c {
            '+' => {
                if self.peek() == Some('=') {
                    self.advance();
                    (TokenType::PlusAssign, "+=")
                } else {
                    (TokenType::Plus, "+")
                }
            }
            '-' => match self.peek() {
                Some('=') => {
                    self.advance();
                    (TokenType::MinusAssign, "-=")
                }
                Some('>') => {
                    self.advance();
                    (TokenType::Arrow, "->")
                }
                _ => (TokenType::Minus, "-"),
            },
            '*' => match self.peek() {
                Some('*') => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        (TokenType::PowAssign, "**=")
                    } else {
                        (TokenType::Power, "**")
                    }
                }
                Some('=') => {
                    self.advance();
                    (TokenType::MulAssign, "*=")
                }
                _ => (TokenType::Multiply, "*"),
            },
            '/' => match self.peek() {
                Some('/') => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        (TokenType::FloorDivAssign, "//=")
                    } else {
                        (TokenType::FloorDivide, "//")
                    }
                }
                Some('=') => {
                    self.advance();
                    (TokenType::DivAssign, "/=")
                }
                _ => (TokenType::Divide, "/"),
            },
            '%' => {
                if self.peek() == Some('=') {
                    self.advance();
                    (TokenType::ModAssign, "%=")
                } else {
                    (TokenType::Modulo, "%")
                }
            }
            '=' => {
                if self.peek() == Some('=') {
                    self.advance();
                    (TokenType::Equal, "==")
                } else {
                    (TokenType::Assign, "=")
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    (TokenType::NotEqual, "!=")
                } else {
                    self.errors
                        .push(LexerError::new("unexpected character '!'", line, column));
                    (TokenType::Invalid("!".to_string()), "!")
                }
            }
            '<' => match self.peek() {
                Some('=') => {
                    self.advance();
                    (TokenType::LessEqual, "<=")
                }
                Some('<') => {
                    self.advance();
                    (TokenType::ShiftLeft, "<<")
                }
                _ => (TokenType::LessThan, "<"),
            },
            '>' => match self.peek() {
                Some('=') => {
                    self.advance();
                    (TokenType::GreaterEqual, ">=")
                }
                Some('>') => {
                    self.advance();
                    (TokenType::ShiftRight, ">>")
                }
                _ => (TokenType::GreaterThan, ">"),
            },
            '&' => (TokenType::BitwiseAnd, "&"),
            '|' => (TokenType::BitwiseOr, "|"),
            '^' => (TokenType::BitwiseXor, "^"),
            '~' => (TokenType::BitwiseNot, "~"),
            '(' => {
                self.nesting += 1;
                (TokenType::LeftParen, "(")
            }
            ')' => {
                self.nesting = self.nesting.saturating_sub(1);
                (TokenType::RightParen, ")")
            }
            '[' => {
                self.nesting += 1;
                (TokenType::LeftBracket, "[")
            }
            ']' => {
                self.nesting = self.nesting.saturating_sub(1);
                (TokenType::RightBracket, "]")
            }
            '{' => {
                self.nesting += 1;
                (TokenType::LeftBrace, "{")
            }
            '}' => {
                self.nesting = self.nesting.saturating_sub(1);
                (TokenType::RightBrace, "}")
            }
            ',' => (TokenType::Comma, ","),
            '.' => (TokenType::Dot, "."),
            ':' => (TokenType::Colon, ":"),
            '@' => (TokenType::At, "@"),
            other => {
                self.errors.push(LexerError::new(
                    &format!("unexpected character '{}'", other),
                    line,
                    column,
                ));
                return Token::new(
                    TokenType::Invalid(other.to_string()),
                    line,
                    column,
                    other.to_string(),
                );
            }
        };

        Token::new(token_type, line, column, lexeme.to_string())
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.position).copied();
        if let Some(c) = c {
            self.position += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        c
    }
}

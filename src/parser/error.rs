use crate::lexer::TokenType;
use colored::Colorize;
use std::fmt;

/// Errors that can occur during parsing
#[derive(Debug, Clone)]
pub enum ParseError {
    /// An unexpected token was encountered
    UnexpectedToken {
        expected: String,
        found: TokenType,
        line: usize,
        column: usize,
    },

    /// Invalid syntax was detected
    InvalidSyntax {
        message: String,
        line: usize,
        column: usize,
    },

    /// End of file was reached unexpectedly
    EOF {
        expected: String,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            ParseError::UnexpectedToken { line, .. } => *line,
            ParseError::InvalidSyntax { line, .. } => *line,
            ParseError::EOF { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            ParseError::UnexpectedToken { column, .. } => *column,
            ParseError::InvalidSyntax { column, .. } => *column,
            ParseError::EOF { column, .. } => *column,
        }
    }

    pub fn unexpected_token(expected: &str, found: TokenType, line: usize, column: usize) -> Self {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found,
            line,
            column,
        }
    }

    pub fn invalid_syntax(message: &str, line: usize, column: usize) -> Self {
        ParseError::InvalidSyntax {
            message: message.to_string(),
            line,
            column,
        }
    }

    pub fn eof(expected: &str, line: usize, column: usize) -> Self {
        ParseError::EOF {
            expected: expected.to_string(),
            line,
            column,
        }
    }

    /// Get a user-friendly error message
    pub fn get_message(&self) -> String {
        match self {
            ParseError::UnexpectedToken {
                expected,
                found,
                line,
                column,
            } => format!(
                "Line {}, column {}: Expected {}, but found {:?}",
                line, column, expected, found
            ),
            ParseError::InvalidSyntax {
                message,
                line,
                column,
            } => format!("Line {}, column {}: {}", line, column, message),
            ParseError::EOF {
                expected,
                line,
                column,
            } => format!(
                "Line {}, column {}: Unexpected end of file, expected {}",
                line, column, expected
            ),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get_message())
    }
}

impl std::error::Error for ParseError {}

/// Formatter that renders an error with a few lines of source context and a
/// caret under the offending column.
pub struct ParseErrorFormatter<'a> {
    error: &'a ParseError,
    source: Option<&'a str>,
    colored: bool,
}

impl<'a> ParseErrorFormatter<'a> {
    pub fn new(error: &'a ParseError, source: Option<&'a str>, colored: bool) -> Self {
        Self {
            error,
            source,
            colored,
        }
    }

    pub fn format(&self) -> String {
        let mut result = String::new();

        let error_msg = self.error.get_message();
        if self.colored {
            result.push_str(&error_msg.bright_red().to_string());
        } else {
            result.push_str(&error_msg);
        }
        result.push('\n');

        if let Some(source) = self.source {
            if let Some(context) =
                source_context(source, self.error.line(), self.error.column(), self.colored)
            {
                result.push_str(&context);
            }
        }

        result
    }
}

impl<'a> fmt::Display for ParseErrorFormatter<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// Render a window of source lines around `line` with a caret at `column`.
pub fn source_context(
    source: &str,
    line: usize,
    column: usize,
    colored: bool,
) -> Option<String> {
    if line == 0 {
        return None;
    }

    let lines: Vec<&str> = source.lines().collect();
    if line > lines.len() {
        return None;
    }

    let mut result = String::new();

    let start_line = if line > 2 { line - 2 } else { 1 };
    let end_line = std::cmp::min(line + 2, lines.len());

    let line_num_width = end_line.to_string().len();

    for i in start_line..=end_line {
        let line_content = lines[i - 1];
        let line_num = format!("{:>width$}", i, width = line_num_width);

        if i == line {
            if colored {
                result.push_str(&format!(" {} | {}", line_num.bright_yellow(), line_content));
            } else {
                result.push_str(&format!(" {} | {}", line_num, line_content));
            }
            result.push('\n');

            let spaces = " ".repeat(line_num_width + 3 + column.saturating_sub(1));
            if colored {
                result.push_str(&format!("{}{}", spaces, "^".bright_red()));
            } else {
                result.push_str(&format!("{}{}", spaces, "^"));
            }
        } else {
            result.push_str(&format!(" {} | {}", line_num, line_content));
        }

        result.push('\n');
    }

    Some(result)
}

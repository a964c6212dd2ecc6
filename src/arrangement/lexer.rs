//! Lexer for the text script format
//!
//! A script is one block per line: a block name optionally followed by a
//! number. `#` starts a comment that runs to the end of the line, and
//! indentation carries no meaning.
//!
//! ```text
//! set_motor_speed 70
//! repeat_times 3
//!   forward_for 1.5
//! end_repeat
//! ```

use std::fmt;

/// Line and column of a token, both 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// All token variants produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String, SourceLocation),
    Number(f64, SourceLocation),
    Newline(SourceLocation),
    Eof(SourceLocation),
}

impl Token {
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::Ident(_, loc) | Token::Number(_, loc) | Token::Newline(loc) | Token::Eof(loc) => {
                *loc
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lex error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for LexError {}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Consume the whole input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(&c) = self.chars.peek() {
            let location = self.location();
            match c {
                '\n' => {
                    self.advance();
                    tokens.push(Token::Newline(location));
                }
                '#' => {
                    while self.chars.peek().is_some_and(|&c| c != '\n') {
                        self.advance();
                    }
                }
                c if c.is_whitespace() => {
                    self.advance();
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let mut word = String::new();
                    while let Some(&c) = self.chars.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            word.push(c);
                            self.advance();
                        } else {
                            break;
                        }
                    }
                    tokens.push(Token::Ident(word, location));
                }
                c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                    let mut text = String::new();
                    text.push(c);
                    self.advance();
                    while let Some(&c) = self.chars.peek() {
                        if c.is_ascii_digit() || c == '.' {
                            text.push(c);
                            self.advance();
                        } else {
                            break;
                        }
                    }
                    let value: f64 = text.parse().map_err(|_| LexError {
                        message: format!("invalid number '{}'", text),
                        location,
                    })?;
                    if !value.is_finite() {
                        return Err(LexError {
                            message: format!("number '{}' is out of range", text),
                            location,
                        });
                    }
                    tokens.push(Token::Number(value, location));
                }
                other => {
                    return Err(LexError {
                        message: format!("unexpected character '{}'", other),
                        location,
                    });
                }
            }
        }

        tokens.push(Token::Eof(self.location()));
        Ok(tokens)
    }
}

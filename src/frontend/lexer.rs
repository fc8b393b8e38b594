use crate::frontend::token::{DOUBLE_OPERATORS, Span, Token, TokenKind, is_keyword};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{line}:{col}: {message}")]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

/// Character-level scanner for `.lk` source.
///
/// Whitespace is insignificant and `#` comments run to the end of the line,
/// so neither reaches the token stream.
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        ch
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    fn error(&self, message: impl Into<String>, span: Span) -> LexerError {
        LexerError {
            message: message.into(),
            line: span.line,
            col: span.col,
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '#' {
                while let Some(c) = self.current() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Result<Token, LexerError> {
        let start = self.span();
        let mut text = String::new();

        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let mut kind = TokenKind::Integer;
        if self.current() == Some('.') {
            if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                return Err(self.error(
                    format!("expected digits after '{}.'", text),
                    self.span(),
                ));
            }
            kind = TokenKind::Float;
            text.push('.');
            self.advance();
            while let Some(ch) = self.current() {
                if ch.is_ascii_digit() {
                    text.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if matches!(self.current(), Some(c) if c.is_alphabetic() || c == '_') {
            return Err(self.error(
                format!("invalid number literal starting with '{}'", text),
                start,
            ));
        }

        Ok(Token::new(text, kind, start))
    }

    fn read_word(&mut self) -> Token {
        let start = self.span();
        let mut word = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let kind = if is_keyword(&word) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        Token::new(word, kind, start)
    }

    fn read_symbol(&mut self) -> Result<Token, LexerError> {
        let start = self.span();
        let Some(ch) = self.current() else {
            return Err(self.error("unexpected end of input", start));
        };

        if let Some(next) = self.peek() {
            let pair: String = [ch, next].iter().collect();
            if let Some((text, kind)) = DOUBLE_OPERATORS.iter().find(|(op, _)| *op == pair) {
                self.advance();
                self.advance();
                return Ok(Token::new(*text, *kind, start));
            }
        }

        let kind = match ch {
            '+' | '-' | '*' | '/' | '!' | '<' | '>' => TokenKind::Operator,
            '=' => TokenKind::Assign,
            '(' | ')' => TokenKind::Brace,
            ';' | ',' => TokenKind::Separator,
            '|' | '&' => {
                return Err(self.error(
                    format!("unexpected character '{}' (did you mean '{}{}'?)", ch, ch, ch),
                    start,
                ));
            }
            other => {
                return Err(self.error(format!("unexpected character '{}'", other), start));
            }
        };
        self.advance();
        Ok(Token::new(ch.to_string(), kind, start))
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia();
            let Some(ch) = self.current() else {
                break;
            };

            let token = if ch.is_ascii_digit() {
                self.read_number()?
            } else if ch.is_ascii_alphabetic() || ch == '_' {
                self.read_word()
            } else {
                self.read_symbol()?
            };
            tokens.push(token);
        }

        Ok(tokens)
    }
}

/// Source position of a token, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Integer,
    Float,
    Identifier,
    Keyword,
    Operator,
    Brace,
    Separator,
    Assign,
}

impl TokenKind {
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Integer => "INT",
            TokenKind::Float => "FLOAT",
            TokenKind::Identifier => "IDENT",
            TokenKind::Keyword => "KEYWORD",
            TokenKind::Operator => "OP",
            TokenKind::Brace => "BRACE",
            TokenKind::Separator => "SEP",
            TokenKind::Assign => "ASSIGN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(text: impl Into<String>, kind: TokenKind, span: Span) -> Self {
        Token {
            text: text.into(),
            kind,
            span,
        }
    }

    /// True when the token has the given kind and exact text.
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        self.is(TokenKind::Keyword, text)
    }
}

pub const KEYWORDS: &[&str] = &[
    "func", "main", "lol", "kek", "var", "int", "float", "if", "else", "while", "return", "scan",
    "print", "sin", "cos", "sqrt",
];

/// Two-character operators, checked before single characters.
pub const DOUBLE_OPERATORS: &[(&str, TokenKind)] = &[
    ("==", TokenKind::Operator),
    ("!=", TokenKind::Operator),
    ("<=", TokenKind::Operator),
    (">=", TokenKind::Operator),
    ("||", TokenKind::Operator),
    ("&&", TokenKind::Operator),
    ("+=", TokenKind::Assign),
    ("-=", TokenKind::Assign),
    ("*=", TokenKind::Assign),
    ("/=", TokenKind::Assign),
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_delimiters_are_keywords() {
        assert!(is_keyword("lol"));
        assert!(is_keyword("kek"));
        assert!(!is_keyword("lolkek"));
    }

    #[test]
    fn token_matches_kind_and_text() {
        let span = Span { line: 1, col: 1 };
        let tok = Token::new("while", TokenKind::Keyword, span);
        assert!(tok.is_keyword("while"));
        assert!(!tok.is(TokenKind::Identifier, "while"));
    }
}

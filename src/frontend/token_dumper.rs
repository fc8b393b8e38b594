use crate::frontend::token::{Token, TokenKind};

pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints just the token text
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const BLU: &'static str = "\x1b[34m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, tokens: &[Token]) {
        print!("{}", self.render(tokens));
    }

    pub fn render(&self, tokens: &[Token]) -> String {
        tokens.iter().map(|t| self.render_one(t)).collect()
    }

    fn render_one(&self, t: &Token) -> String {
        let colr = if self.color { self.color(t.kind) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        if self.show_debug_repr {
            format!(
                "[{:02}:{:02}] {}{:<8} {:?}{}\n",
                t.span.line,
                t.span.col,
                colr,
                t.kind.name(),
                t.text,
                reset
            )
        } else {
            format!(
                "[{:02}:{:02}] {}{:<8} {}{}\n",
                t.span.line,
                t.span.col,
                colr,
                t.kind.name(),
                t.text,
                reset
            )
        }
    }

    fn color(&self, kind: TokenKind) -> &'static str {
        match kind {
            TokenKind::Integer | TokenKind::Float => Self::CYN,
            TokenKind::Identifier => Self::YEL,
            TokenKind::Operator | TokenKind::Assign => Self::MAG,
            TokenKind::Keyword => Self::BLU,
            TokenKind::Brace | TokenKind::Separator => Self::DIM,
        }
    }
}

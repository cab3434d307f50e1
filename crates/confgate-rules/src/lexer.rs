//! Tokenizer for rule sources.
//!
//! Newlines are significant (they separate body statements) except inside
//! parentheses and brackets. `#` starts a comment that runs to end of line.

use confgate_core::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Str(String),
    Number(f64),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Semicolon,
    Newline,
    Assign,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eof,
}

impl TokenKind {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("`{name}`"),
            Self::Str(_) => "string".to_string(),
            Self::Number(_) => "number".to_string(),
            Self::Newline => "newline".to_string(),
            Self::Eof => "end of input".to_string(),
            other => format!("`{}`", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Comma => ",",
            Self::Dot => ".",
            Self::Semicolon => ";",
            Self::Assign => ":=",
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            _ => "?",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

struct Lexer<'a> {
    source_name: &'a str,
    chars: Vec<char>,
    cursor: usize,
    line: usize,
    column: usize,
    depth: usize,
    tokens: Vec<Token>,
}

/// Tokenize `text`. Positions start at `(line, column)`, which lets message
/// templates report errors relative to the enclosing source.
pub(crate) fn tokenize_at(
    source_name: &str,
    text: &str,
    line: usize,
    column: usize,
) -> Result<Vec<Token>, CompileError> {
    let mut lexer = Lexer {
        source_name,
        chars: text.chars().collect(),
        cursor: 0,
        line,
        column,
        depth: 0,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

pub(crate) fn tokenize(source_name: &str, text: &str) -> Result<Vec<Token>, CompileError> {
    tokenize_at(source_name, text, 1, 1)
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.cursor).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.cursor + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.cursor += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> CompileError {
        CompileError {
            source_name: self.source_name.to_string(),
            line,
            column,
            message: message.into(),
        }
    }

    fn push(&mut self, kind: TokenKind, line: usize, column: usize) {
        if kind == TokenKind::Newline
            && matches!(
                self.tokens.last().map(|t| &t.kind),
                None | Some(TokenKind::Newline)
            )
        {
            return;
        }
        self.tokens.push(Token { kind, line, column });
    }

    fn run(&mut self) -> Result<(), CompileError> {
        while let Some(c) = self.peek() {
            let (line, column) = (self.line, self.column);
            match c {
                '\n' => {
                    self.bump();
                    if self.depth == 0 {
                        self.push(TokenKind::Newline, line, column);
                    }
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                '#' => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                '"' => {
                    let s = self.string(line, column)?;
                    self.push(TokenKind::Str(s), line, column);
                }
                c if c.is_ascii_digit() => {
                    let n = self.number(line, column)?;
                    self.push(TokenKind::Number(n), line, column);
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let mut ident = String::new();
                    while let Some(c) = self.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            ident.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    self.push(TokenKind::Ident(ident), line, column);
                }
                _ => {
                    let kind = self.symbol(c, line, column)?;
                    match kind {
                        TokenKind::LParen | TokenKind::LBracket => self.depth += 1,
                        TokenKind::RParen | TokenKind::RBracket => {
                            self.depth = self.depth.saturating_sub(1)
                        }
                        _ => {}
                    }
                    self.push(kind, line, column);
                }
            }
        }
        let (line, column) = (self.line, self.column);
        self.push(TokenKind::Newline, line, column);
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            line,
            column,
        });
        Ok(())
    }

    fn symbol(&mut self, c: char, line: usize, column: usize) -> Result<TokenKind, CompileError> {
        self.bump();
        let two = |lexer: &mut Self, next: char, yes: TokenKind, no: TokenKind| {
            if lexer.peek() == Some(next) {
                lexer.bump();
                yes
            } else {
                no
            }
        };
        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ';' => TokenKind::Semicolon,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '<' => two(self, '=', TokenKind::Le, TokenKind::Lt),
            '>' => two(self, '=', TokenKind::Ge, TokenKind::Gt),
            ':' if self.peek() == Some('=') => {
                self.bump();
                TokenKind::Assign
            }
            '=' if self.peek() == Some('=') => {
                self.bump();
                TokenKind::Eq
            }
            '!' if self.peek() == Some('=') => {
                self.bump();
                TokenKind::Neq
            }
            '=' => {
                return Err(self.error(
                    line,
                    column,
                    "unexpected `=` (use `==` to compare or `:=` to assign)",
                ))
            }
            other => return Err(self.error(line, column, format!("unexpected character {other:?}"))),
        };
        Ok(kind)
    }

    fn string(&mut self, line: usize, column: usize) -> Result<String, CompileError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(self.error(line, column, "unterminated string literal"))
                }
                Some('"') => return Ok(out),
                Some('\\') => {
                    let (el, ec) = (self.line, self.column);
                    let translated = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some(other) => {
                            return Err(self.error(el, ec, format!("unknown escape `\\{other}`")))
                        }
                        None => {
                            return Err(self.error(line, column, "unterminated string literal"))
                        }
                    };
                    out.push(translated);
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self, line: usize, column: usize) -> Result<f64, CompileError> {
        let mut text = String::new();
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            text.extend(self.bump());
        }
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            text.extend(self.bump());
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                text.extend(self.bump());
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = matches!(self.peek_next(), Some('+' | '-'));
            let digit_at = if sign { 2 } else { 1 };
            if self
                .chars
                .get(self.cursor + digit_at)
                .is_some_and(|c| c.is_ascii_digit())
            {
                text.extend(self.bump());
                if sign {
                    text.extend(self.bump());
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    text.extend(self.bump());
                }
            }
        }
        text.parse::<f64>()
            .map_err(|e| self.error(line, column, format!("invalid number {text:?}: {e}")))
    }
}

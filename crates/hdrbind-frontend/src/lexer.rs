//! Tokenizer for C headers.
//!
//! Comments and preprocessor lines are dropped; there is no macro
//! expansion. Every token remembers the 1-based line and column it starts at.

/// Multi-character punctuators, longest first.
const PUNCTUATORS: &[&str] = &[
    "...", "<<=", ">>=", "<<", ">>", "->", "++", "--", "&&", "||", "==", "!=", "<=", ">=", "+=",
    "-=", "*=", "/=", "%=", "&=", "|=", "^=", "##", "{", "}", "(", ")", "[", "]", ";", ",", "*",
    "=", ":", "^", "&", "|", "~", "!", "+", "-", "/", "%", "<", ">", "?", ".", "#",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    /// Raw numeric literal text, suffixes included.
    Number(String),
    /// Character literal value.
    Char(u64),
    Str(String),
    Punct(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn is_punct(&self, punct: &str) -> bool {
        matches!(&self.kind, TokenKind::Punct(p) if *p == punct)
    }

    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_ident(&self, name: &str) -> bool {
        self.ident() == Some(name)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            TokenKind::Ident(name) => write!(f, "{name}"),
            TokenKind::Number(text) => write!(f, "{text}"),
            TokenKind::Char(value) => write!(f, "character literal {value}"),
            TokenKind::Str(text) => write!(f, "\"{text}\""),
            TokenKind::Punct(p) => write!(f, "{p}"),
        }
    }
}

/// A problem found while tokenizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

/// Split `source` into tokens, collecting errors instead of stopping at them.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexError>) {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
        line_start: true,
        tokens: Vec::new(),
        errors: Vec::new(),
    };
    lexer.run();
    (lexer.tokens, lexer.errors)
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    /// Only whitespace seen so far on the current line.
    line_start: bool,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl Lexer {
    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
            self.line_start = true;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&mut self, line: u32, column: u32, message: impl Into<String>) {
        self.errors.push(LexError {
            line,
            column,
            message: message.into(),
        });
    }

    fn push(&mut self, kind: TokenKind, line: u32, column: u32) {
        self.tokens.push(Token { kind, line, column });
        self.line_start = false;
    }

    fn run(&mut self) {
        while let Some(c) = self.peek(0) {
            let (line, column) = (self.line, self.column);
            match c {
                '\\' if matches!(self.peek(1), Some('\n')) => {
                    self.bump();
                    self.bump();
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                '/' if self.peek(1) == Some('/') => self.skip_line(),
                '/' if self.peek(1) == Some('*') => self.skip_block_comment(),
                '#' if self.line_start => self.skip_directive(),
                '"' => {
                    self.bump();
                    let text = self.quoted('"', line, column);
                    self.push(TokenKind::Str(text), line, column);
                }
                '\'' => {
                    self.bump();
                    let text = self.quoted('\'', line, column);
                    let value = text.chars().next().map_or(0, |c| c as u64);
                    self.push(TokenKind::Char(value), line, column);
                }
                c if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|n| n.is_ascii_digit())) => {
                    let text = self.number();
                    self.push(TokenKind::Number(text), line, column);
                }
                c if c.is_alphabetic() || c == '_' || c == '$' => self.identifier(line, column),
                _ => match self.punctuator() {
                    Some(p) => self.push(TokenKind::Punct(p), line, column),
                    None => {
                        self.bump();
                        self.error(line, column, format!("unexpected character '{c}'"));
                    }
                },
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek(0) {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) {
        let (line, column) = (self.line, self.column);
        self.bump();
        self.bump();
        loop {
            match self.bump() {
                Some('*') if self.peek(0) == Some('/') => {
                    self.bump();
                    return;
                }
                Some(_) => {}
                None => {
                    self.error(line, column, "unterminated /* comment");
                    return;
                }
            }
        }
    }

    /// Skip a preprocessor directive, including backslash continuations and
    /// block comments that run past the end of the line.
    fn skip_directive(&mut self) {
        while let Some(c) = self.peek(0) {
            match c {
                '\n' => break,
                '\\' if self.peek(1) == Some('\n') => {
                    self.bump();
                    self.bump();
                }
                '/' if self.peek(1) == Some('*') => self.skip_block_comment(),
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// Read a quoted literal body after its opening quote, decoding escapes.
    fn quoted(&mut self, quote: char, line: u32, column: u32) -> String {
        let mut text = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return text,
                Some('\\') => {
                    if let Some(c) = self.escape() {
                        text.push(c);
                    }
                }
                Some('\n') | None => {
                    self.error(line, column, format!("missing terminating {quote} character"));
                    return text;
                }
                Some(c) => text.push(c),
            }
        }
    }

    fn escape(&mut self) -> Option<char> {
        let c = self.bump()?;
        let decoded = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'a' => '\u{7}',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            'x' => {
                let mut value = 0u32;
                while let Some(d) = self.peek(0).and_then(|d| d.to_digit(16)) {
                    value = value.wrapping_mul(16).wrapping_add(d);
                    self.bump();
                }
                return char::from_u32(value);
            }
            '0'..='7' => {
                let mut value = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek(0).and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            self.bump();
                        }
                        None => break,
                    }
                }
                return char::from_u32(value);
            }
            other => other,
        };
        Some(decoded)
    }

    fn number(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek(0) {
            let hex = text.starts_with("0x") || text.starts_with("0X");
            let exponent_sign = (c == '+' || c == '-')
                && match text.chars().last() {
                    Some('e' | 'E') => !hex,
                    Some('p' | 'P') => hex,
                    _ => false,
                };
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '\'' || exponent_sign {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        text
    }

    fn identifier(&mut self, line: u32, column: u32) {
        let mut name = String::new();
        while let Some(c) = self.peek(0) {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        // Encoding prefixes on string and character literals.
        if matches!(name.as_str(), "L" | "u" | "U" | "u8") {
            if let Some(quote @ ('"' | '\'')) = self.peek(0) {
                self.bump();
                let text = self.quoted(quote, line, column);
                let kind = if quote == '"' {
                    TokenKind::Str(text)
                } else {
                    TokenKind::Char(text.chars().next().map_or(0, |c| c as u64))
                };
                self.push(kind, line, column);
                return;
            }
        }
        self.push(TokenKind::Ident(name), line, column);
    }

    fn punctuator(&mut self) -> Option<&'static str> {
        let found = PUNCTUATORS.iter().copied().find(|p| {
            p.chars()
                .enumerate()
                .all(|(i, expected)| self.peek(i) == Some(expected))
        })?;
        for _ in 0..found.len() {
            self.bump();
        }
        Some(found)
    }
}

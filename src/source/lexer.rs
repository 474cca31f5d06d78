//! Tokenizer for generated snapshot and fixture source.

use crate::errors::{ProxyError, ProxyResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Str(String),
    Num(f64),
    /// Single-character punctuation: `{ } [ ] ( ) , : ; . = -`
    Punct(char),
    /// `=>`
    Arrow,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// 1-based line of the first character.
    pub line: usize,
    /// Byte offsets into the source text.
    pub start: usize,
    pub end: usize,
    /// At least one empty line separates this token from the previous one.
    pub blank_before: bool,
}

impl Token {
    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }

    pub fn is_ident(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(s) if s == name)
    }
}

pub(crate) fn tokenize(text: &str) -> ProxyResult<Vec<Token>> {
    Lexer::new(text).run()
}

struct Lexer<'a> {
    text: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: usize,
    newlines: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices().collect(),
            pos: 0,
            line: 1,
            newlines: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map_or(self.text.len(), |(offset, _)| *offset)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.newlines += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> ProxyError {
        ProxyError::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    fn run(mut self) -> ProxyResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.newlines = 0;
            self.skip_trivia()?;
            let blank_before = self.newlines >= 2;
            let line = self.line;
            let start = self.offset();
            let kind = match self.peek() {
                None => {
                    tokens.push(Token {
                        kind: TokenKind::Eof,
                        line,
                        start,
                        end: start,
                        blank_before,
                    });
                    return Ok(tokens);
                }
                Some(c) if c == '"' || c == '\'' => self.string(c)?,
                Some(c) if c.is_ascii_digit() => self.number()?,
                Some('.') if self.peek_at(1).map_or(false, |c| c.is_ascii_digit()) => {
                    self.number()?
                }
                Some(c) if c.is_alphabetic() || c == '_' || c == '$' => self.ident(),
                Some('=') if self.peek_at(1) == Some('>') => {
                    self.bump();
                    self.bump();
                    TokenKind::Arrow
                }
                Some(c) if "{}[](),:;.=-".contains(c) => {
                    self.bump();
                    TokenKind::Punct(c)
                }
                Some(c) => return Err(self.error(format!("unexpected character '{}'", c))),
            };
            tokens.push(Token {
                kind,
                line,
                start,
                end: self.offset(),
                blank_before,
            });
        }
    }

    fn skip_trivia(&mut self) -> ProxyResult<()> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    self.bump();
                    self.bump();
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('*'), Some('/')) => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => return Err(self.error("unterminated comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn ident(&mut self) -> TokenKind {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        TokenKind::Ident(name)
    }

    fn number(&mut self) -> ProxyResult<TokenKind> {
        let start = self.offset();
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '-' || c == '+')
                && matches!(self.chars.get(self.pos.wrapping_sub(1)), Some((_, 'e' | 'E')));
            if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign {
                self.bump();
            } else {
                break;
            }
        }
        let literal = &self.text[start..self.offset()];
        literal
            .parse::<f64>()
            .map(TokenKind::Num)
            .map_err(|_| self.error(format!("invalid number '{}'", literal)))
    }

    fn string(&mut self, quote: char) -> ProxyResult<TokenKind> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(TokenKind::Str(value)),
                Some('\\') => value.push(self.escape()?),
                Some(c) => value.push(c),
            }
        }
    }

    fn escape(&mut self) -> ProxyResult<char> {
        let c = self
            .bump()
            .ok_or_else(|| self.error("unterminated escape"))?;
        Ok(match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            '0' => '\0',
            'u' => return self.unicode_escape(),
            other => other,
        })
    }

    fn unicode_escape(&mut self) -> ProxyResult<char> {
        let high = self.hex4()?;
        if (0xD800..0xDC00).contains(&high) {
            // surrogate pair, as emitted by JSON encoders
            if self.peek() == Some('\\') && self.peek_at(1) == Some('u') {
                self.bump();
                self.bump();
                let low = self.hex4()?;
                let code = 0x10000 + ((high - 0xD800) << 10) + (low.wrapping_sub(0xDC00) & 0x3FF);
                return char::from_u32(code).ok_or_else(|| self.error("invalid surrogate pair"));
            }
            return Err(self.error("unpaired surrogate"));
        }
        char::from_u32(high).ok_or_else(|| self.error("invalid unicode escape"))
    }

    fn hex4(&mut self) -> ProxyResult<u32> {
        let mut code = 0;
        for _ in 0..4 {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("invalid unicode escape"))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }
}

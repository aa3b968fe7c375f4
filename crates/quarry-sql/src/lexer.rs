//! Splits SQL text written by callers into the pieces the serializer
//! rewrites: dotted identifier paths and named parameters. Everything else,
//! including quoted literals and quoted identifiers, passes through as text.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'s> {
    /// Emitted verbatim
    Text(&'s str),

    /// An unquoted identifier, possibly dotted: `post`, `post.author.id`
    Path(&'s str),

    /// `:name`, or `:...name` when `spread` is set
    Param { name: &'s str, spread: bool },
}

pub(crate) struct Lexer<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Lexer<'s> {
    pub(crate) fn new(src: &'s str) -> Lexer<'s> {
        Lexer { src, pos: 0 }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    fn starts_with(&self, pat: &str) -> bool {
        self.src[self.pos..].starts_with(pat)
    }

    fn take_while(&mut self, start: usize, pred: impl Fn(u8) -> bool) -> &'s str {
        while self.peek(0).is_some_and(&pred) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    /// Consumes a quoted section. A doubled quote character is an escaped
    /// quote. An unterminated section runs to the end of the input.
    fn quoted(&mut self, quote: u8) -> &'s str {
        let start = self.pos;
        self.pos += 1;

        while let Some(c) = self.peek(0) {
            self.pos += 1;
            if c == quote {
                if self.peek(0) == Some(quote) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }

        &self.src[start..self.pos]
    }

    fn path(&mut self) -> &'s str {
        let start = self.pos;

        loop {
            self.take_while(self.pos, is_ident_continue);

            if self.peek(0) == Some(b'.') && self.peek(1).is_some_and(is_ident_start) {
                self.pos += 1;
            } else {
                break;
            }
        }

        &self.src[start..self.pos]
    }

    fn param(&mut self) -> Option<Token<'s>> {
        let spread = self.src[self.pos + 1..].starts_with("...");
        let name_start = self.pos + if spread { 4 } else { 1 };

        if !self
            .src
            .as_bytes()
            .get(name_start)
            .copied()
            .is_some_and(is_ident_start)
        {
            return None;
        }

        self.pos = name_start;
        let mut name = self.take_while(name_start, |c| is_ident_continue(c) || c == b'.');

        // A trailing period belongs to the surrounding text
        while let Some(stripped) = name.strip_suffix('.') {
            name = stripped;
            self.pos -= 1;
        }

        Some(Token::Param { name, spread })
    }
}

impl<'s> Iterator for Lexer<'s> {
    type Item = Token<'s>;

    fn next(&mut self) -> Option<Token<'s>> {
        let start = self.pos;
        let c = self.peek(0)?;

        let token = match c {
            b'\'' | b'"' | b'`' => Token::Text(self.quoted(c)),
            b'-' if self.starts_with("--") => {
                let text = self.take_while(start, |c| c != b'\n');
                Token::Text(text)
            }
            b'/' if self.starts_with("/*") => {
                let end = self.src[start + 2..]
                    .find("*/")
                    .map_or(self.src.len(), |i| start + 2 + i + 2);
                self.pos = end;
                Token::Text(&self.src[start..end])
            }
            b':' if self.starts_with("::") => {
                // A cast: the type name that follows is not a property
                self.pos += 2;
                self.take_while(self.pos, |c| c == b' ');
                self.take_while(self.pos, is_ident_continue);
                Token::Text(&self.src[start..self.pos])
            }
            b':' => match self.param() {
                Some(token) => token,
                None => {
                    self.pos += 1;
                    Token::Text(&self.src[start..self.pos])
                }
            },
            c if c.is_ascii_digit() => {
                let text = self.take_while(start, |c| is_ident_continue(c) || c == b'.');
                Token::Text(text)
            }
            c if is_ident_start(c) => Token::Path(self.path()),
            _ => {
                // Copy everything up to the next interesting character
                self.pos += 1;
                while let Some(c) = self.peek(0) {
                    let delimiter = matches!(c, b'\'' | b'"' | b'`' | b':' | b'-' | b'/');
                    if delimiter || is_ident_start(c) || c.is_ascii_digit() {
                        break;
                    }
                    self.pos += 1;
                }
                // Multi-byte characters are never split since every
                // delimiter above is ASCII
                Token::Text(&self.src[start..self.pos])
            }
        };

        Some(token)
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c >= 0x80
}

fn is_ident_continue(c: u8) -> bool {
    is_ident_start(c) || c.is_ascii_digit() || c == b'$'
}

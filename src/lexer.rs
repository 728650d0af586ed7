use thiserror::Error;

use crate::{
    ast::{Span, Token, TokenKind},
    chars,
};

/// Character offset into the condition text.
pub type Position = usize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    #[error("unterminated quoted string")]
    UnterminatedString,

    #[error("unterminated '{0}(' reference, missing ')'")]
    UnterminatedReference(char),

    #[error("'{0}' must be followed by '('")]
    IllFormedReference(char),

    #[error("unexpected '=' (did you mean '=='?)")]
    IllFormedEquals,

    #[error("unexpected character '{0}'")]
    IllegalCharacter(char),

    #[error("malformed number '{0}'")]
    MalformedNumber(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at position {position}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub position: Position,
}

impl LexError {
    fn new(kind: LexErrorKind, position: Position) -> Self {
        LexError { kind, position }
    }
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    done: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            done: false,
        }
    }

    /// The full text being lexed.
    pub fn source(&self) -> String {
        self.input.iter().collect()
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn text(&self, start: usize, end: usize) -> String {
        self.input[start..end].iter().collect()
    }

    fn read_reference(&mut self, sigil: char, kind: TokenKind) -> Result<Token, LexError> {
        let start = self.position;
        if self.peek_char(1) != Some('(') {
            return Err(LexError::new(LexErrorKind::IllFormedReference(sigil), start));
        }

        let end = chars::reference_end(&self.input, start)
            .ok_or_else(|| LexError::new(LexErrorKind::UnterminatedReference(sigil), start))?;

        self.position = end;
        Ok(Token::value(
            kind,
            self.text(start, end),
            true,
            Span::new(start, end),
        ))
    }

    fn read_string(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let mut result = String::new();
        let mut expandable = false;
        self.advance(); // opening quote

        loop {
            match self.current_char() {
                None => return Err(LexError::new(LexErrorKind::UnterminatedString, start)),
                Some('\'') => {
                    self.advance();
                    return Ok(Token::value(
                        TokenKind::String,
                        result,
                        expandable,
                        Span::new(start, self.position),
                    ));
                }
                Some(sigil @ ('$' | '@' | '%')) if self.peek_char(1) == Some('(') => {
                    expandable = true;
                    let end = chars::reference_end(&self.input, self.position).ok_or_else(|| {
                        LexError::new(LexErrorKind::UnterminatedReference(sigil), self.position)
                    })?;
                    result.push_str(&self.text(self.position, end));
                    self.position = end;
                }
                Some('%') => {
                    expandable = true;
                    result.push('%');
                    self.advance();
                }
                Some(ch) => {
                    result.push(ch);
                    self.advance();
                }
            }
        }
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.position;

        if self.current_char() == Some('0') && matches!(self.peek_char(1), Some('x' | 'X')) {
            self.advance();
            self.advance();
            let digits_start = self.position;
            while self.current_char().is_some_and(chars::is_hex_digit) {
                self.advance();
            }
            if self.position == digits_start {
                return Err(LexError::new(
                    LexErrorKind::MalformedNumber(self.text(start, self.position)),
                    start,
                ));
            }
        } else {
            if matches!(self.current_char(), Some('+' | '-')) {
                self.advance();
            }
            let mut saw_digit = false;
            while let Some(ch) = self.current_char() {
                if ch.is_ascii_digit() {
                    saw_digit = true;
                    self.advance();
                } else if ch == '.' {
                    self.advance();
                } else {
                    break;
                }
            }
            if !saw_digit {
                return Err(LexError::new(
                    LexErrorKind::MalformedNumber(self.text(start, self.position)),
                    start,
                ));
            }
        }

        Ok(Token::value(
            TokenKind::Numeric,
            self.text(start, self.position),
            false,
            Span::new(start, self.position),
        ))
    }

    fn read_identifier(&mut self) -> Token {
        let start = self.position;
        while self.current_char().is_some_and(chars::is_simple_string_char) {
            self.advance();
        }
        let ident = self.text(start, self.position);
        let span = Span::new(start, self.position);

        if ident.eq_ignore_ascii_case("and") {
            return Token::structural(TokenKind::And, span);
        }
        if ident.eq_ignore_ascii_case("or") {
            return Token::structural(TokenKind::Or, span);
        }
        if ident.eq_ignore_ascii_case("not") {
            return Token::structural(TokenKind::Not, span);
        }

        self.skip_whitespace();
        if self.current_char() == Some('(') {
            Token::value(TokenKind::Function, ident, false, span)
        } else {
            Token::value(TokenKind::String, ident, false, span)
        }
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let start = self.position;
        self.advance();
        Token::structural(kind, Span::new(start, self.position))
    }

    fn pair(&mut self, kind: TokenKind) -> Token {
        let start = self.position;
        self.advance();
        self.advance();
        Token::structural(kind, Span::new(start, self.position))
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let token = match self.current_char() {
            None => Token::structural(
                TokenKind::EndOfInput,
                Span::new(self.position, self.position),
            ),
            Some('(') => self.single(TokenKind::LeftParen),
            Some(')') => self.single(TokenKind::RightParen),
            Some(',') => self.single(TokenKind::Comma),
            Some('=') => {
                if self.peek_char(1) == Some('=') {
                    self.pair(TokenKind::EqualTo)
                } else {
                    return Err(LexError::new(LexErrorKind::IllFormedEquals, self.position));
                }
            }
            Some('!') => {
                if self.peek_char(1) == Some('=') {
                    self.pair(TokenKind::NotEqualTo)
                } else {
                    self.single(TokenKind::Not)
                }
            }
            Some('<') => {
                if self.peek_char(1) == Some('=') {
                    self.pair(TokenKind::LessThanOrEqualTo)
                } else {
                    self.single(TokenKind::LessThan)
                }
            }
            Some('>') => {
                if self.peek_char(1) == Some('=') {
                    self.pair(TokenKind::GreaterThanOrEqualTo)
                } else {
                    self.single(TokenKind::GreaterThan)
                }
            }
            Some('$') => self.read_reference('$', TokenKind::Property)?,
            Some('@') => self.read_reference('@', TokenKind::ItemList)?,
            Some('%') => self.read_reference('%', TokenKind::ItemMetadata)?,
            Some('\'') => self.read_string()?,
            Some(ch) if chars::is_number_start(ch) => self.read_number()?,
            Some(ch) if chars::is_simple_string_start(ch) => self.read_identifier(),
            Some(ch) => {
                return Err(LexError::new(
                    LexErrorKind::IllegalCharacter(ch),
                    self.position,
                ));
            }
        };

        log::trace!("lexed {:?} at {}..{}", token.kind, token.span.start, token.span.end);
        Ok(token)
    }
}

/// Single pass over the tokens: yields every token up to and including
/// `EndOfInput`, or up to the first error, then nothing.
impl Iterator for Lexer {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.next_token();
        match &result {
            Ok(token) if token.is(TokenKind::EndOfInput) => self.done = true,
            Err(_) => self.done = true,
            Ok(_) => {}
        }
        Some(result)
    }
}

impl std::iter::FusedIterator for Lexer {}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("and OR Not !");
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::And);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Or);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Not);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Not);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::EndOfInput);
}

#[test]
fn test_condition() {
    let kinds: Vec<TokenKind> = Lexer::new("'$(Config)' == 'Debug' and @(Src->Count()) > 0")
        .map(|t| t.unwrap().kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::String,
            TokenKind::EqualTo,
            TokenKind::String,
            TokenKind::And,
            TokenKind::ItemList,
            TokenKind::GreaterThan,
            TokenKind::Numeric,
            TokenKind::EndOfInput,
        ]
    );
}

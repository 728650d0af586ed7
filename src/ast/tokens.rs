use std::fmt;

/// Half-open range of character offsets into the condition text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Characters of `source` covered by this span.
    pub fn slice(&self, source: &str) -> String {
        source
            .chars()
            .skip(self.start)
            .take(self.end.saturating_sub(self.start))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Structural
    /// Argument separator in function calls
    Comma,
    LeftParen,
    RightParen,

    // Comparison
    /// `<`
    LessThan,
    /// `>`
    GreaterThan,
    /// `<=`
    LessThanOrEqualTo,
    /// `>=`
    GreaterThanOrEqualTo,
    /// `==`
    EqualTo,
    /// `!=`
    NotEqualTo,

    // Logical
    /// Logical AND (word, any case)
    ///
    /// # Examples
    /// ```text
    /// '$(A)' == 'x' and '$(B)' == 'y'
    /// '$(A)' AND '$(B)'
    /// ```
    And,

    /// Logical OR (word, any case)
    Or,

    /// Logical NOT, either `!` or the word `not`
    ///
    /// # Examples
    /// ```text
    /// !Exists('out')
    /// not ('$(Flag)' == 'true')
    /// ```
    Not,

    // Value-carrying
    /// Property reference captured verbatim, `$(...)`
    ///
    /// # Examples
    /// ```text
    /// $(Configuration)
    /// $(Name.Replace('a', 'b'))
    /// ```
    Property,

    /// Quoted string contents, or a bare identifier
    ///
    /// # Examples
    /// ```text
    /// 'Debug|x64'
    /// true
    /// ```
    String,

    /// Decimal, hexadecimal or dotted numeric literal
    ///
    /// # Examples
    /// ```text
    /// 42
    /// -1.5
    /// 0xFF
    /// 4.0.30319
    /// ```
    Numeric,

    /// Item list reference captured verbatim, `@(...)`
    ///
    /// # Examples
    /// ```text
    /// @(Compile)
    /// @(Src->Count())
    /// ```
    ItemList,

    /// Item metadata reference captured verbatim, `%(...)`
    ///
    /// # Examples
    /// ```text
    /// %(Culture)
    /// %(EmbeddedResource.Culture)
    /// ```
    ItemMetadata,

    /// Function name; the `(` that follows is lexed separately
    ///
    /// # Examples
    /// ```text
    /// Exists('bin')
    /// HasTrailingSlash('$(OutDir)')
    /// ```
    Function,

    /// End of input
    EndOfInput,
}

impl TokenKind {
    /// Whether tokens of this kind carry text.
    pub fn carries_value(self) -> bool {
        matches!(
            self,
            TokenKind::Property
                | TokenKind::String
                | TokenKind::Numeric
                | TokenKind::ItemList
                | TokenKind::ItemMetadata
                | TokenKind::Function
        )
    }

    /// Display text for structural kinds, used in error messages.
    pub fn symbol(self) -> &'static str {
        match self {
            TokenKind::Comma => ",",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LessThan => "<",
            TokenKind::GreaterThan => ">",
            TokenKind::LessThanOrEqualTo => "<=",
            TokenKind::GreaterThanOrEqualTo => ">=",
            TokenKind::EqualTo => "==",
            TokenKind::NotEqualTo => "!=",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Not => "!",
            TokenKind::Property => "property",
            TokenKind::String => "string",
            TokenKind::Numeric => "number",
            TokenKind::ItemList => "item list",
            TokenKind::ItemMetadata => "item metadata",
            TokenKind::Function => "function",
            TokenKind::EndOfInput => "end of input",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A lexed token.
///
/// Structural tokens carry no text. Value tokens always carry text, and
/// `expandable` marks text that may still contain references or escapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: Option<String>,
    pub expandable: bool,
    pub span: Span,
}

impl Token {
    /// A token without a payload.
    ///
    /// # Panics
    ///
    /// If `kind` is a value-carrying kind; those are built with [`Token::value`].
    pub fn structural(kind: TokenKind, span: Span) -> Self {
        assert!(
            !kind.carries_value(),
            "{kind:?} tokens must be built with Token::value"
        );
        Token {
            kind,
            text: None,
            expandable: false,
            span,
        }
    }

    /// A token with a payload.
    ///
    /// # Panics
    ///
    /// If `kind` is structural.
    pub fn value(kind: TokenKind, text: impl Into<String>, expandable: bool, span: Span) -> Self {
        assert!(
            kind.carries_value(),
            "{kind:?} tokens do not carry a value"
        );
        Token {
            kind,
            text: Some(text.into()),
            expandable,
            span,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Payload text, or the operator symbol for structural tokens.
    pub fn display_text(&self) -> &str {
        match &self.text {
            Some(text) => text,
            None => self.kind.symbol(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.text, self.kind) {
            (Some(text), TokenKind::String) => write!(f, "'{}'", text),
            (Some(text), _) => f.write_str(text),
            (None, kind) => f.write_str(kind.symbol()),
        }
    }
}

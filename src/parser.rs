use thiserror::Error;

use crate::{
    ast::{BinOp, Expr, ExprKind, NodeId, Span, Token, TokenKind},
    lexer::{LexErrorKind, Lexer, Position},
};

const PRIMARY_EXPECTED: &[&str] = &[
    "'('",
    "string",
    "number",
    "property",
    "item list",
    "item metadata",
    "function",
];
const ARGUMENT_EXPECTED: &[&str] = &["string", "number", "property", "item list", "item metadata"];
const END_EXPECTED: &[&str] = &["'and'", "'or'", "end of input"];

/// Deepest tree the parser builds. Evaluation recurses once per level.
pub const MAX_NESTING: usize = 128;

/// Which reference kinds a condition may contain.
///
/// Build files restrict some contexts, e.g. property group conditions may
/// not reference item lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    pub allow_properties: bool,
    pub allow_item_lists: bool,
    pub allow_item_metadata: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            allow_properties: true,
            allow_item_lists: true,
            allow_item_metadata: true,
        }
    }
}

impl ParserOptions {
    /// Properties only, for property and property group conditions.
    pub fn properties_only() -> Self {
        ParserOptions {
            allow_properties: true,
            allow_item_lists: false,
            allow_item_metadata: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error(transparent)]
    Lex(LexErrorKind),

    #[error("unexpected '{found}', expected {}", .expected.join(" or "))]
    UnexpectedToken {
        found: String,
        expected: Vec<&'static str>,
    },

    #[error("unexpected end of input, expected {}", .expected.join(" or "))]
    UnexpectedEndOfInput { expected: Vec<&'static str> },

    #[error("{kind} reference '{text}' is not allowed in this condition")]
    ReferenceNotAllowed { kind: &'static str, text: String },

    #[error("expression nested more than {limit} levels deep")]
    NestingTooDeep { limit: usize },
}

/// A condition that could not be tokenized or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at position {position} in condition \"{condition}\"")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub condition: String,
    pub position: Position,
}

/// A parsed condition, ready to be evaluated any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    text: String,
    root: Expr,
    node_count: usize,
}

impl Condition {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Self::parse_with_options(text, ParserOptions::default())
    }

    pub fn parse_with_options(text: &str, options: ParserOptions) -> Result<Self, ParseError> {
        Parser::with_options(Lexer::new(text), options)?.parse_condition()
    }

    /// The condition exactly as written.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Number of nodes; every [`NodeId`] in the tree is below this.
    pub fn node_count(&self) -> usize {
        self.node_count
    }
}

pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    source: String,
    options: ParserOptions,
    next_id: usize,
    depth: usize,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Result<Self, ParseError> {
        Self::with_options(lexer, ParserOptions::default())
    }

    pub fn with_options(mut lexer: Lexer, options: ParserOptions) -> Result<Self, ParseError> {
        let source = lexer.source();
        let current_token = lexer.next_token().map_err(|e| ParseError {
            kind: ParseErrorKind::Lex(e.kind),
            condition: source.clone(),
            position: e.position,
        })?;
        Ok(Parser {
            lexer,
            current_token,
            source,
            options,
            next_id: 0,
            depth: 0,
        })
    }

    fn error(&self, kind: ParseErrorKind, position: Position) -> ParseError {
        ParseError {
            kind,
            condition: self.source.clone(),
            position,
        }
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.current_token = self
            .lexer
            .next_token()
            .map_err(|e| self.error(ParseErrorKind::Lex(e.kind), e.position))?;
        Ok(())
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current_token.is(kind)
    }

    fn unexpected(&self, expected: &[&'static str]) -> ParseError {
        let kind = if self.check(TokenKind::EndOfInput) {
            ParseErrorKind::UnexpectedEndOfInput {
                expected: expected.to_vec(),
            }
        } else {
            ParseErrorKind::UnexpectedToken {
                found: self.current_token.display_text().to_string(),
                expected: expected.to_vec(),
            }
        };
        self.error(kind, self.current_token.span.start)
    }

    /// Consumes a token of `kind` and returns its span.
    fn expect(&mut self, kind: TokenKind, expected: &[&'static str]) -> Result<Span, ParseError> {
        if !self.check(kind) {
            return Err(self.unexpected(expected));
        }
        let span = self.current_token.span;
        self.advance()?;
        Ok(span)
    }

    /// One level deeper; undone by the caller once the level is parsed.
    fn descend(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error(
                ParseErrorKind::NestingTooDeep { limit: MAX_NESTING },
                self.current_token.span.start,
            ));
        }
        Ok(())
    }

    fn node(&mut self, span: Span, kind: ExprKind) -> Expr {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        Expr::new(id, span, kind)
    }

    fn check_allowed(&self, token: &Token) -> Result<(), ParseError> {
        let text = token.display_text();
        let violation = match token.kind {
            TokenKind::Property if !self.options.allow_properties => Some("property"),
            TokenKind::ItemList if !self.options.allow_item_lists => Some("item list"),
            TokenKind::ItemMetadata if !self.options.allow_item_metadata => Some("item metadata"),
            TokenKind::String if token.expandable => {
                if !self.options.allow_properties && text.contains("$(") {
                    Some("property")
                } else if !self.options.allow_item_lists && text.contains("@(") {
                    Some("item list")
                } else if !self.options.allow_item_metadata && text.contains("%(") {
                    Some("item metadata")
                } else {
                    None
                }
            }
            _ => None,
        };

        match violation {
            Some(kind) => Err(self.error(
                ParseErrorKind::ReferenceNotAllowed {
                    kind,
                    text: text.to_string(),
                },
                token.span.start,
            )),
            None => Ok(()),
        }
    }

    /// Parses a literal or reference at the current token, if it is one.
    fn parse_leaf(&mut self) -> Result<Option<Expr>, ParseError> {
        let token = self.current_token.clone();
        let text = token.display_text().to_string();

        let kind = match token.kind {
            TokenKind::String => ExprKind::String {
                value: text,
                expandable: token.expandable,
            },
            TokenKind::Numeric => ExprKind::Numeric(text),
            TokenKind::Property => ExprKind::Property(text),
            TokenKind::ItemList => ExprKind::ItemList(text),
            TokenKind::ItemMetadata => ExprKind::ItemMetadata(text),
            _ => return Ok(None),
        };

        self.check_allowed(&token)?;
        self.advance()?;
        Ok(Some(self.node(token.span, kind)))
    }

    /// Parse primary expressions: literals, references, function calls and
    /// parenthesized groups.
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        if let Some(leaf) = self.parse_leaf()? {
            return Ok(leaf);
        }

        match self.current_token.kind {
            TokenKind::LeftParen => {
                let start = self.current_token.span.start;
                self.descend()?;
                self.advance()?;
                let mut expr = self.parse_expression()?;
                let close = self.expect(TokenKind::RightParen, &["')'", "'and'", "'or'"])?;
                self.depth -= 1;
                expr.grouped = true;
                expr.span = Span::new(start, close.end);
                Ok(expr)
            }
            TokenKind::Function => self.parse_function_call(),
            _ => Err(self.unexpected(PRIMARY_EXPECTED)),
        }
    }

    fn parse_function_call(&mut self) -> Result<Expr, ParseError> {
        let name_token = self.current_token.clone();
        self.advance()?;
        self.expect(TokenKind::LeftParen, &["'('"])?;

        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                match self.parse_leaf()? {
                    Some(arg) => args.push(arg),
                    None => return Err(self.unexpected(ARGUMENT_EXPECTED)),
                }
                if self.check(TokenKind::Comma) {
                    self.advance()?;
                } else {
                    break;
                }
            }
        }
        let close = self.expect(TokenKind::RightParen, &["','", "')'"])?;

        let span = name_token.span.to(close);
        Ok(self.node(
            span,
            ExprKind::FunctionCall {
                name: name_token.display_text().to_string(),
                args,
            },
        ))
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_primary()?;

        let op = match self.current_token.kind {
            TokenKind::EqualTo => BinOp::Equal,
            TokenKind::NotEqualTo => BinOp::NotEqual,
            TokenKind::LessThan => BinOp::LessThan,
            TokenKind::GreaterThan => BinOp::GreaterThan,
            TokenKind::LessThanOrEqualTo => BinOp::LessThanOrEqualTo,
            TokenKind::GreaterThanOrEqualTo => BinOp::GreaterThanOrEqualTo,
            _ => return Ok(left),
        };

        self.advance()?;
        let right = self.parse_primary()?;
        let span = left.span.to(right.span);
        Ok(self.node(
            span,
            ExprKind::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        ))
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.check(TokenKind::Not) {
            let start = self.current_token.span;
            self.descend()?;
            self.advance()?;
            let operand = self.parse_not()?; // Right-associative
            self.depth -= 1;
            let span = start.to(operand.span);
            return Ok(self.node(span, ExprKind::Not(Box::new(operand))));
        }
        self.parse_comparison()
    }

    fn parse_logical(
        &mut self,
        token: TokenKind,
        op: BinOp,
        operand: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let mut left = operand(self)?;

        // Each operator wraps everything to its left one level deeper.
        let outer = self.depth;
        while self.check(token) {
            self.descend()?;
            self.advance()?;
            let right = operand(self)?;
            let span = left.span.to(right.span);
            left = self.node(
                span,
                ExprKind::BinaryOp {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            );
        }
        self.depth = outer;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        self.parse_logical(TokenKind::And, BinOp::And, Self::parse_not)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        self.parse_logical(TokenKind::Or, BinOp::Or, Self::parse_and)
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    /// Parses a whole condition; anything after it is an error.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expression()?;
        if !self.check(TokenKind::EndOfInput) {
            return Err(self.unexpected(END_EXPECTED));
        }
        Ok(expr)
    }

    pub fn parse_condition(mut self) -> Result<Condition, ParseError> {
        let root = self.parse()?;
        log::debug!("parsed condition \"{}\": {}", self.source, root.debug_display());
        Ok(Condition {
            text: self.source,
            root,
            node_count: self.next_id,
        })
    }
}

//! # Condition Expressions - Abstract Syntax Tree
//!
//! This module defines the tokens and tree nodes for the condition language
//! attached to targets, items, property groups and tasks in build files.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer, with source spans
//! - **[operators]** - Logical and comparison operators
//! - **[expressions]** - Tree nodes: leaves (strings, numbers, references,
//!   function calls) and operators (`!`, `and`, `or`, comparisons)
//!
//! ## Quick Start
//!
//! ```text
//! '$(Configuration)' == 'Debug' and @(Compile->Count()) > 0
//! ```
//!
//! ## Grammar
//!
//! ```text
//! Expr       := OrExpr
//! OrExpr     := AndExpr ( 'or' AndExpr )*
//! AndExpr    := NotExpr ( 'and' NotExpr )*
//! NotExpr    := ('!' | 'not') NotExpr | Comparison
//! Comparison := Primary ( ('=='|'!='|'<'|'>'|'<='|'>=') Primary )?
//! Primary    := '(' Expr ')' | Function | Property | ItemList | ItemMetadata
//!             | QuotedString | BareIdentifier | Number
//! ```
//!
//! Keywords are case-insensitive. A comparison takes exactly two operands,
//! so `a == b == c` is rejected rather than chained.
//!
//! ## Value Domains
//!
//! Every leaf is text. During evaluation the text is coerced to whichever
//! domain the operator needs:
//!
//! - **boolean**: `true`/`on`/`yes`, `false`/`off`/`no` (any case), empty is false
//! - **numeric**: decimal (`1`, `-2.5`, `.5`) or hexadecimal (`0x1F`)
//! - **version**: `major.minor[.build[.revision]]`
//! - **string**: case-insensitive equality only
pub mod expressions;
pub mod operators;
pub mod tokens;

pub use expressions::{Expr, ExprKind, NodeId};
pub use operators::BinOp;
pub use tokens::{Span, Token, TokenKind};

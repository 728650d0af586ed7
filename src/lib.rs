//! Parsing and evaluation of build-file condition expressions such as
//! `'$(Configuration)' == 'Debug' and @(Compile->Count()) > 0`.
//!
//! A condition is parsed once into a [`Condition`] and evaluated any number
//! of times against an [`EvaluationState`], which expands the property, item
//! and metadata references the condition contains.
//!
//! ```
//! use buildcond::{Condition, state::ElementLocation, store::ProjectState};
//!
//! let condition = Condition::parse("'$(Configuration)' == 'debug'").unwrap();
//! let project = ProjectState::new().with_property("Configuration", "Debug");
//! let state = project.condition_state(condition.text(), ElementLocation::default());
//!
//! assert!(condition.evaluate(&state).unwrap());
//! ```

pub mod ast;
pub mod cache;
pub mod chars;
pub mod cli;
pub mod compat;
pub mod evaluator;
pub mod expander;
pub mod lexer;
pub mod parser;
pub mod state;
pub mod store;
pub mod value;

pub use ast::{BinOp, Expr, ExprKind, NodeId, Span, Token, TokenKind};
pub use cache::ConditionCache;
pub use evaluator::{
    ConditionedProperties, Domain, EvalContext, EvalError, Evaluator, Side, evaluate_condition,
};
pub use lexer::{LexError, LexErrorKind, Lexer, Position};
pub use parser::{Condition, ParseError, ParseErrorKind, Parser, ParserOptions};
pub use state::{
    ElementLocation, EvaluationState, ExpansionError, ExpansionOptions, ItemListReference,
    ItemTransform, MetadataReference,
};
pub use value::Version;

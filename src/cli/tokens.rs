//! Dump the tokens of a condition

use serde_json::{Value, json};

use super::CliError;
use crate::Lexer;

/// Tokenize `condition` into a JSON array, one object per token up to and
/// including the end-of-input marker.
pub fn execute_tokens(condition: &str) -> Result<Value, CliError> {
    let tokens = Lexer::new(condition)
        .map(|token| -> Result<Value, CliError> {
            let token = token?;
            Ok(json!({
                "kind": format!("{:?}", token.kind),
                "text": token.text,
                "expandable": token.expandable,
                "start": token.span.start,
                "end": token.span.end,
            }))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Value::Array(tokens))
}

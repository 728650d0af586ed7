//! Evaluate a condition against a project state

use serde_json::json;

use super::{CliError, conditioned_to_json, json_to_state, parse_assignment};
use crate::{
    Condition, Evaluator, ParserOptions,
    state::{ElementLocation, ExpansionOptions},
    store::{Item, ProjectState},
};

/// Options for the check command
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// The condition to evaluate
    pub condition: String,
    /// State document (JSON text)
    pub state: Option<String>,
    /// `NAME=VALUE` property assignments, applied over the state document
    pub properties: Vec<String>,
    /// `TYPE=INCLUDE` items, appended to the state document
    pub items: Vec<String>,
    /// Undefined properties and metadata are errors
    pub strict: bool,
    pub allow_item_lists: bool,
    pub allow_item_metadata: bool,
    /// Reported in error messages
    pub location: ElementLocation,
    /// Only validate syntax, don't evaluate
    pub syntax_only: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        CheckOptions {
            condition: String::new(),
            state: None,
            properties: Vec::new(),
            items: Vec::new(),
            strict: false,
            allow_item_lists: true,
            allow_item_metadata: true,
            location: ElementLocation::default(),
            syntax_only: false,
        }
    }
}

impl CheckOptions {
    fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            allow_properties: true,
            allow_item_lists: self.allow_item_lists,
            allow_item_metadata: self.allow_item_metadata,
        }
    }

    fn project(&self) -> Result<ProjectState, CliError> {
        let mut project = match &self.state {
            Some(text) => json_to_state(serde_json::from_str(text)?)?,
            None => ProjectState::new(),
        };

        for assignment in &self.properties {
            let (name, value) = parse_assignment(assignment)?;
            project.set_property(&name, value);
        }
        for assignment in &self.items {
            let (item_type, include) = parse_assignment(assignment)?;
            project.add_item(&item_type, Item::new(include));
        }
        if self.strict {
            project.set_options(ExpansionOptions::strict());
        }
        Ok(project)
    }
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// Syntax validation passed
    SyntaxValid,
    /// Condition evaluated, with a JSON report
    Success(serde_json::Value),
}

/// Execute a check operation
///
/// The report holds the boolean `result`, the `conditioned_properties` the
/// condition compared against, and `and_or_conflict` when it mixes `and` and
/// `or` without parentheses.
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let text = options.condition.as_str();

    // A blank condition is always true and has nothing to parse.
    let condition = if text.trim().is_empty() {
        None
    } else {
        Some(Condition::parse_with_options(text, options.parser_options())?)
    };

    if options.syntax_only {
        return Ok(CheckResult::SyntaxValid);
    }

    let project = options.project()?;
    let state = project.condition_state(text, options.location.clone());

    let mut evaluator = Evaluator::recording_conditioned_properties();
    let result = match &condition {
        Some(condition) => evaluator.evaluate(condition, &state)?,
        None => true,
    };
    let conflict = condition
        .as_ref()
        .is_some_and(Condition::has_and_or_conflict);

    let conditioned = evaluator.take_conditioned_properties();
    Ok(CheckResult::Success(json!({
        "condition": text,
        "result": result,
        "conditioned_properties": conditioned_to_json(&conditioned),
        "and_or_conflict": conflict,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EvalError;

    fn check(condition: &str, configure: impl FnOnce(&mut CheckOptions)) -> Result<serde_json::Value, CliError> {
        let mut options = CheckOptions {
            condition: condition.to_string(),
            ..CheckOptions::default()
        };
        configure(&mut options);
        match execute_check(&options)? {
            CheckResult::Success(report) => Ok(report),
            CheckResult::SyntaxValid => Ok(serde_json::Value::Null),
        }
    }

    #[test]
    fn test_check_report() {
        let report = check("'$(Configuration)|$(Platform)' == 'Debug|x64'", |o| {
            o.properties = vec!["Configuration=Debug".into(), "Platform=x64".into()];
        })
        .unwrap();

        assert_eq!(report["result"], true);
        assert_eq!(report["and_or_conflict"], false);
        assert_eq!(report["conditioned_properties"]["Platform"], json!(["x64"]));
    }

    #[test]
    fn test_check_state_document() {
        let report = check("@(Compile->Count()) == 2 and '$(A)' == 'b'", |o| {
            o.state = Some(r#"{"properties": {"A": "b"}, "items": {"Compile": ["x", "y"]}}"#.into());
        })
        .unwrap();
        assert_eq!(report["result"], true);
    }

    #[test]
    fn test_check_items_flag_and_conflict() {
        let report = check("@(Src) == 'a;b' or false and true", |o| {
            o.items = vec!["Src=a".into(), "Src=b".into()];
        })
        .unwrap();
        assert_eq!(report["result"], true);
        assert_eq!(report["and_or_conflict"], true);
    }

    #[test]
    fn test_check_blank_condition() {
        assert_eq!(check("  ", |_| {}).unwrap()["result"], true);
    }

    #[test]
    fn test_syntax_only() {
        let options = CheckOptions {
            condition: "'a' == 'b'".into(),
            state: Some("not json".into()),
            syntax_only: true,
            ..CheckOptions::default()
        };
        assert!(matches!(execute_check(&options), Ok(CheckResult::SyntaxValid)));

        let options = CheckOptions {
            condition: "'a' == ".into(),
            syntax_only: true,
            ..CheckOptions::default()
        };
        assert!(matches!(execute_check(&options), Err(CliError::Parse(_))));
    }

    #[test]
    fn test_check_disallowed_item_lists() {
        let result = check("@(Src) == ''", |o| o.allow_item_lists = false);
        assert!(matches!(result, Err(CliError::Parse(_))));
    }

    #[test]
    fn test_check_strict() {
        let result = check("'$(Missing)' == ''", |o| o.strict = true);
        assert!(matches!(
            result,
            Err(CliError::Eval(EvalError::Expansion { .. }))
        ));
    }
}

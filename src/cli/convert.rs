//! JSON <-> project state conversion utilities

use serde_json::{Map, Value};

use super::CliError;
use crate::{
    evaluator::ConditionedProperties,
    store::{Item, ProjectState},
};

/// Text of a scalar JSON value; `null` is empty.
fn scalar_text(value: Value, context: &str) -> Result<String, CliError> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s),
        Value::Array(_) | Value::Object(_) => Err(CliError::InvalidState(format!(
            "{} must be a string, number or boolean",
            context
        ))),
    }
}

fn object(value: Value, context: &str) -> Result<Map<String, Value>, CliError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(CliError::InvalidState(format!("{} must be an object", context))),
    }
}

fn json_to_item(item_type: &str, value: Value) -> Result<Item, CliError> {
    match value {
        Value::Object(mut map) => {
            let include = map
                .remove("include")
                .ok_or_else(|| {
                    CliError::InvalidState(format!("an item of '{}' has no \"include\"", item_type))
                })
                .and_then(|v| scalar_text(v, "\"include\""))?;

            let mut item = Item::new(include);
            if let Some(metadata) = map.remove("metadata") {
                for (name, value) in object(metadata, "\"metadata\"")? {
                    let text = scalar_text(value, &format!("metadata '{}'", name))?;
                    item.set_metadata(name, text);
                }
            }
            Ok(item)
        }
        other => Ok(Item::new(scalar_text(
            other,
            &format!("an item of '{}'", item_type),
        )?)),
    }
}

/// Builds a project state from a document of the form
///
/// ```json
/// {
///   "properties": { "Configuration": "Debug" },
///   "items": { "Compile": ["a.cs", { "include": "b.cs", "metadata": { "Link": "x" } }] },
///   "base_dir": "."
/// }
/// ```
///
/// Every key is optional.
pub fn json_to_state(v: Value) -> Result<ProjectState, CliError> {
    let mut root = object(v, "the state document")?;
    let mut project = ProjectState::new();

    if let Some(properties) = root.remove("properties") {
        for (name, value) in object(properties, "\"properties\"")? {
            let text = scalar_text(value, &format!("property '{}'", name))?;
            project.set_property(&name, text);
        }
    }

    if let Some(items) = root.remove("items") {
        for (item_type, list) in object(items, "\"items\"")? {
            let list = match list {
                Value::Array(list) => list,
                single => vec![single],
            };
            for value in list {
                project.add_item(&item_type, json_to_item(&item_type, value)?);
            }
        }
    }

    if let Some(base_dir) = root.remove("base_dir") {
        project = project.with_base_dir(scalar_text(base_dir, "\"base_dir\"")?);
    }

    Ok(project)
}

/// Splits `NAME=VALUE`. The value may be empty or contain further `=`.
pub fn parse_assignment(text: &str) -> Result<(String, String), CliError> {
    match text.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(CliError::InvalidAssignment(text.to_string())),
    }
}

/// Convert conditioned properties to a JSON object of name -> values
pub fn conditioned_to_json(properties: &ConditionedProperties) -> Value {
    Value::Object(
        properties
            .iter()
            .map(|(name, values)| {
                let values = values.iter().cloned().map(Value::String).collect();
                (name.to_string(), Value::Array(values))
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_json_to_state() {
        let project = json_to_state(json!({
            "properties": { "Configuration": "Debug", "Count": 3, "Flag": true },
            "items": {
                "Compile": ["a.cs", { "include": "b.cs", "metadata": { "Link": "x" } }],
                "Single": "one.txt"
            },
            "base_dir": "/tmp"
        }))
        .unwrap();

        assert_eq!(project.property("configuration"), Some("Debug"));
        assert_eq!(project.property("Count"), Some("3"));
        assert_eq!(project.property("Flag"), Some("true"));
        assert_eq!(project.items("Compile").len(), 2);
        assert_eq!(project.items("Compile")[1].metadata("Link").as_deref(), Some("x"));
        assert_eq!(project.items("Single")[0].include(), "one.txt");
        assert_eq!(project.base_dir(), Some(std::path::Path::new("/tmp")));
    }

    #[test]
    fn test_json_to_state_rejects_bad_shapes() {
        assert!(matches!(json_to_state(json!([])), Err(CliError::InvalidState(_))));
        assert!(matches!(
            json_to_state(json!({ "properties": { "A": [1] } })),
            Err(CliError::InvalidState(_))
        ));
        assert!(matches!(
            json_to_state(json!({ "items": { "Compile": [{ "metadata": {} }] } })),
            Err(CliError::InvalidState(_))
        ));
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("Configuration=Debug").unwrap(),
            ("Configuration".to_string(), "Debug".to_string())
        );
        assert_eq!(parse_assignment("A=b=c").unwrap().1, "b=c");
        assert_eq!(parse_assignment("Empty=").unwrap().1, "");
        assert!(parse_assignment("NoValue").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn test_conditioned_to_json() {
        let mut props = ConditionedProperties::new();
        props.record("Configuration", "Debug");
        props.record("Configuration", "Release");
        assert_eq!(
            conditioned_to_json(&props),
            json!({ "Configuration": ["Debug", "Release"] })
        );
    }
}

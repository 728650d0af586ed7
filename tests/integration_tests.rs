// tests/integration_tests.rs

mod common;

use std::{sync::Arc, thread};

use buildcond::cli::{CheckOptions, CheckResult, CliError, execute_check};
use buildcond::evaluator::EvalError;
use buildcond::state::ElementLocation;
use buildcond::store::{Item, ProjectState};
use buildcond::{Condition, ConditionCache, Evaluator, ParserOptions};
use common::RecordingState;
use serde_json::{Value, json};

fn project() -> ProjectState {
    ProjectState::new()
        .with_property("Configuration", "Debug")
        .with_property("Platform", "x64")
        .with_property("OutDir", "bin\\Debug\\")
        .with_property("TargetFramework", "4.7.2")
        .with_item("Compile", Item::new("src/main.cs"))
        .with_item("Compile", Item::new("src/util.cs"))
        .with_item("Compile", Item::new("src/MAIN.cs"))
        .with_base_dir(env!("CARGO_MANIFEST_DIR"))
}

fn eval_in(project: &ProjectState, text: &str) -> Result<bool, EvalError> {
    let condition = Condition::parse(text)?;
    let state = project.condition_state(text, ElementLocation::new("app.proj", 12, 5));
    condition.evaluate(&state)
}

fn check(condition: &str, state: Option<Value>) -> Result<Value, CliError> {
    let options = CheckOptions {
        condition: condition.to_string(),
        state: state.map(|s| s.to_string()),
        ..CheckOptions::default()
    };
    match execute_check(&options)? {
        CheckResult::Success(report) => Ok(report),
        CheckResult::SyntaxValid => panic!("expected an evaluation report"),
    }
}

// ============================================================================
// End-to-end Scenarios
// ============================================================================

#[test]
fn test_scenario_property_equality() {
    let text = "'$(Config)' == 'Debug'";
    let state = RecordingState::new(text).property("Config", "Debug");
    assert_eq!(Condition::parse(text).unwrap().evaluate(&state), Ok(true));
}

#[test]
fn test_scenario_or_evaluates_right_when_left_false() {
    let text = "'$(Config)' == 'Debug' or '$(Config)' == 'Release'";
    let state = RecordingState::new(text).property("Config", "Release");
    assert_eq!(Condition::parse(text).unwrap().evaluate(&state), Ok(true));
    // Each side expands its own leaf exactly once.
    assert_eq!(state.call_count("$(Config)"), 2);
}

#[test]
fn test_scenario_negated_numeric_comparison() {
    let text = "!(1 > 2)";
    assert_eq!(
        Condition::parse(text).unwrap().evaluate(&RecordingState::new(text)),
        Ok(true)
    );
}

#[test]
fn test_scenario_version_comparison() {
    let text = "'$(Ver)' >= '2.0'";
    let state = RecordingState::new(text).property("Ver", "1.5");
    assert_eq!(Condition::parse(text).unwrap().evaluate(&state), Ok(false));

    let text = "'$(Ver)' >= '2.0'";
    let state = RecordingState::new(text).property("Ver", "10.0.1");
    assert_eq!(Condition::parse(text).unwrap().evaluate(&state), Ok(true));
}

#[test]
fn test_scenario_empty_and_skips_right() {
    let text = "'' and true";
    let state = RecordingState::new(text);
    assert_eq!(Condition::parse(text).unwrap().evaluate(&state), Ok(false));
    assert!(state.calls().is_empty());
}

#[test]
fn test_scenario_root_not_boolean() {
    let text = "'abc'";
    let err = Condition::parse(text)
        .unwrap()
        .evaluate(&RecordingState::new(text))
        .unwrap_err();
    assert!(err.is_type_coercion());
}

// ============================================================================
// Project State
// ============================================================================

#[test]
fn test_project_properties() {
    let project = project();
    assert_eq!(eval_in(&project, "'$(Configuration)|$(Platform)' == 'debug|X64'"), Ok(true));
    assert_eq!(eval_in(&project, "$(configuration) == Debug"), Ok(true));
    assert_eq!(eval_in(&project, "'$(TargetFramework)' < '4.8'"), Ok(true));
    assert_eq!(eval_in(&project, "HasTrailingSlash('$(OutDir)')"), Ok(true));
    assert_eq!(eval_in(&project, "'$(Undefined)' == ''"), Ok(true));
}

#[test]
fn test_project_item_lists() {
    let project = project();
    assert_eq!(
        eval_in(&project, "@(Compile) == 'src/main.cs;src/util.cs;src/MAIN.cs'"),
        Ok(true)
    );
    assert_eq!(eval_in(&project, "@(Compile->Count()) == 3"), Ok(true));
    assert_eq!(eval_in(&project, "@(Compile->Distinct()->Count()) == 2"), Ok(true));
    assert_eq!(
        eval_in(&project, "'@(Compile->'%(Filename)', '|')' == 'main|util|MAIN'"),
        Ok(true)
    );
    assert_eq!(eval_in(&project, "'@(None)' == ''"), Ok(true));
}

#[test]
fn test_project_current_item_metadata() {
    let mut project = project();
    project.set_current_item(
        "Compile",
        Item::new("src/main.cs").with_metadata("Link", "Program.cs"),
    );
    assert_eq!(eval_in(&project, "'%(Link)' == 'program.cs'"), Ok(true));
    assert_eq!(eval_in(&project, "%(Compile.Extension) == '.cs'"), Ok(true));
    assert_eq!(eval_in(&project, "'%(None.Link)' == ''"), Ok(true));

    project.clear_current_item();
    assert_eq!(eval_in(&project, "'%(Link)' == ''"), Ok(true));
}

#[test]
fn test_project_exists_relative_to_base_dir() {
    let project = project();
    assert_eq!(eval_in(&project, "Exists('Cargo.toml')"), Ok(true));
    assert_eq!(eval_in(&project, "Exists('src/lib.rs')"), Ok(true));
    assert_eq!(eval_in(&project, "Exists('no/such/file.txt')"), Ok(false));
}

#[test]
fn test_project_strict_expansion() {
    let project = project().with_options(buildcond::state::ExpansionOptions::strict());
    let err = eval_in(&project, "'$(Missing)' == ''").unwrap_err();
    assert!(!err.is_type_coercion());
    assert_eq!(err.location().map(|l| l.to_string()).as_deref(), Some("app.proj(12,5)"));
    assert!(err.to_string().contains("Missing"), "{err}");

    // Property functions are not expanded by this store.
    let project = self::project();
    assert!(matches!(
        eval_in(&project, "'$(Configuration.ToUpper())' == 'DEBUG'"),
        Err(EvalError::Expansion { .. })
    ));
}

#[test]
fn test_failed_evaluation_leaves_tree_usable() {
    let condition = Condition::parse("'$(Mode)' > 1").unwrap();
    let bad = ProjectState::new().with_property("Mode", "fast");
    let good = ProjectState::new().with_property("Mode", "2");

    let state = bad.condition_state(condition.text(), ElementLocation::default());
    assert!(condition.evaluate(&state).is_err());

    let state = good.condition_state(condition.text(), ElementLocation::default());
    assert_eq!(condition.evaluate(&state), Ok(true));
}

// ============================================================================
// Shared Trees
// ============================================================================

#[test]
fn test_condition_cache_across_threads() {
    let cache = ConditionCache::new(ParserOptions::default());
    let text = "'$(Configuration)' == 'Debug' and @(Compile->Count()) > 1";
    let projects = [
        project(),
        project().with_property("Configuration", "Release"),
    ];

    thread::scope(|scope| {
        for (i, project) in projects.iter().enumerate() {
            let cache = &cache;
            scope.spawn(move || {
                for _ in 0..50 {
                    let condition = cache.get_or_parse(text).unwrap();
                    let state = project.condition_state(text, ElementLocation::default());
                    assert_eq!(condition.evaluate(&state), Ok(i == 0));
                }
            });
        }
    });

    assert_eq!(cache.len(), 1);
    let first = cache.get_or_parse(text).unwrap();
    let second = cache.get_or_parse(text).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_condition_cache_does_not_keep_failures() {
    let cache = ConditionCache::default();
    assert!(cache.get_or_parse("'a' = 'b'").is_err());
    assert!(cache.is_empty());
    cache.get_or_parse("'a' == 'b'").unwrap();
    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn test_evaluator_collects_across_conditions() {
    let project = project();
    let mut evaluator = Evaluator::recording_conditioned_properties();

    for text in [
        "'$(Configuration)|$(Platform)' == 'Debug|AnyCPU'",
        "'$(Configuration)|$(Platform)' == 'Release|x64'",
        "'$(Configuration)' == 'Debug' and Exists('Cargo.toml')",
    ] {
        let condition = Condition::parse(text).unwrap();
        let state = project.condition_state(text, ElementLocation::default());
        evaluator.evaluate(&condition, &state).unwrap();
    }

    let props = evaluator.take_conditioned_properties();
    assert_eq!(props.get("Configuration").unwrap(), ["Debug", "Release"]);
    assert_eq!(props.get("Platform").unwrap(), ["AnyCPU", "x64"]);
}

// ============================================================================
// Command Line Surface
// ============================================================================

#[test]
fn test_check_report() {
    let state = json!({
        "properties": { "Configuration": "Release" },
        "items": { "Compile": ["a.cs", { "include": "b.cs", "metadata": { "Link": "x" } }] },
    });
    let report = check(
        "'$(Configuration)' == 'Release' or @(Compile->Count()) == 0 and false",
        Some(state),
    )
    .unwrap();

    assert_eq!(report["result"], json!(true));
    assert_eq!(report["and_or_conflict"], json!(true));
    assert_eq!(
        report["conditioned_properties"],
        json!({ "Configuration": ["Release"] })
    );
}

#[test]
fn test_check_errors() {
    assert!(matches!(check("'a' ==", None), Err(CliError::Parse(_))));
    assert!(matches!(check("'maybe'", None), Err(CliError::Eval(_))));
    assert!(matches!(
        check("true", Some(json!(["not", "an", "object"]))),
        Err(CliError::InvalidState(_))
    ));
}

#[test]
fn test_check_blank_condition() {
    let report = check("  ", None).unwrap();
    assert_eq!(report["result"], json!(true));
    assert_eq!(report["and_or_conflict"], json!(false));
}

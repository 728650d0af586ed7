//! A plain in-memory property and item store that can back condition
//! evaluation.
//!
//! Names of properties, item types and metadata are case-insensitive. Items
//! carry their own metadata plus the well-known `Identity`, `Filename` and
//! `Extension` derived from the include.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::{
    chars, expander,
    state::{
        ElementLocation, EvaluationState, ExpansionError, ExpansionOptions, ItemListReference,
        ItemTransform, MetadataReference,
    },
};

/// One item of an item list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    include: String,
    metadata: Vec<(String, String)>,
}

impl Item {
    pub fn new(include: impl Into<String>) -> Self {
        Item {
            include: include.into(),
            metadata: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_metadata(name, value);
        self
    }

    pub fn set_metadata(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .metadata
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.metadata.push((name, value)),
        }
    }

    pub fn include(&self) -> &str {
        &self.include
    }

    /// Looks up metadata by name. Well-known metadata wins over custom
    /// metadata of the same name.
    pub fn metadata(&self, name: &str) -> Option<String> {
        if name.eq_ignore_ascii_case("Identity") {
            return Some(self.include.clone());
        }
        if name.eq_ignore_ascii_case("Filename") {
            return Some(file_parts(&self.include).0.to_string());
        }
        if name.eq_ignore_ascii_case("Extension") {
            return Some(file_parts(&self.include).1.to_string());
        }
        self.metadata
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }
}

/// Splits the last path segment of `include` into stem and extension (with
/// its dot). `src/a.tar.gz` gives `("a.tar", ".gz")`.
fn file_parts(include: &str) -> (&str, &str) {
    let file = include.rsplit(['/', '\\']).next().unwrap_or(include);
    match file.rfind('.') {
        Some(0) | None => (file, ""),
        Some(dot) => file.split_at(dot),
    }
}

/// Properties and items a set of conditions is evaluated against.
///
/// # Examples
///
/// ```
/// use buildcond::store::{Item, ProjectState};
///
/// let project = ProjectState::new()
///     .with_property("Configuration", "Debug")
///     .with_item("Compile", Item::new("src/main.cs"));
///
/// assert_eq!(project.property("configuration"), Some("Debug"));
/// assert_eq!(project.items("COMPILE").len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProjectState {
    properties: HashMap<String, String>,
    items: HashMap<String, Vec<Item>>,
    current_item: Option<(String, Item)>,
    base_dir: Option<PathBuf>,
    options: ExpansionOptions,
}

impl ProjectState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_property(name, value);
        self
    }

    pub fn with_item(mut self, item_type: &str, item: Item) -> Self {
        self.add_item(item_type, item);
        self
    }

    pub fn with_options(mut self, options: ExpansionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn set_property(&mut self, name: &str, value: impl Into<String>) {
        self.properties.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn add_item(&mut self, item_type: &str, item: Item) {
        self.items
            .entry(item_type.to_ascii_lowercase())
            .or_default()
            .push(item);
    }

    /// Items of a type, in insertion order; empty when the type is unknown.
    pub fn items(&self, item_type: &str) -> &[Item] {
        self.items
            .get(&item_type.to_ascii_lowercase())
            .map_or(&[], Vec::as_slice)
    }

    /// The item whose metadata bare `%(Name)` references resolve against.
    pub fn set_current_item(&mut self, item_type: &str, item: Item) {
        self.current_item = Some((item_type.to_string(), item));
    }

    pub fn clear_current_item(&mut self) {
        self.current_item = None;
    }

    pub fn options(&self) -> &ExpansionOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: ExpansionOptions) {
        self.options = options;
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Binds this store to one condition for evaluation.
    pub fn condition_state<'a>(
        &'a self,
        condition: &'a str,
        location: ElementLocation,
    ) -> ConditionState<'a> {
        ConditionState {
            project: self,
            condition,
            location,
        }
    }
}

/// A [`ProjectState`] bound to the condition being evaluated.
#[derive(Debug, Clone)]
pub struct ConditionState<'a> {
    project: &'a ProjectState,
    condition: &'a str,
    location: ElementLocation,
}

impl ConditionState<'_> {
    fn lookup_property(&self, expression: &str) -> Result<String, ExpansionError> {
        if expression.is_empty() || !expression.chars().all(chars::is_simple_string_char) {
            return Err(ExpansionError::Unsupported(format!("$({})", expression)));
        }
        match self.project.property(expression) {
            Some(value) => Ok(value.to_string()),
            None if self.project.options.strict_properties => {
                Err(ExpansionError::UndefinedProperty(expression.to_string()))
            }
            None => Ok(String::new()),
        }
    }

    fn lookup_metadata(
        &self,
        scope: Option<(&str, &Item)>,
        reference: &MetadataReference,
    ) -> Result<String, ExpansionError> {
        let value = scope
            .filter(|(item_type, _)| {
                reference
                    .item_type
                    .as_deref()
                    .is_none_or(|wanted| wanted.eq_ignore_ascii_case(item_type))
            })
            .and_then(|(_, item)| item.metadata(&reference.name));

        match value {
            Some(value) => Ok(value),
            None if self.project.options.strict_metadata => {
                Err(ExpansionError::UndefinedMetadata(reference.to_string()))
            }
            None => Ok(String::new()),
        }
    }

    fn current_item(&self) -> Option<(&str, &Item)> {
        self.project
            .current_item
            .as_ref()
            .map(|(item_type, item)| (item_type.as_str(), item))
    }

    fn transform<'i>(
        &self,
        item_type: &str,
        values: Vec<(String, Option<&'i Item>)>,
        transform: &ItemTransform,
    ) -> Result<Vec<(String, Option<&'i Item>)>, ExpansionError> {
        match transform {
            ItemTransform::Expression(expression) => values
                .into_iter()
                .map(|(_, item)| {
                    let scope = ItemScope {
                        outer: self,
                        item_type,
                        item,
                    };
                    Ok((expander::expand(&scope, expression)?, item))
                })
                .collect(),
            ItemTransform::Function { name, args } => {
                if !args.is_empty() {
                    return Err(ExpansionError::Unsupported(format!("->{}({})", name, args)));
                }
                if name.eq_ignore_ascii_case("Count") {
                    Ok(vec![(values.len().to_string(), None)])
                } else if name.eq_ignore_ascii_case("Distinct") {
                    let mut seen: Vec<String> = Vec::new();
                    Ok(values
                        .into_iter()
                        .filter(|(text, _)| {
                            let key = text.to_lowercase();
                            if seen.contains(&key) {
                                false
                            } else {
                                seen.push(key);
                                true
                            }
                        })
                        .collect())
                } else if name.eq_ignore_ascii_case("Reverse") {
                    Ok(values.into_iter().rev().collect())
                } else {
                    Err(ExpansionError::Unsupported(format!("->{}()", name)))
                }
            }
        }
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let normalized = if cfg!(windows) {
            path.to_string()
        } else {
            path.replace('\\', "/")
        };
        let path = Path::new(&normalized);
        match &self.project.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl EvaluationState for ConditionState<'_> {
    fn condition(&self) -> &str {
        self.condition
    }

    fn location(&self) -> &ElementLocation {
        &self.location
    }

    fn options(&self) -> &ExpansionOptions {
        &self.project.options
    }

    fn expand_property(&self, expression: &str) -> Result<String, ExpansionError> {
        self.lookup_property(expression)
    }

    fn expand_item_list(
        &self,
        reference: &ItemListReference,
    ) -> Result<Vec<String>, ExpansionError> {
        let mut values: Vec<(String, Option<&Item>)> = self
            .project
            .items(&reference.name)
            .iter()
            .map(|item| (item.include.clone(), Some(item)))
            .collect();

        for transform in &reference.transforms {
            values = self.transform(&reference.name, values, transform)?;
        }

        Ok(values.into_iter().map(|(text, _)| text).collect())
    }

    fn expand_metadata(&self, reference: &MetadataReference) -> Result<String, ExpansionError> {
        self.lookup_metadata(self.current_item(), reference)
    }

    fn path_exists(&self, path: &str) -> bool {
        !path.is_empty() && self.resolve_path(path).exists()
    }
}

/// Expansion inside an item transform: `%()` resolves against the item being
/// transformed, everything else against the enclosing state.
struct ItemScope<'s, 'a> {
    outer: &'s ConditionState<'a>,
    item_type: &'s str,
    item: Option<&'s Item>,
}

impl EvaluationState for ItemScope<'_, '_> {
    fn condition(&self) -> &str {
        self.outer.condition
    }

    fn location(&self) -> &ElementLocation {
        &self.outer.location
    }

    fn options(&self) -> &ExpansionOptions {
        self.outer.options()
    }

    fn expand_property(&self, expression: &str) -> Result<String, ExpansionError> {
        self.outer.lookup_property(expression)
    }

    fn expand_item_list(
        &self,
        reference: &ItemListReference,
    ) -> Result<Vec<String>, ExpansionError> {
        self.outer.expand_item_list(reference)
    }

    fn expand_metadata(&self, reference: &MetadataReference) -> Result<String, ExpansionError> {
        let scope = self.item.map(|item| (self.item_type, item));
        self.outer.lookup_metadata(scope, reference)
    }

    fn path_exists(&self, path: &str) -> bool {
        self.outer.path_exists(path)
    }
}

// tests/common/mod.rs
//
// An evaluation state that records every expansion it is asked for.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;

use buildcond::state::{
    ElementLocation, EvaluationState, ExpansionError, ExpansionOptions, ItemListReference,
    ItemTransform, MetadataReference,
};

#[derive(Default)]
pub struct RecordingState {
    condition: String,
    location: ElementLocation,
    options: ExpansionOptions,
    properties: HashMap<String, String>,
    items: HashMap<String, Vec<String>>,
    metadata: HashMap<String, String>,
    paths: Vec<String>,
    calls: RefCell<Vec<String>>,
}

impl RecordingState {
    pub fn new(condition: &str) -> Self {
        RecordingState {
            condition: condition.to_string(),
            location: ElementLocation::new("test.proj", 1, 1),
            ..Self::default()
        }
    }

    pub fn property(mut self, name: &str, value: &str) -> Self {
        self.properties.insert(name.to_string(), value.to_string());
        self
    }

    pub fn item(mut self, item_type: &str, include: &str) -> Self {
        self.items
            .entry(item_type.to_string())
            .or_default()
            .push(include.to_string());
        self
    }

    pub fn metadata(mut self, name: &str, value: &str) -> Self {
        self.metadata.insert(name.to_string(), value.to_string());
        self
    }

    pub fn existing_path(mut self, path: &str) -> Self {
        self.paths.push(path.to_string());
        self
    }

    pub fn strict(mut self) -> Self {
        self.options = ExpansionOptions::strict();
        self
    }

    /// Every reference expanded so far, in order, e.g. `$(Config)`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self, reference: &str) -> usize {
        self.calls.borrow().iter().filter(|c| *c == reference).count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl EvaluationState for RecordingState {
    fn condition(&self) -> &str {
        &self.condition
    }

    fn location(&self) -> &ElementLocation {
        &self.location
    }

    fn options(&self) -> &ExpansionOptions {
        &self.options
    }

    fn expand_property(&self, expression: &str) -> Result<String, ExpansionError> {
        self.calls.borrow_mut().push(format!("$({})", expression));
        match self.properties.get(expression) {
            Some(value) => Ok(value.clone()),
            None if self.options.strict_properties => {
                Err(ExpansionError::UndefinedProperty(expression.to_string()))
            }
            None => Ok(String::new()),
        }
    }

    fn expand_item_list(
        &self,
        reference: &ItemListReference,
    ) -> Result<Vec<String>, ExpansionError> {
        self.calls.borrow_mut().push(format!("@({})", reference.name));
        let items = self.items.get(&reference.name).cloned().unwrap_or_default();
        match reference.transforms.as_slice() {
            [] => Ok(items),
            [ItemTransform::Function { name, .. }] if name == "Count" => {
                Ok(vec![items.len().to_string()])
            }
            _ => Err(ExpansionError::Unsupported(format!("@({})", reference.name))),
        }
    }

    fn expand_metadata(&self, reference: &MetadataReference) -> Result<String, ExpansionError> {
        self.calls.borrow_mut().push(reference.to_string());
        match self.metadata.get(&reference.name) {
            Some(value) => Ok(value.clone()),
            None if self.options.strict_metadata => {
                Err(ExpansionError::UndefinedMetadata(reference.to_string()))
            }
            None => Ok(String::new()),
        }
    }

    fn path_exists(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

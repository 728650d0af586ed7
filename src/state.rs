//! The contract between the condition engine and whatever owns the
//! properties and items a condition refers to.
//!
//! The engine never resolves references itself. It hands reference text to
//! an [`EvaluationState`] and only decides control flow, typing and
//! comparison over the text that comes back.

use std::fmt;

use thiserror::Error;

use crate::{chars, expander};

/// Where the condition came from, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementLocation {
    pub file: Option<String>,
    pub line: usize,
    pub column: usize,
}

impl ElementLocation {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        ElementLocation {
            file: Some(file.into()),
            line,
            column,
        }
    }
}

impl fmt::Display for ElementLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) if self.line > 0 => write!(f, "{}({},{})", file, self.line, self.column),
            Some(file) => f.write_str(file),
            None if self.line > 0 => write!(f, "({},{})", self.line, self.column),
            None => f.write_str("<unknown location>"),
        }
    }
}

/// How strictly references are expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExpansionOptions {
    /// Undefined properties are an error instead of empty text.
    pub strict_properties: bool,
    /// Undefined metadata is an error instead of empty text.
    pub strict_metadata: bool,
}

impl ExpansionOptions {
    pub fn strict() -> Self {
        ExpansionOptions {
            strict_properties: true,
            strict_metadata: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpansionError {
    #[error("property '{0}' is not defined")]
    UndefinedProperty(String),

    #[error("metadata '{0}' is not defined")]
    UndefinedMetadata(String),

    #[error("'{0}' is not supported")]
    Unsupported(String),

    #[error("malformed reference '{0}'")]
    InvalidReference(String),
}

/// A step applied to an item list before it is turned into text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemTransform {
    /// `->'%(Filename).obj'`
    Expression(String),
    /// `->Count()`, `->Distinct()`
    Function { name: String, args: String },
}

/// Parsed contents of an `@(...)` reference.
///
/// # Examples
/// ```text
/// @(Compile)                   // name: Compile
/// @(Compile, ',')              // separator: ","
/// @(Compile->'%(Filename)')    // one Expression transform
/// @(Compile->Distinct()->Count())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemListReference {
    pub name: String,
    pub transforms: Vec<ItemTransform>,
    pub separator: Option<String>,
}

impl ItemListReference {
    /// Default text between items when a list is used as a string.
    pub const DEFAULT_SEPARATOR: &'static str = ";";

    pub fn separator(&self) -> &str {
        self.separator.as_deref().unwrap_or(Self::DEFAULT_SEPARATOR)
    }

    /// Parses the text between `@(` and `)`.
    pub fn parse(inner: &str) -> Result<Self, ExpansionError> {
        let invalid = || ExpansionError::InvalidReference(format!("@({})", inner));
        let input: Vec<char> = inner.chars().collect();
        let mut pos = skip_whitespace(&input, 0);

        let name_start = pos;
        while pos < input.len() && chars::is_simple_string_char(input[pos]) {
            pos += 1;
        }
        if pos == name_start {
            return Err(invalid());
        }
        let name: String = input[name_start..pos].iter().collect();

        let mut transforms = Vec::new();
        loop {
            pos = skip_whitespace(&input, pos);
            if !(input.get(pos) == Some(&'-') && input.get(pos + 1) == Some(&'>')) {
                break;
            }
            pos = skip_whitespace(&input, pos + 2);

            if input.get(pos) == Some(&'\'') {
                let (text, next) = read_quoted(&input, pos).ok_or_else(invalid)?;
                transforms.push(ItemTransform::Expression(text));
                pos = next;
            } else {
                let fn_start = pos;
                while pos < input.len() && chars::is_simple_string_char(input[pos]) {
                    pos += 1;
                }
                if pos == fn_start {
                    return Err(invalid());
                }
                let fn_name: String = input[fn_start..pos].iter().collect();
                pos = skip_whitespace(&input, pos);
                if input.get(pos) != Some(&'(') {
                    return Err(invalid());
                }
                // The scanner expects a sigil just before the '('; the last
                // name character stands in for it.
                let end = chars::reference_end(&input, pos - 1).ok_or_else(invalid)?;
                let args: String = input[pos + 1..end - 1].iter().collect();
                transforms.push(ItemTransform::Function {
                    name: fn_name,
                    args: args.trim().to_string(),
                });
                pos = end;
            }
        }

        let mut separator = None;
        if input.get(pos) == Some(&',') {
            pos = skip_whitespace(&input, pos + 1);
            let (text, next) = read_quoted(&input, pos).ok_or_else(invalid)?;
            separator = Some(text);
            pos = skip_whitespace(&input, next);
        }

        if pos != input.len() {
            return Err(invalid());
        }

        Ok(ItemListReference {
            name,
            transforms,
            separator,
        })
    }
}

/// Parsed contents of a `%(...)` reference: `%(Culture)` or
/// `%(EmbeddedResource.Culture)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataReference {
    pub item_type: Option<String>,
    pub name: String,
}

impl MetadataReference {
    /// Parses the text between `%(` and `)`.
    pub fn parse(inner: &str) -> Result<Self, ExpansionError> {
        let is_name = |s: &str| !s.is_empty() && s.chars().all(chars::is_simple_string_char);
        let trimmed = inner.trim();

        let (item_type, name) = match trimmed.split_once('.') {
            Some((item, name)) => (Some(item.trim()), name.trim()),
            None => (None, trimmed),
        };

        if !is_name(name) || item_type.is_some_and(|item| !is_name(item)) {
            return Err(ExpansionError::InvalidReference(format!("%({})", inner)));
        }

        Ok(MetadataReference {
            item_type: item_type.map(str::to_string),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for MetadataReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.item_type {
            Some(item) => write!(f, "%({}.{})", item, self.name),
            None => write!(f, "%({})", self.name),
        }
    }
}

fn skip_whitespace(input: &[char], mut pos: usize) -> usize {
    while pos < input.len() && input[pos].is_whitespace() {
        pos += 1;
    }
    pos
}

/// Reads a `'...'` run at `pos`; returns its contents and the position after it.
fn read_quoted(input: &[char], pos: usize) -> Option<(String, usize)> {
    if input.get(pos) != Some(&'\'') {
        return None;
    }
    let close = (pos + 1..input.len()).find(|&j| input[j] == '\'')?;
    Some((input[pos + 1..close].iter().collect(), close + 1))
}

/// Everything a condition needs from its surroundings during one evaluation.
///
/// A state is borrowed for a single evaluation call and never retained by
/// the tree.
pub trait EvaluationState {
    /// The condition as written, for diagnostics.
    fn condition(&self) -> &str;

    fn location(&self) -> &ElementLocation;

    fn options(&self) -> &ExpansionOptions;

    /// Expands the text between `$(` and `)`: a property name, or a property
    /// function expression the state may not support.
    fn expand_property(&self, expression: &str) -> Result<String, ExpansionError>;

    /// Items of a list, after transforms, in order.
    fn expand_item_list(&self, reference: &ItemListReference)
    -> Result<Vec<String>, ExpansionError>;

    fn expand_metadata(&self, reference: &MetadataReference) -> Result<String, ExpansionError>;

    /// Backs the `Exists()` function.
    fn path_exists(&self, _path: &str) -> bool {
        false
    }

    /// Expands every reference embedded in `text`, then unescapes `%XX`.
    fn expand(&self, text: &str) -> Result<String, ExpansionError> {
        expander::expand(self, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_list_reference_plain() {
        let reference = ItemListReference::parse("Compile").unwrap();
        assert_eq!(reference.name, "Compile");
        assert!(reference.transforms.is_empty());
        assert_eq!(reference.separator(), ";");
    }

    #[test]
    fn test_item_list_reference_transforms() {
        let reference = ItemListReference::parse(" Src -> '%(Filename).obj' ->Count() , '|' ").unwrap();
        assert_eq!(reference.name, "Src");
        assert_eq!(
            reference.transforms,
            vec![
                ItemTransform::Expression("%(Filename).obj".to_string()),
                ItemTransform::Function {
                    name: "Count".to_string(),
                    args: String::new(),
                },
            ]
        );
        assert_eq!(reference.separator(), "|");
    }

    #[test]
    fn test_item_list_reference_malformed() {
        for text in ["", "->Count()", "Src->", "Src->Count", "Src, ;", "Src extra"] {
            assert!(ItemListReference::parse(text).is_err(), "{text:?}");
        }
    }

    #[test]
    fn test_metadata_reference() {
        let m = MetadataReference::parse("Culture").unwrap();
        assert_eq!((m.item_type, m.name.as_str()), (None, "Culture"));

        let m = MetadataReference::parse("EmbeddedResource.Culture").unwrap();
        assert_eq!(m.item_type.as_deref(), Some("EmbeddedResource"));
        assert_eq!(m.to_string(), "%(EmbeddedResource.Culture)");

        assert!(MetadataReference::parse("a.b.c").is_err());
        assert!(MetadataReference::parse("").is_err());
    }

    #[test]
    fn test_location_display() {
        assert_eq!(ElementLocation::new("a.proj", 3, 7).to_string(), "a.proj(3,7)");
        assert_eq!(ElementLocation::default().to_string(), "<unknown location>");
    }
}

//! Parsed conditions keyed by their text.
//!
//! The same condition string recurs across many elements of a build, so it
//! is parsed once and the tree shared. Trees hold no evaluation state, which
//! makes sharing them across threads safe.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::parser::{Condition, ParseError, ParserOptions};

#[derive(Debug, Default)]
pub struct ConditionCache {
    options: ParserOptions,
    entries: Mutex<HashMap<String, Arc<Condition>>>,
}

impl ConditionCache {
    pub fn new(options: ParserOptions) -> Self {
        ConditionCache {
            options,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> ParserOptions {
        self.options
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Arc<Condition>>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The parsed form of `text`, parsing it on first use.
    ///
    /// Parse failures are not cached. A newly parsed condition that mixes
    /// `and` and `or` without parentheses logs a warning once.
    pub fn get_or_parse(&self, text: &str) -> Result<Arc<Condition>, ParseError> {
        if let Some(condition) = self.entries().get(text) {
            return Ok(Arc::clone(condition));
        }

        let condition = Arc::new(Condition::parse_with_options(text, self.options)?);
        if condition.has_and_or_conflict() {
            log::warn!(
                "condition \"{}\" mixes 'and' and 'or' without parentheses; 'and' binds tighter",
                text
            );
        }

        let mut entries = self.entries();
        let cached = entries
            .entry(text.to_string())
            .or_insert_with(|| Arc::clone(&condition));
        Ok(Arc::clone(cached))
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuses_parsed_condition() {
        let cache = ConditionCache::default();
        let first = cache.get_or_parse("'$(A)' == 'b'").unwrap();
        let second = cache.get_or_parse("'$(A)' == 'b'").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        cache.get_or_parse("'$(A)' != 'b'").unwrap();
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_errors_not_cached() {
        let cache = ConditionCache::default();
        assert!(cache.get_or_parse("'unterminated").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_options_apply() {
        let cache = ConditionCache::new(ParserOptions::properties_only());
        assert!(cache.get_or_parse("@(Compile) == ''").is_err());
        assert!(cache.get_or_parse("$(A) == ''").is_ok());
    }

    #[test]
    fn test_shared_across_threads() {
        let cache = Arc::new(ConditionCache::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.get_or_parse("a == b").unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 1);
    }
}

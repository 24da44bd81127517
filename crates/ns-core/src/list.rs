//! Compiled filter list
//!
//! A `CompiledFilterList` is built once through `FilterListBuilder` and never
//! mutated afterwards, so it can be shared between request threads behind an
//! `Arc` without locking.

use std::sync::Arc;

use serde::Serialize;

use crate::rule::Rule;
use crate::types::{RuleCategory, CATEGORY_COUNT};

/// Immutable rule table for one filter list.
#[derive(Debug)]
pub struct CompiledFilterList {
    name: Arc<str>,
    version: String,
    categories: [Vec<Rule>; CATEGORY_COUNT],
}

impl CompiledFilterList {
    /// A list with no rules at all.
    pub fn empty(name: &str) -> Self {
        FilterListBuilder::new().name(name).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Rules of one category, in source order.
    pub fn rules(&self, category: RuleCategory) -> &[Rule] {
        &self.categories[category.index()]
    }

    pub fn rule_count(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.iter().all(Vec::is_empty)
    }

    pub fn counts(&self) -> CategoryCounts {
        let mut counts = CategoryCounts::default();
        for category in RuleCategory::ALL {
            counts.0[category.index()] = self.rules(category).len();
        }
        counts
    }
}

/// Per-category rule counts, serialized as `{"MainBlock": 12, ...}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryCounts([usize; CATEGORY_COUNT]);

impl CategoryCounts {
    pub fn get(&self, category: RuleCategory) -> usize {
        self.0[category.index()]
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RuleCategory, usize)> + '_ {
        RuleCategory::ALL.iter().map(move |c| (*c, self.0[c.index()]))
    }
}

impl Serialize for CategoryCounts {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(CATEGORY_COUNT))?;
        for (category, count) in self.iter() {
            map.serialize_entry(category.name(), &count)?;
        }
        map.end()
    }
}

/// Accumulates rules in source order, then freezes them into a table.
#[derive(Debug, Default)]
pub struct FilterListBuilder {
    name: String,
    version: String,
    categories: [Vec<Rule>; CATEGORY_COUNT],
}

impl FilterListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn set_version(&mut self, version: &str) {
        self.version = version.to_string();
    }

    pub fn push(&mut self, category: RuleCategory, rule: Rule) {
        self.categories[category.index()].push(rule);
    }

    pub fn build(self) -> CompiledFilterList {
        CompiledFilterList {
            name: Arc::from(self.name),
            version: self.version,
            categories: self.categories,
        }
    }
}

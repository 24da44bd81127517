//! List Orchestrator
//!
//! Evaluates a request against several subscribed lists in configured order and
//! returns the first non-default verdict.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::list::CompiledFilterList;
use crate::matcher::evaluate;
use crate::types::{RequestDescriptor, Verdict};

/// An ordered, immutable set of compiled lists.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    lists: Vec<Arc<CompiledFilterList>>,
}

impl FilterSet {
    pub fn new(lists: Vec<Arc<CompiledFilterList>>) -> Self {
        Self { lists }
    }

    pub fn lists(&self) -> &[Arc<CompiledFilterList>] {
        &self.lists
    }

    pub fn get(&self, name: &str) -> Option<&Arc<CompiledFilterList>> {
        self.lists.iter().find(|list| list.name() == name)
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Ask each list in order; the first non-default verdict wins.
    pub fn evaluate(&self, request: &RequestDescriptor<'_>) -> Verdict {
        self.lists
            .iter()
            .map(|list| evaluate(list, request))
            .find(|verdict| !verdict.is_default())
            .unwrap_or_default()
    }

    /// Copy of this set with `list` replacing the entry of the same name, or
    /// appended when no such entry exists.
    pub fn with_list(&self, list: Arc<CompiledFilterList>) -> Self {
        let mut lists = self.lists.clone();
        match lists.iter_mut().find(|existing| existing.name() == list.name()) {
            Some(slot) => *slot = list,
            None => lists.push(list),
        }
        Self { lists }
    }
}

// ── Hot-reloadable set ──

/// A hot-reloadable wrapper around `FilterSet`.
///
/// Reads are lock-free through `ArcSwap`; a refreshed list replaces the whole
/// set in one atomic store, so an in-flight evaluation keeps the set it loaded.
pub struct SharedFilterSet {
    inner: ArcSwap<FilterSet>,
}

impl SharedFilterSet {
    pub fn new(set: FilterSet) -> Self {
        Self {
            inner: ArcSwap::new(Arc::new(set)),
        }
    }

    /// Evaluate a request against the current set.
    pub fn evaluate(&self, request: &RequestDescriptor<'_>) -> Verdict {
        self.inner.load().evaluate(request)
    }

    /// Snapshot of the current set.
    pub fn current(&self) -> Arc<FilterSet> {
        self.inner.load_full()
    }

    /// Atomically replace every list.
    pub fn set_lists(&self, lists: Vec<Arc<CompiledFilterList>>) {
        self.inner.store(Arc::new(FilterSet::new(lists)));
    }

    /// Atomically swap in a freshly compiled list, keeping its position.
    pub fn replace_list(&self, list: CompiledFilterList) {
        let list = Arc::new(list);
        self.inner.rcu(|current| current.with_list(list.clone()));
        log::info!("Replaced filter list '{}' ({} rules)", list.name(), list.rule_count());
    }

    pub fn list_count(&self) -> usize {
        self.inner.load().len()
    }
}

impl Default for SharedFilterSet {
    fn default() -> Self {
        Self::new(FilterSet::default())
    }
}

impl fmt::Debug for SharedFilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedFilterSet")
            .field("inner", &*self.inner.load())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::list::FilterListBuilder;
    use crate::rule::{Fragments, Rule};
    use crate::types::{Disposition, RuleCategory};

    fn single_rule_list(name: &str, category: RuleCategory, fragment: &str) -> CompiledFilterList {
        let mut builder = FilterListBuilder::new().name(name);
        let mut fragments = Fragments::new();
        fragments.push(fragment.to_string());
        builder.push(category, Rule::with_fragments(None, fragments, Arc::from(fragment)));
        builder.build()
    }

    #[test]
    fn first_non_default_list_wins() {
        let set = FilterSet::new(vec![
            Arc::new(single_rule_list("privacy", RuleCategory::MainBlock, "tracker")),
            Arc::new(single_rule_list("ads", RuleCategory::MainAllow, "ads")),
            Arc::new(single_rule_list("annoyances", RuleCategory::MainBlock, "ads")),
        ]);

        let verdict = set.evaluate(&RequestDescriptor::new(None, "https://x.com/ads.js", false));
        assert_eq!(verdict.disposition, Disposition::Allowed);
        assert_eq!(&*verdict.matched.unwrap().list_name, "ads");

        let verdict = set.evaluate(&RequestDescriptor::new(None, "https://x.com/tracker.js", false));
        assert_eq!(&*verdict.matched.unwrap().list_name, "privacy");

        assert!(set.evaluate(&RequestDescriptor::new(None, "https://x.com/app.js", false)).is_default());
    }

    #[test]
    fn empty_set_returns_default() {
        let set = FilterSet::default();
        assert!(set.evaluate(&RequestDescriptor::new(Some("a.com"), "https://b.com/", true)).is_default());
    }

    #[test]
    fn replace_keeps_position_and_appends_new_names() {
        let shared = SharedFilterSet::new(FilterSet::new(vec![
            Arc::new(single_rule_list("first", RuleCategory::MainBlock, "one")),
            Arc::new(single_rule_list("second", RuleCategory::MainBlock, "two")),
        ]));
        let before = shared.current();

        shared.replace_list(single_rule_list("first", RuleCategory::MainBlock, "uno"));
        shared.replace_list(single_rule_list("third", RuleCategory::MainBlock, "three"));

        let after = shared.current();
        let names: Vec<&str> = after.lists().iter().map(|l| l.name()).collect();
        assert_eq!(names, ["first", "second", "third"]);
        assert!(shared.evaluate(&RequestDescriptor::new(None, "https://x.com/one", false)).is_default());
        assert!(shared.evaluate(&RequestDescriptor::new(None, "https://x.com/uno", false)).is_blocked());

        // The snapshot taken before the swap is untouched.
        assert!(before.evaluate(&RequestDescriptor::new(None, "https://x.com/one", false)).is_blocked());
        assert_eq!(shared.list_count(), 3);
    }

    #[test]
    fn concurrent_reads_during_swap() {
        let shared = Arc::new(SharedFilterSet::new(FilterSet::new(vec![Arc::new(single_rule_list(
            "ads",
            RuleCategory::MainBlock,
            "ads",
        ))])));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        let verdict = shared.evaluate(&RequestDescriptor::new(None, "https://x.com/ads.js", false));
                        assert!(verdict.is_blocked());
                    }
                })
            })
            .collect();

        for _ in 0..100 {
            shared.replace_list(single_rule_list("ads", RuleCategory::MainBlock, "ads"));
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }
}

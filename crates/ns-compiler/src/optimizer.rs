use std::collections::HashSet;

use ns_core::types::RuleCategory;

use crate::parser::{ParsedRule, PatternBody};

/// Counters reported after a list has been compiled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub lines: usize,
    pub rules: usize,
    pub dropped: usize,
    pub deduped: usize,
    pub invalid_regex: usize,
}

/// Drops rules identical to one already compiled from the same list. The first
/// occurrence wins so the reported source line stays the earliest one.
#[derive(Debug, Default)]
pub struct Deduper {
    seen: HashSet<RuleKey>,
}

impl Deduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time an equivalent rule is offered.
    pub fn first_seen(&mut self, rule: &ParsedRule) -> bool {
        self.seen.insert(RuleKey::from(rule))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RuleKey {
    category: RuleCategory,
    domain: Option<String>,
    regex: bool,
    pattern: Vec<String>,
}

impl From<&ParsedRule> for RuleKey {
    fn from(rule: &ParsedRule) -> Self {
        let (regex, pattern) = match &rule.body {
            PatternBody::Fragments(fragments) => (false, fragments.iter().cloned().collect()),
            PatternBody::Regex(body) => (true, vec![body.clone()]),
        };
        Self {
            category: rule.category,
            domain: rule.domain.clone(),
            regex,
            pattern,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ns_core::rule::Fragments;

    fn parsed(category: RuleCategory, domain: Option<&str>, parts: &[&str]) -> ParsedRule {
        let fragments: Fragments = parts.iter().map(|p| p.to_string()).collect();
        ParsedRule {
            category,
            domain: domain.map(str::to_string),
            body: PatternBody::Fragments(fragments),
        }
    }

    #[test]
    fn identical_rules_are_seen_once() {
        let mut deduper = Deduper::new();
        assert!(deduper.first_seen(&parsed(RuleCategory::MainBlock, None, &["ads"])));
        assert!(!deduper.first_seen(&parsed(RuleCategory::MainBlock, None, &["ads"])));
    }

    #[test]
    fn category_domain_and_fragments_distinguish_rules() {
        let mut deduper = Deduper::new();
        assert!(deduper.first_seen(&parsed(RuleCategory::MainBlock, None, &["ads"])));
        assert!(deduper.first_seen(&parsed(RuleCategory::MainAllow, None, &["ads"])));
        assert!(deduper.first_seen(&parsed(RuleCategory::DomainBlock, Some("a.com"), &["ads"])));
        assert!(deduper.first_seen(&parsed(RuleCategory::DomainBlock, Some("b.com"), &["ads"])));
        assert!(deduper.first_seen(&parsed(RuleCategory::MainBlock, None, &["ads", ".js"])));
        assert!(deduper.first_seen(&parsed(RuleCategory::MainBlock, None, &["ads.js"])));
    }

    #[test]
    fn regex_and_fragment_bodies_differ() {
        let mut deduper = Deduper::new();
        assert!(deduper.first_seen(&parsed(RuleCategory::DomainBlock, Some("a.com"), &["ads"])));
        assert!(deduper.first_seen(&ParsedRule {
            category: RuleCategory::DomainBlock,
            domain: Some("a.com".to_string()),
            body: PatternBody::Regex("ads".to_string()),
        }));
    }
}

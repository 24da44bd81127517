//! Rule Matcher
//!
//! This is the hot path - every intercepted request goes through here.
//! Evaluation is read-only against an immutable table and allocates only when
//! building the provenance of a match.

use crate::list::CompiledFilterList;
use crate::rule::Rule;
use crate::types::{Disposition, RequestDescriptor, RuleAction, RuleCategory, RuleMatch, Verdict};

/// Evaluate a request against one compiled list.
///
/// Categories are consulted in `RuleCategory::EVALUATION_ORDER`; the first rule
/// of the first category that matches decides, later categories are not looked
/// at. Within a category the first matching rule in source order is reported.
pub fn evaluate(list: &CompiledFilterList, request: &RequestDescriptor<'_>) -> Verdict {
    match find_match(list, request) {
        Some((category, rule)) => Verdict {
            disposition: Disposition::from(category.action()),
            matched: Some(RuleMatch {
                category,
                fragments: rule.display_fragments(),
                list_name: list.shared_name().clone(),
                original_text: rule.original_text().clone(),
            }),
        },
        None => Verdict::default(),
    }
}

/// Locate the deciding rule without building a verdict.
pub fn find_match<'a>(
    list: &'a CompiledFilterList,
    request: &RequestDescriptor<'_>,
) -> Option<(RuleCategory, &'a Rule)> {
    for category in RuleCategory::EVALUATION_ORDER {
        if !request.satisfies(category.scope()) {
            continue;
        }

        let anchor = category.anchor();
        if let Some(rule) = list.rules(category).iter().find(|rule| rule.matches(anchor, request)) {
            return Some((category, rule));
        }
    }

    None
}

/// A borrowed view pairing a table with the matcher, mirroring how callers hold
/// one list and evaluate many requests against it.
pub struct Matcher<'a> {
    list: &'a CompiledFilterList,
}

impl<'a> Matcher<'a> {
    pub fn new(list: &'a CompiledFilterList) -> Self {
        Self { list }
    }

    /// Match a request and return the decision.
    pub fn match_request(&self, request: &RequestDescriptor<'_>) -> Verdict {
        evaluate(self.list, request)
    }

    pub fn should_block(&self, request: &RequestDescriptor<'_>) -> bool {
        matches!(find_match(self.list, request), Some((category, _)) if category.action() == RuleAction::Block)
    }
}

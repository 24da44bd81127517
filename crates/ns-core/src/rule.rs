//! Entry Model
//!
//! A compiled rule is either an ordered list of literal fragments (AND
//! semantics) or a regular expression, optionally scoped to a page domain.

use std::fmt;
use std::sync::Arc;

use arrayvec::ArrayVec;
use regex::Regex;

use crate::types::{Anchor, RequestDescriptor};

/// Most fragments a wildcard pattern may split into.
pub const MAX_FRAGMENTS: usize = 5;

/// Literal substrings a URL must contain, in pattern order.
pub type Fragments = ArrayVec<String, MAX_FRAGMENTS>;

/// How the URL side of a rule is checked.
#[derive(Debug, Clone)]
pub enum RulePattern {
    Fragments(Fragments),
    Regex(Regex),
}

/// A single compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
    domain: Option<String>,
    pattern: RulePattern,
    original_text: Arc<str>,
}

impl Rule {
    /// Build a fragment rule. `fragments` must not be empty.
    pub fn with_fragments(domain: Option<String>, fragments: Fragments, original_text: Arc<str>) -> Self {
        debug_assert!(!fragments.is_empty(), "fragment rule without fragments");
        Self {
            domain,
            pattern: RulePattern::Fragments(fragments),
            original_text,
        }
    }

    pub fn with_regex(domain: Option<String>, regex: Regex, original_text: Arc<str>) -> Self {
        Self {
            domain,
            pattern: RulePattern::Regex(regex),
            original_text,
        }
    }

    /// Target domain suffix for domain-scoped categories.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn pattern(&self) -> &RulePattern {
        &self.pattern
    }

    /// The untouched source line. Never consulted while matching.
    pub fn original_text(&self) -> &Arc<str> {
        &self.original_text
    }

    /// Number of literal fragments (0 for regex rules).
    pub fn arity(&self) -> usize {
        match &self.pattern {
            RulePattern::Fragments(fragments) => fragments.len(),
            RulePattern::Regex(_) => 0,
        }
    }

    /// Fragments joined for display, domain first.
    pub fn display_fragments(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(MAX_FRAGMENTS + 1);
        if let Some(domain) = &self.domain {
            parts.push(domain);
        }
        match &self.pattern {
            RulePattern::Fragments(fragments) => parts.extend(fragments.iter().map(String::as_str)),
            RulePattern::Regex(regex) => parts.push(regex.as_str()),
        }
        parts.join(", ")
    }

    /// Check this rule against a request under the given anchoring.
    ///
    /// Scope gating (third-party, presence of a page domain) is the caller's job;
    /// a domain-scoped rule seen with no page domain never matches.
    pub fn matches(&self, anchor: Anchor, request: &RequestDescriptor<'_>) -> bool {
        if let Some(target) = &self.domain {
            match request.current_domain {
                Some(current) if domain_matches(current, target) => {}
                _ => return false,
            }
        }

        match &self.pattern {
            RulePattern::Fragments(fragments) => fragments_match(fragments, anchor, request.resource_url),
            RulePattern::Regex(regex) => regex.is_match(request.resource_url),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original_text)
    }
}

/// Suffix match on label boundaries, ignoring ASCII case.
///
/// Stricter than a plain `ends_with`: `sub.example.com` is inside
/// `example.com`, while `example.com.evil.org` and `badexample.com` are not.
pub fn domain_matches(current: &str, target: &str) -> bool {
    let (current, target) = (current.as_bytes(), target.as_bytes());
    if current.len() < target.len() {
        return false;
    }
    let cut = current.len() - target.len();
    current[cut..].eq_ignore_ascii_case(target) && (cut == 0 || current[cut - 1] == b'.')
}

fn fragments_match(fragments: &[String], anchor: Anchor, url: &str) -> bool {
    let last = fragments.len().saturating_sub(1);
    fragments.iter().enumerate().all(|(i, fragment)| {
        if i == 0 && anchor.contains(Anchor::INITIAL) {
            url.starts_with(fragment.as_str())
        } else if i == last && anchor.contains(Anchor::FINAL) {
            url.ends_with(fragment.as_str())
        } else {
            url.contains(fragment.as_str())
        }
    })
}

//! Line classifier
//!
//! Turns one raw filter-list line into zero or more categorized rules, a header
//! field, or a reason the line was dropped. Nothing here fails: anything the
//! engine does not model is dropped and reported.

use std::fmt;
use std::net::IpAddr;

use ns_core::rule::{Fragments, MAX_FRAGMENTS};
use ns_core::types::{Anchor, RuleAction, RuleCategory};

use crate::options::{normalize_domain, parse_options, split_rule_options, FilterOptions};

/// Why a line produced no rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    Blank,
    /// `!` line other than a captured header, or `#` hosts-style comment
    Comment,
    /// `##`, `#@#`, `#?#` and other cosmetic syntaxes
    ElementHiding,
    /// `[Adblock Plus 2.0]`
    CompatibilityHeader,
    /// csp / websocket / removeparam / badfilter and similar options
    UnsupportedOption,
    /// `~third-party` (or `first-party`)
    FirstPartyOnly,
    /// `~` in a rule without options
    AmbiguousNegation,
    /// `~domain` inside an `@@` rule
    NegatedAllowDomain,
    EmptyPattern,
    TooManyFragments,
    /// No category models this combination (e.g. regex exception rules)
    NoCategory,
    InvalidRegex,
    /// Identical rule already compiled from an earlier line
    Duplicate,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blank => "blank",
            Self::Comment => "comment",
            Self::ElementHiding => "element-hiding",
            Self::CompatibilityHeader => "compatibility-header",
            Self::UnsupportedOption => "unsupported-option",
            Self::FirstPartyOnly => "first-party-only",
            Self::AmbiguousNegation => "ambiguous-negation",
            Self::NegatedAllowDomain => "negated-allow-domain",
            Self::EmptyPattern => "empty-pattern",
            Self::TooManyFragments => "too-many-fragments",
            Self::NoCategory => "no-category",
            Self::InvalidRegex => "invalid-regex",
            Self::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line the compiler skipped, handed to the diagnostics callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DroppedLine<'a> {
    /// 1-based line number in the source
    pub line_number: usize,
    pub text: &'a str,
    pub reason: DropReason,
}

/// Header comments captured into the compiled list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderField {
    Title(String),
    Version(String),
}

/// URL side of a parsed rule, before regex compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternBody {
    Fragments(Fragments),
    Regex(String),
}

/// A categorized rule not yet compiled into the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRule {
    pub category: RuleCategory,
    pub domain: Option<String>,
    pub body: PatternBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Header(HeaderField),
    Rules(Vec<ParsedRule>),
}

const ELEMENT_HIDING_MARKERS: [&str; 6] = ["##", "#@#", "#?#", "#$#", "#%#", "#@?#"];

const DROPPED_OPTION_MARKERS: [&str; 4] = [
    "$csp=script-src",
    "$websocket",
    "$third-party,websocket",
    "$script,websocket",
];

/// Classify a single line.
pub fn parse_line(raw_line: &str) -> Result<ParsedLine, DropReason> {
    let line = raw_line.trim();
    if line.is_empty() {
        return Err(DropReason::Blank);
    }

    if let Some(comment) = line.strip_prefix('!') {
        return parse_header(comment).map(ParsedLine::Header).ok_or(DropReason::Comment);
    }

    if line.starts_with('[') {
        return Err(DropReason::CompatibilityHeader);
    }

    if ELEMENT_HIDING_MARKERS.iter().any(|marker| line.contains(marker)) {
        return Err(DropReason::ElementHiding);
    }

    if line.starts_with('#') {
        return Err(DropReason::Comment);
    }

    if DROPPED_OPTION_MARKERS.iter().any(|marker| line.contains(marker)) {
        return Err(DropReason::UnsupportedOption);
    }

    if let Some(host) = parse_hosts_line(line) {
        let mut fragments = Fragments::new();
        fragments.push(host?);
        return Ok(ParsedLine::Rules(vec![ParsedRule {
            category: RuleCategory::MainBlock,
            domain: None,
            body: PatternBody::Fragments(fragments),
        }]));
    }

    let (action, rest) = match line.strip_prefix("@@") {
        Some(rest) => (RuleAction::Allow, rest),
        None => (RuleAction::Block, line),
    };
    let rest = rest.strip_prefix("||").unwrap_or(rest);

    let (pattern, options_text) = split_rule_options(rest);
    let options = match options_text {
        Some(text) => parse_options(text)?,
        None => FilterOptions::default(),
    };

    let mut anchor = Anchor::empty();
    let mut pattern = pattern;
    if let Some(stripped) = pattern.strip_suffix('|') {
        anchor |= Anchor::FINAL;
        pattern = stripped;
    }
    if let Some(stripped) = pattern.strip_prefix('|') {
        anchor |= Anchor::INITIAL;
        pattern = stripped;
    }
    // Final wins when a pattern is anchored at both ends.
    if anchor.contains(Anchor::FINAL) {
        anchor.remove(Anchor::INITIAL);
    }

    // Without options a pipe anchor takes priority over a backslash.
    let regex = pattern.contains('\\') && (options_text.is_some() || anchor.is_empty());
    let body = if regex {
        PatternBody::Regex(regex_body(pattern).to_string())
    } else {
        if options_text.is_none() && anchor.is_empty() && pattern.contains('~') {
            return Err(DropReason::AmbiguousNegation);
        }
        let (fragments, fragment_anchor) = split_wildcards(&pattern.replace('^', ""), anchor)?;
        anchor = fragment_anchor;
        PatternBody::Fragments(fragments)
    };

    let is_regex = matches!(body, PatternBody::Regex(_));
    let mut rules = Vec::new();

    if options.domains.is_empty() {
        let category = select_category(action, options.third_party, false, is_regex, anchor)
            .ok_or(DropReason::NoCategory)?;
        rules.push(ParsedRule { category, domain: None, body });
        return Ok(ParsedLine::Rules(rules));
    }

    let mut last_reason = DropReason::NoCategory;
    for entry in &options.domains {
        let entry_action = match (action, entry.negated) {
            (RuleAction::Allow, true) => {
                log::trace!("Dropping ~{} from exception rule '{}'", entry.domain, line);
                last_reason = DropReason::NegatedAllowDomain;
                continue;
            }
            (RuleAction::Block, true) => RuleAction::Allow,
            (action, false) => action,
        };

        match select_category(entry_action, options.third_party, true, is_regex, anchor) {
            Some(category) => rules.push(ParsedRule {
                category,
                domain: Some(entry.domain.clone()),
                body: body.clone(),
            }),
            None => last_reason = DropReason::NoCategory,
        }
    }

    // Only exclusions: the rule applies everywhere else.
    if action == RuleAction::Block && !options.has_positive_domain() {
        if let Some(category) = select_category(action, options.third_party, false, is_regex, anchor) {
            rules.push(ParsedRule { category, domain: None, body });
        }
    }

    if rules.is_empty() {
        return Err(last_reason);
    }

    Ok(ParsedLine::Rules(rules))
}

fn parse_header(comment: &str) -> Option<HeaderField> {
    let comment = comment.trim_start();
    if let Some(title) = comment.strip_prefix("Title:") {
        return Some(HeaderField::Title(title.trim().to_string()));
    }
    if let Some(version) = comment.strip_prefix("Version:") {
        return Some(HeaderField::Version(version.trim().to_string()));
    }
    None
}

/// `0.0.0.0 ads.example.com` style entries. `None` when the line is not a
/// hosts-file entry at all.
fn parse_hosts_line(line: &str) -> Option<Result<String, DropReason>> {
    let mut parts = line.split_whitespace();
    let first = parts.next()?;
    let second = parts.next()?;

    if first.parse::<IpAddr>().is_err() {
        return None;
    }

    if second.parse::<IpAddr>().is_ok() {
        return Some(Err(DropReason::NoCategory));
    }

    // localhost, broadcasthost and other single-label names
    match normalize_domain(second) {
        Some(host) if host.contains('.') && host != "localhost.localdomain" => Some(Ok(host)),
        _ => Some(Err(DropReason::NoCategory)),
    }
}

/// Strip the `/.../` delimiters of a regex literal.
fn regex_body(pattern: &str) -> &str {
    if pattern.len() >= 2 && pattern.starts_with('/') && pattern.ends_with('/') {
        &pattern[1..pattern.len() - 1]
    } else {
        pattern
    }
}

/// Split a pattern at each `*` into ordered fragments.
///
/// Leading and trailing wildcards cancel the anchor on that side.
pub fn split_wildcards(pattern: &str, anchor: Anchor) -> Result<(Fragments, Anchor), DropReason> {
    let mut anchor = anchor;
    if pattern.starts_with('*') {
        anchor.remove(Anchor::INITIAL);
    }
    if pattern.ends_with('*') {
        anchor.remove(Anchor::FINAL);
    }

    let mut fragments = Fragments::new();
    for piece in pattern.split('*').filter(|piece| !piece.is_empty()) {
        if fragments.len() == MAX_FRAGMENTS {
            return Err(DropReason::TooManyFragments);
        }
        fragments.push(piece.to_string());
    }

    if fragments.is_empty() {
        return Err(DropReason::EmptyPattern);
    }

    Ok((fragments, anchor))
}

/// Pick the category for a rule's action, scope and anchoring.
///
/// Anchored variants that have no category of their own fall back to the
/// un-anchored category of the same scope. Regex exceptions have no category.
pub fn select_category(
    action: RuleAction,
    third_party: bool,
    domain: bool,
    regex: bool,
    anchor: Anchor,
) -> Option<RuleCategory> {
    use RuleCategory::*;

    let initial = anchor.contains(Anchor::INITIAL);
    let final_ = anchor.contains(Anchor::FINAL);

    let category = match (action, domain, third_party) {
        (RuleAction::Allow, _, _) if regex => return None,
        (RuleAction::Block, true, true) if regex => ThirdPartyDomainRegexBlock,
        (RuleAction::Block, true, false) if regex => DomainRegexBlock,
        (RuleAction::Block, false, true) if regex => ThirdPartyRegexBlock,
        (RuleAction::Block, false, false) if regex => RegexBlock,

        (RuleAction::Allow, true, true) if initial => ThirdPartyDomainInitialAllow,
        (RuleAction::Allow, true, true) => ThirdPartyDomainAllow,
        (RuleAction::Allow, true, false) if initial => DomainInitialAllow,
        (RuleAction::Allow, true, false) if final_ => DomainFinalAllow,
        (RuleAction::Allow, true, false) => DomainAllow,
        (RuleAction::Allow, false, true) => ThirdPartyAllow,
        (RuleAction::Allow, false, false) if final_ => FinalAllow,
        (RuleAction::Allow, false, false) => MainAllow,

        (RuleAction::Block, true, true) if initial => ThirdPartyDomainInitialBlock,
        (RuleAction::Block, true, true) => ThirdPartyDomainBlock,
        (RuleAction::Block, true, false) if initial => DomainInitialBlock,
        (RuleAction::Block, true, false) if final_ => DomainFinalBlock,
        (RuleAction::Block, true, false) => DomainBlock,
        (RuleAction::Block, false, true) if initial => ThirdPartyInitialBlock,
        (RuleAction::Block, false, true) => ThirdPartyBlock,
        (RuleAction::Block, false, false) if initial => InitialBlock,
        (RuleAction::Block, false, false) if final_ => FinalBlock,
        (RuleAction::Block, false, false) => MainBlock,
    };

    Some(category)
}

//! Core type definitions for Netsift
//!
//! Rule categories, request descriptors and verdicts shared by the compiler,
//! the matcher and the orchestrator.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

// =============================================================================
// Rule Actions
// =============================================================================

/// What a matched rule does to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RuleAction {
    /// Exception rule (@@...) - allows the request
    Allow,
    /// Block rule - cancels the request
    Block,
}

// =============================================================================
// Scope and Anchor flags
// =============================================================================

bitflags::bitflags! {
    /// Request properties a category requires before its rules are consulted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Scope: u8 {
        /// Needs a current page domain; rules carry a target domain suffix
        const DOMAIN = 1 << 0;
        /// Only applies to third-party requests
        const THIRD_PARTY = 1 << 1;
    }
}

bitflags::bitflags! {
    /// Positional checks applied to a rule's fragments.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Anchor: u8 {
        /// First fragment must be a prefix of the URL (starts with |)
        const INITIAL = 1 << 0;
        /// Last fragment must be a suffix of the URL (ends with |)
        const FINAL = 1 << 1;
    }
}

// =============================================================================
// Rule Categories
// =============================================================================

/// One of the 22 matching strategies a compiled rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[repr(u8)]
pub enum RuleCategory {
    MainAllow = 0,
    FinalAllow,
    DomainAllow,
    DomainInitialAllow,
    DomainFinalAllow,
    ThirdPartyAllow,
    ThirdPartyDomainAllow,
    ThirdPartyDomainInitialAllow,
    MainBlock,
    InitialBlock,
    FinalBlock,
    DomainBlock,
    DomainInitialBlock,
    DomainFinalBlock,
    DomainRegexBlock,
    ThirdPartyBlock,
    ThirdPartyInitialBlock,
    ThirdPartyDomainBlock,
    ThirdPartyDomainInitialBlock,
    ThirdPartyRegexBlock,
    ThirdPartyDomainRegexBlock,
    RegexBlock,
}

/// Number of rule categories.
pub const CATEGORY_COUNT: usize = 22;

impl RuleCategory {
    /// All categories in declaration order.
    pub const ALL: [RuleCategory; CATEGORY_COUNT] = [
        Self::MainAllow,
        Self::FinalAllow,
        Self::DomainAllow,
        Self::DomainInitialAllow,
        Self::DomainFinalAllow,
        Self::ThirdPartyAllow,
        Self::ThirdPartyDomainAllow,
        Self::ThirdPartyDomainInitialAllow,
        Self::MainBlock,
        Self::InitialBlock,
        Self::FinalBlock,
        Self::DomainBlock,
        Self::DomainInitialBlock,
        Self::DomainFinalBlock,
        Self::DomainRegexBlock,
        Self::ThirdPartyBlock,
        Self::ThirdPartyInitialBlock,
        Self::ThirdPartyDomainBlock,
        Self::ThirdPartyDomainInitialBlock,
        Self::ThirdPartyRegexBlock,
        Self::ThirdPartyDomainRegexBlock,
        Self::RegexBlock,
    ];

    /// Fixed precedence used by the matcher. Declaration order is precedence
    /// order: every allow category is consulted before any block category.
    pub const EVALUATION_ORDER: [RuleCategory; CATEGORY_COUNT] = Self::ALL;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn action(self) -> RuleAction {
        match self {
            Self::MainAllow
            | Self::FinalAllow
            | Self::DomainAllow
            | Self::DomainInitialAllow
            | Self::DomainFinalAllow
            | Self::ThirdPartyAllow
            | Self::ThirdPartyDomainAllow
            | Self::ThirdPartyDomainInitialAllow => RuleAction::Allow,
            _ => RuleAction::Block,
        }
    }

    pub fn scope(self) -> Scope {
        match self {
            Self::MainAllow
            | Self::FinalAllow
            | Self::MainBlock
            | Self::InitialBlock
            | Self::FinalBlock
            | Self::RegexBlock => Scope::empty(),
            Self::DomainAllow
            | Self::DomainInitialAllow
            | Self::DomainFinalAllow
            | Self::DomainBlock
            | Self::DomainInitialBlock
            | Self::DomainFinalBlock
            | Self::DomainRegexBlock => Scope::DOMAIN,
            Self::ThirdPartyAllow
            | Self::ThirdPartyBlock
            | Self::ThirdPartyInitialBlock
            | Self::ThirdPartyRegexBlock => Scope::THIRD_PARTY,
            Self::ThirdPartyDomainAllow
            | Self::ThirdPartyDomainInitialAllow
            | Self::ThirdPartyDomainBlock
            | Self::ThirdPartyDomainInitialBlock
            | Self::ThirdPartyDomainRegexBlock => Scope::DOMAIN | Scope::THIRD_PARTY,
        }
    }

    pub fn anchor(self) -> Anchor {
        match self {
            Self::DomainInitialAllow
            | Self::ThirdPartyDomainInitialAllow
            | Self::InitialBlock
            | Self::DomainInitialBlock
            | Self::ThirdPartyInitialBlock
            | Self::ThirdPartyDomainInitialBlock => Anchor::INITIAL,
            Self::FinalAllow
            | Self::DomainFinalAllow
            | Self::FinalBlock
            | Self::DomainFinalBlock => Anchor::FINAL,
            _ => Anchor::empty(),
        }
    }

    /// Regex categories store a compiled expression instead of fragments.
    pub fn is_regex(self) -> bool {
        matches!(
            self,
            Self::DomainRegexBlock
                | Self::ThirdPartyRegexBlock
                | Self::ThirdPartyDomainRegexBlock
                | Self::RegexBlock
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::MainAllow => "MainAllow",
            Self::FinalAllow => "FinalAllow",
            Self::DomainAllow => "DomainAllow",
            Self::DomainInitialAllow => "DomainInitialAllow",
            Self::DomainFinalAllow => "DomainFinalAllow",
            Self::ThirdPartyAllow => "ThirdPartyAllow",
            Self::ThirdPartyDomainAllow => "ThirdPartyDomainAllow",
            Self::ThirdPartyDomainInitialAllow => "ThirdPartyDomainInitialAllow",
            Self::MainBlock => "MainBlock",
            Self::InitialBlock => "InitialBlock",
            Self::FinalBlock => "FinalBlock",
            Self::DomainBlock => "DomainBlock",
            Self::DomainInitialBlock => "DomainInitialBlock",
            Self::DomainFinalBlock => "DomainFinalBlock",
            Self::DomainRegexBlock => "DomainRegexBlock",
            Self::ThirdPartyBlock => "ThirdPartyBlock",
            Self::ThirdPartyInitialBlock => "ThirdPartyInitialBlock",
            Self::ThirdPartyDomainBlock => "ThirdPartyDomainBlock",
            Self::ThirdPartyDomainInitialBlock => "ThirdPartyDomainInitialBlock",
            Self::ThirdPartyRegexBlock => "ThirdPartyRegexBlock",
            Self::ThirdPartyDomainRegexBlock => "ThirdPartyDomainRegexBlock",
            Self::RegexBlock => "RegexBlock",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Request Descriptor
// =============================================================================

/// One intercepted sub-resource request.
#[derive(Debug, Clone, Copy)]
pub struct RequestDescriptor<'a> {
    /// Domain of the page issuing the request (None for about:blank and friends)
    pub current_domain: Option<&'a str>,
    /// Full request URL
    pub resource_url: &'a str,
    /// Does the request leave the page's origin?
    pub is_third_party: bool,
}

impl<'a> RequestDescriptor<'a> {
    pub fn new(current_domain: Option<&'a str>, resource_url: &'a str, is_third_party: bool) -> Self {
        Self {
            current_domain,
            resource_url,
            is_third_party,
        }
    }

    /// Whether a category's scope requirements are met by this request.
    #[inline]
    pub fn satisfies(&self, scope: Scope) -> bool {
        (!scope.contains(Scope::DOMAIN) || self.current_domain.is_some())
            && (!scope.contains(Scope::THIRD_PARTY) || self.is_third_party)
    }
}

// =============================================================================
// Verdict
// =============================================================================

/// Final disposition of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Disposition {
    /// No rule in any list matched
    #[default]
    Default,
    /// An exception rule matched
    Allowed,
    /// A block rule matched
    Blocked,
}

impl From<RuleAction> for Disposition {
    fn from(action: RuleAction) -> Self {
        match action {
            RuleAction::Allow => Self::Allowed,
            RuleAction::Block => Self::Blocked,
        }
    }
}

/// Provenance of a non-default verdict, for the request log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleMatch {
    pub category: RuleCategory,
    /// Matched fragments joined for display (domain first for domain-scoped rules)
    pub fragments: String,
    pub list_name: Arc<str>,
    pub original_text: Arc<str>,
}

/// Result of evaluating a request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Verdict {
    pub disposition: Disposition,
    /// Present whenever `disposition` is not `Default`
    pub matched: Option<RuleMatch>,
}

impl Verdict {
    pub fn is_default(&self) -> bool {
        self.disposition == Disposition::Default
    }

    pub fn is_blocked(&self) -> bool {
        self.disposition == Disposition::Blocked
    }

    pub fn is_allowed(&self) -> bool {
        self.disposition == Disposition::Allowed
    }

    pub fn category(&self) -> Option<RuleCategory> {
        self.matched.as_ref().map(|m| m.category)
    }
}

//! Netsift Core Library
//!
//! This crate provides the rule table and matching engine for the Netsift
//! content filter.
//!
//! # Architecture
//!
//! Filter lists are compiled (by `ns-compiler`) into an immutable
//! `CompiledFilterList`: 22 categories of rules, each category a distinct
//! matching strategy. The matcher walks the categories in a fixed precedence
//! order and the first matching rule decides. Tables are shared between request
//! threads behind `Arc` and replaced wholesale when a list is refreshed.
//!
//! # Modules
//!
//! - `types`: Rule categories, request descriptor, verdict
//! - `rule`: Single compiled rule (fragments or regex, optional domain)
//! - `list`: Immutable compiled table and its builder
//! - `matcher`: Per-request evaluation against one table
//! - `orchestrator`: Ordered set of tables with atomic replacement

pub mod types;
pub mod rule;
pub mod list;
pub mod matcher;
pub mod orchestrator;

// Re-export commonly used types
pub use list::{CategoryCounts, CompiledFilterList, FilterListBuilder};
pub use matcher::{evaluate, Matcher};
pub use orchestrator::{FilterSet, SharedFilterSet};
pub use rule::{Fragments, Rule, RulePattern, MAX_FRAGMENTS};
pub use types::{Anchor, Disposition, RequestDescriptor, RuleAction, RuleCategory, RuleMatch, Scope, Verdict};

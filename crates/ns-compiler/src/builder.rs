//! Table assembly
//!
//! Feeds classified lines into a `FilterListBuilder`, compiling regex bodies,
//! removing duplicates and reporting every line that produced no rule.

use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use ns_core::list::{CompiledFilterList, FilterListBuilder};
use ns_core::rule::Rule;

use crate::optimizer::{CompileStats, Deduper};
use crate::parser::{parse_line, DropReason, DroppedLine, HeaderField, ParsedLine, PatternBody};

/// Upper bound on the compiled size of a single rule's regex.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Streaming compiler for one filter list.
pub struct ListCompiler<F> {
    builder: FilterListBuilder,
    explicit_name: bool,
    deduper: Deduper,
    stats: CompileStats,
    on_drop: F,
}

impl ListCompiler<fn(DroppedLine<'_>)> {
    /// A compiler that discards drop diagnostics.
    pub fn new() -> Self {
        Self::with_diagnostics(|_| {})
    }
}

impl Default for ListCompiler<fn(DroppedLine<'_>)> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FnMut(DroppedLine<'_>)> ListCompiler<F> {
    pub fn with_diagnostics(on_drop: F) -> Self {
        Self {
            builder: FilterListBuilder::new(),
            explicit_name: false,
            deduper: Deduper::new(),
            stats: CompileStats::default(),
            on_drop,
        }
    }

    /// Name the list explicitly; a `! Title:` header no longer renames it.
    pub fn with_name(mut self, name: &str) -> Self {
        self.builder.set_name(name);
        self.explicit_name = true;
        self
    }

    /// Name used unless the list carries a `! Title:` header.
    pub fn with_fallback_name(mut self, name: &str) -> Self {
        self.builder.set_name(name);
        self.explicit_name = false;
        self
    }

    pub fn feed_line(&mut self, raw_line: &str) {
        self.stats.lines += 1;
        let line_number = self.stats.lines;

        let rules = match parse_line(raw_line) {
            Ok(ParsedLine::Header(field)) => {
                self.apply_header(field);
                return;
            }
            Ok(ParsedLine::Rules(rules)) => rules,
            Err(reason) => {
                self.drop_line(line_number, raw_line, reason);
                return;
            }
        };

        let original_text: Arc<str> = Arc::from(raw_line);
        let mut regex: Option<Regex> = None;
        let mut emitted = 0usize;
        let mut reason = DropReason::Duplicate;

        for parsed in rules {
            if !self.deduper.first_seen(&parsed) {
                self.stats.deduped += 1;
                continue;
            }

            let rule = match parsed.body {
                PatternBody::Fragments(fragments) => {
                    Rule::with_fragments(parsed.domain, fragments, original_text.clone())
                }
                PatternBody::Regex(body) => {
                    if regex.is_none() {
                        regex = compile_regex(&body);
                    }
                    match &regex {
                        Some(compiled) => Rule::with_regex(parsed.domain, compiled.clone(), original_text.clone()),
                        None => {
                            reason = DropReason::InvalidRegex;
                            self.stats.invalid_regex += 1;
                            break;
                        }
                    }
                }
            };

            self.builder.push(parsed.category, rule);
            self.stats.rules += 1;
            emitted += 1;
        }

        if emitted == 0 {
            self.drop_line(line_number, raw_line, reason);
        }
    }

    pub fn finish(self) -> (CompiledFilterList, CompileStats) {
        let list = self.builder.build();
        log::debug!(
            "Compiled list '{}' (version '{}'): {} lines, {} rules, {} dropped, {} duplicates",
            list.name(),
            list.version(),
            self.stats.lines,
            self.stats.rules,
            self.stats.dropped,
            self.stats.deduped,
        );
        (list, self.stats)
    }

    fn apply_header(&mut self, field: HeaderField) {
        match field {
            HeaderField::Title(title) => {
                if !self.explicit_name {
                    self.builder.set_name(&title);
                }
            }
            HeaderField::Version(version) => self.builder.set_version(&version),
        }
    }

    fn drop_line(&mut self, line_number: usize, text: &str, reason: DropReason) {
        self.stats.dropped += 1;
        log::trace!("Dropped line {} ({}): {}", line_number, reason, text);
        (self.on_drop)(DroppedLine {
            line_number,
            text,
            reason,
        });
    }
}

fn compile_regex(body: &str) -> Option<Regex> {
    match RegexBuilder::new(body).size_limit(REGEX_SIZE_LIMIT).build() {
        Ok(regex) => Some(regex),
        Err(e) => {
            log::trace!("Invalid regex '{}': {}", body, e);
            None
        }
    }
}

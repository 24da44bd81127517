//! Filter option parsing (`$third-party,domain=a.com|~b.com`).
//!
//! Only options that change which URLs a rule applies to are kept. Type
//! options and the like are accepted and ignored; options describing something
//! other than a request to filter cause the whole rule to be dropped.

use crate::parser::DropReason;

/// One entry of a `domain=` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainEntry {
    pub domain: String,
    /// `~domain`: the rule must not apply on this domain
    pub negated: bool,
}

/// Options relevant to URL matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub third_party: bool,
    pub domains: Vec<DomainEntry>,
}

impl FilterOptions {
    pub fn has_positive_domain(&self) -> bool {
        self.domains.iter().any(|entry| !entry.negated)
    }
}

/// Split a rule into pattern and options at the last `$`.
///
/// Inside a `/.../` regex literal (`/ads\.js$/`) the `$` is an end anchor,
/// not an options separator.
pub fn split_rule_options(line: &str) -> (&str, Option<&str>) {
    match line.rfind('$') {
        Some(pos) if line.starts_with('/') && line[pos + 1..].ends_with('/') => (line, None),
        Some(pos) => (&line[..pos], Some(&line[pos + 1..])),
        None => (line, None),
    }
}

pub fn parse_options(text: &str) -> Result<FilterOptions, DropReason> {
    let mut options = FilterOptions::default();

    for raw in text.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let raw_lower = raw.to_ascii_lowercase();
        let raw_lower = raw_lower.as_str();

        if let Some(value) = raw_lower.strip_prefix("domain=") {
            let entries = parse_domain_option(value).ok_or(DropReason::UnsupportedOption)?;
            options.domains.extend(entries);
            continue;
        }

        match raw_lower {
            "third-party" | "thirdparty" | "3p" => options.third_party = true,
            "~third-party" | "~thirdparty" | "~3p" | "first-party" | "firstparty" | "1p" => {
                return Err(DropReason::FirstPartyOnly);
            }
            name if is_non_request_option(name) => return Err(DropReason::UnsupportedOption),
            _ => {}
        }
    }

    Ok(options)
}

fn is_non_request_option(name: &str) -> bool {
    matches!(
        name,
        "badfilter"
            | "popup"
            | "elemhide"
            | "ehide"
            | "generichide"
            | "ghide"
            | "specifichide"
            | "shide"
            | "csp"
            | "removeparam"
    ) || name.starts_with("csp=")
        || name.starts_with("removeparam=")
        || name.starts_with("redirect-rule")
}

fn parse_domain_option(value: &str) -> Option<Vec<DomainEntry>> {
    let mut entries = Vec::new();

    for raw in value.split('|') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let (negated, domain_raw) = match raw.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        match normalize_domain(domain_raw) {
            Some(domain) => entries.push(DomainEntry { domain, negated }),
            None => log::trace!("Skipping unusable domain option entry '{}'", raw),
        }
    }

    if entries.is_empty() {
        return None;
    }

    Some(entries)
}

pub fn normalize_domain(host: &str) -> Option<String> {
    let trimmed = host.trim().trim_matches('.');
    if trimmed.is_empty() {
        return None;
    }

    if !trimmed
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-' || b == b'_')
    {
        return None;
    }

    Some(trimmed.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_at_last_dollar() {
        assert_eq!(split_rule_options("ads.js$third-party"), ("ads.js", Some("third-party")));
        assert_eq!(split_rule_options("a$b$domain=x.com"), ("a$b", Some("domain=x.com")));
        assert_eq!(split_rule_options("/tracker\\d+\\.js$/"), ("/tracker\\d+\\.js$/", None));
        assert_eq!(split_rule_options("/ads\\d$/$domain=a.com"), ("/ads\\d$/", Some("domain=a.com")));
        assert_eq!(split_rule_options("plain"), ("plain", None));
    }

    #[test]
    fn option_values_with_slashes_are_still_options() {
        assert_eq!(
            split_rule_options("x.com^$removeparam=/^utm_/"),
            ("x.com^", Some("removeparam=/^utm_/"))
        );
        assert_eq!(
            split_rule_options("x.com^$csp=connect-src https://x.com/"),
            ("x.com^", Some("csp=connect-src https://x.com/"))
        );
        assert_eq!(parse_options("removeparam=/^utm_/"), Err(DropReason::UnsupportedOption));
    }

    #[test]
    fn parses_third_party_and_domains() {
        let options = parse_options("script,third-party,domain=Foo.com|~bar.com").unwrap();
        assert!(options.third_party);
        assert_eq!(
            options.domains,
            vec![
                DomainEntry { domain: "foo.com".to_string(), negated: false },
                DomainEntry { domain: "bar.com".to_string(), negated: true },
            ]
        );
        assert!(options.has_positive_domain());
    }

    #[test]
    fn negated_third_party_drops_rule() {
        assert_eq!(parse_options("~third-party"), Err(DropReason::FirstPartyOnly));
        assert_eq!(parse_options("image,1p"), Err(DropReason::FirstPartyOnly));
    }

    #[test]
    fn non_request_options_drop_rule() {
        assert_eq!(parse_options("badfilter"), Err(DropReason::UnsupportedOption));
        assert_eq!(parse_options("csp=default-src 'self'"), Err(DropReason::UnsupportedOption));
        assert_eq!(parse_options("removeparam=utm_source"), Err(DropReason::UnsupportedOption));
        assert_eq!(parse_options("elemhide"), Err(DropReason::UnsupportedOption));
    }

    #[test]
    fn type_options_are_ignored() {
        let options = parse_options("script,image,important,match-case").unwrap();
        assert_eq!(options, FilterOptions::default());
    }

    #[test]
    fn empty_domain_list_drops_rule() {
        assert_eq!(parse_options("domain=|"), Err(DropReason::UnsupportedOption));
        assert_eq!(parse_options("domain=~*.x"), Err(DropReason::UnsupportedOption));
    }

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain(".Example.COM."), Some("example.com".to_string()));
        assert_eq!(normalize_domain("exa mple.com"), None);
        assert_eq!(normalize_domain(""), None);
    }
}

//! URL selector compilation and matching.
//!
//! A request pattern names at most one of four URL selectors. When compiled,
//! the selectors are checked in a fixed priority (exact, regex, path regex,
//! path prefix) so evaluation order is defined even for hand-built values.

use super::request_pattern::RequestPattern;
use super::value_pattern::full_match_regex;
use crate::error::PatternError;
use regex::Regex;
use std::sync::Arc;

/// Compiled URL selector.
#[derive(Debug, Clone)]
pub enum CompiledUrlMatcher {
    /// No selector declared: every URL matches
    Any,
    /// `url`: exact string equality
    Equals(String),
    /// `urlPattern`: regex over the whole URL
    Regex(Arc<Regex>),
    /// `urlPathPattern`: regex followed by `.*`, over the whole URL
    PathRegex(Arc<Regex>),
    /// `urlPath`: raw string prefix (not path-segment aware)
    PathPrefix(String),
}

impl CompiledUrlMatcher {
    pub fn compile(pattern: &RequestPattern) -> Result<Self, PatternError> {
        if let Some(url) = pattern.url() {
            return Ok(CompiledUrlMatcher::Equals(url.to_string()));
        }
        if let Some(url_pattern) = pattern.url_pattern() {
            return Ok(CompiledUrlMatcher::Regex(Arc::new(full_match_regex(
                url_pattern,
                "urlPattern",
            )?)));
        }
        if let Some(url_path_pattern) = pattern.url_path_pattern() {
            let regex = full_match_regex(&format!("{url_path_pattern}.*"), "urlPathPattern")?;
            return Ok(CompiledUrlMatcher::PathRegex(Arc::new(regex)));
        }
        if let Some(url_path) = pattern.url_path() {
            return Ok(CompiledUrlMatcher::PathPrefix(url_path.to_string()));
        }
        Ok(CompiledUrlMatcher::Any)
    }

    pub fn matches(&self, url: &str) -> bool {
        match self {
            CompiledUrlMatcher::Any => true,
            CompiledUrlMatcher::Equals(expected) => url == expected,
            CompiledUrlMatcher::Regex(regex) | CompiledUrlMatcher::PathRegex(regex) => {
                regex.is_match(url)
            }
            CompiledUrlMatcher::PathPrefix(prefix) => url.starts_with(prefix.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestMethod;

    fn compile_with(set: impl FnOnce(&mut RequestPattern)) -> CompiledUrlMatcher {
        let mut pattern = RequestPattern::new(RequestMethod::Any);
        set(&mut pattern);
        CompiledUrlMatcher::compile(&pattern).unwrap()
    }

    #[test]
    fn test_url_equal_is_exact() {
        let matcher = compile_with(|p| p.set_url("/a").unwrap());

        assert!(matcher.matches("/a"));
        assert!(!matcher.matches("/a/"));
        assert!(!matcher.matches("/a?x=1"));
        assert!(!matcher.matches("/ab"));
    }

    #[test]
    fn test_url_pattern_is_full_match() {
        let matcher = compile_with(|p| p.set_url_pattern(r"/orders/\d+").unwrap());

        assert!(matcher.matches("/orders/42"));
        assert!(!matcher.matches("/orders/42/items"));
        assert!(!matcher.matches("/api/orders/42"));
    }

    #[test]
    fn test_url_path_pattern_allows_suffix() {
        let matcher = compile_with(|p| p.set_url_path_pattern(r"/orders/\d+").unwrap());

        assert!(matcher.matches("/orders/42"));
        assert!(matcher.matches("/orders/42/items?page=2"));
        assert!(!matcher.matches("/api/orders/42"));
    }

    #[test]
    fn test_url_path_pattern_alternation_keeps_grouping() {
        let matcher = compile_with(|p| p.set_url_path_pattern("/a|/b").unwrap());

        assert!(matcher.matches("/a"));
        assert!(matcher.matches("/b/anything"));
        assert!(!matcher.matches("/a/anything"));
    }

    #[test]
    fn test_url_path_is_raw_prefix() {
        let matcher = compile_with(|p| p.set_url_path("/a").unwrap());

        assert!(matcher.matches("/a"));
        assert!(matcher.matches("/a/b"));
        // String prefix, not path-segment prefix
        assert!(matcher.matches("/ax"));
        assert!(!matcher.matches("/b/a"));
    }

    #[test]
    fn test_no_selector_matches_everything() {
        let matcher = compile_with(|_| {});
        assert!(matcher.matches("/"));
        assert!(matcher.matches("/anything/at/all?q=1"));
    }

    #[test]
    fn test_invalid_url_regex() {
        let mut pattern = RequestPattern::new(RequestMethod::Get);
        pattern.set_url_pattern("/orders/(").unwrap();
        assert!(matches!(
            CompiledUrlMatcher::compile(&pattern),
            Err(PatternError::InvalidRegex {
                field: "urlPattern",
                ..
            })
        ));
    }
}

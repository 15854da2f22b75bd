//! Request patterns: the declarative description of requests a stub answers.
//!
//! A [`RequestPattern`] is the JSON-facing configuration value. It is compiled
//! against a [`MatchContext`] into a [`CompiledRequestPattern`], which is what
//! the server evaluates for every inbound request.
//!
//! ```json
//! {
//!   "method": "POST",
//!   "urlPath": "/ws/orders",
//!   "headers": {"Content-Type": {"contains": "xml"}},
//!   "bodyPatterns": [{"equalTo": "<op><arg0><id>7</id></arg0></op>"}]
//! }
//! ```

use super::body_matcher::{CompiledBodyMatcher, MalformedBodyPolicy};
use super::field_matcher::{all_specify_absent, required_absent_names, CompiledFieldPattern};
use super::url_matcher::CompiledUrlMatcher;
use super::value_pattern::ValuePattern;
use crate::error::PatternError;
use crate::exclusion::ExclusionRules;
use crate::request::{RequestMethod, RequestView};
use crate::xml::BodyNormalizer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Declarative request pattern.
///
/// At most one URL selector (`url`, `urlPattern`, `urlPath`,
/// `urlPathPattern`) may be set. Every setter enforces this and leaves the
/// pattern untouched when it fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RequestPatternDef")]
pub struct RequestPattern {
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url_path_pattern: Option<String>,
    method: RequestMethod,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, ValuePattern>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    query_parameters: BTreeMap<String, ValuePattern>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    body_patterns: Vec<ValuePattern>,
}

/// Unvalidated wire form of [`RequestPattern`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestPatternDef {
    url: Option<String>,
    url_pattern: Option<String>,
    url_path: Option<String>,
    url_path_pattern: Option<String>,
    method: RequestMethod,
    #[serde(default)]
    headers: BTreeMap<String, ValuePattern>,
    #[serde(default)]
    query_parameters: BTreeMap<String, ValuePattern>,
    #[serde(default)]
    body_patterns: Vec<ValuePattern>,
}

impl TryFrom<RequestPatternDef> for RequestPattern {
    type Error = PatternError;

    fn try_from(def: RequestPatternDef) -> Result<Self, Self::Error> {
        let pattern = RequestPattern {
            url: def.url,
            url_pattern: def.url_pattern,
            url_path: def.url_path,
            url_path_pattern: def.url_path_pattern,
            method: def.method,
            headers: def.headers,
            query_parameters: def.query_parameters,
            body_patterns: def.body_patterns,
        };
        pattern.assert_is_in_valid_state()?;
        Ok(pattern)
    }
}

#[derive(Debug, Clone, Copy)]
enum UrlSelector {
    Url,
    UrlPattern,
    UrlPath,
    UrlPathPattern,
}

impl RequestPattern {
    /// A pattern with no URL selector and no criteria beyond `method`.
    pub fn new(method: RequestMethod) -> Self {
        RequestPattern {
            url: None,
            url_pattern: None,
            url_path: None,
            url_path_pattern: None,
            method,
            headers: BTreeMap::new(),
            query_parameters: BTreeMap::new(),
            body_patterns: Vec::new(),
        }
    }

    /// A pattern matching `url` exactly.
    pub fn for_url(method: RequestMethod, url: impl Into<String>) -> Self {
        RequestPattern {
            url: Some(url.into()),
            ..Self::new(method)
        }
    }

    /// Matches any request: method `ANY`, `urlPattern` `.*`.
    pub fn everything() -> Self {
        RequestPattern {
            url_pattern: Some(".*".to_string()),
            ..Self::new(RequestMethod::Any)
        }
    }

    pub fn from_json(json: &str) -> Result<Self, PatternError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, PatternError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn url_pattern(&self) -> Option<&str> {
        self.url_pattern.as_deref()
    }

    pub fn url_path(&self) -> Option<&str> {
        self.url_path.as_deref()
    }

    pub fn url_path_pattern(&self) -> Option<&str> {
        self.url_path_pattern.as_deref()
    }

    pub fn method(&self) -> RequestMethod {
        self.method
    }

    pub fn headers(&self) -> &BTreeMap<String, ValuePattern> {
        &self.headers
    }

    pub fn query_parameters(&self) -> &BTreeMap<String, ValuePattern> {
        &self.query_parameters
    }

    pub fn body_patterns(&self) -> &[ValuePattern] {
        &self.body_patterns
    }

    pub fn set_url(&mut self, url: impl Into<String>) -> Result<(), PatternError> {
        self.set_selector(UrlSelector::Url, url.into())
    }

    pub fn set_url_pattern(&mut self, url_pattern: impl Into<String>) -> Result<(), PatternError> {
        self.set_selector(UrlSelector::UrlPattern, url_pattern.into())
    }

    pub fn set_url_path(&mut self, url_path: impl Into<String>) -> Result<(), PatternError> {
        self.set_selector(UrlSelector::UrlPath, url_path.into())
    }

    pub fn set_url_path_pattern(
        &mut self,
        url_path_pattern: impl Into<String>,
    ) -> Result<(), PatternError> {
        self.set_selector(UrlSelector::UrlPathPattern, url_path_pattern.into())
    }

    pub fn set_method(&mut self, method: RequestMethod) {
        self.method = method;
    }

    pub fn set_headers(&mut self, headers: BTreeMap<String, ValuePattern>) {
        self.headers = headers;
    }

    pub fn add_header(&mut self, key: impl Into<String>, pattern: ValuePattern) {
        self.headers.insert(key.into(), pattern);
    }

    pub fn set_query_parameters(&mut self, query_parameters: BTreeMap<String, ValuePattern>) {
        self.query_parameters = query_parameters;
    }

    pub fn add_query_param(&mut self, key: impl Into<String>, pattern: ValuePattern) {
        self.query_parameters.insert(key.into(), pattern);
    }

    pub fn set_body_patterns(&mut self, body_patterns: Vec<ValuePattern>) {
        self.body_patterns = body_patterns;
    }

    pub fn with_header(mut self, key: impl Into<String>, pattern: ValuePattern) -> Self {
        self.add_header(key, pattern);
        self
    }

    pub fn with_query_param(mut self, key: impl Into<String>, pattern: ValuePattern) -> Self {
        self.add_query_param(key, pattern);
        self
    }

    pub fn with_body(mut self, pattern: ValuePattern) -> Self {
        self.body_patterns.push(pattern);
        self
    }

    /// Compile against `context`.
    pub fn compile(&self, context: &MatchContext) -> Result<CompiledRequestPattern, PatternError> {
        CompiledRequestPattern::compile(self, context)
    }

    fn selector_mut(&mut self, selector: UrlSelector) -> &mut Option<String> {
        match selector {
            UrlSelector::Url => &mut self.url,
            UrlSelector::UrlPattern => &mut self.url_pattern,
            UrlSelector::UrlPath => &mut self.url_path,
            UrlSelector::UrlPathPattern => &mut self.url_path_pattern,
        }
    }

    fn set_selector(&mut self, selector: UrlSelector, value: String) -> Result<(), PatternError> {
        let previous = self.selector_mut(selector).replace(value);
        if let Err(e) = self.assert_is_in_valid_state() {
            *self.selector_mut(selector) = previous;
            return Err(e);
        }
        Ok(())
    }

    fn assert_is_in_valid_state(&self) -> Result<(), PatternError> {
        let selectors = [
            &self.url,
            &self.url_pattern,
            &self.url_path,
            &self.url_path_pattern,
        ];
        if selectors.iter().filter(|s| s.is_some()).count() > 1 {
            return Err(PatternError::MultipleUrlSelectors);
        }
        Ok(())
    }
}

impl fmt::Display for RequestPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = self.to_json().map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Shared inputs for compiling request patterns.
///
/// One context is built at startup and reused for every pattern, so all
/// patterns see the same exclusion rules.
#[derive(Debug, Clone, Default)]
pub struct MatchContext {
    exclusions: Arc<ExclusionRules>,
    malformed_body: MalformedBodyPolicy,
}

impl MatchContext {
    pub fn new(exclusions: Arc<ExclusionRules>) -> Self {
        MatchContext {
            exclusions,
            malformed_body: MalformedBodyPolicy::default(),
        }
    }

    pub fn with_malformed_body_policy(mut self, policy: MalformedBodyPolicy) -> Self {
        self.malformed_body = policy;
        self
    }

    pub fn exclusions(&self) -> &Arc<ExclusionRules> {
        &self.exclusions
    }

    pub fn malformed_body_policy(&self) -> MalformedBodyPolicy {
        self.malformed_body
    }

    pub fn normalizer(&self) -> BodyNormalizer {
        BodyNormalizer::new(Arc::clone(&self.exclusions))
    }
}

/// Compiled request pattern for efficient runtime evaluation.
///
/// Immutable once built; safe to share across threads.
#[derive(Debug, Clone)]
pub struct CompiledRequestPattern {
    url: CompiledUrlMatcher,
    method: RequestMethod,
    headers: Vec<CompiledFieldPattern>,
    query_parameters: Vec<CompiledFieldPattern>,
    body: Option<CompiledBodyMatcher>,
}

impl CompiledRequestPattern {
    pub fn compile(pattern: &RequestPattern, context: &MatchContext) -> Result<Self, PatternError> {
        pattern.assert_is_in_valid_state()?;

        Ok(CompiledRequestPattern {
            url: CompiledUrlMatcher::compile(pattern)?,
            method: pattern.method,
            headers: CompiledFieldPattern::compile_all(&pattern.headers)?,
            query_parameters: CompiledFieldPattern::compile_all(&pattern.query_parameters)?,
            body: CompiledBodyMatcher::compile(
                &pattern.body_patterns,
                context.normalizer(),
                context.malformed_body_policy(),
            )?,
        })
    }

    /// Evaluate every criterion in order, stopping at the first that fails:
    /// URL, method, headers required absent, header patterns, query
    /// parameters, body.
    pub fn is_matched_by<R: RequestView + ?Sized>(&self, request: &R) -> bool {
        self.url_is_match(request)
            && self.method_matches(request)
            && self.required_absent_headers_are_not_present_in(request)
            && self.headers_match(request)
            && self.query_parameters_match(request)
            && self.body_matches(request)
    }

    fn url_is_match<R: RequestView + ?Sized>(&self, request: &R) -> bool {
        self.url.matches(request.url())
    }

    fn method_matches<R: RequestView + ?Sized>(&self, request: &R) -> bool {
        let matched = self.method == RequestMethod::Any || self.method == request.method();
        if !matched {
            info!(
                "URL {} is match, but method {} is not (expected {})",
                request.url(),
                request.method(),
                self.method
            );
        }
        matched
    }

    fn required_absent_headers_are_not_present_in<R: RequestView + ?Sized>(
        &self,
        request: &R,
    ) -> bool {
        required_absent_names(&self.headers).all(|name| !request.contains_header(name))
    }

    fn headers_match<R: RequestView + ?Sized>(&self, request: &R) -> bool {
        if all_specify_absent(&self.headers) {
            return true;
        }

        self.headers.iter().all(|pattern| {
            let matched = pattern.matches(request.header(&pattern.name).as_ref());
            if !matched {
                info!(
                    "URL {} is match, but header {} is not. For a match, value should {}",
                    request.url(),
                    pattern.name,
                    pattern.expectation
                );
            }
            matched
        })
    }

    /// A declared query parameter must be present on the request, even when
    /// its pattern is `absent`.
    fn query_parameters_match<R: RequestView + ?Sized>(&self, request: &R) -> bool {
        self.query_parameters.iter().all(|pattern| {
            let matched = request
                .query_parameter(&pattern.name)
                .is_some_and(|param| param.has_value_matching(&pattern.matcher));
            if !matched {
                info!(
                    "URL {} is match, but query parameter {} is not. For a match, value should {}",
                    request.url(),
                    pattern.name,
                    pattern.expectation
                );
            }
            matched
        })
    }

    fn body_matches<R: RequestView + ?Sized>(&self, request: &R) -> bool {
        match &self.body {
            None => true,
            Some(body) => body.matches(request.url(), &request.body_as_string()),
        }
    }
}

//! Value patterns: single comparison rules applied to one string value.
//!
//! A [`ValuePattern`] is the serializable configuration form; it is compiled
//! once into a [`CompiledValuePattern`] holding pre-built regexes and parsed
//! JSON so evaluation never allocates a matcher per request.

use crate::error::PatternError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Comparison rule for a header, query parameter or body value.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum ValuePattern {
    /// Exact string equality
    #[serde(rename = "equalTo")]
    EqualTo(String),

    /// Value contains substring
    #[serde(rename = "contains")]
    Contains(String),

    /// Whole value matches regex
    #[serde(rename = "matches")]
    Matches(String),

    /// Whole value does not match regex
    #[serde(rename = "doesNotMatch")]
    DoesNotMatch(String),

    /// `true`: value must be absent. `false`: value must be present.
    #[serde(rename = "absent")]
    Absent(bool),

    /// Semantic JSON equality (key order and whitespace ignored)
    #[serde(rename = "equalToJson")]
    EqualToJson(String),

    /// XPath expression selects at least one node
    #[serde(rename = "matchesXPath")]
    MatchesXPath(String),
}

impl ValuePattern {
    pub fn equal_to(value: impl Into<String>) -> Self {
        ValuePattern::EqualTo(value.into())
    }

    pub fn containing(value: impl Into<String>) -> Self {
        ValuePattern::Contains(value.into())
    }

    pub fn matching(regex: impl Into<String>) -> Self {
        ValuePattern::Matches(regex.into())
    }

    pub fn not_matching(regex: impl Into<String>) -> Self {
        ValuePattern::DoesNotMatch(regex.into())
    }

    pub fn absent() -> Self {
        ValuePattern::Absent(true)
    }

    pub fn equal_to_json(json: impl Into<String>) -> Self {
        ValuePattern::EqualToJson(json.into())
    }

    pub fn matches_xpath(expression: impl Into<String>) -> Self {
        ValuePattern::MatchesXPath(expression.into())
    }

    /// Whether this pattern requires the value to be absent.
    pub fn is_absent(&self) -> bool {
        matches!(self, ValuePattern::Absent(true))
    }

    /// Absence check that tolerates a missing pattern.
    pub fn null_safe_is_absent(pattern: Option<&ValuePattern>) -> bool {
        pattern.is_some_and(ValuePattern::is_absent)
    }

    /// The operand of an `equalTo` pattern, if this is one.
    pub fn equal_to_operand(&self) -> Option<&str> {
        match self {
            ValuePattern::EqualTo(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ValuePattern {
    /// Human-readable expectation, phrased to follow "value should ...".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValuePattern::EqualTo(v) => write!(f, "equal {v}"),
            ValuePattern::Contains(v) => write!(f, "contain {v}"),
            ValuePattern::Matches(v) => write!(f, "match {v}"),
            ValuePattern::DoesNotMatch(v) => write!(f, "not match {v}"),
            ValuePattern::Absent(true) => f.write_str("be absent"),
            ValuePattern::Absent(false) => f.write_str("be present"),
            ValuePattern::EqualToJson(v) => write!(f, "equal JSON {v}"),
            ValuePattern::MatchesXPath(v) => write!(f, "match XPath {v}"),
        }
    }
}

/// Compiled value pattern for efficient runtime evaluation.
#[derive(Debug, Clone)]
pub enum CompiledValuePattern {
    EqualTo(String),
    Contains(String),
    Matches(Arc<Regex>),
    DoesNotMatch(Arc<Regex>),
    Absent(bool),
    EqualToJson(serde_json::Value),
    /// Expression text; validated at compile time, evaluated per document.
    MatchesXPath(String),
}

impl CompiledValuePattern {
    /// Compile a ValuePattern into its runtime form.
    pub fn compile(pattern: &ValuePattern) -> Result<Self, PatternError> {
        match pattern {
            ValuePattern::EqualTo(v) => Ok(CompiledValuePattern::EqualTo(v.clone())),
            ValuePattern::Contains(v) => Ok(CompiledValuePattern::Contains(v.clone())),
            ValuePattern::Matches(p) => Ok(CompiledValuePattern::Matches(Arc::new(
                full_match_regex(p, "matches")?,
            ))),
            ValuePattern::DoesNotMatch(p) => Ok(CompiledValuePattern::DoesNotMatch(Arc::new(
                full_match_regex(p, "doesNotMatch")?,
            ))),
            ValuePattern::Absent(absent) => Ok(CompiledValuePattern::Absent(*absent)),
            ValuePattern::EqualToJson(json) => {
                Ok(CompiledValuePattern::EqualToJson(serde_json::from_str(json)?))
            }
            ValuePattern::MatchesXPath(expression) => {
                validate_xpath(expression)?;
                Ok(CompiledValuePattern::MatchesXPath(expression.clone()))
            }
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, CompiledValuePattern::Absent(true))
    }

    /// Check a value against this pattern.
    ///
    /// `None` means the field does not exist; only `Absent` patterns can
    /// match it.
    pub fn matches(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (CompiledValuePattern::Absent(should_be_absent), v) => *should_be_absent == v.is_none(),

            (_, None) => false,

            (CompiledValuePattern::EqualTo(expected), Some(v)) => v == expected,
            (CompiledValuePattern::Contains(needle), Some(v)) => v.contains(needle.as_str()),
            (CompiledValuePattern::Matches(regex), Some(v)) => regex.is_match(v),
            (CompiledValuePattern::DoesNotMatch(regex), Some(v)) => !regex.is_match(v),
            (CompiledValuePattern::EqualToJson(expected), Some(v)) => {
                serde_json::from_str::<serde_json::Value>(v).is_ok_and(|actual| actual == *expected)
            }
            (CompiledValuePattern::MatchesXPath(expression), Some(v)) => {
                xpath_selects_anything(v, expression)
            }
        }
    }
}

/// Compile `pattern` anchored at both ends, so it must match the whole input.
pub(crate) fn full_match_regex(pattern: &str, field: &'static str) -> Result<Regex, PatternError> {
    Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|source| PatternError::InvalidRegex { field, source })
}

fn validate_xpath(expression: &str) -> Result<(), PatternError> {
    match sxd_xpath::Factory::new().build(expression) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(PatternError::InvalidXPath {
            expression: expression.to_string(),
            message: "empty expression".to_string(),
        }),
        Err(e) => Err(PatternError::InvalidXPath {
            expression: expression.to_string(),
            message: format!("{e:?}"),
        }),
    }
}

fn xpath_selects_anything(body: &str, expression: &str) -> bool {
    use sxd_xpath::{evaluate_xpath, Value};

    let Ok(package) = sxd_document::parser::parse(body) else {
        return false;
    };
    let document = package.as_document();

    match evaluate_xpath(&document, expression) {
        Ok(Value::Nodeset(nodes)) => nodes.size() > 0,
        Ok(Value::Boolean(b)) => b,
        Ok(Value::String(s)) => !s.is_empty(),
        Ok(Value::Number(n)) => !n.is_nan(),
        Err(_) => false,
    }
}

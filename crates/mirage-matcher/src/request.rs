//! Read-only view of an inbound HTTP request, as consumed by the matcher.
//!
//! The transport layer owns the real request; the matching engine only sees it
//! through [`RequestView`]. [`LoggedRequest`] is an owned implementation used
//! for recorded traffic, the CLI and tests.

use crate::error::PatternError;
use crate::predicate::CompiledValuePattern;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// HTTP request method, plus the `ANY` wildcard used by patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
    Trace,
    Any,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
            RequestMethod::Put => "PUT",
            RequestMethod::Delete => "DELETE",
            RequestMethod::Patch => "PATCH",
            RequestMethod::Options => "OPTIONS",
            RequestMethod::Head => "HEAD",
            RequestMethod::Trace => "TRACE",
            RequestMethod::Any => "ANY",
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestMethod {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(RequestMethod::Get),
            "POST" => Ok(RequestMethod::Post),
            "PUT" => Ok(RequestMethod::Put),
            "DELETE" => Ok(RequestMethod::Delete),
            "PATCH" => Ok(RequestMethod::Patch),
            "OPTIONS" => Ok(RequestMethod::Options),
            "HEAD" => Ok(RequestMethod::Head),
            "TRACE" => Ok(RequestMethod::Trace),
            "ANY" => Ok(RequestMethod::Any),
            _ => Err(PatternError::UnknownMethod(s.to_string())),
        }
    }
}

/// A named request field that may carry several values (header or query parameter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiValue {
    key: String,
    values: Vec<String>,
}

impl MultiValue {
    pub fn new(key: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            key: key.into(),
            values,
        }
    }

    /// A field that was looked up but is not present on the request.
    pub fn absent(key: impl Into<String>) -> Self {
        Self::new(key, Vec::new())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn first_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    pub fn is_present(&self) -> bool {
        !self.values.is_empty()
    }

    /// True if any value satisfies the pattern, or the field is missing and
    /// the pattern requires absence.
    pub fn has_value_matching(&self, pattern: &CompiledValuePattern) -> bool {
        if !self.is_present() {
            return pattern.matches(None);
        }
        self.values.iter().any(|v| pattern.matches(Some(v)))
    }
}

pub type HttpHeader = MultiValue;
pub type QueryParameter = MultiValue;

/// Immutable view of a request handed to the matcher.
///
/// Implementations must be cheap to query repeatedly; the matcher may look up
/// the same header more than once.
pub trait RequestView {
    /// Request URL as received (path plus optional query string).
    fn url(&self) -> &str;

    fn method(&self) -> RequestMethod;

    /// Header names exactly as sent.
    fn header_keys(&self) -> Vec<&str>;

    /// Case-insensitive header lookup.
    fn header(&self, key: &str) -> Option<HttpHeader>;

    fn query_parameter(&self, key: &str) -> Option<QueryParameter>;

    fn body_as_string(&self) -> Cow<'_, str>;

    /// Whether a header with this name is present, ignoring case.
    fn contains_header(&self, key: &str) -> bool {
        self.header_keys()
            .iter()
            .any(|k| k.eq_ignore_ascii_case(key))
    }
}

/// An owned request, e.g. loaded from a recorded-traffic JSON file.
///
/// ```json
/// {"url": "/orders?id=7", "method": "POST",
///  "headers": {"Content-Type": "text/xml", "Accept": ["a", "b"]},
///  "body": "<arg0/>"}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedRequest {
    pub url: String,
    #[serde(default)]
    pub method: RequestMethod,
    #[serde(default, deserialize_with = "one_or_many_values")]
    pub headers: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub body: String,
}

impl LoggedRequest {
    pub fn new(method: RequestMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: BTreeMap::new(),
            body: String::new(),
        }
    }

    /// Append a header value (repeated calls build a multi-valued header).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .entry(key.into())
            .or_default()
            .push(value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl RequestView for LoggedRequest {
    fn url(&self) -> &str {
        &self.url
    }

    fn method(&self) -> RequestMethod {
        self.method
    }

    fn header_keys(&self) -> Vec<&str> {
        self.headers.keys().map(String::as_str).collect()
    }

    fn header(&self, key: &str) -> Option<HttpHeader> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(k, values)| MultiValue::new(k.clone(), values.clone()))
    }

    fn query_parameter(&self, key: &str) -> Option<QueryParameter> {
        let values = parse_query_values(&self.url, key);
        if values.is_empty() {
            None
        } else {
            Some(MultiValue::new(key, values))
        }
    }

    fn body_as_string(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.body)
    }
}

/// Collect every (URL-decoded) value of `key` from the query string of `url`.
pub fn parse_query_values(url: &str, key: &str) -> Vec<String> {
    let Some((_, query)) = url.split_once('?') else {
        return Vec::new();
    };
    let query = query.split_once('#').map_or(query, |(q, _)| q);

    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let name = urlencoding::decode(name).unwrap_or(Cow::Borrowed(name));
            (name == key).then(|| urlencoding::decode(value).unwrap_or_default().into_owned())
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many_values<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, OneOrMany> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(k, v)| match v {
            OneOrMany::One(s) => (k, vec![s]),
            OneOrMany::Many(list) => (k, list),
        })
        .collect())
}

//! Error types for pattern configuration, body normalization and exclusion loading.

use std::path::PathBuf;

/// Errors raised while building or compiling a request pattern.
///
/// These are configuration-time failures. Matching itself never returns an
/// error: a request either matches or it does not.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("Only one of url, urlPattern, urlPath or urlPathPattern may be set")]
    MultipleUrlSelectors,
    #[error("Invalid regex in {field}: {source}")]
    InvalidRegex {
        field: &'static str,
        #[source]
        source: regex::Error,
    },
    #[error("Invalid XPath expression {expression:?}: {message}")]
    InvalidXPath { expression: String, message: String },
    #[error("Unknown request method: {0}")]
    UnknownMethod(String),
    #[error("Invalid request pattern JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while normalizing a structured (XML) body.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Body is not well-formed XML: {0}")]
    Parse(String),
    #[error("Found <{node}> to exclude but the document has no <{container}> element")]
    MissingContainer {
        container: &'static str,
        node: String,
    },
    #[error("Found <{node}> to exclude outside of <{container}>")]
    NotUnderContainer {
        container: &'static str,
        node: String,
    },
    #[error("Failed to serialize normalized body: {0}")]
    Serialize(#[from] std::io::Error),
    #[error("Normalized body is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Errors raised while reading exclusion rule files.
///
/// Loading never aborts on these; they are logged and the offending file is
/// skipped.
#[derive(Debug, thiserror::Error)]
pub enum ExclusionError {
    #[error("Can't read exclude file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Can't parse exclude file {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Can't create dir {path:?}: {source}")]
    Bootstrap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while loading a [`MatcherConfig`](crate::config::MatcherConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path:?}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

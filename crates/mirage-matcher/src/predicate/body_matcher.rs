//! Body criterion: XML-normalized comparison of the request body.
//!
//! Only the first declared body pattern is consulted. Its `equalTo` operand is
//! treated as an XML document; both it and the request body are normalized
//! with the same [`BodyNormalizer`] and compared as strings. Later body
//! patterns are kept in the configuration but not evaluated.
//!
//! The expected document is normalized once, at compile time. The declared
//! patterns are never rewritten.

use super::value_pattern::{CompiledValuePattern, ValuePattern};
use crate::error::{NormalizeError, PatternError};
use crate::xml::{pretty_xml, BodyNormalizer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// What to do when a body cannot be normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MalformedBodyPolicy {
    /// Compare the raw request body against the first declared pattern.
    #[default]
    RawComparison,
    /// Treat the body as not matching.
    Reject,
}

#[derive(Debug, Clone)]
enum ExpectedBody {
    /// The first body pattern has no `equalTo` operand.
    NoOperand,
    Normalized(String),
    Malformed(Arc<NormalizeError>),
}

/// Compiled body criterion.
#[derive(Debug, Clone)]
pub struct CompiledBodyMatcher {
    expected: ExpectedBody,
    /// First declared pattern, used for raw comparison.
    raw: CompiledValuePattern,
    normalizer: BodyNormalizer,
    policy: MalformedBodyPolicy,
}

impl CompiledBodyMatcher {
    /// Compile the declared body patterns. Returns `None` when there are none,
    /// in which case any body matches.
    pub fn compile(
        patterns: &[ValuePattern],
        normalizer: BodyNormalizer,
        policy: MalformedBodyPolicy,
    ) -> Result<Option<Self>, PatternError> {
        let Some(first) = patterns.first() else {
            return Ok(None);
        };

        let raw = CompiledValuePattern::compile(first)?;
        for pattern in &patterns[1..] {
            CompiledValuePattern::compile(pattern)?;
        }

        let expected = match first.equal_to_operand() {
            None => ExpectedBody::NoOperand,
            Some(operand) => match normalizer.normalize(operand) {
                Ok(normalized) => ExpectedBody::Normalized(normalized),
                Err(e) => {
                    warn!("Declared body could not be normalized: {e}");
                    ExpectedBody::Malformed(Arc::new(e))
                }
            },
        };

        Ok(Some(Self {
            expected,
            raw,
            normalizer,
            policy,
        }))
    }

    pub fn policy(&self) -> MalformedBodyPolicy {
        self.policy
    }

    /// Check `body`. `url` is only used in diagnostics.
    pub fn matches(&self, url: &str, body: &str) -> bool {
        let Some(matched) = self.evaluate(url, body) else {
            return false;
        };

        if !matched {
            warn!(
                "URL [{}] is match, but body is not:\n {}",
                url,
                pretty_xml(body)
            );
        }
        matched
    }

    /// `None` when the pattern cannot be evaluated against a normalized body.
    fn evaluate(&self, url: &str, body: &str) -> Option<bool> {
        let normalized = match self.normalizer.normalize(body) {
            Ok(normalized) => normalized,
            Err(e) => return Some(self.on_malformed(url, body, &e)),
        };

        match &self.expected {
            ExpectedBody::NoOperand => {
                debug!("URL [{url}] first body pattern has no equalTo operand");
                None
            }
            ExpectedBody::Malformed(e) => Some(self.on_malformed(url, body, e)),
            ExpectedBody::Normalized(expected) => Some(normalized == *expected),
        }
    }

    fn on_malformed(&self, url: &str, body: &str, error: &NormalizeError) -> bool {
        match self.policy {
            MalformedBodyPolicy::RawComparison => {
                warn!("URL [{url}] body could not be normalized, comparing raw: {error}");
                self.raw.matches(Some(body))
            }
            MalformedBodyPolicy::Reject => {
                warn!("URL [{url}] body could not be normalized, rejecting: {error}");
                false
            }
        }
    }
}

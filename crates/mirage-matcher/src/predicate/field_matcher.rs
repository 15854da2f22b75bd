//! Named field patterns shared by header and query parameter matching.

use super::value_pattern::{CompiledValuePattern, ValuePattern};
use crate::error::PatternError;
use crate::request::MultiValue;
use std::collections::BTreeMap;

/// A compiled pattern bound to a header or query parameter name.
#[derive(Debug, Clone)]
pub struct CompiledFieldPattern {
    /// Field name as declared
    pub name: String,
    /// Declared pattern, kept for diagnostics
    pub expectation: ValuePattern,
    pub matcher: CompiledValuePattern,
}

impl CompiledFieldPattern {
    pub fn compile(name: &str, pattern: &ValuePattern) -> Result<Self, PatternError> {
        Ok(CompiledFieldPattern {
            name: name.to_string(),
            expectation: pattern.clone(),
            matcher: CompiledValuePattern::compile(pattern)?,
        })
    }

    /// Compile every entry of a name-to-pattern map.
    pub fn compile_all(patterns: &BTreeMap<String, ValuePattern>) -> Result<Vec<Self>, PatternError> {
        patterns
            .iter()
            .map(|(name, pattern)| Self::compile(name, pattern))
            .collect()
    }

    pub fn is_absent(&self) -> bool {
        self.matcher.is_absent()
    }

    /// Check a looked-up field. `None` means the request does not carry it.
    pub fn matches(&self, field: Option<&MultiValue>) -> bool {
        match field {
            Some(field) => field.has_value_matching(&self.matcher),
            None => self.matcher.matches(None),
        }
    }
}

/// True when no declared pattern needs its field to be present.
pub fn all_specify_absent(patterns: &[CompiledFieldPattern]) -> bool {
    patterns.iter().all(CompiledFieldPattern::is_absent)
}

/// Names whose pattern requires the field to be absent.
pub fn required_absent_names(patterns: &[CompiledFieldPattern]) -> impl Iterator<Item = &str> {
    patterns
        .iter()
        .filter(|p| p.is_absent())
        .map(|p| p.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_present_and_matching() {
        let pattern = CompiledFieldPattern::compile("Accept", &ValuePattern::containing("xml")).unwrap();
        let field = MultiValue::new("accept", vec!["text/html".into(), "text/xml".into()]);

        assert!(pattern.matches(Some(&field)));
        assert!(!pattern.matches(None));
    }

    #[test]
    fn test_absent_pattern() {
        let pattern = CompiledFieldPattern::compile("X-Debug", &ValuePattern::absent()).unwrap();

        assert!(pattern.is_absent());
        assert!(pattern.matches(None));
        assert!(pattern.matches(Some(&MultiValue::absent("X-Debug"))));
        assert!(!pattern.matches(Some(&MultiValue::new("X-Debug", vec!["1".into()]))));
    }

    #[test]
    fn test_compile_all_and_absent_helpers() {
        let mut declared = BTreeMap::new();
        declared.insert("X-Debug".to_string(), ValuePattern::absent());
        declared.insert("X-Trace".to_string(), ValuePattern::absent());

        let compiled = CompiledFieldPattern::compile_all(&declared).unwrap();
        assert!(all_specify_absent(&compiled));
        assert_eq!(
            required_absent_names(&compiled).collect::<Vec<_>>(),
            vec!["X-Debug", "X-Trace"]
        );

        declared.insert("Accept".to_string(), ValuePattern::equal_to("text/xml"));
        let compiled = CompiledFieldPattern::compile_all(&declared).unwrap();
        assert!(!all_specify_absent(&compiled));
        assert_eq!(required_absent_names(&compiled).count(), 2);

        assert!(all_specify_absent(&[]));
    }

    #[test]
    fn test_compile_all_reports_bad_regex() {
        let mut declared = BTreeMap::new();
        declared.insert("q".to_string(), ValuePattern::matching("["));

        assert!(CompiledFieldPattern::compile_all(&declared).is_err());
    }
}

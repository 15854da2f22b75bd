//! Structured body normalization.
//!
//! A body is parsed into a tree, stripped of volatile elements, and written
//! back out, so two bodies that differ only in timestamps, transaction ids or
//! similar fields serialize to the same string.
//!
//! Two pruning passes run, in order:
//!
//! 1. **Exclusion rules.** Every element whose name is in the
//!    [`ExclusionRules`] is removed. All such elements are expected to be
//!    direct children of the first `<arg0>` element; they are detached from
//!    it, last match first.
//! 2. **Transaction relations.** `<relationTRX>` elements sit inside each
//!    `<lstTransaction>` block rather than under `<arg0>`, so they get their own
//!    pass: for every `<lstTransaction>`, its first direct `<relationTRX>`
//!    child is removed. `<relationTRX>` elements elsewhere are left alone.

use super::tree::{child_elements_named, elements_by_tag_name, parent_element};
use crate::error::NormalizeError;
use crate::exclusion::ExclusionRules;
use std::sync::Arc;
use sxd_document::dom::Document;
use sxd_document::{parser, writer};

/// Element that directly contains every excluded node.
pub const ROOT_CONTAINER: &str = "arg0";

/// Repeated block that carries a nested relation element.
pub const TRANSACTION_BLOCK: &str = "lstTransaction";

/// Relation element pruned once per transaction block.
pub const TRANSACTION_RELATION: &str = "relationTRX";

/// Normalizes XML bodies against a fixed set of exclusion rules.
///
/// Each call builds a private document, so one normalizer can be used from
/// any number of threads at once.
#[derive(Debug, Clone)]
pub struct BodyNormalizer {
    exclusions: Arc<ExclusionRules>,
}

impl BodyNormalizer {
    pub fn new(exclusions: Arc<ExclusionRules>) -> Self {
        Self { exclusions }
    }

    pub fn exclusions(&self) -> &ExclusionRules {
        &self.exclusions
    }

    /// Parse, prune and re-serialize `xml`.
    pub fn normalize(&self, xml: &str) -> Result<String, NormalizeError> {
        let package = parser::parse(xml).map_err(|e| NormalizeError::Parse(format!("{e:?}")))?;
        let document = package.as_document();

        self.remove_excluded_nodes(&document)?;
        remove_transaction_relations(&document);

        serialize(&document)
    }

    fn remove_excluded_nodes(&self, document: &Document<'_>) -> Result<(), NormalizeError> {
        for name in self.exclusions.iter() {
            let matches = elements_by_tag_name(document, name);
            if matches.is_empty() {
                continue;
            }

            let container = elements_by_tag_name(document, ROOT_CONTAINER)
                .into_iter()
                .next()
                .ok_or_else(|| NormalizeError::MissingContainer {
                    container: ROOT_CONTAINER,
                    node: name.to_string(),
                })?;

            // Back to front, so earlier matches are unaffected by removals
            for node in matches.into_iter().rev() {
                if parent_element(node) != Some(container) {
                    return Err(NormalizeError::NotUnderContainer {
                        container: ROOT_CONTAINER,
                        node: name.to_string(),
                    });
                }
                node.remove_from_parent();
            }
        }
        Ok(())
    }
}

fn remove_transaction_relations(document: &Document<'_>) {
    if elements_by_tag_name(document, TRANSACTION_RELATION).is_empty() {
        return;
    }

    for block in elements_by_tag_name(document, TRANSACTION_BLOCK) {
        if let Some(relation) = child_elements_named(block, TRANSACTION_RELATION)
            .into_iter()
            .next()
        {
            relation.remove_from_parent();
        }
    }
}

fn serialize(document: &Document<'_>) -> Result<String, NormalizeError> {
    let mut out = Vec::new();
    writer::format_document(document, &mut out)?;
    Ok(String::from_utf8(out)?)
}

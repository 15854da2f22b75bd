//! XML body handling: normalization for comparison and pretty-printing for logs.

mod normalizer;
mod pretty;
mod tree;

pub use normalizer::{BodyNormalizer, ROOT_CONTAINER, TRANSACTION_BLOCK, TRANSACTION_RELATION};
pub use pretty::pretty_xml;
pub use tree::{child_elements_named, document_element, elements_by_tag_name, parent_element};

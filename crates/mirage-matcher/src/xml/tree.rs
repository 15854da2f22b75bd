//! Tag-name lookups over an `sxd-document` tree.
//!
//! Tag names are compared on the element's local name.

use sxd_document::dom::{ChildOfElement, ChildOfRoot, Document, Element, ParentOfChild};

/// All elements named `name`, in document order (the root element included).
pub fn elements_by_tag_name<'d>(document: &Document<'d>, name: &str) -> Vec<Element<'d>> {
    let mut found = Vec::new();
    for child in document.root().children() {
        if let ChildOfRoot::Element(element) = child {
            collect_named(element, name, &mut found);
        }
    }
    found
}

fn collect_named<'d>(element: Element<'d>, name: &str, found: &mut Vec<Element<'d>>) {
    if element.name().local_part() == name {
        found.push(element);
    }
    for child in element.children() {
        if let ChildOfElement::Element(child) = child {
            collect_named(child, name, found);
        }
    }
}

/// Direct element children of `parent` named `name`, in document order.
pub fn child_elements_named<'d>(parent: Element<'d>, name: &str) -> Vec<Element<'d>> {
    parent
        .children()
        .into_iter()
        .filter_map(|child| match child {
            ChildOfElement::Element(element) if element.name().local_part() == name => {
                Some(element)
            }
            _ => None,
        })
        .collect()
}

/// The element containing `element`, or `None` for the document element.
pub fn parent_element<'d>(element: Element<'d>) -> Option<Element<'d>> {
    match element.parent()? {
        ParentOfChild::Element(parent) => Some(parent),
        ParentOfChild::Root(_) => None,
    }
}

/// The document element, if the document has one.
pub fn document_element<'d>(document: &Document<'d>) -> Option<Element<'d>> {
    document
        .root()
        .children()
        .into_iter()
        .find_map(|child| match child {
            ChildOfRoot::Element(element) => Some(element),
            _ => None,
        })
}

//! Best-effort XML pretty-printing for diagnostics.

use super::tree::document_element;
use std::fmt::{self, Write};
use sxd_document::dom::{ChildOfElement, Element};
use sxd_document::parser;

const INDENT: &str = "  ";

/// Indent `xml` for display.
///
/// Never fails: anything that cannot be parsed is returned unchanged. An XML
/// declaration is emitted only when the input carried one. Namespace prefixes
/// are not reproduced.
pub fn pretty_xml(xml: &str) -> String {
    try_pretty(xml).unwrap_or_else(|| xml.to_string())
}

fn try_pretty(xml: &str) -> Option<String> {
    let package = parser::parse(xml).ok()?;
    let document = package.as_document();
    let root = document_element(&document)?;

    let mut out = String::new();
    if xml.trim_start().starts_with("<?xml") {
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    }
    write_element(root, 0, &mut out).ok()?;
    Some(out)
}

fn write_element(element: Element<'_>, depth: usize, out: &mut String) -> fmt::Result {
    let indent = INDENT.repeat(depth);
    let name = element.name().local_part();

    write!(out, "{indent}<{name}")?;
    for attribute in element.attributes() {
        write!(
            out,
            " {}=\"{}\"",
            attribute.name().local_part(),
            escape(attribute.value())
        )?;
    }

    let children: Vec<ChildOfElement<'_>> = element
        .children()
        .into_iter()
        .filter(|child| !matches!(child, ChildOfElement::Text(t) if t.text().trim().is_empty()))
        .collect();

    match children.as_slice() {
        [] => writeln!(out, "/>"),
        [ChildOfElement::Text(text)] => {
            writeln!(out, ">{}</{name}>", escape(text.text().trim()))
        }
        _ => {
            writeln!(out, ">")?;
            for child in children.iter() {
                match child {
                    ChildOfElement::Element(e) => write_element(*e, depth + 1, out)?,
                    ChildOfElement::Text(t) => {
                        writeln!(out, "{indent}{INDENT}{}", escape(t.text().trim()))?
                    }
                    ChildOfElement::Comment(c) => writeln!(out, "{indent}{INDENT}<!--{}-->", c.text())?,
                    ChildOfElement::ProcessingInstruction(pi) => match pi.value() {
                        Some(value) => writeln!(out, "{indent}{INDENT}<?{} {value}?>", pi.target())?,
                        None => writeln!(out, "{indent}{INDENT}<?{}?>", pi.target())?,
                    },
                }
            }
            writeln!(out, "{indent}</{name}>")
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

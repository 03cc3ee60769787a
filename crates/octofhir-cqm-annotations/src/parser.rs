//! Annotation tree parser
//!
//! Walks the narrative markup nested inside each `annotation` element.
//! Reference nodes (the `a:` namespace) are recursed into first and get their
//! `ref_id`/`node_type` attached afterwards, so a define name discovered
//! deeper in the subtree bubbles through unchanged. The whitespace-join state
//! is an explicit accumulator passed into and returned from every call; no
//! parser state outlives one document.

use crate::dom::{XmlElement, XmlNode, parse_document};
use crate::error::AnnotationError;
use crate::locals::LocalIdIndex;
use crate::model::{AnnotationChild, AnnotationNode, LibraryAnnotations, TextFragment};
use octofhir_cqm_elm::CompiledLibrary;

/// Namespace prefix the translator uses for narrative markup
const ANNOTATION_PREFIX: &str = "a";

/// Token introducing a named definition in rendered source text
const DEFINE_TOKEN: &str = "define";

/// Parse one XML ELM document into the annotation artifact for its library
///
/// The document's `identifier/@id` selects the matching compiled library,
/// whose JSON statements provide the `localId` cross-reference targets.
pub fn parse_annotations(
    xml: &str,
    libraries: &[CompiledLibrary],
) -> Result<LibraryAnnotations, AnnotationError> {
    let document = parse_document(xml)?;
    let id = document
        .find_child("identifier")
        .and_then(|identifier| identifier.attribute("id"))
        .ok_or(AnnotationError::MissingIdentifier)?;
    let library = libraries
        .iter()
        .find(|candidate| candidate.identifier.id == id)
        .ok_or_else(|| AnnotationError::UnmatchedLibrary { id: id.to_string() })?;

    let index = LocalIdIndex::build(library);
    let mut annotations = Vec::new();
    document.collect_named("annotation", &mut annotations);

    let mut statements = Vec::new();
    let mut hanging = false;
    for annotation in annotations {
        let (mut node, define_name, next) = parse_node(annotation, &index, hanging);
        hanging = next;
        node.define_name = define_name;
        statements.push(node);
    }

    Ok(LibraryAnnotations {
        identifier: library.identifier.clone(),
        statements,
    })
}

/// Parse one element's children into an annotation node
///
/// Returns the node, any define name discovered in the subtree, and the
/// updated whitespace-join accumulator: whether the last emitted leaf ended
/// mid-word (no trailing whitespace, no terminating period).
fn parse_node(
    element: &XmlElement,
    index: &LocalIdIndex,
    mut hanging: bool,
) -> (AnnotationNode, Option<String>, bool) {
    let own_ref = annotation_ref(element);
    let mut node = AnnotationNode::default();
    let mut define_name = None;

    for child in &element.children {
        match child {
            XmlNode::Element(child_element) => {
                let (mut parsed, child_define, next) = parse_node(child_element, index, hanging);
                hanging = next;
                if let Some(ref_id) = annotation_ref(child_element) {
                    parsed.node_type = index.node_type(ref_id).map(str::to_string);
                    parsed.ref_id = Some(ref_id.to_string());
                }
                define_name = define_name.or(child_define);
                node.children.push(AnnotationChild::Node(parsed));
            }
            XmlNode::Text(text) => {
                if text.trim().is_empty() {
                    continue;
                }
                if define_name.is_none() && text.starts_with(DEFINE_TOKEN) {
                    define_name = quoted_name(text);
                }

                let mut rendered = text.clone();
                if hanging && !starts_with_whitespace(&rendered) && !rendered.ends_with('.') {
                    rendered.insert(0, ' ');
                }
                hanging = !ends_with_whitespace(&rendered) && !rendered.ends_with('.');

                node.children.push(AnnotationChild::Text(TextFragment {
                    text: rendered,
                    ref_id: own_ref.map(str::to_string),
                }));
            }
        }
    }

    (node, define_name, hanging)
}

/// `r` attribute of a narrative reference node; `None` for foreign elements
fn annotation_ref(element: &XmlElement) -> Option<&str> {
    if element.prefix.as_deref() == Some(ANNOTATION_PREFIX) {
        element.attribute("r")
    } else {
        None
    }
}

/// Content between the first pair of quotation characters
fn quoted_name(text: &str) -> Option<String> {
    let start = text.find('"')? + 1;
    let length = text[start..].find('"')?;
    Some(text[start..start + length].to_string())
}

fn starts_with_whitespace(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_whitespace)
}

fn ends_with_whitespace(text: &str) -> bool {
    text.chars().last().is_some_and(char::is_whitespace)
}

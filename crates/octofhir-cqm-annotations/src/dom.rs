//! Minimal owned XML tree built from quick-xml events
//!
//! The annotation parser recurses over element children and has to keep text
//! nodes, including whitespace-only ones, exactly as emitted; text is never
//! trimmed here.

use crate::error::AnnotationError;
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, BytesText, Event};

#[derive(Debug, Clone)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct XmlElement {
    pub prefix: Option<String>,
    pub local_name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Attribute value by local name, ignoring any namespace prefix
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.rsplit(':').next() == Some(name))
            .map(|(_, value)| value.as_str())
    }

    /// First direct element child with the given local name
    pub fn find_child(&self, local_name: &str) -> Option<&XmlElement> {
        self.children.iter().find_map(|child| match child {
            XmlNode::Element(element) if element.local_name == local_name => Some(element),
            _ => None,
        })
    }

    /// Collect every element with the given local name, in document order
    pub fn collect_named<'a>(&'a self, local_name: &str, out: &mut Vec<&'a XmlElement>) {
        if self.local_name == local_name {
            out.push(self);
        }
        for child in &self.children {
            if let XmlNode::Element(element) = child {
                element.collect_named(local_name, out);
            }
        }
    }
}

/// Parse a document into its root element
pub fn parse_document(xml: &str) -> Result<XmlElement, AnnotationError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => stack.push(element_from(e)?),
            Ok(Event::Empty(ref e)) => {
                let element = element_from(e)?;
                place(element, &mut stack, &mut root);
            }
            Ok(Event::End(_)) => {
                if let Some(element) = stack.pop() {
                    place(element, &mut stack, &mut root);
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(parent) = stack.last_mut() {
                    push_text(parent, text_from(e)?);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(parent) = stack.last_mut() {
                    let text = String::from_utf8(e.into_inner().to_vec())
                        .map_err(|e| AnnotationError::Xml(e.to_string()))?;
                    push_text(parent, text);
                }
            }
            Ok(Event::GeneralRef(ref e)) => {
                if let Some(parent) = stack.last_mut() {
                    let name = std::str::from_utf8(e.as_ref())
                        .map_err(|e| AnnotationError::Xml(e.to_string()))?;
                    let entity = format!("&{name};");
                    let resolved = unescape(&entity)
                        .map_err(|e| AnnotationError::Xml(e.to_string()))?;
                    push_text(parent, resolved.into_owned());
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(AnnotationError::Xml(e.to_string())),
        }
        buf.clear();
    }

    root.ok_or_else(|| AnnotationError::Xml("document has no root element".to_string()))
}

/// Append character data to the parent, merging into a trailing text node so
/// that a contiguous run of character data (text, CDATA, and resolved entity
/// references) forms a single text node.
fn push_text(parent: &mut XmlElement, text: String) {
    if let Some(XmlNode::Text(existing)) = parent.children.last_mut() {
        existing.push_str(&text);
    } else {
        parent.children.push(XmlNode::Text(text));
    }
}

fn place(element: XmlElement, stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn element_from(e: &BytesStart) -> Result<XmlElement, AnnotationError> {
    let name = e.name();
    let prefix = name
        .prefix()
        .map(|p| {
            std::str::from_utf8(p.as_ref())
                .map(str::to_string)
                .map_err(|e| AnnotationError::Xml(e.to_string()))
        })
        .transpose()?;
    let local_name = std::str::from_utf8(name.local_name().as_ref())
        .map_err(|e| AnnotationError::Xml(e.to_string()))?
        .to_string();

    let mut attributes = Vec::new();
    for attr in e.attributes().flatten() {
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| AnnotationError::Xml(e.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| AnnotationError::Xml(e.to_string()))?
            .to_string();
        attributes.push((key, value));
    }

    Ok(XmlElement {
        prefix,
        local_name,
        attributes,
        children: Vec::new(),
    })
}

fn text_from(e: &BytesText) -> Result<String, AnnotationError> {
    let decoded = e
        .decode()
        .map_err(|e| AnnotationError::Xml(e.to_string()))?;
    let text = unescape(&decoded).map_err(|e| AnnotationError::Xml(e.to_string()))?;
    Ok(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_with_prefixes_and_attributes() {
        let xml = r#"<library xmlns:a="urn:hl7-org:cql-annotations:r1">
  <identifier id="Lib1" version="1.0.0"/>
  <annotation><a:s r="4">define &quot;X&quot;:</a:s></annotation>
</library>"#;

        let root = parse_document(xml).unwrap();
        assert_eq!(root.local_name, "library");

        let identifier = root.find_child("identifier").unwrap();
        assert_eq!(identifier.attribute("id"), Some("Lib1"));

        let mut annotations = Vec::new();
        root.collect_named("annotation", &mut annotations);
        assert_eq!(annotations.len(), 1);

        let XmlNode::Element(narrative) = &annotations[0].children[0] else {
            panic!("expected element child");
        };
        assert_eq!(narrative.prefix.as_deref(), Some("a"));
        assert_eq!(narrative.attribute("r"), Some("4"));
        let XmlNode::Text(text) = &narrative.children[0] else {
            panic!("expected text child");
        };
        assert_eq!(text, "define \"X\":");
    }

    #[test]
    fn test_whitespace_text_is_kept() {
        let root = parse_document("<a><b>x</b>\n  <b>y</b></a>").unwrap();
        assert!(matches!(&root.children[1], XmlNode::Text(t) if t == "\n  "));
    }

    #[test]
    fn test_mismatched_end_tag_is_rejected() {
        assert!(parse_document("<library><def></library>").is_err());
    }

    #[test]
    fn test_empty_document_is_rejected() {
        assert!(parse_document("").is_err());
    }
}

//! Reconstructed annotation tree model

use octofhir_cqm_elm::VersionedIdentifier;
use serde::{Deserialize, Serialize};

/// A node of the reconstructed human-readable tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationNode {
    /// Type tag of the cross-referenced ELM node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    /// ELM `localId` this node corresponds to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    /// Name of the definition this tree renders; root nodes only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub define_name: Option<String>,
    /// Nested nodes and text fragments, in narrative order
    pub children: Vec<AnnotationChild>,
}

/// Either a nested annotation node or a rendered text leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationChild {
    Node(AnnotationNode),
    Text(TextFragment),
}

/// A rendered text leaf, post-formatting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFragment {
    pub text: String,
    /// `localId` of the enclosing reference node, when inside one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
}

/// The annotation artifact for one library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryAnnotations {
    pub identifier: VersionedIdentifier,
    /// One tree per annotated definition, in document order
    pub statements: Vec<AnnotationNode>,
}

impl AnnotationNode {
    /// Concatenated text of every fragment in this subtree, in order
    pub fn rendered_text(&self) -> String {
        let mut text = String::new();
        self.append_text(&mut text);
        text
    }

    fn append_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                AnnotationChild::Node(node) => node.append_text(out),
                AnnotationChild::Text(fragment) => out.push_str(&fragment.text),
            }
        }
    }
}

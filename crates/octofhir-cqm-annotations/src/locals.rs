//! Cross-reference index from annotation `r` attributes to ELM node types

use octofhir_cqm_elm::CompiledLibrary;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Index of ELM `localId`s reachable from a library's statements
///
/// A reference resolves against nodes sitting at the `expression`, `operand`,
/// and `suchThat` positions, tried in that fixed priority order; within one
/// position the first occurrence in document order wins.
#[derive(Debug, Default)]
pub struct LocalIdIndex {
    expressions: HashMap<String, String>,
    operands: HashMap<String, String>,
    such_thats: HashMap<String, String>,
}

impl LocalIdIndex {
    /// Build the index for one compiled library
    pub fn build(library: &CompiledLibrary) -> Self {
        let mut index = Self::default();
        for statement in library.statements() {
            if let Some(expression) = &statement.expression {
                index.visit("expression", expression);
            }
        }
        index
    }

    /// Type tag of the ELM node carrying `local_id`, if any
    pub fn node_type(&self, local_id: &str) -> Option<&str> {
        self.expressions
            .get(local_id)
            .or_else(|| self.operands.get(local_id))
            .or_else(|| self.such_thats.get(local_id))
            .map(String::as_str)
    }

    fn visit(&mut self, position: &str, node: &Value) {
        match node {
            Value::Array(items) => {
                for item in items {
                    self.visit(position, item);
                }
            }
            Value::Object(fields) => {
                self.record(position, fields);
                for (key, value) in fields {
                    self.visit(key, value);
                }
            }
            _ => {}
        }
    }

    fn record(&mut self, position: &str, fields: &Map<String, Value>) {
        let slot = match position {
            "expression" => &mut self.expressions,
            "operand" => &mut self.operands,
            "suchThat" => &mut self.such_thats,
            _ => return,
        };
        let Some(local_id) = local_id_of(fields) else {
            return;
        };
        let Some(node_type) = fields.get("type").and_then(Value::as_str) else {
            return;
        };
        slot.entry(local_id).or_insert_with(|| node_type.to_string());
    }
}

fn local_id_of(fields: &Map<String, Value>) -> Option<String> {
    match fields.get("localId")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

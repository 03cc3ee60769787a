//! Memoized transitive closure of statement references
//!
//! A statement depends on every definition its expression tree references via
//! `ExpressionRef`/`FunctionRef` nodes. Names resolve against the first
//! library in working-set order that defines them; names defined nowhere are
//! built-ins and are dropped silently. Each `(library, statement)` key is
//! inserted into the map before its dependencies are recursed into, which
//! both memoizes shared subtrees and terminates reference cycles.

use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use octofhir_cqm_elm::{CompiledLibrary, Statement};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Node type tags marking a reference to a named definition
const REFERENCE_TYPES: [&str; 2] = ["ExpressionRef", "FunctionRef"];

/// The translator's built-in patient pseudo-reference; never a dependency
const PATIENT: &str = "Patient";

/// A `(library, statement)` pair naming one definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementReference {
    pub library_name: String,
    pub statement_name: String,
}

impl StatementReference {
    pub fn new(library_name: impl Into<String>, statement_name: impl Into<String>) -> Self {
        Self {
            library_name: library_name.into(),
            statement_name: statement_name.into(),
        }
    }
}

/// Dependencies of each statement within one library
pub type StatementDependencies = IndexMap<String, IndexSet<StatementReference>>;

/// library id -> statement name -> referenced definitions
///
/// Every statement reachable from a configured root has an entry, even when
/// its dependency set is empty; every library of the working set has an
/// entry, even when none of its statements are used.
pub type DependencyMap = IndexMap<String, StatementDependencies>;

/// Resolver over the full compiled working set of a load
pub struct DependencyResolver<'a> {
    libraries: &'a [CompiledLibrary],
}

impl<'a> DependencyResolver<'a> {
    pub fn new(libraries: &'a [CompiledLibrary]) -> Self {
        Self { libraries }
    }

    /// Resolve the transitive closure of every root statement
    pub fn resolve(&self, roots: &[StatementReference]) -> DependencyMap {
        let mut map = DependencyMap::new();
        for library in self.libraries {
            map.entry(library.identifier.id.clone()).or_default();
        }
        for root in roots {
            self.resolve_statement(root, &mut map);
        }
        map
    }

    fn resolve_statement(&self, key: &StatementReference, map: &mut DependencyMap) {
        let resolved = map
            .get(&key.library_name)
            .is_some_and(|statements| statements.contains_key(&key.statement_name));
        if resolved {
            return;
        }

        let Some(library) = self.library(&key.library_name) else {
            warn!("root statement names unknown library {}", key.library_name);
            return;
        };
        let Some(statement) = library.statement(&key.statement_name) else {
            warn!(
                "library {} has no statement {}",
                key.library_name, key.statement_name
            );
            return;
        };

        let dependencies = self.direct_dependencies(statement);
        // Insert before recursing: reference cycles terminate on the memo hit.
        map.entry(key.library_name.clone())
            .or_default()
            .insert(key.statement_name.clone(), dependencies.clone());

        for dependency in dependencies {
            self.resolve_statement(&dependency, map);
        }
    }

    /// Definitions a statement's expression tree references directly
    fn direct_dependencies(&self, statement: &Statement) -> IndexSet<StatementReference> {
        let mut found = IndexSet::new();
        if let Some(expression) = &statement.expression {
            self.collect_references(expression, &mut found);
        }
        found
    }

    fn collect_references(&self, node: &Value, found: &mut IndexSet<StatementReference>) {
        match node {
            Value::Object(fields) => {
                if let Some(name) = reference_target(fields) {
                    match self.defining_library(name) {
                        Some(library) => {
                            found.insert(StatementReference::new(
                                library.identifier.id.clone(),
                                name,
                            ));
                        }
                        None => debug!("dropping built-in reference {name}"),
                    }
                }
                for value in fields.values() {
                    self.collect_references(value, found);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.collect_references(item, found);
                }
            }
            _ => {}
        }
    }

    fn library(&self, id: &str) -> Option<&CompiledLibrary> {
        self.libraries
            .iter()
            .find(|library| library.identifier.id == id)
    }

    /// First library in working-set order defining `name`
    fn defining_library(&self, name: &str) -> Option<&CompiledLibrary> {
        self.libraries
            .iter()
            .find(|library| library.statement(name).is_some())
    }
}

/// Referenced definition name, when `fields` is a reference node
fn reference_target(fields: &serde_json::Map<String, Value>) -> Option<&str> {
    let node_type = fields.get("type").and_then(Value::as_str)?;
    if !REFERENCE_TYPES.contains(&node_type) {
        return None;
    }
    fields
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| *name != PATIENT)
}

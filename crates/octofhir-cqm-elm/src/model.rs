//! Structures for the JSON ELM a translation service returns per library
//!
//! Only the parts of the ELM schema this pipeline consumes are modeled as
//! typed fields; statement expression trees stay as raw `serde_json::Value`
//! so downstream consumers can traverse arbitrary node shapes and `localId`s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Library Structure
// ============================================================================

/// Wrapper object the translator emits around each library payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryEnvelope {
    pub library: CompiledLibrary,
}

/// One translated CQL library
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledLibrary {
    /// Library identifier
    pub identifier: VersionedIdentifier,
    /// Schema identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_identifier: Option<VersionedIdentifier>,
    /// Include definitions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub includes: Option<IncludeDefs>,
    /// Code systems
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_systems: Option<CodeSystemDefs>,
    /// Value sets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_sets: Option<ValueSetDefs>,
    /// Codes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codes: Option<CodeDefs>,
    /// Statements (expression and function definitions)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statements: Option<Statements>,
}

impl CompiledLibrary {
    /// Statements in translator order; empty when the library defines none
    pub fn statements(&self) -> &[Statement] {
        self.statements
            .as_ref()
            .map(|s| s.defs.as_slice())
            .unwrap_or(&[])
    }

    /// Look up a statement by name
    pub fn statement(&self, name: &str) -> Option<&Statement> {
        self.statements().iter().find(|s| s.name == name)
    }

    /// Value-set identifiers referenced by this library, in definition order
    ///
    /// These are the OIDs the terminology collaborator resolves before
    /// calculation.
    pub fn value_set_ids(&self) -> Vec<&str> {
        self.value_sets
            .as_ref()
            .map(|vs| vs.defs.iter().map(|def| def.id.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Versioned identifier for libraries and schemas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedIdentifier {
    /// Identifier
    pub id: String,
    /// System/namespace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

// ============================================================================
// Definition Containers
// ============================================================================

/// Container for include definitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncludeDefs {
    #[serde(rename = "def")]
    pub defs: Vec<IncludeDef>,
}

/// Container for code system definitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSystemDefs {
    #[serde(rename = "def")]
    pub defs: Vec<CodeSystemDef>,
}

/// Container for value set definitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueSetDefs {
    #[serde(rename = "def")]
    pub defs: Vec<ValueSetDef>,
}

/// Container for code definitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeDefs {
    #[serde(rename = "def")]
    pub defs: Vec<CodeDef>,
}

/// Container for statements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statements {
    #[serde(rename = "def")]
    pub defs: Vec<Statement>,
}

// ============================================================================
// Definitions
// ============================================================================

/// Include definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludeDef {
    /// Local identifier
    pub local_identifier: String,
    /// Library path
    pub path: String,
    /// Library version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Code system definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSystemDef {
    /// Name
    pub name: String,
    /// Code system ID/URI
    pub id: String,
    /// Version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Value set definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSetDef {
    /// Name
    pub name: String,
    /// Value set ID/URI
    pub id: String,
    /// Version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Code definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeDef {
    /// Name
    pub name: String,
    /// Code value
    pub id: String,
    /// Display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    /// Code system reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_system: Option<CodeSystemRef>,
}

/// Code system reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSystemRef {
    pub name: String,
}

/// A named top-level definition inside a library
///
/// Immutable once produced by translation. The expression tree is kept
/// untyped; nodes are mappings with a `type` tag and optional `localId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    /// Name, unique within its library
    pub name: String,
    /// Evaluation context (e.g. Patient)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Definition kind tag (plain vs function definition)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub statement_type: Option<String>,
    /// Expression tree
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<Value>,
}

// ============================================================================
// Wire Cleanup
// ============================================================================

/// Strip `urn:oid:` prefixes from a raw library payload
///
/// The translator qualifies value-set and code-system ids with `urn:oid:`;
/// downstream consumers key on the bare OID.
pub fn normalize_oids(raw: &str) -> String {
    raw.replace("urn:oid:", "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LIBRARY_JSON: &str = r#"{
        "library": {
            "identifier": {"id": "Hospice", "version": "2.0.000"},
            "schemaIdentifier": {"id": "urn:hl7-org:elm", "version": "r1"},
            "valueSets": {"def": [
                {"name": "Hospice care ambulatory", "id": "2.16.840.1.113762.1.4.1108.15"}
            ]},
            "statements": {"def": [
                {"name": "Patient", "context": "Patient"},
                {"name": "Has Hospice", "context": "Patient",
                 "expression": {"localId": "30", "type": "Exists",
                                "operand": {"localId": "29", "type": "Retrieve"}}}
            ]}
        }
    }"#;

    #[test]
    fn test_decode_library_envelope() {
        let envelope: LibraryEnvelope = serde_json::from_str(LIBRARY_JSON).unwrap();
        let library = envelope.library;

        assert_eq!(library.identifier.id, "Hospice");
        assert_eq!(library.identifier.version.as_deref(), Some("2.0.000"));
        assert_eq!(library.statements().len(), 2);
        assert_eq!(library.statements()[1].name, "Has Hospice");
    }

    #[test]
    fn test_statement_lookup() {
        let envelope: LibraryEnvelope = serde_json::from_str(LIBRARY_JSON).unwrap();
        let library = envelope.library;

        let statement = library.statement("Has Hospice").unwrap();
        assert_eq!(statement.context.as_deref(), Some("Patient"));
        assert!(statement.expression.is_some());
        assert!(library.statement("No Such Define").is_none());
    }

    #[test]
    fn test_value_set_ids() {
        let envelope: LibraryEnvelope = serde_json::from_str(LIBRARY_JSON).unwrap();

        assert_eq!(
            envelope.library.value_set_ids(),
            vec!["2.16.840.1.113762.1.4.1108.15"]
        );
    }

    #[test]
    fn test_value_set_ids_empty_without_defs() {
        let envelope: LibraryEnvelope =
            serde_json::from_str(r#"{"library": {"identifier": {"id": "Empty"}}}"#).unwrap();

        assert!(envelope.library.value_set_ids().is_empty());
        assert!(envelope.library.statements().is_empty());
    }

    #[test]
    fn test_normalize_oids() {
        let raw = r#"{"id": "urn:oid:2.16.840.1.113762.1.4.1108.15"}"#;
        assert_eq!(
            normalize_oids(raw),
            r#"{"id": "2.16.840.1.113762.1.4.1108.15"}"#
        );
    }
}

//! Function-name sanitization applied to CQL sources before translation
//!
//! Custom CQL functions may carry quoted names with whitespace and
//! punctuation the downstream calculation engine cannot express as
//! identifiers. Every declared function name in the working set is rewritten
//! to a restricted character set, consistently across definition sites, call
//! sites in every library, and the measure-observation side table.

use indexmap::IndexMap;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Mapping from original quoted function name to its sanitized identifier
///
/// Injective over a single sanitization pass; discarded once rewriting has
/// been applied.
pub type RenameTable = IndexMap<String, String>;

/// Measure-observation metadata referencing a function by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureObservation {
    /// Name of the observation function, unquoted
    pub function_name: String,
}

impl MeasureObservation {
    pub fn new(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
        }
    }
}

static FUNCTION_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"define\s+(?:fluent\s+)?function\s+"([^"]+)""#).expect("function pattern")
});

/// Reserved words in the calculation engine's target language
static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
        "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if",
        "implements", "import", "in", "instanceof", "interface", "let", "new", "null", "package",
        "private", "protected", "public", "return", "static", "super", "switch", "this", "throw",
        "true", "try", "typeof", "var", "void", "while", "with", "yield",
    ]
    .into_iter()
    .collect()
});

const ESCAPE: char = '_';

/// Rewrite every custom function name in `sources` to a safe identifier
///
/// Scans all libraries first so the produced table covers cross-library call
/// sites, then substitutes each original quoted name wherever it occurs and
/// updates matching observation entries. Deterministic and total over valid
/// CQL text; re-running over already-sanitized sources is a no-op.
pub fn sanitize_function_names(
    sources: &mut [String],
    observations: &mut [MeasureObservation],
) -> RenameTable {
    let mut table = RenameTable::new();
    // Collision set for this pass: every declared original plus every target
    // assigned so far. Keeps the table injective when two distinct originals
    // transliterate to the same candidate.
    let mut taken: HashSet<String> = sources
        .iter()
        .flat_map(|text| declared_functions(text))
        .collect();

    for text in sources.iter() {
        for original in declared_functions(text) {
            if table.contains_key(&original) {
                continue;
            }
            let renamed = rename(&original, text, &taken);
            taken.insert(renamed.clone());
            table.insert(original, renamed);
        }
    }

    let rewrites = table.iter().filter(|(o, n)| o != n).count();
    if rewrites > 0 {
        debug!("sanitizing {rewrites} function names across {} libraries", sources.len());
    }

    for text in sources.iter_mut() {
        for (original, renamed) in &table {
            if original == renamed {
                continue;
            }
            *text = text.replace(&quoted(original), &quoted(renamed));
        }
    }

    for observation in observations.iter_mut() {
        if let Some(renamed) = table.get(&observation.function_name) {
            observation.function_name = renamed.clone();
        }
    }

    table
}

fn declared_functions(text: &str) -> Vec<String> {
    FUNCTION_DEF
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

fn rename(original: &str, text: &str, taken: &HashSet<String>) -> String {
    let mut candidate: String = original
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();

    if candidate.is_empty()
        || candidate.starts_with(|c: char| c.is_ascii_digit())
        || RESERVED_WORDS.contains(candidate.as_str())
    {
        candidate.insert(0, ESCAPE);
    }

    // An unchanged name keeps itself; it is already the identifier in play.
    while candidate != original
        && (taken.contains(&candidate) || contains_identifier(text, &candidate))
    {
        candidate.insert(0, ESCAPE);
    }

    candidate
}

fn quoted(name: &str) -> String {
    format!("\"{name}\"")
}

fn contains_identifier(text: &str, candidate: &str) -> bool {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|token| token == candidate)
}

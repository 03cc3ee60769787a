//! End-to-end tests for the load pipeline
//!
//! Drives `load_measure` against fixture translator responses: two compiled
//! libraries, annotated XML counterparts, and population roots, plus the
//! fatal paths (rejection, malformed multipart, part-count mismatch).

use async_trait::async_trait;
use indexmap::IndexMap;
use octofhir_cqm::loader::LoadError;
use octofhir_cqm::{
    ElmFormat, ElmTranslator, MeasureLoadRequest, MeasureObservation, StatementReference,
    load_measure,
};
use octofhir_cqm_translator::TranslationError;
use pretty_assertions::assert_eq;
use std::sync::Mutex;

const MAIN_JSON: &str = r#"{"library":{
    "identifier":{"id":"Main","version":"1.0.000"},
    "valueSets":{"def":[{"name":"Inpatient","id":"urn:oid:2.16.840.1.113883.3.117.1.7.1.23"}]},
    "statements":{"def":[
        {"name":"Patient","context":"Patient"},
        {"name":"Initial Population","context":"Patient",
         "expression":{"localId":"30","type":"Exists",
                       "operand":{"localId":"29","type":"Retrieve"}}},
        {"name":"Numerator","context":"Patient",
         "expression":{"localId":"40","type":"And","operand":[
             {"localId":"38","type":"ExpressionRef","name":"Initial Population"},
             {"localId":"39","type":"FunctionRef","libraryName":"Hospice","name":"Has Hospice"}
         ]}}
    ]}}}"#;

const HOSPICE_JSON: &str = r#"{"library":{
    "identifier":{"id":"Hospice","version":"2.0.000"},
    "statements":{"def":[
        {"name":"Has Hospice","context":"Patient",
         "expression":{"localId":"12","type":"Exists",
                       "operand":{"localId":"11","type":"Retrieve"}}}
    ]}}}"#;

const MAIN_XML: &str = r#"<library xmlns="urn:hl7-org:elm:r1" xmlns:a="urn:hl7-org:cql-annotations:r1" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <identifier id="Main" version="1.0.000"/>
  <statements>
    <def name="Initial Population" context="Patient">
      <annotation xsi:type="a:Annotation"><a:s r="30"><a:s>define &quot;Initial Population&quot;: </a:s><a:s r="29">exists [Encounter]</a:s></a:s></annotation>
    </def>
    <def name="Numerator" context="Patient">
      <annotation xsi:type="a:Annotation"><a:s r="40"><a:s>define &quot;Numerator&quot;: </a:s><a:s r="38">&quot;Initial Population&quot; </a:s><a:s>and </a:s><a:s r="39">Hospice.&quot;Has Hospice&quot;()</a:s></a:s></annotation>
    </def>
  </statements>
</library>"#;

const HOSPICE_XML: &str = r#"<library xmlns="urn:hl7-org:elm:r1" xmlns:a="urn:hl7-org:cql-annotations:r1" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <identifier id="Hospice" version="2.0.000"/>
  <statements>
    <def name="Has Hospice" context="Patient">
      <annotation xsi:type="a:Annotation"><a:s r="12"><a:s>define &quot;Has Hospice&quot;: </a:s><a:s r="11">exists [Encounter: &quot;Hospice care&quot;]</a:s></a:s></annotation>
    </def>
  </statements>
</library>"#;

fn multipart(parts: &[&str], content_type: &str) -> String {
    let mut body = String::new();
    for part in parts {
        body.push_str("--Fixture_Boundary\r\n");
        body.push_str("Content-Disposition: form-data\r\n");
        body.push_str(&format!("Content-Type: {content_type}\r\n"));
        body.push_str("\r\n");
        body.push_str(part);
        body.push_str("\r\n");
    }
    body.push_str("--Fixture_Boundary--");
    body
}

/// Translator serving canned multipart bodies, recording what it was sent
struct FixtureTranslator {
    json_body: String,
    xml_body: String,
    submitted: Mutex<Vec<Vec<String>>>,
}

impl FixtureTranslator {
    fn new(json_parts: &[&str], xml_parts: &[&str]) -> Self {
        Self {
            json_body: multipart(json_parts, ElmFormat::Json.mime_type()),
            xml_body: multipart(xml_parts, ElmFormat::Xml.mime_type()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    fn two_library_measure() -> Self {
        Self::new(&[MAIN_JSON, HOSPICE_JSON], &[MAIN_XML, HOSPICE_XML])
    }
}

#[async_trait]
impl ElmTranslator for FixtureTranslator {
    async fn translate(
        &self,
        sources: &[String],
        format: ElmFormat,
    ) -> Result<String, TranslationError> {
        self.submitted.lock().unwrap().push(sources.to_vec());
        Ok(match format {
            ElmFormat::Json => self.json_body.clone(),
            ElmFormat::Xml => self.xml_body.clone(),
        })
    }
}

/// Translator rejecting every submission with a structured error body
struct RejectingTranslator;

#[async_trait]
impl ElmTranslator for RejectingTranslator {
    async fn translate(
        &self,
        _sources: &[String],
        _format: ElmFormat,
    ) -> Result<String, TranslationError> {
        Err(TranslationError::from_error_body(
            r#"{"errorSeverity":"Error","message":"Could not resolve identifier"}"#,
        ))
    }
}

fn two_library_request() -> MeasureLoadRequest {
    MeasureLoadRequest {
        sources: vec![
            "library Main version '1.0.000'".to_string(),
            "library Hospice version '2.0.000'".to_string(),
        ],
        observations: Vec::new(),
        population_roots: IndexMap::from([
            (
                "IPP".to_string(),
                vec![StatementReference::new("Main", "Initial Population")],
            ),
            (
                "NUMER".to_string(),
                vec![StatementReference::new("Main", "Numerator")],
            ),
        ]),
    }
}

// === Happy Path ===

#[tokio::test]
async fn test_load_produces_libraries_in_submission_order() {
    let translator = FixtureTranslator::two_library_measure();

    let measure = load_measure(&translator, two_library_request()).await.unwrap();

    let ids: Vec<&str> = measure
        .libraries
        .iter()
        .map(|l| l.identifier.id.as_str())
        .collect();
    assert_eq!(ids, vec!["Main", "Hospice"]);
}

#[tokio::test]
async fn test_load_normalizes_value_set_oids() {
    let translator = FixtureTranslator::two_library_measure();

    let measure = load_measure(&translator, two_library_request()).await.unwrap();

    assert_eq!(
        measure.libraries[0].value_set_ids(),
        vec!["2.16.840.1.113883.3.117.1.7.1.23"]
    );
}

#[tokio::test]
async fn test_load_builds_annotations_per_library() {
    let translator = FixtureTranslator::two_library_measure();

    let measure = load_measure(&translator, two_library_request()).await.unwrap();

    assert_eq!(measure.elm_annotations.len(), 2);
    let main = &measure.elm_annotations["Main"];
    let names: Vec<_> = main
        .statements
        .iter()
        .map(|s| s.define_name.as_deref())
        .collect();
    assert_eq!(names, vec![Some("Initial Population"), Some("Numerator")]);

    let hospice = &measure.elm_annotations["Hospice"];
    assert_eq!(
        hospice.statements[0].define_name.as_deref(),
        Some("Has Hospice")
    );
}

#[tokio::test]
async fn test_load_resolves_population_dependencies() {
    let translator = FixtureTranslator::two_library_measure();

    let measure = load_measure(&translator, two_library_request()).await.unwrap();
    let dependencies = &measure.statement_dependencies;

    let numerator: Vec<_> = dependencies["Main"]["Numerator"].iter().collect();
    assert_eq!(
        numerator,
        vec![
            &StatementReference::new("Main", "Initial Population"),
            &StatementReference::new("Hospice", "Has Hospice"),
        ]
    );
    assert!(dependencies["Main"]["Initial Population"].is_empty());
    assert!(dependencies["Hospice"]["Has Hospice"].is_empty());
}

#[tokio::test]
async fn test_load_sanitizes_sources_before_translation() {
    let translator = FixtureTranslator::new(&[HOSPICE_JSON], &[HOSPICE_XML]);
    let mut request = MeasureLoadRequest::new(vec![
        "library Hospice version '2.0.000'\ndefine function \"Hospice Period\"(): null"
            .to_string(),
    ]);
    request.observations = vec![MeasureObservation::new("Hospice Period")];

    let measure = load_measure(&translator, request).await.unwrap();

    let submitted = translator.submitted.lock().unwrap();
    // Both translator calls see the same rewritten text.
    assert_eq!(submitted.len(), 2);
    for sources in submitted.iter() {
        assert!(sources[0].contains("\"HospicePeriod\""));
        assert!(!sources[0].contains("Hospice Period"));
    }
    assert_eq!(measure.observations[0].function_name, "HospicePeriod");
}

// === Fatal Paths ===

#[tokio::test]
async fn test_translator_rejection_aborts_the_load() {
    let err = load_measure(&RejectingTranslator, two_library_request())
        .await
        .unwrap_err();

    let LoadError::Translation(TranslationError::Rejected { detail }) = &err else {
        panic!("expected a translation rejection, got {err:?}");
    };
    assert!(detail.contains("Could not resolve identifier"));
}

#[tokio::test]
async fn test_part_count_mismatch_aborts_the_load() {
    // Two libraries submitted, one part returned.
    let translator = FixtureTranslator::new(&[MAIN_JSON], &[MAIN_XML]);

    let err = load_measure(&translator, two_library_request())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LoadError::PartCountMismatch {
            expected: 2,
            actual: 1
        }
    ));
}

#[tokio::test]
async fn test_malformed_multipart_aborts_the_load() {
    let mut translator = FixtureTranslator::two_library_measure();
    // Strip the blank separator lines so no part has a header terminator.
    translator.json_body = translator.json_body.replace("\r\n\r\n", "\r\n");

    let err = load_measure(&translator, two_library_request())
        .await
        .unwrap_err();

    assert!(matches!(err, LoadError::Multipart(_)));
}

#[tokio::test]
async fn test_unparseable_library_payload_aborts_the_load() {
    let translator = FixtureTranslator::new(&["{\"library\":", HOSPICE_JSON], &[MAIN_XML, HOSPICE_XML]);

    let err = load_measure(&translator, two_library_request())
        .await
        .unwrap_err();

    assert!(matches!(err, LoadError::ElmDecode(_)));
}

//! # Test Runs
//!
//! A [`TestRun`] pairs a compiled [`PolicyBundle`] with a [`DataStore`] and
//! evaluates documents against a resolved namespace list.
//!
//! ## Semantics
//!
//! - Namespaces run in the order given, which [`PolicyBundle::select`]
//!   returns sorted. Rules within a namespace run in source order.
//! - Every rule runs; a firing rule never short-circuits the rest.
//! - Each message becomes one [`Finding`] tagged with its namespace, rule
//!   and query path.
//! - A rule that fails to evaluate yields one exception finding instead of
//!   aborting the verdict.
//! - The [`CancelFlag`] is checked before the document and before each
//!   namespace; a cancelled run returns [`PipelineError::Cancelled`].

use std::collections::BTreeMap;

use confgate_core::{DocumentId, Finding, PipelineError, StructuredDocument, Value, Verdict};

use crate::bundle::PolicyBundle;
use crate::cancel::CancelFlag;
use crate::data::DataStore;

/// Filename of the single verdict produced by combined evaluation.
pub const COMBINED_FILENAME: &str = "Combined";

/// Evaluates documents against one bundle and one data store.
///
/// Holds shared references only, so any number of runs may borrow the same
/// bundle concurrently.
#[derive(Debug, Clone)]
pub struct TestRun<'a> {
    bundle: &'a PolicyBundle,
    data: &'a DataStore,
    cancel: CancelFlag,
}

impl<'a> TestRun<'a> {
    /// A run over `bundle` with `data` in scope.
    pub fn new(bundle: &'a PolicyBundle, data: &'a DataStore) -> Self {
        Self {
            bundle,
            data,
            cancel: CancelFlag::new(),
        }
    }

    /// Observe `cancel` between documents and namespaces.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Evaluate one document against `namespaces`.
    pub fn evaluate(
        &self,
        namespaces: &[String],
        document: &StructuredDocument,
    ) -> Result<Verdict, PipelineError> {
        self.evaluate_value(namespaces, document.id().clone(), document.content())
    }

    /// Evaluate an arbitrary input value under the given identity.
    pub fn evaluate_value(
        &self,
        namespaces: &[String],
        id: DocumentId,
        input: &Value,
    ) -> Result<Verdict, PipelineError> {
        self.cancel.check()?;
        let mut verdict = Verdict::new(id);
        for namespace in namespaces {
            self.cancel.check()?;
            for rule in self.bundle.rules(namespace) {
                verdict.record_query();
                match rule.query(input, self.data.value()) {
                    Ok(messages) => {
                        for message in messages {
                            verdict.push(
                                Finding::new(rule.severity(), message)
                                    .with_rule(namespace, rule.name()),
                            );
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            document = %verdict.document,
                            query = %rule.query_path(),
                            error = %e,
                            "rule evaluation failed"
                        );
                        verdict.push(
                            Finding::exception(format!("{}: {e}", rule.query_path()))
                                .with_rule(namespace, rule.name()),
                        );
                    }
                }
            }
        }
        tracing::debug!(
            document = %verdict.document,
            queries = verdict.rule_count,
            findings = verdict.findings.len(),
            "evaluated document"
        );
        Ok(verdict)
    }

    /// Evaluate every document as one combined input.
    ///
    /// The input is a sequence of `{"path": filename, "contents": document}`
    /// mappings in the order given, and the single verdict is identified as
    /// [`COMBINED_FILENAME`].
    pub fn evaluate_combined(
        &self,
        namespaces: &[String],
        documents: &[StructuredDocument],
    ) -> Result<Verdict, PipelineError> {
        let combined = Value::Sequence(
            documents
                .iter()
                .map(|doc| {
                    Value::Mapping(BTreeMap::from([
                        ("path".to_string(), Value::from(doc.id().filename.as_str())),
                        ("contents".to_string(), doc.content().clone()),
                    ]))
                })
                .collect(),
        );
        self.evaluate_value(namespaces, DocumentId::new(COMBINED_FILENAME, 0), &combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confgate_core::{DocumentFormat, Severity};
    use confgate_rules::RuleSource;

    fn bundle(text: &str) -> PolicyBundle {
        PolicyBundle::compile(&[RuleSource::new("test.rules", text)]).unwrap()
    }

    fn doc(json: serde_json::Value) -> StructuredDocument {
        StructuredDocument::new(
            DocumentId::new("doc.json", 0),
            DocumentFormat::Json,
            Value::from(json),
        )
    }

    #[test]
    fn empty_bundle_yields_unevaluated_verdict() {
        let bundle = PolicyBundle::default();
        let data = DataStore::empty();
        let run = TestRun::new(&bundle, &data);
        let namespaces = bundle.select(&Default::default()).unwrap();
        let verdict = run.evaluate(&namespaces, &doc(serde_json::json!({"a": 1}))).unwrap();
        assert!(verdict.findings.is_empty());
        assert!(!verdict.queries_evaluated);
    }

    #[test]
    fn findings_are_tagged_with_provenance() {
        let bundle = bundle("package main\ndeny \"severity is high\" { input.severity == \"high\" }\n");
        let data = DataStore::empty();
        let run = TestRun::new(&bundle, &data);
        let verdict = run
            .evaluate(&["main".to_string()], &doc(serde_json::json!({"severity": "high"})))
            .unwrap();
        assert_eq!(verdict.findings.len(), 1);
        let finding = &verdict.findings[0];
        assert_eq!(finding.severity, Severity::Failure);
        assert_eq!(finding.namespace.as_deref(), Some("main"));
        assert_eq!(finding.rule.as_deref(), Some("deny"));
        assert_eq!(finding.query.as_deref(), Some("data.main.deny"));
        assert_eq!(finding.message, "severity is high");
    }

    #[test]
    fn every_rule_runs_after_a_failure() {
        let bundle = bundle(
            "package main\n\
             deny_a \"a\" { true }\n\
             deny_b \"b\" { true }\n\
             warn_c \"c\" { input.missing }\n",
        );
        let data = DataStore::empty();
        let verdict = TestRun::new(&bundle, &data)
            .evaluate(&["main".to_string()], &doc(serde_json::json!({})))
            .unwrap();
        let messages: Vec<_> = verdict.findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "b"]);
        assert_eq!(verdict.rule_count, 3);
        assert_eq!(verdict.successes(), 1);
    }

    #[test]
    fn evaluation_errors_become_exceptions() {
        let bundle = bundle(
            "package main\n\
             deny_bad { input.replicas > \"two\" }\n\
             deny_good \"good\" { true }\n",
        );
        let data = DataStore::empty();
        let verdict = TestRun::new(&bundle, &data)
            .evaluate(&["main".to_string()], &doc(serde_json::json!({"replicas": 3})))
            .unwrap();
        assert_eq!(verdict.count(Severity::Exception), 1);
        assert_eq!(verdict.count(Severity::Failure), 1);
        let exception = verdict.with_severity(Severity::Exception).next().unwrap();
        assert!(exception.message.starts_with("data.main.deny_bad: "));
        assert_eq!(exception.rule.as_deref(), Some("deny_bad"));
    }

    #[test]
    fn data_is_in_scope() {
        let bundle = bundle(
            "package main\ndeny \"{input.image} not allowed\" { not startswith(input.image, data.registries.allowed) }\n",
        );
        let data = DataStore::from_value(Value::from(
            serde_json::json!({"registries": {"allowed": "ghcr.io/"}}),
        ));
        let run = TestRun::new(&bundle, &data);
        let ok = run
            .evaluate(&["main".to_string()], &doc(serde_json::json!({"image": "ghcr.io/x"})))
            .unwrap();
        assert!(ok.findings.is_empty());
        let bad = run
            .evaluate(&["main".to_string()], &doc(serde_json::json!({"image": "docker.io/x"})))
            .unwrap();
        assert_eq!(bad.findings[0].message, "docker.io/x not allowed");
    }

    #[test]
    fn namespace_without_rules_contributes_nothing() {
        let bundle = PolicyBundle::compile(&[
            RuleSource::new("a.rules", "package empty\n"),
            RuleSource::new("b.rules", "package main\nwarn \"w\" { true }\n"),
        ])
        .unwrap();
        let data = DataStore::empty();
        let namespaces = bundle.select(&Default::default()).unwrap();
        assert_eq!(namespaces, vec!["empty", "main"]);
        let verdict = TestRun::new(&bundle, &data)
            .evaluate(&namespaces, &doc(serde_json::json!({})))
            .unwrap();
        assert_eq!(verdict.rule_count, 1);
        assert!(!verdict.has_failures());
        assert_eq!(verdict.count(Severity::Warning), 1);
    }

    #[test]
    fn cancelled_run_returns_cancelled() {
        let bundle = bundle("package main\ndeny { true }\n");
        let data = DataStore::empty();
        let cancel = CancelFlag::new();
        let run = TestRun::new(&bundle, &data).with_cancel(cancel.clone());
        cancel.cancel();
        let err = run
            .evaluate(&["main".to_string()], &doc(serde_json::json!({})))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
    }

    #[test]
    fn cancelling_between_documents_stops_later_ones() {
        let bundle = bundle("package main\ndeny { true }\n");
        let data = DataStore::empty();
        let cancel = CancelFlag::new();
        let run = TestRun::new(&bundle, &data).with_cancel(cancel.clone());
        let namespaces = vec!["main".to_string()];

        let first = run.evaluate(&namespaces, &doc(serde_json::json!({}))).unwrap();
        assert_eq!(first.rule_count, 1);

        cancel.cancel();
        let err = run
            .evaluate(&namespaces, &doc(serde_json::json!({})))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
        let err = run
            .evaluate_combined(&namespaces, &[doc(serde_json::json!({}))])
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
    }

    #[test]
    fn combined_input_wraps_every_document() {
        let bundle = bundle(
            "package main\n\
             deny \"{count(input)} documents\" { count(input) > 1 }\n\
             warn \"{d.path}\" { some d in input; d.contents.kind == \"Secret\" }\n",
        );
        let data = DataStore::empty();
        let docs = vec![
            StructuredDocument::new(
                DocumentId::new("a.yaml", 0),
                DocumentFormat::Yaml,
                Value::from(serde_json::json!({"kind": "Secret"})),
            ),
            StructuredDocument::new(
                DocumentId::new("b.yaml", 0),
                DocumentFormat::Yaml,
                Value::from(serde_json::json!({"kind": "Service"})),
            ),
        ];
        let verdict = TestRun::new(&bundle, &data)
            .evaluate_combined(&["main".to_string()], &docs)
            .unwrap();
        assert_eq!(verdict.document, DocumentId::new(COMBINED_FILENAME, 0));
        let messages: Vec<_> = verdict.findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["2 documents", "a.yaml"]);
    }
}

//! # confgate-rules: Rule Language
//!
//! A small declarative rule language, kept behind a narrow API so the rest
//! of the pipeline treats it as an external query engine:
//!
//! - [`compile`] turns rule sources into an immutable [`RuleSet`], or fails
//!   with a [`CompileError`] naming the source, line and column.
//! - [`RuleSet::namespaces`] lists the declared packages.
//! - [`CompiledRule::query`] evaluates one rule against a document and the
//!   auxiliary data, returning its messages.
//!
//! ## Source Format
//!
//! ```text
//! package kubernetes.main
//!
//! deny_latest_tag "image {c.image} uses the latest tag" {
//!     some c in input.spec.containers
//!     endswith(c.image, ":latest")
//! }
//! ```
//!
//! Rule names start with `deny`, `violation` (failures) or `warn`
//! (warnings). A body is a conjunction of statements; `some` iterates, and
//! every satisfying binding renders one message. References to missing keys
//! are *undefined*: the statement fails quietly. Type errors, division by
//! zero and bad builtin arguments are [`EvalError`]s.

use std::collections::{BTreeMap, BTreeSet};

use confgate_core::{CompileError, Severity, Value};

mod ast;
pub mod builtins;
mod error;
mod eval;
mod lexer;
mod parser;

pub use ast::RuleKind;
pub use error::EvalError;

use ast::Definition;

/// One named rule source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSource {
    /// Source name used in diagnostics, usually the file path.
    pub name: String,
    /// Rule source text.
    pub text: String,
}

impl RuleSource {
    /// Create a rule source.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// A rule with every definition that shares its name within one namespace.
///
/// Multiple definitions are incremental: the rule's messages are the union
/// of what each definition produces.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    namespace: String,
    name: String,
    kind: RuleKind,
    definitions: Vec<Definition>,
}

impl CompiledRule {
    /// Rule name, e.g. `deny_latest_tag`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace (package) the rule belongs to.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Rule classification.
    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    /// Severity of the findings the rule produces.
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// Fully qualified query path: `data.<namespace>.<name>`.
    pub fn query_path(&self) -> String {
        format!("data.{}.{}", self.namespace, self.name)
    }

    /// Where each definition was declared, as `(source name, line)`.
    pub fn origins(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.definitions
            .iter()
            .map(|def| (def.source_name.as_str(), def.line))
    }

    /// Evaluate the rule against `input` with `data` in scope.
    ///
    /// Returns the distinct messages produced, sorted. An empty result means
    /// the rule did not fire.
    pub fn query(&self, input: &Value, data: &Value) -> Result<Vec<String>, EvalError> {
        let ctx = eval::Context { input, data };
        let mut out = BTreeSet::new();
        for def in &self.definitions {
            eval::messages(def, &self.name, &ctx, &mut out)?;
        }
        Ok(out.into_iter().collect())
    }
}

/// Compiled rules grouped by namespace.
///
/// Namespaces iterate in lexicographic order; rules within a namespace keep
/// source order (sources sorted by name, then declaration order).
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    namespaces: BTreeMap<String, Vec<CompiledRule>>,
}

impl RuleSet {
    /// Declared namespaces, sorted and deduplicated.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> + '_ {
        self.namespaces.keys().map(String::as_str)
    }

    /// Whether any source declared `namespace`.
    pub fn contains_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    /// Rules of `namespace`, empty if it declares none or does not exist.
    pub fn rules(&self, namespace: &str) -> &[CompiledRule] {
        self.namespaces
            .get(namespace)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of rules across namespaces.
    pub fn rule_count(&self) -> usize {
        self.namespaces.values().map(Vec::len).sum()
    }

    /// Whether no namespace was declared.
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

/// Compile rule sources into a [`RuleSet`].
///
/// Compilation is all-or-nothing: the first error aborts and no rule set is
/// produced. Sources are processed in name order, so the result does not
/// depend on the order they were supplied in.
pub fn compile(sources: &[RuleSource]) -> Result<RuleSet, CompileError> {
    let mut ordered: Vec<&RuleSource> = sources.iter().collect();
    ordered.sort_by(|a, b| a.name.cmp(&b.name));

    let mut set = RuleSet::default();
    for source in ordered {
        let module = parser::parse_module(&source.name, &source.text)?;
        let rules = set.namespaces.entry(module.package.clone()).or_default();
        for parsed in module.rules {
            match rules.iter_mut().find(|rule| rule.name == parsed.name) {
                Some(rule) => rule.definitions.push(parsed.definition),
                None => rules.push(CompiledRule {
                    namespace: module.package.clone(),
                    name: parsed.name,
                    kind: parsed.kind,
                    definitions: vec![parsed.definition],
                }),
            }
        }
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_rules_by_namespace() {
        let set = compile(&[
            RuleSource::new("b.rules", "package main\nwarn_b { true }\n"),
            RuleSource::new("a.rules", "package main\ndeny_a { true }\n"),
            RuleSource::new("c.rules", "package extra\n"),
        ])
        .unwrap();
        assert_eq!(set.namespaces().collect::<Vec<_>>(), vec!["extra", "main"]);
        let names: Vec<_> = set.rules("main").iter().map(CompiledRule::name).collect();
        assert_eq!(names, vec!["deny_a", "warn_b"]);
        assert!(set.rules("extra").is_empty());
        assert!(set.rules("nope").is_empty());
        assert_eq!(set.rule_count(), 2);
    }

    #[test]
    fn same_name_definitions_merge() {
        let set = compile(&[RuleSource::new(
            "a.rules",
            "package p\ndeny \"one\" { input.a }\ndeny \"two\" { input.b }\n",
        )])
        .unwrap();
        let rules = set.rules("p");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].origins().collect::<Vec<_>>(), vec![("a.rules", 2), ("a.rules", 3)]);
        let input = Value::mapping([("a", Value::Bool(true)), ("b", Value::Bool(true))]);
        assert_eq!(rules[0].query(&input, &Value::Null).unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn query_path_and_severity() {
        let set = compile(&[RuleSource::new("a.rules", "package k8s.main\nviolation_x { true }\n")])
            .unwrap();
        let rule = &set.rules("k8s.main")[0];
        assert_eq!(rule.query_path(), "data.k8s.main.violation_x");
        assert_eq!(rule.severity(), Severity::Failure);
        assert_eq!(rule.kind(), RuleKind::Violation);
        assert_eq!(rule.namespace(), "k8s.main");
    }

    #[test]
    fn first_error_aborts_compilation() {
        let err = compile(&[
            RuleSource::new("good.rules", "package p\ndeny { true }\n"),
            RuleSource::new("bad.rules", "package p\ndeny { input. }\n"),
        ])
        .unwrap_err();
        assert_eq!(err.source_name, "bad.rules");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn empty_source_list_is_empty_set() {
        let set = compile(&[]).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.namespaces().count(), 0);
    }
}

//! Syntax tree for compiled rule definitions.
//!
//! Variables are resolved to environment slots at parse time, so the
//! interpreter never looks names up.

use confgate_core::{Severity, Value};

/// Rule classification, derived from the rule name's prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleKind {
    /// `deny` or `deny_*`.
    Deny,
    /// `violation` or `violation_*`.
    Violation,
    /// `warn` or `warn_*`.
    Warn,
}

impl RuleKind {
    /// Classify a rule name. Returns `None` for names that are not rules.
    pub fn from_name(name: &str) -> Option<Self> {
        for (prefix, kind) in [
            ("deny", Self::Deny),
            ("violation", Self::Violation),
            ("warn", Self::Warn),
        ] {
            if let Some(rest) = name.strip_prefix(prefix) {
                if rest.is_empty() || (rest.len() > 1 && rest.starts_with('_')) {
                    return Some(kind);
                }
            }
        }
        None
    }

    /// Severity of the findings the rule produces.
    pub fn severity(&self) -> Severity {
        match self {
            Self::Deny | Self::Violation => Severity::Failure,
            Self::Warn => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    pub(crate) fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Array(Vec<Expr>),
    Input,
    Data,
    Local(usize),
    Field(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(&'static str, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stmt {
    /// Holds when the value is defined and not `false`.
    Expr(Expr),
    /// Holds when the value is undefined or `false`.
    Not(Expr),
    /// Binds the next slot.
    Assign(Expr),
    /// Binds the next one or two slots for every element of the domain.
    Some { with_key: bool, domain: Expr },
    /// Holds when every element of the domain satisfies `body`.
    Every {
        with_key: bool,
        domain: Expr,
        body: Vec<Stmt>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TemplatePart {
    Text(String),
    Expr(Expr),
}

/// One `NAME "template" { body }` definition.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Definition {
    pub source_name: String,
    pub line: usize,
    pub template: Option<Vec<TemplatePart>>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedRule {
    pub name: String,
    pub kind: RuleKind,
    pub definition: Definition,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Module {
    pub package: String,
    pub rules: Vec<ParsedRule>,
}

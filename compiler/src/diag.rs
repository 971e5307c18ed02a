// diag.rs — Unified issue model
//
// Provides the issue types shared by every compiler pass: the structural
// schema check, the semantic validator and the orchestrator that merges them.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::collections::HashSet;
use std::fmt;

use serde::{Serialize, Serializer};

// ── Issue code ───────────────────────────────────────────────────────────

/// A stable issue code (e.g., `UNKNOWN_OPERATOR`, `SCHEMA_INVALID_TICK`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
/// Once assigned, a code must never be reassigned to a different semantic
/// meaning: editors key their rendering on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for DiagCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    // Structural (schema) errors.
    pub const SCHEMA_INVALID_ROOT: DiagCode = DiagCode("SCHEMA_INVALID_ROOT");
    pub const SCHEMA_INVALID_VERSION: DiagCode = DiagCode("SCHEMA_INVALID_VERSION");
    pub const SCHEMA_MISSING_FIELD: DiagCode = DiagCode("SCHEMA_MISSING_FIELD");
    pub const SCHEMA_UNKNOWN_FIELD: DiagCode = DiagCode("SCHEMA_UNKNOWN_FIELD");
    pub const SCHEMA_INVALID_TYPE: DiagCode = DiagCode("SCHEMA_INVALID_TYPE");
    pub const SCHEMA_EMPTY_STRING: DiagCode = DiagCode("SCHEMA_EMPTY_STRING");
    pub const SCHEMA_INVALID_TICK: DiagCode = DiagCode("SCHEMA_INVALID_TICK");
    pub const SCHEMA_INVERTED_INTERVAL: DiagCode = DiagCode("SCHEMA_INVERTED_INTERVAL");
    pub const SCHEMA_DUPLICATE_INTERVAL: DiagCode = DiagCode("SCHEMA_DUPLICATE_INTERVAL");
    pub const SCHEMA_UNKNOWN_INTERVAL: DiagCode = DiagCode("SCHEMA_UNKNOWN_INTERVAL");
    pub const SCHEMA_INVALID_COMPARATOR: DiagCode = DiagCode("SCHEMA_INVALID_COMPARATOR");
    pub const SCHEMA_INVALID_THRESHOLD: DiagCode = DiagCode("SCHEMA_INVALID_THRESHOLD");
    pub const SCHEMA_INVALID_RHO: DiagCode = DiagCode("SCHEMA_INVALID_RHO");
    pub const SCHEMA_INVALID_CONSTRAINT_KIND: DiagCode =
        DiagCode("SCHEMA_INVALID_CONSTRAINT_KIND");
    pub const SCHEMA_INVALID_PARAM_KEY: DiagCode = DiagCode("SCHEMA_INVALID_PARAM_KEY");

    // Semantic errors.
    pub const UNKNOWN_OPERATOR: DiagCode = DiagCode("UNKNOWN_OPERATOR");
    pub const UNKNOWN_INTERVAL_REF: DiagCode = DiagCode("UNKNOWN_INTERVAL_REF");
    pub const UNKNOWN_CONSTRAINT_REF: DiagCode = DiagCode("UNKNOWN_CONSTRAINT_REF");
    pub const CONSTRAINT_NOT_SUPPORTED: DiagCode = DiagCode("CONSTRAINT_NOT_SUPPORTED");
    pub const PARAM_OUT_OF_RANGE: DiagCode = DiagCode("PARAM_OUT_OF_RANGE");
    pub const INVALID_COMPARATOR: DiagCode = DiagCode("INVALID_COMPARATOR");

    // Warnings.
    pub const MISSING_PARAMS: DiagCode = DiagCode("MISSING_PARAMS");
    pub const NON_CANONICAL_PARAM_KEYS: DiagCode = DiagCode("NON_CANONICAL_PARAM_KEYS");
    pub const REDUNDANT_CONSTRAINT: DiagCode = DiagCode("REDUNDANT_CONSTRAINT");
    pub const SUSPICIOUS_THRESHOLDS: DiagCode = DiagCode("SUSPICIOUS_THRESHOLDS");
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagLevel {
    Error,
    Warning,
}

impl DiagLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        }
    }
}

// ── Issue ────────────────────────────────────────────────────────────────

/// A compiler issue emitted by any pass.
///
/// `path` is a `$`-rooted locator into the authored document
/// (`$.relations[0].params.delta`). Issues are plain values: passes create
/// them, the orchestrator merges, dedupes and sorts them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Issue {
    pub code: DiagCode,
    pub severity: DiagLevel,
    pub path: String,
    pub message: String,
}

impl Issue {
    pub fn new(
        severity: DiagLevel,
        code: DiagCode,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            severity,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn error(code: DiagCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, code, path, message)
    }

    pub fn warning(code: DiagCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Warning, code, path, message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagLevel::Error
    }

    /// True when this issue is located at `scope` or anywhere beneath it.
    pub fn is_within(&self, scope: &str) -> bool {
        match self.path.strip_prefix(scope) {
            Some(rest) => rest.is_empty() || rest.starts_with('.') || rest.starts_with('['),
            None => false,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.severity.as_str(), self.code)?;
        if !self.path.is_empty() {
            write!(f, " {}", self.path)?;
        }
        write!(f, ": {}", self.message)
    }
}

// ── Collection helpers ───────────────────────────────────────────────────

pub fn has_errors(issues: &[Issue]) -> bool {
    issues.iter().any(Issue::is_error)
}

/// Sort by the stable composite key `(path, code, message)`.
pub fn sort_issues(issues: &mut [Issue]) {
    issues.sort_by(|a, b| {
        (a.path.as_str(), a.code.0, a.message.as_str()).cmp(&(
            b.path.as_str(),
            b.code.0,
            b.message.as_str(),
        ))
    });
}

/// Drop repeated `(severity, code, path, message)` tuples, keeping the first.
pub fn dedupe_issues(issues: Vec<Issue>) -> Vec<Issue> {
    let mut seen = HashSet::new();
    issues
        .into_iter()
        .filter(|issue| seen.insert(issue.clone()))
        .collect()
}

// ── Path building ────────────────────────────────────────────────────────

/// Root of every document path.
pub const ROOT: &str = "$";

/// `$.a` + `b` → `$.a.b`
pub fn key_path(base: &str, key: &str) -> String {
    format!("{base}.{key}")
}

/// `$.a` + `3` → `$.a[3]`
pub fn index_path(base: &str, index: usize) -> String {
    format!("{base}[{index}]")
}

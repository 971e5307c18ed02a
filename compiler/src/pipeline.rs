// pipeline.rs — Compilation state and pass orchestration
//
// Holds every pass artifact in one struct and runs the minimal set of passes
// for a given terminal PassId. `compile` / `compile_with` run the whole
// pipeline and shape the result an editor consumes.
//
// Preconditions: the catalog passed in has been loaded successfully.
// Postconditions: artifacts for the required passes are populated, or
//   `has_error` is set and the pipeline stopped after the failing pass.
//   Warnings are deduplicated by (severity, code, path, message) and, like
//   errors, sorted by (path, code, message).
// Failure modes: any pass producing error-level issues.
// Side effects: calls `on_pass_complete` after each pass; emits `tracing`
//   debug events with per-pass timing.

use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::adapt::adapt;
use crate::catalog::{self, Catalog};
use crate::diag::{dedupe_issues, has_errors, index_path, sort_issues, Issue};
use crate::model::{ExplainEntry, PipelineModel, ResolvedModel};
use crate::pass::{required_passes, PassId};
use crate::resolve::resolve_model;
use crate::schema::{validate_document, Document};
use crate::serialize::serialize_model;
use crate::validate::{missing_params_issue, params_missing, validate_model};

// ── Provenance ─────────────────────────────────────────────────────────────

/// Provenance metadata for reproducible builds and cache keys.
///
/// `source_hash`: SHA-256 of the input document's compact JSON.
/// `catalog_fingerprint`: SHA-256 of `Catalog::canonical_json()`.
/// `compiler_version`: crate version from `Cargo.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub source_hash: [u8; 32],
    pub catalog_fingerprint: [u8; 32],
    pub compiler_version: &'static str,
}

#[derive(Serialize)]
struct BuildInfo<'a> {
    source_hash: String,
    catalog_fingerprint: String,
    catalog_schema_version: &'a str,
    compiler_version: &'a str,
}

impl Provenance {
    /// Hex string of the source hash (64 characters).
    pub fn source_hash_hex(&self) -> String {
        bytes_to_hex(&self.source_hash)
    }

    /// Hex string of the catalog fingerprint (64 characters).
    pub fn catalog_fingerprint_hex(&self) -> String {
        bytes_to_hex(&self.catalog_fingerprint)
    }

    /// Pretty JSON for `--emit build-info`, newline-terminated.
    pub fn to_json(&self, catalog_schema_version: &str) -> String {
        let info = BuildInfo {
            source_hash: self.source_hash_hex(),
            catalog_fingerprint: self.catalog_fingerprint_hex(),
            catalog_schema_version,
            compiler_version: self.compiler_version,
        };
        let mut out = serde_json::to_string_pretty(&info).unwrap_or_default();
        out.push('\n');
        out
    }
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(64);
    for b in bytes {
        let _ = write!(s, "{:02x}", b);
    }
    s
}

/// Compute provenance from the raw input and the catalog in use.
pub fn compute_provenance(input: &Value, catalog: &Catalog) -> Provenance {
    let source_hash = {
        let mut hasher = Sha256::new();
        hasher.update(input.to_string().as_bytes());
        let result = hasher.finalize();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&result);
        hash
    };

    Provenance {
        source_hash,
        catalog_fingerprint: catalog.fingerprint(),
        compiler_version: env!("CARGO_PKG_VERSION"),
    }
}

// ── Artifact storage ───────────────────────────────────────────────────────

/// Holds all compilation artifacts and accumulated issues.
pub struct CompilationState<'c> {
    pub catalog: &'c Catalog,
    pub input: Value,
    pub document: Option<Document>,
    pub pipeline: Option<PipelineModel>,
    pub resolved: Option<ResolvedModel>,
    pub explain: Vec<ExplainEntry>,
    pub iseql: Option<String>,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub has_error: bool,
    provenance: Option<Provenance>,
}

impl<'c> CompilationState<'c> {
    pub fn new(input: Value, catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            input,
            document: None,
            pipeline: None,
            resolved: None,
            explain: Vec::new(),
            iseql: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            has_error: false,
            provenance: None,
        }
    }

    /// Build-info for this run. The input is hashed on first request only;
    /// `run_pipeline` never asks.
    pub fn provenance(&mut self) -> &Provenance {
        self.provenance
            .get_or_insert_with(|| compute_provenance(&self.input, self.catalog))
    }

    /// Shape the final result. A failed run keeps its issues and drops every
    /// artifact.
    pub fn into_output(self) -> CompileOutput {
        if self.has_error {
            return CompileOutput {
                artifact: None,
                resolved_model: None,
                explain: Vec::new(),
                errors: self.errors,
                warnings: self.warnings,
            };
        }
        CompileOutput {
            artifact: self.iseql,
            resolved_model: self.resolved,
            explain: self.explain,
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

// ── Error type ─────────────────────────────────────────────────────────────

/// Pipeline execution stopped. The issues are in `CompilationState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{} pass reported errors", .failing_pass.name())]
pub struct PipelineError {
    pub failing_pass: PassId,
}

// ── Pass bookkeeping ───────────────────────────────────────────────────────

/// Per-pass post-processing: callback, accumulate, log, error check.
fn finish_pass(
    state: &mut CompilationState<'_>,
    pass_id: PassId,
    issues: Vec<Issue>,
    elapsed: Duration,
    on_pass_complete: &mut impl FnMut(PassId, &[Issue]),
) -> Result<(), PipelineError> {
    on_pass_complete(pass_id, &issues);
    let is_err = has_errors(&issues);

    let (errors, warnings): (Vec<Issue>, Vec<Issue>) =
        issues.into_iter().partition(Issue::is_error);
    state.errors.extend(errors);
    sort_issues(&mut state.errors);
    let mut merged = std::mem::take(&mut state.warnings);
    merged.extend(warnings);
    state.warnings = dedupe_issues(merged);
    sort_issues(&mut state.warnings);

    debug!(
        pass = pass_id.name(),
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        errors = state.errors.len(),
        warnings = state.warnings.len(),
        "pass complete"
    );

    if is_err {
        state.has_error = true;
        return Err(PipelineError {
            failing_pass: pass_id,
        });
    }
    Ok(())
}

/// MISSING_PARAMS straight from the validated document, one per relation
/// whose params are absent, null or empty.
fn structural_missing_params(document: &Document) -> Vec<Issue> {
    let origin = document.origin();
    document
        .relation_params()
        .into_iter()
        .enumerate()
        .filter(|(_, (_, params))| params_missing(*params))
        .map(|(i, (id, _))| missing_params_issue(&index_path(&origin.relations, i), id))
        .collect()
}

// ── Pipeline runner ────────────────────────────────────────────────────────

/// Run the minimal set of passes to produce `terminal`.
///
/// Per-pass sequence: execute → on_pass_complete(callback) → log → error check.
/// Structural errors stop the run before adaptation, so a rejected document
/// never reaches semantic validation. Semantic errors stop it before
/// resolution.
pub fn run_pipeline(
    state: &mut CompilationState<'_>,
    terminal: PassId,
    mut on_pass_complete: impl FnMut(PassId, &[Issue]),
) -> Result<(), PipelineError> {
    for pass_id in required_passes(terminal) {
        let t = Instant::now();
        match pass_id {
            PassId::Schema => {
                let result = validate_document(&state.input);
                state.document = result.document;
                finish_pass(state, pass_id, result.issues, t.elapsed(), &mut on_pass_complete)?;
            }
            PassId::Adapt => {
                let Some(document) = state.document.as_ref() else {
                    return Err(PipelineError {
                        failing_pass: pass_id,
                    });
                };
                let issues = structural_missing_params(document);
                state.pipeline = Some(adapt(document));
                finish_pass(state, pass_id, issues, t.elapsed(), &mut on_pass_complete)?;
            }
            PassId::Validate => {
                let Some(model) = state.pipeline.as_ref() else {
                    return Err(PipelineError {
                        failing_pass: pass_id,
                    });
                };
                let result = validate_model(model, state.catalog);
                let mut issues = result.errors;
                issues.extend(result.warnings);
                finish_pass(state, pass_id, issues, t.elapsed(), &mut on_pass_complete)?;
            }
            PassId::Resolve => {
                let Some(model) = state.pipeline.as_ref() else {
                    return Err(PipelineError {
                        failing_pass: pass_id,
                    });
                };
                let result = resolve_model(model, state.catalog);
                state.resolved = Some(result.model);
                state.explain = result.explain;
                finish_pass(state, pass_id, Vec::new(), t.elapsed(), &mut on_pass_complete)?;
            }
            PassId::Serialize => {
                let Some(model) = state.resolved.as_ref() else {
                    return Err(PipelineError {
                        failing_pass: pass_id,
                    });
                };
                state.iseql = Some(serialize_model(model, state.catalog));
                finish_pass(state, pass_id, Vec::new(), t.elapsed(), &mut on_pass_complete)?;
            }
        }
    }
    Ok(())
}

// ── Compiler entry points ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Accepted,
    Rejected,
}

/// The compiler's answer for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    pub artifact: Option<String>,
    pub resolved_model: Option<ResolvedModel>,
    pub explain: Vec<ExplainEntry>,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl CompileOutput {
    pub fn outcome(&self) -> Outcome {
        if self.errors.is_empty() && self.artifact.is_some() {
            Outcome::Accepted
        } else {
            Outcome::Rejected
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.outcome() == Outcome::Accepted
    }
}

/// Compile against the embedded operator catalog.
pub fn compile(input: &Value) -> CompileOutput {
    compile_with(catalog::builtin(), input)
}

/// Compile against an explicit catalog.
pub fn compile_with(catalog: &Catalog, input: &Value) -> CompileOutput {
    let mut state = CompilationState::new(input.clone(), catalog);
    // A failed run is recorded in `state.has_error`.
    let _ = run_pipeline(&mut state, PassId::Serialize, |_, _| {});
    state.into_output()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::codes;
    use serde_json::json;

    fn bef_doc(params: Value) -> Value {
        json!({
            "schemaVersion": "1",
            "id": "m1",
            "name": "Bef demo",
            "intervals": [
                {"id": "i1", "start": 0, "end": 10, "predicate": {"name": "p"}},
                {"id": "i2", "start": 12, "end": 20, "predicate": {"name": "q"}}
            ],
            "constraints": {"temporal": [
                {"id": "e1", "leftIntervalId": "i1", "rightIntervalId": "i2",
                 "operatorKey": "Bef", "params": params}
            ]}
        })
    }

    #[test]
    fn empty_params_compile_with_one_missing_params_warning() {
        let out = compile(&bef_doc(json!({})));
        assert_eq!(out.outcome(), Outcome::Accepted);
        assert!(out.errors.is_empty());
        let missing: Vec<_> = out
            .warnings
            .iter()
            .filter(|w| w.code == codes::MISSING_PARAMS)
            .collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].path, "$.constraints.temporal[0].params");
        assert!(out.artifact.as_deref().is_some_and(|a| a.contains("@i1 Bef @i2")));
    }

    #[test]
    fn structural_failure_stops_before_semantics() {
        let mut doc = bef_doc(json!({}));
        doc.as_object_mut().unwrap().remove("schemaVersion");
        let out = compile(&doc);
        assert_eq!(out.outcome(), Outcome::Rejected);
        assert!(out.artifact.is_none());
        assert!(out.resolved_model.is_none());
        assert!(!out.errors.is_empty());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn semantic_errors_keep_warnings_but_drop_artifact() {
        let mut doc = bef_doc(Value::Null);
        doc["constraints"]["temporal"][0]["operatorKey"] = json!("Nope");
        let out = compile(&doc);
        assert_eq!(out.outcome(), Outcome::Rejected);
        assert!(out.artifact.is_none());
        assert!(out.explain.is_empty());
        assert_eq!(out.errors[0].code, codes::UNKNOWN_OPERATOR);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].code, codes::MISSING_PARAMS);
    }

    #[test]
    fn run_pipeline_honours_terminal_pass() {
        let catalog = catalog::builtin();
        let mut state = CompilationState::new(bef_doc(json!({"delta": 3})), catalog);
        let mut seen = Vec::new();
        run_pipeline(&mut state, PassId::Validate, |p, _| seen.push(p)).unwrap();
        assert_eq!(seen, vec![PassId::Schema, PassId::Adapt, PassId::Validate]);
        assert!(state.pipeline.is_some());
        assert!(state.resolved.is_none());
        assert!(state.iseql.is_none());
    }

    #[test]
    fn failing_pass_is_reported() {
        let catalog = catalog::builtin();
        let mut state = CompilationState::new(json!([]), catalog);
        let err = run_pipeline(&mut state, PassId::Serialize, |_, _| {}).unwrap_err();
        assert_eq!(err.failing_pass, PassId::Schema);
        assert_eq!(err.to_string(), "schema pass reported errors");
        assert!(state.has_error);
    }

    #[test]
    fn provenance_is_stable_and_hex_encoded() {
        let doc = bef_doc(json!({}));
        let a = compute_provenance(&doc, catalog::builtin());
        let b = compute_provenance(&doc.clone(), catalog::builtin());
        assert_eq!(a, b);
        assert_eq!(a.source_hash_hex().len(), 64);
        assert_eq!(a.catalog_fingerprint, catalog::builtin().fingerprint());
        let info: Value = serde_json::from_str(&a.to_json("1.0")).unwrap();
        assert_eq!(info["compiler_version"], json!(env!("CARGO_PKG_VERSION")));
        let other = compute_provenance(&bef_doc(json!({"delta": 1})), catalog::builtin());
        assert_ne!(a.source_hash, other.source_hash);
    }

    #[test]
    fn provenance_is_computed_only_when_asked() {
        let doc = bef_doc(json!({}));
        let mut state = CompilationState::new(doc.clone(), catalog::builtin());
        run_pipeline(&mut state, PassId::Serialize, |_, _| {}).unwrap();
        assert!(state.provenance.is_none());
        let expected = compute_provenance(&doc, catalog::builtin());
        assert_eq!(state.provenance(), &expected);
        assert!(state.provenance.is_some());
    }
}

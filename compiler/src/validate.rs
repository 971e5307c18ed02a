// validate.rs — Semantic validation against the operator catalog
//
// Runs the catalog-aware checks over the shape-tolerant pipeline model:
// operator existence, dangling interval/constraint references, constraint
// compatibility, parameter domains, and the advisory warnings (missing or
// non-canonical parameters, redundant constraints, fully permissive
// thresholds).
//
// Preconditions: the model may come from either document shape or straight
//   from JSON; nothing about it is assumed beyond its types.
// Postconditions: `errors` and `warnings` are each sorted by (path, code, message).
// Failure modes: none (problems are returned as issues).
// Side effects: none.

use std::collections::HashSet;

use serde_json::Value;

use crate::catalog::{Catalog, OperatorEntry};
use crate::diag::{codes, index_path, key_path, sort_issues, Issue};
use crate::model::{
    non_negative, AuthoredParams, Comparator, ConstraintKind, ExtraConstraint, ParamKey,
    ParamValue, PipelineModel, Threshold,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationResult {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

/// True when a relation carries no parameters at all (`None`, `null`, `{}`).
pub fn params_missing(params: Option<&AuthoredParams>) -> bool {
    params.map_or(true, AuthoredParams::is_empty)
}

/// The warning for a relation without parameters. Shared by the structural
/// pass and the semantic pass so both produce the identical issue.
pub fn missing_params_issue(relation_path: &str, relation_id: &str) -> Issue {
    Issue::warning(
        codes::MISSING_PARAMS,
        key_path(relation_path, "params"),
        format!("Missing params for relation '{relation_id}' (resolver will fill defaults)"),
    )
}

/// Validate every relation and extra constraint of `model`.
pub fn validate_model(model: &PipelineModel, catalog: &Catalog) -> ValidationResult {
    let interval_ids: HashSet<&str> = model.intervals.iter().map(|i| i.id.as_str()).collect();
    let constraint_ids: HashSet<&str> = model.constraints.iter().map(|c| c.id.as_str()).collect();

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (i, constraint) in model.constraints.iter().enumerate() {
        if let Some(why) = redundancy(constraint) {
            warnings.push(Issue::warning(
                codes::REDUNDANT_CONSTRAINT,
                model.constraint_path(i),
                why,
            ));
        }
    }

    for (i, rel) in model.relations.iter().enumerate() {
        let base = model.relation_path(i);
        let origin = &model.origin;

        // 1. operator
        let op = catalog.lookup(&rel.operator_id);
        if op.is_none() {
            errors.push(Issue::error(
                codes::UNKNOWN_OPERATOR,
                key_path(&base, origin.operator_key),
                format!("Unknown operatorId '{}'", rel.operator_id),
            ));
        }

        // 2. interval references
        for (key, id) in [
            (origin.left_key, &rel.left_interval_id),
            (origin.right_key, &rel.right_interval_id),
        ] {
            if !interval_ids.contains(id.as_str()) {
                errors.push(Issue::error(
                    codes::UNKNOWN_INTERVAL_REF,
                    key_path(&base, key),
                    format!("{key} '{id}' not found"),
                ));
            }
        }

        // 3. constraint references
        let refs_path = key_path(&base, "constraintIds");
        for (k, cid) in rel.constraint_ids.iter().enumerate() {
            if !constraint_ids.contains(cid.as_str()) {
                errors.push(Issue::error(
                    codes::UNKNOWN_CONSTRAINT_REF,
                    index_path(&refs_path, k),
                    format!("constraintId '{cid}' not found"),
                ));
            }
        }

        // 4. missing parameters
        let params = rel.params.as_ref().filter(|p| !p.is_empty());
        if params.is_none() {
            warnings.push(missing_params_issue(&base, &rel.id));
        }

        // 5. alternate spellings
        if let Some(p) = params {
            let greek = p.greek_keys();
            if !greek.is_empty() {
                warnings.push(Issue::warning(
                    codes::NON_CANONICAL_PARAM_KEYS,
                    key_path(&base, "params"),
                    format!("Non-canonical (Greek) param keys: {}", greek.join(", ")),
                ));
            }
        }

        // 6. constraint compatibility
        if let Some(op) = op {
            for (k, cid) in rel.constraint_ids.iter().enumerate() {
                let Some(c) = model.constraint(cid) else {
                    continue;
                };
                if !op.compatibility.supports(&c.kind) {
                    errors.push(Issue::error(
                        codes::CONSTRAINT_NOT_SUPPORTED,
                        index_path(&refs_path, k),
                        format!(
                            "Constraint '{}' not supported by operator '{}'",
                            c.kind, rel.operator_id
                        ),
                    ));
                }
            }
        }

        // 7. parameter domains
        let param_errors = match params {
            Some(p) => {
                let before = errors.len();
                check_param_domains(p, op, &rel.operator_id, &key_path(&base, "params"), &mut errors);
                errors.len() - before
            }
            None => 0,
        };

        // 8. an invalid value supersedes this relation's advisory warnings
        if params.is_some() && param_errors > 0 {
            warnings.retain(|w| !w.is_within(&base));
        }

        // 9. fully permissive thresholds
        if op.is_some() {
            let infinite = |key| {
                params
                    .and_then(|p| p.effective(key))
                    .and_then(Threshold::from_value)
                    .is_some_and(Threshold::is_infinite)
            };
            if infinite(ParamKey::Delta) && infinite(ParamKey::Epsilon) {
                warnings.push(Issue::warning(
                    codes::SUSPICIOUS_THRESHOLDS,
                    base.clone(),
                    format!(
                        "Both delta and epsilon are ∞ (fully permissive) for '{}'",
                        rel.operator_id
                    ),
                ));
            }
        }
    }

    sort_issues(&mut errors);
    sort_issues(&mut warnings);
    ValidationResult { errors, warnings }
}

fn check_param_domains(
    params: &AuthoredParams,
    op: Option<&OperatorEntry>,
    operator_id: &str,
    params_path: &str,
    errors: &mut Vec<Issue>,
) {
    for key in ParamKey::ALL {
        let Some(raw) = params.effective(key) else {
            continue;
        };
        // Point at the spelling that carried the effective value.
        let name = if params.latin.get(key).is_some() {
            key.latin()
        } else {
            key.greek()
        };
        let path = key_path(params_path, name);

        let typed = match key {
            ParamKey::Zeta | ParamKey::Eta => match Comparator::from_value(raw) {
                Some(c) => ParamValue::Comparator(c),
                None => {
                    errors.push(Issue::error(
                        codes::INVALID_COMPARATOR,
                        path,
                        format!("Invalid {key} comparator '{}'", display_raw(raw)),
                    ));
                    continue;
                }
            },
            ParamKey::Delta | ParamKey::Epsilon => match Threshold::from_value(raw) {
                Some(t) => ParamValue::Threshold(t),
                None => {
                    errors.push(Issue::error(
                        codes::PARAM_OUT_OF_RANGE,
                        path,
                        format!("{key} must be >=0 or '∞'"),
                    ));
                    continue;
                }
            },
            ParamKey::Rho => match non_negative(raw) {
                Some(n) => ParamValue::Number(n),
                None => {
                    errors.push(Issue::error(
                        codes::PARAM_OUT_OF_RANGE,
                        path,
                        "rho must be >=0",
                    ));
                    continue;
                }
            },
        };

        // Operator-specific narrowing of the closed domains.
        if let Some(op) = op {
            if !op.domains.admits(typed) {
                let code = match typed {
                    ParamValue::Comparator(_) => codes::INVALID_COMPARATOR,
                    _ => codes::PARAM_OUT_OF_RANGE,
                };
                errors.push(Issue::error(
                    code,
                    path,
                    format!("{key} value {typed} is not allowed for operator '{operator_id}'"),
                ));
            }
        }
    }
}

fn display_raw(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn redundancy(c: &ExtraConstraint) -> Option<&'static str> {
    let is_zero = |key: &str| c.field(key).and_then(Value::as_f64) == Some(0.0);
    match c.kind {
        ConstraintKind::OverlapPercentage if is_zero("value") => {
            Some("overlapPercentage=0 is redundant (no restriction)")
        }
        ConstraintKind::Robustness if is_zero("value") => Some("robustness=0 is redundant (no slack)"),
        ConstraintKind::Cardinality if is_zero("min") => {
            Some("cardinality.min=0 is redundant (no restriction)")
        }
        _ => None,
    }
}

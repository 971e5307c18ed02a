// resolve.rs — Operator and parameter resolution
//
// Turns a validated pipeline model into a resolved model: aliases become
// their base operator's code, every relation receives the complete five-key
// parameter set built from the catalog layers and the author's values, and
// every id-bearing array is ordered by id. Each decision is recorded in an
// explain trail.
//
// Preconditions: `model` passed semantic validation against `catalog`.
//   Unknown operators are tolerated (kept verbatim, global defaults only).
// Postconditions: the input is untouched; the output holds no alias
//   operators and no alternate parameter spellings. Explain entries are sorted
//   by (targetId, ruleId, text). Resolving a resolved model yields the same
//   model and an empty explain trail.
// Failure modes: none.
// Side effects: none.

use serde_json::Value;
use tracing::trace;

use crate::catalog::{Catalog, OperatorEntry};
use crate::model::{
    AuthoredParams, ExplainEntry, ExtraConstraint, IntervalInstance, ParamKey, ParamValue,
    PipelineModel, Relation, ResolvedModel, TemporalParams,
};

/// Stable explain rule ids.
pub mod rules {
    pub const OP_ALIAS_TO_BASE: &str = "R-OP-ALIAS-TO-BASE";
    pub const OP_CODE_CANONICAL: &str = "R-OP-CODE-CANONICAL";
    pub const PARAM_DEFAULTS_ALL: &str = "R-PARAM-DEFAULTS-ALL";
    pub const PARAM_DEFAULTS_MISSING: &str = "R-PARAM-DEFAULTS-MISSING";
    pub const PARAM_ALIAS_FIXED_OVERRIDDEN: &str = "R-PARAM-ALIAS-FIXED-OVERRIDDEN";
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolveResult {
    pub model: ResolvedModel,
    pub explain: Vec<ExplainEntry>,
}

/// Resolve every relation of `model` against `catalog`.
pub fn resolve_model(model: &PipelineModel, catalog: &Catalog) -> ResolveResult {
    let mut explain = Vec::new();

    let mut relations: Vec<Relation<TemporalParams>> = model
        .relations
        .iter()
        .map(|r| resolve_relation(r, catalog, &mut explain))
        .collect();
    relations.sort_by(|a, b| a.id.cmp(&b.id));

    let mut intervals: Vec<IntervalInstance> = model.intervals.clone();
    intervals.sort_by(|a, b| a.id.cmp(&b.id));

    let mut constraints: Vec<ExtraConstraint> = model.constraints.clone();
    for c in &mut constraints {
        for value in c.payload.values_mut().chain(c.fields.values_mut()) {
            sort_by_id(value);
        }
    }
    constraints.sort_by(|a, b| a.id.cmp(&b.id));

    sort_explain(&mut explain);

    ResolveResult {
        model: ResolvedModel {
            schema_version: model.schema_version.clone(),
            id: model.id.clone(),
            name: model.name.clone(),
            description: model.description.clone(),
            intervals,
            relations,
            constraints,
            temporal_expression: model.temporal_expression.clone(),
            origin: model.origin.clone(),
        },
        explain,
    }
}

// ── Per-relation resolution ─────────────────────────────────────────────────

fn resolve_relation(
    relation: &Relation<Option<AuthoredParams>>,
    catalog: &Catalog,
    explain: &mut Vec<ExplainEntry>,
) -> Relation<TemporalParams> {
    let reference = relation.operator_id.as_str();
    let entry = catalog.lookup(reference);
    let base = entry.and_then(|e| catalog.base_of(e));

    let operator_id = match (entry, base) {
        (Some(entry), Some(base)) => {
            canonical_operator(relation, entry, base, explain);
            base.code.clone()
        }
        _ => reference.to_string(),
    };

    let user = relation
        .params
        .as_ref()
        .map(|p| p.normalize())
        .unwrap_or_default();

    // global ← base defaults ← alias fixed ← user
    let mut params = catalog.global_defaults().clone();
    if let Some(base) = base {
        params.overlay(&base.defaults);
    }
    if let Some(fixed) = entry.and_then(|e| e.maps_to.as_ref()).map(|m| &m.fixed) {
        params.overlay(fixed);
        for (key, fixed_value) in fixed_entries(fixed) {
            let Some(value) = user.get(key).filter(|v| *v != fixed_value) else {
                continue;
            };
            explain.push(
                ExplainEntry::new(
                    rules::PARAM_ALIAS_FIXED_OVERRIDDEN,
                    format!(
                        "User value {key}={value} overrides the value {fixed_value} fixed by '{reference}'"
                    ),
                )
                .target(&relation.id)
                .meta("key", key.latin())
                .meta("fixed", fixed_value.to_json())
                .meta("value", value.to_json()),
            );
        }
    }
    params.overlay(&user);

    if user.is_empty() {
        explain.push(
            ExplainEntry::new(
                rules::PARAM_DEFAULTS_ALL,
                format!("All parameters defaulted for relation '{}'", relation.id),
            )
            .target(&relation.id)
            .meta("operatorId", operator_id.as_str()),
        );
    } else {
        let missing = user.missing_keys();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|k| k.latin()).collect();
            explain.push(
                ExplainEntry::new(
                    rules::PARAM_DEFAULTS_MISSING,
                    format!(
                        "Filled missing parameters for relation '{}': {}",
                        relation.id,
                        names.join(", ")
                    ),
                )
                .target(&relation.id)
                .meta("operatorId", operator_id.as_str())
                .meta("missingKeys", names),
            );
        }
    }

    trace!(
        relation = %relation.id,
        from = reference,
        to = %operator_id,
        user_keys = ParamKey::ALL.len() - user.missing_keys().len(),
        "resolved relation"
    );

    Relation {
        id: relation.id.clone(),
        left_interval_id: relation.left_interval_id.clone(),
        right_interval_id: relation.right_interval_id.clone(),
        operator_id,
        params,
        constraint_ids: relation.constraint_ids.clone(),
        label: relation.label.clone(),
    }
}

/// Record how the authored operator reference becomes the base code.
fn canonical_operator(
    relation: &Relation<Option<AuthoredParams>>,
    entry: &OperatorEntry,
    base: &OperatorEntry,
    explain: &mut Vec<ExplainEntry>,
) {
    let reference = relation.operator_id.as_str();
    if entry.is_alias() {
        explain.push(
            ExplainEntry::new(
                rules::OP_ALIAS_TO_BASE,
                format!(
                    "Alias '{reference}' resolved to base operator '{}'",
                    base.code
                ),
            )
            .target(&relation.id)
            .meta("from", reference)
            .meta("to", base.code.as_str()),
        );
    } else if reference != base.code {
        explain.push(
            ExplainEntry::new(
                rules::OP_CODE_CANONICAL,
                format!("Operator id '{reference}' written as code '{}'", base.code),
            )
            .target(&relation.id)
            .meta("from", reference)
            .meta("to", base.code.as_str()),
        );
    }
}

fn fixed_entries(
    fixed: &TemporalParams,
) -> impl Iterator<Item = (ParamKey, ParamValue)> + '_ {
    ParamKey::ALL
        .into_iter()
        .filter_map(move |k| fixed.get(k).map(|v| (k, v)))
}

// ── Ordering ────────────────────────────────────────────────────────────────

/// Sort, depth-first, every array whose elements are all objects carrying a
/// string `id`.
pub fn sort_by_id(value: &mut Value) {
    match value {
        Value::Array(items) => {
            for item in items.iter_mut() {
                sort_by_id(item);
            }
            let all_ids = !items.is_empty()
                && items
                    .iter()
                    .all(|v| v.get("id").and_then(Value::as_str).is_some());
            if all_ids {
                items.sort_by(|a, b| {
                    let ka = a.get("id").and_then(Value::as_str).unwrap_or_default();
                    let kb = b.get("id").and_then(Value::as_str).unwrap_or_default();
                    ka.cmp(kb)
                });
            }
        }
        Value::Object(map) => {
            for v in map.values_mut() {
                sort_by_id(v);
            }
        }
        _ => {}
    }
}

/// Sort by (targetId, ruleId, text). A missing target sorts first.
pub fn sort_explain(explain: &mut [ExplainEntry]) {
    explain.sort_by(|a, b| {
        let ta = a.target_id.as_deref().unwrap_or_default();
        let tb = b.target_id.as_deref().unwrap_or_default();
        ta.cmp(tb)
            .then_with(|| a.rule_id.cmp(b.rule_id))
            .then_with(|| a.text.cmp(&b.text))
    });
}

// serialize.rs — ISEQL text emission
//
// Renders a resolved model as ISEQL: a two-line header comment, the
// INTERVALS section and the RELATIONS section.
//
// Preconditions: `model` is the output of `resolve::resolve_model`; operators
//   are base codes known to `catalog` (unknown codes fall back to global
//   defaults for omission).
// Postconditions: output is a pure function of (model, catalog) and ends with
//   exactly one '\n'. Intervals are listed by ascending id; relations follow
//   `temporalExpression.constraintIds` when given, else ascending id.
// Failure modes: none (pure string formatting).
// Side effects: none.

use std::collections::{BTreeMap, HashSet};
use std::fmt::{self, Write};

use serde_json::Value;

use crate::catalog::Catalog;
use crate::model::{
    ConstraintKind, ExtraConstraint, IntervalInstance, ParamKey, PredicateCall, Relation,
    ResolvedModel, TemporalParams,
};

/// Header name used when a model has neither a name nor an id.
pub const PLACEHOLDER_NAME: &str = "EVENT_MODEL";

/// Render `model` as ISEQL text.
pub fn serialize_model(model: &ResolvedModel, catalog: &Catalog) -> String {
    Iseql { model, catalog }.to_string()
}

/// A resolved model paired with its catalog; displays as ISEQL.
#[derive(Clone, Copy)]
pub struct Iseql<'a> {
    pub model: &'a ResolvedModel,
    pub catalog: &'a Catalog,
}

impl fmt::Display for Iseql<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_iseql(f, self.model, self.catalog)
    }
}

/// Render `model` into any formatter sink.
pub fn write_iseql<W: Write>(out: &mut W, model: &ResolvedModel, catalog: &Catalog) -> fmt::Result {
    let mut intervals: Vec<&IntervalInstance> = model.intervals.iter().collect();
    intervals.sort_by(|a, b| a.id.cmp(&b.id));
    let relations = select_relations(model);

    writeln!(out, "# {}", header_name(model))?;
    writeln!(
        out,
        "# intervals: {}, relations: {}",
        intervals.len(),
        relations.len()
    )?;
    writeln!(out)?;

    writeln!(out, "INTERVALS")?;
    for interval in &intervals {
        writeln!(out, "@{}: {}", interval.id, predicate_call(&interval.predicate))?;
    }

    writeln!(out)?;
    writeln!(out, "RELATIONS")?;
    for relation in &relations {
        writeln!(out, "{}", relation_line(relation, model, catalog))?;
    }
    Ok(())
}

fn header_name(model: &ResolvedModel) -> &str {
    match model.name.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ if !model.id.is_empty() => model.id.as_str(),
        _ => PLACEHOLDER_NAME,
    }
}

// ── Relation selection ──────────────────────────────────────────────────────

/// Relations named by `temporalExpression.constraintIds` in that order
/// (first occurrence wins, dangling ids skipped); all relations by id when the
/// list is absent or empty.
fn select_relations(model: &ResolvedModel) -> Vec<&Relation<TemporalParams>> {
    let wanted = model
        .temporal_expression
        .as_ref()
        .map(|te| te.constraint_ids.as_slice())
        .unwrap_or_default();

    if wanted.is_empty() {
        let mut all: Vec<_> = model.relations.iter().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        return all;
    }

    let mut seen = HashSet::new();
    wanted
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .filter_map(|id| model.relations.iter().find(|r| &r.id == id))
        .collect()
}

// ── Relation lines ──────────────────────────────────────────────────────────

fn relation_line(
    relation: &Relation<TemporalParams>,
    model: &ResolvedModel,
    catalog: &Catalog,
) -> String {
    let mut line = format!("@{} {}", relation.left_interval_id, relation.operator_id);

    let defaults = catalog
        .lookup(&relation.operator_id)
        .and_then(|entry| catalog.base_of(entry))
        .map_or_else(
            || catalog.global_defaults().clone(),
            |base| catalog.operator_defaults(base),
        );
    let params = param_group(&relation.params, &defaults);
    if !params.is_empty() {
        let _ = write!(line, " ({})", params.join(", "));
    }

    let _ = write!(line, " @{}", relation.right_interval_id);

    let tail = extras(relation, model);
    if !tail.is_empty() {
        let _ = write!(line, " [{}]", tail.join(", "));
    }
    line
}

/// `ζ:<`-style entries in fixed key order, skipping values equal to the default.
fn param_group(params: &TemporalParams, defaults: &TemporalParams) -> Vec<String> {
    ParamKey::ALL
        .into_iter()
        .filter_map(|key| {
            let value = params.get(key)?;
            if defaults.get(key) == Some(value) {
                return None;
            }
            Some(format!("{}:{value}", key.greek()))
        })
        .collect()
}

fn extra_rank(kind: &ConstraintKind) -> Option<(u8, &'static str)> {
    match kind {
        ConstraintKind::Cardinality => Some((0, "cardinality")),
        ConstraintKind::OverlapPercentage => Some((1, "overlap")),
        ConstraintKind::Robustness => Some((2, "robustness")),
        _ => None,
    }
}

fn extras(relation: &Relation<TemporalParams>, model: &ResolvedModel) -> Vec<String> {
    let mut picked: Vec<(u8, &str, &ExtraConstraint)> = Vec::new();
    let mut seen = HashSet::new();
    for id in &relation.constraint_ids {
        if !seen.insert(id.as_str()) {
            continue;
        }
        let Some(c) = model.constraint(id) else {
            continue;
        };
        if let Some((rank, label)) = extra_rank(&c.kind) {
            picked.push((rank, label, c));
        }
    }
    picked.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.2.id.cmp(&b.2.id)));
    picked
        .into_iter()
        .map(|(_, label, c)| {
            let value = match c.field("value") {
                Some(v) => stable_json(v),
                None => stable_json(&Value::Object(c.payload.clone())),
            };
            format!("{label}={value}")
        })
        .collect()
}

// ── Atoms ───────────────────────────────────────────────────────────────────

fn predicate_call(call: &PredicateCall) -> String {
    let args: Vec<String> = call.args.iter().map(|a| atom(a)).collect();
    format!("{}({})", call.name, args.join(", "))
}

/// Bare when identifier-shaped (`[A-Za-z_][A-Za-z0-9_:-]*`), JSON-quoted otherwise.
pub fn atom(s: &str) -> String {
    let mut chars = s.chars();
    let bare = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-'))
        }
        _ => false,
    };
    if bare {
        s.to_string()
    } else {
        Value::String(s.to_string()).to_string()
    }
}

/// Compact JSON with object keys sorted at every depth.
pub fn stable_json(value: &Value) -> String {
    fn sorted(v: &Value) -> Value {
        match v {
            Value::Object(map) => {
                let ordered: BTreeMap<&String, Value> =
                    map.iter().map(|(k, v)| (k, sorted(v))).collect();
                Value::Object(ordered.into_iter().map(|(k, v)| (k.clone(), v)).collect())
            }
            Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
            other => other.clone(),
        }
    }
    sorted(value).to_string()
}

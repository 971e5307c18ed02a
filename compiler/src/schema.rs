// schema.rs — Structural validation of authored documents
//
// Checks a raw JSON document against one of the two accepted shapes,
// selected by `schemaVersion` ("1" legacy, "1.0" canonical), and produces
// the typed `Document` on success. Every violation is reported, not just
// the first, each with a `$`-rooted path into the document.
//
// Preconditions: none (accepts any JSON value).
// Postconditions: `document` is Some iff `issues` is empty. A returned
//   document has unique interval ids, `start <= end` for every interval,
//   in-domain parameters, and relation endpoints that name known intervals.
// Failure modes: structural issues (SCHEMA_* codes), always error severity.
// Side effects: none.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::diag::{codes, index_path, key_path, sort_issues, DiagCode, Issue, ROOT};
use crate::model::{
    non_negative, AuthoredParams, Comparator, IntervalInstance, Origin, ParamKey, PredicateCall,
    TemporalExpression, INFINITY_LITERAL,
};

pub const LEGACY_VERSION: &str = "1";
pub const CANONICAL_VERSION: &str = "1.0";

// ── Typed documents ─────────────────────────────────────────────────────────

/// A structurally valid document, tagged by its schema version.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Legacy(LegacyDocument),
    Canonical(CanonicalDocument),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyDocument {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    pub intervals: Vec<IntervalInstance>,
    pub constraints: LegacyConstraintSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal_expression: Option<TemporalExpression>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LegacyConstraintSet {
    pub temporal: Vec<LegacyExpression>,
    pub extra: Vec<LegacyExtra>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyExpression {
    pub id: String,
    pub left_interval_id: String,
    pub right_interval_id: String,
    pub operator_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<AuthoredParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allen_alias: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraint_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyExtra {
    pub id: String,
    pub kind: String,
    pub payload: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalDocument {
    pub id: String,
    pub meta: Meta,
    pub intervals: Vec<IntervalInstance>,
    pub relations: Vec<CanonicalRelation>,
    pub constraints: CanonicalConstraintSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal_expression: Option<TemporalExpression>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "createdAtISO", skip_serializing_if = "Option::is_none")]
    pub created_at_iso: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CanonicalConstraintSet {
    pub constraints: Vec<CanonicalConstraint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRelation {
    pub id: String,
    pub left: String,
    pub right: String,
    pub operator_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<AuthoredParams>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraint_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum CanonicalConstraint {
    #[serde(rename = "relationParam")]
    RelationParam {
        id: String,
        #[serde(rename = "relationId")]
        relation_id: String,
        param: ParamKey,
        value: Value,
    },
    #[serde(rename = "note")]
    Note { id: String, text: String },
}

impl CanonicalConstraint {
    pub fn id(&self) -> &str {
        match self {
            CanonicalConstraint::RelationParam { id, .. } | CanonicalConstraint::Note { id, .. } => id,
        }
    }
}

impl Document {
    pub fn version(&self) -> &'static str {
        match self {
            Document::Legacy(_) => LEGACY_VERSION,
            Document::Canonical(_) => CANONICAL_VERSION,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Document::Legacy(d) => &d.id,
            Document::Canonical(d) => &d.id,
        }
    }

    /// Where relations and constraints live in this shape.
    pub fn origin(&self) -> Origin {
        match self {
            Document::Legacy(_) => Origin {
                relations: "$.constraints.temporal".to_string(),
                constraints: "$.constraints.extra".to_string(),
                left_key: "leftIntervalId",
                right_key: "rightIntervalId",
                operator_key: "operatorKey",
            },
            Document::Canonical(_) => Origin {
                relations: "$.relations".to_string(),
                constraints: "$.constraints.constraints".to_string(),
                left_key: "left",
                right_key: "right",
                operator_key: "operatorId",
            },
        }
    }

    /// `(relation id, authored params)` in document order.
    pub fn relation_params(&self) -> Vec<(&str, Option<&AuthoredParams>)> {
        match self {
            Document::Legacy(d) => d
                .constraints
                .temporal
                .iter()
                .map(|e| (e.id.as_str(), e.params.as_ref()))
                .collect(),
            Document::Canonical(d) => d
                .relations
                .iter()
                .map(|r| (r.id.as_str(), r.params.as_ref()))
                .collect(),
        }
    }

    /// The document as JSON, `schemaVersion` included.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let mut value = match self {
            Document::Legacy(d) => serde_json::to_value(d)?,
            Document::Canonical(d) => serde_json::to_value(d)?,
        };
        if let Value::Object(map) = &mut value {
            map.insert(
                "schemaVersion".to_string(),
                Value::String(self.version().to_string()),
            );
        }
        Ok(value)
    }
}

// ── Entry point ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaResult {
    pub document: Option<Document>,
    pub issues: Vec<Issue>,
}

/// Structurally validate a raw document.
pub fn validate_document(input: &Value) -> SchemaResult {
    let mut cx = Checker::default();
    let document = cx.document(input);
    let mut issues = cx.issues;
    sort_issues(&mut issues);
    SchemaResult {
        document: if issues.is_empty() { document } else { None },
        issues,
    }
}

// ── Checker ─────────────────────────────────────────────────────────────────

const LEGACY_ROOT_FIELDS: &[&str] = &[
    "schemaVersion",
    "id",
    "name",
    "description",
    "createdAt",
    "updatedAt",
    "intervals",
    "constraints",
    "temporalExpression",
];
const CANONICAL_ROOT_FIELDS: &[&str] = &[
    "schemaVersion",
    "id",
    "meta",
    "intervals",
    "relations",
    "constraints",
    "temporalExpression",
];
const INTERVAL_FIELDS: &[&str] = &["id", "start", "end", "predicate", "label"];
const PREDICATE_FIELDS: &[&str] = &["name", "args"];
const LEGACY_EXPRESSION_FIELDS: &[&str] = &[
    "id",
    "leftIntervalId",
    "rightIntervalId",
    "operatorKey",
    "params",
    "allenAlias",
    "constraintIds",
];
const RELATION_FIELDS: &[&str] = &[
    "id",
    "left",
    "right",
    "operatorId",
    "params",
    "constraintIds",
    "label",
];
const RELATION_PARAM_FIELDS: &[&str] = &["kind", "id", "relationId", "param", "value"];
const NOTE_FIELDS: &[&str] = &["kind", "id", "text"];

#[derive(Default)]
struct Checker {
    issues: Vec<Issue>,
}

impl Checker {
    fn error(&mut self, code: DiagCode, path: &str, message: impl Into<String>) {
        self.issues.push(Issue::error(code, path, message));
    }

    // ── Generic shape helpers ──

    fn as_object<'v>(&mut self, v: &'v Value, path: &str) -> Option<&'v Map<String, Value>> {
        let map = v.as_object();
        if map.is_none() {
            self.error(codes::SCHEMA_INVALID_TYPE, path, "expected an object");
        }
        map
    }

    fn reject_unknown(&mut self, map: &Map<String, Value>, path: &str, allowed: &[&str]) {
        for key in map.keys() {
            if !allowed.contains(&key.as_str()) {
                self.error(
                    codes::SCHEMA_UNKNOWN_FIELD,
                    &key_path(path, key),
                    format!("unknown field '{key}'"),
                );
            }
        }
    }

    fn object<'v>(
        &mut self,
        v: &'v Value,
        path: &str,
        allowed: &[&str],
    ) -> Option<&'v Map<String, Value>> {
        let map = self.as_object(v, path)?;
        self.reject_unknown(map, path, allowed);
        Some(map)
    }

    fn req<T>(
        &mut self,
        map: &Map<String, Value>,
        path: &str,
        key: &str,
        parse: impl FnOnce(&mut Self, &Value, &str) -> Option<T>,
    ) -> Option<T> {
        let field = key_path(path, key);
        match map.get(key) {
            Some(v) => parse(self, v, &field),
            None => {
                self.error(
                    codes::SCHEMA_MISSING_FIELD,
                    &field,
                    format!("missing required field '{key}'"),
                );
                None
            }
        }
    }

    fn opt<T>(
        &mut self,
        map: &Map<String, Value>,
        path: &str,
        key: &str,
        parse: impl FnOnce(&mut Self, &Value, &str) -> Option<T>,
    ) -> Option<T> {
        let v = map.get(key)?;
        parse(self, v, &key_path(path, key))
    }

    fn list<T>(
        &mut self,
        v: &Value,
        path: &str,
        mut item: impl FnMut(&mut Self, &Value, &str) -> Option<T>,
    ) -> Option<Vec<T>> {
        let Some(items) = v.as_array() else {
            self.error(codes::SCHEMA_INVALID_TYPE, path, "expected an array");
            return None;
        };
        let mut out = Vec::with_capacity(items.len());
        let mut ok = true;
        for (i, it) in items.iter().enumerate() {
            match item(self, it, &index_path(path, i)) {
                Some(t) => out.push(t),
                None => ok = false,
            }
        }
        ok.then_some(out)
    }

    fn string(&mut self, v: &Value, path: &str) -> Option<String> {
        match v.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                self.error(codes::SCHEMA_INVALID_TYPE, path, "expected a string");
                None
            }
        }
    }

    fn non_empty(&mut self, v: &Value, path: &str, what: &str) -> Option<String> {
        let s = self.string(v, path)?;
        if s.is_empty() {
            self.error(
                codes::SCHEMA_EMPTY_STRING,
                path,
                format!("{what} must be non-empty"),
            );
            return None;
        }
        Some(s)
    }

    fn id(&mut self, v: &Value, path: &str) -> Option<String> {
        self.non_empty(v, path, "id")
    }

    fn ids(&mut self, v: &Value, path: &str) -> Option<Vec<String>> {
        self.list(v, path, Self::id)
    }

    // ── Domain values ──

    fn tick(&mut self, v: &Value, path: &str) -> Option<u64> {
        if let Some(n) = v.as_u64() {
            return Some(n);
        }
        let Some(n) = v.as_f64() else {
            self.error(codes::SCHEMA_INVALID_TYPE, path, "tick must be a number");
            return None;
        };
        if n.fract() != 0.0 {
            self.error(codes::SCHEMA_INVALID_TICK, path, "tick must be an integer");
            None
        } else if n < 0.0 {
            self.error(codes::SCHEMA_INVALID_TICK, path, "tick must be >= 0");
            None
        } else {
            Some(n as u64)
        }
    }

    fn param_value(&mut self, key: ParamKey, value: &Value, path: &str) {
        match key {
            ParamKey::Zeta | ParamKey::Eta => {
                if Comparator::from_value(value).is_none() {
                    self.error(
                        codes::SCHEMA_INVALID_COMPARATOR,
                        path,
                        "comparator must be one of: <, ≤, =, ≥, >",
                    );
                }
            }
            ParamKey::Delta | ParamKey::Epsilon => match value {
                Value::String(s) if s == INFINITY_LITERAL => {}
                Value::Number(_) => {
                    if non_negative(value).is_none() {
                        self.error(codes::SCHEMA_INVALID_THRESHOLD, path, "threshold must be >= 0");
                    }
                }
                _ => self.error(
                    codes::SCHEMA_INVALID_THRESHOLD,
                    path,
                    "threshold must be a number or '∞'",
                ),
            },
            ParamKey::Rho => match value {
                Value::Number(_) => {
                    if non_negative(value).is_none() {
                        self.error(codes::SCHEMA_INVALID_RHO, path, "rho must be >= 0");
                    }
                }
                _ => self.error(codes::SCHEMA_INVALID_RHO, path, "rho must be a number"),
            },
        }
    }

    /// `null` is the same as an absent field.
    fn params(&mut self, v: &Value, path: &str) -> Option<Option<AuthoredParams>> {
        if v.is_null() {
            return Some(None);
        }
        let map = self.as_object(v, path)?;
        let (params, unknown) = AuthoredParams::from_map(map);
        for key in unknown {
            self.error(
                codes::SCHEMA_INVALID_PARAM_KEY,
                &key_path(path, &key),
                format!("unknown parameter key '{key}'"),
            );
        }
        for (name, value) in map {
            if let Some((key, _)) = ParamKey::from_name(name) {
                self.param_value(key, value, &key_path(path, name));
            }
        }
        Some(Some(params))
    }

    fn predicate(&mut self, v: &Value, path: &str) -> Option<PredicateCall> {
        let map = self.object(v, path, PREDICATE_FIELDS)?;
        let name = self.req(map, path, "name", |cx, v, p| cx.non_empty(v, p, "predicate name"));
        let args = match map.get("args") {
            Some(v) => self.list(v, &key_path(path, "args"), |cx, v, p| cx.non_empty(v, p, "arg")),
            None => Some(Vec::new()),
        };
        Some(PredicateCall {
            name: name?,
            args: args?,
        })
    }

    fn interval(&mut self, v: &Value, path: &str) -> Option<IntervalInstance> {
        let map = self.object(v, path, INTERVAL_FIELDS)?;
        let id = self.req(map, path, "id", Self::id);
        let start = self.req(map, path, "start", Self::tick);
        let end = self.req(map, path, "end", Self::tick);
        let predicate = self.req(map, path, "predicate", Self::predicate);
        let label = self.opt(map, path, "label", |cx, v, p| cx.non_empty(v, p, "label"));
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                self.error(
                    codes::SCHEMA_INVERTED_INTERVAL,
                    &key_path(path, "end"),
                    "end must be >= start",
                );
                return None;
            }
        }
        Some(IntervalInstance {
            id: id?,
            start: start?,
            end: end?,
            predicate: predicate?,
            label,
        })
    }

    /// Parse `intervals` and report duplicate ids. Also returns the set of
    /// ids seen, for endpoint checks, when the field is at least an array.
    fn intervals(
        &mut self,
        root: &Map<String, Value>,
    ) -> (Option<Vec<IntervalInstance>>, Option<HashSet<String>>) {
        let parsed = self.req(root, ROOT, "intervals", |cx, v, p| {
            cx.list(v, p, Self::interval)
        });
        let Some(items) = root.get("intervals").and_then(Value::as_array) else {
            return (parsed, None);
        };
        let base = key_path(ROOT, "intervals");
        let mut seen = HashSet::new();
        for (i, item) in items.iter().enumerate() {
            let Some(id) = item.get("id").and_then(Value::as_str) else {
                continue;
            };
            if !seen.insert(id.to_string()) {
                self.error(
                    codes::SCHEMA_DUPLICATE_INTERVAL,
                    &key_path(&index_path(&base, i), "id"),
                    format!("duplicate interval id: {id}"),
                );
            }
        }
        (parsed, Some(seen))
    }

    fn endpoint(
        &mut self,
        map: &Map<String, Value>,
        path: &str,
        key: &str,
        known: Option<&HashSet<String>>,
    ) -> Option<String> {
        let id = self.req(map, path, key, Self::id)?;
        if let Some(known) = known {
            if !known.contains(&id) {
                self.error(
                    codes::SCHEMA_UNKNOWN_INTERVAL,
                    &key_path(path, key),
                    format!("unknown interval id: {id}"),
                );
                return None;
            }
        }
        Some(id)
    }

    fn temporal_expression(&mut self, v: &Value, path: &str) -> Option<TemporalExpression> {
        let map = self.object(v, path, &["constraintIds"])?;
        let constraint_ids = self.req(map, path, "constraintIds", Self::ids)?;
        Some(TemporalExpression { constraint_ids })
    }

    fn optional_string(&mut self, map: &Map<String, Value>, path: &str, key: &str) -> Option<String> {
        self.opt(map, path, key, Self::string)
    }

    // ── Documents ──

    fn document(&mut self, input: &Value) -> Option<Document> {
        let Some(root) = input.as_object() else {
            self.error(
                codes::SCHEMA_INVALID_ROOT,
                ROOT,
                "document must be a JSON object",
            );
            return None;
        };
        let version_path = key_path(ROOT, "schemaVersion");
        match root.get("schemaVersion") {
            None => {
                self.error(
                    codes::SCHEMA_MISSING_FIELD,
                    &version_path,
                    "missing required field 'schemaVersion'",
                );
                None
            }
            Some(Value::String(v)) if v == LEGACY_VERSION => self.legacy(root).map(Document::Legacy),
            Some(Value::String(v)) if v == CANONICAL_VERSION => {
                self.canonical(root).map(Document::Canonical)
            }
            Some(other) => {
                self.error(
                    codes::SCHEMA_INVALID_VERSION,
                    &version_path,
                    format!("unsupported schemaVersion {other}; expected \"1\" or \"1.0\""),
                );
                None
            }
        }
    }

    fn legacy(&mut self, root: &Map<String, Value>) -> Option<LegacyDocument> {
        self.reject_unknown(root, ROOT, LEGACY_ROOT_FIELDS);
        let id = self.req(root, ROOT, "id", Self::id);
        let name = self.req(root, ROOT, "name", |cx, v, p| cx.non_empty(v, p, "model name"));
        let description = self.optional_string(root, ROOT, "description");
        let created_at = self.optional_string(root, ROOT, "createdAt");
        let updated_at = self.optional_string(root, ROOT, "updatedAt");
        let (intervals, known) = self.intervals(root);
        let constraints = match root.get("constraints") {
            Some(v) => self.legacy_constraints(v, &key_path(ROOT, "constraints"), known.as_ref()),
            None => Some(LegacyConstraintSet::default()),
        };
        let temporal_expression = match root.get("temporalExpression") {
            Some(v) => Some(self.temporal_expression(v, &key_path(ROOT, "temporalExpression"))?),
            None => None,
        };
        Some(LegacyDocument {
            id: id?,
            name: name?,
            description,
            created_at,
            updated_at,
            intervals: intervals?,
            constraints: constraints?,
            temporal_expression,
        })
    }

    fn legacy_constraints(
        &mut self,
        v: &Value,
        path: &str,
        known: Option<&HashSet<String>>,
    ) -> Option<LegacyConstraintSet> {
        let map = self.object(v, path, &["temporal", "extra"])?;
        let temporal = match map.get("temporal") {
            Some(v) => self.list(v, &key_path(path, "temporal"), |cx, v, p| {
                cx.legacy_expression(v, p, known)
            }),
            None => Some(Vec::new()),
        };
        let extra = match map.get("extra") {
            Some(v) => self.list(v, &key_path(path, "extra"), Self::legacy_extra),
            None => Some(Vec::new()),
        };
        Some(LegacyConstraintSet {
            temporal: temporal?,
            extra: extra?,
        })
    }

    fn legacy_expression(
        &mut self,
        v: &Value,
        path: &str,
        known: Option<&HashSet<String>>,
    ) -> Option<LegacyExpression> {
        let map = self.object(v, path, LEGACY_EXPRESSION_FIELDS)?;
        let id = self.req(map, path, "id", Self::id);
        let left = self.endpoint(map, path, "leftIntervalId", known);
        let right = self.endpoint(map, path, "rightIntervalId", known);
        let operator_key =
            self.req(map, path, "operatorKey", |cx, v, p| cx.non_empty(v, p, "operatorKey"));
        let params = self.opt(map, path, "params", Self::params).flatten();
        let allen_alias =
            self.opt(map, path, "allenAlias", |cx, v, p| cx.non_empty(v, p, "allenAlias"));
        let constraint_ids = self
            .opt(map, path, "constraintIds", Self::ids)
            .unwrap_or_default();
        Some(LegacyExpression {
            id: id?,
            left_interval_id: left?,
            right_interval_id: right?,
            operator_key: operator_key?,
            params,
            allen_alias,
            constraint_ids,
        })
    }

    fn legacy_extra(&mut self, v: &Value, path: &str) -> Option<LegacyExtra> {
        let map = self.object(v, path, &["id", "kind", "payload"])?;
        let id = self.req(map, path, "id", Self::id);
        let kind = self.req(map, path, "kind", |cx, v, p| cx.non_empty(v, p, "constraint kind"));
        let payload = match map.get("payload") {
            Some(v) => self.as_object(v, &key_path(path, "payload")).cloned(),
            None => Some(Map::new()),
        };
        Some(LegacyExtra {
            id: id?,
            kind: kind?,
            payload: payload?,
        })
    }

    fn canonical(&mut self, root: &Map<String, Value>) -> Option<CanonicalDocument> {
        self.reject_unknown(root, ROOT, CANONICAL_ROOT_FIELDS);
        let id = self.req(root, ROOT, "id", Self::id);
        let meta = self.req(root, ROOT, "meta", Self::meta);
        let (intervals, known) = self.intervals(root);
        let relations = match root.get("relations") {
            Some(v) => self.list(v, &key_path(ROOT, "relations"), |cx, v, p| {
                cx.relation(v, p, known.as_ref())
            }),
            None => Some(Vec::new()),
        };
        let constraints = match root.get("constraints") {
            Some(v) => self.canonical_constraints(v, &key_path(ROOT, "constraints")),
            None => Some(CanonicalConstraintSet::default()),
        };
        let temporal_expression = match root.get("temporalExpression") {
            Some(v) => Some(self.temporal_expression(v, &key_path(ROOT, "temporalExpression"))?),
            None => None,
        };
        Some(CanonicalDocument {
            id: id?,
            meta: meta?,
            intervals: intervals?,
            relations: relations?,
            constraints: constraints?,
            temporal_expression,
        })
    }

    fn meta(&mut self, v: &Value, path: &str) -> Option<Meta> {
        let map = self.object(v, path, &["name", "description", "createdAtISO"])?;
        let name = self.req(map, path, "name", |cx, v, p| cx.non_empty(v, p, "model name"));
        let description = self.optional_string(map, path, "description");
        let created_at_iso = self.optional_string(map, path, "createdAtISO");
        Some(Meta {
            name: name?,
            description,
            created_at_iso,
        })
    }

    fn relation(
        &mut self,
        v: &Value,
        path: &str,
        known: Option<&HashSet<String>>,
    ) -> Option<CanonicalRelation> {
        let map = self.object(v, path, RELATION_FIELDS)?;
        let id = self.req(map, path, "id", Self::id);
        let left = self.endpoint(map, path, "left", known);
        let right = self.endpoint(map, path, "right", known);
        let operator_id =
            self.req(map, path, "operatorId", |cx, v, p| cx.non_empty(v, p, "operatorId"));
        let params = self.opt(map, path, "params", Self::params).flatten();
        let constraint_ids = self
            .opt(map, path, "constraintIds", Self::ids)
            .unwrap_or_default();
        let label = self.opt(map, path, "label", |cx, v, p| cx.non_empty(v, p, "label"));
        Some(CanonicalRelation {
            id: id?,
            left: left?,
            right: right?,
            operator_id: operator_id?,
            params,
            constraint_ids,
            label,
        })
    }

    fn canonical_constraints(&mut self, v: &Value, path: &str) -> Option<CanonicalConstraintSet> {
        let map = self.object(v, path, &["constraints"])?;
        let constraints = match map.get("constraints") {
            Some(v) => self.list(v, &key_path(path, "constraints"), Self::canonical_constraint)?,
            None => Vec::new(),
        };
        Some(CanonicalConstraintSet { constraints })
    }

    fn canonical_constraint(&mut self, v: &Value, path: &str) -> Option<CanonicalConstraint> {
        let map = self.as_object(v, path)?;
        let kind = self.req(map, path, "kind", Self::string)?;
        match kind.as_str() {
            "relationParam" => {
                self.reject_unknown(map, path, RELATION_PARAM_FIELDS);
                let id = self.req(map, path, "id", Self::id);
                let relation_id = self.req(map, path, "relationId", Self::id);
                let param = self.req(map, path, "param", Self::param_key);
                let value = self.req(map, path, "value", |_, v, _| Some(v.clone()));
                if let (Some(key), Some(value)) = (param, value.as_ref()) {
                    self.param_value(key, value, &key_path(path, "value"));
                }
                Some(CanonicalConstraint::RelationParam {
                    id: id?,
                    relation_id: relation_id?,
                    param: param?,
                    value: value?,
                })
            }
            "note" => {
                self.reject_unknown(map, path, NOTE_FIELDS);
                let id = self.req(map, path, "id", Self::id);
                let text = self.req(map, path, "text", Self::string);
                Some(CanonicalConstraint::Note {
                    id: id?,
                    text: text?,
                })
            }
            _ => {
                self.error(
                    codes::SCHEMA_INVALID_CONSTRAINT_KIND,
                    &key_path(path, "kind"),
                    "constraint kind must be one of: relationParam, note",
                );
                None
            }
        }
    }

    fn param_key(&mut self, v: &Value, path: &str) -> Option<ParamKey> {
        let name = self.string(v, path)?;
        match ParamKey::from_name(&name) {
            Some((key, _)) => Some(key),
            None => {
                self.error(
                    codes::SCHEMA_INVALID_PARAM_KEY,
                    path,
                    format!("unknown parameter key '{name}'"),
                );
                None
            }
        }
    }
}

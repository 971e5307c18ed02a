// model.rs — Typed event-model domain shared by every pass
//
// Holds the value types (comparators, thresholds, the five-key parameter
// record) and the shape-tolerant pipeline model that the semantic validator,
// resolver and serializer operate on. `EventModel<P>` is generic over the
// parameter representation: authored (raw, possibly mis-spelled) parameters
// before resolution, fully typed `TemporalParams` afterwards.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: serde rejects comparators/thresholds outside their domain.
// Side effects: none.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::diag::index_path;

// ── Comparators ─────────────────────────────────────────────────────────────

/// Comparator used by ζ / η.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Comparator {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl Comparator {
    pub const ALL: [Comparator; 5] = [
        Comparator::Lt,
        Comparator::Le,
        Comparator::Eq,
        Comparator::Ge,
        Comparator::Gt,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Lt => "<",
            Comparator::Le => "≤",
            Comparator::Eq => "=",
            Comparator::Ge => "≥",
            Comparator::Gt => ">",
        }
    }

    /// Parse a symbolic or ASCII spelling (`<=` → `≤`, `>=` → `≥`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "<" => Some(Comparator::Lt),
            "≤" | "<=" => Some(Comparator::Le),
            "=" => Some(Comparator::Eq),
            "≥" | ">=" => Some(Comparator::Ge),
            ">" => Some(Comparator::Gt),
            _ => None,
        }
    }

    pub fn from_value(v: &Value) -> Option<Self> {
        v.as_str().and_then(Self::parse)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Serialize for Comparator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

impl<'de> Deserialize<'de> for Comparator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Comparator::parse(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid comparator '{s}'")))
    }
}

// ── Thresholds ──────────────────────────────────────────────────────────────

/// The literal used for an unbounded threshold, both in JSON and in ISEQL.
pub const INFINITY_LITERAL: &str = "∞";

/// δ / ε: a non-negative bound or the infinite sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    Finite(f64),
    Infinite,
}

impl Threshold {
    pub fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::String(s) if s == INFINITY_LITERAL => Some(Threshold::Infinite),
            Value::Number(_) => non_negative(v).map(Threshold::Finite),
            _ => None,
        }
    }

    pub fn is_infinite(self) -> bool {
        matches!(self, Threshold::Infinite)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Finite(n) => f.write_str(&format_number(*n)),
            Threshold::Infinite => f.write_str(INFINITY_LITERAL),
        }
    }
}

impl Serialize for Threshold {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Threshold::Finite(n) => serialize_number(n, serializer),
            Threshold::Infinite => serializer.serialize_str(INFINITY_LITERAL),
        }
    }
}

impl<'de> Deserialize<'de> for Threshold {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(deserializer)?;
        Threshold::from_value(&v).ok_or_else(|| {
            de::Error::custom(format!("threshold must be a number >= 0 or '∞', got {v}"))
        })
    }
}

/// A finite JSON number ≥ 0.
pub fn non_negative(v: &Value) -> Option<f64> {
    v.as_f64().filter(|n| n.is_finite() && *n >= 0.0)
}

/// Render a number the way ISEQL expects: integral values without a fraction.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        // also folds -0
        "0".to_string()
    } else {
        format!("{n}")
    }
}

/// Serialize integral floats as JSON integers so `3` never becomes `3.0`.
pub fn serialize_number<S: Serializer>(n: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        serializer.serialize_i64(*n as i64)
    } else {
        serializer.serialize_f64(*n)
    }
}

fn serialize_opt_number<S: Serializer>(n: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match n {
        Some(n) => serialize_number(n, serializer),
        None => serializer.serialize_none(),
    }
}

// ── Parameter keys ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamKey {
    Zeta,
    Eta,
    Delta,
    Epsilon,
    Rho,
}

/// How a parameter key was spelled by the author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spelling {
    Latin,
    Greek,
}

impl ParamKey {
    /// Fixed emission order.
    pub const ALL: [ParamKey; 5] = [
        ParamKey::Zeta,
        ParamKey::Eta,
        ParamKey::Delta,
        ParamKey::Epsilon,
        ParamKey::Rho,
    ];

    pub fn latin(self) -> &'static str {
        match self {
            ParamKey::Zeta => "zeta",
            ParamKey::Eta => "eta",
            ParamKey::Delta => "delta",
            ParamKey::Epsilon => "epsilon",
            ParamKey::Rho => "rho",
        }
    }

    pub fn greek(self) -> &'static str {
        match self {
            ParamKey::Zeta => "ζ",
            ParamKey::Eta => "η",
            ParamKey::Delta => "δ",
            ParamKey::Epsilon => "ε",
            ParamKey::Rho => "ρ",
        }
    }

    pub fn from_name(name: &str) -> Option<(ParamKey, Spelling)> {
        ParamKey::ALL.into_iter().find_map(|k| {
            if k.latin() == name {
                Some((k, Spelling::Latin))
            } else if k.greek() == name {
                Some((k, Spelling::Greek))
            } else {
                None
            }
        })
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.latin())
    }
}

impl Serialize for ParamKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.latin())
    }
}

impl<'de> Deserialize<'de> for ParamKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ParamKey::from_name(&s)
            .map(|(k, _)| k)
            .ok_or_else(|| de::Error::custom(format!("unknown parameter key '{s}'")))
    }
}

/// A fixed five-slot record, one optional value per parameter key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamRecord<T> {
    pub zeta: Option<T>,
    pub eta: Option<T>,
    pub delta: Option<T>,
    pub epsilon: Option<T>,
    pub rho: Option<T>,
}

impl<T> ParamRecord<T> {
    pub fn get(&self, key: ParamKey) -> Option<&T> {
        match key {
            ParamKey::Zeta => self.zeta.as_ref(),
            ParamKey::Eta => self.eta.as_ref(),
            ParamKey::Delta => self.delta.as_ref(),
            ParamKey::Epsilon => self.epsilon.as_ref(),
            ParamKey::Rho => self.rho.as_ref(),
        }
    }

    pub fn set(&mut self, key: ParamKey, value: T) {
        let slot = match key {
            ParamKey::Zeta => &mut self.zeta,
            ParamKey::Eta => &mut self.eta,
            ParamKey::Delta => &mut self.delta,
            ParamKey::Epsilon => &mut self.epsilon,
            ParamKey::Rho => &mut self.rho,
        };
        *slot = Some(value);
    }

    pub fn is_empty(&self) -> bool {
        ParamKey::ALL.iter().all(|k| self.get(*k).is_none())
    }

    /// Present entries in fixed key order.
    pub fn entries(&self) -> impl Iterator<Item = (ParamKey, &T)> {
        ParamKey::ALL
            .into_iter()
            .filter_map(move |k| self.get(k).map(|v| (k, v)))
    }
}

// ── Authored parameters ─────────────────────────────────────────────────────

/// Parameters as the author wrote them: raw JSON values, kept per spelling.
///
/// Both spellings of a key may coexist; the Latin one is authoritative.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthoredParams {
    pub latin: ParamRecord<Value>,
    pub greek: ParamRecord<Value>,
}

impl AuthoredParams {
    /// Split a JSON object into the two spellings. Returns the keys that are
    /// not parameter names at all.
    pub fn from_map(map: &Map<String, Value>) -> (Self, Vec<String>) {
        let mut out = AuthoredParams::default();
        let mut unknown = Vec::new();
        for (name, value) in map {
            match ParamKey::from_name(name) {
                Some((key, Spelling::Latin)) => out.latin.set(key, value.clone()),
                Some((key, Spelling::Greek)) => out.greek.set(key, value.clone()),
                None => unknown.push(name.clone()),
            }
        }
        (out, unknown)
    }

    pub fn is_empty(&self) -> bool {
        self.latin.is_empty() && self.greek.is_empty()
    }

    /// The authoritative raw value for `key` (Latin wins over Greek).
    pub fn effective(&self, key: ParamKey) -> Option<&Value> {
        self.latin.get(key).or_else(|| self.greek.get(key))
    }

    /// Greek spellings present, sorted lexicographically.
    pub fn greek_keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = self.greek.entries().map(|(k, _)| k.greek()).collect();
        keys.sort_unstable();
        keys
    }

    /// Normalize both spellings onto one typed record. Values outside their
    /// domain are dropped, leaving the slot to the lower layers.
    pub fn normalize(&self) -> TemporalParams {
        let mut out = TemporalParams::default();
        for key in ParamKey::ALL {
            let Some(raw) = self.effective(key) else {
                continue;
            };
            match key {
                ParamKey::Zeta => out.zeta = Comparator::from_value(raw),
                ParamKey::Eta => out.eta = Comparator::from_value(raw),
                ParamKey::Delta => out.delta = Threshold::from_value(raw),
                ParamKey::Epsilon => out.epsilon = Threshold::from_value(raw),
                ParamKey::Rho => out.rho = non_negative(raw),
            }
        }
        out
    }
}

impl Serialize for AuthoredParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in self.latin.entries() {
            map.serialize_entry(key.latin(), value)?;
        }
        for (key, value) in self.greek.entries() {
            map.serialize_entry(key.greek(), value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AuthoredParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Ok(AuthoredParams::from_map(&map).0)
    }
}

// ── Typed parameters ────────────────────────────────────────────────────────

/// One parameter value, whatever its key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Comparator(Comparator),
    Threshold(Threshold),
    Number(f64),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Comparator(c) => write!(f, "{c}"),
            ParamValue::Threshold(t) => write!(f, "{t}"),
            ParamValue::Number(n) => f.write_str(&format_number(*n)),
        }
    }
}

impl ParamValue {
    /// JSON form as an author would write it.
    pub fn to_json(self) -> Value {
        match self {
            ParamValue::Comparator(c) => Value::String(c.symbol().to_string()),
            ParamValue::Threshold(Threshold::Infinite) => Value::String(INFINITY_LITERAL.to_string()),
            ParamValue::Threshold(Threshold::Finite(n)) | ParamValue::Number(n) => number_value(n),
        }
    }
}

/// A JSON number, integral when `n` has no fraction.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// ζ, η, δ, ε, ρ with typed values. Serialized with Latin keys in fixed order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemporalParams {
    #[serde(default, alias = "ζ", skip_serializing_if = "Option::is_none")]
    pub zeta: Option<Comparator>,
    #[serde(default, alias = "η", skip_serializing_if = "Option::is_none")]
    pub eta: Option<Comparator>,
    #[serde(default, alias = "δ", skip_serializing_if = "Option::is_none")]
    pub delta: Option<Threshold>,
    #[serde(default, alias = "ε", skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<Threshold>,
    #[serde(
        default,
        alias = "ρ",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_number"
    )]
    pub rho: Option<f64>,
}

impl TemporalParams {
    pub fn get(&self, key: ParamKey) -> Option<ParamValue> {
        match key {
            ParamKey::Zeta => self.zeta.map(ParamValue::Comparator),
            ParamKey::Eta => self.eta.map(ParamValue::Comparator),
            ParamKey::Delta => self.delta.map(ParamValue::Threshold),
            ParamKey::Epsilon => self.epsilon.map(ParamValue::Threshold),
            ParamKey::Rho => self.rho.map(ParamValue::Number),
        }
    }

    pub fn has(&self, key: ParamKey) -> bool {
        self.get(key).is_some()
    }

    /// Every slot of `top` that is set replaces the corresponding slot here.
    pub fn overlay(&mut self, top: &TemporalParams) {
        if top.zeta.is_some() {
            self.zeta = top.zeta;
        }
        if top.eta.is_some() {
            self.eta = top.eta;
        }
        if top.delta.is_some() {
            self.delta = top.delta;
        }
        if top.epsilon.is_some() {
            self.epsilon = top.epsilon;
        }
        if top.rho.is_some() {
            self.rho = top.rho;
        }
    }

    /// `self` with `top` laid over it.
    pub fn overlaid(&self, top: &TemporalParams) -> TemporalParams {
        let mut out = self.clone();
        out.overlay(top);
        out
    }

    /// Keys with no value, in fixed order.
    pub fn missing_keys(&self) -> Vec<ParamKey> {
        ParamKey::ALL.into_iter().filter(|k| !self.has(*k)).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_keys().is_empty()
    }

    pub fn is_empty(&self) -> bool {
        ParamKey::ALL.iter().all(|k| !self.has(*k))
    }
}

impl From<&TemporalParams> for AuthoredParams {
    fn from(params: &TemporalParams) -> Self {
        let mut out = AuthoredParams::default();
        for key in ParamKey::ALL {
            if let Some(v) = params.get(key) {
                out.latin.set(key, v.to_json());
            }
        }
        out
    }
}

// ── Intervals ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateCall {
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalInstance {
    pub id: String,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub end: u64,
    #[serde(default = "unknown_predicate")]
    pub predicate: PredicateCall,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

fn unknown_predicate() -> PredicateCall {
    PredicateCall {
        name: "UNKNOWN".to_string(),
        args: Vec::new(),
    }
}

// ── Relations ───────────────────────────────────────────────────────────────

/// A temporal relation between two intervals.
///
/// Shape-tolerant on input: `left`/`leftIntervalId`, `right`/`rightIntervalId`
/// and `operatorKey`/`operatorId` are all accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation<P> {
    pub id: String,
    #[serde(alias = "left")]
    pub left_interval_id: String,
    #[serde(alias = "right")]
    pub right_interval_id: String,
    #[serde(alias = "operatorKey")]
    pub operator_id: String,
    #[serde(default)]
    pub params: P,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraint_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

// ── Extra constraints ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintKind {
    Cardinality,
    OverlapPercentage,
    Robustness,
    RelationParam,
    Note,
    Other(String),
}

impl ConstraintKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "cardinality" => ConstraintKind::Cardinality,
            "overlapPercentage" => ConstraintKind::OverlapPercentage,
            "robustness" => ConstraintKind::Robustness,
            "relationParam" => ConstraintKind::RelationParam,
            "note" => ConstraintKind::Note,
            other => ConstraintKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ConstraintKind::Cardinality => "cardinality",
            ConstraintKind::OverlapPercentage => "overlapPercentage",
            ConstraintKind::Robustness => "robustness",
            ConstraintKind::RelationParam => "relationParam",
            ConstraintKind::Note => "note",
            ConstraintKind::Other(s) => s,
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ConstraintKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ConstraintKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ConstraintKind::parse(&s))
    }
}

/// A non-temporal constraint (`{kind, payload}`).
///
/// Fields that arrive outside `payload` (the shape-tolerant form allows
/// `{id, kind, value}`) are kept in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraConstraint {
    pub id: String,
    #[serde(alias = "type")]
    pub kind: ConstraintKind,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub payload: Map<String, Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ExtraConstraint {
    pub fn new(id: impl Into<String>, kind: ConstraintKind, payload: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            kind,
            payload,
            fields: Map::new(),
        }
    }

    /// Look a field up in the payload first, then among the loose fields.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key).or_else(|| self.fields.get(key))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalExpression {
    #[serde(default)]
    pub constraint_ids: Vec<String>,
}

// ── Explain trail ───────────────────────────────────────────────────────────

/// A machine-readable record of one normalization or defaulting decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainEntry {
    pub rule_id: &'static str,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, Value>,
}

impl ExplainEntry {
    pub fn new(rule_id: &'static str, text: impl Into<String>) -> Self {
        Self {
            rule_id,
            text: text.into(),
            target_id: None,
            meta: BTreeMap::new(),
        }
    }

    pub fn target(mut self, id: impl Into<String>) -> Self {
        self.target_id = Some(id.into());
        self
    }

    pub fn meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }
}

// ── Model ───────────────────────────────────────────────────────────────────

/// Where a model's relations and constraints live in the authored document,
/// and what the author called the relation fields. Issue paths are built
/// from it so they always point at the author's own keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub relations: String,
    pub constraints: String,
    pub left_key: &'static str,
    pub right_key: &'static str,
    pub operator_key: &'static str,
}

impl Default for Origin {
    fn default() -> Self {
        Origin {
            relations: "$.expressions".to_string(),
            constraints: "$.constraints".to_string(),
            left_key: "leftIntervalId",
            right_key: "rightIntervalId",
            operator_key: "operatorId",
        }
    }
}

/// The pipeline model. `P` is the parameter representation of its relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    bound(deserialize = "P: Deserialize<'de> + Default")
)]
pub struct EventModel<P> {
    #[serde(default)]
    pub schema_version: String,
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub intervals: Vec<IntervalInstance>,
    #[serde(default = "Vec::new", alias = "expressions")]
    pub relations: Vec<Relation<P>>,
    #[serde(default)]
    pub constraints: Vec<ExtraConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_expression: Option<TemporalExpression>,
    #[serde(skip)]
    pub origin: Origin,
}

/// Authored form: parameters may be absent, partial, or mis-spelled.
pub type PipelineModel = EventModel<Option<AuthoredParams>>;

/// Resolved form: every relation carries a complete typed parameter set.
pub type ResolvedModel = EventModel<TemporalParams>;

impl<P> EventModel<P> {
    pub fn relation_path(&self, index: usize) -> String {
        index_path(&self.origin.relations, index)
    }

    pub fn constraint_path(&self, index: usize) -> String {
        index_path(&self.origin.constraints, index)
    }

    pub fn interval(&self, id: &str) -> Option<&IntervalInstance> {
        self.intervals.iter().find(|i| i.id == id)
    }

    pub fn constraint(&self, id: &str) -> Option<&ExtraConstraint> {
        self.constraints.iter().find(|c| c.id == id)
    }
}

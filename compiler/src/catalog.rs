// catalog.rs — Operator catalog
//
// Loads the operator definitions (base operators and Allen aliases) from the
// embedded `data/operators.json`, or from a caller-supplied file, and exposes
// them as an immutable lookup table keyed by id and by code.
//
// Preconditions: none.
// Postconditions: every loaded catalog has unique ids and codes, complete
//   base-operator defaults, and alias mappings that land on base operators.
// Failure modes: `CatalogError` on malformed JSON or any violated invariant.
//   `builtin()` panics if the embedded catalog is corrupt.
// Side effects: `builtin()` initializes a process-wide `OnceLock` on first use.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::model::{
    non_negative, serialize_number, Comparator, ConstraintKind, ParamKey, ParamValue,
    TemporalParams, Threshold,
};

/// The catalog compiled into the binary.
pub const BUILTIN_JSON: &str = include_str!("../data/operators.json");

/// Every operator in this domain is binary.
pub const OPERATOR_ARITY: u64 = 2;

// ── Data types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorKind {
    #[serde(alias = "operator")]
    Base,
    Alias,
}

/// Values a parameter may take for one operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParamDomains {
    pub comparators: Vec<Comparator>,
    #[serde(serialize_with = "serialize_number")]
    pub threshold_min: f64,
    pub allow_infinite: bool,
    #[serde(serialize_with = "serialize_number")]
    pub rho_min: f64,
}

impl Default for ParamDomains {
    fn default() -> Self {
        ParamDomains {
            comparators: Comparator::ALL.to_vec(),
            threshold_min: 0.0,
            allow_infinite: true,
            rho_min: 0.0,
        }
    }
}

impl ParamDomains {
    pub fn admits(&self, value: ParamValue) -> bool {
        match value {
            ParamValue::Comparator(c) => self.comparators.contains(&c),
            ParamValue::Threshold(Threshold::Infinite) => self.allow_infinite,
            ParamValue::Threshold(Threshold::Finite(n)) => n >= self.threshold_min,
            ParamValue::Number(n) => n >= self.rho_min,
        }
    }
}

/// Which extra-constraint kinds an operator accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Compatibility {
    pub cardinality: bool,
    pub overlap_percentage: bool,
    pub robustness: bool,
}

impl Compatibility {
    /// Kinds without a flag (`relationParam`, `note`, custom kinds) are
    /// always accepted.
    pub fn supports(&self, kind: &ConstraintKind) -> bool {
        match kind {
            ConstraintKind::Cardinality => self.cardinality,
            ConstraintKind::OverlapPercentage => self.overlap_percentage,
            ConstraintKind::Robustness => self.robustness,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasMapping {
    pub operator_id: String,
    pub fixed: TemporalParams,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorEntry {
    pub id: String,
    pub code: String,
    pub kind: OperatorKind,
    pub label: String,
    pub description: String,
    pub arity: u64,
    pub supported: Vec<ParamKey>,
    pub defaults: TemporalParams,
    pub domains: ParamDomains,
    pub compatibility: Compatibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maps_to: Option<AliasMapping>,
}

impl OperatorEntry {
    pub fn is_alias(&self) -> bool {
        self.kind == OperatorKind::Alias
    }
}

/// Errors that can occur while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate operator id '{0}'")]
    DuplicateId(String),
    #[error("duplicate operator code '{0}'")]
    DuplicateCode(String),
    #[error("operator entry {index} has an empty id or code")]
    EmptyIdentifier { index: usize },
    #[error("operator '{id}' declares arity {arity}, expected 2")]
    InvalidArity { id: String, arity: u64 },
    #[error("alias '{0}' has no base-operator mapping")]
    AliasWithoutMapping(String),
    #[error("alias '{alias}' maps to unknown operator '{target}'")]
    UnknownMappingTarget { alias: String, target: String },
    #[error("alias '{alias}' maps to '{target}', which is not a base operator")]
    MappingTargetNotBase { alias: String, target: String },
    #[error("parameterDefaults has no value for '{0}'")]
    MissingGlobalDefault(ParamKey),
    #[error("base operator '{id}' has no default for '{key}'")]
    MissingDefault { id: String, key: ParamKey },
    #[error("{owner}: unknown parameter key '{key}'")]
    UnknownParamKey { owner: String, key: String },
    #[error("{owner}: invalid value {value} for '{key}'")]
    InvalidParamValue {
        owner: String,
        key: ParamKey,
        value: String,
    },
    #[error("{owner}: value {value} for '{key}' is outside the declared domain")]
    OutOfDomain {
        owner: String,
        key: ParamKey,
        value: String,
    },
}

// ── Raw file layout ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCatalog {
    #[serde(default)]
    schema_version: String,
    #[serde(default)]
    parameter_defaults: Map<String, Value>,
    operators: Vec<RawEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    kind: OperatorKind,
    id: String,
    code: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_arity")]
    arity: u64,
    #[serde(default)]
    parameters: RawParameters,
    #[serde(default)]
    constraint_compatibility: Compatibility,
    maps_to: Option<RawMapping>,
}

fn default_arity() -> u64 {
    OPERATOR_ARITY
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawParameters {
    supported: Option<Vec<ParamKey>>,
    defaults: Map<String, Value>,
    domains: ParamDomains,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMapping {
    operator_id: String,
    #[serde(default)]
    fixed: Map<String, Value>,
}

// ── Catalog ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Catalog {
    schema_version: String,
    global_defaults: TemporalParams,
    /// Sorted by id.
    entries: Vec<OperatorEntry>,
    by_id: HashMap<String, usize>,
    by_code: HashMap<String, usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalCatalog<'a> {
    schema_version: &'a str,
    parameter_defaults: &'a TemporalParams,
    operators: &'a [OperatorEntry],
}

impl Catalog {
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(text)?;
        Self::build(raw)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    fn build(raw: RawCatalog) -> Result<Self, CatalogError> {
        let global_defaults =
            typed_params("parameterDefaults", &raw.parameter_defaults, &ParamDomains::default())?;
        if let Some(key) = global_defaults.missing_keys().first() {
            return Err(CatalogError::MissingGlobalDefault(*key));
        }

        let mut entries = Vec::with_capacity(raw.operators.len());
        for (index, op) in raw.operators.into_iter().enumerate() {
            if op.id.is_empty() || op.code.is_empty() {
                return Err(CatalogError::EmptyIdentifier { index });
            }
            if op.arity != OPERATOR_ARITY {
                return Err(CatalogError::InvalidArity {
                    id: op.id,
                    arity: op.arity,
                });
            }
            let domains = op.parameters.domains;
            let defaults = typed_params(&op.id, &op.parameters.defaults, &domains)?;
            let maps_to = match (op.kind, op.maps_to) {
                (OperatorKind::Base, _) => None,
                (OperatorKind::Alias, None) => return Err(CatalogError::AliasWithoutMapping(op.id)),
                (OperatorKind::Alias, Some(m)) => Some(AliasMapping {
                    fixed: typed_params(&op.id, &m.fixed, &domains)?,
                    operator_id: m.operator_id,
                }),
            };
            if op.kind == OperatorKind::Base {
                if let Some(key) = defaults.missing_keys().first() {
                    return Err(CatalogError::MissingDefault {
                        id: op.id,
                        key: *key,
                    });
                }
            }
            entries.push(OperatorEntry {
                supported: op.parameters.supported.unwrap_or_else(|| ParamKey::ALL.to_vec()),
                id: op.id,
                code: op.code,
                kind: op.kind,
                label: op.label,
                description: op.description,
                arity: op.arity,
                defaults,
                domains,
                compatibility: op.constraint_compatibility,
                maps_to,
            });
        }
        entries.sort_by(|a, b| a.id.cmp(&b.id));

        let mut by_id = HashMap::new();
        let mut by_code = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            if by_id.insert(entry.id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateId(entry.id.clone()));
            }
            if by_code.insert(entry.code.clone(), i).is_some() {
                return Err(CatalogError::DuplicateCode(entry.code.clone()));
            }
        }

        for entry in &entries {
            let Some(mapping) = &entry.maps_to else {
                continue;
            };
            match by_id.get(&mapping.operator_id).map(|&i| &entries[i]) {
                None => {
                    return Err(CatalogError::UnknownMappingTarget {
                        alias: entry.id.clone(),
                        target: mapping.operator_id.clone(),
                    })
                }
                Some(target) if target.kind != OperatorKind::Base => {
                    return Err(CatalogError::MappingTargetNotBase {
                        alias: entry.id.clone(),
                        target: mapping.operator_id.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        Ok(Catalog {
            schema_version: raw.schema_version,
            global_defaults,
            entries,
            by_id,
            by_code,
        })
    }

    pub fn lookup_by_id(&self, id: &str) -> Option<&OperatorEntry> {
        self.by_id.get(id).map(|&i| &self.entries[i])
    }

    pub fn lookup_by_code(&self, code: &str) -> Option<&OperatorEntry> {
        self.by_code.get(code).map(|&i| &self.entries[i])
    }

    /// Resolve an operator reference: code first, then id.
    pub fn lookup(&self, reference: &str) -> Option<&OperatorEntry> {
        self.lookup_by_code(reference)
            .or_else(|| self.lookup_by_id(reference))
    }

    pub fn global_defaults(&self) -> &TemporalParams {
        &self.global_defaults
    }

    /// The base operator id an alias maps to.
    pub fn alias_base(&self, id: &str) -> Option<&str> {
        self.lookup_by_id(id)?
            .maps_to
            .as_ref()
            .map(|m| m.operator_id.as_str())
    }

    /// The base operator behind `entry` (itself when it is a base operator).
    pub fn base_of<'a>(&'a self, entry: &'a OperatorEntry) -> Option<&'a OperatorEntry> {
        match &entry.maps_to {
            Some(m) => self.lookup_by_id(&m.operator_id),
            None => Some(entry),
        }
    }

    /// Global defaults overlaid with the operator's own defaults.
    pub fn operator_defaults(&self, entry: &OperatorEntry) -> TemporalParams {
        self.global_defaults.overlaid(&entry.defaults)
    }

    /// All entries, sorted by id.
    pub fn operators(&self) -> &[OperatorEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Compact JSON with fixed key order, independent of the source layout.
    pub fn canonical_json(&self) -> String {
        let canonical = CanonicalCatalog {
            schema_version: &self.schema_version,
            parameter_defaults: &self.global_defaults,
            operators: &self.entries,
        };
        // Plain data with string keys; serialization cannot fail.
        serde_json::to_string(&canonical).unwrap_or_default()
    }

    /// SHA-256 of `canonical_json()`.
    pub fn fingerprint(&self) -> [u8; 32] {
        let digest = Sha256::digest(self.canonical_json().as_bytes());
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&digest);
        hash
    }

    /// One line per operator: `code id kind → base`.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let kind = match entry.kind {
                OperatorKind::Base => "base",
                OperatorKind::Alias => "alias",
            };
            let _ = write!(out, "{} {} {}", entry.code, entry.id, kind);
            if let Some(m) = &entry.maps_to {
                let _ = write!(out, " → {}", m.operator_id);
            }
            out.push('\n');
        }
        out
    }
}

fn typed_params(
    owner: &str,
    raw: &Map<String, Value>,
    domains: &ParamDomains,
) -> Result<TemporalParams, CatalogError> {
    let mut out = TemporalParams::default();
    for (name, value) in raw {
        let (key, _) = ParamKey::from_name(name).ok_or_else(|| CatalogError::UnknownParamKey {
            owner: owner.to_string(),
            key: name.clone(),
        })?;
        let invalid = || CatalogError::InvalidParamValue {
            owner: owner.to_string(),
            key,
            value: value.to_string(),
        };
        let typed = match key {
            ParamKey::Zeta | ParamKey::Eta => {
                ParamValue::Comparator(Comparator::from_value(value).ok_or_else(invalid)?)
            }
            ParamKey::Delta | ParamKey::Epsilon => {
                ParamValue::Threshold(Threshold::from_value(value).ok_or_else(invalid)?)
            }
            ParamKey::Rho => ParamValue::Number(non_negative(value).ok_or_else(invalid)?),
        };
        if !domains.admits(typed) {
            return Err(CatalogError::OutOfDomain {
                owner: owner.to_string(),
                key,
                value: value.to_string(),
            });
        }
        match (key, typed) {
            (ParamKey::Zeta, ParamValue::Comparator(c)) => out.zeta = Some(c),
            (ParamKey::Eta, ParamValue::Comparator(c)) => out.eta = Some(c),
            (ParamKey::Delta, ParamValue::Threshold(t)) => out.delta = Some(t),
            (ParamKey::Epsilon, ParamValue::Threshold(t)) => out.epsilon = Some(t),
            (_, ParamValue::Number(n)) => out.rho = Some(n),
            _ => return Err(invalid()),
        }
    }
    Ok(out)
}

// ── Process-wide built-in catalog ───────────────────────────────────────────

/// Parse the embedded catalog.
pub fn load_builtin() -> Result<Catalog, CatalogError> {
    Catalog::from_json(BUILTIN_JSON)
}

/// The embedded catalog, loaded once per process.
///
/// Panics if the embedded JSON is invalid: that is a broken build, not a
/// per-document problem.
pub fn builtin() -> &'static Catalog {
    static BUILTIN: OnceLock<Catalog> = OnceLock::new();
    BUILTIN.get_or_init(|| match load_builtin() {
        Ok(catalog) => catalog,
        Err(e) => panic!("embedded operator catalog is corrupt: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog_with(operators: Value) -> Result<Catalog, CatalogError> {
        let doc = json!({
            "schemaVersion": "1.0",
            "parameterDefaults": {"zeta": "≤", "eta": "≤", "delta": "∞", "epsilon": "∞", "rho": 0},
            "operators": operators,
        });
        Catalog::from_json(&doc.to_string())
    }

    fn full_base(id: &str, code: &str) -> Value {
        json!({
            "kind": "base", "id": id, "code": code, "arity": 2,
            "parameters": {"defaults": {"zeta": "≤", "eta": "≤", "delta": "∞", "epsilon": "∞", "rho": 0}}
        })
    }

    #[test]
    fn builtin_loads() {
        let cat = load_builtin().unwrap();
        assert_eq!(cat.len(), 22);
        assert!(!cat.is_empty());
        assert_eq!(cat.lookup_by_code("Bef").unwrap().id, "bef");
        assert_eq!(cat.lookup_by_id("allen_meets").unwrap().code, "Allen.Meets");
    }

    #[test]
    fn lookup_prefers_code_then_id() {
        let cat = builtin();
        assert_eq!(cat.lookup("LOJ").unwrap().id, "loj");
        assert_eq!(cat.lookup("loj").unwrap().code, "LOJ");
        assert!(cat.lookup("nope").is_none());
    }

    #[test]
    fn every_alias_maps_to_a_base_operator() {
        let cat = builtin();
        let aliases: Vec<_> = cat.operators().iter().filter(|e| e.is_alias()).collect();
        assert_eq!(aliases.len(), 13);
        for alias in aliases {
            let base = cat.base_of(alias).unwrap();
            assert_eq!(base.kind, OperatorKind::Base, "{}", alias.id);
        }
        assert_eq!(cat.alias_base("allen_equals"), Some("eq"));
        assert_eq!(cat.alias_base("bef"), None);
    }

    #[test]
    fn global_defaults_are_complete() {
        let g = builtin().global_defaults();
        assert!(g.is_complete());
        assert_eq!(g.delta, Some(Threshold::Infinite));
        assert_eq!(g.rho, Some(0.0));
    }

    #[test]
    fn eq_defaults_are_zero_thresholds() {
        let cat = builtin();
        let eq = cat.lookup_by_code("Eq").unwrap();
        let d = cat.operator_defaults(eq);
        assert_eq!(d.delta, Some(Threshold::Finite(0.0)));
        assert_eq!(d.epsilon, Some(Threshold::Finite(0.0)));
        assert_eq!(d.zeta, Some(Comparator::Le));
    }

    #[test]
    fn overlap_percentage_not_allowed_for_before() {
        let cat = builtin();
        let bef = cat.lookup_by_code("Bef").unwrap();
        assert!(!bef.compatibility.supports(&ConstraintKind::OverlapPercentage));
        assert!(bef.compatibility.supports(&ConstraintKind::Cardinality));
        assert!(bef.compatibility.supports(&ConstraintKind::Note));
    }

    #[test]
    fn operator_kind_accepts_legacy_spelling() {
        let cat = catalog_with(json!([
            {"kind": "operator", "id": "bef", "code": "Bef",
             "parameters": {"defaults": {"zeta": "≤", "eta": "≤", "delta": "∞", "epsilon": "∞", "rho": 0}}}
        ]))
        .unwrap();
        assert_eq!(cat.lookup_by_id("bef").unwrap().kind, OperatorKind::Base);
    }

    #[test]
    fn duplicate_id_rejected() {
        let err = catalog_with(json!([full_base("bef", "Bef"), full_base("bef", "Bef2")])).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(ref id) if id == "bef"));
    }

    #[test]
    fn duplicate_code_rejected() {
        let err = catalog_with(json!([full_base("a", "X"), full_base("b", "X")])).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateCode(ref c) if c == "X"));
    }

    #[test]
    fn alias_without_mapping_rejected() {
        let err = catalog_with(json!([
            full_base("bef", "Bef"),
            {"kind": "alias", "id": "allen_before", "code": "Allen.Before"}
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "alias 'allen_before' has no base-operator mapping");
    }

    #[test]
    fn alias_to_alias_rejected() {
        let err = catalog_with(json!([
            full_base("bef", "Bef"),
            {"kind": "alias", "id": "a1", "code": "A1", "mapsTo": {"operatorId": "bef"}},
            {"kind": "alias", "id": "a2", "code": "A2", "mapsTo": {"operatorId": "a1"}}
        ]))
        .unwrap_err();
        assert!(matches!(err, CatalogError::MappingTargetNotBase { .. }));
    }

    #[test]
    fn base_missing_default_rejected() {
        let err = catalog_with(json!([
            {"kind": "base", "id": "bef", "code": "Bef",
             "parameters": {"defaults": {"zeta": "≤", "eta": "≤", "delta": "∞", "epsilon": "∞"}}}
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "base operator 'bef' has no default for 'rho'");
    }

    #[test]
    fn default_outside_domain_rejected() {
        let err = catalog_with(json!([
            {"kind": "base", "id": "bef", "code": "Bef",
             "parameters": {
                "defaults": {"zeta": "≤", "eta": "≤", "delta": "∞", "epsilon": "∞", "rho": 0},
                "domains": {"allowInfinite": false}
             }}
        ]))
        .unwrap_err();
        assert!(matches!(err, CatalogError::OutOfDomain { key: ParamKey::Delta, .. }));
    }

    #[test]
    fn wrong_arity_rejected() {
        let mut op = full_base("bef", "Bef");
        op["arity"] = json!(3);
        let err = catalog_with(json!([op])).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidArity { arity: 3, .. }));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(Catalog::from_json("{"), Err(CatalogError::Json(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Catalog::from_path(Path::new("/nonexistent/operators.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[test]
    fn fingerprint_is_stable_and_layout_independent() {
        let a = catalog_with(json!([full_base("a", "A"), full_base("b", "B")])).unwrap();
        let b = catalog_with(json!([full_base("b", "B"), full_base("a", "A")])).unwrap();
        assert_eq!(a.canonical_json(), b.canonical_json());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), builtin().fingerprint());
    }

    #[test]
    fn listing_shows_alias_targets() {
        let listing = builtin().listing();
        assert!(listing.contains("Allen.Before allen_before alias → bef\n"));
        assert!(listing.contains("Bef bef base\n"));
    }
}

// derive.rs — Parameter suggestions from interval geometry
//
// Given two intervals as drawn on the timeline and the operator relating
// them, suggests the δ / ε thresholds that the drawing satisfies exactly.
// Suggestions are advisory: nothing in the compiler applies them.
//
// Preconditions: none; inverted endpoints are swapped.
// Postconditions: every suggested threshold is a whole number ≥ 0; ρ is
//   always suggested as 0; ζ / η are never suggested.
// Failure modes: none (an unrecognized operator yields only the ρ suggestion).
// Side effects: none.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::model::{ExplainEntry, TemporalParams, Threshold};
use crate::timeline::{TickRange, Timed};

pub mod rules {
    pub const RHO_DEFAULT_ZERO: &str = "DERIVE_RHO_DEFAULT_ZERO";
    pub const BEF_DELTA_FROM_GAP: &str = "DERIVE_BEF_DELTA_FROM_GAP";
    pub const AFT_DELTA_FROM_GAP: &str = "DERIVE_AFT_DELTA_FROM_GAP";
    pub const LOJ_FROM_ENDPOINT_DIFFS: &str = "DERIVE_LOJ_FROM_ENDPOINT_DIFFS";
    pub const ROJ_FROM_ENDPOINT_DIFFS: &str = "DERIVE_ROJ_FROM_ENDPOINT_DIFFS";
    pub const DJ_FROM_CONTAINMENT_MARGINS: &str = "DERIVE_DJ_FROM_CONTAINMENT_MARGINS";
    pub const RDJ_FROM_CONTAINMENT_MARGINS: &str = "DERIVE_RDJ_FROM_CONTAINMENT_MARGINS";
    pub const SP_DELTA_FROM_START_DIFF: &str = "DERIVE_SP_DELTA_FROM_START_DIFF";
    pub const EF_EPSILON_FROM_END_DIFF: &str = "DERIVE_EF_EPSILON_FROM_END_DIFF";
    pub const EQ_ZERO_THRESHOLDS: &str = "DERIVE_EQ_ZERO_THRESHOLDS";
    pub const UNKNOWN_NO_THRESHOLDS: &str = "DERIVE_UNKNOWN_NO_THRESHOLDS";
}

/// Base-operator families that have a geometric reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Bef,
    Aft,
    Loj,
    Roj,
    Dj,
    Rdj,
    Sp,
    Ef,
    Eq,
}

impl Family {
    /// Case-insensitive code, id or long name.
    pub fn from_name(name: &str) -> Option<Family> {
        let family = match name.trim().to_lowercase().as_str() {
            "bef" | "before" => Family::Bef,
            "aft" | "after" => Family::Aft,
            "loj" | "leftoverlapjoin" => Family::Loj,
            "roj" | "rightoverlapjoin" => Family::Roj,
            "dj" | "duringjoin" => Family::Dj,
            "rdj" | "reverseduringjoin" => Family::Rdj,
            "sp" | "startpreceding" => Family::Sp,
            "ef" | "endfollowing" => Family::Ef,
            "eq" | "equals" => Family::Eq,
            _ => return None,
        };
        Some(family)
    }

    /// By name first, then through the catalog (an alias takes its base's family).
    pub fn lookup(reference: &str, catalog: &Catalog) -> Option<Family> {
        Family::from_name(reference).or_else(|| {
            let entry = catalog.lookup(reference.trim())?;
            let base = catalog.base_of(entry)?;
            Family::from_name(&base.id)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeriveInput {
    pub left: TickRange,
    pub right: TickRange,
    pub operator_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeriveResult {
    pub params_suggested: TemporalParams,
    pub explain: Vec<ExplainEntry>,
}

/// Suggest thresholds for `input.operator_id` from the drawn endpoints.
pub fn derive_params_from_geometry(input: &DeriveInput, catalog: &Catalog) -> DeriveResult {
    let (ls, le) = input.left.ordered();
    let (rs, re) = input.right.ordered();

    let mut params = TemporalParams {
        rho: Some(0.0),
        ..Default::default()
    };
    let mut explain = vec![ExplainEntry::new(
        rules::RHO_DEFAULT_ZERO,
        "ρ is not derived from geometry; suggested value is 0",
    )];

    let Some(family) = Family::lookup(&input.operator_id, catalog) else {
        explain.push(
            ExplainEntry::new(
                rules::UNKNOWN_NO_THRESHOLDS,
                format!(
                    "Unknown operator '{}': no δ/ε derivation applied",
                    input.operator_id
                ),
            )
            .meta("operatorId", input.operator_id.as_str()),
        );
        return DeriveResult {
            params_suggested: params,
            explain,
        };
    };

    let (delta, epsilon, rule, text) = match family {
        Family::Bef => {
            let d = gap(rs, le);
            (Some(d), None, rules::BEF_DELTA_FROM_GAP, format!("Bef: δ = right.start - left.end = {d}"))
        }
        Family::Aft => {
            let d = gap(ls, re);
            (Some(d), None, rules::AFT_DELTA_FROM_GAP, format!("Aft: δ = left.start - right.end = {d}"))
        }
        Family::Loj => {
            let (d, e) = (gap(rs, ls), gap(re, le));
            (
                Some(d),
                Some(e),
                rules::LOJ_FROM_ENDPOINT_DIFFS,
                format!("LOJ: δ = right.start - left.start = {d}, ε = right.end - left.end = {e}"),
            )
        }
        Family::Roj => {
            let (d, e) = (gap(ls, rs), gap(le, re));
            (
                Some(d),
                Some(e),
                rules::ROJ_FROM_ENDPOINT_DIFFS,
                format!("ROJ: δ = left.start - right.start = {d}, ε = left.end - right.end = {e}"),
            )
        }
        Family::Dj => {
            let (d, e) = (gap(ls, rs), gap(re, le));
            (
                Some(d),
                Some(e),
                rules::DJ_FROM_CONTAINMENT_MARGINS,
                format!("DJ: δ = left.start - right.start = {d}, ε = right.end - left.end = {e}"),
            )
        }
        Family::Rdj => {
            let (d, e) = (gap(rs, ls), gap(le, re));
            (
                Some(d),
                Some(e),
                rules::RDJ_FROM_CONTAINMENT_MARGINS,
                format!("RDJ: δ = right.start - left.start = {d}, ε = left.end - right.end = {e}"),
            )
        }
        Family::Sp => {
            let d = gap(rs, ls);
            (
                Some(d),
                None,
                rules::SP_DELTA_FROM_START_DIFF,
                format!("SP: δ = right.start - left.start = {d}"),
            )
        }
        Family::Ef => {
            let e = gap(le, re);
            (
                None,
                Some(e),
                rules::EF_EPSILON_FROM_END_DIFF,
                format!("EF: ε = left.end - right.end = {e}"),
            )
        }
        Family::Eq => (
            Some(0),
            Some(0),
            rules::EQ_ZERO_THRESHOLDS,
            "Eq: δ = 0 and ε = 0 (exact alignment)".to_string(),
        ),
    };

    params.delta = delta.map(|d| Threshold::Finite(d as f64));
    params.epsilon = epsilon.map(|e| Threshold::Finite(e as f64));
    explain.push(
        ExplainEntry::new(rule, format!("{text}, clamped to >= 0"))
            .meta("operatorId", input.operator_id.as_str()),
    );

    DeriveResult {
        params_suggested: params,
        explain,
    }
}

/// `a - b`, floored at 0.
fn gap(a: i64, b: i64) -> i64 {
    a.saturating_sub(b).max(0)
}

// Property-based tests for compiler invariants.
//
// Categories:
// 1. Generated documents: acceptance, determinism, idempotence of the
//    resolved model, one MISSING_PARAMS per parameterless relation
// 2. Exhaustive catalog checks: alias substitution, default omission
// 3. Timeline geometry: move / resize invariants, including i64 extremes
//
// Uses proptest with explicit configuration to prevent CI flakiness.

use iseqlc::catalog::builtin;
use iseqlc::diag::codes;
use iseqlc::resolve::rules;
use iseqlc::timeline::{move_interval, resize_interval, Bounds, Edge, TickRange};
use iseqlc::{compile, CompileOutput};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

// ── Document generator ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct GenRelation {
    operator: String,
    left: usize,
    right: usize,
    /// `None` leaves the key out of the document entirely.
    params: Option<Value>,
}

#[derive(Debug, Clone)]
struct GenModel {
    canonical: bool,
    intervals: Vec<(u64, u64)>,
    relations: Vec<GenRelation>,
}

impl GenModel {
    fn relation_path(&self, index: usize) -> String {
        if self.canonical {
            format!("$.relations[{index}]")
        } else {
            format!("$.constraints.temporal[{index}]")
        }
    }

    fn to_document(&self) -> Value {
        let intervals: Vec<Value> = self
            .intervals
            .iter()
            .enumerate()
            .map(|(i, (start, end))| {
                json!({
                    "id": format!("i{i}"),
                    "start": start,
                    "end": end,
                    "predicate": {"name": "p", "args": [format!("a{i}")]}
                })
            })
            .collect();

        let relations: Vec<Value> = self
            .relations
            .iter()
            .enumerate()
            .map(|(k, r)| {
                let (left, right) = (format!("i{}", r.left), format!("i{}", r.right));
                let mut rel = if self.canonical {
                    json!({"id": format!("r{k}"), "left": left, "right": right, "operatorId": r.operator})
                } else {
                    json!({"id": format!("r{k}"), "leftIntervalId": left, "rightIntervalId": right, "operatorKey": r.operator})
                };
                if let Some(p) = &r.params {
                    rel["params"] = p.clone();
                }
                rel
            })
            .collect();

        if self.canonical {
            json!({
                "schemaVersion": "1.0",
                "id": "generated",
                "meta": {"name": "Generated"},
                "intervals": intervals,
                "relations": relations
            })
        } else {
            json!({
                "schemaVersion": "1",
                "id": "generated",
                "name": "Generated",
                "intervals": intervals,
                "constraints": {"temporal": relations}
            })
        }
    }
}

/// Every code and id the embedded catalog answers to.
fn operator_references() -> Vec<String> {
    builtin()
        .operators()
        .iter()
        .flat_map(|e| [e.code.clone(), e.id.clone()])
        .collect()
}

fn arb_comparator() -> impl Strategy<Value = Value> {
    prop::sample::select(vec!["<", "≤", "=", "≥", ">", "<=", ">="]).prop_map(Value::from)
}

fn arb_threshold() -> impl Strategy<Value = Value> {
    prop_oneof![(0u32..50).prop_map(Value::from), Just(Value::from("∞"))]
}

fn arb_param_map() -> impl Strategy<Value = Value> {
    (
        proptest::option::of(arb_comparator()),
        proptest::option::of(arb_comparator()),
        proptest::option::of(arb_threshold()),
        proptest::option::of(arb_threshold()),
        proptest::option::of((0u32..5).prop_map(Value::from)),
        any::<bool>(),
    )
        .prop_map(|(zeta, eta, delta, epsilon, rho, greek)| {
            let names = if greek {
                ["ζ", "η", "δ", "ε", "ρ"]
            } else {
                ["zeta", "eta", "delta", "epsilon", "rho"]
            };
            let mut map = Map::new();
            for (name, value) in names.into_iter().zip([zeta, eta, delta, epsilon, rho]) {
                if let Some(v) = value {
                    map.insert(name.to_string(), v);
                }
            }
            Value::Object(map)
        })
}

fn arb_params() -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        1 => Just(None),
        1 => Just(Some(Value::Null)),
        4 => arb_param_map().prop_map(Some),
    ]
}

fn arb_model() -> impl Strategy<Value = GenModel> {
    (1usize..5)
        .prop_flat_map(|n| {
            let relation = (
                prop::sample::select(operator_references()),
                0..n,
                0..n,
                arb_params(),
            )
                .prop_map(|(operator, left, right, params)| GenRelation {
                    operator,
                    left,
                    right,
                    params,
                });
            (
                any::<bool>(),
                prop::collection::vec((0u64..50, 1u64..20).prop_map(|(s, len)| (s, s + len)), n),
                prop::collection::vec(relation, 0..6),
            )
        })
        .prop_map(|(canonical, intervals, relations)| GenModel {
            canonical,
            intervals,
            relations,
        })
}

fn parameterless(params: Option<&Value>) -> bool {
    match params {
        None | Some(Value::Null) => true,
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

fn compile_generated(model: &GenModel) -> CompileOutput {
    compile(&model.to_document())
}

// ── 1. Generated documents ──────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        max_shrink_iters: 200,
        .. ProptestConfig::default()
    })]

    #[test]
    fn generated_documents_are_accepted(model in arb_model()) {
        let out = compile_generated(&model);
        prop_assert!(
            out.is_accepted(),
            "document:\n{}\nerrors: {:?}",
            model.to_document(),
            out.errors
        );
    }

    #[test]
    fn compile_is_deterministic(model in arb_model()) {
        let doc = model.to_document();
        prop_assert_eq!(compile(&doc), compile(&doc));
    }

    #[test]
    fn recompiling_the_resolved_model_changes_nothing(model in arb_model()) {
        let first = compile_generated(&model);
        let resolved = first.resolved_model.as_ref().expect("accepted document");
        let rewrapped = resolved.to_document().expect("resolved model re-wraps");
        let second = compile(&rewrapped);
        prop_assert!(second.is_accepted(), "errors: {:?}", second.errors);
        prop_assert!(second.explain.is_empty(), "explain: {:?}", second.explain);
        prop_assert_eq!(&second.artifact, &first.artifact);
    }

    #[test]
    fn one_missing_params_warning_per_parameterless_relation(model in arb_model()) {
        let out = compile_generated(&model);
        for (i, r) in model.relations.iter().enumerate() {
            let path = format!("{}.params", model.relation_path(i));
            let count = out
                .warnings
                .iter()
                .filter(|w| w.code == codes::MISSING_PARAMS && w.path == path)
                .count();
            let expected = usize::from(parameterless(r.params.as_ref()));
            prop_assert_eq!(count, expected, "relation {} params {:?}", i, r.params);
        }
    }

    #[test]
    fn every_resolved_relation_has_all_five_params(model in arb_model()) {
        let out = compile_generated(&model);
        let resolved = out.resolved_model.expect("accepted document");
        for r in &resolved.relations {
            prop_assert!(r.params.is_complete(), "relation {} params {:?}", r.id, r.params);
            prop_assert!(builtin().lookup_by_code(&r.operator_id).is_some_and(|e| !e.is_alias()));
        }
    }
}

// ── 2. Exhaustive catalog checks ────────────────────────────────────────────

fn single_relation(operator: &str, params: Option<Value>) -> Value {
    let mut relation = json!({"id": "r1", "left": "a", "right": "b", "operatorId": operator});
    if let Some(p) = params {
        relation["params"] = p;
    }
    json!({
        "schemaVersion": "1.0",
        "id": "single",
        "meta": {"name": "Single"},
        "intervals": [
            {"id": "a", "start": 0, "end": 5, "predicate": {"name": "p"}},
            {"id": "b", "start": 7, "end": 9, "predicate": {"name": "q"}}
        ],
        "relations": [relation]
    })
}

fn relation_line(out: &CompileOutput) -> String {
    let artifact = out.artifact.as_deref().expect("accepted document");
    artifact
        .lines()
        .find(|l| l.starts_with("@a "))
        .unwrap_or_else(|| panic!("no relation line in:\n{artifact}"))
        .to_string()
}

#[test]
fn aliases_resolve_to_their_base_code() {
    let catalog = builtin();
    for alias in catalog.operators().iter().filter(|e| e.is_alias()) {
        let base = catalog.base_of(alias).expect("alias has a base");
        for reference in [&alias.code, &alias.id] {
            let out = compile(&single_relation(reference, None));
            assert!(out.is_accepted(), "{reference}: {:?}", out.errors);
            let resolved = out.resolved_model.as_ref().unwrap();
            assert_eq!(resolved.relations[0].operator_id, base.code, "{reference}");
            assert!(
                out.explain.iter().any(|e| e.rule_id == rules::OP_ALIAS_TO_BASE
                    && e.meta.get("from") == Some(&json!(reference))
                    && e.meta.get("to") == Some(&json!(base.code))),
                "{reference}: {:?}",
                out.explain
            );
        }
    }
}

#[test]
fn default_params_are_omitted_and_perturbations_shown_alone() {
    let catalog = builtin();
    for base in catalog.operators().iter().filter(|e| !e.is_alias()) {
        let defaults = serde_json::to_value(catalog.operator_defaults(base)).unwrap();

        let out = compile(&single_relation(&base.code, Some(defaults.clone())));
        assert_eq!(relation_line(&out), format!("@a {} @b", base.code));

        for (key, value, shown) in [
            ("zeta", json!("<"), "ζ:<"),
            ("eta", json!(">"), "η:>"),
            ("delta", json!(7), "δ:7"),
            ("epsilon", json!(7), "ε:7"),
            ("rho", json!(2), "ρ:2"),
        ] {
            let mut params = defaults.clone();
            params[key] = value;
            let out = compile(&single_relation(&base.code, Some(params)));
            assert_eq!(
                relation_line(&out),
                format!("@a {} ({shown}) @b", base.code),
                "operator {} key {key}",
                base.code
            );
        }
    }
}

// ── 3. Timeline geometry ────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn move_keeps_duration_and_bounds(
        start in 0i64..100,
        len in 0i64..50,
        delta in -200.0f64..200.0,
        max in 150i64..300,
    ) {
        let moved = move_interval(&TickRange { start, end: start + len }, delta, Bounds::new(0, max));
        prop_assert_eq!(moved.end - moved.start, len);
        prop_assert!(moved.start >= 0 && moved.end <= max, "{:?}", moved);
    }

    #[test]
    fn move_keeps_duration_over_the_full_tick_range(
        ticks in prop::array::uniform4(any::<i64>()),
        delta in any::<f64>(),
        unbounded in any::<bool>(),
    ) {
        let mut ticks = ticks;
        ticks.sort_unstable();
        let [lo, start, end, hi] = ticks;
        let duration = i128::from(end) - i128::from(start);
        prop_assume!(duration <= i128::from(i64::MAX));

        let bounds = if unbounded {
            Bounds { min_tick: lo, max_tick: None }
        } else {
            Bounds::new(lo, hi)
        };
        let moved = move_interval(&TickRange { start, end }, delta, bounds);
        prop_assert_eq!(i128::from(moved.end) - i128::from(moved.start), duration);
        prop_assert!(moved.start >= lo, "{:?}", moved);
        if !unbounded {
            prop_assert!(moved.end <= hi, "{:?}", moved);
        }
    }

    #[test]
    fn resize_never_inverts(
        start in 0i64..100,
        len in 0i64..50,
        tick in -50.0f64..250.0,
        end_edge in any::<bool>(),
    ) {
        let edge = if end_edge { Edge::End } else { Edge::Start };
        let bounds = Bounds::new(0, 200);
        let resized = resize_interval(&TickRange { start, end: start + len }, edge, tick, bounds);
        prop_assert!(resized.start <= resized.end, "{:?}", resized);
        prop_assert!(resized.start >= 0 && resized.end <= 200, "{:?}", resized);
    }
}

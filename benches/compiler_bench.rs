use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use iseqlc::*;
use serde_json::{json, Value};

// KPI-aligned benchmark scenarios.
// All scenarios are accepted by the embedded catalog.

fn small_legacy() -> Value {
    json!({
        "schemaVersion": "1",
        "id": "door",
        "name": "Door cycle",
        "intervals": [
            {"id": "open", "start": 0, "end": 10, "predicate": {"name": "door_state", "args": ["open"]}},
            {"id": "alarm", "start": 12, "end": 20, "predicate": {"name": "alarm", "args": ["zone 1"]}}
        ],
        "constraints": {
            "temporal": [
                {"id": "e1", "leftIntervalId": "open", "rightIntervalId": "alarm",
                 "operatorKey": "Bef", "params": {"delta": 5}, "constraintIds": ["x1"]}
            ],
            "extra": [{"id": "x1", "kind": "robustness", "payload": {"value": 2}}]
        }
    })
}

fn aliases_canonical() -> Value {
    json!({
        "schemaVersion": "1.0",
        "id": "handover",
        "meta": {"name": "Shift handover"},
        "intervals": [
            {"id": "a", "start": 0, "end": 8, "predicate": {"name": "shift", "args": ["morning"]}},
            {"id": "b", "start": 8, "end": 16, "predicate": {"name": "shift", "args": ["late"]}},
            {"id": "c", "start": 2, "end": 6, "predicate": {"name": "meeting"}}
        ],
        "relations": [
            {"id": "r1", "left": "a", "right": "b", "operatorId": "Allen.Meets", "params": {"rho": 1}},
            {"id": "r2", "left": "c", "right": "a", "operatorId": "dj", "params": {"δ": 2, "ε": 2}},
            {"id": "r3", "left": "a", "right": "c", "operatorId": "allen_contains"}
        ]
    })
}

const OPERATORS: [&str; 6] = ["Bef", "Allen.Overlaps", "dj", "Allen.Equals", "EF", "allen_met_by"];

/// A canonical document with `n` intervals chained by `n - 1` relations.
fn generate_chain(n: usize) -> Value {
    let intervals: Vec<Value> = (0..n)
        .map(|i| {
            let start = i as u64 * 10;
            json!({"id": format!("i{i:04}"), "start": start, "end": start + 8,
                   "predicate": {"name": "state", "args": [format!("s{i}")]}})
        })
        .collect();
    let relations: Vec<Value> = (1..n)
        .map(|i| {
            let mut r = json!({"id": format!("r{i:04}"), "left": format!("i{:04}", i - 1),
                               "right": format!("i{i:04}"), "operatorId": OPERATORS[i % OPERATORS.len()]});
            if i % 3 != 0 {
                r["params"] = json!({"delta": i % 7, "zeta": "<="});
            }
            r
        })
        .collect();
    json!({
        "schemaVersion": "1.0",
        "id": "chain",
        "meta": {"name": "Chain"},
        "intervals": intervals,
        "relations": relations
    })
}

fn scenarios() -> [(&'static str, Value); 3] {
    [
        ("small_legacy", small_legacy()),
        ("aliases_canonical", aliases_canonical()),
        ("chain_100", generate_chain(100)),
    ]
}

// KPI: full compile latency (schema -> adapt -> validate -> resolve -> serialize).
fn bench_kpi_full_compile_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/full_compile_latency");

    for (name, doc) in scenarios() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &doc, |b, doc| {
            b.iter(|| {
                let out = compile(black_box(doc));
                assert!(out.is_accepted(), "benchmark scenario must compile");
                black_box(out.artifact);
            });
        });
    }

    group.finish();
}

// KPI: phase-level latency on a non-trivial model.
fn bench_kpi_phase_latency(c: &mut Criterion) {
    let catalog = catalog::builtin();
    let doc = generate_chain(100);

    {
        let mut group = c.benchmark_group("kpi/phase_latency/schema");
        group.bench_function("chain_100", |b| {
            b.iter(|| {
                let r = schema::validate_document(black_box(&doc));
                black_box(&r.document);
            });
        });
        group.finish();
    }

    let document = schema::validate_document(&doc)
        .document
        .expect("benchmark scenario must pass schema");

    {
        let mut group = c.benchmark_group("kpi/phase_latency/adapt");
        group.bench_function("chain_100", |b| {
            b.iter(|| black_box(adapt::adapt(black_box(&document))));
        });
        group.finish();
    }

    let pipeline = adapt::adapt(&document);

    {
        let mut group = c.benchmark_group("kpi/phase_latency/validate");
        group.bench_function("chain_100", |b| {
            b.iter(|| black_box(validate::validate_model(black_box(&pipeline), catalog)));
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("kpi/phase_latency/resolve");
        group.bench_function("chain_100", |b| {
            b.iter(|| black_box(resolve::resolve_model(black_box(&pipeline), catalog)));
        });
        group.finish();
    }

    let resolved = resolve::resolve_model(&pipeline, catalog).model;

    {
        let mut group = c.benchmark_group("kpi/phase_latency/serialize");
        group.bench_function("chain_100", |b| {
            b.iter(|| black_box(serialize::serialize_model(black_box(&resolved), catalog)));
        });
        group.finish();
    }
}

// KPI: pass-manager overhead per --emit terminal.
fn bench_kpi_emit_terminal(c: &mut Criterion) {
    let catalog = catalog::builtin();
    let doc = generate_chain(100);
    let mut group = c.benchmark_group("kpi/emit_terminal");

    for terminal in pass::ALL_PASSES {
        group.bench_with_input(
            BenchmarkId::from_parameter(terminal.name()),
            &terminal,
            |b, &terminal| {
                b.iter_batched(
                    || pipeline::CompilationState::new(doc.clone(), catalog),
                    |mut state| {
                        let r = pipeline::run_pipeline(&mut state, terminal, |_, _| {});
                        black_box(r.is_ok());
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

// KPI: full compile scaling vs number of relations.
fn bench_kpi_compile_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/compile_scaling");

    for n in [10_usize, 100, 500, 1000] {
        let doc = generate_chain(n);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}intervals", n)),
            &doc,
            |b, doc| {
                b.iter(|| black_box(compile(black_box(doc))));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_kpi_full_compile_latency,
    bench_kpi_phase_latency,
    bench_kpi_emit_terminal,
    bench_kpi_compile_scaling,
);
criterion_main!(benches);

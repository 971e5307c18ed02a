// adapt.rs — Document shape adapter
//
// Converts either structurally validated document shape into the single
// shape-tolerant pipeline model, and re-wraps a resolved model into the
// document shape it came from.
//
// Preconditions: `adapt` takes a document accepted by `schema::validate_document`.
// Postconditions: relations and constraints keep document order; the model's
//   `Origin` records where they came from so issue paths stay exact.
// Failure modes: `to_document` fails only if serde_json cannot encode a value.
// Side effects: none.

use serde_json::{Map, Value};

use crate::model::{
    AuthoredParams, ConstraintKind, EventModel, ExtraConstraint, ParamKey, PipelineModel,
    Relation, ResolvedModel, TemporalParams,
};
use crate::schema::{
    CanonicalConstraint, CanonicalConstraintSet, CanonicalDocument, CanonicalRelation, Document,
    LegacyConstraintSet, LegacyDocument, LegacyExpression, LegacyExtra, Meta, CANONICAL_VERSION,
    LEGACY_VERSION,
};

/// Convert a validated document into the pipeline model.
pub fn adapt(document: &Document) -> PipelineModel {
    let origin = document.origin();
    match document {
        Document::Legacy(d) => EventModel {
            schema_version: LEGACY_VERSION.to_string(),
            id: d.id.clone(),
            name: Some(d.name.clone()),
            description: d.description.clone(),
            intervals: d.intervals.clone(),
            relations: d
                .constraints
                .temporal
                .iter()
                .map(|e| Relation {
                    id: e.id.clone(),
                    left_interval_id: e.left_interval_id.clone(),
                    right_interval_id: e.right_interval_id.clone(),
                    operator_id: e.operator_key.clone(),
                    params: e.params.clone(),
                    constraint_ids: e.constraint_ids.clone(),
                    label: None,
                })
                .collect(),
            constraints: d
                .constraints
                .extra
                .iter()
                .map(|c| ExtraConstraint::new(&c.id, ConstraintKind::parse(&c.kind), c.payload.clone()))
                .collect(),
            temporal_expression: d.temporal_expression.clone(),
            origin,
        },
        Document::Canonical(d) => EventModel {
            schema_version: CANONICAL_VERSION.to_string(),
            id: d.id.clone(),
            name: Some(d.meta.name.clone()),
            description: d.meta.description.clone(),
            intervals: d.intervals.clone(),
            relations: d
                .relations
                .iter()
                .map(|r| Relation {
                    id: r.id.clone(),
                    left_interval_id: r.left.clone(),
                    right_interval_id: r.right.clone(),
                    operator_id: r.operator_id.clone(),
                    params: r.params.clone(),
                    constraint_ids: r.constraint_ids.clone(),
                    label: r.label.clone(),
                })
                .collect(),
            constraints: d.constraints.constraints.iter().map(extra_from_canonical).collect(),
            temporal_expression: d.temporal_expression.clone(),
            origin,
        },
    }
}

fn extra_from_canonical(c: &CanonicalConstraint) -> ExtraConstraint {
    let mut payload = Map::new();
    match c {
        CanonicalConstraint::RelationParam {
            id,
            relation_id,
            param,
            value,
        } => {
            payload.insert("relationId".into(), Value::String(relation_id.clone()));
            payload.insert("param".into(), Value::String(param.latin().to_string()));
            payload.insert("value".into(), value.clone());
            ExtraConstraint::new(id, ConstraintKind::RelationParam, payload)
        }
        CanonicalConstraint::Note { id, text } => {
            payload.insert("text".into(), Value::String(text.clone()));
            ExtraConstraint::new(id, ConstraintKind::Note, payload)
        }
    }
}

fn canonical_from_extra(c: &ExtraConstraint) -> Option<CanonicalConstraint> {
    match c.kind {
        ConstraintKind::RelationParam => Some(CanonicalConstraint::RelationParam {
            id: c.id.clone(),
            relation_id: c.field("relationId")?.as_str()?.to_string(),
            param: ParamKey::from_name(c.field("param")?.as_str()?)?.0,
            value: c.field("value")?.clone(),
        }),
        ConstraintKind::Note => Some(CanonicalConstraint::Note {
            id: c.id.clone(),
            text: c.field("text")?.as_str()?.to_string(),
        }),
        _ => None,
    }
}

impl EventModel<TemporalParams> {
    /// Re-wrap a resolved model in the document shape it was adapted from,
    /// with every relation's parameters written out in full. Models that did
    /// not come from a tagged document serialize as-is.
    pub fn to_document(&self) -> Result<Value, serde_json::Error> {
        match self.schema_version.as_str() {
            LEGACY_VERSION => Document::Legacy(self.to_legacy()).to_value(),
            CANONICAL_VERSION => Document::Canonical(self.to_canonical()).to_value(),
            _ => serde_json::to_value(self),
        }
    }

    fn to_legacy(&self) -> LegacyDocument {
        LegacyDocument {
            id: self.id.clone(),
            name: self.name.clone().unwrap_or_else(|| self.id.clone()),
            description: self.description.clone(),
            created_at: None,
            updated_at: None,
            intervals: self.intervals.clone(),
            constraints: LegacyConstraintSet {
                temporal: self
                    .relations
                    .iter()
                    .map(|r| LegacyExpression {
                        id: r.id.clone(),
                        left_interval_id: r.left_interval_id.clone(),
                        right_interval_id: r.right_interval_id.clone(),
                        operator_key: r.operator_id.clone(),
                        params: Some(AuthoredParams::from(&r.params)),
                        allen_alias: None,
                        constraint_ids: r.constraint_ids.clone(),
                    })
                    .collect(),
                extra: self
                    .constraints
                    .iter()
                    .map(|c| LegacyExtra {
                        id: c.id.clone(),
                        kind: c.kind.as_str().to_string(),
                        payload: c.payload.clone(),
                    })
                    .collect(),
            },
            temporal_expression: self.temporal_expression.clone(),
        }
    }

    fn to_canonical(&self) -> CanonicalDocument {
        CanonicalDocument {
            id: self.id.clone(),
            meta: Meta {
                name: self.name.clone().unwrap_or_else(|| self.id.clone()),
                description: self.description.clone(),
                created_at_iso: None,
            },
            intervals: self.intervals.clone(),
            relations: self
                .relations
                .iter()
                .map(|r| CanonicalRelation {
                    id: r.id.clone(),
                    left: r.left_interval_id.clone(),
                    right: r.right_interval_id.clone(),
                    operator_id: r.operator_id.clone(),
                    params: Some(AuthoredParams::from(&r.params)),
                    constraint_ids: r.constraint_ids.clone(),
                    label: r.label.clone(),
                })
                .collect(),
            constraints: CanonicalConstraintSet {
                constraints: self.constraints.iter().filter_map(canonical_from_extra).collect(),
            },
            temporal_expression: self.temporal_expression.clone(),
        }
    }
}

/// Convenience for callers holding the alias rather than the generic type.
pub fn resolved_to_document(model: &ResolvedModel) -> Result<Value, serde_json::Error> {
    model.to_document()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Comparator, Threshold};
    use crate::schema::validate_document;
    use serde_json::json;

    fn canonical() -> Document {
        validate_document(&json!({
            "schemaVersion": "1.0",
            "id": "m",
            "meta": {"name": "Canon", "description": "d"},
            "intervals": [
                {"id": "a", "start": 0, "end": 5, "predicate": {"name": "p"}},
                {"id": "b", "start": 6, "end": 9, "predicate": {"name": "q"}}
            ],
            "relations": [
                {"id": "r1", "left": "a", "right": "b", "operatorId": "Bef",
                 "constraintIds": ["n1"], "label": "first"}
            ],
            "constraints": {"constraints": [
                {"kind": "note", "id": "n1", "text": "hello"},
                {"kind": "relationParam", "id": "c1", "relationId": "r1", "param": "δ", "value": 4}
            ]}
        }))
        .document
        .unwrap()
    }

    #[test]
    fn legacy_relations_take_operator_key() {
        let doc = validate_document(&json!({
            "schemaVersion": "1",
            "id": "m",
            "name": "L",
            "intervals": [
                {"id": "i1", "start": 0, "end": 1, "predicate": {"name": "p"}},
                {"id": "i2", "start": 2, "end": 3, "predicate": {"name": "q"}}
            ],
            "constraints": {
                "temporal": [{"id": "e1", "leftIntervalId": "i1", "rightIntervalId": "i2",
                              "operatorKey": "Allen.Before", "allenAlias": "Before"}],
                "extra": [{"id": "c1", "kind": "robustness", "payload": {"value": 0}}]
            }
        }))
        .document
        .unwrap();
        let model = adapt(&doc);
        assert_eq!(model.schema_version, "1");
        assert_eq!(model.name.as_deref(), Some("L"));
        assert_eq!(model.relations[0].operator_id, "Allen.Before");
        assert!(model.relations[0].params.is_none());
        assert_eq!(model.constraints[0].kind, ConstraintKind::Robustness);
        assert_eq!(model.relation_path(0), "$.constraints.temporal[0]");
        assert_eq!(model.constraint_path(0), "$.constraints.extra[0]");
    }

    #[test]
    fn canonical_constraints_move_fields_into_payload() {
        let model = adapt(&canonical());
        assert_eq!(model.origin.left_key, "left");
        assert_eq!(model.relations[0].label.as_deref(), Some("first"));
        let c1 = model.constraint("c1").unwrap();
        assert_eq!(c1.kind, ConstraintKind::RelationParam);
        assert_eq!(c1.field("param"), Some(&json!("delta")));
        assert_eq!(c1.field("value"), Some(&json!(4)));
        assert_eq!(model.constraint("n1").unwrap().field("text"), Some(&json!("hello")));
    }

    #[test]
    fn resolved_model_rewraps_into_source_shape() {
        let pipeline = adapt(&canonical());
        let resolved: ResolvedModel = EventModel {
            relations: pipeline
                .relations
                .iter()
                .map(|r| Relation {
                    id: r.id.clone(),
                    left_interval_id: r.left_interval_id.clone(),
                    right_interval_id: r.right_interval_id.clone(),
                    operator_id: r.operator_id.clone(),
                    params: TemporalParams {
                        zeta: Some(Comparator::Le),
                        eta: Some(Comparator::Le),
                        delta: Some(Threshold::Infinite),
                        epsilon: Some(Threshold::Infinite),
                        rho: Some(0.0),
                    },
                    constraint_ids: r.constraint_ids.clone(),
                    label: r.label.clone(),
                })
                .collect(),
            schema_version: pipeline.schema_version.clone(),
            id: pipeline.id.clone(),
            name: pipeline.name.clone(),
            description: pipeline.description.clone(),
            intervals: pipeline.intervals.clone(),
            constraints: pipeline.constraints.clone(),
            temporal_expression: None,
            origin: pipeline.origin.clone(),
        };
        let value = resolved_to_document(&resolved).unwrap();
        assert_eq!(value["schemaVersion"], json!("1.0"));
        assert_eq!(
            value["relations"][0]["params"],
            json!({"zeta": "≤", "eta": "≤", "delta": "∞", "epsilon": "∞", "rho": 0})
        );
        let again = validate_document(&value);
        assert!(again.issues.is_empty(), "{:?}", again.issues);
        assert_eq!(adapt(&again.document.unwrap()).constraints, pipeline.constraints);
    }
}

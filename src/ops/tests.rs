// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use rstest::rstest;
use serde_json::json;

use crate::model::{Baseline, BaselineId, Cell, CellId, Document, Geometry, Position};

use super::{
    apply, apply_batch, default_node_style, BatchOp, ConflictReason, IntentGuard, Op, OpOutcome,
    DEFAULT_EDGE_STYLE,
};

fn cid(value: &str) -> CellId {
    CellId::new(value).expect("cell id")
}

fn two_nodes() -> Document {
    let geometry = Geometry { x: 0.0, y: 0.0, width: 80.0, height: 40.0 };
    let mut document = Document::new();
    document
        .insert(Cell::node(cid("n1"), CellId::layer(), geometry).with_value("A"))
        .expect("n1");
    document
        .insert(Cell::node(cid("n2"), CellId::layer(), geometry).with_value("B"))
        .expect("n2");
    document
}

fn batch(ops: Vec<Op>) -> Vec<BatchOp> {
    ops.into_iter().map(BatchOp::from).collect()
}

fn decode(value: serde_json::Value) -> BatchOp {
    serde_json::from_value(value).expect("batch entry")
}

#[test]
fn add_node_uses_defaults() {
    let mut document = Document::new();
    let id = apply(&mut document, &Op::add_node("Start")).expect("apply");

    assert_eq!(id.as_str(), "2");
    let cell = document.get("2").expect("node");
    assert_eq!(cell.value(), "Start");
    assert_eq!(cell.parent_id(), Some(&CellId::layer()));
    assert_eq!(cell.style(), default_node_style("rectangle"));
    assert_eq!(
        cell.geometry().copied(),
        Some(Geometry { x: 100.0, y: 100.0, width: 120.0, height: 60.0 })
    );
    assert_eq!(document.rev(), 1);
}

#[rstest]
#[case("rectangle", "rounded=1;")]
#[case("ellipse", "ellipse;")]
#[case("rhombus", "rhombus;")]
#[case("cylinder", "shape=cylinder3;")]
#[case("hexagon", "rounded=1;")]
fn node_type_selects_default_style(#[case] node_type: &str, #[case] prefix: &str) {
    let mut document = Document::new();
    let op = decode(json!({"op": "add_node", "node_type": node_type, "value": "x"}));
    let result = apply_batch(&mut document, &[op], None);

    let id = result.applied_ids()[0].clone();
    assert!(document.get(id.as_str()).expect("node").style().starts_with(prefix));
}

#[test]
fn explicit_style_wins_over_node_type() {
    let mut document = Document::new();
    let op = decode(json!({"op": "add_node", "node_type": "ellipse", "style": "shape=note;"}));
    let result = apply_batch(&mut document, &[op], None);

    let id = result.applied_ids()[0].clone();
    assert_eq!(document.get(id.as_str()).expect("node").style(), "shape=note;");
}

#[test]
fn generated_ids_are_distinct_and_never_reserved() {
    let mut document = Document::new();
    let ops = batch((0..25).map(|n| Op::add_node(format!("node {n}"))).collect());
    let result = apply_batch(&mut document, &ops, None);

    assert_eq!(result.applied, 25);
    let ids = result.applied_ids();
    let mut unique = ids.iter().map(|id| id.as_str()).collect::<Vec<_>>();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), 25);
    assert!(ids.iter().all(|id| !id.is_reserved()));
}

#[test]
fn generated_ids_are_not_reused_after_delete() {
    let mut document = Document::new();
    let first = apply(&mut document, &Op::add_node("a")).expect("add");
    apply(&mut document, &Op::DeleteNode { id: first.clone() }).expect("delete");
    let second = apply(&mut document, &Op::add_node("b")).expect("add");

    assert_ne!(first, second);
}

#[test]
fn generated_ids_skip_explicit_numeric_ids() {
    let mut document = Document::new();
    let explicit = decode(json!({"op": "add_node", "id": "7", "value": "seven"}));
    let result = apply_batch(&mut document, &[explicit, Op::add_node("next").into()], None);

    assert!(result.success);
    assert_eq!(result.applied_ids()[1].as_str(), "8");
}

#[rstest]
#[case("n1")]
#[case("0")]
#[case("1")]
fn explicit_id_collision_is_duplicate(#[case] id: &str) {
    let mut document = two_nodes();
    let before = document.clone();
    let op = decode(json!({"op": "add_node", "id": id, "value": "dup"}));
    let result = apply_batch(&mut document, &[op], None);

    assert_eq!(result.applied, 0);
    assert_eq!(result.conflicts[0].reason, ConflictReason::DuplicateId);
    assert_eq!(result.conflicts[0].id, id);
    assert_eq!(document, before);
}

#[test]
fn add_node_under_root_is_invalid_parent() {
    let mut document = Document::new();
    let op = decode(json!({"op": "add_node", "parent": "0"}));
    let result = apply_batch(&mut document, &[op], None);

    assert_eq!(result.conflicts[0].reason, ConflictReason::InvalidParent);
}

#[test]
fn add_node_with_missing_parent_is_not_found() {
    let mut document = Document::new();
    let op = decode(json!({"op": "add_node", "parent_id": "group-9"}));
    let result = apply_batch(&mut document, &[op], None);

    assert_eq!(result.conflicts[0].reason, ConflictReason::ReferencedIdNotFound);
    assert_eq!(result.conflicts[0].id, "group-9");
}

#[test]
fn add_node_accepts_existing_node_as_parent() {
    let mut document = two_nodes();
    let op = decode(json!({"op": "add_node", "id": "child", "parent": "n1"}));
    let result = apply_batch(&mut document, &[op], None);

    assert!(result.success);
    assert_eq!(document.get("child").and_then(Cell::parent_id), Some(&cid("n1")));
}

#[test]
fn add_edge_uses_default_style_and_layer_parent() {
    let mut document = two_nodes();
    let id = apply(&mut document, &Op::add_edge(cid("n1"), cid("n2"))).expect("edge");

    let edge = document.get(id.as_str()).expect("edge");
    assert_eq!(edge.style(), DEFAULT_EDGE_STYLE);
    assert_eq!(edge.parent_id(), Some(&CellId::layer()));
    assert_eq!(edge.source_id(), Some(&cid("n1")));
    assert_eq!(edge.target_id(), Some(&cid("n2")));
}

#[rstest]
#[case(json!({"op": "add_edge", "source": "n1", "target": "ghost"}), "ghost")]
#[case(json!({"op": "add_edge", "source": "1", "target": "n2"}), "source '1' is a reserved")]
#[case(json!({"op": "modify_edge", "id": "n1", "value": "x"}), "no edge with id 'n1'")]
#[case(json!({"op": "modify_node", "id": "1", "value": "x"}), "no node with id '1'")]
#[case(json!({"op": "delete_node", "id": "missing"}), "no node with id 'missing'")]
#[case(json!({"op": "delete_edge", "id": "missing"}), "no edge with id 'missing'")]
fn missing_references_conflict(#[case] raw: serde_json::Value, #[case] description: &str) {
    let mut document = two_nodes();
    let before = document.clone();
    let result = apply_batch(&mut document, &[decode(raw)], None);

    assert_eq!(result.applied, 0);
    assert!(!result.success);
    let conflict = &result.conflicts[0];
    assert_eq!(conflict.reason, ConflictReason::ReferencedIdNotFound);
    assert!(conflict.description.contains(description), "{}", conflict.description);
    assert_eq!(document, before);
}

#[test]
fn conflicts_do_not_block_the_rest_of_the_batch() {
    let mut document = two_nodes();
    let ops = batch(vec![
        Op::set_node_value(cid("n1"), "A2"),
        Op::set_node_value(cid("missing-1"), "x"),
        Op::add_node("C"),
        Op::DeleteEdge { id: cid("missing-2") },
        Op::add_edge(cid("n1"), cid("n2")),
    ]);
    let result = apply_batch(&mut document, &ops, None);

    assert_eq!(result.conflicts.len(), 2);
    assert_eq!(result.applied, 3);
    assert_eq!(result.conflicts[0].op_index, 1);
    assert_eq!(result.conflicts[1].op_index, 3);
    assert_eq!(document.get("n1").map(Cell::value), Some("A2"));
    assert_eq!(result.outcomes.len(), 5);
    assert!(matches!(result.outcomes[0], OpOutcome::Applied { op_index: 0, .. }));
    assert!(matches!(result.outcomes[1], OpOutcome::Conflict(_)));
    assert_eq!(
        result.summary,
        "applied 3 of 5 operations; 2 conflicts (referenced_id_not_found x2)"
    );
}

#[test]
fn later_ops_see_cells_added_earlier_in_the_batch() {
    let mut document = Document::new();
    let ops = vec![
        decode(json!({"op": "add_node", "id": "a", "value": "A"})),
        decode(json!({"op": "add_node", "id": "b", "value": "B"})),
        decode(json!({"op": "add_edge", "id": "e", "source": "a", "target": "b"})),
        decode(json!({
            "op": "modify_node",
            "id": "a",
            "value": "A2",
            "position": {"x": 5, "y": 6}
        })),
    ];
    let result = apply_batch(&mut document, &ops, None);

    assert!(result.success);
    assert_eq!(result.applied, 4);
    let a = document.get("a").expect("a");
    assert_eq!(a.value(), "A2");
    assert_eq!(a.geometry().map(|g| g.position()), Some(Position { x: 5.0, y: 6.0 }));
    assert_eq!(a.geometry().map(|g| g.width), Some(120.0));
    assert_eq!(result.delta.added, vec![cid("a"), cid("b"), cid("e")]);
    assert!(result.delta.updated.is_empty());
}

#[test]
fn delete_node_cascades_to_edges_and_children() {
    let mut document = two_nodes();
    let ops = vec![
        decode(json!({"op": "add_edge", "id": "e1", "source": "n1", "target": "n2"})),
        decode(json!({"op": "add_node", "id": "child", "parent": "n1"})),
        decode(json!({"op": "add_node", "id": "n3"})),
        decode(json!({"op": "add_edge", "id": "e2", "source": "child", "target": "n3"})),
    ];
    assert!(apply_batch(&mut document, &ops, None).success);

    let result = apply_batch(&mut document, &batch(vec![Op::DeleteNode { id: cid("n1") }]), None);

    assert_eq!(result.delta.removed, vec![cid("child"), cid("e1"), cid("e2"), cid("n1")]);
    assert!(document.contains("n2"));
    assert!(document.contains("n3"));
    assert!(!document.contains("child"));
}

#[test]
fn delete_edge_leaves_endpoints() {
    let mut document = two_nodes();
    let edge = apply(&mut document, &Op::add_edge(cid("n1"), cid("n2"))).expect("edge");
    apply(&mut document, &Op::DeleteEdge { id: edge.clone() }).expect("delete");

    assert!(!document.contains(edge.as_str()));
    assert_eq!(document.node_count(), 2);
}

#[test]
fn modify_edge_rewires_one_side() {
    let mut document = two_nodes();
    let edge = apply(&mut document, &Op::add_edge(cid("n1"), cid("n2"))).expect("edge");
    let op = decode(json!({"op": "modify_edge", "id": edge.as_str(), "target": "n1"}));
    assert!(apply_batch(&mut document, &[op], None).success);

    let edge = document.get(edge.as_str()).expect("edge");
    assert_eq!(edge.source_id(), Some(&cid("n1")));
    assert_eq!(edge.target_id(), Some(&cid("n1")));
}

#[test]
fn stale_intent_leaves_user_value() {
    let mut document = two_nodes();
    let baseline = Baseline::capture(BaselineId::new("1").expect("baseline"), &document);
    document.get_mut("n1").expect("n1").set_value("B");

    let agent_writes = BTreeMap::new();
    let guard = IntentGuard::new(&baseline, &agent_writes);
    let ops = batch(vec![Op::set_node_value(cid("n1"), "C")]);
    let result = apply_batch(&mut document, &ops, Some(&guard));

    assert_eq!(result.conflicts.len(), 1);
    assert_eq!(result.conflicts[0].reason, ConflictReason::StaleIntent);
    assert!(result.conflicts[0].description.contains("(value)"));
    assert_eq!(document.get("n1").map(Cell::value), Some("B"));
}

#[test]
fn without_guard_user_value_is_overwritten() {
    let mut document = two_nodes();
    document.get_mut("n1").expect("n1").set_value("B");
    let result = apply_batch(&mut document, &batch(vec![Op::set_node_value(cid("n1"), "C")]), None);

    assert!(result.success);
    assert_eq!(document.get("n1").map(Cell::value), Some("C"));
}

#[test]
fn stale_intent_covers_deletes() {
    let mut document = two_nodes();
    let baseline = Baseline::capture(BaselineId::new("1").expect("baseline"), &document);
    document.get_mut("n2").expect("n2").set_style("fillColor=red;");

    let agent_writes = BTreeMap::new();
    let guard = IntentGuard::new(&baseline, &agent_writes);
    let result =
        apply_batch(&mut document, &batch(vec![Op::DeleteNode { id: cid("n2") }]), Some(&guard));

    assert_eq!(result.conflicts[0].reason, ConflictReason::StaleIntent);
    assert!(document.contains("n2"));
}

#[test]
fn stale_intent_covers_edges_removed_by_a_node_delete() {
    let mut document = two_nodes();
    let edge = apply(&mut document, &Op::add_edge(cid("n1"), cid("n2"))).expect("edge");
    let baseline = Baseline::capture(BaselineId::new("1").expect("baseline"), &document);
    document.get_mut(edge.as_str()).expect("edge").set_value("user label");

    let agent_writes = BTreeMap::new();
    let guard = IntentGuard::new(&baseline, &agent_writes);
    let result =
        apply_batch(&mut document, &batch(vec![Op::DeleteNode { id: cid("n1") }]), Some(&guard));

    assert_eq!(result.applied, 0);
    let conflict = &result.conflicts[0];
    assert_eq!(conflict.reason, ConflictReason::StaleIntent);
    assert_eq!(conflict.id, "n1");
    assert!(conflict.description.contains(&format!("edge '{edge}'")), "{}", conflict.description);
    assert!(document.contains("n1"));
    assert_eq!(document.get(edge.as_str()).map(Cell::value), Some("user label"));
}

#[test]
fn untouched_dependents_do_not_block_a_node_delete() {
    let mut document = two_nodes();
    let edge = apply(&mut document, &Op::add_edge(cid("n1"), cid("n2"))).expect("edge");
    let baseline = Baseline::capture(BaselineId::new("1").expect("baseline"), &document);

    let agent_writes = BTreeMap::new();
    let guard = IntentGuard::new(&baseline, &agent_writes);
    let result =
        apply_batch(&mut document, &batch(vec![Op::DeleteNode { id: cid("n1") }]), Some(&guard));

    assert!(result.success, "{}", result.summary);
    assert!(!document.contains("n1"));
    assert!(!document.contains(edge.as_str()));
}

#[test]
fn add_node_reports_exhausted_id_space_as_a_conflict() {
    let mut document = two_nodes();
    let max = u64::MAX.to_string();
    let explicit = decode(json!({"op": "add_node", "id": max, "value": "last"}));
    let ops = vec![explicit, Op::add_node("x").into(), Op::set_node_value(cid("n1"), "A2").into()];
    let result = apply_batch(&mut document, &ops, None);

    assert_eq!(result.applied, 2);
    assert_eq!(result.conflicts.len(), 1);
    assert_eq!(result.conflicts[0].op_index, 1);
    assert_eq!(result.conflicts[0].reason, ConflictReason::DuplicateId);
    assert!(result.conflicts[0].description.contains("id space exhausted"));
}

#[test]
fn agent_writes_replace_baseline_expectation() {
    let mut document = two_nodes();
    let baseline = Baseline::capture(BaselineId::new("1").expect("baseline"), &document);
    apply(&mut document, &Op::set_node_value(cid("n1"), "agent")).expect("first write");

    let mut agent_writes = BTreeMap::new();
    agent_writes.insert(cid("n1"), document.get("n1").expect("n1").clone());
    let guard = IntentGuard::new(&baseline, &agent_writes);
    let ops = batch(vec![Op::set_node_value(cid("n1"), "agent again")]);
    let result = apply_batch(&mut document, &ops, Some(&guard));

    assert!(result.success);
    assert_eq!(document.get("n1").map(Cell::value), Some("agent again"));
}

#[test]
fn cells_created_after_baseline_are_not_stale_checked() {
    let mut document = two_nodes();
    let baseline = Baseline::capture(BaselineId::new("1").expect("baseline"), &document);
    let fresh = apply(&mut document, &Op::add_node("fresh")).expect("add");
    document.get_mut(fresh.as_str()).expect("fresh").set_value("edited by user");

    let agent_writes = BTreeMap::new();
    let guard = IntentGuard::new(&baseline, &agent_writes);
    let ops = batch(vec![Op::set_node_value(fresh.clone(), "agent")]);

    assert!(apply_batch(&mut document, &ops, Some(&guard)).success);
}

#[test]
fn unknown_operation_kind_is_reported() {
    let mut document = two_nodes();
    let ops = vec![
        decode(json!({"op": "move_node", "id": "n1"})),
        Op::set_node_value(cid("n2"), "B2").into(),
    ];
    let result = apply_batch(&mut document, &ops, None);

    assert_eq!(result.applied, 1);
    let conflict = &result.conflicts[0];
    assert_eq!(conflict.reason, ConflictReason::UnknownOperation);
    assert_eq!(conflict.id, "n1");
    assert_eq!(conflict.description, "unrecognized operation kind 'move_node'");
}

#[test]
fn malformed_known_operation_is_reported() {
    let mut document = two_nodes();
    let op = decode(json!({"op": "add_edge", "source": "n1"}));
    assert!(matches!(op, BatchOp::Unrecognized(_)));

    let result = apply_batch(&mut document, &[op], None);
    let conflict = &result.conflicts[0];
    assert_eq!(conflict.reason, ConflictReason::UnknownOperation);
    assert!(conflict.description.starts_with("malformed add_edge operation"));
}

#[test]
fn operation_json_accepts_short_aliases() {
    let op = decode(json!({"op": "add_edge", "source": "a", "target": "b", "value": "calls"}));
    let BatchOp::Known(Op::AddEdge { source_id, target_id, value, .. }) = op else {
        panic!("expected add_edge");
    };
    assert_eq!(source_id, cid("a"));
    assert_eq!(target_id, cid("b"));
    assert_eq!(value, "calls");

    let encoded = serde_json::to_value(Op::DeleteNode { id: cid("n1") }).expect("encode");
    assert_eq!(encoded, json!({"op": "delete_node", "id": "n1"}));
}

#[test]
fn revision_bumps_once_per_batch_with_applied_ops() {
    let mut document = two_nodes();
    let result = apply_batch(&mut document, &batch(vec![Op::DeleteEdge { id: cid("x") }]), None);
    assert_eq!(result.new_rev, 0);

    let ops = batch(vec![Op::add_node("a"), Op::add_node("b")]);
    let result = apply_batch(&mut document, &ops, None);
    assert_eq!(result.new_rev, 1);
    assert_eq!(result.summary, "applied 2 of 2 operations");
}

#[test]
fn delta_nets_out_cells_added_and_removed_in_one_batch() {
    let mut document = Document::new();
    let ops = vec![
        decode(json!({"op": "add_node", "id": "tmp"})),
        decode(json!({"op": "delete_node", "id": "tmp"})),
    ];
    let result = apply_batch(&mut document, &ops, None);

    assert!(result.success);
    assert!(result.delta.is_empty());
}

#[test]
fn empty_batch_reports_nothing_submitted() {
    let mut document = Document::new();
    let result = apply_batch(&mut document, &[], None);

    assert!(result.success);
    assert_eq!(result.applied, 0);
    assert_eq!(result.summary, "no operations submitted");
}

// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Mutation operations for diagram documents.
//!
//! A batch is evaluated op by op against the running document. An op that cannot be applied
//! safely produces a [`Conflict`] and leaves the document untouched; the rest of the batch still
//! applies. Each applied op contributes to a coarse [`Delta`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{Baseline, Cell, CellId, Document, Position, Size};

pub const DEFAULT_NODE_TYPE: &str = "rectangle";
pub const DEFAULT_NODE_POSITION: Position = Position { x: 100.0, y: 100.0 };
pub const DEFAULT_NODE_SIZE: Size = Size { width: 120.0, height: 60.0 };
pub const DEFAULT_EDGE_STYLE: &str = "edgeStyle=orthogonalEdgeStyle;rounded=1;orthogonalLoop=1;jettySize=auto;html=1;endArrow=classic;strokeWidth=2;";

const RECTANGLE_STYLE: &str =
    "rounded=1;whiteSpace=wrap;html=1;fillColor=#dae8fc;strokeColor=#6c8ebf;";
const ELLIPSE_STYLE: &str = "ellipse;whiteSpace=wrap;html=1;fillColor=#d5e8d4;strokeColor=#82b366;";
const RHOMBUS_STYLE: &str = "rhombus;whiteSpace=wrap;html=1;fillColor=#fff2cc;strokeColor=#d6b656;";
const CYLINDER_STYLE: &str =
    "shape=cylinder3;whiteSpace=wrap;html=1;fillColor=#e1d5e7;strokeColor=#9673a6;";

/// Style used for an `add_node` without an explicit style. Unknown node types fall back to the
/// rectangle style.
pub fn default_node_style(node_type: &str) -> &'static str {
    match node_type {
        "ellipse" => ELLIPSE_STYLE,
        "rhombus" => RHOMBUS_STYLE,
        "cylinder" => CYLINDER_STYLE,
        _ => RECTANGLE_STYLE,
    }
}

fn default_node_type() -> String {
    DEFAULT_NODE_TYPE.to_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    AddNode {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<CellId>,
        #[serde(default = "default_node_type")]
        node_type: String,
        #[serde(default)]
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Position>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<Size>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<String>,
        #[serde(default, alias = "parent", skip_serializing_if = "Option::is_none")]
        parent_id: Option<CellId>,
    },
    ModifyNode {
        id: CellId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Position>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<Size>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<String>,
    },
    DeleteNode {
        id: CellId,
    },
    AddEdge {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<CellId>,
        #[serde(alias = "source")]
        source_id: CellId,
        #[serde(alias = "target")]
        target_id: CellId,
        #[serde(default)]
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<String>,
    },
    ModifyEdge {
        id: CellId,
        #[serde(default, alias = "source", skip_serializing_if = "Option::is_none")]
        source_id: Option<CellId>,
        #[serde(default, alias = "target", skip_serializing_if = "Option::is_none")]
        target_id: Option<CellId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<String>,
    },
    DeleteEdge {
        id: CellId,
    },
}

impl Op {
    pub fn add_node(value: impl Into<String>) -> Self {
        Self::AddNode {
            id: None,
            node_type: default_node_type(),
            value: value.into(),
            position: None,
            size: None,
            style: None,
            parent_id: None,
        }
    }

    pub fn add_edge(source_id: CellId, target_id: CellId) -> Self {
        Self::AddEdge { id: None, source_id, target_id, value: String::new(), style: None }
    }

    pub fn set_node_value(id: CellId, value: impl Into<String>) -> Self {
        Self::ModifyNode { id, value: Some(value.into()), position: None, size: None, style: None }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            Self::AddNode { .. } => OpKind::AddNode,
            Self::ModifyNode { .. } => OpKind::ModifyNode,
            Self::DeleteNode { .. } => OpKind::DeleteNode,
            Self::AddEdge { .. } => OpKind::AddEdge,
            Self::ModifyEdge { .. } => OpKind::ModifyEdge,
            Self::DeleteEdge { .. } => OpKind::DeleteEdge,
        }
    }

    /// The id the op names explicitly, if any.
    pub fn target_id(&self) -> Option<&CellId> {
        match self {
            Self::AddNode { id, .. } | Self::AddEdge { id, .. } => id.as_ref(),
            Self::ModifyNode { id, .. }
            | Self::DeleteNode { id }
            | Self::ModifyEdge { id, .. }
            | Self::DeleteEdge { id } => Some(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    AddNode,
    ModifyNode,
    DeleteNode,
    AddEdge,
    ModifyEdge,
    DeleteEdge,
}

impl OpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddNode => "add_node",
            Self::ModifyNode => "modify_node",
            Self::DeleteNode => "delete_node",
            Self::AddEdge => "add_edge",
            Self::ModifyEdge => "modify_edge",
            Self::DeleteEdge => "delete_edge",
        }
    }

    /// Ops whose intent depends on the target's current content.
    pub fn is_stale_checked(self) -> bool {
        matches!(self, Self::ModifyNode | Self::DeleteNode | Self::ModifyEdge | Self::DeleteEdge)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a submitted batch. Entries that do not decode as an [`Op`] are kept verbatim so
/// they can be reported back as conflicts instead of failing the whole request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum BatchOp {
    Known(Op),
    Unrecognized(serde_json::Value),
}

impl From<Op> for BatchOp {
    fn from(op: Op) -> Self {
        Self::Known(op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    ReferencedIdNotFound,
    DuplicateId,
    StaleIntent,
    UnknownOperation,
    InvalidParent,
}

impl ConflictReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReferencedIdNotFound => "referenced_id_not_found",
            Self::DuplicateId => "duplicate_id",
            Self::StaleIntent => "stale_intent",
            Self::UnknownOperation => "unknown_operation",
            Self::InvalidParent => "invalid_parent",
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An op that was evaluated but not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Conflict {
    pub op_index: usize,
    /// The cell id the op referred to; empty when the op named none.
    pub id: String,
    pub reason: ConflictReason,
    pub description: String,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op #{} ({}): {}", self.op_index, self.reason, self.description)
    }
}

impl std::error::Error for Conflict {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OpOutcome {
    Applied { op_index: usize, id: CellId },
    Conflict(Conflict),
}

impl OpOutcome {
    pub fn op_index(&self) -> usize {
        match self {
            Self::Applied { op_index, .. } => *op_index,
            Self::Conflict(conflict) => conflict.op_index,
        }
    }

    pub fn applied_id(&self) -> Option<&CellId> {
        match self {
            Self::Applied { id, .. } => Some(id),
            Self::Conflict(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ApplyResult {
    /// True when every op in the batch applied.
    pub success: bool,
    pub applied: usize,
    pub conflicts: Vec<Conflict>,
    pub outcomes: Vec<OpOutcome>,
    pub summary: String,
    pub new_rev: u64,
    pub delta: Delta,
}

impl ApplyResult {
    /// Ids produced or touched by applied ops, in submission order.
    pub fn applied_ids(&self) -> Vec<&CellId> {
        self.outcomes.iter().filter_map(OpOutcome::applied_id).collect()
    }
}

/// Minimal delta describing which cells changed as the result of applying ops.
///
/// This is intentionally coarse: it reports only added/removed/updated cell ids.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Delta {
    pub added: Vec<CellId>,
    pub removed: Vec<CellId>,
    pub updated: Vec<CellId>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

#[derive(Debug, Default)]
struct DeltaBuilder {
    added: BTreeSet<CellId>,
    removed: BTreeSet<CellId>,
    updated: BTreeSet<CellId>,
}

impl DeltaBuilder {
    fn record_added(&mut self, id: CellId) {
        self.removed.remove(&id);
        self.updated.remove(&id);
        self.added.insert(id);
    }

    fn record_removed(&mut self, id: CellId) {
        self.updated.remove(&id);
        // Added and removed within one batch nets out.
        if !self.added.remove(&id) {
            self.removed.insert(id);
        }
    }

    fn record_updated(&mut self, id: CellId) {
        if self.added.contains(&id) || self.removed.contains(&id) {
            return;
        }
        self.updated.insert(id);
    }

    fn finish(self) -> Delta {
        Delta {
            added: self.added.into_iter().collect(),
            removed: self.removed.into_iter().collect(),
            updated: self.updated.into_iter().collect(),
        }
    }
}

/// What the agent expects each cell to hold, used to detect edits made behind its back.
///
/// The expectation for a cell is the agent's own last write to it since the baseline, or the
/// baseline content otherwise. Cells the baseline does not know about have no expectation.
#[derive(Debug, Clone, Copy)]
pub struct IntentGuard<'a> {
    baseline: &'a Baseline,
    agent_writes: &'a BTreeMap<CellId, Cell>,
}

impl<'a> IntentGuard<'a> {
    pub fn new(baseline: &'a Baseline, agent_writes: &'a BTreeMap<CellId, Cell>) -> Self {
        Self { baseline, agent_writes }
    }

    pub fn expected(&self, id: &str) -> Option<&'a Cell> {
        self.agent_writes.get(id).or_else(|| self.baseline.get(id))
    }
}

/// Applies a single op. The document revision is bumped when it applies.
pub fn apply(document: &mut Document, op: &Op) -> Result<CellId, Conflict> {
    let mut delta = DeltaBuilder::default();
    let id = apply_op(document, op, None, &mut delta).map_err(|rejection| rejection.at(0))?;
    document.bump_rev();
    Ok(id)
}

/// Evaluates every entry of `ops` in order against the running document.
///
/// Conflicts never stop the batch and nothing is rolled back. With a guard, ops that modify or
/// delete a cell whose content differs from the guard's expectation are skipped as stale.
pub fn apply_batch(
    document: &mut Document,
    ops: &[BatchOp],
    guard: Option<&IntentGuard<'_>>,
) -> ApplyResult {
    let mut delta = DeltaBuilder::default();
    let mut outcomes = Vec::with_capacity(ops.len());
    let mut conflicts = Vec::new();

    for (op_index, entry) in ops.iter().enumerate() {
        let result = match entry {
            BatchOp::Known(op) => apply_op(document, op, guard, &mut delta),
            BatchOp::Unrecognized(raw) => Err(Rejection::unrecognized(raw)),
        };
        match result {
            Ok(id) => {
                log::debug!("op #{op_index} applied to cell {id}");
                outcomes.push(OpOutcome::Applied { op_index, id });
            }
            Err(rejection) => {
                let conflict = rejection.at(op_index);
                log::debug!("{conflict}");
                conflicts.push(conflict.clone());
                outcomes.push(OpOutcome::Conflict(conflict));
            }
        }
    }

    let applied = ops.len() - conflicts.len();
    if applied > 0 {
        document.bump_rev();
    }

    ApplyResult {
        success: conflicts.is_empty(),
        applied,
        summary: batch_summary(ops.len(), applied, &conflicts),
        conflicts,
        outcomes,
        new_rev: document.rev(),
        delta: delta.finish(),
    }
}

fn batch_summary(total: usize, applied: usize, conflicts: &[Conflict]) -> String {
    if total == 0 {
        return "no operations submitted".to_owned();
    }
    let mut summary = format!("applied {applied} of {total} operations");
    if !conflicts.is_empty() {
        let mut by_reason = BTreeMap::<&str, usize>::new();
        for conflict in conflicts {
            *by_reason.entry(conflict.reason.as_str()).or_default() += 1;
        }
        let reasons = by_reason
            .into_iter()
            .map(|(reason, count)| format!("{reason} x{count}"))
            .collect::<Vec<_>>()
            .join(", ");
        let noun = if conflicts.len() == 1 { "conflict" } else { "conflicts" };
        summary.push_str(&format!("; {} {noun} ({reasons})", conflicts.len()));
    }
    summary
}

// Per-op checks and mutations.
include!("ops_impl.rs");

#[cfg(test)]
mod tests;

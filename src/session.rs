// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Document-scoped editing context for one tab.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::diff::{BaselineInfo, ChangeSet, ChangeTracker};
use crate::model::{Baseline, Cell, CellId, Document, Geometry};
use crate::ops::{apply_batch, ApplyResult, BatchOp, Delta, IntentGuard};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ElementFilter {
    #[default]
    All,
    Nodes,
    Edges,
}

impl ElementFilter {
    fn admits(self, cell: &Cell) -> bool {
        match self {
            Self::All => cell.is_node() || cell.is_edge(),
            Self::Nodes => cell.is_node(),
            Self::Edges => cell.is_edge(),
        }
    }
}

/// Agent-facing view of a node or edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Element {
    pub id: CellId,
    pub kind: String,
    pub value: String,
    pub style: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CellId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<CellId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<CellId>,
}

impl Element {
    fn of(cell: &Cell) -> Self {
        Self {
            id: cell.id().clone(),
            kind: cell.kind_label().to_owned(),
            value: cell.value().to_owned(),
            style: cell.style().to_owned(),
            parent_id: cell.parent_id().cloned(),
            geometry: cell.geometry().copied(),
            source_id: cell.source_id().cloned(),
            target_id: cell.target_id().cloned(),
        }
    }
}

/// One tab's document together with its baseline and the agent's own writes since the last
/// sync.
///
/// The agent's writes stand in for the baseline when checking for stale intent, so a batch never
/// conflicts with an earlier batch from the same agent. The baseline itself only changes on
/// [`EditSession::sync`].
#[derive(Debug, Clone)]
pub struct EditSession {
    document: Document,
    tracker: ChangeTracker,
    agent_writes: BTreeMap<CellId, Cell>,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new(Document::new())
    }
}

impl EditSession {
    pub fn new(document: Document) -> Self {
        let tracker = ChangeTracker::new(&document);
        Self { document, tracker, agent_writes: BTreeMap::new() }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn baseline(&self) -> &Baseline {
        self.tracker.baseline()
    }

    /// Applies an agent batch. With `preserve_user_changes`, ops aimed at cells the user changed
    /// since the agent last looked are skipped as stale.
    pub fn apply_batch(&mut self, ops: &[BatchOp], preserve_user_changes: bool) -> ApplyResult {
        let result = if preserve_user_changes {
            let guard = IntentGuard::new(self.tracker.baseline(), &self.agent_writes);
            apply_batch(&mut self.document, ops, Some(&guard))
        } else {
            apply_batch(&mut self.document, ops, None)
        };
        self.remember_agent_writes(&result.delta);
        result
    }

    /// Applies edits made by the human. These are never stale-checked and are not remembered as
    /// agent writes.
    pub fn apply_human(&mut self, ops: &[BatchOp]) -> ApplyResult {
        apply_batch(&mut self.document, ops, None)
    }

    /// Swaps in a whole new document, as reported by the editor.
    pub fn replace_document(&mut self, mut document: Document) {
        document.continue_from(&self.document);
        self.document = document;
    }

    pub fn changes(&self, include_details: bool) -> ChangeSet {
        self.tracker.get_changes(&self.document, include_details)
    }

    pub fn sync(&mut self) -> BaselineInfo {
        self.agent_writes.clear();
        self.tracker.sync(&self.document)
    }

    pub fn elements(&self, filter: ElementFilter) -> Vec<Element> {
        self.document.cells().filter(|cell| filter.admits(cell)).map(Element::of).collect()
    }

    fn remember_agent_writes(&mut self, delta: &Delta) {
        for id in delta.added.iter().chain(&delta.updated) {
            if let Some(cell) = self.document.get(id.as_str()) {
                self.agent_writes.insert(id.clone(), cell.clone());
            }
        }
        for id in &delta.removed {
            self.agent_writes.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{EditSession, ElementFilter};
    use crate::format::parse_document;
    use crate::model::CellId;
    use crate::ops::{BatchOp, ConflictReason, Op};

    fn cid(value: &str) -> CellId {
        CellId::new(value).expect("cell id")
    }

    fn set_n1(value: &str) -> [BatchOp; 1] {
        [BatchOp::from(Op::set_node_value(cid("n1"), value))]
    }

    fn session_with_node(value: &str) -> EditSession {
        let mut session = EditSession::default();
        let op = serde_json::json!({"op": "add_node", "id": "n1", "value": value});
        let op: BatchOp = serde_json::from_value(op).expect("op");
        assert!(session.apply_human(&[op]).success);
        session.sync();
        session
    }

    #[test]
    fn agent_does_not_conflict_with_its_own_earlier_batch() {
        let mut session = session_with_node("A");

        let first = session.apply_batch(&set_n1("B"), true);
        let second = session.apply_batch(&set_n1("C"), true);

        assert!(first.success);
        assert!(second.success);
        assert_eq!(session.document().get("n1").map(|c| c.value()), Some("C"));
        assert_eq!(session.baseline().get("n1").map(|c| c.value()), Some("A"));
    }

    #[test]
    fn user_edit_after_agent_write_is_stale() {
        let mut session = session_with_node("A");
        session.apply_batch(&set_n1("agent"), true);
        session.apply_human(&set_n1("user"));

        let ops = set_n1("agent 2");
        let result = session.apply_batch(&ops, true);

        assert_eq!(result.conflicts[0].reason, ConflictReason::StaleIntent);
        assert_eq!(session.document().get("n1").map(|c| c.value()), Some("user"));
    }

    #[test]
    fn sync_forgets_agent_writes_and_resets_changes() {
        let mut session = session_with_node("A");
        session.apply_batch(&[BatchOp::from(Op::add_node("B"))], true);
        assert!(session.changes(false).has_changes);

        let info = session.sync();
        assert_eq!(info.baseline_id.as_str(), "3");
        assert!(!session.changes(false).has_changes);
    }

    #[test]
    fn replace_document_keeps_ids_moving_forward() {
        let mut session = EditSession::default();
        let ops = [BatchOp::from(Op::add_node("a")), BatchOp::from(Op::add_node("b"))];
        let result = session.apply_batch(&ops, false);
        assert_eq!(result.applied_ids()[1].as_str(), "3");
        let rev = session.document().rev();

        let replacement = parse_document(
            r#"<root><mxCell id="0"/><mxCell id="1" parent="0"/><mxCell id="2" value="a" vertex="1" parent="1"><mxGeometry x="0" y="0" width="10" height="10" as="geometry"/></mxCell></root>"#,
        )
        .expect("document");
        session.replace_document(replacement);

        assert!(session.document().rev() > rev);
        let result = session.apply_batch(&[BatchOp::from(Op::add_node("c"))], false);
        assert_eq!(result.applied_ids()[0].as_str(), "4");
    }

    #[rstest]
    #[case(ElementFilter::All, 3)]
    #[case(ElementFilter::Nodes, 2)]
    #[case(ElementFilter::Edges, 1)]
    fn elements_filter_by_kind(#[case] filter: ElementFilter, #[case] expected: usize) {
        let mut session = EditSession::default();
        let ops = [
            BatchOp::from(Op::add_node("a")),
            BatchOp::from(Op::add_node("b")),
            BatchOp::from(Op::add_edge(cid("2"), cid("3"))),
        ];
        assert!(session.apply_batch(&ops, false).success);

        let elements = session.elements(filter);
        assert_eq!(elements.len(), expected);
        assert!(elements.iter().all(|element| !element.id.is_reserved()));
    }
}

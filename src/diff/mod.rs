// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Change tracking between a baseline and the live document.
//!
//! Cells are matched by id only. An id present on both sides is compared field by field and is
//! never reported as a delete plus an add.

use std::fmt::Write as _;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{Baseline, BaselineId, Cell, CellField, CellId, Document};

/// Compact description of an added or deleted cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CellSummary {
    pub id: CellId,
    pub kind: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<CellId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<CellId>,
}

impl CellSummary {
    pub fn of(cell: &Cell) -> Self {
        Self {
            id: cell.id().clone(),
            kind: cell.kind_label().to_owned(),
            value: cell.value().to_owned(),
            source_id: cell.source_id().cloned(),
            target_id: cell.target_id().cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldChange {
    pub field: CellField,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ModifiedCell {
    pub id: CellId,
    pub kind: String,
    pub changes: Vec<FieldChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChangeSet {
    pub baseline_id: BaselineId,
    pub has_changes: bool,
    pub added: Vec<CellSummary>,
    pub modified: Vec<ModifiedCell>,
    pub deleted: Vec<CellSummary>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Identity of a freshly taken baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BaselineInfo {
    pub baseline_id: BaselineId,
    pub taken_at_ms: u64,
    pub document_rev: u64,
    pub node_count: usize,
    pub edge_count: usize,
}

impl BaselineInfo {
    pub fn of(baseline: &Baseline) -> Self {
        Self {
            baseline_id: baseline.baseline_id().clone(),
            taken_at_ms: baseline.taken_at_ms(),
            document_rev: baseline.document_rev(),
            node_count: baseline.node_count(),
            edge_count: baseline.edge_count(),
        }
    }
}

/// Structural diff of `document` against `baseline`.
///
/// `added` and `modified` follow document order, `deleted` follows baseline order. The baseline
/// is only read.
pub fn compute_changes(
    document: &Document,
    baseline: &Baseline,
    include_details: bool,
) -> ChangeSet {
    let mut added = Vec::new();
    let mut modified = Vec::new();
    for cell in document.cells() {
        match baseline.get(cell.id().as_str()) {
            None => added.push(CellSummary::of(cell)),
            Some(before) => {
                let changes = before
                    .differing_fields(cell)
                    .into_iter()
                    .map(|field| FieldChange {
                        field,
                        before: before.field_text(field),
                        after: cell.field_text(field),
                    })
                    .collect::<Vec<_>>();
                if !changes.is_empty() {
                    modified.push(ModifiedCell {
                        id: cell.id().clone(),
                        kind: cell.kind_label().to_owned(),
                        changes,
                    });
                }
            }
        }
    }
    let deleted = baseline
        .cells()
        .iter()
        .filter(|cell| !document.contains(cell.id().as_str()))
        .map(CellSummary::of)
        .collect::<Vec<_>>();

    let has_changes = !(added.is_empty() && modified.is_empty() && deleted.is_empty());
    let summary = if has_changes {
        format!("{} added, {} modified, {} deleted", added.len(), modified.len(), deleted.len())
    } else {
        format!("no changes since baseline {}", baseline.baseline_id())
    };
    let details = include_details.then(|| render_details(&added, &modified, &deleted));

    ChangeSet {
        baseline_id: baseline.baseline_id().clone(),
        has_changes,
        added,
        modified,
        deleted,
        summary,
        details,
    }
}

fn render_details(
    added: &[CellSummary],
    modified: &[ModifiedCell],
    deleted: &[CellSummary],
) -> String {
    let mut out = String::new();
    for cell in added {
        let _ = writeln!(out, "id={}: added {} {:?}", cell.id, cell.kind, cell.value);
    }
    for cell in modified {
        for change in &cell.changes {
            let _ = writeln!(
                out,
                "id={}: {} {:?} -> {:?}",
                cell.id, change.field, change.before, change.after
            );
        }
    }
    for cell in deleted {
        let _ = writeln!(out, "id={}: deleted {} {:?}", cell.id, cell.kind, cell.value);
    }
    out
}

/// Owns the baseline of one document. Only [`ChangeTracker::sync`] replaces it.
#[derive(Debug, Clone)]
pub struct ChangeTracker {
    baseline: Baseline,
    syncs: u64,
}

impl ChangeTracker {
    /// Starts tracking with baseline `1` taken from `document`.
    pub fn new(document: &Document) -> Self {
        Self { baseline: Baseline::capture(baseline_id(1), document), syncs: 1 }
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn get_changes(&self, document: &Document, include_details: bool) -> ChangeSet {
        compute_changes(document, &self.baseline, include_details)
    }

    pub fn sync(&mut self, document: &Document) -> BaselineInfo {
        self.syncs = self.syncs.saturating_add(1);
        self.baseline = Baseline::capture(baseline_id(self.syncs), document);
        log::info!(
            "baseline {} taken at rev {} ({} nodes, {} edges)",
            self.baseline.baseline_id(),
            self.baseline.document_rev(),
            self.baseline.node_count(),
            self.baseline.edge_count()
        );
        BaselineInfo::of(&self.baseline)
    }
}

fn baseline_id(sequence: u64) -> BaselineId {
    BaselineId::new(sequence.to_string()).expect("decimal ids are non-empty")
}

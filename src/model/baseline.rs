// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use super::cell::Cell;
use super::document::Document;
use super::ids::{BaselineId, CellId};

/// Immutable point-in-time copy of a document's cells, used as the diff reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    baseline_id: BaselineId,
    taken_at_ms: u64,
    document_rev: u64,
    cells: Vec<Cell>,
    index: BTreeMap<CellId, usize>,
}

impl Baseline {
    pub fn capture(baseline_id: BaselineId, document: &Document) -> Self {
        let taken_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let cells = document.cells().cloned().collect::<Vec<_>>();
        let index = cells
            .iter()
            .enumerate()
            .map(|(position, cell)| (cell.id().clone(), position))
            .collect();

        Self { baseline_id, taken_at_ms, document_rev: document.rev(), cells, index }
    }

    pub fn baseline_id(&self) -> &BaselineId {
        &self.baseline_id
    }

    pub fn taken_at_ms(&self) -> u64 {
        self.taken_at_ms
    }

    pub fn document_rev(&self) -> u64 {
        self.document_rev
    }

    pub fn get(&self, id: &str) -> Option<&Cell> {
        self.index.get(id).and_then(|position| self.cells.get(*position))
    }

    /// Cells in the order the document held them when captured.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn node_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_node()).count()
    }

    pub fn edge_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_edge()).count()
    }
}

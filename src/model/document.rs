// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeMap, BTreeSet};

use super::cell::Cell;
use super::ids::{CellId, LAYER_CELL_ID, ROOT_CELL_ID};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("duplicate cell id '{0}'")]
    DuplicateId(CellId),
    #[error("missing reserved cell '{0}'")]
    MissingReservedCell(&'static str),
    #[error("id space exhausted: no generated id is left above the largest numeric id")]
    IdSpaceExhausted,
}

/// The canonical graph of one editing session: cells in document order plus the id counter
/// used for generated ids.
///
/// Generated ids are decimal strings drawn from a counter that only moves forward. The counter
/// is also advanced past every numeric id the document has ever held, so a generated id never
/// collides with, or resurrects, an id that existed before.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    cells: BTreeMap<CellId, Cell>,
    order: Vec<CellId>,
    /// `None` once a numeric id of `u64::MAX` has been seen or handed out.
    next_id: Option<u64>,
    rev: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document holding only the root cell and the default layer.
    pub fn new() -> Self {
        let mut document =
            Self { cells: BTreeMap::new(), order: Vec::new(), next_id: Some(2), rev: 0 };
        document.push_unchecked(Cell::container(CellId::root(), None));
        document.push_unchecked(Cell::container(CellId::layer(), Some(CellId::root())));
        document
    }

    pub fn from_cells(cells: impl IntoIterator<Item = Cell>) -> Result<Self, DocumentError> {
        let mut document =
            Self { cells: BTreeMap::new(), order: Vec::new(), next_id: Some(2), rev: 0 };
        for cell in cells {
            document.insert(cell)?;
        }
        if !document.contains(ROOT_CELL_ID) {
            return Err(DocumentError::MissingReservedCell(ROOT_CELL_ID));
        }
        if !document.contains(LAYER_CELL_ID) {
            return Err(DocumentError::MissingReservedCell(LAYER_CELL_ID));
        }
        Ok(document)
    }

    fn push_unchecked(&mut self, cell: Cell) {
        self.observe_id(cell.id().as_str());
        self.order.push(cell.id().clone());
        self.cells.insert(cell.id().clone(), cell);
    }

    pub fn insert(&mut self, cell: Cell) -> Result<(), DocumentError> {
        if self.cells.contains_key(cell.id()) {
            return Err(DocumentError::DuplicateId(cell.id().clone()));
        }
        self.push_unchecked(cell);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<Cell> {
        let removed = self.cells.remove(id)?;
        self.order.retain(|candidate| candidate.as_str() != id);
        Some(removed)
    }

    pub fn get(&self, id: &str) -> Option<&Cell> {
        self.cells.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Cell> {
        self.cells.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cells.contains_key(id)
    }

    /// Cells in document order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.order.iter().filter_map(|id| self.cells.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells().filter(|cell| cell.is_node())
    }

    pub fn edges(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells().filter(|cell| cell.is_edge())
    }

    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    /// Hands out the next unused generated id. Never returns a reserved id, and fails once the
    /// counter has passed `u64::MAX`.
    pub fn allocate_id(&mut self) -> Result<CellId, DocumentError> {
        loop {
            let numeric = self.next_id.ok_or(DocumentError::IdSpaceExhausted)?;
            self.next_id = numeric.checked_add(1);
            let candidate = numeric.to_string();
            if !self.cells.contains_key(candidate.as_str()) {
                return Ok(CellId::new(candidate).expect("decimal ids are non-empty"));
            }
        }
    }

    /// The id the next allocation will try, or `None` when the id space is used up.
    pub fn next_generated_id(&self) -> Option<u64> {
        self.next_id
    }

    /// Keeps the counter ahead of numeric ids that enter the document from any path.
    pub fn observe_id(&mut self, id: &str) {
        let Ok(numeric) = id.parse::<u64>() else {
            return;
        };
        if let Some(next) = self.next_id {
            if numeric >= next {
                self.next_id = numeric.checked_add(1);
            }
        }
    }

    /// Carries the id counter over from the document this one replaces.
    pub fn inherit_id_counter(&mut self, previous: &Document) {
        self.next_id = match (self.next_id, previous.next_id) {
            (Some(own), Some(inherited)) => Some(own.max(inherited)),
            _ => None,
        };
    }

    /// Makes this document the successor of `previous`: the id counter never moves backwards
    /// and the revision continues past the previous one.
    pub fn continue_from(&mut self, previous: &Document) {
        self.inherit_id_counter(previous);
        self.rev = self.rev.max(previous.rev.saturating_add(1));
    }

    /// Ids removed together with `id`: cells parented (transitively) under it and edges attached
    /// to any of those cells. The result excludes `id` itself and is in document order.
    pub fn dependents_of(&self, id: &CellId) -> Vec<CellId> {
        let mut doomed = BTreeSet::new();
        doomed.insert(id.clone());

        loop {
            let before = doomed.len();
            for cell in self.cells() {
                if doomed.contains(cell.id()) {
                    continue;
                }
                let parent_doomed = cell.parent_id().is_some_and(|parent| doomed.contains(parent));
                let endpoint_doomed = cell.source_id().is_some_and(|source| doomed.contains(source))
                    || cell.target_id().is_some_and(|target| doomed.contains(target));
                if parent_doomed || endpoint_doomed {
                    doomed.insert(cell.id().clone());
                }
            }
            if doomed.len() == before {
                break;
            }
        }

        self.order
            .iter()
            .filter(|candidate| *candidate != id && doomed.contains(*candidate))
            .cloned()
            .collect()
    }

    pub fn rev(&self) -> u64 {
        self.rev
    }

    pub fn bump_rev(&mut self) {
        self.rev = self.rev.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{Document, DocumentError};
    use crate::model::{Cell, CellId, Geometry};

    fn cid(value: &str) -> CellId {
        CellId::new(value).expect("cell id")
    }

    fn geometry() -> Geometry {
        Geometry { x: 0.0, y: 0.0, width: 120.0, height: 60.0 }
    }

    #[test]
    fn new_document_has_reserved_cells_only() {
        let document = Document::new();
        let ids = document.cells().map(|cell| cell.id().as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["0", "1"]);
        assert_eq!(document.get("1").and_then(|cell| cell.parent_id()), Some(&CellId::root()));
    }

    #[test]
    fn from_cells_requires_reserved_cells() {
        let result = Document::from_cells([Cell::container(CellId::root(), None)]);
        assert_eq!(result, Err(DocumentError::MissingReservedCell("1")));
    }

    #[test]
    fn insert_rejects_duplicate_ids() {
        let mut document = Document::new();
        document.insert(Cell::node(cid("a"), CellId::layer(), geometry())).expect("insert a");
        let result = document.insert(Cell::node(cid("a"), CellId::layer(), geometry()));
        assert_eq!(result, Err(DocumentError::DuplicateId(cid("a"))));
    }

    #[test]
    fn allocate_id_skips_observed_numeric_ids_and_never_reuses() {
        let mut document = Document::new();
        document.insert(Cell::node(cid("7"), CellId::layer(), geometry())).expect("insert 7");
        assert_eq!(document.allocate_id().expect("id").as_str(), "8");

        document.remove("7");
        let next = document.allocate_id().expect("id");
        assert_eq!(next.as_str(), "9");
    }

    #[test]
    fn allocate_id_fails_once_the_largest_numeric_id_is_taken() {
        let mut document = Document::new();
        let max = u64::MAX.to_string();
        document.insert(Cell::node(cid(&max), CellId::layer(), geometry())).expect("insert max");

        assert_eq!(document.next_generated_id(), None);
        assert_eq!(document.allocate_id(), Err(DocumentError::IdSpaceExhausted));
        assert_eq!(document.allocate_id(), Err(DocumentError::IdSpaceExhausted));
    }

    #[test]
    fn allocate_id_hands_out_the_last_id_then_stops() {
        let mut document = Document::new();
        let below_max = (u64::MAX - 1).to_string();
        document.insert(Cell::node(cid(&below_max), CellId::layer(), geometry())).expect("insert");

        assert_eq!(document.allocate_id().expect("last id").as_str(), u64::MAX.to_string());
        assert_eq!(document.allocate_id(), Err(DocumentError::IdSpaceExhausted));
    }

    #[test]
    fn exhausted_counter_survives_document_replacement() {
        let mut previous = Document::new();
        let max = u64::MAX.to_string();
        previous.insert(Cell::node(cid(&max), CellId::layer(), geometry())).expect("insert max");

        let mut replacement = Document::new();
        replacement.continue_from(&previous);
        assert_eq!(replacement.allocate_id(), Err(DocumentError::IdSpaceExhausted));
    }

    #[test]
    fn dependents_cover_children_and_attached_edges() {
        let mut document = Document::new();
        document.insert(Cell::node(cid("group"), CellId::layer(), geometry())).expect("group");
        document.insert(Cell::node(cid("child"), cid("group"), geometry())).expect("child");
        document.insert(Cell::node(cid("other"), CellId::layer(), geometry())).expect("other");
        document
            .insert(Cell::edge(cid("e1"), CellId::layer(), cid("child"), cid("other")))
            .expect("e1");
        document
            .insert(Cell::edge(cid("e2"), CellId::layer(), cid("other"), cid("other")))
            .expect("e2");

        let dependents = document.dependents_of(&cid("group"));
        assert_eq!(dependents, vec![cid("child"), cid("e1")]);
    }
}

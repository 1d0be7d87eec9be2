// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model: cells, documents, and baselines.
//!
//! A document is an mxGraph cell list with the reserved root (`"0"`) and default layer (`"1"`).

pub mod baseline;
pub mod cell;
pub mod document;
pub mod ids;

pub use baseline::Baseline;
pub use cell::{Cell, CellField, CellKind, Geometry, Position, Size};
pub use document::{Document, DocumentError};
pub use ids::{
    is_reserved_cell_id, BaselineId, CellId, Id, IdError, RequestId, TabId, LAYER_CELL_ID,
    ROOT_CELL_ID,
};

// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Diagram document format parsing/export.
//!
//! Documents travel as draw.io (mxGraph) XML.

pub mod mxgraph;

pub use mxgraph::{export_mxfile, export_root, parse_document, FormatError};

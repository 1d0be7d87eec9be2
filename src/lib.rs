// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Drawbridge: agent/human co-editing of draw.io (mxGraph) diagrams.
//!
//! The core is a typed cell model with an mxGraph XML codec, a validator with a single
//! structural repair, a batch operation engine with per-op conflict reporting, and a
//! baseline-driven change tracker. A [`surface::Surface`] owns the live documents, one per
//! tab; [`coordinator::ApplyCoordinator`] submits batches to it and polls for results.
//! [`mcp::DrawbridgeMcp`] exposes all of it as MCP tools.

pub mod config;
pub mod coordinator;
pub mod diff;
pub mod format;
pub mod logging;
pub mod mcp;
pub mod model;
pub mod ops;
pub mod session;
pub mod surface;
pub mod validate;

// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ops::{ApplyResult, BatchOp};
use crate::session::{Element, ElementFilter};
use crate::surface::TabInfo;
use crate::validate::Finding;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TabOpenParams {
    /// Display name of the tab; defaults to "untitled".
    pub name: Option<String>,
    /// mxGraph XML (`<mxfile>` or bare `<root>`). Omit to start from an empty diagram.
    pub document: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TabOpenResponse {
    pub tab: TabInfo,
    pub findings: Vec<Finding>,
    pub repair: Option<String>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TabListResponse {
    pub tabs: Vec<TabInfo>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TabParams {
    pub tab_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TabCloseResponse {
    pub tab: TabInfo,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DiagramValidateParams {
    pub document: String,
    /// Expect a bare `<root>` instead of a full `<mxfile>`; inferred when omitted.
    pub root_only: Option<bool>,
    /// Attempt the wrapper repair when the document is invalid.
    pub repair: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiagramValidateResponse {
    pub valid: bool,
    pub findings: Vec<Finding>,
    pub report: String,
    /// Repaired document text, when a repair was attempted and succeeded.
    pub repaired: Option<String>,
    pub repair_description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DiagramApplyChangesParams {
    pub tab_id: String,
    /// Operations tagged by `op`: add_node, modify_node, delete_node, add_edge, modify_edge,
    /// delete_edge.
    pub operations: Vec<BatchOp>,
    /// Skip modify/delete ops on cells the user changed since the last sync. Defaults to true.
    pub preserve_user_changes: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DiagramPollParams {
    pub tab_id: String,
    pub request_id: String,
    /// Wait on the bounded poll schedule instead of checking once. Defaults to true.
    pub wait: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ApplyStatusResponse {
    pub request_id: String,
    pub pending: bool,
    /// The poll budget ran out. The request may still complete; poll again later.
    pub timed_out: bool,
    pub result: Option<ApplyResult>,
    pub summary: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DiagramGetChangesParams {
    pub tab_id: String,
    pub include_details: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DiagramGetElementsParams {
    pub tab_id: String,
    pub filter: Option<ElementFilter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiagramGetElementsResponse {
    pub tab_id: String,
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DiagramExportParams {
    pub tab_id: String,
    /// Export a bare `<root>` instead of a full `<mxfile>`.
    pub root_only: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiagramExportResponse {
    pub tab_id: String,
    pub document: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SurfacePushDocumentParams {
    pub tab_id: String,
    pub document: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SurfacePushDocumentResponse {
    pub tab: TabInfo,
    pub findings: Vec<Finding>,
}

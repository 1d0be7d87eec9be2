// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;
use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::{Json, Parameters};
use rmcp::model::{ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData, ServerHandler, ServiceExt};
use tokio::sync::Mutex;

use crate::config::CoordinatorConfig;
use crate::coordinator::{ApplyCoordinator, CoordinatorError, PollOutcome};
use crate::diff::{BaselineInfo, ChangeSet};
use crate::model::{RequestId, TabId};
use crate::surface::{LocalSurface, SurfaceError};
use crate::validate::{format_findings, infer_root_only, repair, validate};

use super::types::*;

const DEFAULT_TAB_NAME: &str = "untitled";

type TabCoordinator = Arc<Mutex<ApplyCoordinator<LocalSurface>>>;

#[derive(Clone)]
pub struct DrawbridgeMcp {
    surface: Arc<LocalSurface>,
    config: CoordinatorConfig,
    coordinators: Arc<Mutex<BTreeMap<TabId, TabCoordinator>>>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl DrawbridgeMcp {
    pub fn new(surface: LocalSurface, config: CoordinatorConfig) -> Self {
        Self {
            surface: Arc::new(surface),
            config,
            coordinators: Arc::new(Mutex::new(BTreeMap::new())),
            tool_router: Self::tool_router(),
        }
    }

    pub fn surface(&self) -> &LocalSurface {
        &self.surface
    }

    pub async fn serve_stdio(self) -> Result<(), rmcp::RmcpError> {
        let service = self.serve((tokio::io::stdin(), tokio::io::stdout())).await?;
        service.waiting().await?;
        Ok(())
    }

    /// Coordinator for an open tab, created on first use.
    async fn coordinator(&self, tab_id: &TabId) -> Result<TabCoordinator, ErrorData> {
        self.surface.tab_info(tab_id).await.map_err(map_surface_error)?;
        let mut coordinators = self.coordinators.lock().await;
        let coordinator = coordinators.entry(tab_id.clone()).or_insert_with(|| {
            Arc::new(Mutex::new(ApplyCoordinator::new(
                self.surface.clone(),
                tab_id.clone(),
                self.config,
            )))
        });
        Ok(coordinator.clone())
    }

    /// Open a diagram tab from mxGraph XML (or empty); start here, then use
    /// `diagram.get_elements` and `diagram.apply_changes` with the returned `tab_id`.
    #[tool(name = "tab.open")]
    async fn tab_open(
        &self,
        params: Parameters<TabOpenParams>,
    ) -> Result<Json<TabOpenResponse>, ErrorData> {
        let TabOpenParams { name, document } = params.0;
        let name = name.unwrap_or_else(|| DEFAULT_TAB_NAME.to_owned());

        let (tab, findings, repair) = match document {
            Some(document) => {
                let opened =
                    self.surface.open_tab(&name, &document).await.map_err(map_surface_error)?;
                (opened.tab, opened.findings, opened.repair)
            }
            None => (self.surface.open_empty_tab(&name).await, Vec::new(), None),
        };
        let summary = format!(
            "opened {} '{}' with {} nodes and {} edges",
            tab.tab_id, tab.name, tab.node_count, tab.edge_count
        );

        Ok(Json(TabOpenResponse { tab, findings, repair, summary }))
    }

    /// List open tabs with their revision, baseline and pending request count.
    #[tool(name = "tab.list")]
    async fn tab_list(&self) -> Result<Json<TabListResponse>, ErrorData> {
        Ok(Json(TabListResponse { tabs: self.surface.list_tabs().await }))
    }

    /// Close a tab; its document, baseline and outstanding requests are discarded.
    #[tool(name = "tab.close")]
    async fn tab_close(
        &self,
        params: Parameters<TabParams>,
    ) -> Result<Json<TabCloseResponse>, ErrorData> {
        let tab_id = parse_tab_id(&params.0.tab_id)?;
        let tab = self.surface.close_tab(&tab_id).await.map_err(map_surface_error)?;
        self.coordinators.lock().await.remove(&tab_id);
        Ok(Json(TabCloseResponse { tab }))
    }

    /// Validate mxGraph XML and report findings by severity; optionally attempt the single
    /// wrapper repair for bare cell lists.
    #[tool(name = "diagram.validate")]
    async fn diagram_validate(
        &self,
        params: Parameters<DiagramValidateParams>,
    ) -> Result<Json<DiagramValidateResponse>, ErrorData> {
        let DiagramValidateParams { document, root_only, repair: try_repair } = params.0;
        let root_only = root_only.unwrap_or_else(|| infer_root_only(&document));
        let validation = validate(&document, root_only);

        if validation.valid || !try_repair.unwrap_or(false) {
            return Ok(Json(DiagramValidateResponse {
                valid: validation.valid,
                report: format_findings(&validation.findings),
                findings: validation.findings,
                repaired: None,
                repair_description: None,
            }));
        }

        let repaired = repair(&document);
        let response = if repaired.was_repaired {
            DiagramValidateResponse {
                valid: true,
                report: format_findings(&repaired.findings),
                findings: repaired.findings,
                repaired: Some(repaired.text),
                repair_description: Some(repaired.description),
            }
        } else {
            DiagramValidateResponse {
                valid: false,
                report: format_findings(&validation.findings),
                findings: validation.findings,
                repaired: None,
                repair_description: Some(repaired.description),
            }
        };
        Ok(Json(response))
    }

    /// Submit a batch of operations and wait (bounded) for the result. Conflicting ops are
    /// reported per op and never block the rest; on timeout poll `diagram.poll` with the
    /// returned `request_id`.
    #[tool(name = "diagram.apply_changes")]
    async fn diagram_apply_changes(
        &self,
        params: Parameters<DiagramApplyChangesParams>,
    ) -> Result<Json<ApplyStatusResponse>, ErrorData> {
        let DiagramApplyChangesParams { tab_id, operations, preserve_user_changes } = params.0;
        let tab_id = parse_tab_id(&tab_id)?;
        let coordinator = self.coordinator(&tab_id).await?;
        let mut coordinator = coordinator.lock().await;

        let (request_id, outcome) = coordinator
            .submit_and_wait(operations, preserve_user_changes.unwrap_or(true))
            .await
            .map_err(map_coordinator_error)?;
        Ok(Json(status_response(&request_id, outcome)))
    }

    /// Check on an earlier `diagram.apply_changes` request.
    #[tool(name = "diagram.poll")]
    async fn diagram_poll(
        &self,
        params: Parameters<DiagramPollParams>,
    ) -> Result<Json<ApplyStatusResponse>, ErrorData> {
        let DiagramPollParams { tab_id, request_id, wait } = params.0;
        let tab_id = parse_tab_id(&tab_id)?;
        let request_id = parse_request_id(&request_id)?;
        let coordinator = self.coordinator(&tab_id).await?;
        let mut coordinator = coordinator.lock().await;

        let outcome = if wait.unwrap_or(true) {
            coordinator.poll(&request_id).await
        } else {
            coordinator.poll_once(&request_id).await
        };
        let outcome = outcome.map_err(map_coordinator_error)?;
        Ok(Json(status_response(&request_id, outcome)))
    }

    /// Report cells the user added, modified or deleted since the last `diagram.sync`.
    #[tool(name = "diagram.get_changes")]
    async fn diagram_get_changes(
        &self,
        params: Parameters<DiagramGetChangesParams>,
    ) -> Result<Json<ChangeSet>, ErrorData> {
        let DiagramGetChangesParams { tab_id, include_details } = params.0;
        let tab_id = parse_tab_id(&tab_id)?;
        let coordinator = self.coordinator(&tab_id).await?;
        let coordinator = coordinator.lock().await;

        let changes = coordinator
            .get_changes(include_details.unwrap_or(false))
            .await
            .map_err(map_coordinator_error)?;
        Ok(Json(changes))
    }

    /// Take a fresh baseline after reviewing changes; later change reports and stale-intent
    /// checks are relative to it.
    #[tool(name = "diagram.sync")]
    async fn diagram_sync(
        &self,
        params: Parameters<TabParams>,
    ) -> Result<Json<BaselineInfo>, ErrorData> {
        let tab_id = parse_tab_id(&params.0.tab_id)?;
        let coordinator = self.coordinator(&tab_id).await?;
        let coordinator = coordinator.lock().await;

        let info = coordinator.sync().await.map_err(map_coordinator_error)?;
        Ok(Json(info))
    }

    /// List nodes and/or edges with ids, values, styles, geometry and endpoints.
    #[tool(name = "diagram.get_elements")]
    async fn diagram_get_elements(
        &self,
        params: Parameters<DiagramGetElementsParams>,
    ) -> Result<Json<DiagramGetElementsResponse>, ErrorData> {
        let DiagramGetElementsParams { tab_id, filter } = params.0;
        let tab = parse_tab_id(&tab_id)?;
        let elements = self
            .surface
            .elements(&tab, filter.unwrap_or_default())
            .await
            .map_err(map_surface_error)?;
        Ok(Json(DiagramGetElementsResponse { tab_id, elements }))
    }

    /// Export the tab's current document as mxGraph XML.
    #[tool(name = "diagram.export")]
    async fn diagram_export(
        &self,
        params: Parameters<DiagramExportParams>,
    ) -> Result<Json<DiagramExportResponse>, ErrorData> {
        let DiagramExportParams { tab_id, root_only } = params.0;
        let tab = parse_tab_id(&tab_id)?;
        let document = self
            .surface
            .export(&tab, root_only.unwrap_or(false))
            .await
            .map_err(map_surface_error)?;
        Ok(Json(DiagramExportResponse { tab_id, document }))
    }

    /// Report the editor's current document for a tab (the human's side of the session).
    /// Invalid documents are refused and leave the tab unchanged.
    #[tool(name = "surface.push_document")]
    async fn surface_push_document(
        &self,
        params: Parameters<SurfacePushDocumentParams>,
    ) -> Result<Json<SurfacePushDocumentResponse>, ErrorData> {
        let SurfacePushDocumentParams { tab_id, document } = params.0;
        let tab_id = parse_tab_id(&tab_id)?;
        let findings =
            self.surface.human_replace(&tab_id, &document).await.map_err(map_surface_error)?;
        let tab = self.surface.tab_info(&tab_id).await.map_err(map_surface_error)?;
        Ok(Json(SurfacePushDocumentResponse { tab, findings }))
    }
}

#[tool_handler]
impl ServerHandler for DrawbridgeMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Drawbridge co-editing server for draw.io diagrams (tools: tab.open, tab.list, tab.close, diagram.validate, diagram.apply_changes, diagram.poll, diagram.get_changes, diagram.sync, diagram.get_elements, diagram.export, surface.push_document). Call diagram.get_changes before editing to see what the user changed, and diagram.sync once you have taken those changes into account."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// Id parsing and error mapping for MCP tool handlers.
include!("server/helpers.rs");

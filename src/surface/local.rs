// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! In-process surface holding any number of tabs.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{ApplyRequest, Surface, SurfaceError, SurfacePoll, TransportError};
use crate::diff::{BaselineInfo, ChangeSet};
use crate::format::{export_mxfile, export_root, parse_document};
use crate::model::{BaselineId, Document, RequestId, TabId};
use crate::ops::{ApplyResult, BatchOp};
use crate::session::{EditSession, Element, ElementFilter};
use crate::validate::{infer_root_only, validate_and_repair, Finding};

/// Completed results kept per tab. Polling does not consume a result, so a poll whose
/// response is lost can be repeated; the oldest results are dropped first.
pub const DEFAULT_RESULT_RETENTION: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SurfaceMode {
    /// Batches run as soon as they are submitted.
    #[default]
    Immediate,
    /// Batches wait for [`LocalSurface::process_pending`].
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TabInfo {
    pub tab_id: TabId,
    pub name: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub rev: u64,
    pub baseline_id: BaselineId,
    pub pending_requests: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OpenedTab {
    pub tab: TabInfo,
    pub findings: Vec<Finding>,
    /// Description of the structural repair applied on open, if one was needed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repair: Option<String>,
}

#[derive(Debug)]
struct Tab {
    name: String,
    session: EditSession,
    pending: VecDeque<ApplyRequest>,
    completed: VecDeque<(RequestId, ApplyResult)>,
}

impl Tab {
    fn new(name: String, session: EditSession) -> Self {
        Self { name, session, pending: VecDeque::new(), completed: VecDeque::new() }
    }

    fn info(&self, tab_id: &TabId) -> TabInfo {
        let document = self.session.document();
        TabInfo {
            tab_id: tab_id.clone(),
            name: self.name.clone(),
            node_count: document.node_count(),
            edge_count: document.edge_count(),
            rev: document.rev(),
            baseline_id: self.session.baseline().baseline_id().clone(),
            pending_requests: self.pending.len(),
        }
    }

    fn is_outstanding(&self, request_id: &RequestId) -> bool {
        self.pending.iter().any(|request| &request.request_id == request_id)
            || self.completed.iter().any(|(id, _)| id == request_id)
    }

    fn execute(&mut self, request: ApplyRequest, retention: usize) {
        let result = self.session.apply_batch(&request.operations, request.preserve_user_changes);
        log::info!(
            "tab '{}' request {}: {} (rev {})",
            self.name,
            request.request_id,
            result.summary,
            result.new_rev
        );
        self.completed.push_back((request.request_id, result));
        while self.completed.len() > retention {
            if let Some((evicted, _)) = self.completed.pop_front() {
                log::warn!("tab '{}' dropped result for request {evicted}", self.name);
            }
        }
    }
}

#[derive(Debug, Default)]
struct State {
    tabs: BTreeMap<TabId, Tab>,
    next_tab: u64,
}

/// Surface that keeps canonical documents in memory.
///
/// Cloning is cheap and clones share the same tabs.
#[derive(Debug, Clone)]
pub struct LocalSurface {
    state: Arc<Mutex<State>>,
    mode: SurfaceMode,
    retention: usize,
}

impl Default for LocalSurface {
    fn default() -> Self {
        Self::new(SurfaceMode::Immediate)
    }
}

impl LocalSurface {
    pub fn new(mode: SurfaceMode) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            mode,
            retention: DEFAULT_RESULT_RETENTION,
        }
    }

    pub fn with_result_retention(mut self, retention: usize) -> Self {
        self.retention = retention.max(1);
        self
    }

    pub fn mode(&self) -> SurfaceMode {
        self.mode
    }

    /// Opens a tab from document text. The text is validated and repaired at most once;
    /// documents that still have errors are refused.
    pub async fn open_tab(&self, name: &str, text: &str) -> Result<OpenedTab, SurfaceError> {
        let accepted = validate_and_repair(text, infer_root_only(text))
            .map_err(|validation| SurfaceError::InvalidDocument { findings: validation.findings })?;
        if let Some(repair) = &accepted.repair {
            log::info!("repaired document for tab '{name}': {repair}");
        }
        let document = parse_document(&accepted.text)?;
        let tab = self.insert_tab(name, EditSession::new(document)).await;
        Ok(OpenedTab { tab, findings: accepted.findings, repair: accepted.repair })
    }

    pub async fn open_empty_tab(&self, name: &str) -> TabInfo {
        self.insert_tab(name, EditSession::default()).await
    }

    async fn insert_tab(&self, name: &str, session: EditSession) -> TabInfo {
        let mut state = self.state.lock().await;
        state.next_tab = state.next_tab.saturating_add(1);
        let tab_id = TabId::new(format!("tab-{}", state.next_tab)).expect("tab ids are non-empty");
        let tab = Tab::new(name.to_owned(), session);
        let info = tab.info(&tab_id);
        state.tabs.insert(tab_id.clone(), tab);
        log::info!(
            "opened tab {tab_id} '{name}' ({} nodes, {} edges)",
            info.node_count,
            info.edge_count
        );
        info
    }

    pub async fn close_tab(&self, tab_id: &TabId) -> Result<TabInfo, SurfaceError> {
        let mut state = self.state.lock().await;
        let tab = state
            .tabs
            .remove(tab_id)
            .ok_or_else(|| SurfaceError::UnknownTab(tab_id.clone()))?;
        log::info!("closed tab {tab_id} '{}'", tab.name);
        Ok(tab.info(tab_id))
    }

    pub async fn list_tabs(&self) -> Vec<TabInfo> {
        let state = self.state.lock().await;
        state.tabs.iter().map(|(tab_id, tab)| tab.info(tab_id)).collect()
    }

    pub async fn tab_info(&self, tab_id: &TabId) -> Result<TabInfo, SurfaceError> {
        self.with_tab(tab_id, |tab| tab.info(tab_id)).await
    }

    /// Runs every queued batch of a deferred tab, in submission order.
    pub async fn process_pending(&self, tab_id: &TabId) -> Result<usize, SurfaceError> {
        let retention = self.retention;
        self.with_tab(tab_id, |tab| {
            let mut processed = 0;
            while let Some(request) = tab.pending.pop_front() {
                tab.execute(request, retention);
                processed += 1;
            }
            processed
        })
        .await
    }

    /// Edits made by the human in the editor.
    pub async fn human_apply(
        &self,
        tab_id: &TabId,
        ops: &[BatchOp],
    ) -> Result<ApplyResult, SurfaceError> {
        self.with_tab(tab_id, |tab| tab.session.apply_human(ops)).await
    }

    /// The editor reports a whole new document. Invalid documents are refused and leave the tab
    /// unchanged.
    pub async fn human_replace(
        &self,
        tab_id: &TabId,
        text: &str,
    ) -> Result<Vec<Finding>, SurfaceError> {
        let accepted = validate_and_repair(text, infer_root_only(text))
            .map_err(|validation| SurfaceError::InvalidDocument { findings: validation.findings })?;
        let document = parse_document(&accepted.text)?;
        self.with_tab(tab_id, move |tab| {
            tab.session.replace_document(document);
            log::info!(
                "tab '{}' replaced by the editor (rev {})",
                tab.name,
                tab.session.document().rev()
            );
        })
        .await?;
        Ok(accepted.findings)
    }

    pub async fn export(&self, tab_id: &TabId, root_only: bool) -> Result<String, SurfaceError> {
        self.with_tab(tab_id, |tab| {
            let document = tab.session.document();
            if root_only {
                export_root(document)
            } else {
                export_mxfile(document, &tab.name)
            }
        })
        .await
    }

    pub async fn elements(
        &self,
        tab_id: &TabId,
        filter: ElementFilter,
    ) -> Result<Vec<Element>, SurfaceError> {
        self.with_tab(tab_id, |tab| tab.session.elements(filter)).await
    }

    async fn with_tab<R>(
        &self,
        tab_id: &TabId,
        f: impl FnOnce(&mut Tab) -> R,
    ) -> Result<R, SurfaceError> {
        let mut state = self.state.lock().await;
        let tab =
            state.tabs.get_mut(tab_id).ok_or_else(|| SurfaceError::UnknownTab(tab_id.clone()))?;
        Ok(f(tab))
    }

    async fn with_tab_transport<R>(
        &self,
        tab_id: &TabId,
        f: impl FnOnce(&mut Tab) -> Result<R, TransportError>,
    ) -> Result<R, TransportError> {
        let mut state = self.state.lock().await;
        let tab =
            state.tabs.get_mut(tab_id).ok_or_else(|| TransportError::UnknownTab(tab_id.clone()))?;
        f(tab)
    }
}

#[async_trait]
impl Surface for LocalSurface {
    async fn submit(&self, tab: &TabId, request: ApplyRequest) -> Result<(), TransportError> {
        let mode = self.mode;
        let retention = self.retention;
        self.with_tab_transport(tab, move |tab| {
            if tab.is_outstanding(&request.request_id) {
                return Err(TransportError::DuplicateRequest(request.request_id));
            }
            match mode {
                SurfaceMode::Immediate => tab.execute(request, retention),
                SurfaceMode::Deferred => tab.pending.push_back(request),
            }
            Ok(())
        })
        .await
    }

    async fn poll(
        &self,
        tab: &TabId,
        request_id: &RequestId,
    ) -> Result<SurfacePoll, TransportError> {
        self.with_tab_transport(tab, |tab| {
            if let Some((_, result)) = tab.completed.iter().find(|(id, _)| id == request_id) {
                return Ok(SurfacePoll::Completed(result.clone()));
            }
            if tab.pending.iter().any(|request| &request.request_id == request_id) {
                return Ok(SurfacePoll::Pending);
            }
            Err(TransportError::UnknownRequest(request_id.clone()))
        })
        .await
    }

    async fn get_changes(
        &self,
        tab: &TabId,
        include_details: bool,
    ) -> Result<ChangeSet, TransportError> {
        self.with_tab_transport(tab, |tab| Ok(tab.session.changes(include_details))).await
    }

    async fn sync(&self, tab: &TabId) -> Result<BaselineInfo, TransportError> {
        self.with_tab_transport(tab, |tab| Ok(tab.session.sync())).await
    }

    async fn snapshot(&self, tab: &TabId) -> Result<Document, TransportError> {
        self.with_tab_transport(tab, |tab| Ok(tab.session.document().clone())).await
    }
}

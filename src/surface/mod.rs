// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The authoritative side of a co-editing session.
//!
//! A [`Surface`] owns the canonical documents, executes submitted batches against them and
//! reports results, changes and baselines back. The agent side never mutates a document
//! directly.

pub mod local;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::diff::{BaselineInfo, ChangeSet};
use crate::format::FormatError;
use crate::model::{Document, RequestId, TabId};
use crate::ops::{ApplyResult, BatchOp};
use crate::validate::{format_findings, Finding};

pub use local::{LocalSurface, OpenedTab, SurfaceMode, TabInfo, DEFAULT_RESULT_RETENTION};

/// A batch of operations bound to its correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ApplyRequest {
    pub request_id: RequestId,
    pub operations: Vec<BatchOp>,
    #[serde(default)]
    pub preserve_user_changes: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfacePoll {
    Pending,
    Completed(ApplyResult),
}

/// Failures talking to a surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("surface unreachable: {0}")]
    Unreachable(String),
    #[error("surface connection lost: {0}")]
    Lost(String),
    #[error("unknown tab '{0}'")]
    UnknownTab(TabId),
    #[error("request '{0}' is already outstanding")]
    DuplicateRequest(RequestId),
    #[error("request '{0}' is not known to the surface")]
    UnknownRequest(RequestId),
    #[error("surface rejected the request: {0}")]
    Rejected(String),
}

impl TransportError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Lost(_))
    }
}

/// Failures of the surface's own document management.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SurfaceError {
    #[error("document is invalid\n{}", format_findings(.findings))]
    InvalidDocument { findings: Vec<Finding> },
    #[error("unknown tab '{0}'")]
    UnknownTab(TabId),
    #[error(transparent)]
    Format(#[from] FormatError),
}

#[async_trait]
pub trait Surface: Send + Sync {
    /// Queues or executes `request` against the tab's document. Fails with
    /// [`TransportError::DuplicateRequest`] while a request with the same id is outstanding.
    async fn submit(&self, tab: &TabId, request: ApplyRequest) -> Result<(), TransportError>;

    /// Reports the result of a request once it has completed. Repeating the poll returns the
    /// same result for as long as the surface retains it.
    async fn poll(&self, tab: &TabId, request_id: &RequestId)
        -> Result<SurfacePoll, TransportError>;

    async fn get_changes(
        &self,
        tab: &TabId,
        include_details: bool,
    ) -> Result<ChangeSet, TransportError>;

    /// Replaces the tab's baseline with its current document.
    async fn sync(&self, tab: &TabId) -> Result<BaselineInfo, TransportError>;

    async fn snapshot(&self, tab: &TabId) -> Result<Document, TransportError>;
}

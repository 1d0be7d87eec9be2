// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Agent-side correlation of asynchronous apply requests for one tab.
//!
//! The coordinator never executes operations. It hands batches to a [`Surface`] under a fresh
//! request id and polls for the result on a bounded schedule. A timed-out poll is advisory: the
//! request keeps running and a later poll may still complete it.
//!
//! Bookkeeping is bounded. The newest [`COMPLETED_CACHE_LIMIT`] completed results and the
//! newest [`PENDING_LIMIT`] unfinished requests are remembered; polling a request that has been
//! forgotten fails with [`CoordinatorError::UnknownRequest`].

use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

use crate::config::CoordinatorConfig;
use crate::diff::{BaselineInfo, ChangeSet};
use crate::model::{Document, RequestId, TabId};
use crate::ops::{ApplyResult, BatchOp};
use crate::surface::{ApplyRequest, Surface, SurfacePoll, TransportError};

/// Completed results remembered for re-polling. Oldest are forgotten first.
pub const COMPLETED_CACHE_LIMIT: usize = 128;

/// Unfinished requests tracked at once. Submitting past it forgets the oldest, whose result can
/// then no longer be polled through this coordinator.
pub const PENDING_LIMIT: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Pending,
    Completed(ApplyResult),
    TimedOut { attempts: u32 },
}

impl PollOutcome {
    pub fn result(&self) -> Option<&ApplyResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::Pending | Self::TimedOut { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    Transport {
        operation: &'static str,
        attempts: u32,
        retryable: bool,
        #[source]
        source: TransportError,
    },
    #[error("request '{0}' is not known to this coordinator")]
    UnknownRequest(RequestId),
}

impl CoordinatorError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { retryable: true, .. })
    }
}

#[derive(Debug, Clone)]
enum RequestState {
    Pending,
    Completed(ApplyResult),
}

pub struct ApplyCoordinator<S: ?Sized> {
    surface: Arc<S>,
    tab: TabId,
    config: CoordinatorConfig,
    next_seq: u64,
    requests: BTreeMap<RequestId, RequestState>,
    completed_order: VecDeque<RequestId>,
    pending_order: VecDeque<RequestId>,
}

impl<S: Surface + ?Sized> ApplyCoordinator<S> {
    pub fn new(surface: Arc<S>, tab: TabId, config: CoordinatorConfig) -> Self {
        Self {
            surface,
            tab,
            config,
            next_seq: 0,
            requests: BTreeMap::new(),
            completed_order: VecDeque::new(),
            pending_order: VecDeque::new(),
        }
    }

    pub fn tab(&self) -> &TabId {
        &self.tab
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Requests submitted but not yet seen completed.
    pub fn outstanding(&self) -> Vec<&RequestId> {
        self.requests
            .iter()
            .filter(|(_, state)| matches!(state, RequestState::Pending))
            .map(|(id, _)| id)
            .collect()
    }

    /// Forwards `operations` to the surface and returns the request id to poll.
    pub async fn submit(
        &mut self,
        operations: Vec<BatchOp>,
        preserve_user_changes: bool,
    ) -> Result<RequestId, CoordinatorError> {
        let request_id = self.next_request_id();
        let request = ApplyRequest {
            request_id: request_id.clone(),
            operations,
            preserve_user_changes,
        };

        let surface = &*self.surface;
        let tab = &self.tab;
        retrying(&self.config, "submit", |attempt| {
            let request = request.clone();
            async move {
                match surface.submit(tab, request).await {
                    // Our ids are never reused, so a duplicate after a failed attempt means that
                    // attempt reached the surface.
                    Err(TransportError::DuplicateRequest(_)) if attempt > 0 => Ok(()),
                    other => other,
                }
            }
        })
        .await?;

        log::debug!(
            "submitted request {request_id} ({} ops) to tab {}",
            request.operations.len(),
            self.tab
        );
        self.remember_pending(&request_id);
        Ok(request_id)
    }

    /// Checks once without waiting.
    pub async fn poll_once(
        &mut self,
        request_id: &RequestId,
    ) -> Result<PollOutcome, CoordinatorError> {
        match self.requests.get(request_id) {
            None => return Err(CoordinatorError::UnknownRequest(request_id.clone())),
            Some(RequestState::Completed(result)) => {
                return Ok(PollOutcome::Completed(result.clone()));
            }
            Some(RequestState::Pending) => {}
        }

        let surface = &*self.surface;
        let tab = &self.tab;
        let polled = retrying(&self.config, "poll", |_| surface.poll(tab, request_id)).await?;
        match polled {
            SurfacePoll::Pending => Ok(PollOutcome::Pending),
            SurfacePoll::Completed(result) => {
                log::info!("request {request_id} completed: {}", result.summary);
                self.remember_completed(request_id, result.clone());
                Ok(PollOutcome::Completed(result))
            }
        }
    }

    /// Polls until the request completes or the attempt budget runs out.
    pub async fn poll(&mut self, request_id: &RequestId) -> Result<PollOutcome, CoordinatorError> {
        let attempts = self.config.max_poll_attempts.max(1);
        for attempt in 1..=attempts {
            if let PollOutcome::Completed(result) = self.poll_once(request_id).await? {
                return Ok(PollOutcome::Completed(result));
            }
            if attempt < attempts {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }
        log::warn!("request {request_id} still pending after {attempts} polls");
        Ok(PollOutcome::TimedOut { attempts })
    }

    pub async fn submit_and_wait(
        &mut self,
        operations: Vec<BatchOp>,
        preserve_user_changes: bool,
    ) -> Result<(RequestId, PollOutcome), CoordinatorError> {
        let request_id = self.submit(operations, preserve_user_changes).await?;
        let outcome = self.poll(&request_id).await?;
        Ok((request_id, outcome))
    }

    pub async fn get_changes(&self, include_details: bool) -> Result<ChangeSet, CoordinatorError> {
        let surface = &*self.surface;
        let tab = &self.tab;
        retrying(&self.config, "get_changes", |_| surface.get_changes(tab, include_details)).await
    }

    pub async fn sync(&self) -> Result<BaselineInfo, CoordinatorError> {
        let surface = &*self.surface;
        let tab = &self.tab;
        retrying(&self.config, "sync", |_| surface.sync(tab)).await
    }

    pub async fn snapshot(&self) -> Result<Document, CoordinatorError> {
        let surface = &*self.surface;
        let tab = &self.tab;
        retrying(&self.config, "snapshot", |_| surface.snapshot(tab)).await
    }

    fn next_request_id(&mut self) -> RequestId {
        self.next_seq = self.next_seq.saturating_add(1);
        RequestId::new(format!("{}:{}", self.tab, self.next_seq)).expect("tab ids are non-empty")
    }

    fn remember_pending(&mut self, request_id: &RequestId) {
        self.requests.insert(request_id.clone(), RequestState::Pending);
        self.pending_order.push_back(request_id.clone());
        while self.pending_order.len() > PENDING_LIMIT {
            if let Some(abandoned) = self.pending_order.pop_front() {
                self.requests.remove(&abandoned);
                log::warn!("forgetting unfinished request {abandoned} on tab {}", self.tab);
            }
        }
    }

    fn remember_completed(&mut self, request_id: &RequestId, result: ApplyResult) {
        self.pending_order.retain(|pending| pending != request_id);
        self.requests.insert(request_id.clone(), RequestState::Completed(result));
        self.completed_order.push_back(request_id.clone());
        while self.completed_order.len() > COMPLETED_CACHE_LIMIT {
            if let Some(forgotten) = self.completed_order.pop_front() {
                self.requests.remove(&forgotten);
            }
        }
    }
}

/// Runs `call` until it succeeds, fails with a non-retryable error, or the retry budget is
/// spent. `call` receives the zero-based attempt number.
async fn retrying<T, F, Fut>(
    config: &CoordinatorConfig,
    operation: &'static str,
    mut call: F,
) -> Result<T, CoordinatorError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut attempt = 0;
    loop {
        match call(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < config.transport_retries => {
                attempt += 1;
                log::warn!(
                    "{operation} attempt {attempt} failed: {err}; retrying in {:?}",
                    config.transport_backoff
                );
                tokio::time::sleep(config.transport_backoff).await;
            }
            Err(err) => {
                return Err(CoordinatorError::Transport {
                    operation,
                    attempts: attempt + 1,
                    retryable: err.is_retryable(),
                    source: err,
                });
            }
        }
    }
}

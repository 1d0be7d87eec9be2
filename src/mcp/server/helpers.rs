// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

fn parse_tab_id(value: &str) -> Result<TabId, ErrorData> {
    TabId::new(value).map_err(|err| {
        ErrorData::invalid_params(
            format!("invalid tab_id: {err}"),
            Some(serde_json::json!({ "tab_id": value })),
        )
    })
}

fn parse_request_id(value: &str) -> Result<RequestId, ErrorData> {
    RequestId::new(value).map_err(|err| {
        ErrorData::invalid_params(
            format!("invalid request_id: {err}"),
            Some(serde_json::json!({ "request_id": value })),
        )
    })
}

fn status_response(request_id: &RequestId, outcome: PollOutcome) -> ApplyStatusResponse {
    let request_id_text = request_id.to_string();
    match outcome {
        PollOutcome::Completed(result) => ApplyStatusResponse {
            request_id: request_id_text,
            pending: false,
            timed_out: false,
            summary: result.summary.clone(),
            result: Some(result),
        },
        PollOutcome::Pending => ApplyStatusResponse {
            summary: format!("request {request_id} is still pending"),
            request_id: request_id_text,
            pending: true,
            timed_out: false,
            result: None,
        },
        PollOutcome::TimedOut { attempts } => ApplyStatusResponse {
            summary: format!(
                "request {request_id} still pending after {attempts} polls; poll again later"
            ),
            request_id: request_id_text,
            pending: true,
            timed_out: true,
            result: None,
        },
    }
}

fn map_surface_error(err: SurfaceError) -> ErrorData {
    match err {
        SurfaceError::UnknownTab(tab_id) => ErrorData::resource_not_found(
            "tab not found",
            Some(serde_json::json!({ "tab_id": tab_id.to_string() })),
        ),
        SurfaceError::InvalidDocument { findings } => ErrorData::invalid_params(
            format!("document is invalid\n{}", format_findings(&findings)),
            Some(serde_json::json!({ "findings": findings })),
        ),
        SurfaceError::Format(err) => {
            ErrorData::invalid_params(format!("cannot read document: {err}"), None)
        }
    }
}

fn map_coordinator_error(err: CoordinatorError) -> ErrorData {
    match err {
        CoordinatorError::UnknownRequest(request_id) => ErrorData::resource_not_found(
            "request not found",
            Some(serde_json::json!({ "request_id": request_id.to_string() })),
        ),
        CoordinatorError::Transport { operation, attempts, retryable, source } => {
            ErrorData::internal_error(
                format!("{operation} failed: {source}"),
                Some(serde_json::json!({
                    "operation": operation,
                    "attempts": attempts,
                    "retryable": retryable,
                })),
            )
        }
    }
}

// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Logging bootstrap for the binary.
//!
//! Logs go to stderr only: stdout carries the MCP stdio transport. Library code logs through the
//! `log` facade and never initializes a logger itself.

use flexi_logger::{Logger, LoggerHandle};

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Starts the logger. An explicit `level` wins over `RUST_LOG`, which wins over
/// [`DEFAULT_LOG_LEVEL`]. Keep the returned handle alive for the life of the process.
pub fn init_logging(level: Option<&str>) -> Result<LoggerHandle, String> {
    let logger = match level {
        Some(level) => {
            let level = normalize_level(level)?;
            Logger::try_with_str(level)
                .map_err(|err| format!("invalid log level `{level}`: {err}"))?
        }
        None => Logger::try_with_env_or_str(DEFAULT_LOG_LEVEL)
            .map_err(|err| format!("invalid RUST_LOG specification: {err}"))?,
    };

    let handle = logger
        .log_to_stderr()
        .format(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;
    log::debug!(
        "logging initialized ({} {})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
    Ok(handle)
}

pub fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => Ok("off"),
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected off|trace|debug|info|warn|error"
        )),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::normalize_level;

    #[rstest]
    #[case("INFO", "info")]
    #[case(" warning ", "warn")]
    #[case("trace", "trace")]
    #[case("off", "off")]
    fn normalize_level_accepts_known_levels(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_level(raw), Ok(expected));
    }

    #[test]
    fn normalize_level_rejects_unknown_levels() {
        let err = normalize_level("loud").expect_err("unknown level");
        assert!(err.contains("`loud`"));
    }
}

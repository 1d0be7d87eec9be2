// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Drawbridge CLI entrypoint.
//!
//! By default this serves MCP over stdio (intended for tool integrations). With
//! `--http-port` it serves MCP over streamable HTTP at `http://127.0.0.1:<port>/mcp` instead.
//!
//! `--validate <file>` checks a document, prints the report and exits.

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use drawbridge::config::CoordinatorConfig;
use drawbridge::mcp::DrawbridgeMcp;
use drawbridge::surface::local::LocalSurface;
use drawbridge::validate::{format_findings, infer_root_only, validate};
use rmcp::transport::{
    streamable_http_server::session::local::LocalSessionManager, StreamableHttpServerConfig,
    StreamableHttpService,
};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--open <file>]... [--log <level>]\n  {program} [--open <file>]... --http-port <port> [--log <level>]\n  {program} --validate <file> [--root-only] [--log <level>]\n\nWithout --http-port MCP is served over stdio.\n--http-port serves MCP over streamable HTTP at `http://127.0.0.1:<port>/mcp` (0 = ephemeral).\n--open preloads a draw.io document into a tab; repeat for several tabs.\n\n--validate prints the findings for a document and exits non-zero when it is invalid.\n--root-only checks a bare <root> (or <mxGraphModel>) instead of a full <mxfile>; inferred when omitted.\n\n--log sets the level (off|trace|debug|info|warn|error); otherwise RUST_LOG, then info."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    http_port: Option<u16>,
    open: Vec<String>,
    validate: Option<String>,
    root_only: bool,
    log: Option<String>,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--http-port" => {
                if options.http_port.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                let port: u16 = raw.parse().map_err(|_| ())?;
                options.http_port = Some(port);
            }
            "--open" => {
                let path = args.next().ok_or(())?;
                options.open.push(path);
            }
            "--validate" => {
                if options.validate.is_some() {
                    return Err(());
                }
                let path = args.next().ok_or(())?;
                options.validate = Some(path);
            }
            "--root-only" => {
                if options.root_only {
                    return Err(());
                }
                options.root_only = true;
            }
            "--log" => {
                if options.log.is_some() {
                    return Err(());
                }
                let level = args.next().ok_or(())?;
                options.log = Some(level);
            }
            _ => return Err(()),
        }
    }

    if options.validate.is_some() && (options.http_port.is_some() || !options.open.is_empty()) {
        return Err(());
    }

    if options.root_only && options.validate.is_none() {
        return Err(());
    }

    Ok(options)
}

fn tab_name(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or(path)
        .to_owned()
}

fn run_validate(path: &str, root_only: bool) -> Result<bool, Box<dyn Error>> {
    let text = std::fs::read_to_string(path)?;
    let root_only = root_only || infer_root_only(&text);
    let validation = validate(&text, root_only);
    println!("{}", format_findings(&validation.findings));
    Ok(validation.valid)
}

async fn preload(surface: &LocalSurface, paths: &[String]) -> Result<(), Box<dyn Error>> {
    for path in paths {
        let text = std::fs::read_to_string(path)?;
        let opened = surface
            .open_tab(&tab_name(path), &text)
            .await
            .map_err(|err| format!("{path}: {err}"))?;
        if let Some(repair) = &opened.repair {
            log::warn!("{path}: {repair}");
        }
        log::info!(
            "opened {path} as {} ({} nodes, {} edges)",
            opened.tab.tab_id,
            opened.tab.node_count,
            opened.tab.edge_count
        );
    }
    Ok(())
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "drawbridge".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        let _logger = drawbridge::logging::init_logging(options.log.as_deref())?;

        if let Some(path) = &options.validate {
            if !run_validate(path, options.root_only)? {
                std::process::exit(1);
            }
            return Ok(());
        }

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

        runtime.block_on(async move {
            let surface = LocalSurface::default();
            preload(&surface, &options.open).await?;
            let mcp = DrawbridgeMcp::new(surface, CoordinatorConfig::from_env());

            let Some(http_port) = options.http_port else {
                log::info!("serving MCP over stdio");
                mcp.serve_stdio().await?;
                return Ok::<(), Box<dyn Error>>(());
            };

            let listener = tokio::net::TcpListener::bind(("127.0.0.1", http_port)).await?;
            log::info!("serving MCP at http://{}/mcp", listener.local_addr()?);

            let config = StreamableHttpServerConfig {
                stateful_mode: true,
                ..StreamableHttpServerConfig::default()
            };
            let session_manager = Arc::new(LocalSessionManager::default());
            let mcp_service = {
                let mcp = mcp.clone();
                StreamableHttpService::new(move || Ok(mcp.clone()), session_manager, config)
            };

            let router = Router::new().nest_service("/mcp", mcp_service);
            axum::serve(listener, router).await?;
            Ok::<(), Box<dyn Error>>(())
        })?;

        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("drawbridge: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_options, tab_name, CliOptions};

    fn args(values: &[&str]) -> impl Iterator<Item = String> {
        values.iter().map(|value| (*value).to_owned()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_empty_args() {
        let options = parse_options(std::iter::empty()).expect("parse options");
        assert_eq!(options, CliOptions::default());
    }

    #[test]
    fn parses_http_port() {
        let options = parse_options(args(&["--http-port", "1234"])).expect("parse options");
        assert_eq!(options.http_port, Some(1234));
        assert!(options.open.is_empty());
    }

    #[test]
    fn collects_repeated_open_flags_in_order() {
        let options = parse_options(args(&["--open", "a.drawio", "--open", "b.drawio"]))
            .expect("parse options");
        assert_eq!(options.open, vec!["a.drawio".to_owned(), "b.drawio".to_owned()]);
    }

    #[test]
    fn parses_validate_with_root_only() {
        let options = parse_options(args(&["--root-only", "--validate", "cells.xml"]))
            .expect("parse options");
        assert_eq!(options.validate.as_deref(), Some("cells.xml"));
        assert!(options.root_only);
    }

    #[test]
    fn parses_log_level() {
        let options = parse_options(args(&["--log", "debug"])).expect("parse options");
        assert_eq!(options.log.as_deref(), Some("debug"));
    }

    #[test]
    fn rejects_validate_combined_with_serving() {
        parse_options(args(&["--validate", "a.xml", "--http-port", "0"])).unwrap_err();
        parse_options(args(&["--validate", "a.xml", "--open", "b.xml"])).unwrap_err();
    }

    #[test]
    fn rejects_root_only_without_validate() {
        parse_options(args(&["--root-only"])).unwrap_err();
    }

    #[test]
    fn rejects_unknown_and_positional_args() {
        parse_options(args(&["--nope"])).unwrap_err();
        parse_options(args(&["diagram.drawio"])).unwrap_err();
    }

    #[test]
    fn rejects_duplicate_flags() {
        parse_options(args(&["--http-port", "1", "--http-port", "2"])).unwrap_err();
        parse_options(args(&["--log", "info", "--log", "debug"])).unwrap_err();
        parse_options(args(&["--validate", "a", "--validate", "b"])).unwrap_err();
    }

    #[test]
    fn rejects_missing_values() {
        parse_options(args(&["--open"])).unwrap_err();
        parse_options(args(&["--http-port"])).unwrap_err();
        parse_options(args(&["--http-port", "not-a-port"])).unwrap_err();
    }

    #[test]
    fn tab_names_come_from_file_stems() {
        assert_eq!(tab_name("diagrams/architecture.drawio"), "architecture");
        assert_eq!(tab_name("plain"), "plain");
    }
}

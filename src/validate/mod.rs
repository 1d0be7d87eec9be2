// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Structural validation and bounded auto-repair of mxGraph documents.
//!
//! Validation reports findings instead of failing fast, so every problem in a document is
//! surfaced at once. Only `Error` findings make a document invalid. Edge endpoints are not
//! checked here: a batch may add an edge together with its endpoints, so references are
//! resolved at apply time. A parent that names no cell is only a warning.
//!
//! Repair is deliberately narrow. The only fix it performs is wrapping a bare list of cells in
//! `<root>` with the reserved cells `"0"` and `"1"`; anything that would need invented parent
//! ids, geometry or styles is reported unchanged.

use std::collections::BTreeSet;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{is_reserved_cell_id, LAYER_CELL_ID, ROOT_CELL_ID};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Finding {
    pub level: Severity,
    pub message: String,
    pub location: String,
}

impl Finding {
    fn new(level: Severity, message: impl Into<String>, location: impl Into<String>) -> Self {
        Self { level, message: message.into(), location: location.into() }
    }

    pub fn is_error(&self) -> bool {
        self.level == Severity::Error
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Validation {
    pub valid: bool,
    pub findings: Vec<Finding>,
}

impl Validation {
    pub fn errors(&self) -> impl Iterator<Item = &Finding> + '_ {
        self.findings.iter().filter(|finding| finding.is_error())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Repair {
    /// The repaired text, or the original text when no repair applied.
    pub text: String,
    pub was_repaired: bool,
    pub description: String,
    /// Findings for `text` as returned.
    pub findings: Vec<Finding>,
}

/// Validates mxGraph XML. With `root_only` the text must be a bare `<root>` element or an
/// `<mxGraphModel>` wrapping one; otherwise a full `<mxfile><diagram><mxGraphModel>` document is
/// expected.
pub fn validate(text: &str, root_only: bool) -> Validation {
    let mut findings = Vec::new();

    let xml = match roxmltree::Document::parse(text) {
        Ok(xml) => xml,
        Err(err) => {
            findings.push(Finding::new(
                Severity::Error,
                format!("XML syntax error: {err}"),
                "xml_syntax",
            ));
            return Validation { valid: false, findings };
        }
    };

    let top = xml.root_element();
    let cell_root = if root_only {
        check_root_structure(top, &mut findings)
    } else {
        check_mxfile_structure(top, &mut findings)
    };
    if let Some(cell_root) = cell_root {
        check_reserved_cells(cell_root, &mut findings);
    }

    let cells = top
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == "mxCell")
        .collect::<Vec<_>>();
    check_cells(&cells, &mut findings);
    check_id_uniqueness(&cells, &mut findings);
    check_styles(&cells, &mut findings);

    let valid = !findings.iter().any(Finding::is_error);
    Validation { valid, findings }
}

fn check_root_structure<'a, 'input>(
    top: roxmltree::Node<'a, 'input>,
    findings: &mut Vec<Finding>,
) -> Option<roxmltree::Node<'a, 'input>> {
    match top.tag_name().name() {
        "root" => Some(top),
        "mxGraphModel" => model_root(top, findings),
        tag => {
            findings.push(Finding::new(
                Severity::Error,
                format!("top-level element must be 'root' or 'mxGraphModel', found '{tag}'"),
                "root_element",
            ));
            None
        }
    }
}

fn check_mxfile_structure<'a, 'input>(
    top: roxmltree::Node<'a, 'input>,
    findings: &mut Vec<Finding>,
) -> Option<roxmltree::Node<'a, 'input>> {
    let tag = top.tag_name().name();
    if tag != "mxfile" {
        findings.push(Finding::new(
            Severity::Error,
            format!("top-level element must be 'mxfile', found '{tag}'"),
            "mxfile_element",
        ));
        return None;
    }

    let Some(diagram) = child_element(top, "diagram") else {
        findings.push(Finding::new(Severity::Error, "missing <diagram> element", "diagram_element"));
        return None;
    };
    let Some(model) = child_element(diagram, "mxGraphModel") else {
        findings.push(Finding::new(
            Severity::Error,
            "missing <mxGraphModel> element",
            "mxGraphModel_element",
        ));
        return None;
    };
    model_root(model, findings)
}

fn model_root<'a, 'input>(
    model: roxmltree::Node<'a, 'input>,
    findings: &mut Vec<Finding>,
) -> Option<roxmltree::Node<'a, 'input>> {
    let root = child_element(model, "root");
    if root.is_none() {
        findings.push(Finding::new(
            Severity::Error,
            "missing <root> element inside <mxGraphModel>",
            "root_element",
        ));
    }
    root
}

fn child_element<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    parent.children().find(|child| child.is_element() && child.tag_name().name() == name)
}

fn check_reserved_cells(root: roxmltree::Node<'_, '_>, findings: &mut Vec<Finding>) {
    let ids = root
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "mxCell")
        .filter_map(|node| node.attribute("id"))
        .collect::<BTreeSet<_>>();

    if !ids.contains(ROOT_CELL_ID) {
        findings.push(Finding::new(
            Severity::Error,
            "missing mxCell id='0' (the model root)",
            "mxCell_0",
        ));
    }
    if !ids.contains(LAYER_CELL_ID) {
        findings.push(Finding::new(
            Severity::Error,
            "missing mxCell id='1' (the default layer every cell is parented to)",
            "mxCell_1",
        ));
    }
}

fn check_cells(cells: &[roxmltree::Node<'_, '_>], findings: &mut Vec<Finding>) {
    let known = cells.iter().filter_map(|cell| cell.attribute("id")).collect::<BTreeSet<_>>();
    for cell in cells {
        let cell_id = cell.attribute("id").unwrap_or("unknown");
        if is_reserved_cell_id(cell_id) {
            continue;
        }

        // Missing reserved cells are already errors of their own.
        if let Some(parent) = cell.attribute("parent") {
            if !known.contains(parent) && !is_reserved_cell_id(parent) {
                findings.push(Finding::new(
                    Severity::Warning,
                    format!("mxCell id='{cell_id}' parent '{parent}' does not resolve"),
                    format!("mxCell_{cell_id}"),
                ));
            }
        }
        if cell.attribute("vertex") != Some("1") {
            continue;
        }

        if cell.attribute("parent").is_none() {
            findings.push(Finding::new(
                Severity::Warning,
                format!("mxCell id='{cell_id}' has no parent attribute"),
                format!("mxCell_{cell_id}"),
            ));
        }
        let has_geometry = cell
            .children()
            .any(|child| child.is_element() && child.tag_name().name() == "mxGeometry");
        if !has_geometry {
            findings.push(Finding::new(
                Severity::Warning,
                format!("vertex mxCell id='{cell_id}' has no mxGeometry"),
                format!("mxCell_{cell_id}"),
            ));
        }
    }
}

fn check_id_uniqueness(cells: &[roxmltree::Node<'_, '_>], findings: &mut Vec<Finding>) {
    let mut seen = BTreeSet::new();
    for cell_id in cells.iter().filter_map(|cell| cell.attribute("id")) {
        if !seen.insert(cell_id) {
            findings.push(Finding::new(
                Severity::Error,
                format!("duplicate id '{cell_id}'"),
                format!("mxCell_{cell_id}"),
            ));
        }
    }
}

fn check_styles(cells: &[roxmltree::Node<'_, '_>], findings: &mut Vec<Finding>) {
    for cell in cells {
        let cell_id = cell.attribute("id").unwrap_or("unknown");
        if is_reserved_cell_id(cell_id) {
            continue;
        }
        let style = cell.attribute("style").unwrap_or("");

        if style.matches('"').count() % 2 != 0 {
            findings.push(Finding::new(
                Severity::Warning,
                format!("style of mxCell id='{cell_id}' has an unbalanced quote"),
                format!("mxCell_{cell_id}_style"),
            ));
        }
        if style.contains('=') && !style.contains(';') {
            findings.push(Finding::new(
                Severity::Info,
                format!("style of mxCell id='{cell_id}' has no ';' separator"),
                format!("mxCell_{cell_id}_style"),
            ));
        }
    }
}

/// Attempts the single structural repair: wrapping bare cells in `<root>` with the reserved
/// cells. Runs at most once and never loops.
pub fn repair(text: &str) -> Repair {
    let initial = validate(text, true);
    if initial.valid {
        return Repair {
            text: text.to_owned(),
            was_repaired: false,
            description: "document is already valid".to_owned(),
            findings: initial.findings,
        };
    }

    let trimmed = text.trim();
    if !trimmed.starts_with("<mxCell") {
        return Repair {
            text: text.to_owned(),
            was_repaired: false,
            description: "no unambiguous structural repair applies".to_owned(),
            findings: initial.findings,
        };
    }

    let wrapped = format!(
        "<root>\n  <mxCell id=\"{ROOT_CELL_ID}\"/>\n  <mxCell id=\"{LAYER_CELL_ID}\" parent=\"{ROOT_CELL_ID}\"/>\n{trimmed}\n</root>"
    );
    let rechecked = validate(&wrapped, true);
    if rechecked.valid {
        log::debug!("wrapped bare cell list in <root> with reserved cells");
        return Repair {
            text: wrapped,
            was_repaired: true,
            description: "wrapped bare cells in <root> with reserved cells '0' and '1'".to_owned(),
            findings: rechecked.findings,
        };
    }

    Repair {
        text: text.to_owned(),
        was_repaired: false,
        description: "wrapping the bare cells in <root> still leaves errors".to_owned(),
        findings: initial.findings,
    }
}

/// Whether `text` should be checked as a bare `<root>` rather than a full `<mxfile>`.
pub fn infer_root_only(text: &str) -> bool {
    !text.contains("<mxfile")
}

/// Text accepted for display, possibly after the one repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub text: String,
    pub findings: Vec<Finding>,
    pub repair: Option<String>,
}

/// Validates, then repairs at most once when the document is invalid. Returns the failing
/// validation when the document still has errors.
pub fn validate_and_repair(text: &str, root_only: bool) -> Result<Accepted, Validation> {
    let validation = validate(text, root_only);
    if validation.valid {
        return Ok(Accepted { text: text.to_owned(), findings: validation.findings, repair: None });
    }

    let repaired = repair(text);
    if repaired.was_repaired {
        return Ok(Accepted {
            text: repaired.text,
            findings: repaired.findings,
            repair: Some(repaired.description),
        });
    }
    Err(validation)
}

/// Grouped, human-readable report of findings.
pub fn format_findings(findings: &[Finding]) -> String {
    if findings.is_empty() {
        return "validation passed with no findings".to_owned();
    }

    let mut sections = Vec::new();
    for (level, title) in [
        (Severity::Error, "errors:"),
        (Severity::Warning, "warnings:"),
        (Severity::Info, "info:"),
    ] {
        let lines = findings
            .iter()
            .filter(|finding| finding.level == level)
            .map(|finding| format!("  - {} [{}]", finding.message, finding.location))
            .collect::<Vec<_>>();
        if !lines.is_empty() {
            sections.push(format!("{title}\n{}", lines.join("\n")));
        }
    }
    sections.join("\n")
}

// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! mxGraph XML reading and writing.
//!
//! Accepts a full `<mxfile>`, a bare `<mxGraphModel>`, or a bare `<root>`. Only uncompressed
//! diagrams are supported; a `<diagram>` holding deflated text has no `<root>` to read.

use std::fmt::Write as _;

use crate::model::{Cell, CellId, CellKind, Document, DocumentError, Geometry, IdError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("XML syntax error: {0}")]
    Xml(String),
    #[error("no <root> element found")]
    MissingRoot,
    #[error("mxCell #{position} has no id attribute")]
    MissingCellId { position: usize },
    #[error("mxCell #{position} has an invalid id: {source}")]
    InvalidCellId { position: usize, source: IdError },
    #[error("mxCell '{cell_id}' has an invalid {attribute} reference: {source}")]
    InvalidReference { cell_id: String, attribute: &'static str, source: IdError },
    #[error(transparent)]
    Document(#[from] DocumentError),
}

pub fn parse_document(text: &str) -> Result<Document, FormatError> {
    let xml = roxmltree::Document::parse(text).map_err(|err| FormatError::Xml(err.to_string()))?;
    let root = xml
        .descendants()
        .find(|node| node.is_element() && node.tag_name().name() == "root")
        .ok_or(FormatError::MissingRoot)?;

    let cells = root
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "mxCell")
        .enumerate()
        .map(|(position, node)| parse_cell(position, node))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Document::from_cells(cells)?)
}

fn parse_cell(position: usize, node: roxmltree::Node<'_, '_>) -> Result<Cell, FormatError> {
    let raw_id = node.attribute("id").ok_or(FormatError::MissingCellId { position })?;
    let id = CellId::new(raw_id).map_err(|source| FormatError::InvalidCellId { position, source })?;
    let parent_id = optional_reference(node, raw_id, "parent")?;
    let geometry_node = node.children().find(|child| {
        child.is_element()
            && child.tag_name().name() == "mxGeometry"
            && child.attribute("as").map_or(true, |role| role == "geometry")
    });

    let kind = if node.attribute("vertex") == Some("1") {
        CellKind::Node { geometry: geometry_node.map(parse_geometry) }
    } else if node.attribute("edge") == Some("1") {
        CellKind::Edge {
            source_id: optional_reference(node, raw_id, "source")?,
            target_id: optional_reference(node, raw_id, "target")?,
            relative: geometry_node.and_then(|geometry| geometry.attribute("relative")) == Some("1"),
        }
    } else {
        CellKind::Container
    };

    let mut cell = Cell::new(id, parent_id, kind);
    if let Some(value) = node.attribute("value") {
        cell.set_value(value);
    }
    if let Some(style) = node.attribute("style") {
        cell.set_style(style);
    }
    Ok(cell)
}

fn optional_reference(
    node: roxmltree::Node<'_, '_>,
    cell_id: &str,
    attribute: &'static str,
) -> Result<Option<CellId>, FormatError> {
    node.attribute(attribute)
        .map(|raw| {
            CellId::new(raw).map_err(|source| FormatError::InvalidReference {
                cell_id: cell_id.to_owned(),
                attribute,
                source,
            })
        })
        .transpose()
}

fn parse_geometry(node: roxmltree::Node<'_, '_>) -> Geometry {
    let number = |name: &str| {
        node.attribute(name).and_then(|raw| raw.trim().parse::<f64>().ok()).unwrap_or(0.0)
    };
    Geometry { x: number("x"), y: number("y"), width: number("width"), height: number("height") }
}

/// Serializes the cell list as a `<root>` element.
pub fn export_root(document: &Document) -> String {
    let mut out = String::new();
    write_root(&mut out, document, 0);
    out
}

/// Serializes a complete, uncompressed `.drawio` file with one page.
pub fn export_mxfile(document: &Document, page_name: &str) -> String {
    let mut out = String::new();
    out.push_str("<mxfile host=\"drawbridge\">\n");
    let _ = writeln!(out, "  <diagram id=\"page-1\" name=\"{}\">", escape_attr(page_name));
    out.push_str("    <mxGraphModel>\n");
    write_root(&mut out, document, 6);
    out.push_str("    </mxGraphModel>\n");
    out.push_str("  </diagram>\n");
    out.push_str("</mxfile>\n");
    out
}

fn write_root(out: &mut String, document: &Document, indent: usize) {
    let pad = " ".repeat(indent);
    let _ = writeln!(out, "{pad}<root>");
    for cell in document.cells() {
        write_cell(out, cell, indent + 2);
    }
    let _ = writeln!(out, "{pad}</root>");
}

fn write_cell(out: &mut String, cell: &Cell, indent: usize) {
    let pad = " ".repeat(indent);
    let _ = write!(out, "{pad}<mxCell id=\"{}\"", escape_attr(cell.id().as_str()));

    let is_container = matches!(cell.kind(), CellKind::Container);
    if !is_container || !cell.value().is_empty() {
        let _ = write!(out, " value=\"{}\"", escape_attr(cell.value()));
    }
    if !is_container || !cell.style().is_empty() {
        let _ = write!(out, " style=\"{}\"", escape_attr(cell.style()));
    }

    match cell.kind() {
        CellKind::Container => {}
        CellKind::Node { .. } => out.push_str(" vertex=\"1\""),
        CellKind::Edge { .. } => out.push_str(" edge=\"1\""),
    }
    if let Some(parent_id) = cell.parent_id() {
        let _ = write!(out, " parent=\"{}\"", escape_attr(parent_id.as_str()));
    }
    if let Some(source_id) = cell.source_id() {
        let _ = write!(out, " source=\"{}\"", escape_attr(source_id.as_str()));
    }
    if let Some(target_id) = cell.target_id() {
        let _ = write!(out, " target=\"{}\"", escape_attr(target_id.as_str()));
    }

    match cell.kind() {
        CellKind::Container | CellKind::Node { geometry: None } => out.push_str("/>\n"),
        CellKind::Node { geometry: Some(geometry) } => {
            out.push_str(">\n");
            let _ = writeln!(
                out,
                "{pad}  <mxGeometry x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" as=\"geometry\"/>",
                geometry.x, geometry.y, geometry.width, geometry.height
            );
            let _ = writeln!(out, "{pad}</mxCell>");
        }
        CellKind::Edge { relative, .. } => {
            out.push_str(">\n");
            if *relative {
                let _ = writeln!(out, "{pad}  <mxGeometry relative=\"1\" as=\"geometry\"/>");
            } else {
                let _ = writeln!(out, "{pad}  <mxGeometry as=\"geometry\"/>");
            }
            let _ = writeln!(out, "{pad}</mxCell>");
        }
    }
}

fn escape_attr(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\n' => escaped.push_str("&#10;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

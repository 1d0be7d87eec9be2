// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ids::CellId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Absolute bounds of a vertex, as stored in `<mxGeometry as="geometry">`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Geometry {
    pub fn new(position: Position, size: Size) -> Self {
        Self { x: position.x, y: position.y, width: size.width, height: size.height }
    }

    pub fn position(&self) -> Position {
        Position { x: self.x, y: self.y }
    }

    pub fn size(&self) -> Size {
        Size { width: self.width, height: self.height }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x={},y={},width={},height={}", self.x, self.y, self.width, self.height)
    }
}

/// A comparable aspect of a cell, used by change tracking and stale-intent reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum CellField {
    Value,
    Style,
    Geometry,
    Parent,
    Source,
    Target,
    Kind,
}

impl CellField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Style => "style",
            Self::Geometry => "geometry",
            Self::Parent => "parent",
            Self::Source => "source",
            Self::Target => "target",
            Self::Kind => "kind",
        }
    }
}

impl fmt::Display for CellField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellKind {
    /// Neither vertex nor edge: the root, layers, and plain grouping cells.
    Container,
    Node { geometry: Option<Geometry> },
    Edge { source_id: Option<CellId>, target_id: Option<CellId>, relative: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    id: CellId,
    parent_id: Option<CellId>,
    value: String,
    style: String,
    kind: CellKind,
}

impl Cell {
    pub fn new(id: CellId, parent_id: Option<CellId>, kind: CellKind) -> Self {
        Self { id, parent_id, value: String::new(), style: String::new(), kind }
    }

    pub fn container(id: CellId, parent_id: Option<CellId>) -> Self {
        Self::new(id, parent_id, CellKind::Container)
    }

    pub fn node(id: CellId, parent_id: CellId, geometry: Geometry) -> Self {
        Self::new(id, Some(parent_id), CellKind::Node { geometry: Some(geometry) })
    }

    pub fn edge(id: CellId, parent_id: CellId, source_id: CellId, target_id: CellId) -> Self {
        Self::new(
            id,
            Some(parent_id),
            CellKind::Edge {
                source_id: Some(source_id),
                target_id: Some(target_id),
                relative: true,
            },
        )
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn id(&self) -> &CellId {
        &self.id
    }

    pub fn parent_id(&self) -> Option<&CellId> {
        self.parent_id.as_ref()
    }

    pub fn set_parent_id(&mut self, parent_id: Option<CellId>) {
        self.parent_id = parent_id;
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    pub fn set_style(&mut self, style: impl Into<String>) {
        self.style = style.into();
    }

    pub fn kind(&self) -> &CellKind {
        &self.kind
    }

    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            CellKind::Container => "container",
            CellKind::Node { .. } => "node",
            CellKind::Edge { .. } => "edge",
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self.kind, CellKind::Node { .. })
    }

    pub fn is_edge(&self) -> bool {
        matches!(self.kind, CellKind::Edge { .. })
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        match &self.kind {
            CellKind::Node { geometry } => geometry.as_ref(),
            _ => None,
        }
    }

    /// Replaces the geometry of a node; no-op for edges and containers.
    pub fn set_geometry(&mut self, new_geometry: Geometry) {
        if let CellKind::Node { geometry } = &mut self.kind {
            *geometry = Some(new_geometry);
        }
    }

    pub fn source_id(&self) -> Option<&CellId> {
        match &self.kind {
            CellKind::Edge { source_id, .. } => source_id.as_ref(),
            _ => None,
        }
    }

    pub fn target_id(&self) -> Option<&CellId> {
        match &self.kind {
            CellKind::Edge { target_id, .. } => target_id.as_ref(),
            _ => None,
        }
    }

    pub fn set_endpoints(&mut self, new_source: Option<CellId>, new_target: Option<CellId>) {
        if let CellKind::Edge { source_id, target_id, .. } = &mut self.kind {
            if new_source.is_some() {
                *source_id = new_source;
            }
            if new_target.is_some() {
                *target_id = new_target;
            }
        }
    }

    pub fn references(&self, id: &CellId) -> bool {
        self.source_id() == Some(id) || self.target_id() == Some(id)
    }

    /// Fields whose content differs between `self` and `other`, ignoring the ids themselves.
    pub fn differing_fields(&self, other: &Cell) -> Vec<CellField> {
        let mut fields = Vec::new();
        if std::mem::discriminant(&self.kind) != std::mem::discriminant(&other.kind) {
            fields.push(CellField::Kind);
        }
        if self.value != other.value {
            fields.push(CellField::Value);
        }
        if self.style != other.style {
            fields.push(CellField::Style);
        }
        if self.geometry() != other.geometry() {
            fields.push(CellField::Geometry);
        }
        if self.parent_id != other.parent_id {
            fields.push(CellField::Parent);
        }
        if self.source_id() != other.source_id() {
            fields.push(CellField::Source);
        }
        if self.target_id() != other.target_id() {
            fields.push(CellField::Target);
        }
        fields
    }

    /// Display form of one field, as used in change reports.
    pub fn field_text(&self, field: CellField) -> String {
        let reference = |id: Option<&CellId>| id.map(ToString::to_string).unwrap_or_default();
        match field {
            CellField::Value => self.value.clone(),
            CellField::Style => self.style.clone(),
            CellField::Geometry => self.geometry().map(ToString::to_string).unwrap_or_default(),
            CellField::Parent => reference(self.parent_id()),
            CellField::Source => reference(self.source_id()),
            CellField::Target => reference(self.target_id()),
            CellField::Kind => self.kind_label().to_owned(),
        }
    }
}

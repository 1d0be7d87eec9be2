// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// A conflict before it is tied to its position in the batch.
#[derive(Debug)]
struct Rejection {
    id: String,
    reason: ConflictReason,
    description: String,
}

impl Rejection {
    fn new(id: impl Into<String>, reason: ConflictReason, description: String) -> Self {
        Self { id: id.into(), reason, description }
    }

    fn not_found(kind: OpKind, noun: &str, id: &CellId) -> Self {
        Self::new(
            id.as_str(),
            ConflictReason::ReferencedIdNotFound,
            format!("{kind}: no {noun} with id '{id}'"),
        )
    }

    fn missing_endpoint(kind: OpKind, edge_id: &str, side: &str, endpoint: &CellId) -> Self {
        let description = if endpoint.is_reserved() {
            format!("{kind}: {side} '{endpoint}' is a reserved cell and cannot be an endpoint")
        } else {
            format!("{kind}: {side} '{endpoint}' does not exist")
        };
        Self::new(edge_id, ConflictReason::ReferencedIdNotFound, description)
    }

    fn unrecognized(raw: &serde_json::Value) -> Self {
        let id = raw.get("id").and_then(serde_json::Value::as_str).unwrap_or_default();
        let description = match raw.get("op").and_then(serde_json::Value::as_str) {
            Some(kind) if is_known_kind(kind) => {
                let detail = serde_json::from_value::<Op>(raw.clone())
                    .err()
                    .map(|err| err.to_string())
                    .unwrap_or_else(|| "unexpected shape".to_owned());
                format!("malformed {kind} operation: {detail}")
            }
            Some(kind) => format!("unrecognized operation kind '{kind}'"),
            None => "operation has no 'op' kind".to_owned(),
        };
        Self::new(id, ConflictReason::UnknownOperation, description)
    }

    fn at(self, op_index: usize) -> Conflict {
        Conflict { op_index, id: self.id, reason: self.reason, description: self.description }
    }
}

fn is_known_kind(kind: &str) -> bool {
    matches!(
        kind,
        "add_node" | "modify_node" | "delete_node" | "add_edge" | "modify_edge" | "delete_edge"
    )
}

fn apply_op(
    document: &mut Document,
    op: &Op,
    guard: Option<&IntentGuard<'_>>,
    delta: &mut DeltaBuilder,
) -> Result<CellId, Rejection> {
    let kind = op.kind();
    match op {
        Op::AddNode { id, node_type, value, position, size, style, parent_id } => {
            let parent_id = parent_id.clone().unwrap_or_else(CellId::layer);
            check_parent(document, kind, &parent_id)?;
            if let Some(id) = id {
                check_unused(document, kind, id)?;
            }

            let geometry = crate::model::Geometry::new(
                position.unwrap_or(DEFAULT_NODE_POSITION),
                size.unwrap_or(DEFAULT_NODE_SIZE),
            );
            let style = style.clone().unwrap_or_else(|| default_node_style(node_type).to_owned());
            let node_id = match id {
                Some(id) => id.clone(),
                None => generated_id(document, kind)?,
            };
            let node = Cell::node(node_id.clone(), parent_id, geometry)
                .with_value(value.clone())
                .with_style(style);
            insert_new(document, kind, node)?;
            delta.record_added(node_id.clone());
            Ok(node_id)
        }
        Op::ModifyNode { id, value, position, size, style } => {
            let current = existing(document, kind, id, Cell::is_node, "node")?;
            check_intent(guard, kind, current)?;

            let mut geometry = current.geometry().copied().unwrap_or_else(|| {
                crate::model::Geometry::new(DEFAULT_NODE_POSITION, DEFAULT_NODE_SIZE)
            });
            if let Some(position) = position {
                geometry.x = position.x;
                geometry.y = position.y;
            }
            if let Some(size) = size {
                geometry.width = size.width;
                geometry.height = size.height;
            }

            let Some(cell) = document.get_mut(id.as_str()) else {
                return Err(Rejection::not_found(kind, "node", id));
            };
            if let Some(value) = value {
                cell.set_value(value.clone());
            }
            if let Some(style) = style {
                cell.set_style(style.clone());
            }
            if position.is_some() || size.is_some() {
                cell.set_geometry(geometry);
            }
            delta.record_updated(id.clone());
            Ok(id.clone())
        }
        Op::DeleteNode { id } => {
            let current = existing(document, kind, id, Cell::is_node, "node")?;
            check_intent(guard, kind, current)?;
            let dependents = document.dependents_of(id);
            check_dependents_intent(document, guard, kind, id, &dependents)?;
            remove_with_dependents(document, id, dependents, delta);
            Ok(id.clone())
        }
        Op::AddEdge { id, source_id, target_id, value, style } => {
            let edge_label = id.as_ref().map(CellId::as_str).unwrap_or_default();
            check_endpoint(document, kind, edge_label, "source", source_id)?;
            check_endpoint(document, kind, edge_label, "target", target_id)?;
            if let Some(id) = id {
                check_unused(document, kind, id)?;
            }

            let edge_id = match id {
                Some(id) => id.clone(),
                None => generated_id(document, kind)?,
            };
            let edge = Cell::edge(
                edge_id.clone(),
                CellId::layer(),
                source_id.clone(),
                target_id.clone(),
            )
            .with_value(value.clone())
            .with_style(style.clone().unwrap_or_else(|| DEFAULT_EDGE_STYLE.to_owned()));
            insert_new(document, kind, edge)?;
            delta.record_added(edge_id.clone());
            Ok(edge_id)
        }
        Op::ModifyEdge { id, source_id, target_id, value, style } => {
            let current = existing(document, kind, id, Cell::is_edge, "edge")?;
            check_intent(guard, kind, current)?;
            if let Some(source_id) = source_id {
                check_endpoint(document, kind, id.as_str(), "source", source_id)?;
            }
            if let Some(target_id) = target_id {
                check_endpoint(document, kind, id.as_str(), "target", target_id)?;
            }

            let Some(cell) = document.get_mut(id.as_str()) else {
                return Err(Rejection::not_found(kind, "edge", id));
            };
            cell.set_endpoints(source_id.clone(), target_id.clone());
            if let Some(value) = value {
                cell.set_value(value.clone());
            }
            if let Some(style) = style {
                cell.set_style(style.clone());
            }
            delta.record_updated(id.clone());
            Ok(id.clone())
        }
        Op::DeleteEdge { id } => {
            let current = existing(document, kind, id, Cell::is_edge, "edge")?;
            check_intent(guard, kind, current)?;
            document.remove(id.as_str());
            delta.record_removed(id.clone());
            Ok(id.clone())
        }
    }
}

/// Looks up the target of a modify/delete. Reserved cells and cells of the wrong kind count as
/// missing.
fn existing<'d>(
    document: &'d Document,
    kind: OpKind,
    id: &CellId,
    is_kind: fn(&Cell) -> bool,
    noun: &str,
) -> Result<&'d Cell, Rejection> {
    match document.get(id.as_str()) {
        Some(cell) if !id.is_reserved() && is_kind(cell) => Ok(cell),
        _ => Err(Rejection::not_found(kind, noun, id)),
    }
}

fn check_unused(document: &Document, kind: OpKind, id: &CellId) -> Result<(), Rejection> {
    if id.is_reserved() || document.contains(id.as_str()) {
        return Err(Rejection::new(
            id.as_str(),
            ConflictReason::DuplicateId,
            format!("{kind}: id '{id}' is already in use"),
        ));
    }
    Ok(())
}

fn check_parent(document: &Document, kind: OpKind, parent_id: &CellId) -> Result<(), Rejection> {
    if parent_id.as_str() == crate::model::ROOT_CELL_ID {
        return Err(Rejection::new(
            parent_id.as_str(),
            ConflictReason::InvalidParent,
            format!("{kind}: cells cannot be placed directly under the root cell '0'"),
        ));
    }
    match document.get(parent_id.as_str()) {
        None => Err(Rejection::new(
            parent_id.as_str(),
            ConflictReason::ReferencedIdNotFound,
            format!("{kind}: parent '{parent_id}' does not exist"),
        )),
        Some(parent) if parent.is_edge() => Err(Rejection::new(
            parent_id.as_str(),
            ConflictReason::InvalidParent,
            format!("{kind}: parent '{parent_id}' is an edge"),
        )),
        Some(_) => Ok(()),
    }
}

fn check_endpoint(
    document: &Document,
    kind: OpKind,
    edge_id: &str,
    side: &str,
    endpoint: &CellId,
) -> Result<(), Rejection> {
    if endpoint.is_reserved() || !document.contains(endpoint.as_str()) {
        return Err(Rejection::missing_endpoint(kind, edge_id, side, endpoint));
    }
    Ok(())
}

fn check_intent(
    guard: Option<&IntentGuard<'_>>,
    kind: OpKind,
    current: &Cell,
) -> Result<(), Rejection> {
    let Some(expected) = guard.and_then(|guard| guard.expected(current.id().as_str())) else {
        return Ok(());
    };
    let changed = expected.differing_fields(current);
    if changed.is_empty() {
        return Ok(());
    }

    let fields = changed.iter().map(|field| field.as_str()).collect::<Vec<_>>().join(", ");
    Err(Rejection::new(
        current.id().as_str(),
        ConflictReason::StaleIntent,
        format!(
            "{kind}: {} '{}' was changed by the user since the last sync ({fields}); left untouched",
            current.kind_label(),
            current.id()
        ),
    ))
}

fn generated_id(document: &mut Document, kind: OpKind) -> Result<CellId, Rejection> {
    document.allocate_id().map_err(|err| {
        Rejection::new(String::new(), ConflictReason::DuplicateId, format!("{kind}: {err}"))
    })
}

/// The cascade of a delete must not take user edits with it either.
fn check_dependents_intent(
    document: &Document,
    guard: Option<&IntentGuard<'_>>,
    kind: OpKind,
    target: &CellId,
    dependents: &[CellId],
) -> Result<(), Rejection> {
    let Some(guard) = guard else {
        return Ok(());
    };
    for dependent in dependents.iter().filter_map(|id| document.get(id.as_str())) {
        let Some(expected) = guard.expected(dependent.id().as_str()) else {
            continue;
        };
        let changed = expected.differing_fields(dependent);
        if changed.is_empty() {
            continue;
        }
        let fields = changed.iter().map(|field| field.as_str()).collect::<Vec<_>>().join(", ");
        return Err(Rejection::new(
            target.as_str(),
            ConflictReason::StaleIntent,
            format!(
                "{kind}: {} '{}' would be removed with '{target}' but was changed by the user \
                 since the last sync ({fields}); left untouched",
                dependent.kind_label(),
                dependent.id()
            ),
        ));
    }
    Ok(())
}

fn insert_new(document: &mut Document, kind: OpKind, cell: Cell) -> Result<(), Rejection> {
    let id = cell.id().clone();
    document.insert(cell).map_err(|_| {
        Rejection::new(
            id.as_str(),
            ConflictReason::DuplicateId,
            format!("{kind}: id '{id}' is already in use"),
        )
    })
}

fn remove_with_dependents(
    document: &mut Document,
    id: &CellId,
    dependents: Vec<CellId>,
    delta: &mut DeltaBuilder,
) {
    for dependent in dependents {
        document.remove(dependent.as_str());
        delta.record_removed(dependent);
    }
    document.remove(id.as_str());
    delta.record_removed(id.clone());
}

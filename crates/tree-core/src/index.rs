//! Ancestor/descendant traversal over the node arena.

use crate::id::NodeId;
use crate::state::NodeMap;
use std::collections::HashSet;

/// Ancestors of `id`, nearest first.
///
/// Walks `parent_id` links and stops at the first parent missing from the arena. A cyclic graph
/// (a programmer error) terminates instead of looping.
pub fn ancestors<T>(nodes: &NodeMap<T>, id: &NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut current = nodes.get(id).and_then(|node| node.parent_id.clone());

    while let Some(parent_id) = current {
        if !seen.insert(parent_id.clone()) {
            break;
        }
        let Some(parent) = nodes.get(&parent_id) else {
            break;
        };
        current = parent.parent_id.clone();
        out.push(parent_id);
    }

    out
}

/// Ancestor ids referenced by the chain, including ones not loaded into the arena.
///
/// The walk stops at the first missing node, but that node's id is still reported.
pub fn ancestor_chain<T>(nodes: &NodeMap<T>, id: &NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut current = nodes.get(id).and_then(|node| node.parent_id.clone());

    while let Some(parent_id) = current {
        if !seen.insert(parent_id.clone()) {
            break;
        }
        current = nodes
            .get(&parent_id)
            .and_then(|parent| parent.parent_id.clone());
        out.push(parent_id);
    }

    out
}

/// Every loaded descendant of `id` in depth-first pre-order (excluding `id` itself).
pub fn descendants<T>(nodes: &NodeMap<T>, id: &NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    seen.insert(id.clone());

    let Some(root) = nodes.get(id) else {
        return out;
    };

    let mut stack: Vec<&NodeId> = root.children().iter().rev().collect();
    while let Some(child_id) = stack.pop() {
        if !seen.insert(child_id.clone()) {
            continue;
        }
        out.push(child_id.clone());
        if let Some(child) = nodes.get(child_id) {
            stack.extend(child.children().iter().rev());
        }
    }

    out
}

/// Returns `true` if `ancestor` appears on the parent chain of `id`.
pub fn is_ancestor<T>(nodes: &NodeMap<T>, ancestor: &NodeId, id: &NodeId) -> bool {
    ancestors(nodes, id).iter().any(|candidate| candidate == ancestor)
}

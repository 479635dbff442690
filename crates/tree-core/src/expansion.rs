//! Expand/collapse transitions.
//!
//! These are pure functions over [`TreeState`]: each returns a successor state whose touched
//! collections are new handles, or the input state unchanged for no-op targets.

use crate::error::{TreeError, TreeResult};
use crate::id::NodeId;
use crate::index::{ancestors, descendants};
use crate::state::{Node, TreeState, cow, upsert_node};
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of [`toggle_expand`].
#[derive(Debug)]
pub struct ToggleExpandResult<T> {
    /// Successor state.
    pub next_state: TreeState<T>,
    /// `true` when the caller must now load the node's children.
    pub should_load_children: bool,
}

/// Toggle the expansion of `node_id`.
///
/// - Absent nodes, declared leaves and placeholders are no-ops.
/// - Collapsing removes the id from both `expanded` and `loading`.
/// - Expanding a node whose children were never loaded marks it `loading` and requests a load,
///   unless it is already loading or `can_load_children` is `false`.
pub fn toggle_expand<T>(
    state: &TreeState<T>,
    node_id: &NodeId,
    can_load_children: bool,
) -> ToggleExpandResult<T> {
    let unchanged = || ToggleExpandResult {
        next_state: state.clone(),
        should_load_children: false,
    };

    let Some(node) = state.node(node_id) else {
        return unchanged();
    };
    if node.is_declared_leaf() {
        return unchanged();
    }

    if state.is_expanded(node_id) {
        let mut next = state.with_expanded(cow(&state.expanded, |set| {
            set.remove(node_id);
        }));
        if state.is_loading(node_id) {
            next = next.with_loading(cow(&state.loading, |set| {
                set.remove(node_id);
            }));
        }
        return ToggleExpandResult {
            next_state: next,
            should_load_children: false,
        };
    }

    let mut next = state.with_expanded(cow(&state.expanded, |set| {
        set.insert(node_id.clone());
    }));

    let should_load_children =
        !node.children_loaded() && can_load_children && !state.is_loading(node_id);
    if should_load_children {
        next = next.with_loading(cow(&state.loading, |set| {
            set.insert(node_id.clone());
        }));
    }

    ToggleExpandResult {
        next_state: next,
        should_load_children,
    }
}

/// Expand every loaded ancestor of `node_id`.
///
/// Ancestors missing from the arena are skipped; the caller has to load them first. Returns the
/// input state unchanged if nothing needed expanding.
pub fn expand_ancestor_path<T>(state: &TreeState<T>, node_id: &NodeId) -> TreeState<T> {
    let missing: Vec<NodeId> = ancestors(&state.nodes, node_id)
        .into_iter()
        .filter(|id| !state.is_expanded(id))
        .collect();

    if missing.is_empty() {
        return state.clone();
    }

    state.with_expanded(cow(&state.expanded, |set| set.extend(missing)))
}

/// Commit a completed children load for a non-paged parent.
///
/// `children` is the new ordered child list and `new_nodes` every node ingested with it (the
/// children plus any eagerly provided descendants). Previous children that are not part of the new
/// list are deleted together with their subtrees; surviving children keep theirs. Clears the
/// parent's `loading` flag and error.
pub fn set_children_loaded<T>(
    state: &TreeState<T>,
    parent_id: &NodeId,
    children: Vec<NodeId>,
    new_nodes: Vec<Node<T>>,
) -> TreeResult<TreeState<T>> {
    let parent = state
        .node(parent_id)
        .ok_or_else(|| TreeError::UnknownNode(parent_id.clone()))?;
    if parent.placeholder {
        return Err(TreeError::PlaceholderParent(parent_id.clone()));
    }

    let keep: HashSet<&NodeId> = children.iter().collect();
    let mut removed: HashSet<NodeId> = HashSet::new();
    for old in parent.children() {
        if keep.contains(old) {
            continue;
        }
        removed.insert(old.clone());
        removed.extend(descendants(&state.nodes, old));
    }

    let mut nodes = cow(&state.nodes, |nodes| {
        if !removed.is_empty() {
            nodes.retain(|id, _| !removed.contains(id));
        }
    });
    for node in new_nodes {
        removed.remove(&node.id);
        upsert_node(&mut nodes, node);
    }
    if let Some(slot) = nodes.get_mut(parent_id) {
        let mut next = Node::clone(slot);
        next.children_ids = Some(children);
        *slot = Arc::new(next);
    }

    Ok(state
        .with_nodes_removing(nodes, &removed)
        .with_loading_flag(parent_id, false)
        .with_error_entry(parent_id, None))
}

/// Delete every id in `descendant_ids` and purge them from the id-keyed collections, then reset
/// `parent`'s child list to loaded-and-empty.
pub fn clear_children_state<T>(
    state: &TreeState<T>,
    parent: &NodeId,
    descendant_ids: &[NodeId],
) -> TreeState<T> {
    let removed: HashSet<NodeId> = descendant_ids.iter().cloned().collect();

    let mut nodes = cow(&state.nodes, |nodes| {
        nodes.retain(|id, _| !removed.contains(id));
    });
    if let Some(node) = nodes.get_mut(parent) {
        let mut reset = Node::clone(node);
        reset.children_ids = Some(Vec::new());
        *node = Arc::new(reset);
    }

    state.with_nodes_removing(nodes, &removed)
}

//! Selection transitions and tri-state derivation.
//!
//! Selection is stored as a flat id set in [`TreeState::selected`]. Under hierarchical
//! multi-selection the displayed state (selected / indeterminate) is derived bottom-up on demand
//! by [`calculate_hierarchical_selection`]; it is never persisted.

use crate::id::NodeId;
use crate::index::{ancestors, descendants};
use crate::state::{NodeMap, TreeState};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Selection commands are no-ops.
    None,
    /// At most one node is selected.
    #[default]
    Single,
    /// Any number of nodes can be selected.
    Multi,
}

/// Selection behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Selection mode.
    pub mode: SelectionMode,
    /// Under [`SelectionMode::Multi`], toggling a node toggles its whole subtree and rows show
    /// derived tri-state.
    pub hierarchical: bool,
}

impl SelectionConfig {
    /// Single selection.
    pub fn single() -> Self {
        Self {
            mode: SelectionMode::Single,
            hierarchical: false,
        }
    }

    /// Flat multi-selection.
    pub fn multi() -> Self {
        Self {
            mode: SelectionMode::Multi,
            hierarchical: false,
        }
    }

    /// Hierarchical multi-selection.
    pub fn hierarchical() -> Self {
        Self {
            mode: SelectionMode::Multi,
            hierarchical: true,
        }
    }

    /// Returns `true` when tri-state derivation applies.
    pub fn is_hierarchical(&self) -> bool {
        self.mode == SelectionMode::Multi && self.hierarchical
    }
}

/// Derived tri-state selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchicalSelection {
    /// Nodes that are fully selected.
    pub selected: HashSet<NodeId>,
    /// Nodes with some, but not all, selectable descendants selected.
    pub indeterminate: HashSet<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tri {
    Selected,
    Partial,
    Clear,
    Excluded,
}

/// Derive the tri-state of every node from the raw `selected` set.
///
/// - Placeholders and disabled nodes (with their subtrees) are excluded from every denominator.
/// - A node without enabled children is selected iff it is in `selected`.
/// - A node with enabled children is selected iff all of them are fully selected, indeterminate
///   iff any of them is selected or indeterminate, clear otherwise.
pub fn calculate_hierarchical_selection<T>(
    nodes: &NodeMap<T>,
    selected: &IndexSet<NodeId>,
) -> HierarchicalSelection {
    let mut memo: HashMap<&NodeId, Tri> = HashMap::with_capacity(nodes.len());

    for start in nodes.keys() {
        if memo.contains_key(start) {
            continue;
        }
        let mut stack: Vec<(&NodeId, bool)> = vec![(start, false)];
        while let Some((id, children_done)) = stack.pop() {
            if memo.contains_key(id) {
                continue;
            }
            let Some(node) = nodes.get(id) else {
                continue;
            };
            if !node.is_selectable() {
                memo.insert(id, Tri::Excluded);
                continue;
            }

            if !children_done {
                stack.push((id, true));
                for child in node.children() {
                    if !memo.contains_key(child) && nodes.contains_key(child) {
                        stack.push((child, false));
                    }
                }
                continue;
            }

            let mut enabled = 0usize;
            let mut full = 0usize;
            let mut touched = false;
            for child in node.children() {
                match memo.get(child).copied().unwrap_or(Tri::Excluded) {
                    Tri::Excluded => {}
                    Tri::Selected => {
                        enabled += 1;
                        full += 1;
                        touched = true;
                    }
                    Tri::Partial => {
                        enabled += 1;
                        touched = true;
                    }
                    Tri::Clear => enabled += 1,
                }
            }

            let tri = if enabled == 0 {
                if selected.contains(id) {
                    Tri::Selected
                } else {
                    Tri::Clear
                }
            } else if full == enabled {
                Tri::Selected
            } else if touched {
                Tri::Partial
            } else {
                Tri::Clear
            };
            memo.insert(id, tri);
        }
    }

    let mut out = HierarchicalSelection::default();
    for (id, tri) in memo {
        match tri {
            Tri::Selected => {
                out.selected.insert(id.clone());
            }
            Tri::Partial => {
                out.indeterminate.insert(id.clone());
            }
            Tri::Clear | Tri::Excluded => {}
        }
    }
    out
}

fn subtree_fully_selected<T>(nodes: &NodeMap<T>, selected: &IndexSet<NodeId>, id: &NodeId) -> bool {
    let mut subtree = NodeMap::new();
    if let Some(node) = nodes.get(id) {
        subtree.insert(id.clone(), node.clone());
    }
    for descendant in descendants(nodes, id) {
        if let Some(node) = nodes.get(&descendant) {
            subtree.insert(descendant, node.clone());
        }
    }
    calculate_hierarchical_selection(&subtree, selected)
        .selected
        .contains(id)
}

fn selectable<T>(state: &TreeState<T>, id: &NodeId) -> bool {
    state.node(id).is_some_and(|node| node.is_selectable())
}

fn selectable_subtree<T>(state: &TreeState<T>, id: &NodeId) -> Vec<NodeId> {
    let mut ids = vec![id.clone()];
    ids.extend(
        descendants(&state.nodes, id)
            .into_iter()
            .filter(|descendant| selectable(state, descendant)),
    );
    ids
}

/// `id` plus its descendants, pruning at disabled nodes and placeholders.
fn enabled_subtree<T>(state: &TreeState<T>, id: &NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![id.clone()];
    let mut seen = HashSet::new();
    while let Some(current) = stack.pop() {
        if !seen.insert(current.clone()) {
            continue;
        }
        let Some(node) = state.node(&current) else {
            continue;
        };
        if !node.is_selectable() {
            continue;
        }
        stack.extend(node.children().iter().rev().cloned());
        out.push(current);
    }
    out
}

/// Replace the selection with exactly `node_id` (plus its selectable subtree under hierarchical
/// selection).
pub fn select_one<T>(state: &TreeState<T>, node_id: &NodeId, config: SelectionConfig) -> TreeState<T> {
    if config.mode == SelectionMode::None || !selectable(state, node_id) {
        return state.clone();
    }

    let next: IndexSet<NodeId> = if config.is_hierarchical() {
        enabled_subtree(state, node_id).into_iter().collect()
    } else {
        std::iter::once(node_id.clone()).collect()
    };

    if *state.selected == next {
        return state.clone();
    }
    state.with_selected(next)
}

/// Toggle `node_id` according to the selection mode.
pub fn select_toggle<T>(
    state: &TreeState<T>,
    node_id: &NodeId,
    config: SelectionConfig,
) -> TreeState<T> {
    if !selectable(state, node_id) {
        return state.clone();
    }

    match config.mode {
        SelectionMode::None => state.clone(),
        SelectionMode::Single => {
            let next: IndexSet<NodeId> = std::iter::once(node_id.clone()).collect();
            if *state.selected == next {
                return state.clone();
            }
            state.with_selected(next)
        }
        SelectionMode::Multi if config.hierarchical => {
            let mut next = (*state.selected).clone();
            let subtree = enabled_subtree(state, node_id);
            if subtree_fully_selected(&state.nodes, &state.selected, node_id) {
                for id in &subtree {
                    next.shift_remove(id);
                }
                for id in descendants(&state.nodes, node_id) {
                    next.shift_remove(&id);
                }
                for ancestor in ancestors(&state.nodes, node_id) {
                    next.shift_remove(&ancestor);
                }
            } else {
                next.extend(subtree);
            }
            state.with_selected(next)
        }
        SelectionMode::Multi => {
            let mut next = (*state.selected).clone();
            if !next.shift_remove(node_id) {
                next.insert(node_id.clone());
            }
            state.with_selected(next)
        }
    }
}

/// Clear the selection.
pub fn select_none<T>(state: &TreeState<T>) -> TreeState<T> {
    if state.selected.is_empty() {
        return state.clone();
    }
    state.with_selected(IndexSet::new())
}

/// Select the contiguous run of `ordered_ids` between `from_id` and `to_id` (inclusive, either
/// order), skipping disabled rows and placeholders.
///
/// Under single selection only `to_id` is selected. Ids missing from `ordered_ids` are no-ops.
pub fn select_range<T>(
    state: &TreeState<T>,
    ordered_ids: &[NodeId],
    from_id: &NodeId,
    to_id: &NodeId,
    config: SelectionConfig,
) -> TreeState<T> {
    match config.mode {
        SelectionMode::None => return state.clone(),
        SelectionMode::Single => return select_one(state, to_id, config),
        SelectionMode::Multi => {}
    }

    let from = ordered_ids.iter().position(|id| id == from_id);
    let to = ordered_ids.iter().position(|id| id == to_id);
    let (Some(from), Some(to)) = (from, to) else {
        return state.clone();
    };
    let (lo, hi) = if from <= to { (from, to) } else { (to, from) };

    let next: IndexSet<NodeId> = ordered_ids[lo..=hi]
        .iter()
        .filter(|id| selectable(state, id))
        .cloned()
        .collect();

    if *state.selected == next {
        return state.clone();
    }
    state.with_selected(next)
}

/// Add `node_id` and every selectable descendant to the selection.
///
/// Under single selection this behaves like [`select_one`].
pub fn select_branch<T>(
    state: &TreeState<T>,
    node_id: &NodeId,
    config: SelectionConfig,
) -> TreeState<T> {
    match config.mode {
        SelectionMode::None => return state.clone(),
        SelectionMode::Single => return select_one(state, node_id, config),
        SelectionMode::Multi => {}
    }
    if !selectable(state, node_id) {
        return state.clone();
    }

    let subtree = selectable_subtree(state, node_id);
    if subtree.iter().all(|id| state.selected.contains(id)) {
        return state.clone();
    }
    let mut next = (*state.selected).clone();
    next.extend(subtree);
    state.with_selected(next)
}

/// Under hierarchical selection, extend a selected parent over its newly loaded enabled subtree.
pub fn inherit_parent_selection<T>(
    state: &TreeState<T>,
    parent_id: &NodeId,
    config: SelectionConfig,
) -> TreeState<T> {
    if !config.is_hierarchical() || !state.is_selected(parent_id) {
        return state.clone();
    }
    let subtree = enabled_subtree(state, parent_id);
    if subtree.iter().all(|id| state.selected.contains(id)) {
        return state.clone();
    }
    let mut next = (*state.selected).clone();
    next.extend(subtree);
    state.with_selected(next)
}

/// Drop every selected id for which `keep` returns `false`.
pub fn retain_selected<T>(state: &TreeState<T>, keep: impl Fn(&NodeId) -> bool) -> TreeState<T> {
    if state.selected.iter().all(&keep) {
        return state.clone();
    }
    state.with_selected(state.selected.iter().filter(|id| keep(id)).cloned().collect())
}

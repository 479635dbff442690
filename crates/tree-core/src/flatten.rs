//! Expansion-aware linearization of the forest.
//!
//! [`flatten`] walks the forest depth-first. A node's children are emitted only when the node
//! passed the visibility gate and is expanded. [`FlattenCache`] memoizes the result against the
//! exact `(nodes, expanded)` handle pair plus a gate epoch.

use crate::id::NodeId;
use crate::state::{Node, NodeMap};
use std::collections::HashSet;
use std::sync::Arc;

/// One line of the flattened forest.
#[derive(Debug)]
pub struct FlatEntry<T> {
    /// Node id.
    pub id: NodeId,
    /// Node depth.
    pub level: usize,
    /// The node itself (children ids, flags, data).
    pub node: Arc<Node<T>>,
    /// Result of the visibility gate. Children of gated-out nodes are never emitted.
    pub is_visible: bool,
}

impl<T> Clone for FlatEntry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            level: self.level,
            node: self.node.clone(),
            is_visible: self.is_visible,
        }
    }
}

impl<T> FlatEntry<T> {
    /// Loaded child ids of the entry's node.
    pub fn children_ids(&self) -> Option<&[NodeId]> {
        self.node.children_ids.as_deref()
    }
}

/// Flatten `nodes` starting from `roots` (defaults to every parentless node).
pub fn flatten<T>(
    nodes: &NodeMap<T>,
    expanded: &HashSet<NodeId>,
    roots: Option<&[NodeId]>,
    gate: &dyn Fn(&Node<T>) -> bool,
) -> Vec<FlatEntry<T>> {
    let default_roots;
    let roots = match roots {
        Some(roots) => roots,
        None => {
            default_roots = nodes
                .values()
                .filter(|node| node.parent_id.is_none())
                .map(|node| node.id.clone())
                .collect::<Vec<_>>();
            &default_roots[..]
        }
    };

    let mut out = Vec::with_capacity(nodes.len().min(1024));
    let mut seen: HashSet<&NodeId> = HashSet::new();
    let mut stack: Vec<&NodeId> = roots.iter().rev().collect();

    while let Some(id) = stack.pop() {
        let Some(node) = nodes.get(id) else {
            continue;
        };
        if !seen.insert(&node.id) {
            continue;
        }

        let is_visible = gate(node);
        out.push(FlatEntry {
            id: node.id.clone(),
            level: node.level,
            node: node.clone(),
            is_visible,
        });

        if is_visible && expanded.contains(id) {
            stack.extend(node.children().iter().rev());
        }
    }

    out
}

/// Flatten with an always-open gate.
pub fn flatten_all<T>(nodes: &NodeMap<T>, expanded: &HashSet<NodeId>) -> Vec<FlatEntry<T>> {
    flatten(nodes, expanded, None, &|_| true)
}

struct CachedFlatten<T> {
    nodes: Arc<NodeMap<T>>,
    expanded: Arc<HashSet<NodeId>>,
    gate_epoch: u64,
    entries: Arc<Vec<FlatEntry<T>>>,
}

/// Single-slot memo for [`flatten`].
pub struct FlattenCache<T> {
    slot: Option<CachedFlatten<T>>,
    hits: u64,
    misses: u64,
}

impl<T> Default for FlattenCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FlattenCache<T> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            slot: None,
            hits: 0,
            misses: 0,
        }
    }

    /// Return the cached flattening if `nodes`/`expanded` are the same handles and the gate epoch
    /// is unchanged, otherwise recompute.
    pub fn get_or_compute(
        &mut self,
        nodes: &Arc<NodeMap<T>>,
        expanded: &Arc<HashSet<NodeId>>,
        gate_epoch: u64,
        gate: &dyn Fn(&Node<T>) -> bool,
    ) -> Arc<Vec<FlatEntry<T>>> {
        if let Some(slot) = &self.slot {
            if Arc::ptr_eq(&slot.nodes, nodes)
                && Arc::ptr_eq(&slot.expanded, expanded)
                && slot.gate_epoch == gate_epoch
            {
                self.hits += 1;
                log::trace!("flatten cache hit ({} entries)", slot.entries.len());
                return slot.entries.clone();
            }
        }

        self.misses += 1;
        let entries = Arc::new(flatten(nodes, expanded, None, gate));
        log::trace!("flatten cache miss, rebuilt {} entries", entries.len());
        self.slot = Some(CachedFlatten {
            nodes: nodes.clone(),
            expanded: expanded.clone(),
            gate_epoch,
            entries: entries.clone(),
        });
        entries
    }

    /// Drop the cached result.
    pub fn clear(&mut self) {
        self.slot = None;
    }

    /// Number of calls answered from the cache.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Number of recomputations.
    pub fn misses(&self) -> u64 {
        self.misses
    }
}

//! Node graph and tree state.
//!
//! The forest is a flat map from [`NodeId`] to [`Node`]; parent/child relationships are id
//! lookups into that map. Every collection in [`TreeState`] sits behind its own `Arc`, and every
//! transition replaces the handles it touches with freshly allocated ones, never mutating a shared
//! collection in place. Caches downstream key on `Arc::ptr_eq`, so "same handle" means "same
//! content".

use crate::error::LoadError;
use crate::id::NodeId;
use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Id-keyed node arena, in ingestion order.
pub type NodeMap<T> = IndexMap<NodeId, Arc<Node<T>>>;

/// A node in the forest.
#[derive(Debug)]
pub struct Node<T> {
    /// Node id.
    pub id: NodeId,
    /// Parent id, `None` for roots.
    pub parent_id: Option<NodeId>,
    /// Depth from the root (roots are level 0).
    pub level: usize,
    /// Ordered child ids. `None` means "not loaded yet", `Some(empty)` means "loaded, empty".
    pub children_ids: Option<Vec<NodeId>>,
    /// Leaf-ness declared at ingestion time.
    pub is_leaf: Option<bool>,
    /// Disabled nodes are never selectable.
    pub disabled: bool,
    /// Synthetic stand-in for an unloaded slot of a paginated parent.
    pub placeholder: bool,
    /// Slot index for placeholders.
    pub placeholder_index: Option<usize>,
    /// Host data (absent for placeholders).
    pub data: Option<Arc<T>>,
}

impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            parent_id: self.parent_id.clone(),
            level: self.level,
            children_ids: self.children_ids.clone(),
            is_leaf: self.is_leaf,
            disabled: self.disabled,
            placeholder: self.placeholder,
            placeholder_index: self.placeholder_index,
            data: self.data.clone(),
        }
    }
}

impl<T> Node<T> {
    /// Create a data node whose children are not loaded yet.
    pub fn new(id: NodeId, parent_id: Option<NodeId>, level: usize, data: T) -> Self {
        Self {
            id,
            parent_id,
            level,
            children_ids: None,
            is_leaf: None,
            disabled: false,
            placeholder: false,
            placeholder_index: None,
            data: Some(Arc::new(data)),
        }
    }

    /// Create the placeholder node for slot `index` of `parent`.
    ///
    /// Returns `None` if `parent` is itself a placeholder.
    pub fn placeholder(parent: &Node<T>, index: usize) -> Option<Self> {
        let id = NodeId::placeholder(&parent.id, index)?;
        Some(Self {
            id,
            parent_id: Some(parent.id.clone()),
            level: parent.level + 1,
            children_ids: Some(Vec::new()),
            is_leaf: Some(true),
            disabled: true,
            placeholder: true,
            placeholder_index: Some(index),
            data: None,
        })
    }

    /// Builder: set the child list.
    pub fn with_children(mut self, children: Vec<NodeId>) -> Self {
        self.children_ids = Some(children);
        self
    }

    /// Builder: declare leaf-ness.
    pub fn with_leaf(mut self, is_leaf: bool) -> Self {
        self.is_leaf = Some(is_leaf);
        self
    }

    /// Builder: mark disabled.
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Returns `true` once the child list has been loaded (possibly empty).
    pub fn children_loaded(&self) -> bool {
        self.children_ids.is_some()
    }

    /// Loaded children, or an empty slice.
    pub fn children(&self) -> &[NodeId] {
        self.children_ids.as_deref().unwrap_or(&[])
    }

    /// Declared leaves and placeholders never expand.
    pub fn is_declared_leaf(&self) -> bool {
        self.placeholder || self.is_leaf == Some(true)
    }

    /// Disabled nodes and placeholders are excluded from selection.
    pub fn is_selectable(&self) -> bool {
        !self.disabled && !self.placeholder
    }
}

/// Authoritative tree state, replaced handle-by-handle on every transition.
#[derive(Debug)]
pub struct TreeState<T> {
    /// Node arena.
    pub nodes: Arc<NodeMap<T>>,
    /// Expanded node ids.
    pub expanded: Arc<HashSet<NodeId>>,
    /// Selected node ids, in selection order.
    pub selected: Arc<IndexSet<NodeId>>,
    /// Nodes with a children (or page) load in flight.
    pub loading: Arc<HashSet<NodeId>>,
    /// Per-node load failures.
    pub errors: Arc<HashMap<NodeId, LoadError>>,
}

impl<T> Clone for TreeState<T> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            expanded: self.expanded.clone(),
            selected: self.selected.clone(),
            loading: self.loading.clone(),
            errors: self.errors.clone(),
        }
    }
}

impl<T> Default for TreeState<T> {
    fn default() -> Self {
        Self::from_nodes(NodeMap::new())
    }
}

impl<T> TreeState<T> {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state over an existing arena, with nothing expanded or selected.
    pub fn from_nodes(nodes: NodeMap<T>) -> Self {
        Self {
            nodes: Arc::new(nodes),
            expanded: Arc::new(HashSet::new()),
            selected: Arc::new(IndexSet::new()),
            loading: Arc::new(HashSet::new()),
            errors: Arc::new(HashMap::new()),
        }
    }

    /// Look up a node.
    pub fn node(&self, id: &NodeId) -> Option<&Arc<Node<T>>> {
        self.nodes.get(id)
    }

    /// Returns `true` if the node is expanded.
    pub fn is_expanded(&self, id: &NodeId) -> bool {
        self.expanded.contains(id)
    }

    /// Returns `true` if the node is selected.
    pub fn is_selected(&self, id: &NodeId) -> bool {
        self.selected.contains(id)
    }

    /// Returns `true` if a load is in flight for the node.
    pub fn is_loading(&self, id: &NodeId) -> bool {
        self.loading.contains(id)
    }

    /// Load error recorded for the node.
    pub fn error(&self, id: &NodeId) -> Option<&LoadError> {
        self.errors.get(id)
    }

    /// Ids of every node without a parent, in ingestion order.
    pub fn root_ids(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.parent_id.is_none())
            .map(|node| node.id.clone())
            .collect()
    }

    /// Returns `true` if every handle is shared with `other`.
    pub fn same_handles(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.nodes, &other.nodes)
            && Arc::ptr_eq(&self.expanded, &other.expanded)
            && Arc::ptr_eq(&self.selected, &other.selected)
            && Arc::ptr_eq(&self.loading, &other.loading)
            && Arc::ptr_eq(&self.errors, &other.errors)
    }

    /// Replace the node arena.
    pub fn with_nodes(&self, nodes: NodeMap<T>) -> Self {
        Self {
            nodes: Arc::new(nodes),
            ..self.clone()
        }
    }

    /// Replace the expanded set.
    pub fn with_expanded(&self, expanded: HashSet<NodeId>) -> Self {
        Self {
            expanded: Arc::new(expanded),
            ..self.clone()
        }
    }

    /// Replace the selected set.
    pub fn with_selected(&self, selected: IndexSet<NodeId>) -> Self {
        Self {
            selected: Arc::new(selected),
            ..self.clone()
        }
    }

    /// Replace the loading set.
    pub fn with_loading(&self, loading: HashSet<NodeId>) -> Self {
        Self {
            loading: Arc::new(loading),
            ..self.clone()
        }
    }

    /// Replace the arena with `nodes` and drop `removed` ids from every id-keyed collection.
    ///
    /// Collections that contain none of the removed ids keep their handles.
    pub fn with_nodes_removing(&self, nodes: NodeMap<T>, removed: &HashSet<NodeId>) -> Self {
        if removed.is_empty() {
            return self.with_nodes(nodes);
        }

        let expanded = if self.expanded.iter().any(|id| removed.contains(id)) {
            Arc::new(
                self.expanded
                    .iter()
                    .filter(|id| !removed.contains(*id))
                    .cloned()
                    .collect(),
            )
        } else {
            self.expanded.clone()
        };
        let selected = if self.selected.iter().any(|id| removed.contains(id)) {
            Arc::new(
                self.selected
                    .iter()
                    .filter(|id| !removed.contains(*id))
                    .cloned()
                    .collect(),
            )
        } else {
            self.selected.clone()
        };
        let loading = if self.loading.iter().any(|id| removed.contains(id)) {
            Arc::new(
                self.loading
                    .iter()
                    .filter(|id| !removed.contains(*id))
                    .cloned()
                    .collect(),
            )
        } else {
            self.loading.clone()
        };
        let errors = if self.errors.keys().any(|id| removed.contains(id)) {
            Arc::new(
                self.errors
                    .iter()
                    .filter(|(id, _)| !removed.contains(*id))
                    .map(|(id, err)| (id.clone(), err.clone()))
                    .collect(),
            )
        } else {
            self.errors.clone()
        };

        Self {
            nodes: Arc::new(nodes),
            expanded,
            selected,
            loading,
            errors,
        }
    }

    /// Add or remove `id` from the loading set, keeping the handle when nothing changes.
    pub fn with_loading_flag(&self, id: &NodeId, loading: bool) -> Self {
        if self.loading.contains(id) == loading {
            return self.clone();
        }
        self.with_loading(cow(&self.loading, |set| {
            if loading {
                set.insert(id.clone());
            } else {
                set.remove(id);
            }
        }))
    }

    /// Set or clear the error for `id`, keeping the handle when nothing changes.
    pub fn with_error_entry(&self, id: &NodeId, error: Option<LoadError>) -> Self {
        match (&error, self.errors.get(id)) {
            (None, None) => return self.clone(),
            (Some(next), Some(current)) if next.ptr_eq(current) => return self.clone(),
            _ => {}
        }
        self.with_errors(cow(&self.errors, |map| match error {
            Some(err) => {
                map.insert(id.clone(), err);
            }
            None => {
                map.remove(id);
            }
        }))
    }

    /// Replace the error map.
    pub fn with_errors(&self, errors: HashMap<NodeId, LoadError>) -> Self {
        Self {
            errors: Arc::new(errors),
            ..self.clone()
        }
    }
}

/// Clone the collection behind `arc` and mutate the copy.
pub(crate) fn cow<C: Clone>(arc: &Arc<C>, f: impl FnOnce(&mut C)) -> C {
    let mut next = C::clone(arc);
    f(&mut next);
    next
}

/// Insert `node`, keeping the already-loaded child list of a node with the same id when the
/// incoming node carries none.
pub(crate) fn upsert_node<T>(nodes: &mut NodeMap<T>, mut node: Node<T>) {
    if node.children_ids.is_none() {
        if let Some(existing) = nodes.get(&node.id) {
            node.children_ids = existing.children_ids.clone();
        }
    }
    nodes.insert(node.id.clone(), Arc::new(node));
}

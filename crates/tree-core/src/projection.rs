//! Row view models.
//!
//! The projection is the ordered, filtered, field-resolved row list handed to renderers. It is
//! derived from state on every cache miss and never written back.

use crate::adapter::{LeafContext, TreeAdapter};
use crate::config::EngineConfig;
use crate::error::LoadError;
use crate::filter::HighlightRange;
use crate::flatten::FlatEntry;
use crate::id::NodeId;
use crate::paging::PagingMap;
use crate::selection::HierarchicalSelection;
use crate::state::{Node, TreeState};
use crate::visibility::{ActiveFilter, Visibility};
use std::collections::HashMap;
use std::sync::Arc;

/// A renderable row.
#[derive(Debug)]
pub struct RowViewModel<T> {
    /// Node id.
    pub id: NodeId,
    /// Parent id.
    pub parent_id: Option<NodeId>,
    /// Depth (roots are level 0).
    pub level: usize,
    /// Display label.
    pub label: String,
    /// Icon name.
    pub icon: Option<String>,
    /// Resolved leaf-ness (no expand affordance).
    pub is_leaf: bool,
    /// Not selectable.
    pub disabled: bool,
    /// Passes the eligibility gate and the active filter.
    pub visible: bool,
    /// Expanded.
    pub expanded: bool,
    /// Selected (fully selected under hierarchical selection).
    pub selected: bool,
    /// Partially selected subtree.
    pub indeterminate: bool,
    /// A load covering this row is in flight.
    pub loading: bool,
    /// A load covering this row failed.
    pub error: bool,
    /// The failure behind [`RowViewModel::error`].
    pub error_detail: Option<LoadError>,
    /// Match highlights within the label (character offsets).
    pub highlight_ranges: Option<Vec<HighlightRange>>,
    /// Synthetic slot of a paginated parent.
    pub placeholder: bool,
    /// Slot index of a placeholder.
    pub placeholder_index: Option<usize>,
    /// Host data.
    pub data: Option<Arc<T>>,
}

impl<T> Clone for RowViewModel<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            parent_id: self.parent_id.clone(),
            level: self.level,
            label: self.label.clone(),
            icon: self.icon.clone(),
            is_leaf: self.is_leaf,
            disabled: self.disabled,
            visible: self.visible,
            expanded: self.expanded,
            selected: self.selected,
            indeterminate: self.indeterminate,
            loading: self.loading,
            error: self.error,
            error_detail: self.error_detail.clone(),
            highlight_ranges: self.highlight_ranges.clone(),
            placeholder: self.placeholder,
            placeholder_index: self.placeholder_index,
            data: self.data.clone(),
        }
    }
}

/// The ordered row structure behind every read view.
#[derive(Debug)]
pub struct Projection<T> {
    /// Every flattened id, in row order (visible or not).
    pub ordered_ids: Vec<NodeId>,
    /// Rows of every flattened id.
    pub rows_by_id: HashMap<NodeId, RowViewModel<T>>,
    /// Visible ids, in row order.
    pub visible_ids: Vec<NodeId>,
}

impl<T> Default for Projection<T> {
    fn default() -> Self {
        Self {
            ordered_ids: Vec::new(),
            rows_by_id: HashMap::new(),
            visible_ids: Vec::new(),
        }
    }
}

impl<T> Projection<T> {
    /// Row of a flattened id.
    pub fn row(&self, id: &NodeId) -> Option<&RowViewModel<T>> {
        self.rows_by_id.get(id)
    }

    /// Visible rows in order.
    pub fn visible_rows(&self) -> impl Iterator<Item = &RowViewModel<T>> + '_ {
        self.visible_ids.iter().filter_map(|id| self.rows_by_id.get(id))
    }

    /// Number of visible rows.
    pub fn visible_len(&self) -> usize {
        self.visible_ids.len()
    }
}

/// Resolve leaf-ness.
///
/// Precedence: placeholders are leaves, then `adapter.is_leaf`, the declared `node.is_leaf`,
/// a loaded child list (empty means leaf), `adapter.has_children`, and finally a node is
/// expandable only if the adapter can load children.
pub fn resolve_is_leaf<A: TreeAdapter>(adapter: &A, node: &Node<A::Data>) -> bool {
    if node.placeholder {
        return true;
    }
    let data = node.data.as_deref();
    if let Some(leaf) = data.and_then(|data| {
        adapter.is_leaf(
            data,
            &LeafContext {
                id: &node.id,
                level: node.level,
                children_ids: node.children_ids.as_deref(),
            },
        )
    }) {
        return leaf;
    }
    if let Some(leaf) = node.is_leaf {
        return leaf;
    }
    if let Some(children) = &node.children_ids {
        return children.is_empty();
    }
    if let Some(has_children) = data.and_then(|data| adapter.has_children(data)) {
        return !has_children;
    }
    !adapter.loads_children()
}

/// Everything a row needs besides its node.
pub struct RowContext<'a, A: TreeAdapter> {
    /// Adapter.
    pub adapter: &'a A,
    /// Current state.
    pub state: &'a TreeState<A::Data>,
    /// Pagination bookkeeping.
    pub paging: &'a PagingMap,
    /// Engine configuration.
    pub config: &'a EngineConfig,
    /// Active filter.
    pub filter: Option<&'a ActiveFilter>,
    /// Filter visibility.
    pub visibility: &'a Visibility,
    /// Derived tri-state under hierarchical selection.
    pub tri_state: Option<&'a HierarchicalSelection>,
}

impl<A: TreeAdapter> RowContext<'_, A> {
    /// Resolve the row of `node`.
    pub fn resolve_row(&self, node: &Arc<Node<A::Data>>) -> RowViewModel<A::Data> {
        let paged = node
            .parent_id
            .as_ref()
            .filter(|_| node.placeholder)
            .and_then(|parent| self.paging.get(parent));

        let (label, icon, loading, error_detail) = match (node.placeholder_index, paged) {
            (Some(index), Some(paged)) if node.placeholder => {
                let error = paged.error_for_slot(index).cloned();
                let label = if error.is_some() {
                    self.config.page_error_label.clone()
                } else {
                    self.config.placeholder_label.clone()
                };
                (label, None, paged.is_slot_in_flight(index), error)
            }
            _ if node.placeholder => (self.config.placeholder_label.clone(), None, false, None),
            _ => {
                let (label, icon) = match node.data.as_deref() {
                    Some(data) => (
                        self.adapter.label(data),
                        self.adapter
                            .icon(data)
                            .or_else(|| self.config.default_icon.clone()),
                    ),
                    None => (String::new(), self.config.default_icon.clone()),
                };
                (
                    label,
                    icon,
                    self.state.is_loading(&node.id),
                    self.state.error(&node.id).cloned(),
                )
            }
        };

        let (selected, indeterminate) = if !node.is_selectable() {
            (false, false)
        } else if let Some(tri) = self.tri_state {
            (
                tri.selected.contains(&node.id),
                tri.indeterminate.contains(&node.id),
            )
        } else {
            (self.state.is_selected(&node.id), false)
        };

        let highlight_ranges = match self.filter {
            Some(filter)
                if self.visibility.is_client_filtering()
                    && self.visibility.is_direct_match(&node.id) =>
            {
                filter.highlight_ranges(self.adapter, &label)
            }
            _ => None,
        };

        RowViewModel {
            id: node.id.clone(),
            parent_id: node.parent_id.clone(),
            level: node.level,
            is_leaf: resolve_is_leaf(self.adapter, node),
            disabled: node.disabled || node.placeholder,
            visible: self.visibility.is_visible(&node.id),
            expanded: self.state.is_expanded(&node.id),
            selected,
            indeterminate,
            loading,
            error: error_detail.is_some(),
            error_detail,
            highlight_ranges,
            placeholder: node.placeholder,
            placeholder_index: node.placeholder_index,
            data: node.data.clone(),
            label,
            icon,
        }
    }
}

/// Build the projection from a flattening.
pub fn build_projection<A: TreeAdapter>(
    ctx: &RowContext<'_, A>,
    flat: &[FlatEntry<A::Data>],
) -> Projection<A::Data> {
    let mut projection = Projection {
        ordered_ids: Vec::with_capacity(flat.len()),
        rows_by_id: HashMap::with_capacity(flat.len()),
        visible_ids: Vec::new(),
    };

    for entry in flat {
        let row = ctx.resolve_row(&entry.node);
        if entry.is_visible && row.visible {
            projection.visible_ids.push(entry.id.clone());
        }
        projection.ordered_ids.push(entry.id.clone());
        projection.rows_by_id.insert(entry.id.clone(), row);
    }

    projection
}

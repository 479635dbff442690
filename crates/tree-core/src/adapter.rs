//! Data-source capability interface.
//!
//! A [`TreeAdapter`] tells the engine how to identify, label and classify host data. Only
//! identity, conversion and labels are required; every other capability has a default that
//! reproduces the engine's built-in behaviour, so an adapter overrides exactly what it knows
//! about its domain.
//!
//! The engine never performs I/O through the adapter. [`TreeAdapter::loads_children`] only
//! declares that the host *can* load children; the host performs the load and reports back through
//! [`TreeEngine`](crate::TreeEngine) commands.

use crate::filter::{FilterQuery, HighlightRange};
use crate::id::NodeId;
use crate::navigation::PathStep;
use crate::paging::PaginationConfig;
use crate::state::Node;

/// Structural facts passed to [`TreeAdapter::is_leaf`].
#[derive(Debug, Clone, Copy)]
pub struct LeafContext<'a> {
    /// Node id.
    pub id: &'a NodeId,
    /// Depth of the node.
    pub level: usize,
    /// Loaded child ids, `None` if never loaded.
    pub children_ids: Option<&'a [NodeId]>,
}

/// Host data capabilities.
pub trait TreeAdapter {
    /// Raw items handed to `init` and the children commands.
    type Source;
    /// Per-node data kept in the graph.
    type Data;

    /// Stable id of a source item.
    fn id(&self, source: &Self::Source) -> NodeId;

    /// Convert a source item into node data.
    fn to_data(&self, source: Self::Source) -> Self::Data;

    /// Display label.
    fn label(&self, data: &Self::Data) -> String;

    /// Post-process converted data.
    fn transform(&self, data: Self::Data) -> Self::Data {
        data
    }

    /// Row icon. Falls back to the configured default icon.
    fn icon(&self, _data: &Self::Data) -> Option<String> {
        None
    }

    /// Disabled nodes are shown but never selectable.
    fn is_disabled(&self, _data: &Self::Data) -> bool {
        false
    }

    /// Eligibility gate. Nodes failing it are hidden together with their subtrees.
    fn is_visible(&self, _data: &Self::Data) -> bool {
        true
    }

    /// Domain-specific match rule. `None` selects the default text matching.
    fn matches(&self, _data: &Self::Data, _query: &FilterQuery) -> Option<bool> {
        None
    }

    /// Text used by the default matcher. `None` falls back to the label.
    fn search_text(&self, _data: &Self::Data) -> Option<String> {
        None
    }

    /// Highlight ranges of a matching label. `None` selects the default highlighting.
    fn highlight_ranges(&self, _label: &str, _query: &FilterQuery) -> Option<Vec<HighlightRange>> {
        None
    }

    /// Leaf-ness override, consulted before any structural rule.
    fn is_leaf(&self, _data: &Self::Data, _ctx: &LeafContext<'_>) -> Option<bool> {
        None
    }

    /// Whether the node is known to have children before they are loaded.
    fn has_children(&self, _data: &Self::Data) -> Option<bool> {
        None
    }

    /// Eagerly available children of a source item.
    fn children(&self, _source: &Self::Source) -> Option<Vec<Self::Source>> {
        None
    }

    /// Pagination for the children of `node`.
    fn pagination(&self, _node: &Node<Self::Data>) -> Option<PaginationConfig> {
        None
    }

    /// Whether the host can lazily load children. Nodes without loaded children are then
    /// treated as expandable.
    fn loads_children(&self) -> bool {
        false
    }

    /// Root-to-target path used to reveal a node that is not loaded yet.
    fn resolve_path_to_node(&self, _target: &NodeId) -> Option<Vec<PathStep>> {
        None
    }
}

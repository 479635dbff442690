//! Filter visibility.
//!
//! Computes, for the whole node graph, which nodes directly match the active filter and which
//! stay visible as ancestors of matches. The projection intersects this with the current
//! flattening, so ancestors outside the flattened rows never surface on their own.

use crate::adapter::TreeAdapter;
use crate::config::{FilterMode, FilteringConfig, SelectionPolicy};
use crate::filter::{CompiledQuery, FilterQuery, HighlightRange};
use crate::id::NodeId;
use crate::selection::retain_selected;
use crate::state::{Node, NodeMap, TreeState, cow};
use std::collections::HashSet;

/// A normalized query with its compiled matcher and cache fingerprint.
#[derive(Debug)]
pub struct ActiveFilter {
    query: FilterQuery,
    compiled: CompiledQuery,
    fingerprint: String,
}

impl ActiveFilter {
    /// Prepare `query` for matching.
    pub fn new(query: FilterQuery) -> Self {
        let compiled = CompiledQuery::new(&query);
        let fingerprint = query.fingerprint();
        Self {
            query,
            compiled,
            fingerprint,
        }
    }

    /// The normalized query.
    pub fn query(&self) -> &FilterQuery {
        &self.query
    }

    /// Serialized query.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Match `data` with adapter precedence: `matches`, then default text matching over
    /// `search_text` (or the label).
    pub fn matches<A: TreeAdapter>(&self, adapter: &A, data: &A::Data) -> bool {
        if let Some(matched) = adapter.matches(data, &self.query) {
            return matched;
        }
        let text = adapter
            .search_text(data)
            .unwrap_or_else(|| adapter.label(data));
        self.compiled.matches_text(&text)
    }

    /// Highlight ranges for a matching label with adapter precedence.
    pub fn highlight_ranges<A: TreeAdapter>(
        &self,
        adapter: &A,
        label: &str,
    ) -> Option<Vec<HighlightRange>> {
        adapter
            .highlight_ranges(label, &self.query)
            .or_else(|| self.compiled.highlight_ranges(label))
    }
}

/// Passes the adapter's eligibility gate. Placeholders carry no data and are always eligible.
pub fn is_eligible<A: TreeAdapter>(adapter: &A, node: &Node<A::Data>) -> bool {
    node.data.as_deref().is_none_or(|data| adapter.is_visible(data))
}

/// Visibility of every node under one filter.
#[derive(Debug, Default)]
pub struct Visibility {
    client_filtering: bool,
    direct_matches: HashSet<NodeId>,
    visible: HashSet<NodeId>,
}

impl Visibility {
    /// Returns `true` when a query is active and matched by the engine.
    pub fn is_client_filtering(&self) -> bool {
        self.client_filtering
    }

    /// Returns `true` for direct matches.
    pub fn is_direct_match(&self, id: &NodeId) -> bool {
        self.direct_matches.contains(id)
    }

    /// Returns `true` if the node is visible under the filter.
    pub fn is_visible(&self, id: &NodeId) -> bool {
        self.visible.contains(id)
    }

    /// Direct matches.
    pub fn direct_matches(&self) -> &HashSet<NodeId> {
        &self.direct_matches
    }

    /// Visible nodes.
    pub fn visible(&self) -> &HashSet<NodeId> {
        &self.visible
    }
}

/// Compute visibility over `nodes`.
///
/// - Without a query, or in server mode, every eligible node is visible (and, in server mode,
///   counts as a direct match).
/// - With a client query, direct matches are eligible non-placeholder nodes passing the matcher;
///   with `show_parents_of_matches` their eligible ancestors stay visible too; placeholders are
///   visible only with `keep_placeholders_visible` and a visible parent.
pub fn compute_visibility<A: TreeAdapter>(
    adapter: &A,
    nodes: &NodeMap<A::Data>,
    filter: Option<&ActiveFilter>,
    config: &FilteringConfig,
) -> Visibility {
    let eligible = |node: &Node<A::Data>| is_eligible(adapter, node);

    let Some(filter) = filter else {
        return Visibility {
            client_filtering: false,
            direct_matches: HashSet::new(),
            visible: nodes
                .values()
                .filter(|node| eligible(node))
                .map(|node| node.id.clone())
                .collect(),
        };
    };

    if config.mode == FilterMode::Server {
        let visible: HashSet<NodeId> = nodes
            .values()
            .filter(|node| eligible(node))
            .map(|node| node.id.clone())
            .collect();
        let direct_matches = visible
            .iter()
            .filter(|id| !id.is_placeholder())
            .cloned()
            .collect();
        return Visibility {
            client_filtering: false,
            direct_matches,
            visible,
        };
    }

    let direct_matches: HashSet<NodeId> = nodes
        .values()
        .filter(|node| !node.placeholder && eligible(node))
        .filter(|node| {
            node.data
                .as_deref()
                .is_some_and(|data| filter.matches(adapter, data))
        })
        .map(|node| node.id.clone())
        .collect();

    let mut visible = direct_matches.clone();
    if config.show_parents_of_matches {
        let mut walked: HashSet<&NodeId> = HashSet::new();
        for id in &direct_matches {
            let mut current = nodes.get(id).and_then(|node| node.parent_id.as_ref());
            while let Some(parent_id) = current {
                if !walked.insert(parent_id) {
                    break;
                }
                let Some(parent) = nodes.get(parent_id) else {
                    break;
                };
                if eligible(parent) {
                    visible.insert(parent_id.clone());
                }
                current = parent.parent_id.as_ref();
            }
        }
    }

    if config.keep_placeholders_visible {
        let placeholders: Vec<NodeId> = nodes
            .values()
            .filter(|node| node.placeholder)
            .filter(|node| {
                node.parent_id
                    .as_ref()
                    .is_some_and(|parent| visible.contains(parent))
            })
            .map(|node| node.id.clone())
            .collect();
        visible.extend(placeholders);
    }

    Visibility {
        client_filtering: true,
        direct_matches,
        visible,
    }
}

/// Outcome of [`apply_filter_policies`].
#[derive(Debug)]
pub struct PolicyOutcome<T> {
    /// Successor state.
    pub state: TreeState<T>,
    /// `true` if a policy changed the state.
    pub mutated: bool,
}

/// Apply the `auto_expand_matches` and `selection_policy` side effects of a client filter.
///
/// Server mode applies neither: it has no engine-side matches to act on.
pub fn apply_filter_policies<T>(
    state: &TreeState<T>,
    visibility: &Visibility,
    config: &FilteringConfig,
) -> PolicyOutcome<T> {
    let mut next = state.clone();
    if !visibility.is_client_filtering() {
        return PolicyOutcome {
            state: next,
            mutated: false,
        };
    }

    if config.auto_expand_matches {
        let mut to_expand: HashSet<NodeId> = HashSet::new();
        for id in visibility.direct_matches() {
            let mut current = next.node(id).and_then(|node| node.parent_id.clone());
            while let Some(parent_id) = current {
                if to_expand.contains(&parent_id) {
                    break;
                }
                let parent = next.node(&parent_id).and_then(|node| node.parent_id.clone());
                if !next.is_expanded(&parent_id) {
                    to_expand.insert(parent_id.clone());
                }
                current = parent;
            }
        }
        if !to_expand.is_empty() {
            log::debug!("filter expands {} ancestors of matches", to_expand.len());
            next = next.with_expanded(cow(&next.expanded, |set| set.extend(to_expand)));
        }
    }

    if config.selection_policy == SelectionPolicy::ClearHidden {
        next = retain_selected(&next, |id| visibility.is_visible(id));
    }

    let mutated = !next.same_handles(state);
    PolicyOutcome {
        state: next,
        mutated,
    }
}

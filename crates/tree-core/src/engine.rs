//! Engine facade.
//!
//! [`TreeEngine`] owns the tree state, the per-parent pagination bookkeeping, the configuration
//! and the active filter, and exposes every transition as a command method. Read views go through
//! a projection cache keyed on the identity of every state handle plus fingerprints of everything
//! else a row depends on, so repeated reads between commands return the same `Arc`.
//!
//! # Architecture Notes
//!
//! The engine follows a "unidirectional data flow" pattern:
//!
//! 1. The host issues commands (directly or via [`execute`](TreeEngine::execute)).
//! 2. Commands replace state handles copy-on-write and bump the version number.
//! 3. Subscribers are notified with a [`TreeChange`].
//! 4. The host reads rows through [`get_visible_rows`](TreeEngine::get_visible_rows) and friends.
//!
//! Commands that require I/O only *report* it: [`toggle_expand`](TreeEngine::toggle_expand)
//! returns `true` when children must be loaded, [`ensure_range_loaded`](TreeEngine::ensure_range_loaded)
//! returns the pages to request. The host performs the loads and reports back with
//! [`set_children_loaded`](TreeEngine::set_children_loaded),
//! [`apply_paged_children`](TreeEngine::apply_paged_children) or the error commands.

use crate::adapter::{LeafContext, TreeAdapter};
use crate::config::EngineConfig;
use crate::error::{LoadError, TreeError, TreeResult};
use crate::expansion::{self, clear_children_state};
use crate::filter::{FilterInput, FilterQuery, normalize_filter_query};
use crate::flatten::FlattenCache;
use crate::id::NodeId;
use crate::index::descendants;
use crate::navigation::{RevealPlan, plan_reveal};
use crate::paging::{
    self, PageRequest, PageResult, PagedNodeDebugState, PagedNodeState, PaginationConfig,
    PagingMap, RowRange, sync_parent_flags,
};
use crate::projection::{Projection, RowContext, RowViewModel, build_projection};
use crate::selection::{self, HierarchicalSelection, SelectionMode, calculate_hierarchical_selection};
use crate::state::{Node, NodeMap, TreeState, cow};
use crate::visibility::{self, ActiveFilter, Visibility, compute_visibility, is_eligible};
use indexmap::IndexSet;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Kind of change reported to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeChangeType {
    /// Nodes were ingested, replaced or removed.
    StructureChanged,
    /// Expanded set changed.
    ExpansionChanged,
    /// Selection changed.
    SelectionChanged,
    /// Pagination bookkeeping changed.
    PagingChanged,
    /// Loading or error flags changed.
    StatusChanged,
    /// Active filter changed.
    FilterChanged,
    /// Configuration or adapter changed.
    ConfigChanged,
}

/// State change record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeChange {
    /// Change type.
    pub change_type: TreeChangeType,
    /// Old version number.
    pub old_version: u64,
    /// New version number.
    pub new_version: u64,
}

/// State change callback function type.
pub type TreeChangeCallback = Box<dyn FnMut(&TreeChange) + Send>;

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeStats {
    /// Nodes in the graph (placeholders included).
    pub node_count: usize,
    /// Placeholder nodes.
    pub placeholder_count: usize,
    /// Expanded nodes.
    pub expanded_count: usize,
    /// Selected nodes.
    pub selected_count: usize,
    /// Nodes with a load in flight.
    pub loading_count: usize,
    /// Nodes with a recorded error.
    pub error_count: usize,
    /// Rows in the current visible projection.
    pub visible_row_count: usize,
    /// Parents with pagination configured.
    pub paged_parent_count: usize,
    /// Pagination bookkeeping version.
    pub paging_version: u64,
    /// Engine state version.
    pub state_version: u64,
    /// Projection rebuilds so far.
    pub projection_builds: u64,
    /// Flattening cache hits.
    pub flatten_cache_hits: u64,
    /// Flattening cache misses.
    pub flatten_cache_misses: u64,
}

struct ProjectionKey<T> {
    nodes: Arc<NodeMap<T>>,
    expanded: Arc<HashSet<NodeId>>,
    selected: Arc<IndexSet<NodeId>>,
    loading: Arc<HashSet<NodeId>>,
    errors: Arc<HashMap<NodeId, LoadError>>,
    adapter_epoch: u64,
    filter_fingerprint: Option<String>,
    config_fingerprint: String,
    paging_version: u64,
}

impl<T> ProjectionKey<T> {
    fn matches(
        &self,
        state: &TreeState<T>,
        adapter_epoch: u64,
        filter_fingerprint: Option<&str>,
        config_fingerprint: &str,
        paging_version: u64,
    ) -> bool {
        Arc::ptr_eq(&self.nodes, &state.nodes)
            && Arc::ptr_eq(&self.expanded, &state.expanded)
            && Arc::ptr_eq(&self.selected, &state.selected)
            && Arc::ptr_eq(&self.loading, &state.loading)
            && Arc::ptr_eq(&self.errors, &state.errors)
            && self.adapter_epoch == adapter_epoch
            && self.filter_fingerprint.as_deref() == filter_fingerprint
            && self.config_fingerprint == config_fingerprint
            && self.paging_version == paging_version
    }
}

struct CachedProjection<T> {
    key: ProjectionKey<T>,
    projection: Arc<Projection<T>>,
    visibility: Arc<Visibility>,
    tri_state: Option<Arc<HierarchicalSelection>>,
}

struct Ingested<T> {
    ids: Vec<NodeId>,
    nodes: Vec<Node<T>>,
    pagination: Vec<(NodeId, PaginationConfig)>,
}

/// Convert `sources` (and their eager children) into nodes placed under `parent` at `level`.
fn ingest<A: TreeAdapter>(
    adapter: &A,
    sources: Vec<A::Source>,
    parent: Option<&NodeId>,
    level: usize,
) -> TreeResult<Ingested<A::Data>> {
    let mut out = Ingested {
        ids: sources.iter().map(|source| adapter.id(source)).collect(),
        nodes: Vec::with_capacity(sources.len()),
        pagination: Vec::new(),
    };
    let mut seen: HashSet<NodeId> = HashSet::with_capacity(sources.len());
    let mut stack: Vec<(A::Source, Option<NodeId>, usize)> = sources
        .into_iter()
        .rev()
        .map(|source| (source, parent.cloned(), level))
        .collect();

    while let Some((source, parent_id, level)) = stack.pop() {
        let id = adapter.id(&source);
        if !seen.insert(id.clone()) {
            log::warn!("duplicate node id {id} during ingestion");
            return Err(TreeError::DuplicateNode(id));
        }

        let children = adapter.children(&source);
        let data = adapter.transform(adapter.to_data(source));
        let disabled = adapter.is_disabled(&data);
        let mut node = Node::new(id.clone(), parent_id, level, data).with_disabled(disabled);

        if let Some(children) = children {
            node.children_ids = Some(children.iter().map(|child| adapter.id(child)).collect());
            stack.extend(
                children
                    .into_iter()
                    .rev()
                    .map(|child| (child, Some(id.clone()), level + 1)),
            );
        }
        if let Some(config) = adapter.pagination(&node) {
            out.pagination.push((id, config));
        }
        out.nodes.push(node);
    }

    Ok(out)
}

fn paged_entry<'a>(
    paging: &'a mut PagingMap,
    parent_id: &NodeId,
) -> TreeResult<&'a mut PagedNodeState> {
    paging.get_mut(parent_id).ok_or_else(|| {
        log::warn!("paging command for {parent_id}, which has no pagination configured");
        TreeError::NotPaginated(parent_id.clone())
    })
}

/// Configure pagination for freshly ingested nodes, priming placeholders where the total count is
/// known up front.
fn install_pagination<T>(
    mut state: TreeState<T>,
    paging: &mut PagingMap,
    entries: Vec<(NodeId, PaginationConfig)>,
) -> TreeResult<TreeState<T>> {
    for (parent_id, config) in entries {
        let mut paged = PagedNodeState::new(&config)?;
        if let Some(total) = config.initial_total_count {
            state = paging::prime_paged_placeholders(&state, &mut paged, &parent_id, total)?;
        }
        log::debug!("pagination configured for {parent_id} (page size {})", config.page_size);
        paging.insert(parent_id, paged);
    }
    Ok(state)
}

fn expand_ids<T>(state: &TreeState<T>, ids: &[NodeId]) -> TreeState<T> {
    if ids.iter().all(|id| state.is_expanded(id)) {
        return state.clone();
    }
    state.with_expanded(cow(&state.expanded, |set| set.extend(ids.iter().cloned())))
}

/// Tree state engine for virtualized, lazily loaded hierarchical lists.
///
/// # Example
///
/// ```rust
/// use tree_core::{NodeId, TreeAdapter, TreeEngine};
///
/// struct Names;
///
/// impl TreeAdapter for Names {
///     type Source = (&'static str, Vec<&'static str>);
///     type Data = &'static str;
///
///     fn id(&self, source: &Self::Source) -> NodeId {
///         NodeId::key(source.0)
///     }
///     fn to_data(&self, source: Self::Source) -> Self::Data {
///         source.0
///     }
///     fn label(&self, data: &Self::Data) -> String {
///         data.to_string()
///     }
///     fn children(&self, source: &Self::Source) -> Option<Vec<Self::Source>> {
///         Some(source.1.iter().map(|name| (*name, Vec::new())).collect())
///     }
/// }
///
/// let mut engine = TreeEngine::new(Names);
/// engine.init(vec![("src", vec!["lib.rs", "main.rs"])]).unwrap();
/// engine.toggle_expand(&NodeId::key("src"));
///
/// let labels: Vec<String> = engine.get_visible_rows().into_iter().map(|row| row.label).collect();
/// assert_eq!(labels, ["src", "lib.rs", "main.rs"]);
/// ```
pub struct TreeEngine<A: TreeAdapter> {
    adapter: A,
    adapter_epoch: u64,
    state: TreeState<A::Data>,
    paging: PagingMap,
    paging_version: u64,
    config: EngineConfig,
    config_fingerprint: String,
    filter: Option<ActiveFilter>,
    flatten_cache: FlattenCache<A::Data>,
    projection_cache: Option<CachedProjection<A::Data>>,
    projection_builds: u64,
    state_version: u64,
    callbacks: Vec<TreeChangeCallback>,
}

impl<A: TreeAdapter> TreeEngine<A> {
    /// Create an empty engine with the default configuration.
    pub fn new(adapter: A) -> Self {
        Self::with_config(adapter, EngineConfig::default())
    }

    /// Create an empty engine.
    pub fn with_config(adapter: A, config: EngineConfig) -> Self {
        Self {
            adapter,
            adapter_epoch: 0,
            state: TreeState::new(),
            paging: PagingMap::new(),
            paging_version: 0,
            config_fingerprint: config.fingerprint(),
            config,
            filter: None,
            flatten_cache: FlattenCache::new(),
            projection_cache: None,
            projection_builds: 0,
            state_version: 0,
            callbacks: Vec::new(),
        }
    }

    /// The adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Mutable adapter access. Invalidates every cached view, since the adapter's rules may change.
    pub fn adapter_mut(&mut self) -> &mut A {
        self.adapter_epoch += 1;
        self.mark_changed(TreeChangeType::ConfigChanged);
        &mut self.adapter
    }

    /// Replace the adapter, keeping the loaded state.
    pub fn set_adapter(&mut self, adapter: A) {
        self.adapter = adapter;
        self.adapter_epoch += 1;
        self.mark_changed(TreeChangeType::ConfigChanged);
    }

    /// Current state snapshot.
    pub fn state(&self) -> &TreeState<A::Data> {
        &self.state
    }

    /// Current configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Active filter query.
    pub fn filter(&self) -> Option<&FilterQuery> {
        self.filter.as_ref().map(ActiveFilter::query)
    }

    /// Pagination bookkeeping of `parent_id`.
    pub fn paged_state(&self, parent_id: &NodeId) -> Option<&PagedNodeState> {
        self.paging.get(parent_id)
    }

    /// Current version number.
    pub fn version(&self) -> u64 {
        self.state_version
    }

    /// Check if state has changed since a version.
    pub fn has_changed_since(&self, version: u64) -> bool {
        self.state_version > version
    }

    /// Subscribe to state change notifications.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&TreeChange) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    fn mark_changed(&mut self, change_type: TreeChangeType) {
        let old_version = self.state_version;
        self.state_version += 1;
        let change = TreeChange {
            change_type,
            old_version,
            new_version: self.state_version,
        };
        for callback in &mut self.callbacks {
            callback(&change);
        }
    }

    /// Install `next` if any handle changed.
    fn commit(&mut self, next: TreeState<A::Data>, change_type: TreeChangeType) -> bool {
        if next.same_handles(&self.state) {
            return false;
        }
        self.state = next;
        self.mark_changed(change_type);
        true
    }

    /// Install `next` after a paging mutation. Always bumps the paging version.
    fn commit_paging(&mut self, next: TreeState<A::Data>) {
        self.paging_version += 1;
        self.state = next;
        self.mark_changed(TreeChangeType::PagingChanged);
    }

    fn require_parent(&self, parent_id: &NodeId) -> TreeResult<&Arc<Node<A::Data>>> {
        let parent = self.state.node(parent_id).ok_or_else(|| {
            log::warn!("command addressed unknown node {parent_id}");
            TreeError::UnknownNode(parent_id.clone())
        })?;
        if parent.placeholder {
            log::warn!("command used placeholder {parent_id} as a parent");
            return Err(TreeError::PlaceholderParent(parent_id.clone()));
        }
        Ok(parent)
    }

    /// Reject loaded nodes whose id already belongs to a node under another parent.
    fn check_collisions(&self, nodes: &[Node<A::Data>]) -> TreeResult<()> {
        for node in nodes {
            if let Some(existing) = self.state.node(&node.id) {
                if existing.parent_id != node.parent_id {
                    log::warn!("loaded node {} already exists under another parent", node.id);
                    return Err(TreeError::DuplicateNode(node.id.clone()));
                }
            }
        }
        Ok(())
    }

    // ----- lifecycle -----

    /// Replace the whole graph with `roots` (and their eager children).
    ///
    /// The configuration and the active filter are kept.
    pub fn init(&mut self, roots: Vec<A::Source>) -> TreeResult<()> {
        let ingested = ingest(&self.adapter, roots, None, 0)?;
        let nodes: NodeMap<A::Data> = ingested
            .nodes
            .into_iter()
            .map(|node| (node.id.clone(), Arc::new(node)))
            .collect();
        let node_count = nodes.len();

        let mut paging = PagingMap::new();
        let state = install_pagination(TreeState::from_nodes(nodes), &mut paging, ingested.pagination)?;

        log::debug!(
            "init: {} roots, {node_count} nodes, {} paginated parents",
            ingested.ids.len(),
            paging.len()
        );
        self.state = state;
        self.paging = paging;
        self.paging_version += 1;
        self.flatten_cache.clear();
        self.projection_cache = None;
        self.mark_changed(TreeChangeType::StructureChanged);
        Ok(())
    }

    /// Apply a new configuration.
    ///
    /// Switching to selection mode `none` clears the selection; switching to `single` with more
    /// than one node selected clears it too.
    pub fn configure(&mut self, config: EngineConfig) {
        let fingerprint = config.fingerprint();
        if fingerprint == self.config_fingerprint {
            return;
        }
        let next = match config.selection.mode {
            SelectionMode::None => selection::select_none(&self.state),
            SelectionMode::Single if self.state.selected.len() > 1 => {
                selection::select_none(&self.state)
            }
            _ => self.state.clone(),
        };
        self.config = config;
        self.config_fingerprint = fingerprint;
        self.commit(next, TreeChangeType::SelectionChanged);
        self.mark_changed(TreeChangeType::ConfigChanged);
    }

    // ----- structure -----

    /// Toggle the expansion of `node_id`.
    ///
    /// Returns `true` when the caller must now load the node's children. Absent nodes, leaves and
    /// placeholders are silent no-ops.
    pub fn toggle_expand(&mut self, node_id: &NodeId) -> bool {
        let adapter_leaf = self.state.node(node_id).and_then(|node| {
            let data = node.data.as_deref()?;
            self.adapter.is_leaf(
                data,
                &LeafContext {
                    id: &node.id,
                    level: node.level,
                    children_ids: node.children_ids.as_deref(),
                },
            )
        });
        if adapter_leaf == Some(true) {
            return false;
        }

        let result =
            expansion::toggle_expand(&self.state, node_id, self.adapter.loads_children());
        if result.should_load_children {
            log::debug!("expanding {node_id} requires loading its children");
        }
        self.commit(result.next_state, TreeChangeType::ExpansionChanged);
        result.should_load_children
    }

    /// Commit the loaded children of a parent.
    ///
    /// Replaces the child list, purging the subtrees of children that are gone and keeping the
    /// subtrees of children that survive. A paginated parent loses its pagination: the list is
    /// now complete.
    pub fn set_children_loaded(
        &mut self,
        parent_id: &NodeId,
        children: Vec<A::Source>,
    ) -> TreeResult<()> {
        let level = self.require_parent(parent_id)?.level + 1;
        let mut ingested = ingest(&self.adapter, children, Some(parent_id), level)?;
        self.check_collisions(&ingested.nodes)?;
        ingested
            .pagination
            .retain(|(id, _)| !self.paging.contains_key(id));

        let mut paging_changed = !ingested.pagination.is_empty();
        let mut state = self.state.clone();
        if self.paging.remove(parent_id).is_some() {
            log::debug!("{parent_id} received a complete child list; pagination dropped");
            state = paging::remove_placeholders(&state, parent_id);
            paging_changed = true;
        }

        log::debug!("{parent_id}: {} children loaded", ingested.ids.len());
        state = expansion::set_children_loaded(&state, parent_id, ingested.ids, ingested.nodes)?;

        let before = self.paging.len();
        self.paging.retain(|id, _| state.nodes.contains_key(id));
        paging_changed |= self.paging.len() != before;
        state = install_pagination(state, &mut self.paging, ingested.pagination)?;
        state = selection::inherit_parent_selection(&state, parent_id, self.config.selection);

        if paging_changed {
            self.commit_paging(state);
        } else {
            self.commit(state, TreeChangeType::StructureChanged);
        }
        Ok(())
    }

    /// Drop every descendant of `parent_id` before a forced reload.
    ///
    /// Descendant pagination is deleted; the parent's own pagination keeps its configuration but
    /// forgets every page.
    pub fn clear_children(&mut self, parent_id: &NodeId) -> TreeResult<()> {
        self.require_parent(parent_id)?;
        let removed = descendants(&self.state.nodes, parent_id);
        let mut next = clear_children_state(&self.state, parent_id, &removed);

        let before = self.paging.len();
        let removed_set: HashSet<&NodeId> = removed.iter().collect();
        self.paging.retain(|id, _| !removed_set.contains(id));
        let mut paging_changed = self.paging.len() != before;
        if let Some(paged) = self.paging.get_mut(parent_id) {
            paged.reset();
            next = sync_parent_flags(&next, paged, parent_id);
            paging_changed = true;
        }

        log::debug!("{parent_id}: cleared {} descendants", removed.len());
        if paging_changed {
            self.commit_paging(next);
        } else {
            self.commit(next, TreeChangeType::StructureChanged);
        }
        Ok(())
    }

    /// Make `target` reachable: expand its loaded ancestors, or report the next load needed.
    ///
    /// When the target is not connected to a root, the adapter's
    /// [`resolve_path_to_node`](TreeAdapter::resolve_path_to_node) supplies the path. For
    /// [`RevealPlan::NeedsChildren`] the parent is expanded and marked loading; for
    /// [`RevealPlan::NeedsPage`] the parent is expanded and the page marked in flight.
    pub fn expand_path(&mut self, target: &NodeId) -> RevealPlan {
        let mut plan = plan_reveal(&self.state.nodes, &self.paging, target, None);
        if plan == RevealPlan::Unreachable {
            let steps = self.adapter.resolve_path_to_node(target);
            plan = plan_reveal(&self.state.nodes, &self.paging, target, steps.as_deref());
        }

        match &plan {
            RevealPlan::Ready => {
                let next = expansion::expand_ancestor_path(&self.state, target);
                self.commit(next, TreeChangeType::ExpansionChanged);
            }
            RevealPlan::NeedsChildren { parent } => {
                log::debug!("revealing {target} requires the children of {parent}");
                let next = expansion::expand_ancestor_path(&self.state, parent);
                let next = expand_ids(&next, std::slice::from_ref(parent))
                    .with_loading_flag(parent, true);
                self.commit(next, TreeChangeType::ExpansionChanged);
            }
            RevealPlan::NeedsPage { parent, page_index } => {
                log::debug!("revealing {target} requires page {page_index} of {parent}");
                let next = expansion::expand_ancestor_path(&self.state, parent);
                let next = expand_ids(&next, std::slice::from_ref(parent));
                let marked = match self.paging.get_mut(parent) {
                    Some(paged) if !paged.in_flight_pages.contains(page_index) => {
                        paged.mark_page_in_flight(*page_index);
                        Some(sync_parent_flags(&next, paged, parent))
                    }
                    _ => None,
                };
                match marked {
                    Some(next) => self.commit_paging(next),
                    None => {
                        self.commit(next, TreeChangeType::ExpansionChanged);
                    }
                }
            }
            RevealPlan::Unreachable => {
                log::debug!("{target} is unreachable");
            }
        }
        plan
    }

    // ----- pagination -----

    /// Enable (`Some`) or disable (`None`) pagination of `parent_id`'s children.
    ///
    /// Enabling replaces any previous bookkeeping and primes placeholders when
    /// `initial_total_count` is set. Disabling drops the bookkeeping and the placeholders.
    pub fn set_pagination(
        &mut self,
        parent_id: &NodeId,
        config: Option<PaginationConfig>,
    ) -> TreeResult<()> {
        self.require_parent(parent_id)?;
        match config {
            Some(config) => {
                let mut paged = PagedNodeState::new(&config)?;
                let mut next = self.state.clone();
                if self.paging.remove(parent_id).is_some() {
                    next = paging::remove_placeholders(&next, parent_id);
                }
                if let Some(total) = config.initial_total_count {
                    next = paging::prime_paged_placeholders(&next, &mut paged, parent_id, total)?;
                }
                log::debug!("pagination configured for {parent_id} (page size {})", config.page_size);
                let next = sync_parent_flags(&next, &paged, parent_id);
                self.paging.insert(parent_id.clone(), paged);
                self.commit_paging(next);
            }
            None => {
                if self.paging.remove(parent_id).is_none() {
                    return Ok(());
                }
                log::debug!("pagination disabled for {parent_id}");
                let next = paging::remove_placeholders(&self.state, parent_id)
                    .with_loading_flag(parent_id, false)
                    .with_error_entry(parent_id, None);
                self.commit_paging(next);
            }
        }
        Ok(())
    }

    /// Seed `parent_id` with `total_count` placeholder slots.
    pub fn prime_paged_placeholders(
        &mut self,
        parent_id: &NodeId,
        total_count: usize,
    ) -> TreeResult<()> {
        let paged = paged_entry(&mut self.paging, parent_id)?;
        let next = paging::prime_paged_placeholders(&self.state, paged, parent_id, total_count)?;
        self.commit_paging(next);
        Ok(())
    }

    /// Pages of `range` (child rows of `parent_id`) that must be requested.
    ///
    /// Returned pages are marked in flight, so a repeated call returns only pages that were not
    /// returned before.
    pub fn ensure_range_loaded(
        &mut self,
        parent_id: &NodeId,
        range: impl Into<RowRange>,
    ) -> TreeResult<Vec<usize>> {
        let range = range.into();
        let paged = paged_entry(&mut self.paging, parent_id)?;
        let pages = paged.ensure_range_loaded(range);
        if pages.is_empty() {
            return Ok(pages);
        }
        log::debug!(
            "{parent_id}: rows {}..={} need pages {pages:?}",
            range.start,
            range.end
        );
        let next = sync_parent_flags(&self.state, paged, parent_id);
        self.commit_paging(next);
        Ok(pages)
    }

    /// Request descriptor for a page of `parent_id`.
    pub fn page_request(&self, parent_id: &NodeId, page_index: usize) -> TreeResult<PageRequest> {
        self.paging
            .get(parent_id)
            .ok_or_else(|| TreeError::NotPaginated(parent_id.clone()))?
            .request_for(page_index)
    }

    /// Mark a page in flight. Returns `false` if it already was.
    pub fn mark_page_in_flight(&mut self, parent_id: &NodeId, page_index: usize) -> TreeResult<bool> {
        let paged = paged_entry(&mut self.paging, parent_id)?;
        if !paged.mark_page_in_flight(page_index) {
            return Ok(false);
        }
        let next = sync_parent_flags(&self.state, paged, parent_id);
        self.commit_paging(next);
        Ok(true)
    }

    /// Commit a page result.
    pub fn apply_paged_children(
        &mut self,
        parent_id: &NodeId,
        request: PageRequest,
        result: PageResult<A::Source>,
    ) -> TreeResult<()> {
        let level = self.require_parent(parent_id)?.level + 1;
        let (items, total_count) = result.into_parts();
        let mut ingested = ingest(&self.adapter, items, Some(parent_id), level)?;
        self.check_collisions(&ingested.nodes)?;
        ingested
            .pagination
            .retain(|(id, _)| !self.paging.contains_key(id));
        log::debug!(
            "{parent_id}: page {} applied with {} children",
            request.page_index,
            ingested.ids.len()
        );

        let paged = paged_entry(&mut self.paging, parent_id)?;
        let state = paging::apply_paged_children(
            &self.state,
            paged,
            parent_id,
            &request,
            ingested.ids,
            ingested.nodes,
            total_count,
        )?;

        self.paging.retain(|id, _| state.nodes.contains_key(id));
        ingested
            .pagination
            .retain(|(id, _)| state.nodes.contains_key(id));
        let state = install_pagination(state, &mut self.paging, ingested.pagination)?;
        let state = selection::inherit_parent_selection(&state, parent_id, self.config.selection);

        self.commit_paging(state);
        Ok(())
    }

    /// Clear the in-flight flag of a page (e.g. a cancelled request). Returns `false` if it was
    /// not set.
    pub fn clear_page_in_flight(&mut self, parent_id: &NodeId, page_index: usize) -> TreeResult<bool> {
        let paged = paged_entry(&mut self.paging, parent_id)?;
        if !paged.clear_page_in_flight(page_index) {
            return Ok(false);
        }
        let next = sync_parent_flags(&self.state, paged, parent_id);
        self.commit_paging(next);
        Ok(true)
    }

    /// Record a failed page load.
    pub fn set_page_error(
        &mut self,
        parent_id: &NodeId,
        page_index: usize,
        error: impl Into<LoadError>,
    ) -> TreeResult<()> {
        let paged = paged_entry(&mut self.paging, parent_id)?;
        let error = error.into();
        log::debug!("{parent_id}: page {page_index} failed: {error}");
        paged.set_page_error(page_index, error);
        let next = sync_parent_flags(&self.state, paged, parent_id);
        self.commit_paging(next);
        Ok(())
    }

    /// Clear a page failure. Returns `false` if there was none.
    pub fn clear_page_error(&mut self, parent_id: &NodeId, page_index: usize) -> TreeResult<bool> {
        let paged = paged_entry(&mut self.paging, parent_id)?;
        if !paged.clear_page_error(page_index) {
            return Ok(false);
        }
        let next = sync_parent_flags(&self.state, paged, parent_id);
        self.commit_paging(next);
        Ok(true)
    }

    // ----- selection -----

    /// Replace the selection with `node_id`.
    pub fn select_one(&mut self, node_id: &NodeId) -> bool {
        let next = selection::select_one(&self.state, node_id, self.config.selection);
        self.commit(next, TreeChangeType::SelectionChanged)
    }

    /// Toggle `node_id` according to the selection mode.
    pub fn select_toggle(&mut self, node_id: &NodeId) -> bool {
        let next = selection::select_toggle(&self.state, node_id, self.config.selection);
        self.commit(next, TreeChangeType::SelectionChanged)
    }

    /// Clear the selection.
    pub fn select_none(&mut self) -> bool {
        let next = selection::select_none(&self.state);
        self.commit(next, TreeChangeType::SelectionChanged)
    }

    /// Select the visible rows between `from_id` and `to_id`, inclusive.
    pub fn select_range(&mut self, from_id: &NodeId, to_id: &NodeId) -> bool {
        let projection = self.projection();
        let next = selection::select_range(
            &self.state,
            &projection.visible_ids,
            from_id,
            to_id,
            self.config.selection,
        );
        self.commit(next, TreeChangeType::SelectionChanged)
    }

    /// Select `node_id` and its selectable descendants.
    pub fn select_branch(&mut self, node_id: &NodeId) -> bool {
        let next = selection::select_branch(&self.state, node_id, self.config.selection);
        self.commit(next, TreeChangeType::SelectionChanged)
    }

    // ----- loading and errors -----

    /// Record a failed children load. Clears the node's loading flag.
    pub fn set_node_error(&mut self, node_id: &NodeId, error: impl Into<LoadError>) -> bool {
        if !self.state.nodes.contains_key(node_id) {
            return false;
        }
        let error = error.into();
        log::debug!("{node_id}: load failed: {error}");
        let next = self
            .state
            .with_loading_flag(node_id, false)
            .with_error_entry(node_id, Some(error));
        self.commit(next, TreeChangeType::StatusChanged)
    }

    /// Clear a node's error.
    pub fn clear_node_error(&mut self, node_id: &NodeId) -> bool {
        let next = self.state.with_error_entry(node_id, None);
        self.commit(next, TreeChangeType::StatusChanged)
    }

    /// Clear a node's loading flag (e.g. a cancelled load).
    pub fn clear_loading(&mut self, node_id: &NodeId) -> bool {
        let next = self.state.with_loading_flag(node_id, false);
        self.commit(next, TreeChangeType::StatusChanged)
    }

    // ----- filtering -----

    /// Set the filter. Returns `false` if the normalized query is unchanged.
    ///
    /// Applies the configured filter policies when the query changes.
    pub fn set_filter(&mut self, input: impl Into<FilterInput>) -> bool {
        let query = normalize_filter_query(input);
        if query.as_ref() == self.filter() {
            return false;
        }
        log::debug!("filter set to {query:?}");
        self.filter = query.map(ActiveFilter::new);
        self.mark_changed(TreeChangeType::FilterChanged);
        self.apply_filter_policies();
        true
    }

    /// Remove the filter. Returns `false` if none was active.
    pub fn clear_filter(&mut self) -> bool {
        self.set_filter(FilterInput::None)
    }

    /// Re-run the filter policies, e.g. after more data loaded. Returns `true` if they changed
    /// the state.
    pub fn reapply_filter(&mut self) -> bool {
        self.apply_filter_policies()
    }

    fn apply_filter_policies(&mut self) -> bool {
        if self.filter.is_none() {
            return false;
        }
        let visibility = compute_visibility(
            &self.adapter,
            &self.state.nodes,
            self.filter.as_ref(),
            &self.config.filtering,
        );
        let outcome =
            visibility::apply_filter_policies(&self.state, &visibility, &self.config.filtering);
        if !outcome.mutated {
            return false;
        }
        let change_type = if Arc::ptr_eq(&outcome.state.expanded, &self.state.expanded) {
            TreeChangeType::SelectionChanged
        } else {
            TreeChangeType::ExpansionChanged
        };
        self.commit(outcome.state, change_type)
    }

    // ----- read views -----

    /// Current projection. Returns the same `Arc` until something a row depends on changes.
    pub fn projection(&mut self) -> Arc<Projection<A::Data>> {
        self.cached().projection.clone()
    }

    fn cached(&mut self) -> &CachedProjection<A::Data> {
        let cached = match self.projection_cache.take() {
            Some(cached)
                if cached.key.matches(
                    &self.state,
                    self.adapter_epoch,
                    self.filter.as_ref().map(ActiveFilter::fingerprint),
                    &self.config_fingerprint,
                    self.paging_version,
                ) =>
            {
                log::trace!("projection cache hit");
                cached
            }
            _ => self.rebuild_projection(),
        };
        self.projection_cache.insert(cached)
    }

    fn rebuild_projection(&mut self) -> CachedProjection<A::Data> {
        let adapter = &self.adapter;
        let flat = self.flatten_cache.get_or_compute(
            &self.state.nodes,
            &self.state.expanded,
            self.adapter_epoch,
            &|node| is_eligible(adapter, node),
        );
        let visibility = Arc::new(compute_visibility(
            adapter,
            &self.state.nodes,
            self.filter.as_ref(),
            &self.config.filtering,
        ));
        let tri_state = self.config.selection.is_hierarchical().then(|| {
            Arc::new(calculate_hierarchical_selection(
                &self.state.nodes,
                &self.state.selected,
            ))
        });

        let ctx = RowContext {
            adapter,
            state: &self.state,
            paging: &self.paging,
            config: &self.config,
            filter: self.filter.as_ref(),
            visibility: &visibility,
            tri_state: tri_state.as_deref(),
        };
        let projection = Arc::new(build_projection(&ctx, &flat));
        self.projection_builds += 1;
        log::trace!(
            "projection rebuilt: {} rows, {} visible",
            projection.ordered_ids.len(),
            projection.visible_ids.len()
        );

        CachedProjection {
            key: ProjectionKey {
                nodes: self.state.nodes.clone(),
                expanded: self.state.expanded.clone(),
                selected: self.state.selected.clone(),
                loading: self.state.loading.clone(),
                errors: self.state.errors.clone(),
                adapter_epoch: self.adapter_epoch,
                filter_fingerprint: self
                    .filter
                    .as_ref()
                    .map(|filter| filter.fingerprint().to_string()),
                config_fingerprint: self.config_fingerprint.clone(),
                paging_version: self.paging_version,
            },
            projection,
            visibility,
            tri_state,
        }
    }

    /// Visible rows in display order.
    pub fn get_visible_rows(&mut self) -> Vec<RowViewModel<A::Data>> {
        self.projection().visible_rows().cloned().collect()
    }

    /// Alias of [`get_visible_rows`](Self::get_visible_rows).
    pub fn get_filtered_flat_list(&mut self) -> Vec<RowViewModel<A::Data>> {
        self.get_visible_rows()
    }

    /// Rows for specific ids, in the given order (e.g. pinned shortcuts).
    ///
    /// Ids outside the current flattening are resolved on demand; unknown ids are skipped.
    pub fn get_row_view_models_by_id(&mut self, ids: &[NodeId]) -> Vec<RowViewModel<A::Data>> {
        self.cached();
        let Some(cached) = &self.projection_cache else {
            return Vec::new();
        };
        let ctx = RowContext {
            adapter: &self.adapter,
            state: &self.state,
            paging: &self.paging,
            config: &self.config,
            filter: self.filter.as_ref(),
            visibility: &cached.visibility,
            tri_state: cached.tri_state.as_deref(),
        };
        ids.iter()
            .filter_map(|id| match cached.projection.row(id) {
                Some(row) => Some(row.clone()),
                None => self.state.node(id).map(|node| ctx.resolve_row(node)),
            })
            .collect()
    }

    /// Diagnostic counters.
    pub fn stats(&mut self) -> TreeStats {
        let visible_row_count = self.projection().visible_len();
        TreeStats {
            node_count: self.state.nodes.len(),
            placeholder_count: self.state.nodes.values().filter(|node| node.placeholder).count(),
            expanded_count: self.state.expanded.len(),
            selected_count: self.state.selected.len(),
            loading_count: self.state.loading.len(),
            error_count: self.state.errors.len(),
            visible_row_count,
            paged_parent_count: self.paging.len(),
            paging_version: self.paging_version,
            state_version: self.state_version,
            projection_builds: self.projection_builds,
            flatten_cache_hits: self.flatten_cache.hits(),
            flatten_cache_misses: self.flatten_cache.misses(),
        }
    }

    /// Pagination snapshot of `parent_id`.
    pub fn get_paged_node_debug_state(&self, parent_id: &NodeId) -> Option<PagedNodeDebugState> {
        let paged = self.paging.get(parent_id)?;
        let slots = self
            .state
            .node(parent_id)
            .map(|node| node.children())
            .unwrap_or(&[]);
        Some(paged.debug_state(slots))
    }
}

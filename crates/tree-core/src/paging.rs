//! Per-parent pagination.
//!
//! A paginated parent owns a fixed-length slot array (its `children_ids`) whose entries are either
//! real child ids or deterministic placeholder ids. The bookkeeping of which pages are loaded, in
//! flight or failed lives in [`PagedNodeState`], outside the copy-on-write [`TreeState`]; the
//! facade bumps a paging version whenever it changes.
//!
//! Page indices are always zero-based internally. [`PageIndexing`] only affects the `page` number
//! handed to the host in a [`PageRequest`].

use crate::error::{LoadError, TreeError, TreeResult};
use crate::id::NodeId;
use crate::index::descendants;
use crate::state::{Node, NodeMap, TreeState, cow, upsert_node};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::ops::RangeInclusive;
use std::sync::Arc;

/// How page numbers are presented to the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageIndexing {
    /// The first page is `0`.
    #[default]
    ZeroBased,
    /// The first page is `1`.
    OneBased,
}

/// Pagination settings for one parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Children per page.
    pub page_size: usize,
    /// Page numbering used in [`PageRequest::page`].
    #[serde(default)]
    pub page_indexing: PageIndexing,
    /// Known child count, used to prime placeholders immediately.
    #[serde(default)]
    pub initial_total_count: Option<usize>,
}

impl PaginationConfig {
    /// Zero-based pagination with the given page size.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            page_indexing: PageIndexing::ZeroBased,
            initial_total_count: None,
        }
    }

    /// Builder: set the page numbering.
    pub fn with_indexing(mut self, page_indexing: PageIndexing) -> Self {
        self.page_indexing = page_indexing;
        self
    }

    /// Builder: set the initial total count.
    pub fn with_total_count(mut self, total_count: usize) -> Self {
        self.initial_total_count = Some(total_count);
        self
    }
}

/// A page request to forward to the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    /// Zero-based page index (engine-internal numbering).
    pub page_index: usize,
    /// Page number in the data source's numbering.
    pub page: usize,
    /// Children per page.
    pub page_size: usize,
    /// Offset of the first child of the page in the parent's slot array.
    pub offset: usize,
}

/// Inclusive row range within a parent's child list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    /// First row.
    pub start: usize,
    /// Last row (inclusive).
    pub end: usize,
}

impl RowRange {
    /// Create a range; the bounds may be given in either order.
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }
}

impl From<RangeInclusive<usize>> for RowRange {
    fn from(range: RangeInclusive<usize>) -> Self {
        Self::new(*range.start(), *range.end())
    }
}

/// A page result in the shapes data sources commonly return.
#[derive(Debug, Clone)]
pub enum PageResult<S> {
    /// Items only; the total count is whatever is already known.
    Items(Vec<S>),
    /// Items plus an authoritative total count.
    Counted {
        /// Page items, in order.
        items: Vec<S>,
        /// Total number of children of the parent.
        total_count: usize,
    },
}

impl<S> PageResult<S> {
    /// Split into items and optional total count.
    pub fn into_parts(self) -> (Vec<S>, Option<usize>) {
        match self {
            Self::Items(items) => (items, None),
            Self::Counted { items, total_count } => (items, Some(total_count)),
        }
    }
}

impl<S> From<Vec<S>> for PageResult<S> {
    fn from(items: Vec<S>) -> Self {
        Self::Items(items)
    }
}

/// Pagination bookkeeping for one parent.
#[derive(Debug, Clone)]
pub struct PagedNodeState {
    /// Children per page.
    pub page_size: usize,
    /// Page numbering for requests.
    pub page_indexing: PageIndexing,
    /// Known child count.
    pub total_count: Option<usize>,
    /// Pages whose results have been applied.
    pub loaded_pages: BTreeSet<usize>,
    /// Pages requested but not yet applied.
    pub in_flight_pages: BTreeSet<usize>,
    /// Failed pages.
    pub page_errors: BTreeMap<usize, LoadError>,
}

/// Paging state of every paginated parent.
pub type PagingMap = HashMap<NodeId, PagedNodeState>;

impl PagedNodeState {
    /// Create bookkeeping for a parent.
    pub fn new(config: &PaginationConfig) -> TreeResult<Self> {
        if config.page_size == 0 {
            return Err(TreeError::InvalidPageSize);
        }
        Ok(Self {
            page_size: config.page_size,
            page_indexing: config.page_indexing,
            total_count: config.initial_total_count,
            loaded_pages: BTreeSet::new(),
            in_flight_pages: BTreeSet::new(),
            page_errors: BTreeMap::new(),
        })
    }

    /// Forget every loaded, in-flight and failed page.
    pub fn reset(&mut self) {
        self.total_count = None;
        self.loaded_pages.clear();
        self.in_flight_pages.clear();
        self.page_errors.clear();
    }

    /// Request descriptor for a zero-based page index.
    pub fn request_for(&self, page_index: usize) -> TreeResult<PageRequest> {
        let page = match self.page_indexing {
            PageIndexing::ZeroBased => Some(page_index),
            PageIndexing::OneBased => page_index.checked_add(1),
        };
        match (page, self.offset_of(page_index)) {
            (Some(page), Some(offset)) => Ok(PageRequest {
                page_index,
                page,
                page_size: self.page_size,
                offset,
            }),
            _ => Err(TreeError::PageOutOfRange(page_index)),
        }
    }

    /// First slot of a page, or `None` if it overflows.
    pub fn offset_of(&self, page_index: usize) -> Option<usize> {
        page_index.checked_mul(self.page_size)
    }

    /// Page containing `row`.
    pub fn page_of(&self, row: usize) -> usize {
        row / self.page_size
    }

    /// Inclusive page range covering `range`, after clamping to `[0, total_count - 1]`.
    ///
    /// With an unknown total count the upper bound is not clamped. Returns `None` for a known
    /// total of zero.
    pub fn page_span(&self, range: RowRange) -> Option<RangeInclusive<usize>> {
        let (start, end) = match self.total_count {
            Some(0) => return None,
            Some(total) => (range.start.min(total - 1), range.end.min(total - 1)),
            None => (range.start, range.end),
        };
        Some(self.page_of(start)..=self.page_of(end))
    }

    /// Pages of `range` that are neither loaded nor in flight.
    pub fn missing_pages(&self, range: RowRange) -> Vec<usize> {
        let Some(span) = self.page_span(range) else {
            return Vec::new();
        };
        span.filter(|page| !self.loaded_pages.contains(page) && !self.in_flight_pages.contains(page))
            .collect()
    }

    /// [`missing_pages`](Self::missing_pages), marking every returned page in flight.
    pub fn ensure_range_loaded(&mut self, range: RowRange) -> Vec<usize> {
        let pages = self.missing_pages(range);
        for page in &pages {
            self.in_flight_pages.insert(*page);
            self.page_errors.remove(page);
        }
        pages
    }

    /// Mark a page in flight. Returns `false` if it already was.
    pub fn mark_page_in_flight(&mut self, page_index: usize) -> bool {
        if !self.in_flight_pages.insert(page_index) {
            return false;
        }
        self.page_errors.remove(&page_index);
        true
    }

    /// Clear the in-flight flag of a page. Returns `false` if it was not set.
    pub fn clear_page_in_flight(&mut self, page_index: usize) -> bool {
        self.in_flight_pages.remove(&page_index)
    }

    /// Record a page failure (also clears its in-flight flag).
    pub fn set_page_error(&mut self, page_index: usize, error: LoadError) {
        self.in_flight_pages.remove(&page_index);
        self.page_errors.insert(page_index, error);
    }

    /// Clear a page failure. Returns `false` if there was none.
    pub fn clear_page_error(&mut self, page_index: usize) -> bool {
        self.page_errors.remove(&page_index).is_some()
    }

    /// Record a page as applied.
    pub fn mark_page_loaded(&mut self, page_index: usize) {
        self.loaded_pages.insert(page_index);
        self.in_flight_pages.remove(&page_index);
        self.page_errors.remove(&page_index);
    }

    /// Number of pages, if the total count is known.
    pub fn page_count(&self) -> Option<usize> {
        self.total_count.map(|total| total.div_ceil(self.page_size))
    }

    /// Lowest page that has not been applied yet, or `None` when every page of a known total is
    /// loaded.
    pub fn next_unloaded_page(&self) -> Option<usize> {
        match self.page_count() {
            Some(count) => (0..count).find(|page| !self.loaded_pages.contains(page)),
            None => (0..).find(|page| !self.loaded_pages.contains(page)),
        }
    }

    /// Returns `true` while any page is in flight.
    pub fn is_loading(&self) -> bool {
        !self.in_flight_pages.is_empty()
    }

    /// Error of the lowest failed page.
    pub fn first_error(&self) -> Option<&LoadError> {
        self.page_errors.values().next()
    }

    /// Error of the page containing slot `index`.
    pub fn error_for_slot(&self, index: usize) -> Option<&LoadError> {
        self.page_errors.get(&self.page_of(index))
    }

    /// Returns `true` if the page containing slot `index` is in flight.
    pub fn is_slot_in_flight(&self, index: usize) -> bool {
        self.in_flight_pages.contains(&self.page_of(index))
    }

    /// Snapshot for debugging tools.
    pub fn debug_state(&self, slots: &[NodeId]) -> PagedNodeDebugState {
        PagedNodeDebugState {
            page_size: self.page_size,
            page_indexing: self.page_indexing,
            total_count: self.total_count,
            loaded_pages: self.loaded_pages.iter().copied().collect(),
            in_flight_pages: self.in_flight_pages.iter().copied().collect(),
            error_pages: self.page_errors.keys().copied().collect(),
            slot_count: slots.len(),
            placeholder_count: slots.iter().filter(|id| id.is_placeholder()).count(),
        }
    }
}

/// Read-only snapshot of a parent's pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedNodeDebugState {
    /// Children per page.
    pub page_size: usize,
    /// Page numbering for requests.
    pub page_indexing: PageIndexing,
    /// Known child count.
    pub total_count: Option<usize>,
    /// Loaded pages, ascending.
    pub loaded_pages: Vec<usize>,
    /// In-flight pages, ascending.
    pub in_flight_pages: Vec<usize>,
    /// Failed pages, ascending.
    pub error_pages: Vec<usize>,
    /// Length of the slot array.
    pub slot_count: usize,
    /// Slots still occupied by placeholders.
    pub placeholder_count: usize,
}

fn paged_parent<'a, T>(state: &'a TreeState<T>, parent_id: &NodeId) -> TreeResult<&'a Arc<Node<T>>> {
    let parent = state
        .node(parent_id)
        .ok_or_else(|| TreeError::UnknownNode(parent_id.clone()))?;
    if parent.placeholder {
        return Err(TreeError::PlaceholderParent(parent_id.clone()));
    }
    Ok(parent)
}

/// Re-materialize a slot array of length `total`.
///
/// Real children of `parent` keep their index; every other index gets the (possibly existing)
/// placeholder for that slot. Returns the new slots plus ids dropped by the resize: placeholders
/// beyond the new end and real children that no longer fit.
fn materialize_slots<T>(
    nodes: &mut NodeMap<T>,
    parent: &Node<T>,
    previous: &[NodeId],
    total: usize,
) -> TreeResult<(Vec<NodeId>, Vec<NodeId>)> {
    let mut slots = Vec::with_capacity(total);
    for index in 0..total {
        let kept = previous.get(index).filter(|id| {
            !id.is_placeholder()
                && nodes
                    .get(*id)
                    .is_some_and(|node| node.parent_id.as_ref() == Some(&parent.id))
        });
        match kept {
            Some(id) => slots.push(id.clone()),
            None => slots.push(ensure_placeholder(nodes, parent, index)?),
        }
    }

    let dropped = previous
        .iter()
        .enumerate()
        .filter(|(index, id)| *index >= total || (id.is_placeholder() && slots[*index] != **id))
        .map(|(_, id)| id.clone())
        .collect();

    Ok((slots, dropped))
}

fn ensure_placeholder<T>(nodes: &mut NodeMap<T>, parent: &Node<T>, index: usize) -> TreeResult<NodeId> {
    let placeholder =
        Node::placeholder(parent, index).ok_or_else(|| TreeError::PlaceholderParent(parent.id.clone()))?;
    let id = placeholder.id.clone();
    if !nodes.contains_key(&id) {
        nodes.insert(id.clone(), Arc::new(placeholder));
    }
    Ok(id)
}

/// Drop `ids` (and the subtrees of real ids) from `nodes`, returning everything removed.
fn remove_with_subtrees<T>(nodes: &mut NodeMap<T>, ids: &[NodeId]) -> HashSet<NodeId> {
    let mut removed = HashSet::new();
    for id in ids {
        removed.insert(id.clone());
        if !id.is_placeholder() {
            removed.extend(descendants(nodes, id));
        }
    }
    if !removed.is_empty() {
        nodes.retain(|id, _| !removed.contains(id));
    }
    removed
}

fn with_children<T>(nodes: &mut NodeMap<T>, parent_id: &NodeId, children: Vec<NodeId>) {
    if let Some(slot) = nodes.get_mut(parent_id) {
        let mut next = Node::clone(slot);
        next.children_ids = Some(children);
        *slot = Arc::new(next);
    }
}

/// Align the parent's aggregate `loading`/`errors` entries with its page bookkeeping.
pub fn sync_parent_flags<T>(
    state: &TreeState<T>,
    paged: &PagedNodeState,
    parent_id: &NodeId,
) -> TreeState<T> {
    state
        .with_loading_flag(parent_id, paged.is_loading())
        .with_error_entry(parent_id, paged.first_error().cloned())
}

/// Seed `parent_id` with exactly `total_count` slots before any page has loaded.
///
/// Real children already in place keep their slot.
pub fn prime_paged_placeholders<T>(
    state: &TreeState<T>,
    paged: &mut PagedNodeState,
    parent_id: &NodeId,
    total_count: usize,
) -> TreeResult<TreeState<T>> {
    let parent = paged_parent(state, parent_id)?;
    paged.total_count = Some(total_count);

    let previous = parent.children();
    if previous.len() == total_count && parent.children_loaded() {
        return Ok(state.clone());
    }

    let mut nodes = (*state.nodes).clone();
    let (slots, dropped) = materialize_slots(&mut nodes, parent, previous, total_count)?;
    let removed = remove_with_subtrees(&mut nodes, &dropped);
    with_children(&mut nodes, parent_id, slots);
    Ok(state.with_nodes_removing(nodes, &removed))
}

/// Apply a loaded page to the parent's slot array.
///
/// 1. If the slot count differs from the total, re-materialize it, keeping real children of this
///    parent at their index and filling the rest with placeholders.
/// 2. Drop placeholders whose slots disappeared.
/// 3. Overwrite the page window with `children`, dropping the placeholders (or stale real
///    children) that occupied it.
/// 4. Record the page as loaded and re-derive the parent's aggregate loading/error flags.
///
/// `children` are the page's child ids in order; `new_nodes` holds every node ingested with the
/// page (the children plus eagerly provided descendants). The total is `total_count`, else the
/// already known total; children past it are discarded. With no known total the slot array only
/// grows to fit the page.
pub fn apply_paged_children<T>(
    state: &TreeState<T>,
    paged: &mut PagedNodeState,
    parent_id: &NodeId,
    request: &PageRequest,
    mut children: Vec<NodeId>,
    new_nodes: Vec<Node<T>>,
    total_count: Option<usize>,
) -> TreeResult<TreeState<T>> {
    let parent = paged_parent(state, parent_id)?;
    let offset = paged
        .offset_of(request.page_index)
        .ok_or(TreeError::PageOutOfRange(request.page_index))?;
    let previous = parent.children().to_vec();

    let known_total = total_count.or(paged.total_count);
    let total = match known_total {
        Some(total) => total,
        None => offset
            .checked_add(children.len())
            .ok_or(TreeError::PageOutOfRange(request.page_index))?
            .max(previous.len()),
    };
    let discarded: HashSet<NodeId> = children
        .drain(total.saturating_sub(offset).min(children.len())..)
        .collect();
    let window_end = offset + children.len();

    let mut nodes = (*state.nodes).clone();
    let (mut slots, mut dropped) = if previous.len() != total {
        materialize_slots(&mut nodes, parent, &previous, total)?
    } else {
        (previous, Vec::new())
    };

    let incoming: HashSet<&NodeId> = children.iter().collect();

    // A child that moved pages leaves a placeholder behind, and its old page must load again.
    for index in (0..slots.len()).filter(|index| *index < offset || *index >= window_end) {
        if incoming.contains(&slots[index]) {
            slots[index] = ensure_placeholder(&mut nodes, parent, index)?;
            let vacated = paged.page_of(index);
            paged.loaded_pages.remove(&vacated);
        }
    }

    for (k, child_id) in children.iter().enumerate() {
        let index = offset + k;
        let occupant = std::mem::replace(&mut slots[index], child_id.clone());
        if occupant != *child_id && !incoming.contains(&occupant) {
            dropped.push(occupant);
        }
    }

    let mut removed = remove_with_subtrees(&mut nodes, &dropped);
    for node in without_subtrees(new_nodes, &discarded) {
        removed.remove(&node.id);
        upsert_node(&mut nodes, node);
    }
    with_children(&mut nodes, parent_id, slots);

    if known_total.is_some() {
        paged.total_count = Some(total);
    }
    paged.mark_page_loaded(request.page_index);

    let next = state.with_nodes_removing(nodes, &removed);
    Ok(sync_parent_flags(&next, paged, parent_id))
}

/// `nodes` minus `roots` and everything ingested beneath them.
fn without_subtrees<T>(nodes: Vec<Node<T>>, roots: &HashSet<NodeId>) -> Vec<Node<T>> {
    if roots.is_empty() {
        return nodes;
    }
    let parents: HashMap<NodeId, Option<NodeId>> = nodes
        .iter()
        .map(|node| (node.id.clone(), node.parent_id.clone()))
        .collect();
    let under_root = |id: &NodeId| {
        let mut current = Some(id);
        while let Some(id) = current {
            if roots.contains(id) {
                return true;
            }
            current = parents.get(id).and_then(Option::as_ref);
        }
        false
    };
    nodes.into_iter().filter(|node| !under_root(&node.id)).collect()
}

/// Drop the parent's placeholders, keeping only real children.
///
/// A parent left with no real children goes back to "not loaded".
pub fn remove_placeholders<T>(state: &TreeState<T>, parent_id: &NodeId) -> TreeState<T> {
    let Some(parent) = state.node(parent_id) else {
        return state.clone();
    };
    let (placeholders, real): (Vec<NodeId>, Vec<NodeId>) = parent
        .children()
        .iter()
        .cloned()
        .partition(|id| id.is_placeholder());
    if placeholders.is_empty() {
        return state.clone();
    }

    let removed: HashSet<NodeId> = placeholders.into_iter().collect();
    let mut nodes = cow(&state.nodes, |nodes| nodes.retain(|id, _| !removed.contains(id)));
    if let Some(slot) = nodes.get_mut(parent_id) {
        let mut next = Node::clone(slot);
        next.children_ids = if real.is_empty() { None } else { Some(real) };
        *slot = Arc::new(next);
    }
    state.with_nodes_removing(nodes, &removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_to_pages() {
        let mut paged = PagedNodeState::new(&PaginationConfig::new(10).with_total_count(100)).unwrap();
        assert_eq!(paged.ensure_range_loaded(RowRange::new(45, 56)), vec![4, 5]);
        assert_eq!(paged.ensure_range_loaded(RowRange::new(45, 56)), Vec::<usize>::new());
        assert_eq!(paged.ensure_range_loaded(RowRange::new(50, 69)), vec![6]);
    }

    #[test]
    fn test_range_clamped_to_total() {
        let mut paged = PagedNodeState::new(&PaginationConfig::new(10).with_total_count(25)).unwrap();
        assert_eq!(paged.ensure_range_loaded(RowRange::new(0, 500)), vec![0, 1, 2]);

        let mut empty = PagedNodeState::new(&PaginationConfig::new(10).with_total_count(0)).unwrap();
        assert!(empty.ensure_range_loaded(RowRange::new(0, 10)).is_empty());
    }

    #[test]
    fn test_unknown_total_is_not_clamped() {
        let mut paged = PagedNodeState::new(&PaginationConfig::new(10)).unwrap();
        assert_eq!(paged.ensure_range_loaded(RowRange::new(5, 34)), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_loaded_pages_are_skipped() {
        let mut paged = PagedNodeState::new(&PaginationConfig::new(10).with_total_count(100)).unwrap();
        paged.mark_page_loaded(1);
        assert_eq!(paged.missing_pages(RowRange::new(0, 29)), vec![0, 2]);
    }

    #[test]
    fn test_one_based_requests() {
        let paged = PagedNodeState::new(
            &PaginationConfig::new(25).with_indexing(PageIndexing::OneBased),
        )
        .unwrap();
        let request = paged.request_for(2).unwrap();
        assert_eq!(request.page, 3);
        assert_eq!(request.offset, 50);
        assert_eq!(request.page_index, 2);
    }

    #[test]
    fn test_huge_page_index_rejected() {
        let paged = PagedNodeState::new(
            &PaginationConfig::new(25).with_indexing(PageIndexing::OneBased),
        )
        .unwrap();
        assert!(matches!(
            paged.request_for(usize::MAX),
            Err(TreeError::PageOutOfRange(usize::MAX))
        ));
        assert!(matches!(
            paged.request_for(usize::MAX / 2),
            Err(TreeError::PageOutOfRange(_))
        ));

        let zero_based = PagedNodeState::new(&PaginationConfig::new(1)).unwrap();
        assert_eq!(zero_based.request_for(usize::MAX).unwrap().offset, usize::MAX);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(matches!(
            PagedNodeState::new(&PaginationConfig::new(0)),
            Err(TreeError::InvalidPageSize)
        ));
    }

    #[test]
    fn test_page_error_and_retry() {
        let mut paged = PagedNodeState::new(&PaginationConfig::new(10).with_total_count(30)).unwrap();
        assert!(paged.mark_page_in_flight(1));
        assert!(!paged.mark_page_in_flight(1));
        paged.set_page_error(1, LoadError::message("timeout"));
        assert!(!paged.is_loading());
        assert!(paged.error_for_slot(15).is_some());
        assert!(paged.error_for_slot(5).is_none());

        assert!(paged.mark_page_in_flight(1));
        assert!(paged.error_for_slot(15).is_none());
        assert!(paged.is_slot_in_flight(19));
    }
}

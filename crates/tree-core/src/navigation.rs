//! Revealing nodes that may not be loaded yet.
//!
//! The adapter describes how to reach a target as a root-to-target list of [`PathStep`]s.
//! [`plan_reveal`] walks that list against the loaded graph and reports the next load the host has
//! to perform, or [`RevealPlan::Ready`] once every ancestor is present. Hosts loop
//! load, apply, plan until the plan is ready.

use crate::id::NodeId;
use crate::index::{ancestor_chain, ancestors};
use crate::paging::PagingMap;
use crate::state::NodeMap;

/// One hop on the root-to-target path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    /// Node id at this depth.
    pub id: NodeId,
    /// Zero-based page of the parent's children that contains this node.
    pub page_hint: Option<usize>,
}

impl PathStep {
    /// A step without a page hint.
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            page_hint: None,
        }
    }

    /// Builder: set the page hint.
    pub fn with_page_hint(mut self, page_index: usize) -> Self {
        self.page_hint = Some(page_index);
        self
    }
}

/// Next action needed to reveal a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealPlan {
    /// The target and all its ancestors are loaded.
    Ready,
    /// The children of `parent` must be loaded.
    NeedsChildren {
        /// Parent to load.
        parent: NodeId,
    },
    /// A page of `parent`'s children must be loaded.
    NeedsPage {
        /// Paginated parent.
        parent: NodeId,
        /// Zero-based page index.
        page_index: usize,
    },
    /// The target cannot be reached with the available information.
    Unreachable,
}

fn is_connected<T>(nodes: &NodeMap<T>, target: &NodeId) -> bool {
    nodes.contains_key(target) && ancestors(nodes, target).len() == ancestor_chain(nodes, target).len()
}

/// Plan the next step towards revealing `target`.
///
/// `steps` is the adapter's root-to-target path; a path that does not end at `target` is treated
/// as if `target` followed it.
pub fn plan_reveal<T>(
    nodes: &NodeMap<T>,
    paging: &PagingMap,
    target: &NodeId,
    steps: Option<&[PathStep]>,
) -> RevealPlan {
    if is_connected(nodes, target) {
        return RevealPlan::Ready;
    }

    let Some(steps) = steps.filter(|steps| !steps.is_empty()) else {
        return RevealPlan::Unreachable;
    };
    let mut path = steps.to_vec();
    if path.last().is_some_and(|step| step.id != *target) {
        path.push(PathStep::new(target.clone()));
    }

    if !nodes.contains_key(&path[0].id) {
        return RevealPlan::Unreachable;
    }

    for hop in path.windows(2) {
        let (parent_step, child_step) = (&hop[0], &hop[1]);
        let on_chain = nodes
            .get(&child_step.id)
            .is_some_and(|child| child.parent_id.as_ref() == Some(&parent_step.id));
        if on_chain {
            continue;
        }
        let Some(parent) = nodes.get(&parent_step.id) else {
            return RevealPlan::Unreachable;
        };
        if parent.placeholder {
            return RevealPlan::Unreachable;
        }

        if let Some(paged) = paging.get(&parent.id) {
            let page_index = match child_step.page_hint {
                Some(hint) if !paged.loaded_pages.contains(&hint) => Some(hint),
                Some(_) => None,
                None => paged.next_unloaded_page(),
            };
            return match page_index {
                Some(page_index) => RevealPlan::NeedsPage {
                    parent: parent.id.clone(),
                    page_index,
                },
                None => RevealPlan::Unreachable,
            };
        }

        if !parent.children_loaded() {
            return RevealPlan::NeedsChildren {
                parent: parent.id.clone(),
            };
        }
        return RevealPlan::Unreachable;
    }

    if is_connected(nodes, target) {
        RevealPlan::Ready
    } else {
        RevealPlan::Unreachable
    }
}

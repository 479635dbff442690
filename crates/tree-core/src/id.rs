//! Node identifiers.
//!
//! Real node ids are assigned by the host (through [`TreeAdapter::id`](crate::TreeAdapter::id))
//! and must be globally unique. Placeholder ids are derived from the owning parent key and the
//! slot index, so they are stable across recomputation and cannot collide with a real id.

use std::fmt;
use std::sync::Arc;

/// Identifier of a node in the tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeId {
    /// A host-assigned key.
    Key(Arc<str>),
    /// A synthetic slot inside a paginated child list.
    Placeholder {
        /// Key of the paginated parent.
        parent: Arc<str>,
        /// Zero-based slot index within the parent's child list.
        index: usize,
    },
}

impl NodeId {
    /// Create a real node id from a host key.
    pub fn key(key: impl AsRef<str>) -> Self {
        Self::Key(Arc::from(key.as_ref()))
    }

    /// Derive the placeholder id for slot `index` of `parent`.
    ///
    /// Returns `None` when `parent` is itself a placeholder (placeholders are always leaves).
    pub fn placeholder(parent: &NodeId, index: usize) -> Option<Self> {
        match parent {
            Self::Key(key) => Some(Self::Placeholder {
                parent: key.clone(),
                index,
            }),
            Self::Placeholder { .. } => None,
        }
    }

    /// Returns `true` for derived placeholder ids.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }

    /// Returns the host key for real ids.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            Self::Placeholder { .. } => None,
        }
    }

    /// Slot index for placeholder ids.
    pub fn placeholder_index(&self) -> Option<usize> {
        match self {
            Self::Key(_) => None,
            Self::Placeholder { index, .. } => Some(*index),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Placeholder { parent, index } => write!(f, "{parent}#placeholder:{index}"),
        }
    }
}

impl From<&str> for NodeId {
    fn from(key: &str) -> Self {
        Self::key(key)
    }
}

impl From<String> for NodeId {
    fn from(key: String) -> Self {
        Self::Key(Arc::from(key))
    }
}

impl From<&String> for NodeId {
    fn from(key: &String) -> Self {
        Self::key(key)
    }
}

impl From<u64> for NodeId {
    fn from(key: u64) -> Self {
        Self::Key(Arc::from(key.to_string()))
    }
}

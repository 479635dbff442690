//! Error types.
//!
//! Two kinds of errors exist in the engine:
//!
//! - [`TreeError`]: a mis-addressed command (programmer error), returned by facade methods.
//! - [`LoadError`]: an opaque, host-supplied failure (children load, page load) stored in state
//!   and surfaced on row view models. The engine never inspects it.

use crate::id::NodeId;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result alias for facade commands.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors returned by commands that reference state that cannot exist.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The referenced node is not in the graph.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// Two sources resolved to the same id during ingestion.
    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    /// A paging command was issued for a parent without pagination configured.
    #[error("pagination is not configured for node {0}")]
    NotPaginated(NodeId),

    /// A page size of zero was requested.
    #[error("page size must be greater than zero")]
    InvalidPageSize,

    /// The page's row offset does not fit in `usize`.
    #[error("page {0} is out of range")]
    PageOutOfRange(usize),

    /// A placeholder was used where a parent node is required.
    #[error("placeholder {0} cannot own children")]
    PlaceholderParent(NodeId),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// An opaque load failure supplied by the host.
#[derive(Clone)]
pub struct LoadError(Arc<dyn StdError + Send + Sync + 'static>);

impl LoadError {
    /// Wrap any error value.
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Arc::new(err))
    }

    /// Create a load error from a plain message.
    pub fn message(msg: impl Into<String>) -> Self {
        Self(Arc::new(Message(msg.into())))
    }

    /// Borrow the wrapped error.
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.0.as_ref()
    }

    /// Returns `true` if both handles point at the same host error value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LoadError").field(&self.0.to_string()).finish()
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for LoadError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl From<&str> for LoadError {
    fn from(msg: &str) -> Self {
        Self::message(msg)
    }
}

impl From<String> for LoadError {
    fn from(msg: String) -> Self {
        Self::message(msg)
    }
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for Message {}

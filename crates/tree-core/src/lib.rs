#![warn(missing_docs)]
//! Tree Core - Headless Tree State Engine for Virtualized Lists
//!
//! # Overview
//!
//! `tree-core` turns a sparse, partially loaded node graph plus user intents (expand, select,
//! filter, scroll) into a flat, ordered sequence of renderable rows. It does not render and never
//! performs I/O: it reports which children or pages must be loaded, and the host feeds results
//! back as commands.
//!
//! # Core Features
//!
//! - **Copy-on-write State**: every transition replaces only the collections it touches
//! - **Lazy Loading**: expansion reports when children must be loaded, exactly once
//! - **Page-aware Virtualization**: placeholder slots for unloaded children, row range to page mapping
//! - **Hierarchical Selection**: tri-state (selected / indeterminate) derived over any forest
//! - **Filtering**: client or server matching, ancestors of matches, highlight ranges
//! - **State Tracking**: version number mechanism and change notifications
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Engine Facade & Commands                   │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Projection (RowViewModel, cached)          │  ← Rendering Data
//! ├─────────────────────────────────────────────┤
//! │  Visibility & Filtering                     │  ← Matching
//! ├─────────────────────────────────────────────┤
//! │  Expansion / Selection / Paging             │  ← Transitions
//! ├─────────────────────────────────────────────┤
//! │  Flattening (memoized DFS)                  │  ← Row Order
//! ├─────────────────────────────────────────────┤
//! │  Node Graph & Index                         │  ← Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use tree_core::{NodeId, PageResult, PaginationConfig, RowRange, TreeAdapter, TreeEngine};
//!
//! struct Catalog;
//!
//! impl TreeAdapter for Catalog {
//!     type Source = String;
//!     type Data = String;
//!
//!     fn id(&self, source: &String) -> NodeId {
//!         NodeId::key(source)
//!     }
//!     fn to_data(&self, source: String) -> String {
//!         source
//!     }
//!     fn label(&self, data: &String) -> String {
//!         data.clone()
//!     }
//! }
//!
//! let mut engine = TreeEngine::new(Catalog);
//! engine.init(vec!["products".to_string()]).unwrap();
//!
//! let parent = NodeId::key("products");
//! engine
//!     .set_pagination(&parent, Some(PaginationConfig::new(2).with_total_count(5)))
//!     .unwrap();
//! engine.toggle_expand(&parent);
//!
//! // The viewport shows child rows 0..=1: page 0 must be requested.
//! let pages = engine.ensure_range_loaded(&parent, RowRange::new(0, 1)).unwrap();
//! assert_eq!(pages, [0]);
//!
//! let request = engine.page_request(&parent, 0).unwrap();
//! engine
//!     .apply_paged_children(&parent, request, PageResult::Items(vec!["c0".into(), "c1".into()]))
//!     .unwrap();
//!
//! let rows = engine.get_visible_rows();
//! assert_eq!(rows.len(), 6);
//! assert!(rows[3].placeholder && rows[3].disabled);
//! ```
//!
//! # Module Description
//!
//! - [`state`] - Node graph and copy-on-write tree state
//! - [`flatten`] - Expansion-aware linearization
//! - [`selection`] - Selection transitions and tri-state derivation
//! - [`paging`] - Per-parent pagination and placeholder slots
//! - [`visibility`] - Filter visibility and policies
//! - [`projection`] - Row view models
//! - [`engine`] - Engine facade
//! - [`commands`] - Unified command interface

pub mod adapter;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod expansion;
pub mod filter;
pub mod flatten;
pub mod id;
pub mod index;
pub mod navigation;
pub mod paging;
pub mod projection;
pub mod selection;
pub mod state;
pub mod visibility;

pub use adapter::{LeafContext, TreeAdapter};
pub use commands::{
    CommandOutcome, FilterCommand, PagingCommand, SelectionCommand, StatusCommand,
    StructureCommand, TreeCommand,
};
pub use config::{EngineConfig, FilterMode, FilteringConfig, SelectionPolicy};
pub use engine::{TreeChange, TreeChangeCallback, TreeChangeType, TreeEngine, TreeStats};
pub use error::{LoadError, TreeError, TreeResult};
pub use filter::{FilterInput, FilterQuery, HighlightRange, MatchMode, normalize_filter_query};
pub use flatten::{FlatEntry, FlattenCache};
pub use id::NodeId;
pub use navigation::{PathStep, RevealPlan};
pub use paging::{
    PageIndexing, PageRequest, PageResult, PagedNodeDebugState, PagedNodeState, PaginationConfig,
    RowRange,
};
pub use projection::{Projection, RowViewModel};
pub use selection::{HierarchicalSelection, SelectionConfig, SelectionMode};
pub use state::{Node, NodeMap, TreeState};

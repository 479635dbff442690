//! Command vocabulary.
//!
//! Every [`TreeEngine`] command can also be expressed as a [`TreeCommand`] value, so several
//! front-ends (or a recorded session) can drive one engine through a single entry point.
//!
//! # Example
//!
//! ```rust
//! use tree_core::{
//!     CommandOutcome, NodeId, SelectionCommand, StructureCommand, TreeAdapter, TreeCommand,
//!     TreeEngine,
//! };
//!
//! struct Flat;
//!
//! impl TreeAdapter for Flat {
//!     type Source = &'static str;
//!     type Data = &'static str;
//!
//!     fn id(&self, source: &Self::Source) -> NodeId {
//!         NodeId::key(*source)
//!     }
//!     fn to_data(&self, source: Self::Source) -> Self::Data {
//!         source
//!     }
//!     fn label(&self, data: &Self::Data) -> String {
//!         data.to_string()
//!     }
//! }
//!
//! let mut engine = TreeEngine::new(Flat);
//! engine
//!     .execute(TreeCommand::Structure(StructureCommand::Init { roots: vec!["a", "b"] }))
//!     .unwrap();
//! let outcome = engine
//!     .execute(TreeCommand::Selection(SelectionCommand::SelectOne { id: NodeId::key("b") }))
//!     .unwrap();
//! assert_eq!(outcome, CommandOutcome::Changed(true));
//! ```

use crate::adapter::TreeAdapter;
use crate::config::EngineConfig;
use crate::engine::TreeEngine;
use crate::error::{LoadError, TreeResult};
use crate::filter::FilterInput;
use crate::id::NodeId;
use crate::navigation::RevealPlan;
use crate::paging::{PageRequest, PageResult, PaginationConfig, RowRange};

/// Lifecycle and structural commands.
#[derive(Debug, Clone)]
pub enum StructureCommand<S> {
    /// Replace the graph.
    Init {
        /// Root sources.
        roots: Vec<S>,
    },
    /// Apply a configuration.
    Configure {
        /// New configuration.
        config: EngineConfig,
    },
    /// Toggle expansion.
    ToggleExpand {
        /// Target node.
        id: NodeId,
    },
    /// Commit loaded children.
    SetChildrenLoaded {
        /// Parent node.
        parent: NodeId,
        /// Child sources.
        children: Vec<S>,
    },
    /// Drop a parent's descendants.
    ClearChildren {
        /// Parent node.
        parent: NodeId,
    },
    /// Reveal a node.
    ExpandPath {
        /// Target node.
        id: NodeId,
    },
}

/// Pagination commands.
#[derive(Debug, Clone)]
pub enum PagingCommand<S> {
    /// Enable or disable pagination.
    SetPagination {
        /// Parent node.
        parent: NodeId,
        /// `None` disables pagination.
        config: Option<PaginationConfig>,
    },
    /// Seed placeholder slots.
    PrimePlaceholders {
        /// Parent node.
        parent: NodeId,
        /// Known child count.
        total_count: usize,
    },
    /// Map a child row range to pages to request.
    EnsureRangeLoaded {
        /// Parent node.
        parent: NodeId,
        /// Child row range.
        range: RowRange,
    },
    /// Mark a page in flight.
    MarkPageInFlight {
        /// Parent node.
        parent: NodeId,
        /// Zero-based page index.
        page_index: usize,
    },
    /// Commit a page result.
    ApplyPage {
        /// Parent node.
        parent: NodeId,
        /// The request the result answers.
        request: PageRequest,
        /// Loaded items.
        result: PageResult<S>,
    },
    /// Clear a page's in-flight flag.
    ClearPageInFlight {
        /// Parent node.
        parent: NodeId,
        /// Zero-based page index.
        page_index: usize,
    },
    /// Record a page failure.
    SetPageError {
        /// Parent node.
        parent: NodeId,
        /// Zero-based page index.
        page_index: usize,
        /// Failure.
        error: LoadError,
    },
    /// Clear a page failure.
    ClearPageError {
        /// Parent node.
        parent: NodeId,
        /// Zero-based page index.
        page_index: usize,
    },
}

/// Selection commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionCommand {
    /// Replace the selection with one node.
    SelectOne {
        /// Target node.
        id: NodeId,
    },
    /// Toggle one node.
    SelectToggle {
        /// Target node.
        id: NodeId,
    },
    /// Clear the selection.
    SelectNone,
    /// Select a range of visible rows.
    SelectRange {
        /// One end of the range.
        from: NodeId,
        /// The other end of the range.
        to: NodeId,
    },
    /// Select a node and its descendants.
    SelectBranch {
        /// Target node.
        id: NodeId,
    },
}

/// Loading and error bookkeeping commands.
#[derive(Debug, Clone)]
pub enum StatusCommand {
    /// Record a failed children load.
    SetNodeError {
        /// Target node.
        id: NodeId,
        /// Failure.
        error: LoadError,
    },
    /// Clear a node's error.
    ClearNodeError {
        /// Target node.
        id: NodeId,
    },
    /// Clear a node's loading flag.
    ClearLoading {
        /// Target node.
        id: NodeId,
    },
}

/// Filter commands.
#[derive(Debug, Clone)]
pub enum FilterCommand {
    /// Set the filter.
    SetFilter {
        /// Raw filter input.
        input: FilterInput,
    },
    /// Remove the filter.
    ClearFilter,
    /// Re-run the filter policies.
    ReapplyFilter,
}

/// Unified command enum.
#[derive(Debug, Clone)]
pub enum TreeCommand<S> {
    /// Lifecycle and structure.
    Structure(StructureCommand<S>),
    /// Pagination.
    Paging(PagingCommand<S>),
    /// Selection.
    Selection(SelectionCommand),
    /// Loading and errors.
    Status(StatusCommand),
    /// Filtering.
    Filter(FilterCommand),
}

/// Command execution result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Success, no return value.
    Success,
    /// Whether the command changed anything.
    Changed(bool),
    /// Whether the caller must now load the node's children.
    LoadChildren(bool),
    /// Pages the caller must request.
    Pages(Vec<usize>),
    /// Next step towards revealing a node.
    Reveal(RevealPlan),
}

impl<A: TreeAdapter> TreeEngine<A> {
    /// Execute a command.
    pub fn execute(&mut self, command: TreeCommand<A::Source>) -> TreeResult<CommandOutcome> {
        match command {
            TreeCommand::Structure(command) => self.execute_structure(command),
            TreeCommand::Paging(command) => self.execute_paging(command),
            TreeCommand::Selection(command) => Ok(self.execute_selection(command)),
            TreeCommand::Status(command) => Ok(self.execute_status(command)),
            TreeCommand::Filter(command) => Ok(self.execute_filter(command)),
        }
    }

    /// Execute commands in order, stopping at the first error.
    pub fn execute_batch(
        &mut self,
        commands: Vec<TreeCommand<A::Source>>,
    ) -> TreeResult<Vec<CommandOutcome>> {
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            results.push(self.execute(command)?);
        }
        Ok(results)
    }

    fn execute_structure(
        &mut self,
        command: StructureCommand<A::Source>,
    ) -> TreeResult<CommandOutcome> {
        match command {
            StructureCommand::Init { roots } => {
                self.init(roots)?;
                Ok(CommandOutcome::Success)
            }
            StructureCommand::Configure { config } => {
                self.configure(config);
                Ok(CommandOutcome::Success)
            }
            StructureCommand::ToggleExpand { id } => {
                Ok(CommandOutcome::LoadChildren(self.toggle_expand(&id)))
            }
            StructureCommand::SetChildrenLoaded { parent, children } => {
                self.set_children_loaded(&parent, children)?;
                Ok(CommandOutcome::Success)
            }
            StructureCommand::ClearChildren { parent } => {
                self.clear_children(&parent)?;
                Ok(CommandOutcome::Success)
            }
            StructureCommand::ExpandPath { id } => Ok(CommandOutcome::Reveal(self.expand_path(&id))),
        }
    }

    fn execute_paging(&mut self, command: PagingCommand<A::Source>) -> TreeResult<CommandOutcome> {
        match command {
            PagingCommand::SetPagination { parent, config } => {
                self.set_pagination(&parent, config)?;
                Ok(CommandOutcome::Success)
            }
            PagingCommand::PrimePlaceholders {
                parent,
                total_count,
            } => {
                self.prime_paged_placeholders(&parent, total_count)?;
                Ok(CommandOutcome::Success)
            }
            PagingCommand::EnsureRangeLoaded { parent, range } => {
                Ok(CommandOutcome::Pages(self.ensure_range_loaded(&parent, range)?))
            }
            PagingCommand::MarkPageInFlight { parent, page_index } => Ok(CommandOutcome::Changed(
                self.mark_page_in_flight(&parent, page_index)?,
            )),
            PagingCommand::ApplyPage {
                parent,
                request,
                result,
            } => {
                self.apply_paged_children(&parent, request, result)?;
                Ok(CommandOutcome::Success)
            }
            PagingCommand::ClearPageInFlight { parent, page_index } => Ok(CommandOutcome::Changed(
                self.clear_page_in_flight(&parent, page_index)?,
            )),
            PagingCommand::SetPageError {
                parent,
                page_index,
                error,
            } => {
                self.set_page_error(&parent, page_index, error)?;
                Ok(CommandOutcome::Success)
            }
            PagingCommand::ClearPageError { parent, page_index } => Ok(CommandOutcome::Changed(
                self.clear_page_error(&parent, page_index)?,
            )),
        }
    }

    fn execute_selection(&mut self, command: SelectionCommand) -> CommandOutcome {
        let changed = match command {
            SelectionCommand::SelectOne { id } => self.select_one(&id),
            SelectionCommand::SelectToggle { id } => self.select_toggle(&id),
            SelectionCommand::SelectNone => self.select_none(),
            SelectionCommand::SelectRange { from, to } => self.select_range(&from, &to),
            SelectionCommand::SelectBranch { id } => self.select_branch(&id),
        };
        CommandOutcome::Changed(changed)
    }

    fn execute_status(&mut self, command: StatusCommand) -> CommandOutcome {
        let changed = match command {
            StatusCommand::SetNodeError { id, error } => self.set_node_error(&id, error),
            StatusCommand::ClearNodeError { id } => self.clear_node_error(&id),
            StatusCommand::ClearLoading { id } => self.clear_loading(&id),
        };
        CommandOutcome::Changed(changed)
    }

    fn execute_filter(&mut self, command: FilterCommand) -> CommandOutcome {
        let changed = match command {
            FilterCommand::SetFilter { input } => self.set_filter(input),
            FilterCommand::ClearFilter => self.clear_filter(),
            FilterCommand::ReapplyFilter => self.reapply_filter(),
        };
        CommandOutcome::Changed(changed)
    }
}

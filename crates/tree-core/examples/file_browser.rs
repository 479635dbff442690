//! File browser example
//!
//! Drives a lazily loaded directory tree through the command interface: expand, load children,
//! filter, select, and watch change notifications.

use std::sync::{Arc, Mutex};
use tree_core::{
    CommandOutcome, EngineConfig, FilterCommand, FilterQuery, NodeId, SelectionCommand,
    SelectionConfig, StructureCommand, TreeAdapter, TreeCommand, TreeEngine, TreeResult,
};

#[derive(Debug, Clone)]
struct Entry {
    path: String,
    dir: bool,
}

impl Entry {
    fn dir(path: &str) -> Self {
        Self {
            path: path.to_string(),
            dir: true,
        }
    }

    fn file(path: &str) -> Self {
        Self {
            path: path.to_string(),
            dir: false,
        }
    }

    fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

struct Files;

impl TreeAdapter for Files {
    type Source = Entry;
    type Data = Entry;

    fn id(&self, source: &Entry) -> NodeId {
        NodeId::key(&source.path)
    }

    fn to_data(&self, source: Entry) -> Entry {
        source
    }

    fn label(&self, data: &Entry) -> String {
        data.name().to_string()
    }

    fn icon(&self, data: &Entry) -> Option<String> {
        Some(if data.dir { "folder" } else { "file" }.to_string())
    }

    fn has_children(&self, data: &Entry) -> Option<bool> {
        Some(data.dir)
    }

    fn loads_children(&self) -> bool {
        true
    }
}

/// Fake file system listing.
fn list(path: &str) -> Vec<Entry> {
    match path {
        "src" => vec![
            Entry::dir("src/engine"),
            Entry::file("src/lib.rs"),
            Entry::file("src/main.rs"),
        ],
        "src/engine" => vec![Entry::file("src/engine/mod.rs"), Entry::file("src/engine/paging.rs")],
        _ => Vec::new(),
    }
}

fn print_rows(engine: &mut TreeEngine<Files>) {
    for row in engine.get_visible_rows() {
        let indent = "  ".repeat(row.level + 1);
        let toggle = match (row.is_leaf, row.expanded) {
            (true, _) => " ",
            (false, true) => "v",
            (false, false) => ">",
        };
        let check = match (row.selected, row.indeterminate) {
            (true, _) => "[x]",
            (false, true) => "[-]",
            (false, false) => "[ ]",
        };
        println!("{indent}{toggle} {check} {} ({})", row.label, row.icon.unwrap_or_default());
    }
}

fn expand(engine: &mut TreeEngine<Files>, path: &str) -> TreeResult<()> {
    let id = NodeId::key(path);
    let outcome = engine.execute(TreeCommand::Structure(StructureCommand::ToggleExpand {
        id: id.clone(),
    }))?;
    if outcome == CommandOutcome::LoadChildren(true) {
        println!("  loading {path}...");
        engine.execute(TreeCommand::Structure(StructureCommand::SetChildrenLoaded {
            parent: id,
            children: list(path),
        }))?;
    }
    Ok(())
}

fn main() -> TreeResult<()> {
    env_logger::init();
    println!("=== File browser example ===\n");

    let config = EngineConfig::default().with_selection(SelectionConfig::hierarchical());
    let mut engine = TreeEngine::with_config(Files, config);

    let changes = Arc::new(Mutex::new(0));
    let counter = changes.clone();
    engine.subscribe(move |change| {
        if let Ok(mut count) = counter.lock() {
            *count += 1;
        }
        log::info!(
            "{:?} (version {} -> {})",
            change.change_type,
            change.old_version,
            change.new_version
        );
    });

    engine.init(vec![Entry::dir("src"), Entry::file("Cargo.toml")])?;

    println!("1. Roots:");
    print_rows(&mut engine);

    println!("\n2. Expand src and src/engine:");
    expand(&mut engine, "src")?;
    expand(&mut engine, "src/engine")?;
    print_rows(&mut engine);

    println!("\n3. Select src/engine/mod.rs:");
    engine.execute(TreeCommand::Selection(SelectionCommand::SelectToggle {
        id: NodeId::key("src/engine/mod.rs"),
    }))?;
    print_rows(&mut engine);

    println!("\n4. Filter \"paging\":");
    engine.execute(TreeCommand::Filter(FilterCommand::SetFilter {
        input: FilterQuery::text("paging").into(),
    }))?;
    print_rows(&mut engine);

    engine.execute(TreeCommand::Filter(FilterCommand::ClearFilter))?;
    if let Ok(count) = changes.lock() {
        println!("\n5. {count} change notifications, version {}", engine.version());
    }
    Ok(())
}

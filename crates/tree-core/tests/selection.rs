mod common;

use common::{Fixture, expand_all, id, items, sample_tree, visible_ids};
use pretty_assertions::assert_eq;
use tree_core::{EngineConfig, NodeId, SelectionConfig, SelectionMode, TreeEngine};

fn engine(selection: SelectionConfig) -> TreeEngine<Fixture> {
    let config = EngineConfig::default().with_selection(selection);
    let mut engine = TreeEngine::with_config(Fixture::lazy(), config);
    engine.init(sample_tree()).unwrap();
    engine
}

fn selected(engine: &TreeEngine<Fixture>) -> Vec<String> {
    engine.state().selected.iter().map(NodeId::to_string).collect()
}

fn row_state(engine: &mut TreeEngine<Fixture>, key: &str) -> (bool, bool) {
    let row = engine.get_row_view_models_by_id(&[id(key)]).remove(0);
    (row.selected, row.indeterminate)
}

#[test]
fn test_single_selection_replaces() {
    let mut engine = engine(SelectionConfig::single());
    assert!(engine.select_one(&id("intro")));
    assert!(!engine.select_one(&id("intro")));
    assert!(engine.select_toggle(&id("setup")));
    assert_eq!(selected(&engine), ["setup"]);

    // Branch selection degrades to single selection.
    assert!(engine.select_branch(&id("api")));
    assert_eq!(selected(&engine), ["api"]);
}

#[test]
fn test_disabled_nodes_are_not_selectable() {
    let mut engine = engine(SelectionConfig::multi());
    assert!(!engine.select_one(&id("archive")));
    assert!(!engine.select_toggle(&id("archive")));
    assert!(!engine.select_one(&id("missing")));
    assert!(selected(&engine).is_empty());
}

#[test]
fn test_multi_toggle() {
    let mut engine = engine(SelectionConfig::multi());
    engine.select_toggle(&id("intro"));
    engine.select_toggle(&id("parser"));
    assert_eq!(selected(&engine), ["intro", "parser"]);
    engine.select_toggle(&id("intro"));
    assert_eq!(selected(&engine), ["parser"]);
    assert!(engine.select_none());
    assert!(!engine.select_none());
}

#[test]
fn test_range_follows_visible_rows() {
    let mut engine = engine(SelectionConfig::multi());
    expand_all(&mut engine, &["docs", "guide"]);
    assert_eq!(
        visible_ids(&mut engine),
        ["docs", "guide", "intro", "setup", "api", "archive", "src"]
    );

    assert!(engine.select_range(&id("archive"), &id("intro")));
    assert_eq!(selected(&engine), ["intro", "setup", "api"]);

    // `lexer` is collapsed away.
    assert!(!engine.select_range(&id("intro"), &id("lexer")));
}

#[test]
fn test_range_under_filter_skips_hidden_rows() {
    let mut engine = engine(SelectionConfig::multi());
    expand_all(&mut engine, &["docs", "guide", "api"]);
    engine.set_filter("e");
    assert_eq!(
        visible_ids(&mut engine),
        ["docs", "guide", "setup", "api", "parser", "lexer", "archive"]
    );
    engine.select_range(&id("setup"), &id("lexer"));
    assert_eq!(selected(&engine), ["setup", "api", "parser", "lexer"]);
}

#[test]
fn test_branch_selection() {
    let mut engine = engine(SelectionConfig::multi());
    assert!(engine.select_branch(&id("docs")));
    let selection = selected(&engine);
    assert!(selection.contains(&"lexer".to_string()));
    assert!(selection.contains(&"old".to_string()));
    assert!(!selection.contains(&"archive".to_string()));
    assert!(!engine.select_branch(&id("docs")));
}

#[test]
fn test_hierarchical_tri_state() {
    let mut engine = engine(SelectionConfig::hierarchical());
    engine.select_toggle(&id("intro"));
    assert_eq!(row_state(&mut engine, "guide"), (false, true));
    assert_eq!(row_state(&mut engine, "docs"), (false, true));

    engine.select_toggle(&id("setup"));
    assert_eq!(row_state(&mut engine, "guide"), (true, false));
    assert_eq!(row_state(&mut engine, "docs"), (false, true));

    engine.select_toggle(&id("api"));
    // `archive` is disabled and does not count.
    assert_eq!(row_state(&mut engine, "docs"), (true, false));
    assert_eq!(row_state(&mut engine, "archive"), (false, false));
}

#[test]
fn test_hierarchical_toggle_covers_enabled_subtree() {
    let mut engine = engine(SelectionConfig::hierarchical());
    engine.select_toggle(&id("docs"));
    assert_eq!(
        selected(&engine),
        ["docs", "guide", "intro", "setup", "api", "parser", "lexer"]
    );
    assert_eq!(row_state(&mut engine, "docs"), (true, false));

    engine.select_toggle(&id("docs"));
    assert!(selected(&engine).is_empty());
}

#[test]
fn test_hierarchical_partial_toggle_selects_rest() {
    let mut engine = engine(SelectionConfig::hierarchical());
    engine.select_toggle(&id("intro"));
    engine.select_toggle(&id("guide"));
    assert_eq!(row_state(&mut engine, "guide"), (true, false));

    engine.select_toggle(&id("intro"));
    assert_eq!(row_state(&mut engine, "guide"), (false, true));
    assert!(!engine.state().is_selected(&id("intro")));
}

#[test]
fn test_loaded_children_inherit_selected_parent() {
    let mut engine = engine(SelectionConfig::hierarchical());
    engine.select_toggle(&id("src"));
    engine.toggle_expand(&id("src"));
    engine
        .set_children_loaded(&id("src"), items(&["lib.rs", "main.rs"]))
        .unwrap();

    assert!(engine.state().is_selected(&id("lib.rs")));
    assert!(engine.state().is_selected(&id("main.rs")));
    assert_eq!(row_state(&mut engine, "src"), (true, false));
}

#[test]
fn test_mode_switch_normalizes_selection() {
    let mut engine = engine(SelectionConfig::multi());
    engine.select_toggle(&id("intro"));
    engine.select_toggle(&id("setup"));

    engine.configure(EngineConfig::default().with_selection(SelectionConfig::single()));
    assert!(selected(&engine).is_empty());

    engine.select_one(&id("intro"));
    let none = SelectionConfig {
        mode: SelectionMode::None,
        hierarchical: false,
    };
    engine.configure(EngineConfig::default().with_selection(none));
    assert!(selected(&engine).is_empty());
    assert!(!engine.select_one(&id("intro")));
    assert!(!engine.select_range(&id("docs"), &id("src")));
}

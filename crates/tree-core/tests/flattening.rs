mod common;

use common::{Fixture, Item, engine_with, expand_all, id, sample_engine, visible_ids};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[test]
fn test_collapsed_tree_shows_roots_only() {
    let mut engine = sample_engine();
    assert_eq!(visible_ids(&mut engine), ["docs", "src"]);
}

#[test]
fn test_expansion_inserts_children_in_order() {
    let mut engine = sample_engine();
    expand_all(&mut engine, &["docs", "guide"]);
    assert_eq!(
        visible_ids(&mut engine),
        ["docs", "guide", "intro", "setup", "api", "archive", "src"]
    );

    let levels: Vec<usize> = engine.get_visible_rows().iter().map(|row| row.level).collect();
    assert_eq!(levels, [0, 1, 2, 2, 1, 1, 0]);
}

#[test]
fn test_collapse_hides_descendants_and_keeps_their_expansion() {
    let mut engine = sample_engine();
    expand_all(&mut engine, &["docs", "guide", "api"]);
    engine.toggle_expand(&id("docs"));
    assert_eq!(visible_ids(&mut engine), ["docs", "src"]);
    assert!(engine.state().is_expanded(&id("guide")));

    engine.toggle_expand(&id("docs"));
    assert_eq!(
        visible_ids(&mut engine),
        ["docs", "guide", "intro", "setup", "api", "parser", "lexer", "archive", "src"]
    );
}

#[test]
fn test_hidden_nodes_gate_their_subtree() {
    let roots = vec![Item::dir(
        "a",
        vec![
            Item::leaf("b"),
            Item::dir("c", vec![Item::leaf("d")]).hidden(),
        ],
    )];
    let mut engine = engine_with(Fixture::default(), roots);
    expand_all(&mut engine, &["a", "c"]);
    assert_eq!(visible_ids(&mut engine), ["a", "b"]);
}

#[test]
fn test_row_fields() {
    let mut engine = sample_engine();
    expand_all(&mut engine, &["docs"]);
    let rows = engine.get_visible_rows();

    let docs = &rows[0];
    assert!(docs.expanded);
    assert!(!docs.is_leaf);
    assert_eq!(docs.parent_id, None);
    assert_eq!(docs.label, "docs");

    let archive = rows.iter().find(|row| row.id == id("archive")).unwrap();
    assert!(archive.disabled);
    assert_eq!(archive.parent_id, Some(id("docs")));

    let src = rows.iter().find(|row| row.id == id("src")).unwrap();
    assert!(!src.is_leaf, "unloaded children are expandable when the adapter loads them");
    assert!(!src.loading);
    assert_eq!(src.data.as_ref().map(|item| item.label.as_str()), Some("src"));
}

#[test]
fn test_unloaded_nodes_are_leaves_without_a_loader() {
    let mut engine = engine_with(Fixture::default(), vec![Item::lazy("src")]);
    let rows = engine.get_visible_rows();
    assert!(rows[0].is_leaf);
}

#[test]
fn test_projection_is_reused_until_state_changes() {
    let mut engine = sample_engine();
    let first = engine.projection();
    let second = engine.projection();
    assert!(Arc::ptr_eq(&first, &second));

    // No-op commands keep the cached projection.
    engine.toggle_expand(&id("missing"));
    engine.select_none();
    assert!(Arc::ptr_eq(&first, &engine.projection()));
    assert_eq!(engine.stats().projection_builds, 1);

    engine.toggle_expand(&id("docs"));
    let third = engine.projection();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(third.visible_len(), 5);
}

#[test]
fn test_rows_by_id_resolves_unflattened_nodes() {
    let mut engine = sample_engine();
    let rows = engine.get_row_view_models_by_id(&[id("setup"), id("missing"), id("docs")]);
    let ids: Vec<String> = rows.iter().map(|row| row.id.to_string()).collect();
    assert_eq!(ids, ["setup", "docs"]);
    assert_eq!(rows[0].level, 2);
    assert!(rows[0].is_leaf);
}

#[test]
fn test_adapter_change_invalidates_rows() {
    let mut engine = sample_engine();
    let before = engine.projection();
    engine.adapter_mut().lazy = false;
    let after = engine.projection();
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(after.row(&id("src")).unwrap().is_leaf);
}

#[test]
fn test_filtered_flat_list_matches_visible_rows() {
    let mut engine = sample_engine();
    expand_all(&mut engine, &["docs"]);
    let a: Vec<_> = engine.get_visible_rows().into_iter().map(|row| row.id).collect();
    let b: Vec<_> = engine.get_filtered_flat_list().into_iter().map(|row| row.id).collect();
    assert_eq!(a, b);
}

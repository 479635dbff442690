mod common;

use common::{Fixture, Item, engine_with, expand_all, id, sample_tree, visible_ids};
use pretty_assertions::assert_eq;
use tree_core::{
    EngineConfig, FilterInput, FilterMode, FilterQuery, FilteringConfig, HighlightRange,
    PaginationConfig, SelectionPolicy, TreeEngine,
};

fn filtered_engine(filtering: FilteringConfig) -> TreeEngine<Fixture> {
    let config = EngineConfig::default().with_filtering(filtering);
    let mut engine = TreeEngine::with_config(Fixture::lazy(), config);
    engine.init(sample_tree()).unwrap();
    engine
}

#[test]
fn test_filter_round_trip() {
    let mut engine = filtered_engine(FilteringConfig::default());
    assert!(engine.filter().is_none());

    assert!(engine.set_filter("  lex "));
    assert_eq!(engine.filter(), Some(&FilterQuery::text("lex")));

    // Same normalized query: no change.
    let version = engine.version();
    assert!(!engine.set_filter("lex"));
    assert!(!engine.set_filter(FilterQuery::text("lex ")));
    assert_eq!(engine.version(), version);

    assert!(engine.clear_filter());
    assert!(!engine.clear_filter());
    assert!(!engine.set_filter("   "));
    assert!(!engine.set_filter(FilterInput::None));
}

#[test]
fn test_matches_keep_their_ancestors() {
    let mut engine = filtered_engine(FilteringConfig::default());
    engine.set_filter("LEX");
    assert_eq!(visible_ids(&mut engine), ["docs"]);

    expand_all(&mut engine, &["docs", "api"]);
    assert_eq!(visible_ids(&mut engine), ["docs", "api", "lexer"]);

    engine.clear_filter();
    assert_eq!(
        visible_ids(&mut engine),
        ["docs", "guide", "api", "parser", "lexer", "archive", "src"]
    );
}

#[test]
fn test_matches_without_ancestors() {
    let mut engine = filtered_engine(FilteringConfig {
        show_parents_of_matches: false,
        ..FilteringConfig::default()
    });
    expand_all(&mut engine, &["docs", "api"]);
    engine.set_filter("lex");
    assert_eq!(visible_ids(&mut engine), ["lexer"]);
}

#[test]
fn test_auto_expand_reveals_matches() {
    let mut engine = filtered_engine(FilteringConfig {
        auto_expand_matches: true,
        ..FilteringConfig::default()
    });
    engine.set_filter("se");
    assert_eq!(
        visible_ids(&mut engine),
        ["docs", "guide", "setup", "api", "parser"]
    );
    assert!(!engine.state().is_expanded(&id("archive")));
}

#[test]
fn test_reapply_after_more_data_loaded() {
    let mut engine = filtered_engine(FilteringConfig {
        auto_expand_matches: true,
        ..FilteringConfig::default()
    });
    engine.set_filter("main");
    assert!(engine.toggle_expand(&id("src")));
    engine
        .set_children_loaded(&id("src"), vec![Item::dir("bin", vec![Item::leaf("main.rs")])])
        .unwrap();
    assert_eq!(visible_ids(&mut engine), ["src", "bin"]);

    assert!(engine.reapply_filter());
    assert_eq!(visible_ids(&mut engine), ["src", "bin", "main.rs"]);
    assert!(!engine.reapply_filter());
}

#[test]
fn test_highlights_only_direct_matches() {
    let mut engine = filtered_engine(FilteringConfig::default());
    expand_all(&mut engine, &["docs", "api"]);
    engine.set_filter("lex");

    let rows = engine.get_visible_rows();
    assert_eq!(rows[1].highlight_ranges, None);
    assert_eq!(rows[2].highlight_ranges, Some(vec![HighlightRange::new(0, 3)]));

    engine.set_filter(FilterQuery::exact("lexer"));
    let rows = engine.get_visible_rows();
    assert_eq!(rows[2].highlight_ranges, Some(vec![HighlightRange::new(0, 5)]));
}

#[test]
fn test_exact_and_token_queries() {
    let mut engine = filtered_engine(FilteringConfig {
        show_parents_of_matches: false,
        ..FilteringConfig::default()
    });
    expand_all(&mut engine, &["docs", "guide", "api"]);

    engine.set_filter(FilterQuery::exact("parse"));
    assert!(visible_ids(&mut engine).is_empty());

    engine.set_filter(FilterQuery::text("se").with_token("tup"));
    assert_eq!(visible_ids(&mut engine), ["setup"]);

    engine.set_filter(FilterQuery::text("Lexer").with_case_sensitive(true));
    assert!(visible_ids(&mut engine).is_empty());
}

#[test]
fn test_server_mode_trusts_the_data_source() {
    let mut engine = filtered_engine(FilteringConfig {
        mode: FilterMode::Server,
        auto_expand_matches: true,
        ..FilteringConfig::default()
    });
    expand_all(&mut engine, &["docs"]);
    engine.set_filter("no such label");

    assert_eq!(
        visible_ids(&mut engine),
        ["docs", "guide", "api", "archive", "src"]
    );
    assert!(
        engine
            .get_visible_rows()
            .iter()
            .all(|row| row.highlight_ranges.is_none())
    );
    assert!(!engine.state().is_expanded(&id("guide")));
}

#[test]
fn test_clear_hidden_selection_policy() {
    let mut engine = filtered_engine(FilteringConfig {
        selection_policy: SelectionPolicy::ClearHidden,
        ..FilteringConfig::default()
    });
    engine.select_one(&id("intro"));
    engine.set_filter("lex");
    assert!(engine.state().selected.is_empty());

    let mut keep = filtered_engine(FilteringConfig::default());
    keep.select_one(&id("intro"));
    keep.set_filter("lex");
    assert!(keep.state().is_selected(&id("intro")));
}

#[test]
fn test_placeholders_under_a_query() {
    let build = |keep_placeholders_visible| {
        let config = EngineConfig::default().with_filtering(FilteringConfig {
            keep_placeholders_visible,
            ..FilteringConfig::default()
        });
        let mut engine = TreeEngine::with_config(Fixture::lazy(), config);
        engine.init(vec![Item::lazy("catalog")]).unwrap();
        engine
            .set_pagination(&id("catalog"), Some(PaginationConfig::new(2).with_total_count(2)))
            .unwrap();
        engine.toggle_expand(&id("catalog"));
        engine.set_filter("cat");
        engine
    };

    let mut hidden = build(false);
    assert_eq!(visible_ids(&mut hidden), ["catalog"]);

    let mut kept = build(true);
    assert_eq!(
        visible_ids(&mut kept),
        ["catalog", "catalog#placeholder:0", "catalog#placeholder:1"]
    );
}

#[test]
fn test_hidden_nodes_never_match() {
    let roots = vec![Item::dir(
        "root",
        vec![Item::leaf("visible-match"), Item::leaf("hidden-match").hidden()],
    )];
    let mut engine = engine_with(Fixture::default(), roots);
    expand_all(&mut engine, &["root"]);
    engine.set_filter("match");
    assert_eq!(visible_ids(&mut engine), ["root", "visible-match"]);
}

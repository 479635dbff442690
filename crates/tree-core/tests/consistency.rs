//! Randomized command sequences against the engine, checking structural invariants after every
//! step.

mod common;

use common::{Fixture, Item, id, sample_tree};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use tree_core::index::ancestors;
use tree_core::{
    EngineConfig, NodeId, PageResult, PaginationConfig, RowRange, SelectionConfig, TreeEngine,
};

const PAGE_SIZE: usize = 5;
const TOTAL: usize = 40;

fn engine(selection: SelectionConfig) -> TreeEngine<Fixture> {
    let mut roots = sample_tree();
    roots.push(Item::lazy("catalog"));
    let config = EngineConfig::default().with_selection(selection);
    let mut engine = TreeEngine::with_config(Fixture::lazy(), config);
    engine.init(roots).unwrap();
    engine
        .set_pagination(
            &id("catalog"),
            Some(PaginationConfig::new(PAGE_SIZE).with_total_count(TOTAL)),
        )
        .unwrap();
    engine
}

fn step(engine: &mut TreeEngine<Fixture>, rng: &mut StdRng) {
    let ids: Vec<NodeId> = engine.state().nodes.keys().cloned().collect();
    match rng.gen_range(0..6) {
        0 => {
            let target = ids.choose(rng).unwrap().clone();
            if engine.toggle_expand(&target) && target == id("src") {
                let children = (0..rng.gen_range(0..4))
                    .map(|k| Item::leaf(&format!("src-{k}")))
                    .collect();
                engine.set_children_loaded(&target, children).unwrap();
            }
        }
        1 => {
            let start = rng.gen_range(0..TOTAL + 5);
            let end = rng.gen_range(0..TOTAL + 5);
            let parent = id("catalog");
            let pages = engine
                .ensure_range_loaded(&parent, RowRange::new(start, end))
                .unwrap();
            for page_index in pages {
                if rng.gen_bool(0.7) {
                    let request = engine.page_request(&parent, page_index).unwrap();
                    let items = (request.offset..request.offset + PAGE_SIZE)
                        .map(|row| Item::leaf(&format!("item-{row}")))
                        .collect();
                    engine
                        .apply_paged_children(&parent, request, PageResult::Items(items))
                        .unwrap();
                } else {
                    engine.set_page_error(&parent, page_index, "flaky").unwrap();
                }
            }
        }
        2 => {
            let target = ids.choose(rng).unwrap().clone();
            engine.select_toggle(&target);
        }
        3 => {
            let query = ["", "item-1", "e", "2"].choose(rng).unwrap();
            engine.set_filter(*query);
        }
        4 => {
            let visible = engine.projection().visible_ids.clone();
            if let (Some(from), Some(to)) = (visible.choose(rng), visible.choose(rng)) {
                engine.select_range(from, to);
            }
        }
        _ => {
            let target = ids.choose(rng).unwrap().clone();
            engine.expand_path(&target);
        }
    }
}

fn check_invariants(engine: &mut TreeEngine<Fixture>) {
    let rows = engine.get_visible_rows();
    let state = engine.state();

    let mut seen = HashSet::new();
    for row in &rows {
        assert!(seen.insert(row.id.clone()), "{} is listed twice", row.id);
        for ancestor in ancestors(&state.nodes, &row.id) {
            assert!(
                state.is_expanded(&ancestor),
                "{} is visible under collapsed {ancestor}",
                row.id
            );
        }
        if row.placeholder {
            assert!(row.disabled && row.is_leaf && !row.selected);
        }
    }

    for selected in state.selected.iter() {
        let node = state.node(selected).expect("selected ids exist");
        assert!(node.is_selectable(), "{selected} is not selectable");
    }
    for loading in state.loading.iter() {
        assert!(state.nodes.contains_key(loading));
    }

    let catalog = state.node(&id("catalog")).unwrap();
    assert_eq!(catalog.children().len(), TOTAL);
    for (index, child) in catalog.children().iter().enumerate() {
        let node = state.node(child).expect("every slot is backed by a node");
        assert_eq!(node.parent_id.as_ref(), Some(&id("catalog")));
        if node.placeholder {
            assert_eq!(node.placeholder_index, Some(index));
        }
    }
}

#[test]
fn test_random_sessions_keep_invariants() {
    for (seed, selection) in [
        (7, SelectionConfig::single()),
        (11, SelectionConfig::multi()),
        (42, SelectionConfig::hierarchical()),
    ] {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut engine = engine(selection);
        for _ in 0..300 {
            step(&mut engine, &mut rng);
            check_invariants(&mut engine);
        }
    }
}

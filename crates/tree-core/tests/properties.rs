mod common;

use common::{Fixture, Item, engine_with, id, visible_ids};
use proptest::prelude::*;
use tree_core::{PaginationConfig, RowRange};

/// Build a forest from parent links: `parents[i]` is `None` for a root, otherwise an index
/// below `i`.
fn forest(parents: &[Option<usize>]) -> Vec<Item> {
    fn build(index: usize, children: &[Vec<usize>]) -> Item {
        let key = format!("n{index}");
        if children[index].is_empty() {
            Item::leaf(&key)
        } else {
            Item::dir(
                &key,
                children[index].iter().map(|child| build(*child, children)).collect(),
            )
        }
    }

    let mut children = vec![Vec::new(); parents.len()];
    for (index, parent) in parents.iter().enumerate() {
        if let Some(parent) = parent {
            children[*parent].push(index);
        }
    }
    parents
        .iter()
        .enumerate()
        .filter(|(_, parent)| parent.is_none())
        .map(|(index, _)| build(index, &children))
        .collect()
}

fn parent_links() -> impl Strategy<Value = Vec<Option<usize>>> {
    prop::collection::vec(any::<(bool, prop::sample::Index)>(), 1..40).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(index, (root, pick))| (index > 0 && !root).then(|| pick.index(index)))
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_flattening_is_deterministic(
        parents in parent_links(),
        expanded in prop::collection::vec(any::<prop::sample::Index>(), 0..20),
    ) {
        let run = || {
            let mut engine = engine_with(Fixture::default(), forest(&parents));
            for pick in &expanded {
                let key = format!("n{}", pick.index(parents.len()));
                if !engine.state().is_expanded(&id(&key)) {
                    engine.toggle_expand(&id(&key));
                }
            }
            visible_ids(&mut engine)
        };
        prop_assert_eq!(run(), run());
    }

    #[test]
    fn prop_collapse_removes_exactly_the_visible_descendants(
        parents in parent_links(),
        target in any::<prop::sample::Index>(),
    ) {
        let mut engine = engine_with(Fixture::default(), forest(&parents));
        for index in 0..parents.len() {
            engine.toggle_expand(&id(&format!("n{index}")));
        }
        let before = engine.get_visible_rows();
        let key = format!("n{}", target.index(parents.len()));
        let position = before.iter().position(|row| row.id == id(&key)).unwrap();
        let level = before[position].level;
        let run_end = before[position + 1..]
            .iter()
            .position(|row| row.level <= level)
            .map_or(before.len(), |offset| position + 1 + offset);

        engine.toggle_expand(&id(&key));
        let after: Vec<String> = visible_ids(&mut engine);

        let mut expected: Vec<String> = before.iter().map(|row| row.id.to_string()).collect();
        if !before[position].is_leaf {
            expected.drain(position + 1..run_end);
        }
        prop_assert_eq!(after, expected);
    }

    #[test]
    fn prop_range_maps_to_covering_pages(
        page_size in 1usize..20,
        total in 0usize..300,
        a in 0usize..400,
        b in 0usize..400,
    ) {
        let mut engine = engine_with(Fixture::lazy(), vec![Item::lazy("catalog")]);
        let parent = id("catalog");
        engine
            .set_pagination(&parent, Some(PaginationConfig::new(page_size).with_total_count(total)))
            .unwrap();

        let range = RowRange::new(a, b);
        let pages = engine.ensure_range_loaded(&parent, range).unwrap();
        let expected: Vec<usize> = if total == 0 {
            Vec::new()
        } else {
            let first = range.start.min(total - 1) / page_size;
            let last = range.end.min(total - 1) / page_size;
            (first..=last).collect()
        };
        prop_assert_eq!(pages, expected);
        prop_assert!(engine.ensure_range_loaded(&parent, range).unwrap().is_empty());
    }
}

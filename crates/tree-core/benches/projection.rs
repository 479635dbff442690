use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tree_core::{NodeId, PageResult, PaginationConfig, RowRange, TreeAdapter, TreeEngine};

struct Catalog;

impl TreeAdapter for Catalog {
    type Source = (String, Vec<String>);
    type Data = String;

    fn id(&self, source: &Self::Source) -> NodeId {
        NodeId::key(&source.0)
    }

    fn to_data(&self, source: Self::Source) -> Self::Data {
        source.0
    }

    fn label(&self, data: &Self::Data) -> String {
        data.clone()
    }

    fn children(&self, source: &Self::Source) -> Option<Vec<Self::Source>> {
        Some(source.1.iter().map(|name| (name.clone(), Vec::new())).collect())
    }

    fn loads_children(&self) -> bool {
        true
    }
}

/// `groups` expanded folders of `per_group` children each.
fn wide_tree(groups: usize, per_group: usize) -> TreeEngine<Catalog> {
    let roots = (0..groups)
        .map(|g| {
            let children = (0..per_group).map(|c| format!("g{g}/item{c}")).collect();
            (format!("g{g}"), children)
        })
        .collect();
    let mut engine = TreeEngine::new(Catalog);
    engine.init(roots).unwrap();
    for g in 0..groups {
        engine.toggle_expand(&NodeId::key(format!("g{g}")));
    }
    engine
}

/// One expanded parent with `total` paginated children.
fn paged_tree(total: usize, page_size: usize) -> TreeEngine<Catalog> {
    let mut engine = TreeEngine::new(Catalog);
    engine.init(vec![("catalog".to_string(), Vec::new())]).unwrap();
    let parent = NodeId::key("catalog");
    engine
        .set_pagination(&parent, Some(PaginationConfig::new(page_size).with_total_count(total)))
        .unwrap();
    engine.toggle_expand(&parent);
    engine
}

fn bench_projection_rebuild(c: &mut Criterion) {
    let mut engine = wide_tree(100, 500);
    let mut rng = StdRng::seed_from_u64(17);
    c.bench_function("projection_rebuild/50k_rows", |b| {
        b.iter(|| {
            // Toggle selection so every iteration invalidates the projection.
            let g = rng.gen_range(0..100);
            let item = rng.gen_range(0..500);
            engine.select_one(&NodeId::key(format!("g{g}/item{item}")));
            black_box(engine.projection().visible_len());
        })
    });
}

fn bench_projection_cached(c: &mut Criterion) {
    let mut engine = wide_tree(100, 500);
    engine.projection();
    c.bench_function("projection_cached/50k_rows", |b| {
        b.iter(|| black_box(engine.projection().visible_len()))
    });
}

fn bench_filter(c: &mut Criterion) {
    let mut engine = wide_tree(100, 500);
    c.bench_function("filter/50k_rows", |b| {
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            engine.set_filter(if flip { "item42" } else { "item7" });
            black_box(engine.projection().visible_len());
        })
    });
}

fn bench_scroll_paged(c: &mut Criterion) {
    let total = 100_000;
    let page_size = 100;
    c.bench_function("scroll_paged/100k_children", |b| {
        b.iter_batched(
            || (paged_tree(total, page_size), StdRng::seed_from_u64(3)),
            |(mut engine, mut rng)| {
                let parent = NodeId::key("catalog");
                for _ in 0..20 {
                    let start = rng.gen_range(0..total - 60);
                    let pages = engine
                        .ensure_range_loaded(&parent, RowRange::new(start, start + 60))
                        .unwrap();
                    for page_index in pages {
                        let request = engine.page_request(&parent, page_index).unwrap();
                        let items = (request.offset..request.offset + page_size)
                            .map(|row| (format!("row{row}"), Vec::new()))
                            .collect();
                        engine
                            .apply_paged_children(&parent, request, PageResult::Items(items))
                            .unwrap();
                    }
                }
                black_box(engine.projection().visible_len());
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(
    benches,
    bench_projection_rebuild,
    bench_projection_cached,
    bench_filter,
    bench_scroll_paged
);
criterion_main!(benches);

//! Paged catalog example
//!
//! Simulates a virtualized list over a large remote collection: the viewport scrolls, the engine
//! reports which pages to fetch, and a fake data source answers (or fails).
//!
//! Run with `RUST_LOG=debug` to see the engine's decisions.

use tree_core::{
    NodeId, PageRequest, PageResult, PaginationConfig, RowRange, TreeAdapter, TreeEngine,
    TreeResult,
};

#[derive(Debug, Clone)]
struct Product {
    sku: String,
    name: String,
}

struct Catalog;

impl TreeAdapter for Catalog {
    type Source = Product;
    type Data = Product;

    fn id(&self, source: &Product) -> NodeId {
        NodeId::key(&source.sku)
    }

    fn to_data(&self, source: Product) -> Product {
        source
    }

    fn label(&self, data: &Product) -> String {
        data.name.clone()
    }

    fn children(&self, source: &Product) -> Option<Vec<Product>> {
        // Products are leaves; the root category is paginated.
        (source.sku != "all").then(Vec::new)
    }
}

/// Fake data source: page 3 fails on the first attempt.
struct Backend {
    total: usize,
    failed_once: bool,
}

impl Backend {
    fn fetch(&mut self, request: &PageRequest) -> Result<PageResult<Product>, String> {
        if request.page_index == 3 && !self.failed_once {
            self.failed_once = true;
            return Err("503 Service Unavailable".to_string());
        }
        let end = (request.offset + request.page_size).min(self.total);
        let items = (request.offset..end)
            .map(|row| Product {
                sku: format!("sku-{row:05}"),
                name: format!("Product #{row}"),
            })
            .collect();
        Ok(PageResult::Counted {
            items,
            total_count: self.total,
        })
    }
}

fn scroll_to(
    engine: &mut TreeEngine<Catalog>,
    backend: &mut Backend,
    first_row: usize,
    height: usize,
) -> TreeResult<()> {
    let parent = NodeId::key("all");
    let pages = engine.ensure_range_loaded(&parent, RowRange::new(first_row, first_row + height - 1))?;
    println!("  rows {first_row}..{}: fetching pages {pages:?}", first_row + height - 1);

    for page_index in pages {
        let request = engine.page_request(&parent, page_index)?;
        match backend.fetch(&request) {
            Ok(result) => engine.apply_paged_children(&parent, request, result)?,
            Err(err) => {
                println!("  page {page_index} failed: {err}");
                engine.set_page_error(&parent, page_index, err)?;
            }
        }
    }
    Ok(())
}

fn print_window(engine: &mut TreeEngine<Catalog>, first_row: usize, height: usize) {
    // Row 0 is the category itself.
    for row in engine.get_visible_rows().iter().skip(first_row + 1).take(height) {
        let marker = if row.error {
            "!"
        } else if row.loading {
            "~"
        } else if row.placeholder {
            "?"
        } else {
            " "
        };
        println!("    {marker} {}", row.label);
    }
}

fn main() -> TreeResult<()> {
    env_logger::init();
    println!("=== Paged catalog example ===\n");

    let mut engine = TreeEngine::new(Catalog);
    engine.init(vec![Product {
        sku: "all".to_string(),
        name: "All products".to_string(),
    }])?;

    let parent = NodeId::key("all");
    engine.set_pagination(&parent, Some(PaginationConfig::new(20).with_total_count(200)))?;
    engine.toggle_expand(&parent);

    let mut backend = Backend {
        total: 200,
        failed_once: false,
    };

    println!("1. Initial viewport:");
    scroll_to(&mut engine, &mut backend, 0, 8)?;
    print_window(&mut engine, 0, 8);

    println!("\n2. Scroll into a failing page:");
    scroll_to(&mut engine, &mut backend, 56, 8)?;
    print_window(&mut engine, 56, 8);

    println!("\n3. Scroll back: nothing to fetch");
    scroll_to(&mut engine, &mut backend, 0, 8)?;

    println!("\n4. Retry the failed page:");
    scroll_to(&mut engine, &mut backend, 60, 4)?;
    print_window(&mut engine, 60, 4);

    if let Some(debug) = engine.get_paged_node_debug_state(&parent) {
        println!("\n5. Paging state:");
        println!("  loaded pages: {:?}", debug.loaded_pages);
        println!("  placeholders: {}/{}", debug.placeholder_count, debug.slot_count);
    }

    let stats = engine.stats();
    println!("\n6. Stats:");
    println!("  nodes: {}", stats.node_count);
    println!("  visible rows: {}", stats.visible_row_count);
    println!("  projection builds: {}", stats.projection_builds);
    Ok(())
}

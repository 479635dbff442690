#![allow(dead_code)]

use std::collections::HashMap;
use tree_core::{LeafContext, Node, NodeId, PaginationConfig, PathStep, TreeAdapter, TreeEngine};

/// A host item: a file-tree entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub label: String,
    pub children: Option<Vec<Item>>,
    pub disabled: bool,
    pub hidden: bool,
    pub leaf: bool,
}

impl Item {
    /// A file: never expands.
    pub fn leaf(id: &str) -> Self {
        Self {
            id: id.to_string(),
            label: id.to_string(),
            children: Some(Vec::new()),
            disabled: false,
            hidden: false,
            leaf: true,
        }
    }

    /// A directory with eagerly known children.
    pub fn dir(id: &str, children: Vec<Item>) -> Self {
        Self {
            children: Some(children),
            leaf: false,
            ..Self::leaf(id)
        }
    }

    /// A directory whose children still have to be loaded.
    pub fn lazy(id: &str) -> Self {
        Self {
            children: None,
            leaf: false,
            ..Self::leaf(id)
        }
    }

    pub fn labeled(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// Adapter over [`Item`].
#[derive(Debug, Default)]
pub struct Fixture {
    pub lazy: bool,
    pub paths: HashMap<String, Vec<PathStep>>,
    pub pagination: HashMap<String, PaginationConfig>,
}

impl Fixture {
    pub fn lazy() -> Self {
        Self {
            lazy: true,
            ..Self::default()
        }
    }
}

impl TreeAdapter for Fixture {
    type Source = Item;
    type Data = Item;

    fn id(&self, source: &Item) -> NodeId {
        NodeId::key(&source.id)
    }

    fn to_data(&self, source: Item) -> Item {
        Item {
            children: None,
            ..source
        }
    }

    fn label(&self, data: &Item) -> String {
        data.label.clone()
    }

    fn is_disabled(&self, data: &Item) -> bool {
        data.disabled
    }

    fn is_visible(&self, data: &Item) -> bool {
        !data.hidden
    }

    fn is_leaf(&self, data: &Item, _ctx: &LeafContext<'_>) -> Option<bool> {
        data.leaf.then_some(true)
    }

    fn children(&self, source: &Item) -> Option<Vec<Item>> {
        source.children.clone()
    }

    fn pagination(&self, node: &Node<Item>) -> Option<PaginationConfig> {
        node.id.as_key().and_then(|key| self.pagination.get(key)).copied()
    }

    fn loads_children(&self) -> bool {
        self.lazy
    }

    fn resolve_path_to_node(&self, target: &NodeId) -> Option<Vec<PathStep>> {
        target.as_key().and_then(|key| self.paths.get(key)).cloned()
    }
}

pub fn id(key: &str) -> NodeId {
    NodeId::key(key)
}

/// ```text
/// docs
///   guide
///     intro
///     setup
///   api
///     parser
///     lexer
///   archive (disabled)
///     old
/// src (lazy)
/// ```
pub fn sample_tree() -> Vec<Item> {
    vec![
        Item::dir(
            "docs",
            vec![
                Item::dir("guide", vec![Item::leaf("intro"), Item::leaf("setup")]),
                Item::dir("api", vec![Item::leaf("parser"), Item::leaf("lexer")]),
                Item::dir("archive", vec![Item::leaf("old")]).disabled(),
            ],
        ),
        Item::lazy("src"),
    ]
}

pub fn engine_with(adapter: Fixture, roots: Vec<Item>) -> TreeEngine<Fixture> {
    let mut engine = TreeEngine::new(adapter);
    engine.init(roots).unwrap();
    engine
}

pub fn sample_engine() -> TreeEngine<Fixture> {
    engine_with(Fixture::lazy(), sample_tree())
}

/// Expand every id, in order.
pub fn expand_all(engine: &mut TreeEngine<Fixture>, ids: &[&str]) {
    for key in ids {
        if !engine.state().is_expanded(&id(key)) {
            engine.toggle_expand(&id(key));
        }
    }
}

/// Visible row ids as strings (placeholders render as `parent#placeholder:index`).
pub fn visible_ids(engine: &mut TreeEngine<Fixture>) -> Vec<String> {
    engine
        .get_visible_rows()
        .iter()
        .map(|row| row.id.to_string())
        .collect()
}

pub fn items(ids: &[&str]) -> Vec<Item> {
    ids.iter().map(|key| Item::leaf(key)).collect()
}

//! The content tree: parts, chapters, and sections in reading order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rustc_hash::FxHashMap;

use crate::config::{NodeSpec, Settings};
use crate::error::{ErrorKind, Result};

/// A handle to a [`Node`] in a [`ContentTree`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// One addressable unit of the document: a part, chapter, or section.
#[derive(Debug, Clone)]
pub struct Node {
    pub handle: NodeId,
    /// The user-authored path segment.
    pub slug: String,
    /// The dotted path of slugs from the root. Empty for the root.
    pub id: String,
    /// Depth in the tree; the root is at level 0.
    pub level: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Index of this node in its parent's `children`.
    pub position: usize,
    pub title: String,
    pub summary: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub tags: BTreeSet<String>,
    /// Effective configuration: defaults overlaid by every ancestor's
    /// overrides and then the node's own.
    pub config: toml::Table,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The id as a relative path: `part.chapter` becomes `part/chapter`.
    pub fn path(&self) -> String {
        self.id.replace('.', "/")
    }

    /// A fragment identifier unique to this node.
    pub fn anchor(&self) -> String {
        crate::util::slugify(&self.id)
    }

    /// The title, falling back to the slug for nodes not yet harvested.
    pub fn label(&self) -> &str {
        match self.title.is_empty() {
            true => &self.slug,
            false => &self.title,
        }
    }
}

/// A rooted, ordered tree of [`Node`]s stored in an arena.
///
/// The root is a distinguished node with an empty slug and id. It is never
/// part of the reading order: [`ContentTree::linear()`] starts at the
/// root's first child.
#[derive(Debug, Clone)]
pub struct ContentTree {
    nodes: Vec<Node>,
    ids: FxHashMap<String, NodeId>,
}

impl Default for ContentTree {
    fn default() -> Self {
        ContentTree::new()
    }
}

impl ContentTree {
    /// A tree holding only the root.
    pub fn new() -> Self {
        let root = Node {
            handle: NodeId(0),
            slug: String::new(),
            id: String::new(),
            level: 0,
            parent: None,
            children: vec![],
            position: 0,
            title: String::new(),
            summary: None,
            metadata: BTreeMap::new(),
            tags: BTreeSet::new(),
            config: toml::Table::new(),
        };

        ContentTree { nodes: vec![root], ids: FxHashMap::default() }
    }

    /// Builds a tree depth-first from the declarative structure, starting
    /// every node's configuration from `defaults`.
    pub fn build(specs: &[NodeSpec], defaults: &toml::Table) -> Result<Self> {
        fn _build(tree: &mut ContentTree, parent: NodeId, spec: &NodeSpec) -> Result<()> {
            let id = tree.insert(parent, spec)?;
            spec.children.iter().try_for_each(|child| _build(tree, id, child))
        }

        let mut tree = ContentTree::new();
        let root = tree.root_id();
        tree[root].config = defaults.clone();
        for spec in specs {
            _build(&mut tree, root, spec)?;
        }

        Ok(tree)
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        ContentTree::build(&settings.structure, &settings.defaults)
    }

    /// Appends a child described by `spec` (ignoring its children) to
    /// `parent`.
    pub fn insert(&mut self, parent: NodeId, spec: &NodeSpec) -> Result<NodeId> {
        let slug = spec.slug.as_str();
        if slug.is_empty() || slug.contains('.') {
            return Err(error! {
                "invalid node slug",
                "slug" => format!("{slug:?}"),
            }.with_kind(ErrorKind::Config));
        }

        let handle = NodeId(self.nodes.len());
        let parent_node = &self[parent];
        let id = match parent_node.is_root() {
            true => slug.to_string(),
            false => format!("{}.{}", parent_node.id, slug),
        };

        if self.ids.contains_key(&id) {
            return Err(error! {
                "duplicate node in structure definition",
                "id" => id,
            }.with_kind(ErrorKind::Config));
        }

        let mut config = parent_node.config.clone();
        config.extend(spec.config.iter().map(|(k, v)| (k.clone(), v.clone())));

        let node = Node {
            handle,
            slug: slug.to_string(),
            id: id.clone(),
            level: parent_node.level + 1,
            parent: Some(parent),
            children: vec![],
            position: parent_node.children.len(),
            title: String::new(),
            summary: None,
            metadata: BTreeMap::new(),
            tags: spec.tags.iter().cloned().collect(),
            config,
        };

        self.nodes.push(node);
        self.ids.insert(id, handle);
        self[parent].children.push(handle);
        Ok(handle)
    }

    /// The number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if the tree holds nothing but the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn root(&self) -> &Node {
        &self[self.root_id()]
    }

    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    /// The first node in reading order.
    pub fn first(&self) -> Option<NodeId> {
        self.root().children.first().copied()
    }

    /// The last node in reading order.
    pub fn last(&self) -> Option<NodeId> {
        let last = self.root().children.last().copied()?;
        Some(self.last_descendant(last))
    }

    fn last_descendant(&self, mut node: NodeId) -> NodeId {
        while let Some(&child) = self[node].children.last() {
            node = child;
        }

        node
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let node = &self[node];
        let parent = &self[node.parent?];
        parent.children.get(node.position + 1).copied()
    }

    fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        let node = &self[node];
        let parent = &self[node.parent?];
        node.position.checked_sub(1).map(|i| parent.children[i])
    }

    /// The node following `node` in reading order: its first child, else
    /// the next sibling of the nearest ancestor-or-self that has one.
    pub fn successor(&self, node: NodeId) -> Option<NodeId> {
        if let Some(&child) = self[node].children.first() {
            return Some(child);
        }

        let mut current = node;
        loop {
            if let Some(sibling) = self.next_sibling(current) {
                return Some(sibling);
            }

            current = self[current].parent?;
        }
    }

    /// The node preceding `node` in reading order: the last descendant of
    /// its previous sibling, else its parent unless that is the root.
    pub fn predecessor(&self, node: NodeId) -> Option<NodeId> {
        if let Some(sibling) = self.previous_sibling(node) {
            return Some(self.last_descendant(sibling));
        }

        self[node].parent.filter(|&parent| parent != self.root_id())
    }

    /// All non-root nodes in reading order.
    pub fn linear(&self) -> Linear<'_> {
        Linear { tree: self, next: self.first() }
    }

    /// The strict descendants of `root` in reading order.
    pub fn descendants(&self, root: NodeId) -> Dfs<'_> {
        Dfs { tree: self, stack: self[root].children.iter().rev().copied().collect() }
    }

    pub fn ancestors_of(&self, mut node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::from_fn(move || {
            let parent = self[node].parent?;
            node = parent;
            Some(parent)
        })
    }

    /// The node with the dotted id `id`.
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.ids.get(id).map(|&handle| &self[handle])
    }

    /// The node whose own slug is `slug`, searching depth-first.
    ///
    /// Slugs need only be unique among siblings, so a slug may name several
    /// nodes at different depths. Such a lookup is an error of kind
    /// [`ErrorKind::AmbiguousLookup`] rather than a silent first match; use
    /// [`ContentTree::get()`] with the full id instead.
    pub fn find(&self, slug: &str) -> Result<Option<&Node>> {
        let mut matches = self.descendants(self.root_id())
            .nodes()
            .filter(|node| node.slug == slug);

        let Some(first) = matches.next() else {
            return Ok(None);
        };

        let rest: Vec<_> = matches.map(|node| node.id.as_str()).collect();
        if !rest.is_empty() {
            return Err(error! {
                format!("slug `{slug}` names more than one node"),
                "use the node's full dotted id instead",
                "first match" => &first.id,
                "other matches" => rest.join(", "),
            }.with_kind(ErrorKind::AmbiguousLookup));
        }

        Ok(Some(first))
    }
}

/// Iterator over a tree in reading order, following
/// [`ContentTree::successor()`].
pub struct Linear<'a> {
    tree: &'a ContentTree,
    next: Option<NodeId>,
}

impl<'a> Linear<'a> {
    #[inline]
    pub fn nodes(self) -> impl Iterator<Item = &'a Node> {
        let tree = self.tree;
        self.map(move |id| &tree[id])
    }
}

impl Iterator for Linear<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = self.tree.successor(node);
        Some(node)
    }
}

/// Pre-order depth-first iterator over a subtree.
pub struct Dfs<'a> {
    tree: &'a ContentTree,
    stack: Vec<NodeId>,
}

impl<'a> Dfs<'a> {
    #[inline]
    pub fn nodes(self) -> impl Iterator<Item = &'a Node> {
        let tree = self.tree;
        self.map(move |id| &tree[id])
    }
}

impl Iterator for Dfs<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(self.tree[node].children.iter().rev().copied());
        Some(node)
    }
}

impl std::ops::Index<NodeId> for ContentTree {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output {
        &self.nodes[index.0]
    }
}

impl std::ops::IndexMut<NodeId> for ContentTree {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output {
        &mut self.nodes[index.0]
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn book() -> ContentTree {
        let specs = [
            NodeSpec::new("intro"),
            NodeSpec::new("part1")
                .child(NodeSpec::new("ch1").child(NodeSpec::new("s1")).child(NodeSpec::new("s2")))
                .child(NodeSpec::new("ch2")),
            NodeSpec::new("part2").child(NodeSpec::new("intro")),
        ];

        ContentTree::build(&specs, &toml::Table::new()).unwrap()
    }

    fn ids(tree: &ContentTree) -> Vec<&str> {
        tree.linear().nodes().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn ids_levels_and_order() {
        let tree = book();
        assert_eq!(ids(&tree), [
            "intro", "part1", "part1.ch1", "part1.ch1.s1", "part1.ch1.s2",
            "part1.ch2", "part2", "part2.intro",
        ]);

        let s2 = tree.get("part1.ch1.s2").unwrap();
        assert_eq!(s2.level, 3);
        assert_eq!(s2.slug, "s2");
        assert_eq!(tree[s2.parent.unwrap()].id, "part1.ch1");
        assert_eq!(tree.ancestors_of(s2.handle).count(), 3);
        assert_eq!(tree.root().id, "");
        assert_eq!(tree.root().level, 0);
    }

    #[test]
    fn successor_and_predecessor_at_boundaries() {
        let tree = book();
        let first = tree.first().unwrap();
        let last = tree.last().unwrap();
        assert_eq!(tree[first].id, "intro");
        assert_eq!(tree[last].id, "part2.intro");
        assert_eq!(tree.predecessor(first), None);
        assert_eq!(tree.successor(last), None);

        let ch2 = tree.get("part1.ch2").unwrap().handle;
        assert_eq!(tree[tree.predecessor(ch2).unwrap()].id, "part1.ch1.s2");
        let s1 = tree.get("part1.ch1.s1").unwrap().handle;
        assert_eq!(tree[tree.predecessor(s1).unwrap()].id, "part1.ch1");
        assert_eq!(tree[tree.successor(tree.get("part1.ch2").unwrap().handle).unwrap()].id, "part2");
    }

    #[test]
    fn find_by_slug() {
        let tree = book();
        assert_eq!(tree.find("ch2").unwrap().unwrap().id, "part1.ch2");
        assert!(tree.find("nope").unwrap().is_none());

        let error = tree.find("intro").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::AmbiguousLookup);
        assert!(error.to_string().contains("part2.intro"));
    }

    #[test]
    fn config_is_inherited() {
        let mut defaults = toml::Table::new();
        defaults.insert("numbered".into(), true.into());
        defaults.insert("theme".into(), "plain".into());

        let mut part = NodeSpec::new("part");
        part.config.insert("theme".into(), "dark".into());
        let mut chapter = NodeSpec::new("chapter");
        chapter.config.insert("numbered".into(), false.into());
        let part = part.child(chapter);

        let tree = ContentTree::build(&[part], &defaults).unwrap();
        let chapter = tree.get("part.chapter").unwrap();
        assert_eq!(chapter.config["theme"].as_str(), Some("dark"));
        assert_eq!(chapter.config["numbered"].as_bool(), Some(false));
        assert_eq!(tree.get("part").unwrap().config["numbered"].as_bool(), Some(true));
    }

    #[test]
    fn duplicate_siblings_are_rejected() {
        let specs = [NodeSpec::new("a"), NodeSpec::new("a")];
        let error = ContentTree::build(&specs, &toml::Table::new()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Config);
    }

    #[test]
    fn empty_tree() {
        let tree = ContentTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.first(), None);
        assert_eq!(tree.last(), None);
        assert_eq!(tree.linear().count(), 0);
    }
}

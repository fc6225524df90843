use std::cmp::Ordering;

use crate::config::BuildContext;
use crate::error::{ErrorKind, Result};
use crate::macros::{Args, Scope};
use crate::tree::Node;

/// The link target for `node` in the active output format.
///
/// Single-document formats link to an in-document anchor; everything else
/// links to a page per node.
pub fn link(node: &Node, context: &BuildContext) -> String {
    match context.format() {
        "ebook" | "epub" | "latex" | "markdown" => format!("#{}", node.anchor()),
        _ => format!("{}.html", node.path()),
    }
}

fn lookup<'a>(scope: &Scope<'a>, slug: &str) -> Result<&'a Node> {
    match scope.tree.find(slug)? {
        Some(node) => Ok(node),
        None => Err(error! {
            "no node with this slug",
            "slug" => slug,
        }.with_kind(ErrorKind::MalformedInput)),
    }
}

fn compare(a: &Node, b: &Node, key: &str) -> Ordering {
    match key {
        "title" => a.title.cmp(&b.title),
        "id" => a.id.cmp(&b.id),
        "slug" => a.slug.cmp(&b.slug),
        "level" => a.level.cmp(&b.level),
        key => a.metadata.get(key).cmp(&b.metadata.get(key)),
    }
}

/// `{{index}}`: a list of nodes in the tree.
///
/// | keyword | meaning                                                  |
/// |---------|----------------------------------------------------------|
/// | `tag`   | only nodes carrying this tag                             |
/// | `root`  | slug of the subtree to list, default the whole tree      |
/// | `sort`  | `title`, `id`, `slug`, `level`, or a metadata key        |
/// | `style` | `list` (default) or `summary`                            |
///
/// Without `sort`, nodes are listed in reading order. Sorting is stable.
pub fn index(scope: &Scope<'_>, args: &Args) -> Result<String> {
    let tree = scope.tree;
    let root = match args.keyword("root") {
        Some(slug) => lookup(scope, slug)?.handle,
        None => tree.root_id(),
    };

    let tag = args.keyword("tag");
    let mut nodes: Vec<&Node> = tree.descendants(root)
        .nodes()
        .filter(|node| tag.map_or(true, |tag| node.tags.contains(tag)))
        .collect();

    if let Some(key) = args.keyword("sort") {
        nodes.sort_by(|a, b| compare(a, b, key));
    }

    let list_entry = |node: &Node| format!("- [{}]({})", node.label(), link(node, scope.context));
    let summary_entry = |node: &Node| {
        let heading = format!("**[{}]({})**", node.label(), link(node, scope.context));
        match &node.summary {
            Some(summary) => format!("{heading}\n\n{summary}"),
            None => heading,
        }
    };

    let output = match args.keyword("style").unwrap_or("list") {
        "list" => nodes.into_iter().map(list_entry).collect::<Vec<_>>().join("\n"),
        "summary" if scope.context.is_slides() => {
            nodes.into_iter().map(list_entry).collect::<Vec<_>>().join("\n")
        }
        "summary" => nodes.into_iter().map(summary_entry).collect::<Vec<_>>().join("\n\n"),
        style => return err! {
            "unknown index style",
            "expected `list` or `summary`",
            "style" => style,
        },
    };

    Ok(output)
}

/// `{{ref:slug}}` or `{{ref:slug,label}}`: a link to a single node.
pub fn reference(scope: &Scope<'_>, args: &Args) -> Result<String> {
    let Some(slug) = args.get(0).filter(|s| !s.is_empty()) else {
        return err!("`ref` requires a slug argument");
    };

    let node = lookup(scope, slug)?;
    let label = args.get(1).unwrap_or_else(|| node.label());
    Ok(format!("[{label}]({})", link(node, scope.context)))
}

/// `{{meta:slug,key}}`: a harvested metadata value, empty if unset.
pub fn meta(scope: &Scope<'_>, args: &Args) -> Result<String> {
    let (Some(slug), Some(key)) = (args.get(0), args.get(1)) else {
        return err!("`meta` requires a slug and a key");
    };

    let node = lookup(scope, slug)?;
    Ok(node.metadata.get(key).cloned().unwrap_or_default())
}

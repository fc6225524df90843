//! The harvest pass: every node's title, summary, and metadata are read
//! from its source before anything is built.

use std::path::{Path, PathBuf};

use crate::config::BuildContext;
use crate::error::{ErrorKind, Result};
use crate::filter::{Harvest, Metadata};
use crate::macros::{Expand, MacroRegistry, Scope};
use crate::pipeline::Pipeline;
use crate::tree::{ContentTree, Node, NodeId};
use crate::util::split_list;

/// The metadata key whose comma-separated value adds tags to a node.
pub const TAGS_KEY: &str = "tags";

/// The files that may back `node`, in the order they're tried.
///
/// A node `a.b` is backed by `a/b.md`. A node with children may instead
/// keep its source inside its own directory, as `a/b/index.md`,
/// `a/b/b.md`, or `a/b/b_index.md`.
pub fn candidates(node: &Node, content: &Path) -> Vec<PathBuf> {
    let base = content.join(node.path());
    let mut candidates = vec![base.with_extension("md")];
    if !node.children.is_empty() {
        candidates.push(base.join("index.md"));
        candidates.push(base.join(format!("{}.md", node.slug)));
        candidates.push(base.join(format!("{}_index.md", node.slug)));
    }

    candidates
}

impl ContentTree {
    /// Resolves the source file backing `node` under `content`.
    pub fn source(&self, node: NodeId, content: &Path) -> Result<PathBuf> {
        let node = &self[node];
        let candidates = candidates(node, content);
        if let Some(path) = candidates.iter().find(|path| path.is_file()) {
            return Ok(path.clone());
        }

        let attempted: Vec<_> = candidates.iter().map(|p| p.display().to_string()).collect();
        Err(error! {
            "source file not found",
            "id" => &node.id,
            "base" => content.join(node.path()).display(),
            "attempted" => attempted.join(", "),
        }.with_kind(ErrorKind::SourceNotFound))
    }

    /// Reads every node's source in reading order and records its title,
    /// summary, metadata, and any `tags` metadata.
    ///
    /// Macros are expanded while harvesting so that, for instance, a title
    /// may contain `{{meta:…}}`. Unknown macros expand to nothing. Nodes are
    /// harvested in order, so a macro sees the harvested attributes of the
    /// nodes before it.
    pub fn harvest(
        &mut self,
        content: &Path,
        registry: &MacroRegistry,
        context: &BuildContext,
    ) -> Result<()> {
        let handles: Vec<NodeId> = self.linear().collect();
        for handle in handles {
            let span = tracing::debug_span!("harvest", id = %self[handle].id);
            let _guard = span.enter();

            let path = self.source(handle, content)?;
            let harvest = harvest_file(&path, registry, Scope::new(self, context))?;
            tracing::debug!(path = %path.display(), title = %harvest.title, "harvested");

            let node = &mut self[handle];
            if let Some(tags) = harvest.metadata.get(TAGS_KEY) {
                node.tags.extend(split_list(tags).map(String::from));
            }

            node.title = harvest.title;
            node.summary = harvest.summary;
            node.metadata = harvest.metadata;
        }

        Ok(())
    }
}

/// Runs the harvest pipeline over the file at `path`.
pub fn harvest_file(path: &Path, registry: &MacroRegistry, scope: Scope<'_>) -> Result<Harvest> {
    let mut metadata = Metadata::new();
    Pipeline::open(path)?
        .filter(Expand::new(registry, scope).ignore_unknown(true))
        .filter(&mut metadata)
        .drain()?;

    Ok(metadata.into_harvest())
}

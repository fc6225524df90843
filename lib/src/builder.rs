//! The build pass: every node, in reading order, through the full filter
//! chain and into a [`Writer`].

use std::path::{Path, PathBuf};

use crate::config::BuildContext;
use crate::error::{Chainable, Result};
use crate::filter::{Conditional, Metadata};
use crate::macros::{Expand, MacroRegistry, Scope};
use crate::pipeline::Pipeline;
use crate::tree::{ContentTree, Node, NodeId};

/// An output format.
///
/// A writer never sees filter internals. For each node it appends its own
/// format filters, and a terminal sink such as
/// [`filter::Write`](crate::filter::Write), to a pipeline that already
/// strips metadata, resolves conditional regions, and expands macros.
pub trait Writer {
    /// Called once before the first node is built.
    #[inline(always)]
    fn begin(&mut self, _tree: &ContentTree) -> Result<()> {
        Ok(())
    }

    /// Appends this writer's filters for `node` to `pipeline`.
    fn install<'w>(&'w mut self, node: &'w Node, pipeline: &mut Pipeline<'w>) -> Result<()>;

    /// Called once after the last node is built.
    #[inline(always)]
    fn finish(&mut self, _tree: &ContentTree) -> Result<()> {
        Ok(())
    }
}

impl<W: Writer + ?Sized> Writer for &mut W {
    fn begin(&mut self, tree: &ContentTree) -> Result<()> {
        (**self).begin(tree)
    }

    fn install<'w>(&'w mut self, node: &'w Node, pipeline: &mut Pipeline<'w>) -> Result<()> {
        (**self).install(node, pipeline)
    }

    fn finish(&mut self, tree: &ContentTree) -> Result<()> {
        (**self).finish(tree)
    }
}

/// Drives a harvested [`ContentTree`] through a [`Writer`].
///
/// Each node's source is opened, filtered, and drained before the next
/// node's is opened:
///
/// ```text
/// source -> Metadata -> Conditional -> Expand -> writer filters -> sink
/// ```
#[derive(Debug)]
pub struct Builder<'b> {
    tree: &'b ContentTree,
    content: PathBuf,
    registry: &'b MacroRegistry,
    context: &'b BuildContext,
    strip_summary_tags: bool,
}

impl<'b> Builder<'b> {
    pub fn new<P: AsRef<Path>>(
        tree: &'b ContentTree,
        content: P,
        registry: &'b MacroRegistry,
        context: &'b BuildContext,
    ) -> Self {
        Builder {
            tree,
            content: content.as_ref().to_path_buf(),
            registry,
            context,
            strip_summary_tags: false,
        }
    }

    pub fn strip_summary_tags(mut self, strip: bool) -> Self {
        self.strip_summary_tags = strip;
        self
    }

    /// Builds every node in reading order. The first failure aborts the
    /// build.
    pub fn build<W: Writer + ?Sized>(&self, writer: &mut W) -> Result<()> {
        let _span = tracing::info_span!("build", format = self.context.format()).entered();

        writer.begin(self.tree)?;
        let mut count = 0;
        for handle in self.tree.linear() {
            self.build_node(handle, writer)?;
            count += 1;
        }

        writer.finish(self.tree)?;
        tracing::info!(nodes = count, "build complete");
        Ok(())
    }

    /// Builds the single node `handle`.
    pub fn build_node<W: Writer + ?Sized>(&self, handle: NodeId, writer: &mut W) -> Result<()> {
        let node = &self.tree[handle];
        let _span = tracing::info_span!("node", id = %node.id).entered();

        let path = self.tree.source(handle, &self.content)?;
        tracing::debug!(path = %path.display(), "building");

        let scope = Scope::new(self.tree, self.context);
        let mut pipeline = Pipeline::open(&path)?
            .filter(Metadata::new().strip_summary_tags(self.strip_summary_tags))
            .filter(Conditional::new(self.context))
            .filter(Expand::new(self.registry, scope));

        writer.install(node, &mut pipeline)
            .chain_with(|| error!("failed to prepare writer", "id" => &node.id))?;

        pipeline.drain()
    }
}

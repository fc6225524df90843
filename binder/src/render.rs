use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};
use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::Serialize;

use quire::error::{Chainable, Result};
use quire::filter::{Map, Replace, Write};
use quire::line::Line;
use quire::macros::link;
use quire::{BuildContext, ContentTree, Node, Pipeline, Writer};

/// Concatenates every node into a single markdown document.
///
/// Single-document formats get an anchor before each node so that
/// `{{index}}` and `{{ref}}` links resolve within the document. Slide
/// formats get a `---` separator between nodes instead, and keep their
/// `[fit]` headline markers.
pub struct MarkdownWriter<'c> {
    path: PathBuf,
    output: BufWriter<File>,
    context: &'c BuildContext,
    fit: Replace,
    nodes: usize,
}

impl<'c> MarkdownWriter<'c> {
    pub fn create<P: AsRef<Path>>(path: P, context: &'c BuildContext) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).chain_with(|| quire::error! {
            "failed to create output file",
            "path" => path.display(),
        })?;

        Ok(MarkdownWriter {
            output: BufWriter::new(file),
            path,
            context,
            fit: Replace::new(Regex::new(r"\[fit\]\s*").map_err(quire::error::Error::from_std)?, ""),
            nodes: 0,
        })
    }

    fn separate(&mut self, node: &Node) -> std::io::Result<()> {
        if self.context.is_slides() {
            if self.nodes > 0 {
                self.output.write_all(b"\n---\n\n")?;
            }
        } else {
            if self.nodes > 0 {
                self.output.write_all(b"\n")?;
            }

            writeln!(self.output, "<a id=\"{}\"></a>\n", node.anchor())?;
        }

        Ok(())
    }
}

/// Gives a final unterminated line a terminator so nodes never run
/// together.
fn terminate(line: &mut Line) -> Result<bool> {
    if line.terminator().is_empty() {
        *line = Line::new(format!("{}\n", line.as_str()), line.number());
    }

    Ok(true)
}

impl Writer for MarkdownWriter<'_> {
    fn install<'w>(&'w mut self, node: &'w Node, pipeline: &mut Pipeline<'w>) -> Result<()> {
        self.separate(node).chain_with(|| quire::error! {
            "failed to write node separator",
            "path" => self.path.display(),
        })?;

        self.nodes += 1;
        if !self.context.is_slides() {
            pipeline.push(&mut self.fit);
        }

        pipeline.push(Map::new(terminate));
        pipeline.push(Write::new(&mut self.output));
        Ok(())
    }

    fn finish(&mut self, _: &ContentTree) -> Result<()> {
        self.output.flush().chain_with(|| quire::error! {
            "failed to flush output",
            "path" => self.path.display(),
        })?;

        tracing::info!(path = %self.path.display(), nodes = self.nodes, "wrote book");
        Ok(())
    }
}

/// One node's entry in `index.json`.
#[derive(Debug, Serialize)]
pub struct Entry<'a> {
    pub id: &'a str,
    pub slug: &'a str,
    pub level: usize,
    pub title: &'a str,
    pub summary: Option<&'a str>,
    pub link: String,
    pub tags: &'a BTreeSet<String>,
    pub metadata: &'a BTreeMap<String, String>,
}

/// Writes the harvested tree, in reading order, as JSON.
pub fn write_index<P: AsRef<Path>>(tree: &ContentTree, context: &BuildContext, path: P) -> Result<()> {
    let path = path.as_ref();
    let entries: Vec<Entry<'_>> = tree.linear().nodes()
        .map(|node| Entry {
            id: &node.id,
            slug: &node.slug,
            level: node.level,
            title: &node.title,
            summary: node.summary.as_deref(),
            link: link(node, context),
            tags: &node.tags,
            metadata: &node.metadata,
        })
        .collect();

    let file = File::create(path).chain_with(|| quire::error! {
        "failed to create index file",
        "path" => path.display(),
    })?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &entries).map_err(quire::error::Error::from_std)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire::config::{NodeSpec, Table};
    use quire::macros::MacroRegistry;
    use quire::Builder;

    fn book(format: &str) -> (tempfile::TempDir, String, String) {
        let dir = tempfile::tempdir().unwrap();
        let content = dir.path().join("content");
        std::fs::create_dir_all(&content).unwrap();
        std::fs::write(content.join("one.md"), "# [fit] One\n<summary>\nFirst.\n</summary>\n{{index:style=summary}}").unwrap();
        std::fs::write(content.join("two.md"), "[:author]: # \"Jane\"\n\n# Two\nby {{meta:two,author}}\n").unwrap();

        let specs = [NodeSpec::new("one"), NodeSpec::new("two")];
        let context = BuildContext::new(format);
        let registry = MacroRegistry::with_builtins();
        let mut tree = ContentTree::build(&specs, &Table::new()).unwrap();
        tree.harvest(&content, &registry, &context).unwrap();

        let out = dir.path().join("book.md");
        let mut writer = MarkdownWriter::create(&out, &context).unwrap();
        Builder::new(&tree, &content, &registry, &context)
            .strip_summary_tags(true)
            .build(&mut writer)
            .unwrap();

        let index = dir.path().join("index.json");
        write_index(&tree, &context, &index).unwrap();

        let book = std::fs::read_to_string(out).unwrap();
        let index = std::fs::read_to_string(index).unwrap();
        (dir, book, index)
    }

    #[test]
    fn single_document() {
        let (_dir, book, index) = book("markdown");
        assert_eq!(book, concat!(
            "<a id=\"one\"></a>\n\n",
            "# One\nFirst.\n**[One](#one)**\n\nFirst.\n\n**[Two](#two)**\n",
            "\n<a id=\"two\"></a>\n\n",
            "# Two\nby Jane\n",
        ));

        let entries: Vec<serde_json::Value> = serde_json::from_str(&index).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["title"], "One");
        assert_eq!(entries[0]["summary"], "First.");
        assert_eq!(entries[1]["metadata"]["author"], "Jane");
        assert_eq!(entries[1]["link"], "#two");
    }

    #[test]
    fn slides() {
        let (_dir, book, _) = book("deckset");
        assert_eq!(book, concat!(
            "# [fit] One\nFirst.\n- [One](one.html)\n- [Two](two.html)\n",
            "\n---\n\n",
            "# Two\nby Jane\n",
        ));
    }
}

#![doc = svgbobdoc::transform!(
//! A toolkit for assembling multi-file books and slide decks.
//!
//! # Overview
//!
//! Quire turns a tree of markdown sources, split across directories, into
//! linear output streams. It does not parse markdown: a document is a
//! stream of opaque lines, and only a handful of line-level markers are
//! recognized.
//!
//! Content is organized as a tree of parts, chapters, and sections:
//!
//! ```svgbob
//!                         +------+
//!                         | root |
//!                         +--+---+
//!                            |
//!         +------------------+------------------+
//!         |                                     |
//!    +----+----+                           +----+----+
//!    |  part1  |                           |  part2  |
//!    +----+----+                           +----+----+
//!         |                                     |
//!   +-----+------+                              |
//!   |            |                              |
//! +-+---------+ +-+---------+             +-----+-------+
//! | part1.ch1 | | part1.ch2 |             | part2.intro |
//! +-----------+ +-----------+             +-------------+
//! ```
//!
//! The tree is read in _reading order_: a node, then its children, then its
//! next sibling. Each node is backed by one source file whose lines flow
//! through a [`Pipeline`](pipeline::Pipeline) of [`Filter`](filter::Filter)s:
//!
//! ```svgbob
//! +--------+   +----------+   +-------------+   +--------+   +--------+
//! | source +-->| Metadata +-->| Conditional +-->| Expand +-->| Writer |
//! +--------+   +----------+   +-------------+   +--------+   +--------+
//! ```
//!
//! ## Building
//!
//! A book is typically built as follows:
//!
//! 1. [`Settings`](config::Settings) are read from a `quire.toml`, and a
//!    [`ContentTree`](tree::ContentTree) is built from its structure.
//! 2. The tree is _harvested_: every source is read once to record its
//!    title, summary, and metadata, so that macros such as `{{index}}` can
//!    refer to any node.
//! 3. A [`Builder`](builder::Builder) streams every node, in reading
//!    order, through the full filter chain and into a
//!    [`Writer`](builder::Writer).
//!
//! Any malformed markup aborts the build with an [`Error`](error::Error)
//! naming the file and line.
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod line;
pub mod filter;
pub mod pipeline;
pub mod config;
pub mod macros;
pub mod tree;
pub mod harvest;
pub mod builder;

pub use builder::{Builder, Writer};
pub use config::{BuildContext, Settings};
pub use pipeline::Pipeline;
pub use tree::{ContentTree, Node, NodeId};

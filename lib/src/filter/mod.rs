//! Line filters: the stages of a [`Pipeline`](crate::pipeline::Pipeline).
//!
//! A filter wraps the stream produced by the stages before it and returns a
//! new stream. Stateless filters map each line independently
//! ([`Map`], [`Replace`]); stateful ones ([`Conditional`], [`Metadata`],
//! [`Expand`](crate::macros::Expand)) keep all cross-line state inside the
//! iterator they return, so no filter can observe lines beyond its own
//! input.

mod map;
mod write;
mod conditional;
mod metadata;

pub use map::*;
pub use write::*;
pub use conditional::*;
pub use metadata::*;

use crate::error::Result;
use crate::line::Line;

/// A boxed, lazily evaluated stream of lines.
pub type Lines<'a> = Box<dyn Iterator<Item = Result<Line>> + 'a>;

pub trait Filter {
    /// Wraps `lines`, returning the transformed stream. Called once per
    /// pipeline run; any per-run state must be reset here.
    fn remap<'a>(&'a mut self, lines: Lines<'a>) -> Lines<'a>;

    /// Called after the composed stream has been drained to completion.
    #[inline(always)]
    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<F: Filter + ?Sized> Filter for &mut F {
    #[inline(always)]
    fn remap<'a>(&'a mut self, lines: Lines<'a>) -> Lines<'a> {
        (**self).remap(lines)
    }

    #[inline(always)]
    fn finalize(&mut self) -> Result<()> {
        (**self).finalize()
    }
}

impl<F: Filter + ?Sized> Filter for Box<F> {
    #[inline(always)]
    fn remap<'a>(&'a mut self, lines: Lines<'a>) -> Lines<'a> {
        (**self).remap(lines)
    }

    #[inline(always)]
    fn finalize(&mut self) -> Result<()> {
        (**self).finalize()
    }
}

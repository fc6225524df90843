//! `{{name:args}}` macro tokens: parsing, gating, dispatch, and the
//! built-in handlers.

mod call;
mod registry;
mod expand;
mod index;

pub use call::{Args, Call};
pub use registry::{Macro, MacroRegistry, Scope};
pub use expand::Expand;
pub use index::{index, link, meta, reference};

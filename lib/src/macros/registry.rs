use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::config::BuildContext;
use crate::error::Result;
use crate::macros::Args;
use crate::tree::ContentTree;

/// The ambient context a macro handler is invoked in.
#[derive(Debug, Copy, Clone)]
pub struct Scope<'a> {
    pub tree: &'a ContentTree,
    pub context: &'a BuildContext,
}

impl<'a> Scope<'a> {
    pub fn new(tree: &'a ContentTree, context: &'a BuildContext) -> Self {
        Scope { tree, context }
    }
}

/// A macro handler. The returned string replaces the invocation verbatim.
pub trait Macro: Send + Sync {
    fn expand(&self, scope: &Scope<'_>, args: &Args) -> Result<String>;
}

impl<F> Macro for F
    where F: Fn(&Scope<'_>, &Args) -> Result<String> + Send + Sync
{
    fn expand(&self, scope: &Scope<'_>, args: &Args) -> Result<String> {
        self(scope, args)
    }
}

/// Named macro handlers. Written once at startup, read-only afterwards.
#[derive(Clone, Default)]
pub struct MacroRegistry {
    macros: FxHashMap<String, Arc<dyn Macro>>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        MacroRegistry::default()
    }

    /// A registry holding the built-in `index`, `ref`, and `meta` macros.
    pub fn with_builtins() -> Self {
        let mut registry = MacroRegistry::new();
        registry.register("index", crate::macros::index::index);
        registry.register("ref", crate::macros::index::reference);
        registry.register("meta", crate::macros::index::meta);
        registry
    }

    /// Registers `handler` as `name`, replacing (with a warning) any
    /// existing handler of the same name.
    pub fn register<N, M>(&mut self, name: N, handler: M) -> &mut Self
        where N: Into<String>, M: Macro + 'static
    {
        let name = name.into();
        if self.macros.insert(name.clone(), Arc::new(handler)).is_some() {
            tracing::warn!(name = %name, "macro re-registered; replacing previous handler");
        }

        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Macro> {
        self.macros.get(name).map(|m| &**m)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

impl fmt::Debug for MacroRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.macros.keys().collect();
        names.sort();
        f.debug_struct("MacroRegistry").field("macros", &names).finish()
    }
}

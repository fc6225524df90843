use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Chainable, Result};
use crate::filter::{Filter, Lines};
use crate::line::Line;
use crate::macros::{Call, MacroRegistry, Scope};

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{(.+?)\}\}").unwrap());

/// Replaces `{{name:args}}` tokens with the output of registered macros.
///
/// Each line is swept once: text produced by a macro is not itself
/// expanded. Unknown macros are left in place with a warning, or removed
/// silently when [`Expand::ignore_unknown()`] is set.
#[derive(Debug, Clone)]
pub struct Expand<'r> {
    registry: &'r MacroRegistry,
    scope: Scope<'r>,
    ignore_unknown: bool,
}

impl<'r> Expand<'r> {
    pub fn new(registry: &'r MacroRegistry, scope: Scope<'r>) -> Self {
        Expand { registry, scope, ignore_unknown: false }
    }

    pub fn ignore_unknown(mut self, ignore: bool) -> Self {
        self.ignore_unknown = ignore;
        self
    }

    /// Expands every token in `text`, returning `None` if there are none.
    pub fn expand_str(&self, text: &str, line: usize) -> Result<Option<String>> {
        if memchr::memmem::find(text.as_bytes(), b"{{").is_none() {
            return Ok(None);
        }

        let mut output = String::with_capacity(text.len());
        let mut last = 0;
        for captures in TOKEN.captures_iter(text) {
            let (token, [inner]) = captures.extract();
            let start = captures.get(0).map_or(0, |m| m.start());
            output.push_str(&text[last..start]);
            last = start + token.len();

            let call = Call::parse(inner);
            if call.is_gated(self.scope.context) {
                continue;
            }

            match self.registry.get(&call.name) {
                Some(handler) => {
                    let expansion = handler.expand(&self.scope, &call.handler_args())
                        .chain_with(|| error! {
                            "macro expansion failed",
                            "macro" => &call.name,
                            "line" => line,
                        })?;

                    output.push_str(&expansion);
                }
                None if self.ignore_unknown => {}
                None => {
                    tracing::warn!(name = %call.name, line, "unknown macro left unexpanded");
                    output.push_str(token);
                }
            }
        }

        if last == 0 {
            return Ok(None);
        }

        output.push_str(&text[last..]);
        Ok(Some(output))
    }
}

impl Filter for Expand<'_> {
    fn remap<'a>(&'a mut self, lines: Lines<'a>) -> Lines<'a> {
        let this = &*self;
        Box::new(lines.map(move |line| {
            let mut line: Line = line?;
            if let Some(expanded) = this.expand_str(line.content(), line.number())? {
                line.replace(expanded);
            }

            Ok(line)
        }))
    }
}

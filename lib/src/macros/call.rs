use crate::config::BuildContext;

/// The parsed arguments of a macro invocation.
///
/// Positional and keyword arguments are kept in the order they appear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    pub positional: Vec<String>,
    pub keyword: Vec<(String, String)>,
}

impl Args {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(|s| s.as_str())
    }

    /// The value of the first keyword argument named `key`.
    pub fn keyword(&self, key: &str) -> Option<&str> {
        self.keyword.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_keyword(&self, key: &str) -> bool {
        self.keyword(key).is_some()
    }

    fn remove_keyword(&mut self, key: &str) {
        self.keyword.retain(|(k, _)| k != key);
    }
}

/// A single `{{name:args}}` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub name: String,
    pub args: Args,
}

impl Call {
    /// Parses the text between `{{` and `}}`.
    ///
    /// Everything before the first `:` is the name. The rest is split on
    /// `,`; pieces containing `=` are keyword arguments, the others are
    /// positional.
    pub fn parse(inner: &str) -> Call {
        let Some((name, rest)) = inner.split_once(':') else {
            return Call { name: inner.trim().to_string(), args: Args::default() };
        };

        let mut args = Args::default();
        for piece in rest.split(',') {
            match piece.split_once('=') {
                Some((key, value)) => {
                    args.keyword.push((key.trim().to_string(), value.trim().to_string()));
                }
                None => args.positional.push(piece.trim().to_string()),
            }
        }

        Call { name: name.trim().to_string(), args }
    }

    /// Whether this call is gated off for `context`.
    ///
    /// `skip=a|b` gates the call off when the active preset is listed;
    /// otherwise `only=a|b` gates it off when the active preset is not
    /// listed. `only` is ignored when `skip` is present.
    pub fn is_gated(&self, context: &BuildContext) -> bool {
        let listed = |values: &str| {
            context.preset().map_or(false, |preset| values.split('|').any(|v| v.trim() == preset))
        };

        if let Some(skip) = self.args.keyword("skip") {
            listed(skip)
        } else if let Some(only) = self.args.keyword("only") {
            !listed(only)
        } else {
            false
        }
    }

    /// The arguments a handler sees: `skip` and `only` removed.
    pub fn handler_args(&self) -> Args {
        let mut args = self.args.clone();
        args.remove_keyword("skip");
        args.remove_keyword("only");
        args
    }
}

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::BuildContext;
use crate::error::Result;
use crate::filter::{Filter, Lines};
use crate::line::Line;
use crate::util::split_list;

static OPEN_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*<(skip|only)((?:\s+[\w-]+\s*=\s*"[^"]*")*)\s*>\s*$"#).unwrap()
});

static CLOSE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*</(skip|only)>\s*$").unwrap());

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"([\w-]+)\s*=\s*"([^"]*)""#).unwrap());

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Tag {
    Skip,
    Only,
}

impl Tag {
    fn parse(name: &str) -> Tag {
        match name {
            "skip" => Tag::Skip,
            _ => Tag::Only,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tag::Skip => "skip",
            Tag::Only => "only",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Frame {
    tag: Tag,
    pass_through: bool,
    line: usize,
}

/// The attribute lists of an opening `<skip>`/`<only>` tag.
#[derive(Debug, Default, PartialEq, Eq)]
struct Selector<'l> {
    formats: Vec<&'l str>,
    editions: Vec<&'l str>,
    presets: Vec<&'l str>,
}

impl<'l> Selector<'l> {
    fn parse(attributes: &'l str, line: &Line) -> Result<Self> {
        let mut selector = Selector::default();
        for captures in ATTRIBUTE.captures_iter(attributes) {
            let (_, [name, value]) = captures.extract();
            let values = split_list(value).collect();

            match name {
                "formats" => selector.formats = values,
                "editions" => selector.editions = values,
                "presets" => selector.presets = values,
                _ => return malformed! {
                    "unknown attribute in conditional tag",
                    "expected one of `formats`, `editions`, or `presets`",
                    "attribute" => name,
                    "line" => line.number(),
                },
            }
        }

        Ok(selector)
    }

    /// `true` if any axis of `context` is listed in the matching attribute.
    fn matches(&self, context: &BuildContext) -> bool {
        let listed = |list: &[&str], value: Option<&str>| {
            value.map_or(false, |value| list.contains(&value))
        };

        listed(&self.formats, Some(context.format()))
            || listed(&self.editions, context.edition())
            || listed(&self.presets, context.preset())
    }
}

/// Suppresses lines inside `<skip>`/`<only>` regions that don't apply to the
/// active [`BuildContext`].
///
/// ```text
/// <only formats="ebook" editions="print,pdf">
/// Emitted only for ebooks or the print and pdf editions.
/// <skip presets="draft">
/// ...and, within those, never for drafts.
/// </skip>
/// </only>
/// ```
///
/// An `only` region passes if the active format, edition, or preset is
/// listed in its attributes; a `skip` region passes unless one is. A region
/// nested in a blocked region is always blocked. Tag lines are never
/// emitted. Mismatched, stray, or unclosed tags are malformed input.
#[derive(Debug, Clone)]
pub struct Conditional<'c> {
    context: &'c BuildContext,
}

impl<'c> Conditional<'c> {
    pub fn new(context: &'c BuildContext) -> Self {
        Conditional { context }
    }
}

struct ConditionalIterator<'a> {
    context: &'a BuildContext,
    stack: Vec<Frame>,
    inner: Lines<'a>,
    done: bool,
}

impl ConditionalIterator<'_> {
    fn passing(&self) -> bool {
        self.stack.last().map_or(true, |frame| frame.pass_through)
    }

    fn open(&mut self, tag: Tag, attributes: &str, line: &Line) -> Result<()> {
        let selector = Selector::parse(attributes, line)?;
        let candidate = match tag {
            Tag::Only => selector.matches(self.context),
            Tag::Skip => !selector.matches(self.context),
        };

        let pass_through = candidate && self.passing();
        self.stack.push(Frame { tag, pass_through, line: line.number() });
        Ok(())
    }

    fn close(&mut self, tag: Tag, line: &Line) -> Result<()> {
        match self.stack.last() {
            Some(frame) if frame.tag == tag => {
                self.stack.pop();
                Ok(())
            }
            Some(frame) => malformed! {
                format!("mismatched closing tag </{tag}>: expected </{}>", frame.tag),
                "open tag" => format!("<{}> on line {}", frame.tag, frame.line),
                "close tag" => format!("</{tag}>"),
                "line" => line.number(),
            },
            None => malformed! {
                format!("closing tag </{tag}> has no matching <{tag}>"),
                "line" => line.number(),
            }
        }
    }

    fn step(&mut self, line: Line) -> Result<Option<Line>> {
        let content = line.content();
        if let Some(captures) = OPEN_TAG.captures(content) {
            let (_, [tag, attributes]) = captures.extract();
            self.open(Tag::parse(tag), attributes, &line)?;
            return Ok(None);
        }

        if let Some(captures) = CLOSE_TAG.captures(content) {
            let (_, [tag]) = captures.extract();
            self.close(Tag::parse(tag), &line)?;
            return Ok(None);
        }

        Ok(self.passing().then_some(line))
    }
}

impl Iterator for ConditionalIterator<'_> {
    type Item = Result<Line>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let line = match self.inner.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    self.done = true;
                    let frame = self.stack.last()?;
                    return Some(malformed! {
                        format!("unclosed <{}> tag", frame.tag),
                        "open tag line" => frame.line,
                    });
                }
            };

            match self.step(line) {
                Ok(Some(line)) => return Some(Ok(line)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl Filter for Conditional<'_> {
    fn remap<'a>(&'a mut self, lines: Lines<'a>) -> Lines<'a> {
        Box::new(ConditionalIterator {
            context: self.context,
            stack: vec![],
            inner: lines,
            done: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::line::LineStream;
    use crate::pipeline::Pipeline;

    fn run(input: &str, context: &BuildContext) -> Result<String> {
        Pipeline::new(LineStream::from_str(input))
            .filter(Conditional::new(context))
            .collect_string()
    }

    #[test]
    fn only_and_skip_regions() {
        let input = "a\n<only formats=\"ebook\">\nb\n</only>\n<skip presets=\"draft\">\nc\n</skip>\nd\n";

        let ebook = BuildContext::new("ebook");
        assert_eq!(run(input, &ebook).unwrap(), "a\nb\nc\nd\n");

        let draft = BuildContext::new("html").with_preset("draft");
        assert_eq!(run(input, &draft).unwrap(), "a\nd\n");
    }

    #[test]
    fn any_axis_matches() {
        let input = "<only formats=\"pdf\" editions=\"print, web\" presets=\"x\">\nyes\n</only>\n";
        let context = BuildContext::new("html").with_edition("web");
        assert_eq!(run(input, &context).unwrap(), "yes\n");

        let context = BuildContext::new("html").with_edition("tablet");
        assert_eq!(run(input, &context).unwrap(), "");
    }

    #[test]
    fn blocked_parent_blocks_children() {
        let input = "<only formats=\"pdf\">\n<only formats=\"html\">\n<skip presets=\"none\">\nhidden\n</skip>\n</only>\n</only>\nshown\n";
        let context = BuildContext::new("html");
        assert_eq!(run(input, &context).unwrap(), "shown\n");
    }

    #[test]
    fn deep_nesting() {
        let depth = 500;
        let mut input = String::new();
        for _ in 0..depth {
            input.push_str("<skip editions=\"none\">\nvisible\n");
        }

        input.push_str("<only formats=\"nope\">\nsecret\n</only>\n");
        for _ in 0..depth {
            input.push_str("</skip>\n");
        }

        let output = run(&input, &BuildContext::default()).unwrap();
        assert_eq!(output.lines().count(), depth);
        assert!(!output.contains("secret"));
    }

    #[test]
    fn mismatched_close_names_both_tags() {
        let input = "<skip presets=\"draft\">\ntext\n</only>\n";
        let error = run(input, &BuildContext::default()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MalformedInput);

        let message = error.to_string();
        assert!(message.contains("</only>"), "{message}");
        assert!(message.contains("<skip>"), "{message}");
    }

    #[test]
    fn stray_and_unclosed_tags() {
        let error = run("text\n</skip>\n", &BuildContext::default()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MalformedInput);

        let error = run("<only formats=\"x\">\ntext\n", &BuildContext::default()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MalformedInput);
        assert!(error.to_string().contains("unclosed <only> tag"));
    }

    #[test]
    fn unknown_attribute_is_malformed() {
        let error = run("<skip colors=\"red\">\n</skip>\n", &BuildContext::default()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MalformedInput);
        assert!(error.to_string().contains("attribute: colors"));
    }
}

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::Result;
use crate::filter::{Filter, Lines};
use crate::line::Line;

static METADATA: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^\[:([^\]]+)\]: # "(.*)"$"#).unwrap());

static HEADLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,7} (.*)$").unwrap());

static FIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\[fit\]\s*").unwrap());

const SUMMARY_OPEN: &str = "<summary>";
const SUMMARY_CLOSE: &str = "</summary>";

/// What [`Metadata`] extracts from a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Harvest {
    pub title: String,
    /// `None` if the document has no `<summary>` block.
    pub summary: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    Header { blank: bool },
    Standard,
    Summary,
}

/// Extracts the title, summary, and `[:key]: # "value"` metadata from a
/// document while streaming it through.
///
/// ```text
/// [:author]: # "Jane"
///
/// # The Title
///
/// <summary>
/// **A one paragraph summary.**
/// </summary>
/// ```
///
/// Metadata lines, and the single blank line that may separate them from
/// the headline, are consumed. Everything from the headline on is emitted
/// unchanged, except for the summary markers when
/// [`Metadata::strip_summary_tags()`] is set. The extracted [`Harvest`] is
/// reset every time the filter runs and is available from
/// [`Metadata::harvest()`] once the pipeline has been drained.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    strip_summary_tags: bool,
    harvest: Harvest,
    summary: Vec<String>,
    seen_summary: bool,
}

impl Metadata {
    pub fn new() -> Self {
        Metadata::default()
    }

    /// Don't emit the `<summary>` and `</summary>` marker lines.
    pub fn strip_summary_tags(mut self, strip: bool) -> Self {
        self.strip_summary_tags = strip;
        self
    }

    pub fn harvest(&self) -> &Harvest {
        &self.harvest
    }

    pub fn into_harvest(self) -> Harvest {
        self.harvest
    }
}

struct MetadataIterator<'a> {
    state: State,
    strip_summary_tags: bool,
    harvest: &'a mut Harvest,
    summary: &'a mut Vec<String>,
    seen_summary: &'a mut bool,
    inner: Lines<'a>,
    done: bool,
}

/// Extracts the title text of a headline, without the `[fit]` marker.
fn headline_title(content: &str) -> Option<String> {
    let captures = HEADLINE.captures(content)?;
    Some(FIT.replace_all(&captures[1], " ").trim().to_string())
}

/// Strips a leading and a trailing `**` or `__` from a summary line.
fn strip_bold(line: &str) -> &str {
    let line = line.trim();
    let line = line.strip_prefix("**")
        .or_else(|| line.strip_prefix("__"))
        .unwrap_or(line);

    line.strip_suffix("**")
        .or_else(|| line.strip_suffix("__"))
        .unwrap_or(line)
        .trim()
}

impl MetadataIterator<'_> {
    fn header(&mut self, line: Line, blank: bool) -> Result<Option<Line>> {
        let content = line.content();
        if let Some(captures) = METADATA.captures(content) {
            let (_, [key, value]) = captures.extract();
            if blank {
                return malformed! {
                    "metadata must precede the blank line before the headline",
                    "line" => line.number(),
                };
            }

            self.harvest.metadata.insert(key.to_string(), value.to_string());
            return Ok(None);
        }

        if line.is_blank() {
            if blank {
                return malformed! {
                    "at most one blank line may precede the headline",
                    "line" => line.number(),
                };
            }

            self.state = State::Header { blank: true };
            return Ok(None);
        }

        if content.starts_with('#') {
            self.harvest.title = headline_title(content).unwrap_or_else(|| {
                tracing::warn!(line = line.number(), headline = content, "unparseable headline");
                String::new()
            });

            self.state = State::Standard;
            return Ok(Some(line));
        }

        malformed! {
            "metadata must be followed by a blank line",
            "expected a metadata line, a blank line, or a headline",
            "line" => line.number(),
            "found" => content.trim(),
        }
    }

    fn step(&mut self, line: Line) -> Result<Option<Line>> {
        match self.state {
            State::Header { blank } => self.header(line, blank),
            State::Standard if line.content().trim() == SUMMARY_OPEN => {
                self.state = State::Summary;
                *self.seen_summary = true;
                Ok((!self.strip_summary_tags).then_some(line))
            }
            State::Standard => Ok(Some(line)),
            State::Summary => match line.content().trim() {
                SUMMARY_CLOSE => {
                    self.state = State::Standard;
                    Ok((!self.strip_summary_tags).then_some(line))
                }
                SUMMARY_OPEN => malformed! {
                    "nested <summary> block",
                    "line" => line.number(),
                },
                content => {
                    self.summary.push(strip_bold(content).to_string());
                    Ok(Some(line))
                }
            }
        }
    }

    fn finish(&mut self) -> Result<()> {
        match self.state {
            State::Header { .. } => malformed!("document is missing a headline"),
            State::Summary => malformed!("unterminated <summary> block"),
            State::Standard => Ok(()),
        }
    }
}

impl Iterator for MetadataIterator<'_> {
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
                    return self.finish().err().map(Err);
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

impl Filter for Metadata {
    fn remap<'a>(&'a mut self, lines: Lines<'a>) -> Lines<'a> {
        self.harvest = Harvest::default();
        self.summary.clear();
        self.seen_summary = false;

        Box::new(MetadataIterator {
            state: State::Header { blank: false },
            strip_summary_tags: self.strip_summary_tags,
            harvest: &mut self.harvest,
            summary: &mut self.summary,
            seen_summary: &mut self.seen_summary,
            inner: lines,
            done: false,
        })
    }

    fn finalize(&mut self) -> Result<()> {
        if self.seen_summary {
            let summary = self.summary.join("\n");
            self.harvest.summary = Some(summary.trim().to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::line::LineStream;
    use crate::pipeline::Pipeline;
    use crate::util::logs;

    const DOCUMENT: &str = "[:author]: # \"Jane\"\n\n# Title\n\n<summary>\n**a summary**\n</summary>\n\nbody\n";

    fn run(metadata: &mut Metadata, input: &str) -> Result<String> {
        Pipeline::new(LineStream::from_str(input))
            .filter(metadata)
            .collect_string()
    }

    #[test]
    fn extracts_title_summary_and_metadata() {
        let mut metadata = Metadata::new();
        let output = run(&mut metadata, DOCUMENT).unwrap();

        let harvest = metadata.harvest();
        assert_eq!(harvest.title, "Title");
        assert_eq!(harvest.summary.as_deref(), Some("a summary"));
        assert_eq!(harvest.metadata.len(), 1);
        assert_eq!(harvest.metadata["author"], "Jane");
        assert_eq!(output, "# Title\n\n<summary>\n**a summary**\n</summary>\n\nbody\n");
    }

    #[test]
    fn strips_summary_tags_on_request() {
        let mut metadata = Metadata::new().strip_summary_tags(true);
        let output = run(&mut metadata, DOCUMENT).unwrap();
        assert_eq!(output, "# Title\n\n**a summary**\n\nbody\n");
        assert_eq!(metadata.harvest().summary.as_deref(), Some("a summary"));
    }

    #[test]
    fn rerun_resets_results() {
        let mut metadata = Metadata::new();
        run(&mut metadata, DOCUMENT).unwrap();
        run(&mut metadata, "# Second\nno summary here\n").unwrap();

        let harvest = metadata.harvest();
        assert_eq!(harvest.title, "Second");
        assert_eq!(harvest.summary, None);
        assert!(harvest.metadata.is_empty());
    }

    #[test]
    fn headline_variants() {
        let mut metadata = Metadata::new();
        run(&mut metadata, "### [fit] Big Words\n").unwrap();
        assert_eq!(metadata.harvest().title, "Big Words");

        let (output, log) = logs::capture(|| run(&mut metadata, "#NoSpace\ntext\n"));
        assert_eq!(output.unwrap(), "#NoSpace\ntext\n");
        assert_eq!(metadata.harvest().title, "");
        assert!(log.contains("WARN"), "{log}");
        assert!(log.contains("unparseable headline"), "{log}");
        assert!(log.contains("line=1"), "{log}");
    }

    #[test]
    fn multiple_summary_blocks_accumulate() {
        let input = "# T\n<summary>\n__first__\n</summary>\nx\n<summary>\n**second\npart**\n</summary>\n";
        let mut metadata = Metadata::new();
        run(&mut metadata, input).unwrap();
        assert_eq!(metadata.harvest().summary.as_deref(), Some("first\nsecond\npart"));
    }

    #[test]
    fn empty_summary_block_is_some() {
        let mut metadata = Metadata::new();
        run(&mut metadata, "# T\n<summary>\n</summary>\nbody\n").unwrap();
        assert_eq!(metadata.harvest().summary.as_deref(), Some(""));

        run(&mut metadata, "# T\n<summary>\n\n</summary>\n").unwrap();
        assert_eq!(metadata.harvest().summary.as_deref(), Some(""));

        run(&mut metadata, "# T\nbody\n").unwrap();
        assert_eq!(metadata.harvest().summary, None);
    }

    #[test]
    fn malformed_headers() {
        let cases = [
            "[:a]: # \"b\"\nnot a headline\n",
            "[:a]: # \"b\"\n\n\n# Too many blanks\n",
            "",
            "no headline at all\n",
            "# T\n<summary>\nnever closed\n",
        ];

        for case in cases {
            let error = run(&mut Metadata::new(), case).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::MalformedInput, "{case:?}");
        }
    }
}

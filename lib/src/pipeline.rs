use std::path::{Path, PathBuf};

use derive_more::Debug;

use crate::error::{Chainable, Result};
use crate::filter::{Filter, Lines};
use crate::line::{Line, LineStream};

/// An ordered composition of [`Filter`]s over a single source stream.
///
/// Filters are applied in insertion order: the first filter sees the source
/// lines, the last one sees the output of all the others. Nothing is read
/// until the pipeline is drained, and a pipeline can only be drained once.
///
/// ```rust
/// use quire::line::LineStream;
/// use quire::pipeline::Pipeline;
/// use quire::filter::Map;
///
/// let output = Pipeline::new(LineStream::from_str("a\nb\n"))
///     .filter(Map::new(|line: &mut quire::line::Line| Ok(line.content() != "a")))
///     .collect_string()
///     .unwrap();
///
/// assert_eq!(output, "b\n");
/// ```
#[derive(Debug)]
pub struct Pipeline<'p> {
    path: Option<PathBuf>,
    #[debug(ignore)]
    source: Option<Lines<'p>>,
    #[debug(ignore)]
    filters: Vec<Box<dyn Filter + 'p>>,
}

impl<'p> Pipeline<'p> {
    /// A pipeline over `source`. If the stream is backed by a file, its path
    /// is attached to any error raised while draining.
    pub fn new(source: LineStream<'p>) -> Self {
        let path = source.path().map(Path::to_path_buf);
        Pipeline { path, source: Some(Box::new(source)), filters: vec![] }
    }

    /// Opens `path` as the pipeline's source.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Pipeline::new(LineStream::open(path)?))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Appends `filter`, wrapping the current head of the pipeline.
    pub fn filter<F: Filter + 'p>(mut self, filter: F) -> Self {
        self.push(filter);
        self
    }

    /// Like [`Pipeline::filter()`], for a pipeline behind a reference.
    pub fn push<F: Filter + 'p>(&mut self, filter: F) {
        self.filters.push(Box::new(filter));
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// `true` once the pipeline has been drained (or a drain was attempted).
    pub fn is_drained(&self) -> bool {
        self.source.is_none()
    }

    /// Drains the composed stream to exhaustion, discarding the lines, then
    /// finalizes every filter in order. Side effects, such as writing
    /// output, belong to the filters.
    pub fn drain(&mut self) -> Result<()> {
        self.run(|_| ())
    }

    /// Drains the pipeline and returns its output as one string.
    pub fn collect_string(mut self) -> Result<String> {
        let mut output = String::new();
        self.run(|line| output.push_str(line.as_str()))?;
        Ok(output)
    }

    /// Drains the pipeline and returns its output lines.
    pub fn collect_lines(mut self) -> Result<Vec<Line>> {
        let mut output = vec![];
        self.run(|line| output.push(line))?;
        Ok(output)
    }

    fn run<F: FnMut(Line)>(&mut self, mut each: F) -> Result<()> {
        let context = |path: &Option<PathBuf>| match path {
            Some(path) => error!("failed to process document", "path" => path.display()),
            None => error!("failed to process document"),
        };

        let Some(source) = self.source.take() else {
            return Err(error! {
                "pipeline already drained",
                "a pipeline's source can only be consumed once",
            }.chain(context(&self.path)));
        };

        {
            let mut lines: Lines<'_> = source;
            for filter in self.filters.iter_mut() {
                lines = filter.remap(lines);
            }

            for line in lines {
                each(line.chain_with(|| context(&self.path))?);
            }
        }

        for filter in self.filters.iter_mut() {
            filter.finalize().chain_with(|| context(&self.path))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::filter::Map;

    #[test]
    fn zero_filters_round_trip() {
        let input = "first\r\nsecond\n\n  indented\nlast";
        let output = Pipeline::new(LineStream::from_str(input)).collect_string().unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn filters_apply_in_insertion_order() {
        let mut pipeline = Pipeline::new(LineStream::from_str("x\n"))
            .filter(Map::new(|l: &mut Line| { let c = format!("{}a", l.content()); l.replace(c); Ok(true) }));

        pipeline.push(Map::new(|l: &mut Line| { let c = format!("{}b", l.content()); l.replace(c); Ok(true) }));
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.collect_string().unwrap(), "xab\n");
    }

    #[test]
    fn collected_lines_keep_numbers_and_terminators() {
        let lines = Pipeline::new(LineStream::from_str("keep\r\ndrop\n\nlast"))
            .filter(Map::new(|l: &mut Line| Ok(l.content() != "drop")))
            .collect_lines()
            .unwrap();

        let numbers: Vec<_> = lines.iter().map(Line::number).collect();
        let terminators: Vec<_> = lines.iter().map(Line::terminator).collect();
        assert_eq!(numbers, [1, 3, 4]);
        assert_eq!(terminators, ["\r\n", "\n", ""]);
        assert_eq!(lines[0].content(), "keep");
        assert!(lines[1].is_blank());
    }

    #[test]
    fn drain_twice_fails_fast() {
        let mut pipeline = Pipeline::new(LineStream::from_str("a\nb\n"));
        pipeline.drain().unwrap();
        assert!(pipeline.is_drained());

        let error = pipeline.drain().unwrap_err();
        assert_eq!(error.message(), "pipeline already drained");
    }

    #[test]
    fn errors_propagate_out_of_drain() {
        let mut pipeline = Pipeline::new(LineStream::from_str("ok\nbad\nunreached\n"))
            .filter(Map::new(|l: &mut Line| match l.content() {
                "bad" => malformed!("bad line", "line" => l.number()),
                _ => Ok(true),
            }));

        let error = pipeline.drain().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MalformedInput);
        assert!(error.to_string().contains("line: 2"));
    }
}

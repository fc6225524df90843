//! Lines and line streams, the unit of data flowing through a
//! [`Pipeline`](crate::pipeline::Pipeline).

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};

use crate::error::{Chainable, Error, Result};

/// A single line of text, terminator included.
///
/// The terminator (`\n`, `\r\n`, or nothing for a final unterminated line)
/// is kept verbatim so that a stream can be written back out byte-for-byte.
#[derive(Clone, PartialEq, Eq)]
pub struct Line {
    text: String,
    number: usize,
}

impl Line {
    /// Creates a line numbered `number` (1-based). `text` may carry a
    /// terminator.
    pub fn new<S: Into<String>>(text: S, number: usize) -> Self {
        Line { text: text.into(), number }
    }

    /// The 1-based line number in the source this line came from.
    pub fn number(&self) -> usize {
        self.number
    }

    /// The full text, terminator included.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The text without its terminator.
    pub fn content(&self) -> &str {
        let len = self.text.len() - self.terminator().len();
        &self.text[..len]
    }

    pub fn terminator(&self) -> &str {
        if self.text.ends_with("\r\n") {
            "\r\n"
        } else if self.text.ends_with('\n') {
            "\n"
        } else {
            ""
        }
    }

    /// `true` if the content is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.content().trim().is_empty()
    }

    /// Replaces the content, keeping the terminator and line number.
    pub fn replace<S: AsRef<str>>(&mut self, content: S) {
        let terminator = self.terminator().len();
        let start = self.text.len() - terminator;
        let mut text = String::with_capacity(content.as_ref().len() + terminator);
        text.push_str(content.as_ref());
        text.push_str(&self.text[start..]);
        self.text = text;
    }

    /// Like [`Line::replace()`] but consumes and returns `self`.
    pub fn with_content<S: AsRef<str>>(mut self, content: S) -> Self {
        self.replace(content);
        self
    }
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.number, self.text)
    }
}

impl AsRef<str> for Line {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// A lazy, finite, non-restartable stream of [`Line`]s read from any
/// [`BufRead`].
///
/// Once the reader is exhausted or fails, the stream is fused and yields
/// `None` forever.
pub struct LineStream<'r> {
    reader: Option<Box<dyn BufRead + 'r>>,
    path: Option<PathBuf>,
    number: usize,
}

impl<'r> LineStream<'r> {
    pub fn new<R: BufRead + 'r>(reader: R) -> Self {
        LineStream { reader: Some(Box::new(reader)), path: None, number: 0 }
    }

    /// Streams the lines of `string`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(string: &'r str) -> Self {
        LineStream::new(Cursor::new(string.as_bytes()))
    }

    /// Opens `path` and streams its lines lazily.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<LineStream<'static>> {
        let path = path.as_ref();
        let file = File::open(path).chain_with(|| error! {
            "failed to open file for reading",
            "file path" => path.display(),
        })?;

        let mut stream = LineStream::new(BufReader::new(file));
        stream.path = Some(path.to_path_buf());
        Ok(stream)
    }

    /// The path this stream reads from, if it is backed by a file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        let mut text = String::new();
        if reader.read_line(&mut text)? == 0 {
            self.reader = None;
            return Ok(None);
        }

        Ok(Some(text))
    }
}

impl Iterator for LineStream<'_> {
    type Item = Result<Line>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_line() {
            Ok(text) => {
                self.number += 1;
                text.map(|text| Ok(Line::new(text, self.number)))
            }
            Err(e) => {
                self.reader = None;
                let number = self.number + 1;
                Some(Err(Error::from(e).chain(error! {
                    "failed to read line",
                    "line" => number,
                })))
            }
        }
    }
}

impl fmt::Debug for LineStream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineStream")
            .field("path", &self.path)
            .field("line", &self.number)
            .field("exhausted", &self.reader.is_none())
            .finish()
    }
}

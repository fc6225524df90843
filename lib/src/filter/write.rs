use std::io;

use crate::error::{Chainable, Result};
use crate::filter::{Filter, Lines};

/// The terminal stage of a pipeline: writes every line that reaches it to
/// `output`, byte-for-byte, and passes it on.
#[derive(Debug)]
pub struct Write<W> {
    output: W,
}

impl<W: io::Write> Write<W> {
    pub fn new(output: W) -> Self {
        Write { output }
    }

    pub fn into_inner(self) -> W {
        self.output
    }
}

impl<W: io::Write> Filter for Write<W> {
    fn remap<'a>(&'a mut self, lines: Lines<'a>) -> Lines<'a> {
        let output = &mut self.output;
        Box::new(lines.map(move |line| {
            let line = line?;
            output.write_all(line.as_str().as_bytes()).chain_with(|| error! {
                "failed to write line",
                "line" => line.number(),
            })?;

            Ok(line)
        }))
    }

    fn finalize(&mut self) -> Result<()> {
        Ok(self.output.flush()?)
    }
}

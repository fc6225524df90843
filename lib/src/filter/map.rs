use std::borrow::Cow;

use regex::Regex;

use crate::error::Result;
use crate::filter::{Filter, Lines};
use crate::line::Line;

/// A stateless filter applying a closure to every line.
///
/// The closure may rewrite the line in place and returns `false` to drop it
/// from the stream.
#[derive(Clone)]
pub struct Map<F> {
    map: F,
}

impl<F: FnMut(&mut Line) -> Result<bool>> Map<F> {
    pub fn new(map: F) -> Self {
        Map { map }
    }
}

impl<F: FnMut(&mut Line) -> Result<bool>> Filter for Map<F> {
    fn remap<'a>(&'a mut self, lines: Lines<'a>) -> Lines<'a> {
        let map = &mut self.map;
        Box::new(lines.filter_map(move |line| {
            let mut line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };

            match map(&mut line) {
                Ok(true) => Some(Ok(line)),
                Ok(false) => None,
                Err(e) => Some(Err(e)),
            }
        }))
    }
}

/// A stateless regex substitution over the content of every line.
///
/// Terminators are never seen by the pattern and are preserved.
#[derive(Debug, Clone)]
pub struct Replace {
    pattern: Regex,
    replacement: String,
}

impl Replace {
    pub fn new<S: Into<String>>(pattern: Regex, replacement: S) -> Self {
        Replace { pattern, replacement: replacement.into() }
    }
}

impl Filter for Replace {
    fn remap<'a>(&'a mut self, lines: Lines<'a>) -> Lines<'a> {
        Box::new(lines.map(move |line| {
            let mut line = line?;
            let replaced = match self.pattern.replace_all(line.content(), &*self.replacement) {
                Cow::Owned(content) => Some(content),
                Cow::Borrowed(_) => None,
            };

            if let Some(content) = replaced {
                line.replace(content);
            }

            Ok(line)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::LineStream;
    use crate::pipeline::Pipeline;

    #[test]
    fn map_rewrites_and_drops() {
        let output = Pipeline::new(LineStream::from_str("keep\ndrop\nshout\n"))
            .filter(Map::new(|line: &mut Line| {
                if line.content() == "shout" {
                    let loud = line.content().to_uppercase();
                    line.replace(loud);
                }

                Ok(line.content() != "drop")
            }))
            .collect_string()
            .unwrap();

        assert_eq!(output, "keep\nSHOUT\n");
    }

    #[test]
    fn replace_substitutes_within_content() {
        let fit = Regex::new(r"\[fit\]\s*").unwrap();
        let output = Pipeline::new(LineStream::from_str("# [fit] Big\r\nplain"))
            .filter(Replace::new(fit, ""))
            .collect_string()
            .unwrap();

        assert_eq!(output, "# Big\r\nplain");
    }
}

//! The set of functions tracked by call-graph attribution.

use crate::{ParseError, Result};
use indexmap::IndexSet;
use std::io::{BufRead, BufReader, Read};

/// Functions whose runtime share is reported, loaded from a tag list.
///
/// The tag list holds one entry per line; the first whitespace-delimited token
/// is the function name and the rest of the line is ignored, which matches
/// `ctags -x` output. Duplicate names are kept once, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct TargetFunctions {
    names: IndexSet<String>,
}

impl TargetFunctions {
    /// Parse a tag list. A line without any token is an error.
    pub fn parse<R: Read>(reader: R) -> Result<Self> {
        let mut targets = Self::default();
        for (line_num, line_result) in BufReader::new(reader).lines().enumerate() {
            let line = line_result?;
            let name = line
                .split_whitespace()
                .next()
                .ok_or(ParseError::EmptyTagLine(line_num + 1))?;
            targets.insert(name);
        }
        Ok(targets)
    }

    fn insert(&mut self, name: &str) {
        if !self.names.contains(name) {
            self.names.insert(name.to_string());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for TargetFunctions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut targets = Self::default();
        for name in iter {
            targets.insert(name.as_ref());
        }
        targets
    }
}

//! Ordered function-to-percentage map and its JSON representation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Key under which the wall-clock time of a run is stored.
pub const TOTAL_TIME_KEY: &str = "_total_time";

/// Mapping from function name to percentage of runtime.
///
/// Entries keep insertion order, so after [`FunctionPercents::sort_descending`]
/// the JSON output lists the most expensive functions first. Names are unique:
/// inserting an existing name replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionPercents {
    entries: IndexMap<String, f64>,
}

impl FunctionPercents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.get(name).copied()
    }

    /// Set the value for `name`, returning the previous value if any.
    pub fn insert(&mut self, name: impl Into<String>, pct: f64) -> Option<f64> {
        self.entries.insert(name.into(), pct)
    }

    /// Add `pct` to the value for `name`, inserting it at zero first if absent.
    pub fn add(&mut self, name: &str, pct: f64) {
        match self.entries.get_mut(name) {
            Some(value) => *value += pct,
            None => {
                self.entries.insert(name.to_string(), pct);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, pct)| (n.as_str(), *pct))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut f64> {
        self.entries.values_mut()
    }

    /// Sum of all values.
    pub fn total(&self) -> f64 {
        self.entries.values().sum()
    }

    /// Sort by descending percentage. Ties keep their relative order.
    pub fn sort_descending(&mut self) {
        self.entries.sort_by(|_, a, _, b| b.total_cmp(a));
    }

    /// Write as JSON pretty-printed with four-space indentation.
    pub fn write_json<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(writer, formatter);
        self.serialize(&mut ser)
    }

    /// Read back a map previously written by [`FunctionPercents::write_json`].
    pub fn read_json<R: Read>(reader: R) -> serde_json::Result<Self> {
        serde_json::from_reader(reader)
    }
}

impl FromIterator<(String, f64)> for FunctionPercents {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

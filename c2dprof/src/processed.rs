//! Input discovery and the "already processed" check.

use crate::{Result, at_path};
use std::path::{Path, PathBuf};

/// Decides whether an input needs no further work.
///
/// Inputs are identified by their file name, e.g. `foo.cnf`.
pub trait ProcessedCheck {
    fn is_already_processed(&self, input_id: &str) -> bool;
}

impl<F> ProcessedCheck for F
where
    F: Fn(&str) -> bool,
{
    fn is_already_processed(&self, input_id: &str) -> bool {
        self(input_id)
    }
}

/// An input is processed once `<dir>/<input_id><suffix>` exists.
///
/// The check is not atomic: two batches running on the same directory may
/// both pick up the same input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputExists {
    dir: PathBuf,
    suffix: String,
}

impl OutputExists {
    pub fn new(dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            suffix: suffix.into(),
        }
    }

    pub fn output_path(&self, input_id: &str) -> PathBuf {
        self.dir.join(format!("{input_id}{}", self.suffix))
    }
}

impl ProcessedCheck for OutputExists {
    fn is_already_processed(&self, input_id: &str) -> bool {
        self.output_path(input_id).exists()
    }
}

/// A CNF instance found in the input directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CnfInput {
    pub path: PathBuf,
    /// File name, used to derive every output path.
    pub name: String,
}

/// All `.cnf` files directly inside `dir`, sorted by name.
pub fn list_cnfs(dir: &Path) -> Result<Vec<CnfInput>> {
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(at_path(dir))? {
        let entry = entry.map_err(at_path(dir))?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.ends_with(".cnf") && entry.path().is_file() {
            inputs.push(CnfInput {
                path: entry.path(),
                name,
            });
        }
    }
    inputs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(inputs)
}

/// The `.cnf` files in `dir`, split into those `check` does not consider
/// processed and those it does.
pub fn partition_cnfs(
    dir: &Path,
    check: &dyn ProcessedCheck,
) -> Result<(Vec<CnfInput>, Vec<CnfInput>)> {
    Ok(list_cnfs(dir)?
        .into_iter()
        .partition(|input| !check.is_already_processed(&input.name)))
}

//! Class index to name table.
//!
//! Names come from the model's `.prototxt`, one `classes: "name"` line per
//! class in index order. Indices without a name render as their number.

use crate::error::Result;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassLabels {
    names: Vec<String>,
}

impl ClassLabels {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Load names from a model `.prototxt` file
    pub fn from_prototxt<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let labels = Self::parse_prototxt(&contents);
        log::info!(
            "Loaded {} class labels from {}",
            labels.len(),
            path.as_ref().display()
        );
        Ok(labels)
    }

    /// Collect every `classes:` entry in order
    pub fn parse_prototxt(contents: &str) -> Self {
        let names = contents
            .lines()
            .map(str::trim_start)
            .filter_map(|line| line.strip_prefix("classes:"))
            .map(|rest| match rest.split_once('"') {
                Some((_, quoted)) => quoted.split('"').next().unwrap_or_default().to_string(),
                None => rest.trim().to_string(),
            })
            .collect();
        Self { names }
    }

    /// Name for `index`, or the index itself as text
    pub fn label_for(&self, index: usize) -> String {
        self.names
            .get(index)
            .cloned()
            .unwrap_or_else(|| index.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

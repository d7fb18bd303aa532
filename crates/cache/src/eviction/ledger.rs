//! Byte accounting for persisted entries

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Size of every tracked file plus their running total
#[derive(Debug, Default)]
pub struct UsageLedger {
    sizes: HashMap<PathBuf, u64>,
    total: u64,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tracked size for `path`; `None` stops tracking it.
    /// Returns the previously tracked size.
    pub fn record(&mut self, path: &Path, size: Option<u64>) -> Option<u64> {
        let previous = self.sizes.remove(path);
        if let Some(old) = previous {
            self.total = self.total.saturating_sub(old);
        }
        if let Some(new) = size {
            self.sizes.insert(path.to_path_buf(), new);
            self.total += new;
        }
        previous
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn size_of(&self, path: &Path) -> Option<u64> {
        self.sizes.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn clear(&mut self) {
        self.sizes.clear();
        self.total = 0;
    }
}

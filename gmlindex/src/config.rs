//! Index configuration.

/// Default branching factor, matching the classic STR-tree node capacity.
pub const DEFAULT_BRANCHING_FACTOR: usize = 10;

/// Default file name of the persisted index inside a database's directory.
pub const DEFAULT_INDEX_FILE_NAME: &str = "strtree.idx";

/// Configuration for spatial index construction and storage.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    branching_factor: usize,
    index_file_name: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            branching_factor: DEFAULT_BRANCHING_FACTOR,
            index_file_name: DEFAULT_INDEX_FILE_NAME.to_string(),
        }
    }
}

impl IndexConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the node capacity used at build time. Values below 2 are
    /// rounded up to 2, the smallest capacity that still forms a tree.
    pub fn with_branching_factor(mut self, branching_factor: usize) -> Self {
        self.branching_factor = branching_factor.max(2);
        self
    }

    /// Sets the file name used for the persisted index.
    pub fn with_index_file_name(mut self, name: impl Into<String>) -> Self {
        self.index_file_name = name.into();
        self
    }

    pub fn branching_factor(&self) -> usize {
        self.branching_factor
    }

    pub fn index_file_name(&self) -> &str {
        &self.index_file_name
    }
}

//! Engine configuration.

use entisql_domain::condition::DEFAULT_IN_CLAUSE_LIMIT;

/// Configuration for a [`crate::LocalEntityConnection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Whether updates verify that rows are unchanged since they were
    /// selected.
    pub optimistic_locking: bool,

    /// Whether foreign key resolution honours fetch depths.
    pub limit_fetch_depth: bool,

    /// Maximum number of values in one `in (...)` list.
    pub in_clause_limit: usize,

    /// Hard ceiling on resolution depth when fetch depths are not limited.
    pub max_fetch_depth: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            optimistic_locking: true,
            limit_fetch_depth: true,
            in_clause_limit: DEFAULT_IN_CLAUSE_LIMIT,
            max_fetch_depth: None,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether optimistic locking is enabled.
    #[must_use]
    pub const fn optimistic_locking(mut self, value: bool) -> Self {
        self.optimistic_locking = value;
        self
    }

    /// Sets whether fetch depths are honoured.
    #[must_use]
    pub const fn limit_fetch_depth(mut self, value: bool) -> Self {
        self.limit_fetch_depth = value;
        self
    }

    /// Sets the `in` list chunk size; values below 1 are treated as 1.
    #[must_use]
    pub const fn in_clause_limit(mut self, limit: usize) -> Self {
        self.in_clause_limit = if limit == 0 { 1 } else { limit };
        self
    }

    /// Sets the resolution depth ceiling used when fetch depths are not
    /// limited.
    #[must_use]
    pub const fn max_fetch_depth(mut self, depth: Option<usize>) -> Self {
        self.max_fetch_depth = depth;
        self
    }
}

//! Data-statistics interface.
//!
//! The compiler asks its statistics collaborator for source sizes; the
//! concrete provider (catalog, file system scanner, ...) lives with the
//! caller. Unknown figures stay `None`, in which case the cost model falls
//! back to conservative defaults and robust strategies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Basic size figures for one data source. Any field may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceStats {
    pub num_records: Option<u64>,
    pub avg_record_bytes: Option<f64>,
    pub num_bytes: Option<u64>,
}

/// Provider of basic statistics about data sources.
pub trait DataStatistics: Send + Sync {
    /// Statistics for the source registered under `source_id`, or `None`
    /// if the provider knows nothing about it.
    fn source_stats(&self, source_id: &str) -> Option<SourceStats>;
}

/// Map-backed statistics store, useful as a cache and in tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasicStatistics {
    stats: BTreeMap<String, SourceStats>,
}

impl BasicStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&mut self, source_id: impl Into<String>, stats: SourceStats) {
        self.stats.insert(source_id.into(), stats);
    }
}

impl DataStatistics for BasicStatistics {
    fn source_stats(&self, source_id: &str) -> Option<SourceStats> {
        self.stats.get(source_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_stats_are_returned() {
        let mut stats = BasicStatistics::new();
        stats.cache(
            "src",
            SourceStats {
                num_records: Some(100),
                avg_record_bytes: Some(16.0),
                num_bytes: Some(1600),
            },
        );
        assert_eq!(stats.source_stats("src").unwrap().num_records, Some(100));
        assert!(stats.source_stats("other").is_none());
    }
}

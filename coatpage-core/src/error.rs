use crate::types::{Category, StreamTag};
use std::collections::BTreeMap;
use thiserror::Error;

/// Structural and configuration failures of a run.
///
/// Parsing and classification problems never show up here: they degrade to
/// `Other`/`Unknown`/`None` or are dropped with a warning.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid match strategy '{0}' (expected 'number' or 'floor')")]
    InvalidStrategy(String),

    #[error("invalid run mode '{0}'")]
    InvalidMode(String),

    #[error("no template page for {category} ({stream:?}) but blocks require it")]
    MissingTemplate { category: Category, stream: StreamTag },

    #[error("{} entities were not assigned to any bucket", total_leftovers(.leftovers))]
    Unassigned {
        leftovers: BTreeMap<Category, Vec<String>>,
    },

    #[error("no buckets configured")]
    EmptyBucketSet,

    #[error("leftovers require a fallback plan but none was configured")]
    MissingFallbackPlan,

    #[error("invalid leftover target bucket {index} (only {count} buckets)")]
    InvalidLeftoverTarget { index: usize, count: usize },

    #[error("template writer failed: {0}")]
    Writer(String),

    #[error("input aborted")]
    Aborted,

    #[error("back one step")]
    BackStep,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn total_leftovers(leftovers: &BTreeMap<Category, Vec<String>>) -> usize {
    leftovers.values().map(Vec::len).sum()
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unassigned_message_counts_every_category() {
        let mut leftovers = BTreeMap::new();
        leftovers.insert(Category::ColumnSteel, vec!["GZ1".to_string(), "GZ2".to_string()]);
        leftovers.insert(Category::Bracing, vec!["WZ9".to_string()]);
        let err = EngineError::Unassigned { leftovers };
        assert_eq!(err.to_string(), "3 entities were not assigned to any bucket");
    }
}

//! Storage port: Trait for the append-only analysis history.
//!
//! This trait abstracts the storage backend (SQLite) from the application logic.

use crate::domain::{HistoryRecord, PatientIdentity, PatientInput, PredictionResult, RecordId};

/// Ordering of history reads, always by record id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// A page of history records with pagination metadata.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    /// Records in this page, newest first
    pub items: Vec<HistoryRecord>,
    /// Total count of all records (for UI pagination)
    pub total_count: usize,
    /// Current page offset
    pub offset: usize,
    /// Page size limit
    pub limit: usize,
    /// Whether there are more pages
    pub has_more: bool,
}

impl HistoryPage {
    /// Create a new history page.
    #[must_use]
    pub fn new(items: Vec<HistoryRecord>, total_count: usize, offset: usize, limit: usize) -> Self {
        let has_more = offset + items.len() < total_count;
        Self {
            items,
            total_count,
            offset,
            limit,
            has_more,
        }
    }

    /// Get the next page offset.
    #[must_use]
    pub fn next_offset(&self) -> Option<usize> {
        if self.has_more {
            Some(self.offset + self.limit)
        } else {
            None
        }
    }

    /// Get the previous page offset.
    #[must_use]
    pub fn prev_offset(&self) -> Option<usize> {
        if self.offset > 0 {
            Some(self.offset.saturating_sub(self.limit))
        } else {
            None
        }
    }
}

/// Trait for the prediction history store.
///
/// The store is append-only: there is no update or delete. Each append is
/// atomic and durable before it returns, and ids are strictly increasing.
pub trait PredictionStore: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist one analysis and return its id.
    ///
    /// # Errors
    /// Returns error if the record could not be written; nothing is stored in that case.
    fn append(
        &self,
        identity: &PatientIdentity,
        input: &PatientInput,
        result: &PredictionResult,
    ) -> Result<RecordId, Self::Error>;

    /// Load every record ordered by id.
    ///
    /// # Errors
    /// Returns error if storage operation fails; no partial list is returned.
    fn list_all(&self, direction: SortDirection) -> Result<Vec<HistoryRecord>, Self::Error>;

    /// Load records with pagination, newest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn list_page(&self, offset: usize, limit: usize) -> Result<HistoryPage, Self::Error>;

    /// Get the total count of records.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn count(&self) -> Result<usize, Self::Error>;
}

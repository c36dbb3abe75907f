use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type BookId = Uuid;

/// A named ledger containing cash entries, optionally tied to a business.
///
/// Books are soft-deleted: archiving stamps `archived_at` and blocks new
/// entries while keeping the history readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub name: String,
    /// Free-text business label shown alongside the book name.
    pub business: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Book {
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            business: None,
            created_at: now,
            updated_at: now,
            archived_at: None,
        }
    }

    pub fn with_business(mut self, business: impl Into<String>) -> Self {
        self.business = Some(business.into());
        self
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    /// A fresh book named "<name> (Copy)" with the same business label.
    /// Entries are not carried over.
    pub fn duplicate(&self) -> Self {
        let mut copy = Book::new(format!("{} (Copy)", self.name));
        copy.business = self.business.clone();
        copy
    }
}

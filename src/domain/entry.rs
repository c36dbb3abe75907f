use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BookId, Cents};

pub type EntryId = Uuid;

/// Direction of a cash movement. Determines which total the amount feeds
/// when a book's ledger is aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    CashIn,
    CashOut,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::CashIn => "cash_in",
            EntryType::CashOut => "cash_out",
        }
    }

    /// Accepts the stored form ("cash_in"), the CSV template label
    /// ("Cash In") and the short CLI spelling ("in").
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cash_in" | "cash in" | "in" => Some(EntryType::CashIn),
            "cash_out" | "cash out" | "out" => Some(EntryType::CashOut),
            _ => None,
        }
    }

    /// Label used in tables and the bulk-import template.
    pub fn label(&self) -> &'static str {
        match self {
            EntryType::CashIn => "Cash In",
            EntryType::CashOut => "Cash Out",
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One cash-in or cash-out record within a book.
///
/// Entries are immutable values; an edit replaces the whole record.
/// The attachment references, voice note and custom fields are opaque
/// payload carried through storage and listings without interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub book_id: BookId,
    pub entry_type: EntryType,
    /// Amount in cents. Validated non-negative at the application edge,
    /// not here.
    pub amount_cents: Cents,
    /// Calendar day the cash moved, as entered by the user.
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub contact: Option<String>,
    pub remarks: Option<String>,
    pub category: Option<String>,
    pub payment_mode: Option<String>,
    /// Opaque references to stored files. Never fetched or parsed.
    pub attachments: Vec<String>,
    pub voice_note: Option<String>,
    /// Deployment-specific extra fields, keyed by name.
    pub custom_fields: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(
        book_id: BookId,
        entry_type: EntryType,
        amount_cents: Cents,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            book_id,
            entry_type,
            amount_cents,
            date,
            time,
            contact: None,
            remarks: None,
            category: None,
            payment_mode: None,
            attachments: Vec::new(),
            voice_note: None,
            custom_fields: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_payment_mode(mut self, payment_mode: impl Into<String>) -> Self {
        self.payment_mode = Some(payment_mode.into());
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<String>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_voice_note(mut self, voice_note: impl Into<String>) -> Self {
        self.voice_note = Some(voice_note.into());
        self
    }

    pub fn with_custom_fields(mut self, fields: BTreeMap<String, serde_json::Value>) -> Self {
        self.custom_fields = fields;
        self
    }
}

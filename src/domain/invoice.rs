use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{BookId, Cents};

pub type InvoiceId = Uuid;
pub type InvoiceItemId = Uuid;

/// Invoice lifecycle. Draft invoices can still be edited; paid and
/// cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(InvoiceStatus::Draft),
            "sent" => Some(InvoiceStatus::Sent),
            "paid" => Some(InvoiceStatus::Paid),
            "overdue" => Some(InvoiceStatus::Overdue),
            "cancelled" => Some(InvoiceStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvoiceStatusError {
    #[error("cannot move invoice from {from} to {to}")]
    InvalidTransition {
        from: InvoiceStatus,
        to: InvoiceStatus,
    },
}

/// One line on an invoice. The line total is always derived, never
/// stored independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: InvoiceItemId,
    pub description: String,
    pub quantity: i64,
    pub unit_price_cents: Cents,
}

impl InvoiceItem {
    pub fn new(description: impl Into<String>, quantity: i64, unit_price_cents: Cents) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            quantity,
            unit_price_cents,
        }
    }

    pub fn line_total_cents(&self) -> Cents {
        self.quantity * self.unit_price_cents
    }
}

/// An invoice issued from a book.
///
/// All money figures are integer cents and the tax rate is held in
/// basis points, so subtotal, tax and total are exact. A percent rate
/// with up to two decimals maps to basis points the same way a money
/// amount maps to cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    /// Human-facing number, e.g. "INV-202401-0007". Assigned once at
    /// creation, unique per database.
    pub number: String,
    pub book_id: BookId,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub tax_rate_bps: i64,
    pub discount_cents: Cents,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub items: Vec<InvoiceItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn new(
        number: String,
        book_id: BookId,
        customer_name: String,
        invoice_date: NaiveDate,
        due_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            number,
            book_id,
            customer_name,
            customer_email: None,
            customer_phone: None,
            customer_address: None,
            invoice_date,
            due_date,
            tax_rate_bps: 0,
            discount_cents: 0,
            status: InvoiceStatus::Draft,
            notes: None,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_items(mut self, items: Vec<InvoiceItem>) -> Self {
        self.items = items;
        self
    }

    pub fn with_tax_rate_bps(mut self, tax_rate_bps: i64) -> Self {
        self.tax_rate_bps = tax_rate_bps;
        self
    }

    pub fn with_discount_cents(mut self, discount_cents: Cents) -> Self {
        self.discount_cents = discount_cents;
        self
    }

    pub fn with_customer_email(mut self, email: impl Into<String>) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    pub fn with_customer_phone(mut self, phone: impl Into<String>) -> Self {
        self.customer_phone = Some(phone.into());
        self
    }

    pub fn with_customer_address(mut self, address: impl Into<String>) -> Self {
        self.customer_address = Some(address.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn subtotal_cents(&self) -> Cents {
        self.items.iter().map(InvoiceItem::line_total_cents).sum()
    }

    /// Tax on the subtotal, rounded half-up to the nearest cent.
    pub fn tax_cents(&self) -> Cents {
        (self.subtotal_cents() * self.tax_rate_bps + 5_000) / 10_000
    }

    pub fn total_cents(&self) -> Cents {
        self.subtotal_cents() + self.tax_cents() - self.discount_cents
    }

    /// Send a draft invoice to the customer.
    pub fn send(&mut self) -> Result<(), InvoiceStatusError> {
        self.transition(InvoiceStatus::Sent, &[InvoiceStatus::Draft])
    }

    /// Record payment of a sent (possibly overdue) invoice.
    pub fn pay(&mut self) -> Result<(), InvoiceStatusError> {
        self.transition(
            InvoiceStatus::Paid,
            &[InvoiceStatus::Sent, InvoiceStatus::Overdue],
        )
    }

    pub fn cancel(&mut self) -> Result<(), InvoiceStatusError> {
        self.transition(
            InvoiceStatus::Cancelled,
            &[
                InvoiceStatus::Draft,
                InvoiceStatus::Sent,
                InvoiceStatus::Overdue,
            ],
        )
    }

    /// Flip a sent invoice to overdue once its due date has passed.
    /// Returns true when the status changed.
    pub fn refresh_overdue(&mut self, today: NaiveDate) -> bool {
        if self.status == InvoiceStatus::Sent && self.due_date < today {
            self.status = InvoiceStatus::Overdue;
            self.updated_at = Utc::now();
            return true;
        }
        false
    }

    fn transition(
        &mut self,
        to: InvoiceStatus,
        allowed_from: &[InvoiceStatus],
    ) -> Result<(), InvoiceStatusError> {
        if !allowed_from.contains(&self.status) {
            return Err(InvoiceStatusError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Invoice numbers run per calendar month: "INV-202401-0007" is the
/// seventh invoice created in January 2024.
pub fn format_invoice_number(date: NaiveDate, sequence: i64) -> String {
    format!("INV-{}{:02}-{:04}", date.year(), date.month(), sequence)
}

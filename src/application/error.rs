use thiserror::Error;

use crate::domain::{InvoiceStatusError, ParseCentsError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Book not found: {0}")]
    BookNotFound(String),

    #[error("Book already exists: {0}")]
    BookAlreadyExists(String),

    #[error("Book is archived: {0}")]
    BookArchived(String),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    #[error("Invoice has no items")]
    EmptyInvoice,

    #[error(transparent)]
    InvoiceStatus(#[from] InvoiceStatusError),

    #[error("Invalid money value: {0}")]
    ParseMoney(#[from] ParseCentsError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use std::io::Read;

use crate::application::{AppError, CashbookService, EntryDraft};
use crate::domain::{EntryType, parse_cents};

/// Result of an import operation
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
}

/// Column indices resolved from the CSV header. Columns are matched by
/// name, not position, and unknown columns are ignored, so exports
/// carrying extra fields still import.
struct Columns {
    date: usize,
    entry_type: usize,
    amount: usize,
    contact: Option<usize>,
    remarks: Option<usize>,
    category: Option<usize>,
    payment_mode: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self> {
        let mut date = None;
        let mut entry_type = None;
        let mut amount = None;
        let mut contact = None;
        let mut remarks = None;
        let mut category = None;
        let mut payment_mode = None;

        for (idx, header) in headers.iter().enumerate() {
            match header.trim().to_ascii_lowercase().as_str() {
                "date" => date = Some(idx),
                "type" => entry_type = Some(idx),
                "amount" => amount = Some(idx),
                "contact name" | "contact" => contact = Some(idx),
                "remarks" => remarks = Some(idx),
                "category" => category = Some(idx),
                "payment mode" | "payment_mode" => payment_mode = Some(idx),
                _ => {}
            }
        }

        Ok(Self {
            date: date.context("CSV is missing required column 'Date'")?,
            entry_type: entry_type.context("CSV is missing required column 'Type'")?,
            amount: amount.context("CSV is missing required column 'Amount'")?,
            contact,
            remarks,
            category,
            payment_mode,
        })
    }
}

/// Importer for loading entries into a book from CSV
///
/// Expected header: `Date,Type,Amount,Contact Name,Remarks,Category,
/// Payment Mode`, with only the first three columns required. Rows that
/// fail validation are reported and skipped, never aborting the batch.
pub struct Importer<'a> {
    service: &'a CashbookService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a CashbookService) -> Self {
        Self { service }
    }

    /// Import entries into a book from CSV. With `dry_run` every row is
    /// validated and counted but nothing is written.
    pub async fn import_entries_csv<R: Read>(
        &self,
        book_name: &str,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        // Fail fast on a bad target instead of erroring on every row
        let book = self.service.get_book(book_name).await?;
        if book.is_archived() {
            return Err(AppError::BookArchived(book_name.to_string()).into());
        }

        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .context("Failed to read CSV header")?
            .clone();
        let columns = Columns::resolve(&headers)?;

        let mut imported = 0;
        let mut skipped = 0;
        let mut errors = Vec::new();

        for (line_num, result) in csv_reader.records().enumerate() {
            let line = line_num + 2; // +2 for header and 0-indexing

            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    skipped += 1;
                    errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            // Rows of stray separators parse as all-empty records
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            let date_str = field_at(&record, columns.date);
            let date = match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
                Ok(d) => d,
                Err(_) => {
                    skipped += 1;
                    errors.push(ImportError {
                        line,
                        field: Some("Date".to_string()),
                        error: format!("Invalid date '{}', expected YYYY-MM-DD", date_str),
                    });
                    continue;
                }
            };

            let type_str = field_at(&record, columns.entry_type);
            let entry_type = match EntryType::from_str(type_str) {
                Some(t) => t,
                None => {
                    skipped += 1;
                    errors.push(ImportError {
                        line,
                        field: Some("Type".to_string()),
                        error: format!("Invalid type '{}', expected Cash In or Cash Out", type_str),
                    });
                    continue;
                }
            };

            let amount_str = field_at(&record, columns.amount);
            let amount_cents = match parse_cents(amount_str) {
                Ok(a) if a >= 0 => a,
                Ok(_) => {
                    skipped += 1;
                    errors.push(ImportError {
                        line,
                        field: Some("Amount".to_string()),
                        error: "Amount cannot be negative".to_string(),
                    });
                    continue;
                }
                Err(e) => {
                    skipped += 1;
                    errors.push(ImportError {
                        line,
                        field: Some("Amount".to_string()),
                        error: format!("Invalid amount: {}", e),
                    });
                    continue;
                }
            };

            // The template has no time column, imported entries land at midnight
            let mut draft = EntryDraft::new(entry_type, amount_cents, date, NaiveTime::MIN);
            draft.contact = optional_field(&record, columns.contact);
            draft.remarks = optional_field(&record, columns.remarks);
            draft.category = optional_field(&record, columns.category);
            draft.payment_mode = optional_field(&record, columns.payment_mode);

            if options.dry_run {
                imported += 1;
                continue;
            }

            self.service.record_entry(book_name, draft).await?;
            imported += 1;
        }

        Ok(ImportResult {
            imported,
            skipped,
            errors,
        })
    }
}

fn field_at(record: &csv::StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("").trim()
}

fn optional_field(record: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|idx| record.get(idx))
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(String::from)
}

// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use cashbook::application::{CashbookService, EntryDraft, InvoiceDraft};
use cashbook::domain::{EntryType, InvoiceItem};
use chrono::{Duration, NaiveDate, NaiveTime};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(CashbookService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = CashbookService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Helper to build a minimal entry draft at 10:00
pub fn draft(entry_type: EntryType, amount_cents: i64, date: &str) -> EntryDraft {
    EntryDraft::new(
        entry_type,
        amount_cents,
        parse_date(date),
        NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
    )
}

/// Helper to build an invoice draft due in 30 days, no tax or discount
pub fn invoice_draft(date: &str, items: Vec<InvoiceItem>) -> InvoiceDraft {
    let invoice_date = parse_date(date);
    InvoiceDraft {
        customer_name: "Ravi Kumar".into(),
        customer_email: None,
        customer_phone: None,
        customer_address: None,
        invoice_date,
        due_date: invoice_date + Duration::days(30),
        tax_rate_bps: 0,
        discount_cents: 0,
        notes: None,
        items,
    }
}

/// Test fixture: a shop book with a small known history
pub struct ShopBook;

impl ShopBook {
    /// Create the "Shop" book without entries
    pub async fn create(service: &CashbookService) -> Result<()> {
        service
            .create_book("Shop".into(), Some("Acme Stores".into()))
            .await?;
        Ok(())
    }

    /// Create the "Shop" book and seed four entries:
    /// 700.00 in, 205.00 out, balance 495.00
    pub async fn seed(service: &CashbookService) -> Result<()> {
        Self::create(service).await?;

        let mut sale = draft(EntryType::CashIn, 50_000, "2024-01-05");
        sale.contact = Some("Asha Traders".into());
        sale.remarks = Some("Opening sale".into());
        sale.category = Some("Sale".into());
        sale.payment_mode = Some("Cash".into());
        service.record_entry("Shop", sale).await?;

        let mut rent = draft(EntryType::CashOut, 12_500, "2024-01-10");
        rent.contact = Some("City Rentals".into());
        rent.remarks = Some("January rent".into());
        rent.category = Some("Rent".into());
        rent.payment_mode = Some("Bank Transfer".into());
        service.record_entry("Shop", rent).await?;

        let mut counter = draft(EntryType::CashIn, 20_000, "2024-01-20");
        counter.remarks = Some("Counter sale".into());
        counter.category = Some("Sale".into());
        counter.payment_mode = Some("UPI".into());
        service.record_entry("Shop", counter).await?;

        let mut stock = draft(EntryType::CashOut, 8_000, "2024-02-01");
        stock.remarks = Some("Stock refill".into());
        stock.category = Some("Stock".into());
        stock.payment_mode = Some("Cash".into());
        service.record_entry("Shop", stock).await?;

        Ok(())
    }
}

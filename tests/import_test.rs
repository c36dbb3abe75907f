mod common;

use anyhow::Result;
use cashbook::domain::EntryFilter;
use cashbook::io::{ImportOptions, Importer};
use chrono::NaiveTime;
use common::{ShopBook, test_service};

const TEMPLATE: &str = "\
Date,Type,Amount,Contact Name,Remarks,Category,Payment Mode
2024-01-05,Cash In,500.00,Asha Traders,Opening sale,Sale,Cash
2024-01-10,Cash Out,125.00,City Rentals,January rent,Rent,Bank Transfer
2024-01-20,Cash In,200.00,,Counter sale,Sale,UPI
";

#[tokio::test]
async fn test_import_template_rows() -> Result<()> {
    let (service, _temp) = test_service().await?;
    ShopBook::create(&service).await?;

    let importer = Importer::new(&service);
    let result = importer
        .import_entries_csv("Shop", TEMPLATE.as_bytes(), ImportOptions::default())
        .await?;

    assert_eq!(result.imported, 3);
    assert_eq!(result.skipped, 0);
    assert!(result.errors.is_empty());

    let summary = service.book_summary("Shop").await?;
    assert_eq!(summary.entry_count, 3);
    assert_eq!(summary.snapshot.total_cash_in, 70_000);
    assert_eq!(summary.snapshot.total_cash_out, 12_500);
    assert_eq!(summary.snapshot.balance, 57_500);

    // Optional fields landed on the entries
    let entries = service
        .list_entries("Shop", &EntryFilter::default(), None)
        .await?;
    let rent = entries.iter().find(|e| e.amount_cents == 12_500).unwrap();
    assert_eq!(rent.contact.as_deref(), Some("City Rentals"));
    assert_eq!(rent.category.as_deref(), Some("Rent"));
    assert_eq!(rent.payment_mode.as_deref(), Some("Bank Transfer"));
    // No time column in the template, rows land at midnight
    assert_eq!(rent.time, NaiveTime::MIN);

    Ok(())
}

#[tokio::test]
async fn test_bad_rows_are_reported_not_fatal() -> Result<()> {
    let csv = "\
Date,Type,Amount
05/01/2024,Cash In,100.00
2024-01-06,Loan,100.00
2024-01-07,Cash In,10.123
2024-01-08,Cash In,-5.00
2024-01-09,Cash In,100.00
";
    let (service, _temp) = test_service().await?;
    ShopBook::create(&service).await?;

    let importer = Importer::new(&service);
    let result = importer
        .import_entries_csv("Shop", csv.as_bytes(), ImportOptions::default())
        .await?;

    assert_eq!(result.imported, 1);
    assert_eq!(result.skipped, 4);
    assert_eq!(result.errors.len(), 4);

    // Line numbers count from the file start, header included
    let lines: Vec<usize> = result.errors.iter().map(|e| e.line).collect();
    assert_eq!(lines, [2, 3, 4, 5]);

    let fields: Vec<Option<&str>> = result.errors.iter().map(|e| e.field.as_deref()).collect();
    assert_eq!(
        fields,
        [Some("Date"), Some("Type"), Some("Amount"), Some("Amount")]
    );

    // Only the good row landed
    assert_eq!(service.book_summary("Shop").await?.entry_count, 1);

    Ok(())
}

#[tokio::test]
async fn test_dry_run_validates_without_writing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    ShopBook::create(&service).await?;

    let importer = Importer::new(&service);
    let result = importer
        .import_entries_csv("Shop", TEMPLATE.as_bytes(), ImportOptions { dry_run: true })
        .await?;

    assert_eq!(result.imported, 3);
    assert_eq!(result.skipped, 0);
    assert_eq!(service.book_summary("Shop").await?.entry_count, 0);

    Ok(())
}

#[tokio::test]
async fn test_extra_columns_and_blank_rows_ignored() -> Result<()> {
    // Header names are matched case-insensitively; unknown columns and
    // rows of empty fields are passed over
    let csv = "\
Entry Id,date,TYPE,amount,Balance
e-1,2024-01-05,in,100.00,99
,,,,
e-2,2024-01-06,out,40.00,59
";
    let (service, _temp) = test_service().await?;
    ShopBook::create(&service).await?;

    let importer = Importer::new(&service);
    let result = importer
        .import_entries_csv("Shop", csv.as_bytes(), ImportOptions::default())
        .await?;

    assert_eq!(result.imported, 2);
    assert_eq!(result.skipped, 0);
    assert!(result.errors.is_empty());
    assert_eq!(service.book_summary("Shop").await?.snapshot.balance, 6_000);

    Ok(())
}

#[tokio::test]
async fn test_missing_required_column_fails() -> Result<()> {
    let (service, _temp) = test_service().await?;
    ShopBook::create(&service).await?;

    let csv = "Date,Type\n2024-01-05,Cash In\n";
    let importer = Importer::new(&service);
    let result = importer
        .import_entries_csv("Shop", csv.as_bytes(), ImportOptions::default())
        .await;

    let err = result.unwrap_err().to_string();
    assert!(err.contains("Amount"), "unexpected error: {err}");

    Ok(())
}

#[tokio::test]
async fn test_import_targets_must_exist_and_be_active() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let importer = Importer::new(&service);
    let missing = importer
        .import_entries_csv("Nowhere", TEMPLATE.as_bytes(), ImportOptions::default())
        .await;
    assert!(missing.is_err());

    ShopBook::create(&service).await?;
    service.archive_book("Shop").await?;
    let archived = importer
        .import_entries_csv("Shop", TEMPLATE.as_bytes(), ImportOptions::default())
        .await;
    assert!(archived.is_err());

    Ok(())
}

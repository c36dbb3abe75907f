mod common;

use anyhow::Result;
use cashbook::application::{AppError, EntryPatch};
use cashbook::domain::{DateRange, DurationPreset, EntryFilter, EntryType};
use common::{ShopBook, draft, parse_date, test_service};
use uuid::Uuid;

#[tokio::test]
async fn test_record_entries_updates_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    ShopBook::create(&service).await?;

    let entry = service
        .record_entry("Shop", draft(EntryType::CashIn, 150_000, "2024-01-05"))
        .await?;
    assert_eq!(entry.amount_cents, 150_000);
    assert_eq!(entry.entry_type, EntryType::CashIn);

    service
        .record_entry("Shop", draft(EntryType::CashOut, 40_000, "2024-01-06"))
        .await?;

    let summary = service.book_summary("Shop").await?;
    assert_eq!(summary.snapshot.total_cash_in, 150_000);
    assert_eq!(summary.snapshot.total_cash_out, 40_000);
    assert_eq!(summary.snapshot.balance, 110_000);
    assert_eq!(summary.entry_count, 2);

    Ok(())
}

#[tokio::test]
async fn test_zero_amount_allowed_negative_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    ShopBook::create(&service).await?;

    // Zero-amount entries are legal and contribute nothing
    service
        .record_entry("Shop", draft(EntryType::CashIn, 0, "2024-01-05"))
        .await?;

    let rejected = service
        .record_entry("Shop", draft(EntryType::CashIn, -500, "2024-01-05"))
        .await;
    assert!(matches!(rejected, Err(AppError::InvalidAmount(_))));

    let summary = service.book_summary("Shop").await?;
    assert_eq!(summary.entry_count, 1);
    assert_eq!(summary.snapshot.balance, 0);

    Ok(())
}

#[tokio::test]
async fn test_record_into_unknown_book() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service
        .record_entry("Nowhere", draft(EntryType::CashIn, 1_000, "2024-01-05"))
        .await;
    assert!(matches!(result, Err(AppError::BookNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_update_entry_amount_and_type() -> Result<()> {
    let (service, _temp) = test_service().await?;
    ShopBook::create(&service).await?;

    let entry = service
        .record_entry("Shop", draft(EntryType::CashIn, 30_000, "2024-01-05"))
        .await?;

    // Change only the amount
    let patched = service
        .update_entry(
            entry.id,
            EntryPatch {
                amount_cents: Some(45_000),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(patched.amount_cents, 45_000);
    assert_eq!(service.book_summary("Shop").await?.snapshot.balance, 45_000);

    // Flip the type; the balance swings by twice the amount
    service
        .update_entry(
            entry.id,
            EntryPatch {
                entry_type: Some(EntryType::CashOut),
                ..Default::default()
            },
        )
        .await?;

    let summary = service.book_summary("Shop").await?;
    assert_eq!(summary.snapshot.total_cash_in, 0);
    assert_eq!(summary.snapshot.total_cash_out, 45_000);
    assert_eq!(summary.snapshot.balance, -45_000);
    assert_eq!(summary.entry_count, 1);

    Ok(())
}

#[tokio::test]
async fn test_update_unknown_entry() -> Result<()> {
    let (service, _temp) = test_service().await?;
    ShopBook::create(&service).await?;

    let result = service
        .update_entry(
            Uuid::new_v4(),
            EntryPatch {
                amount_cents: Some(100),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::EntryNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_delete_entry_updates_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    ShopBook::create(&service).await?;

    let keep = service
        .record_entry("Shop", draft(EntryType::CashIn, 20_000, "2024-01-05"))
        .await?;
    let gone = service
        .record_entry("Shop", draft(EntryType::CashOut, 7_500, "2024-01-06"))
        .await?;

    service.delete_entry(gone.id).await?;

    let summary = service.book_summary("Shop").await?;
    assert_eq!(summary.entry_count, 1);
    assert_eq!(summary.snapshot.balance, 20_000);

    let entries = service
        .list_entries("Shop", &EntryFilter::default(), None)
        .await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, keep.id);

    // Deleting again is an error
    let again = service.delete_entry(gone.id).await;
    assert!(matches!(again, Err(AppError::EntryNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_list_entries_newest_first() -> Result<()> {
    let (service, _temp) = test_service().await?;
    ShopBook::seed(&service).await?;

    let entries = service
        .list_entries("Shop", &EntryFilter::default(), None)
        .await?;

    let dates: Vec<String> = entries.iter().map(|e| e.date.to_string()).collect();
    assert_eq!(dates, ["2024-02-01", "2024-01-20", "2024-01-10", "2024-01-05"]);

    Ok(())
}

#[tokio::test]
async fn test_filter_by_type_and_date_window() -> Result<()> {
    let (service, _temp) = test_service().await?;
    ShopBook::seed(&service).await?;

    let cash_in = EntryFilter {
        entry_type: Some(EntryType::CashIn),
        ..Default::default()
    };
    let entries = service.list_entries("Shop", &cash_in, None).await?;
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.entry_type == EntryType::CashIn));

    // Explicit window over January catches three of the four entries
    let january = EntryFilter {
        range: DateRange::between(Some(parse_date("2024-01-01")), Some(parse_date("2024-01-31"))),
        ..Default::default()
    };
    let entries = service.list_entries("Shop", &january, None).await?;
    assert_eq!(entries.len(), 3);

    // The same window via the preset, resolved against a January day
    let preset = EntryFilter {
        range: DurationPreset::ThisMonth.range(parse_date("2024-01-15")),
        ..Default::default()
    };
    let entries = service.list_entries("Shop", &preset, None).await?;
    assert_eq!(entries.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_filter_by_category_is_case_insensitive() -> Result<()> {
    let (service, _temp) = test_service().await?;
    ShopBook::seed(&service).await?;

    let filter = EntryFilter {
        category: Some("sale".to_string()),
        ..Default::default()
    };
    let entries = service.list_entries("Shop", &filter, None).await?;
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.category.as_deref() == Some("Sale")));

    let filter = EntryFilter {
        payment_mode: Some("CASH".to_string()),
        ..Default::default()
    };
    let entries = service.list_entries("Shop", &filter, None).await?;
    assert_eq!(entries.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_search_matches_remarks_and_amount() -> Result<()> {
    let (service, _temp) = test_service().await?;
    ShopBook::seed(&service).await?;

    let by_remark = EntryFilter {
        search: Some("rent".to_string()),
        ..Default::default()
    };
    let entries = service.list_entries("Shop", &by_remark, None).await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].remarks.as_deref(), Some("January rent"));

    // 12500 cents formats as "125.00"
    let by_amount = EntryFilter {
        search: Some("125.00".to_string()),
        ..Default::default()
    };
    let entries = service.list_entries("Shop", &by_amount, None).await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].amount_cents, 12_500);

    let by_contact = EntryFilter {
        contact: Some("asha traders".to_string()),
        ..Default::default()
    };
    let entries = service.list_entries("Shop", &by_contact, None).await?;
    assert_eq!(entries.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_limit_applies_after_filters() -> Result<()> {
    let (service, _temp) = test_service().await?;
    ShopBook::seed(&service).await?;

    // Limit on the plain listing trims to the newest entries
    let entries = service
        .list_entries("Shop", &EntryFilter::default(), Some(2))
        .await?;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].date, parse_date("2024-02-01"));

    // Both "Opening sale" and "Counter sale" match; the limit keeps the
    // newer one
    let filter = EntryFilter {
        search: Some("sale".to_string()),
        ..Default::default()
    };
    let entries = service.list_entries("Shop", &filter, Some(1)).await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].remarks.as_deref(), Some("Counter sale"));

    Ok(())
}

mod common;

use anyhow::Result;
use cashbook::application::AppError;
use cashbook::domain::{EntryType, InvoiceItem, LedgerSnapshot};
use common::{ShopBook, draft, invoice_draft, test_service};

#[tokio::test]
async fn test_create_and_list_books() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service
        .create_book("Shop".into(), Some("Acme Stores".into()))
        .await?;
    service.create_book("Personal".into(), None).await?;

    let books = service.list_books(false).await?;
    assert_eq!(books.len(), 2);

    let names: Vec<&str> = books.iter().map(|b| b.name.as_str()).collect();
    assert!(names.contains(&"Shop"));
    assert!(names.contains(&"Personal"));

    let shop = service.get_book("Shop").await?;
    assert_eq!(shop.business.as_deref(), Some("Acme Stores"));
    assert!(!shop.is_archived());

    Ok(())
}

#[tokio::test]
async fn test_duplicate_name_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service.create_book("Shop".into(), None).await?;
    let result = service.create_book("Shop".into(), None).await;

    assert!(matches!(result, Err(AppError::BookAlreadyExists(_))));
    Ok(())
}

#[tokio::test]
async fn test_duplicate_book_appends_copy() -> Result<()> {
    let (service, _temp) = test_service().await?;

    ShopBook::seed(&service).await?;

    let copy = service.duplicate_book("Shop").await?;
    assert_eq!(copy.name, "Shop (Copy)");
    assert_eq!(copy.business.as_deref(), Some("Acme Stores"));

    // Settings carry over, history does not
    let summary = service.book_summary("Shop (Copy)").await?;
    assert_eq!(summary.entry_count, 0);
    assert_eq!(summary.snapshot.balance, 0);

    // A second duplicate collides with the first
    let again = service.duplicate_book("Shop").await;
    assert!(matches!(again, Err(AppError::BookAlreadyExists(_))));

    // Duplicating the copy stacks the suffix
    let nested = service.duplicate_book("Shop (Copy)").await?;
    assert_eq!(nested.name, "Shop (Copy) (Copy)");

    Ok(())
}

#[tokio::test]
async fn test_archive_frees_name_and_blocks_recording() -> Result<()> {
    let (service, _temp) = test_service().await?;

    ShopBook::seed(&service).await?;
    service.archive_book("Shop").await?;

    // Archived books reject new entries
    let rejected = service
        .record_entry("Shop", draft(EntryType::CashIn, 1_000, "2024-03-01"))
        .await;
    assert!(matches!(rejected, Err(AppError::BookArchived(_))));

    // The history stays readable after archiving
    let summary = service.book_summary("Shop").await?;
    assert_eq!(summary.entry_count, 4);
    assert_eq!(summary.snapshot.balance, 49_500);

    // Archiving twice is an error
    let again = service.archive_book("Shop").await;
    assert!(matches!(again, Err(AppError::BookArchived(_))));

    // The name is free again; the new active book wins lookups
    service.create_book("Shop".into(), None).await?;
    let fresh = service.book_summary("Shop").await?;
    assert_eq!(fresh.entry_count, 0);
    assert!(!fresh.book.is_archived());

    assert_eq!(service.list_books(true).await?.len(), 2);
    assert_eq!(service.list_books(false).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_delete_book_cascades() -> Result<()> {
    let (service, _temp) = test_service().await?;

    ShopBook::seed(&service).await?;
    service
        .create_invoice(
            "Shop",
            invoice_draft(
                "2024-01-15",
                vec![InvoiceItem::new("Repair work", 1, 10_000)],
            ),
        )
        .await?;

    service.delete_book("Shop").await?;

    assert!(service.list_books(true).await?.is_empty());
    assert!(service.list_invoices(None, None).await?.is_empty());
    assert!(matches!(
        service.get_book("Shop").await,
        Err(AppError::BookNotFound(_))
    ));

    // The name is reusable and the new book starts clean
    service.create_book("Shop".into(), None).await?;
    let summary = service.book_summary("Shop").await?;
    assert_eq!(summary.entry_count, 0);
    assert_eq!(summary.snapshot, LedgerSnapshot::ZERO);

    Ok(())
}

#[tokio::test]
async fn test_list_books_with_balances() -> Result<()> {
    let (service, _temp) = test_service().await?;

    ShopBook::seed(&service).await?;
    service.create_book("Side".into(), None).await?;

    let balances = service.list_books_with_balances(false).await?;
    assert_eq!(balances.len(), 2);

    let shop = balances.iter().find(|b| b.book.name == "Shop").unwrap();
    assert_eq!(shop.snapshot.total_cash_in, 70_000);
    assert_eq!(shop.snapshot.total_cash_out, 20_500);
    assert_eq!(shop.snapshot.balance, 49_500);
    assert_eq!(shop.entry_count, 4);

    let side = balances.iter().find(|b| b.book.name == "Side").unwrap();
    assert_eq!(side.snapshot, LedgerSnapshot::ZERO);
    assert_eq!(side.entry_count, 0);

    Ok(())
}

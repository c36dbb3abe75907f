mod common;

use anyhow::Result;
use cashbook::application::EntryPatch;
use cashbook::domain::{BookLedger, EntryEvent, EntryFilter, EntryType, compute};
use common::{ShopBook, draft, test_service};

#[tokio::test]
async fn test_mirror_follows_event_feed() -> Result<()> {
    let (service, _temp) = test_service().await?;
    ShopBook::create(&service).await?;

    let mut feed = service.subscribe();
    let mut mirror = BookLedger::new();

    let first = service
        .record_entry("Shop", draft(EntryType::CashIn, 50_000, "2024-01-05"))
        .await?;
    let second = service
        .record_entry("Shop", draft(EntryType::CashOut, 12_500, "2024-01-10"))
        .await?;
    service
        .update_entry(
            first.id,
            EntryPatch {
                amount_cents: Some(60_000),
                ..Default::default()
            },
        )
        .await?;
    service.delete_entry(second.id).await?;

    while let Ok(event) = feed.try_recv() {
        assert!(mirror.apply(&event));
    }

    // The mirror agrees with the store and with the service cache
    let entries = service
        .list_entries("Shop", &EntryFilter::default(), None)
        .await?;
    assert_eq!(mirror.len(), entries.len());
    assert_eq!(mirror.snapshot(), compute(&entries));

    let summary = service.book_summary("Shop").await?;
    assert_eq!(mirror.snapshot(), summary.snapshot);
    assert_eq!(summary.snapshot.balance, 60_000);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_delivery_is_skipped() -> Result<()> {
    let (service, _temp) = test_service().await?;
    ShopBook::create(&service).await?;

    let mut feed = service.subscribe();
    let entry = service
        .record_entry("Shop", draft(EntryType::CashIn, 10_000, "2024-01-05"))
        .await?;

    let event = feed.try_recv()?;
    let mut mirror = BookLedger::new();
    assert!(mirror.apply(&event));
    // Redelivery of the same insert must not double-count
    assert!(!mirror.apply(&event));

    assert_eq!(mirror.len(), 1);
    assert_eq!(mirror.snapshot().total_cash_in, 10_000);
    assert!(mirror.contains(&entry.id));

    Ok(())
}

#[tokio::test]
async fn test_update_event_carries_both_versions() -> Result<()> {
    let (service, _temp) = test_service().await?;
    ShopBook::create(&service).await?;

    let entry = service
        .record_entry("Shop", draft(EntryType::CashIn, 10_000, "2024-01-05"))
        .await?;

    let mut feed = service.subscribe();
    service
        .update_entry(
            entry.id,
            EntryPatch {
                entry_type: Some(EntryType::CashOut),
                amount_cents: Some(2_500),
                ..Default::default()
            },
        )
        .await?;

    match feed.try_recv()? {
        EntryEvent::Updated { before, after } => {
            assert_eq!(before.id, after.id);
            assert_eq!(before.entry_type, EntryType::CashIn);
            assert_eq!(before.amount_cents, 10_000);
            assert_eq!(after.entry_type, EntryType::CashOut);
            assert_eq!(after.amount_cents, 2_500);
        }
        other => panic!("expected an update event, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_mirror_scoped_to_one_book() -> Result<()> {
    let (service, _temp) = test_service().await?;
    ShopBook::create(&service).await?;
    service.create_book("Side".into(), None).await?;

    let shop_id = service.get_book("Shop").await?.id;

    let mut feed = service.subscribe();
    service
        .record_entry("Shop", draft(EntryType::CashIn, 30_000, "2024-01-05"))
        .await?;
    service
        .record_entry("Side", draft(EntryType::CashIn, 999_999, "2024-01-05"))
        .await?;

    // The feed is shared; a consumer tracking one book filters by id
    let mut mirror = BookLedger::new();
    while let Ok(event) = feed.try_recv() {
        if event.book_id() == shop_id {
            mirror.apply(&event);
        }
    }

    assert_eq!(mirror.len(), 1);
    assert_eq!(mirror.snapshot().balance, 30_000);

    Ok(())
}

#[tokio::test]
async fn test_resync_recovers_after_missed_deliveries() -> Result<()> {
    let (service, _temp) = test_service().await?;
    ShopBook::seed(&service).await?;

    // This consumer came up late and missed the four seed inserts
    let mut mirror = BookLedger::new();
    let mut feed = service.subscribe();

    let entry = service
        .record_entry("Shop", draft(EntryType::CashIn, 5_000, "2024-02-10"))
        .await?;

    while let Ok(event) = feed.try_recv() {
        assert!(mirror.apply(&event));
    }
    // The one delivery it saw applied cleanly, but the mirror is short
    assert_eq!(mirror.len(), 1);

    // A resync from a full fetch squares it with the store
    let entries = service
        .list_entries("Shop", &EntryFilter::default(), None)
        .await?;
    mirror.resync(entries);

    assert_eq!(mirror.len(), 5);
    assert!(mirror.contains(&entry.id));
    assert_eq!(mirror.snapshot().balance, 54_500);
    assert_eq!(
        mirror.snapshot(),
        service.book_summary("Shop").await?.snapshot
    );

    Ok(())
}

#[tokio::test]
async fn test_summary_cache_tracks_mutations() -> Result<()> {
    let (service, _temp) = test_service().await?;
    ShopBook::seed(&service).await?;

    // Prime the cache, then mutate through the service
    assert_eq!(service.book_summary("Shop").await?.snapshot.balance, 49_500);

    let entry = service
        .record_entry("Shop", draft(EntryType::CashOut, 4_500, "2024-02-05"))
        .await?;
    assert_eq!(service.book_summary("Shop").await?.snapshot.balance, 45_000);

    service.delete_entry(entry.id).await?;
    let summary = service.book_summary("Shop").await?;
    assert_eq!(summary.snapshot.balance, 49_500);
    assert_eq!(summary.entry_count, 4);

    // A forced rebuild lands on the same totals
    let resynced = service.resync_book("Shop").await?;
    assert_eq!(resynced.snapshot, summary.snapshot);
    assert_eq!(resynced.entry_count, 4);

    Ok(())
}

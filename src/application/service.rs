use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveTime, Utc};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, warn};

use crate::domain::{
    Book, BookId, BookLedger, Cents, DateRange, Entry, EntryEvent, EntryFilter, EntryId,
    EntryType, Invoice, InvoiceItem, InvoiceStatus, LedgerSnapshot, format_invoice_number,
};
use crate::storage::Repository;

use super::AppError;
use super::reporting::{Statement, build_statement};

/// Events buffered per subscriber. A consumer that falls further behind
/// starts losing deliveries and must resync from a full fetch.
const EVENT_BUFFER: usize = 256;

/// Application service providing high-level operations for the cashbook.
/// This is the primary interface for any client (CLI, import, TUI, etc.).
///
/// The service owns the change feed: every successful entry mutation is
/// persisted, folded into the per-book ledger cache, and broadcast as an
/// [`EntryEvent`] for external subscribers.
pub struct CashbookService {
    repo: Repository,
    events: broadcast::Sender<EntryEvent>,
    ledgers: Mutex<HashMap<BookId, BookLedger>>,
}

/// Input for recording a new entry.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub entry_type: EntryType,
    pub amount_cents: Cents,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub contact: Option<String>,
    pub remarks: Option<String>,
    pub category: Option<String>,
    pub payment_mode: Option<String>,
    pub attachments: Vec<String>,
    pub voice_note: Option<String>,
    pub custom_fields: BTreeMap<String, serde_json::Value>,
}

impl EntryDraft {
    pub fn new(
        entry_type: EntryType,
        amount_cents: Cents,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Self {
        Self {
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
        }
    }
}

/// Partial edit of an existing entry. Set fields replace the stored
/// value; unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub entry_type: Option<EntryType>,
    pub amount_cents: Option<Cents>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub contact: Option<String>,
    pub remarks: Option<String>,
    pub category: Option<String>,
    pub payment_mode: Option<String>,
}

/// A book's current totals, served from the ledger cache.
pub struct BookSummary {
    pub book: Book,
    pub snapshot: LedgerSnapshot,
    pub entry_count: usize,
}

/// Listing row for `book list`, aggregated by the database.
pub struct BookBalance {
    pub book: Book,
    pub snapshot: LedgerSnapshot,
    pub entry_count: i64,
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct InvoiceDraft {
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub tax_rate_bps: i64,
    pub discount_cents: Cents,
    pub notes: Option<String>,
    pub items: Vec<InvoiceItem>,
}

impl CashbookService {
    /// Create a new cashbook service with the given repository.
    pub fn new(repo: Repository) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            repo,
            events,
            ledgers: Mutex::new(HashMap::new()),
        }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Subscribe to the change feed. Deliveries are at-least-once from
    /// the subscriber's point of view after a resync, so consumers
    /// should track applied entry ids the way [`BookLedger`] does.
    pub fn subscribe(&self) -> broadcast::Receiver<EntryEvent> {
        self.events.subscribe()
    }

    // ========================
    // Book operations
    // ========================

    /// Create a new book. Names are unique among active books.
    pub async fn create_book(
        &self,
        name: String,
        business: Option<String>,
    ) -> Result<Book, AppError> {
        if self.repo.active_book_exists(&name).await? {
            return Err(AppError::BookAlreadyExists(name));
        }

        let mut book = Book::new(name);
        if let Some(business) = business {
            book = book.with_business(business);
        }

        self.repo.save_book(&book).await?;
        Ok(book)
    }

    /// Get a book by name. An active book wins over archived ones
    /// sharing the name, so reads keep working on archived history.
    pub async fn get_book(&self, name: &str) -> Result<Book, AppError> {
        self.repo
            .get_book_by_name(name)
            .await?
            .ok_or_else(|| AppError::BookNotFound(name.to_string()))
    }

    /// List books, newest first.
    pub async fn list_books(&self, include_archived: bool) -> Result<Vec<Book>, AppError> {
        Ok(self.repo.list_books(include_archived).await?)
    }

    /// List books with their totals, aggregated by the database.
    pub async fn list_books_with_balances(
        &self,
        include_archived: bool,
    ) -> Result<Vec<BookBalance>, AppError> {
        let books = self.repo.list_books(include_archived).await?;
        let mut balances = Vec::new();

        for book in books {
            let snapshot = self.repo.book_snapshot(book.id).await?;
            let entry_count = self.repo.count_entries(book.id).await?;
            balances.push(BookBalance {
                book,
                snapshot,
                entry_count,
            });
        }

        Ok(balances)
    }

    /// Duplicate a book under "<name> (Copy)". Entries are not copied.
    pub async fn duplicate_book(&self, name: &str) -> Result<Book, AppError> {
        let book = self.get_book(name).await?;
        let copy = book.duplicate();

        if self.repo.active_book_exists(&copy.name).await? {
            return Err(AppError::BookAlreadyExists(copy.name));
        }

        self.repo.save_book(&copy).await?;
        Ok(copy)
    }

    /// Archive a book. Its history stays readable but new entries are
    /// rejected, and the name becomes free for reuse.
    pub async fn archive_book(&self, name: &str) -> Result<Book, AppError> {
        let mut book = self.get_book(name).await?;
        if book.is_archived() {
            return Err(AppError::BookArchived(name.to_string()));
        }

        let now = Utc::now();
        self.repo.archive_book(book.id, now).await?;
        book.archived_at = Some(now);
        Ok(book)
    }

    /// Delete a book and all of its entries. The removal is wholesale,
    /// so no per-entry events are broadcast; subscribers holding a
    /// ledger for this book should drop it.
    pub async fn delete_book(&self, name: &str) -> Result<Book, AppError> {
        let book = self.get_book(name).await?;
        self.repo.delete_book(book.id).await?;
        self.ledgers.lock().await.remove(&book.id);
        Ok(book)
    }

    // ========================
    // Entry operations
    // ========================

    /// Record a new entry in a book.
    pub async fn record_entry(
        &self,
        book_name: &str,
        draft: EntryDraft,
    ) -> Result<Entry, AppError> {
        if draft.amount_cents < 0 {
            return Err(AppError::InvalidAmount(
                "Amount cannot be negative".to_string(),
            ));
        }

        let book = self.get_book(book_name).await?;
        if book.is_archived() {
            return Err(AppError::BookArchived(book_name.to_string()));
        }

        let mut entry = Entry::new(
            book.id,
            draft.entry_type,
            draft.amount_cents,
            draft.date,
            draft.time,
        );
        entry.contact = draft.contact;
        entry.remarks = draft.remarks;
        entry.category = draft.category;
        entry.payment_mode = draft.payment_mode;
        entry.attachments = draft.attachments;
        entry.voice_note = draft.voice_note;
        entry.custom_fields = draft.custom_fields;

        self.repo.save_entry(&entry).await?;
        debug!(book = %book.name, entry = %entry.id, "entry recorded");

        self.publish(EntryEvent::Inserted(entry.clone())).await;
        Ok(entry)
    }

    /// Get an entry by id.
    pub async fn get_entry(&self, id: EntryId) -> Result<Entry, AppError> {
        self.repo
            .get_entry(id)
            .await?
            .ok_or_else(|| AppError::EntryNotFound(id.to_string()))
    }

    /// Edit an entry. The broadcast update event carries the previous
    /// version alongside the new one.
    pub async fn update_entry(&self, id: EntryId, patch: EntryPatch) -> Result<Entry, AppError> {
        let before = self.get_entry(id).await?;

        if let Some(amount) = patch.amount_cents {
            if amount < 0 {
                return Err(AppError::InvalidAmount(
                    "Amount cannot be negative".to_string(),
                ));
            }
        }

        let mut after = before.clone();
        if let Some(entry_type) = patch.entry_type {
            after.entry_type = entry_type;
        }
        if let Some(amount) = patch.amount_cents {
            after.amount_cents = amount;
        }
        if let Some(date) = patch.date {
            after.date = date;
        }
        if let Some(time) = patch.time {
            after.time = time;
        }
        if let Some(contact) = patch.contact {
            after.contact = Some(contact);
        }
        if let Some(remarks) = patch.remarks {
            after.remarks = Some(remarks);
        }
        if let Some(category) = patch.category {
            after.category = Some(category);
        }
        if let Some(payment_mode) = patch.payment_mode {
            after.payment_mode = Some(payment_mode);
        }
        after.updated_at = Utc::now();

        self.repo.update_entry(&after).await?;

        self.publish(EntryEvent::Updated {
            before,
            after: after.clone(),
        })
        .await;
        Ok(after)
    }

    /// Delete an entry.
    pub async fn delete_entry(&self, id: EntryId) -> Result<Entry, AppError> {
        let entry = self.get_entry(id).await?;
        self.repo.delete_entry(id).await?;

        self.publish(EntryEvent::Deleted(entry.clone())).await;
        Ok(entry)
    }

    /// List a book's entries, newest first. Date window, type, category
    /// and payment mode are pushed into the query; contact and search
    /// are applied to the fetched rows.
    pub async fn list_entries(
        &self,
        book_name: &str,
        filter: &EntryFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Entry>, AppError> {
        let book = self.get_book(book_name).await?;

        let in_memory = filter.contact.is_some() || filter.search.is_some();
        let sql_limit = if in_memory { None } else { limit };

        let mut entries = self
            .repo
            .list_entries_filtered(
                book.id,
                filter.entry_type,
                filter.range.from,
                filter.range.to,
                filter.category.as_deref(),
                filter.payment_mode.as_deref(),
                sql_limit,
            )
            .await?;

        if in_memory {
            entries.retain(|entry| filter.matches(entry));
            if let Some(limit) = limit {
                entries.truncate(limit);
            }
        }

        Ok(entries)
    }

    // ========================
    // Ledger operations
    // ========================

    /// A book's totals, served from the incrementally maintained
    /// ledger. The first call for a book builds the ledger from a full
    /// fetch; later calls reuse it.
    pub async fn book_summary(&self, name: &str) -> Result<BookSummary, AppError> {
        let book = self.get_book(name).await?;
        let mut ledgers = self.ledgers.lock().await;

        if let Some(ledger) = ledgers.get(&book.id) {
            return Ok(BookSummary {
                snapshot: ledger.snapshot(),
                entry_count: ledger.len(),
                book,
            });
        }

        let entries = self.repo.list_entries(book.id).await?;
        debug!(book = %book.name, entries = entries.len(), "building ledger cache");
        let ledger = BookLedger::from_entries(entries);
        let summary = BookSummary {
            snapshot: ledger.snapshot(),
            entry_count: ledger.len(),
            book,
        };
        ledgers.insert(summary.book.id, ledger);
        Ok(summary)
    }

    /// Rebuild a book's ledger from a fresh full fetch. The recovery
    /// path when the cached snapshot is suspected of drifting.
    pub async fn resync_book(&self, name: &str) -> Result<BookSummary, AppError> {
        let book = self.get_book(name).await?;
        let entries = self.repo.list_entries(book.id).await?;

        let ledger = BookLedger::from_entries(entries);
        let summary = BookSummary {
            snapshot: ledger.snapshot(),
            entry_count: ledger.len(),
            book,
        };
        self.ledgers.lock().await.insert(summary.book.id, ledger);
        Ok(summary)
    }

    /// Statement for a book over a date window.
    pub async fn statement(
        &self,
        book_name: &str,
        range: DateRange,
    ) -> Result<Statement, AppError> {
        let book = self.get_book(book_name).await?;
        let entries = self
            .repo
            .list_entries_filtered(book.id, None, range.from, range.to, None, None, None)
            .await?;

        Ok(build_statement(book.name, range, entries))
    }

    /// Fold a mutation into the cached ledger, then broadcast it.
    async fn publish(&self, event: EntryEvent) {
        let book_id = event.book_id();
        {
            let mut ledgers = self.ledgers.lock().await;
            if let Some(ledger) = ledgers.get_mut(&book_id) {
                if !ledger.apply(&event) {
                    // The cache disagrees with the store about this
                    // book's basis set; drop it and let the next
                    // summary rebuild from a full fetch.
                    warn!(%book_id, "ledger cache rejected an event, discarding cache");
                    ledgers.remove(&book_id);
                }
            }
        }

        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // ========================
    // Invoice operations
    // ========================

    /// Create a draft invoice. The number is assigned here from the
    /// per-month sequence.
    pub async fn create_invoice(
        &self,
        book_name: &str,
        draft: InvoiceDraft,
    ) -> Result<Invoice, AppError> {
        let book = self.get_book(book_name).await?;
        if book.is_archived() {
            return Err(AppError::BookArchived(book_name.to_string()));
        }

        if draft.items.is_empty() {
            return Err(AppError::EmptyInvoice);
        }
        for item in &draft.items {
            if item.quantity <= 0 {
                return Err(AppError::InvalidAmount(format!(
                    "Item '{}' must have a positive quantity",
                    item.description
                )));
            }
            if item.unit_price_cents < 0 {
                return Err(AppError::InvalidAmount(format!(
                    "Item '{}' cannot have a negative price",
                    item.description
                )));
            }
        }
        if draft.tax_rate_bps < 0 {
            return Err(AppError::InvalidAmount(
                "Tax rate cannot be negative".to_string(),
            ));
        }
        if draft.discount_cents < 0 {
            return Err(AppError::InvalidAmount(
                "Discount cannot be negative".to_string(),
            ));
        }

        let issued_this_month = self.repo.count_invoices_in_month(draft.invoice_date).await?;
        let number = format_invoice_number(draft.invoice_date, issued_this_month + 1);

        let mut invoice = Invoice::new(
            number,
            book.id,
            draft.customer_name,
            draft.invoice_date,
            draft.due_date,
        )
        .with_items(draft.items)
        .with_tax_rate_bps(draft.tax_rate_bps)
        .with_discount_cents(draft.discount_cents);
        invoice.customer_email = draft.customer_email;
        invoice.customer_phone = draft.customer_phone;
        invoice.customer_address = draft.customer_address;
        invoice.notes = draft.notes;

        self.repo.save_invoice(&invoice).await?;
        debug!(number = %invoice.number, "invoice created");
        Ok(invoice)
    }

    /// Get an invoice by number, items included.
    pub async fn get_invoice(&self, number: &str) -> Result<Invoice, AppError> {
        self.repo
            .get_invoice_by_number(number)
            .await?
            .ok_or_else(|| AppError::InvoiceNotFound(number.to_string()))
    }

    /// List invoices, optionally narrowed to one book and one status.
    pub async fn list_invoices(
        &self,
        book_name: Option<&str>,
        status: Option<InvoiceStatus>,
    ) -> Result<Vec<Invoice>, AppError> {
        let book_id = match book_name {
            Some(name) => Some(self.get_book(name).await?.id),
            None => None,
        };
        Ok(self.repo.list_invoices(book_id, status).await?)
    }

    /// Send a draft invoice.
    pub async fn send_invoice(&self, number: &str) -> Result<Invoice, AppError> {
        let mut invoice = self.get_invoice(number).await?;
        invoice.send()?;
        self.repo.update_invoice_status(&invoice).await?;
        Ok(invoice)
    }

    /// Record payment of an invoice.
    pub async fn pay_invoice(&self, number: &str) -> Result<Invoice, AppError> {
        let mut invoice = self.get_invoice(number).await?;
        invoice.pay()?;
        self.repo.update_invoice_status(&invoice).await?;
        Ok(invoice)
    }

    /// Cancel an invoice that has not been paid.
    pub async fn cancel_invoice(&self, number: &str) -> Result<Invoice, AppError> {
        let mut invoice = self.get_invoice(number).await?;
        invoice.cancel()?;
        self.repo.update_invoice_status(&invoice).await?;
        Ok(invoice)
    }

    /// Flip sent invoices past their due date to overdue. Returns the
    /// invoices that changed.
    pub async fn refresh_overdue_invoices(
        &self,
        book_name: Option<&str>,
        today: NaiveDate,
    ) -> Result<Vec<Invoice>, AppError> {
        let book_id = match book_name {
            Some(name) => Some(self.get_book(name).await?.id),
            None => None,
        };

        let sent = self
            .repo
            .list_invoices(book_id, Some(InvoiceStatus::Sent))
            .await?;

        let mut flipped = Vec::new();
        for mut invoice in sent {
            if invoice.refresh_overdue(today) {
                self.repo.update_invoice_status(&invoice).await?;
                flipped.push(invoice);
            }
        }

        Ok(flipped)
    }
}

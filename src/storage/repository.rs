use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Book, BookId, Entry, EntryId, EntryType, Invoice, InvoiceId, InvoiceItem, InvoiceStatus,
    LedgerSnapshot,
};

use super::{MIGRATION_001_INITIAL, MIGRATION_002_INVOICES};

const ENTRY_COLUMNS: &str = "id, book_id, entry_type, amount_cents, date, time, contact, remarks, category, payment_mode, attachments, voice_note, custom_fields, created_at, updated_at";

/// Repository for persisting and querying books, entries and invoices.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL. The file is only
    /// created when the URL asks for it (`?mode=rwc`).
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        sqlx::query(MIGRATION_002_INVOICES)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Book operations
    // ========================

    /// Save a new book to the database.
    pub async fn save_book(&self, book: &Book) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (id, name, business, created_at, updated_at, archived_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(book.id.to_string())
        .bind(&book.name)
        .bind(&book.business)
        .bind(book.created_at.to_rfc3339())
        .bind(book.updated_at.to_rfc3339())
        .bind(book.archived_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .context("Failed to save book")?;
        Ok(())
    }

    /// Get a book by name. An active book wins; otherwise the most
    /// recently archived one is returned so its history stays readable.
    pub async fn get_book_by_name(&self, name: &str) -> Result<Option<Book>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, business, created_at, updated_at, archived_at
            FROM books
            WHERE name = ?
            ORDER BY (archived_at IS NULL) DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch book by name")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_book(&row)?)),
            None => Ok(None),
        }
    }

    /// Whether an active book holds this name. Archived books do not
    /// count, so their names can be reused.
    pub async fn active_book_exists(&self, name: &str) -> Result<bool> {
        let row =
            sqlx::query("SELECT COUNT(*) as count FROM books WHERE name = ? AND archived_at IS NULL")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .context("Failed to check book name")?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    /// List books, newest first (optionally including archived).
    pub async fn list_books(&self, include_archived: bool) -> Result<Vec<Book>> {
        let query = if include_archived {
            "SELECT id, name, business, created_at, updated_at, archived_at FROM books ORDER BY created_at DESC"
        } else {
            "SELECT id, name, business, created_at, updated_at, archived_at FROM books WHERE archived_at IS NULL ORDER BY created_at DESC"
        };

        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list books")?;

        rows.iter().map(Self::row_to_book).collect()
    }

    /// Archive a book (soft delete).
    pub async fn archive_book(&self, id: BookId, archived_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE books SET archived_at = ?, updated_at = ? WHERE id = ?")
            .bind(archived_at.to_rfc3339())
            .bind(archived_at.to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to archive book")?;
        Ok(())
    }

    /// Delete a book together with its entries and invoices.
    pub async fn delete_book(&self, id: BookId) -> Result<()> {
        let id_str = id.to_string();
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query(
            "DELETE FROM invoice_items WHERE invoice_id IN (SELECT id FROM invoices WHERE book_id = ?)",
        )
        .bind(&id_str)
        .execute(&mut *tx)
        .await
        .context("Failed to delete invoice items")?;

        sqlx::query("DELETE FROM invoices WHERE book_id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await
            .context("Failed to delete invoices")?;

        sqlx::query("DELETE FROM entries WHERE book_id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await
            .context("Failed to delete entries")?;

        sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await
            .context("Failed to delete book")?;

        tx.commit().await.context("Failed to commit book deletion")?;
        Ok(())
    }

    fn row_to_book(row: &sqlx::sqlite::SqliteRow) -> Result<Book> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");
        let archived_at_str: Option<String> = row.get("archived_at");

        Ok(Book {
            id: Uuid::parse_str(&id_str).context("Invalid book ID")?,
            name: row.get("name"),
            business: row.get("business"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .context("Invalid updated_at timestamp")?
                .with_timezone(&Utc),
            archived_at: archived_at_str
                .map(|s| DateTime::parse_from_rfc3339(&s))
                .transpose()
                .context("Invalid archived_at timestamp")?
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }

    // ========================
    // Entry operations
    // ========================

    /// Save a new entry to the database.
    pub async fn save_entry(&self, entry: &Entry) -> Result<()> {
        let attachments_json = serde_json::to_string(&entry.attachments)?;
        let custom_fields_json = serde_json::to_string(&entry.custom_fields)?;

        sqlx::query(
            r#"
            INSERT INTO entries (id, book_id, entry_type, amount_cents, date, time, contact, remarks, category, payment_mode, attachments, voice_note, custom_fields, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.book_id.to_string())
        .bind(entry.entry_type.as_str())
        .bind(entry.amount_cents)
        .bind(entry.date.format("%Y-%m-%d").to_string())
        .bind(entry.time.format("%H:%M:%S").to_string())
        .bind(&entry.contact)
        .bind(&entry.remarks)
        .bind(&entry.category)
        .bind(&entry.payment_mode)
        .bind(&attachments_json)
        .bind(&entry.voice_note)
        .bind(&custom_fields_json)
        .bind(entry.created_at.to_rfc3339())
        .bind(entry.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save entry")?;

        Ok(())
    }

    /// Get an entry by ID.
    pub async fn get_entry(&self, id: EntryId) -> Result<Option<Entry>> {
        let query = format!("SELECT {} FROM entries WHERE id = ?", ENTRY_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch entry")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_entry(&row)?)),
            None => Ok(None),
        }
    }

    /// Overwrite an existing entry.
    pub async fn update_entry(&self, entry: &Entry) -> Result<()> {
        let attachments_json = serde_json::to_string(&entry.attachments)?;
        let custom_fields_json = serde_json::to_string(&entry.custom_fields)?;

        sqlx::query(
            r#"
            UPDATE entries
            SET entry_type = ?, amount_cents = ?, date = ?, time = ?, contact = ?, remarks = ?, category = ?, payment_mode = ?, attachments = ?, voice_note = ?, custom_fields = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(entry.entry_type.as_str())
        .bind(entry.amount_cents)
        .bind(entry.date.format("%Y-%m-%d").to_string())
        .bind(entry.time.format("%H:%M:%S").to_string())
        .bind(&entry.contact)
        .bind(&entry.remarks)
        .bind(&entry.category)
        .bind(&entry.payment_mode)
        .bind(&attachments_json)
        .bind(&entry.voice_note)
        .bind(&custom_fields_json)
        .bind(entry.updated_at.to_rfc3339())
        .bind(entry.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update entry")?;

        Ok(())
    }

    /// Delete an entry.
    pub async fn delete_entry(&self, id: EntryId) -> Result<()> {
        sqlx::query("DELETE FROM entries WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete entry")?;
        Ok(())
    }

    /// List all entries of a book, newest first.
    pub async fn list_entries(&self, book_id: BookId) -> Result<Vec<Entry>> {
        let query = format!(
            "SELECT {} FROM entries WHERE book_id = ? ORDER BY date DESC, time DESC, created_at DESC",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(book_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list entries")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    /// List a book's entries with optional filters, newest first.
    pub async fn list_entries_filtered(
        &self,
        book_id: BookId,
        entry_type: Option<EntryType>,
        from_date: Option<NaiveDate>,
        to_date: Option<NaiveDate>,
        category: Option<&str>,
        payment_mode: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Entry>> {
        // Build query dynamically based on filters. Dates are stored as
        // ISO text, so string comparison orders them correctly.
        let mut query = format!(
            "SELECT {} FROM entries WHERE book_id = ?",
            ENTRY_COLUMNS
        );

        let from_date_str = from_date.map(|d| d.format("%Y-%m-%d").to_string());
        let to_date_str = to_date.map(|d| d.format("%Y-%m-%d").to_string());

        if entry_type.is_some() {
            query.push_str(" AND entry_type = ?");
        }
        if from_date.is_some() {
            query.push_str(" AND date >= ?");
        }
        if to_date.is_some() {
            query.push_str(" AND date <= ?");
        }
        if category.is_some() {
            query.push_str(" AND category = ? COLLATE NOCASE");
        }
        if payment_mode.is_some() {
            query.push_str(" AND payment_mode = ? COLLATE NOCASE");
        }

        query.push_str(" ORDER BY date DESC, time DESC, created_at DESC");

        if let Some(lim) = limit {
            query.push_str(&format!(" LIMIT {}", lim));
        }

        let mut sql_query = sqlx::query(&query).bind(book_id.to_string());

        if let Some(entry_type) = entry_type {
            sql_query = sql_query.bind(entry_type.as_str());
        }
        if let Some(ref fd) = from_date_str {
            sql_query = sql_query.bind(fd);
        }
        if let Some(ref td) = to_date_str {
            sql_query = sql_query.bind(td);
        }
        if let Some(cat) = category {
            sql_query = sql_query.bind(cat);
        }
        if let Some(mode) = payment_mode {
            sql_query = sql_query.bind(mode);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list filtered entries")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    /// Count the entries of a book.
    pub async fn count_entries(&self, book_id: BookId) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM entries WHERE book_id = ?")
            .bind(book_id.to_string())
            .fetch_one(&self.pool)
            .await
            .context("Failed to count entries")?;

        Ok(row.get("count"))
    }

    /// Compute a book's totals using SQL aggregation. This is the
    /// database-side mirror of the in-memory ledger fold.
    pub async fn book_snapshot(&self, book_id: BookId) -> Result<LedgerSnapshot> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN entry_type = 'cash_in' THEN amount_cents ELSE 0 END), 0) as total_cash_in,
                COALESCE(SUM(CASE WHEN entry_type = 'cash_out' THEN amount_cents ELSE 0 END), 0) as total_cash_out
            FROM entries
            WHERE book_id = ?
            "#,
        )
        .bind(book_id.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute book snapshot")?;

        let total_cash_in: i64 = row.get("total_cash_in");
        let total_cash_out: i64 = row.get("total_cash_out");

        Ok(LedgerSnapshot {
            total_cash_in,
            total_cash_out,
            balance: total_cash_in - total_cash_out,
        })
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<Entry> {
        let id_str: String = row.get("id");
        let book_id_str: String = row.get("book_id");
        let entry_type_str: String = row.get("entry_type");
        let date_str: String = row.get("date");
        let time_str: String = row.get("time");
        let attachments_json: String = row.get("attachments");
        let custom_fields_json: String = row.get("custom_fields");
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        Ok(Entry {
            id: Uuid::parse_str(&id_str).context("Invalid entry ID")?,
            book_id: Uuid::parse_str(&book_id_str).context("Invalid book ID")?,
            entry_type: EntryType::from_str(&entry_type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid entry type: {}", entry_type_str))?,
            amount_cents: row.get("amount_cents"),
            date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").context("Invalid date")?,
            time: NaiveTime::parse_from_str(&time_str, "%H:%M:%S").context("Invalid time")?,
            contact: row.get("contact"),
            remarks: row.get("remarks"),
            category: row.get("category"),
            payment_mode: row.get("payment_mode"),
            attachments: serde_json::from_str(&attachments_json).unwrap_or_default(),
            voice_note: row.get("voice_note"),
            custom_fields: serde_json::from_str(&custom_fields_json).unwrap_or_default(),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .context("Invalid updated_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Invoice operations
    // ========================

    /// Save a new invoice together with its items.
    pub async fn save_invoice(&self, invoice: &Invoice) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query(
            r#"
            INSERT INTO invoices (id, number, book_id, customer_name, customer_email, customer_phone, customer_address, invoice_date, due_date, tax_rate_bps, discount_cents, status, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(invoice.id.to_string())
        .bind(&invoice.number)
        .bind(invoice.book_id.to_string())
        .bind(&invoice.customer_name)
        .bind(&invoice.customer_email)
        .bind(&invoice.customer_phone)
        .bind(&invoice.customer_address)
        .bind(invoice.invoice_date.format("%Y-%m-%d").to_string())
        .bind(invoice.due_date.format("%Y-%m-%d").to_string())
        .bind(invoice.tax_rate_bps)
        .bind(invoice.discount_cents)
        .bind(invoice.status.as_str())
        .bind(&invoice.notes)
        .bind(invoice.created_at.to_rfc3339())
        .bind(invoice.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save invoice")?;

        for (position, item) in invoice.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (id, invoice_id, position, description, quantity, unit_price_cents)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(item.id.to_string())
            .bind(invoice.id.to_string())
            .bind(position as i64)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .execute(&mut *tx)
            .await
            .context("Failed to save invoice item")?;
        }

        tx.commit().await.context("Failed to commit invoice")?;
        Ok(())
    }

    /// Get an invoice by its number, items included.
    pub async fn get_invoice_by_number(&self, number: &str) -> Result<Option<Invoice>> {
        let row = sqlx::query(
            r#"
            SELECT id, number, book_id, customer_name, customer_email, customer_phone, customer_address, invoice_date, due_date, tax_rate_bps, discount_cents, status, notes, created_at, updated_at
            FROM invoices
            WHERE number = ?
            "#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch invoice")?;

        match row {
            Some(row) => {
                let mut invoice = Self::row_to_invoice(&row)?;
                invoice.items = self.load_invoice_items(invoice.id).await?;
                Ok(Some(invoice))
            }
            None => Ok(None),
        }
    }

    /// List invoices, newest first, optionally narrowed to one book
    /// and one status.
    pub async fn list_invoices(
        &self,
        book_id: Option<BookId>,
        status: Option<InvoiceStatus>,
    ) -> Result<Vec<Invoice>> {
        let mut query = String::from(
            "SELECT id, number, book_id, customer_name, customer_email, customer_phone, customer_address, invoice_date, due_date, tax_rate_bps, discount_cents, status, notes, created_at, updated_at FROM invoices WHERE 1=1",
        );

        let book_id_str = book_id.map(|id| id.to_string());

        if book_id.is_some() {
            query.push_str(" AND book_id = ?");
        }
        if status.is_some() {
            query.push_str(" AND status = ?");
        }

        query.push_str(" ORDER BY invoice_date DESC, created_at DESC");

        let mut sql_query = sqlx::query(&query);

        if let Some(ref bid) = book_id_str {
            sql_query = sql_query.bind(bid);
        }
        if let Some(status) = status {
            sql_query = sql_query.bind(status.as_str());
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list invoices")?;

        let mut invoices = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut invoice = Self::row_to_invoice(row)?;
            invoice.items = self.load_invoice_items(invoice.id).await?;
            invoices.push(invoice);
        }

        Ok(invoices)
    }

    /// Persist a status change.
    pub async fn update_invoice_status(&self, invoice: &Invoice) -> Result<()> {
        sqlx::query("UPDATE invoices SET status = ?, updated_at = ? WHERE id = ?")
            .bind(invoice.status.as_str())
            .bind(invoice.updated_at.to_rfc3339())
            .bind(invoice.id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update invoice status")?;
        Ok(())
    }

    /// Count invoices issued in the calendar month of the given date.
    /// Drives the per-month invoice number sequence.
    pub async fn count_invoices_in_month(&self, date: NaiveDate) -> Result<i64> {
        let prefix = date.format("%Y-%m-").to_string();

        let row = sqlx::query("SELECT COUNT(*) as count FROM invoices WHERE invoice_date LIKE ? || '%'")
            .bind(&prefix)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count invoices for month")?;

        Ok(row.get("count"))
    }

    async fn load_invoice_items(&self, invoice_id: InvoiceId) -> Result<Vec<InvoiceItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, description, quantity, unit_price_cents
            FROM invoice_items
            WHERE invoice_id = ?
            ORDER BY position
            "#,
        )
        .bind(invoice_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to load invoice items")?;

        rows.iter().map(Self::row_to_invoice_item).collect()
    }

    fn row_to_invoice(row: &sqlx::sqlite::SqliteRow) -> Result<Invoice> {
        let id_str: String = row.get("id");
        let book_id_str: String = row.get("book_id");
        let invoice_date_str: String = row.get("invoice_date");
        let due_date_str: String = row.get("due_date");
        let status_str: String = row.get("status");
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        Ok(Invoice {
            id: Uuid::parse_str(&id_str).context("Invalid invoice ID")?,
            number: row.get("number"),
            book_id: Uuid::parse_str(&book_id_str).context("Invalid book ID")?,
            customer_name: row.get("customer_name"),
            customer_email: row.get("customer_email"),
            customer_phone: row.get("customer_phone"),
            customer_address: row.get("customer_address"),
            invoice_date: NaiveDate::parse_from_str(&invoice_date_str, "%Y-%m-%d")
                .context("Invalid invoice date")?,
            due_date: NaiveDate::parse_from_str(&due_date_str, "%Y-%m-%d")
                .context("Invalid due date")?,
            tax_rate_bps: row.get("tax_rate_bps"),
            discount_cents: row.get("discount_cents"),
            status: InvoiceStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid invoice status: {}", status_str))?,
            notes: row.get("notes"),
            items: Vec::new(),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .context("Invalid updated_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    fn row_to_invoice_item(row: &sqlx::sqlite::SqliteRow) -> Result<InvoiceItem> {
        let id_str: String = row.get("id");

        Ok(InvoiceItem {
            id: Uuid::parse_str(&id_str).context("Invalid invoice item ID")?,
            description: row.get("description"),
            quantity: row.get("quantity"),
            unit_price_cents: row.get("unit_price_cents"),
        })
    }
}

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime, Timelike, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{CashbookService, EntryDraft, EntryPatch, InvoiceDraft};
use crate::domain::{
    DateRange, DurationPreset, EntryFilter, EntryType, InvoiceItem, InvoiceStatus, compute,
    format_cents, parse_cents,
};

/// Cashbook - Small Business Bookkeeping
#[derive(Parser)]
#[command(name = "cashbook")]
#[command(about = "A local-first cashbook for small-business bookkeeping")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "cashbook.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Book management commands
    #[command(subcommand)]
    Book(BookCommands),

    /// Record cash received
    In {
        /// Amount received (e.g., "500.00" or "500")
        amount: String,

        /// Book to record into
        #[arg(short, long)]
        book: String,

        /// Date of the entry (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Time of the entry (HH:MM or HH:MM:SS, defaults to now)
        #[arg(long)]
        time: Option<String>,

        /// Contact the cash came from
        #[arg(long)]
        contact: Option<String>,

        /// Free-text remarks
        #[arg(long)]
        remarks: Option<String>,

        /// Category (e.g., "Sale", "Loan")
        #[arg(long)]
        category: Option<String>,

        /// Payment mode (e.g., "Cash", "UPI", "Bank Transfer")
        #[arg(long)]
        mode: Option<String>,
    },

    /// Record cash paid out
    Out {
        /// Amount paid (e.g., "500.00" or "500")
        amount: String,

        /// Book to record into
        #[arg(short, long)]
        book: String,

        /// Date of the entry (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Time of the entry (HH:MM or HH:MM:SS, defaults to now)
        #[arg(long)]
        time: Option<String>,

        /// Contact the cash went to
        #[arg(long)]
        contact: Option<String>,

        /// Free-text remarks
        #[arg(long)]
        remarks: Option<String>,

        /// Category (e.g., "Rent", "Stock")
        #[arg(long)]
        category: Option<String>,

        /// Payment mode (e.g., "Cash", "UPI", "Bank Transfer")
        #[arg(long)]
        mode: Option<String>,
    },

    /// List a book's entries
    Entries {
        /// Book name
        book: String,

        /// Filter by type: in, out
        #[arg(long = "type")]
        entry_type: Option<String>,

        /// Date window preset: today, yesterday, this-month, last-month, all-time
        #[arg(long)]
        duration: Option<String>,

        /// Filter from date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Filter to date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Filter by category
        #[arg(long)]
        category: Option<String>,

        /// Filter by payment mode
        #[arg(long)]
        mode: Option<String>,

        /// Filter by contact
        #[arg(long)]
        contact: Option<String>,

        /// Search by remark or amount
        #[arg(short, long)]
        search: Option<String>,

        /// Maximum number of entries to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Edit an existing entry
    Edit {
        /// Entry ID
        id: String,

        /// New type: in, out
        #[arg(long = "type")]
        entry_type: Option<String>,

        /// New amount (e.g., "500.00" or "500")
        #[arg(long)]
        amount: Option<String>,

        /// New date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// New time (HH:MM or HH:MM:SS)
        #[arg(long)]
        time: Option<String>,

        /// New contact
        #[arg(long)]
        contact: Option<String>,

        /// New remarks
        #[arg(long)]
        remarks: Option<String>,

        /// New category
        #[arg(long)]
        category: Option<String>,

        /// New payment mode
        #[arg(long)]
        mode: Option<String>,
    },

    /// Delete an entry
    Delete {
        /// Entry ID
        id: String,
    },

    /// Show balance for a book or all books
    Balance {
        /// Book name (omit for all books)
        book: Option<String>,

        /// Rebuild the ledger from the database before reporting
        #[arg(long)]
        resync: bool,
    },

    /// Print a statement with running balance
    Statement {
        /// Book name
        book: String,

        /// Date window preset: today, yesterday, this-month, last-month, all-time
        #[arg(long)]
        duration: Option<String>,

        /// Statement start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Statement end date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Bulk-import entries from CSV
    Import {
        /// Book to import into
        book: String,

        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Validate without importing
        #[arg(long)]
        dry_run: bool,
    },

    /// Invoice management commands
    #[command(subcommand)]
    Invoice(InvoiceCommands),
}

#[derive(Subcommand)]
pub enum BookCommands {
    /// Create a new book
    Create {
        /// Book name (must be unique among active books)
        name: String,

        /// Business label for the book
        #[arg(short, long)]
        business: Option<String>,
    },

    /// List books with their balances
    List {
        /// Include archived books
        #[arg(long)]
        all: bool,
    },

    /// Show detailed book information
    Show {
        /// Book name
        name: String,
    },

    /// Duplicate a book (entries are not copied)
    Duplicate {
        /// Book name
        name: String,
    },

    /// Archive a book (soft delete)
    Archive {
        /// Book name
        name: String,
    },

    /// Delete a book and all of its entries
    Delete {
        /// Book name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum InvoiceCommands {
    /// Create a draft invoice
    Create {
        /// Book to issue the invoice from
        book: String,

        /// Customer name
        #[arg(long)]
        customer: String,

        /// Customer email
        #[arg(long)]
        email: Option<String>,

        /// Customer phone
        #[arg(long)]
        phone: Option<String>,

        /// Customer address
        #[arg(long)]
        address: Option<String>,

        /// Invoice date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Due date (YYYY-MM-DD, defaults to 30 days after the invoice date)
        #[arg(long)]
        due: Option<String>,

        /// Tax rate percent (e.g., "18" or "7.5")
        #[arg(long)]
        tax: Option<String>,

        /// Flat discount amount (e.g., "50.00")
        #[arg(long)]
        discount: Option<String>,

        /// Free-text notes
        #[arg(long)]
        notes: Option<String>,

        /// Invoice line as "description:quantity:unit price" (repeatable)
        #[arg(long = "item", value_name = "DESC:QTY:PRICE")]
        items: Vec<String>,
    },

    /// List invoices
    List {
        /// Filter by book
        #[arg(long)]
        book: Option<String>,

        /// Filter by status: draft, sent, paid, overdue, cancelled
        #[arg(long)]
        status: Option<String>,
    },

    /// Show detailed invoice information
    Show {
        /// Invoice number (e.g., "INV-202401-0007")
        number: String,
    },

    /// Send a draft invoice
    Send {
        /// Invoice number
        number: String,
    },

    /// Record payment of an invoice
    Pay {
        /// Invoice number
        number: String,
    },

    /// Cancel an unpaid invoice
    Cancel {
        /// Invoice number
        number: String,
    },

    /// Mark sent invoices past their due date as overdue
    RefreshOverdue {
        /// Limit to one book
        #[arg(long)]
        book: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                CashbookService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Book(book_cmd) => {
                let service = CashbookService::connect(&self.database).await?;
                run_book_command(&service, book_cmd).await?;
            }

            Commands::In {
                amount,
                book,
                date,
                time,
                contact,
                remarks,
                category,
                mode,
            } => {
                let service = CashbookService::connect(&self.database).await?;
                run_record_command(
                    &service,
                    EntryType::CashIn,
                    &amount,
                    &book,
                    date,
                    time,
                    contact,
                    remarks,
                    category,
                    mode,
                )
                .await?;
            }

            Commands::Out {
                amount,
                book,
                date,
                time,
                contact,
                remarks,
                category,
                mode,
            } => {
                let service = CashbookService::connect(&self.database).await?;
                run_record_command(
                    &service,
                    EntryType::CashOut,
                    &amount,
                    &book,
                    date,
                    time,
                    contact,
                    remarks,
                    category,
                    mode,
                )
                .await?;
            }

            Commands::Entries {
                book,
                entry_type,
                duration,
                from,
                to,
                category,
                mode,
                contact,
                search,
                limit,
            } => {
                let service = CashbookService::connect(&self.database).await?;
                run_entries_command(
                    &service, &book, entry_type, duration, from, to, category, mode, contact,
                    search, limit,
                )
                .await?;
            }

            Commands::Edit {
                id,
                entry_type,
                amount,
                date,
                time,
                contact,
                remarks,
                category,
                mode,
            } => {
                let service = CashbookService::connect(&self.database).await?;
                run_edit_command(
                    &service, &id, entry_type, amount, date, time, contact, remarks, category,
                    mode,
                )
                .await?;
            }

            Commands::Delete { id } => {
                let service = CashbookService::connect(&self.database).await?;
                let entry_id =
                    Uuid::parse_str(&id).context("Invalid entry ID format (expected UUID)")?;
                let entry = service.delete_entry(entry_id).await?;
                println!(
                    "Deleted entry: {} {} on {}",
                    entry.entry_type.label(),
                    format_cents(entry.amount_cents),
                    entry.date
                );
            }

            Commands::Balance { book, resync } => {
                let service = CashbookService::connect(&self.database).await?;
                run_balance_command(&service, book.as_deref(), resync).await?;
            }

            Commands::Statement {
                book,
                duration,
                from,
                to,
            } => {
                let service = CashbookService::connect(&self.database).await?;
                run_statement_command(&service, &book, duration, from, to).await?;
            }

            Commands::Import {
                book,
                input,
                dry_run,
            } => {
                let service = CashbookService::connect(&self.database).await?;
                run_import_command(&service, &book, input.as_deref(), dry_run).await?;
            }

            Commands::Invoice(invoice_cmd) => {
                let service = CashbookService::connect(&self.database).await?;
                run_invoice_command(&service, invoice_cmd).await?;
            }
        }

        Ok(())
    }
}

async fn run_book_command(service: &CashbookService, cmd: BookCommands) -> Result<()> {
    match cmd {
        BookCommands::Create { name, business } => {
            let book = service.create_book(name, business).await?;
            match &book.business {
                Some(business) => println!("Created book: {} ({})", book.name, business),
                None => println!("Created book: {}", book.name),
            }
        }

        BookCommands::List { all } => {
            let balances = service.list_books_with_balances(all).await?;
            if balances.is_empty() {
                println!("No books found.");
            } else {
                println!(
                    "{:<20} {:>12} {:>12} {:>12} {:>8}",
                    "NAME", "CASH IN", "CASH OUT", "BALANCE", "ENTRIES"
                );
                println!("{}", "-".repeat(68));
                for balance in balances {
                    println!(
                        "{:<20} {:>12} {:>12} {:>12} {:>8}",
                        truncate(&balance.book.name, 20),
                        format_cents(balance.snapshot.total_cash_in),
                        format_cents(balance.snapshot.total_cash_out),
                        format_cents(balance.snapshot.balance),
                        balance.entry_count
                    );
                }
            }
        }

        BookCommands::Show { name } => {
            let summary = service.book_summary(&name).await?;
            let book = &summary.book;

            println!("Book: {}", book.name);
            println!("  ID:       {}", book.id);
            if let Some(business) = &book.business {
                println!("  Business: {}", business);
            }
            println!(
                "  Created:  {}",
                book.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            if let Some(archived) = book.archived_at {
                println!("  Archived: {}", archived.format("%Y-%m-%d %H:%M:%S"));
            }
            println!();
            println!(
                "  Cash in:  {:>12}",
                format_cents(summary.snapshot.total_cash_in)
            );
            println!(
                "  Cash out: {:>12}",
                format_cents(summary.snapshot.total_cash_out)
            );
            println!("  Balance:  {:>12}", format_cents(summary.snapshot.balance));
            println!("  Entries:  {:>12}", summary.entry_count);
        }

        BookCommands::Duplicate { name } => {
            let copy = service.duplicate_book(&name).await?;
            println!("Duplicated book '{}' as '{}'", name, copy.name);
        }

        BookCommands::Archive { name } => {
            service.archive_book(&name).await?;
            println!("Archived book: {}", name);
        }

        BookCommands::Delete { name } => {
            service.delete_book(&name).await?;
            println!("Deleted book: {}", name);
        }
    }
    Ok(())
}

async fn run_record_command(
    service: &CashbookService,
    entry_type: EntryType,
    amount: &str,
    book: &str,
    date: Option<String>,
    time: Option<String>,
    contact: Option<String>,
    remarks: Option<String>,
    category: Option<String>,
    mode: Option<String>,
) -> Result<()> {
    let amount_cents =
        parse_cents(amount).context("Invalid amount format. Use '500.00' or '500'")?;

    let date = match date {
        Some(date_str) => parse_date(&date_str)?,
        None => Utc::now().date_naive(),
    };
    let time = match time {
        Some(time_str) => parse_time(&time_str)?,
        None => Utc::now().time().with_nanosecond(0).unwrap_or(NaiveTime::MIN),
    };

    let mut draft = EntryDraft::new(entry_type, amount_cents, date, time);
    draft.contact = contact;
    draft.remarks = remarks;
    draft.category = category;
    draft.payment_mode = mode;

    let entry = service.record_entry(book, draft).await?;

    println!(
        "Recorded {}: {} in {} ({})",
        entry.entry_type.label(),
        format_cents(entry.amount_cents),
        book,
        entry.id
    );
    Ok(())
}

async fn run_entries_command(
    service: &CashbookService,
    book: &str,
    entry_type: Option<String>,
    duration: Option<String>,
    from: Option<String>,
    to: Option<String>,
    category: Option<String>,
    mode: Option<String>,
    contact: Option<String>,
    search: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let entry_type = entry_type.as_deref().map(parse_entry_type).transpose()?;
    let range = resolve_range(duration.as_deref(), from.as_deref(), to.as_deref())?;

    let filter = EntryFilter {
        entry_type,
        range,
        category,
        payment_mode: mode,
        contact,
        search,
    };

    let entries = service.list_entries(book, &filter, limit).await?;

    if entries.is_empty() {
        println!("No entries found.");
        return Ok(());
    }

    println!(
        "{:<12} {:<9} {:>12} {:<15} {:<36} REMARKS",
        "DATE", "TYPE", "AMOUNT", "CONTACT", "ID"
    );
    println!("{}", "-".repeat(96));

    for entry in &entries {
        println!(
            "{:<12} {:<9} {:>12} {:<15} {:<36} {}",
            entry.date.to_string(),
            entry.entry_type.label(),
            format_cents(entry.amount_cents),
            truncate(entry.contact.as_deref().unwrap_or(""), 15),
            entry.id,
            truncate(entry.remarks.as_deref().unwrap_or(""), 30)
        );
    }

    let totals = compute(&entries);
    println!("{}", "-".repeat(96));
    println!(
        "{} entries: in {}, out {}, net {}",
        entries.len(),
        format_cents(totals.total_cash_in),
        format_cents(totals.total_cash_out),
        format_cents(totals.balance)
    );
    Ok(())
}

async fn run_edit_command(
    service: &CashbookService,
    id: &str,
    entry_type: Option<String>,
    amount: Option<String>,
    date: Option<String>,
    time: Option<String>,
    contact: Option<String>,
    remarks: Option<String>,
    category: Option<String>,
    mode: Option<String>,
) -> Result<()> {
    let entry_id = Uuid::parse_str(id).context("Invalid entry ID format (expected UUID)")?;

    let patch = EntryPatch {
        entry_type: entry_type.as_deref().map(parse_entry_type).transpose()?,
        amount_cents: amount
            .as_deref()
            .map(parse_cents)
            .transpose()
            .context("Invalid amount format. Use '500.00' or '500'")?,
        date: date.as_deref().map(parse_date).transpose()?,
        time: time.as_deref().map(parse_time).transpose()?,
        contact,
        remarks,
        category,
        payment_mode: mode,
    };

    let entry = service.update_entry(entry_id, patch).await?;

    println!(
        "Updated entry: {} {} on {}",
        entry.entry_type.label(),
        format_cents(entry.amount_cents),
        entry.date
    );
    Ok(())
}

async fn run_balance_command(
    service: &CashbookService,
    book: Option<&str>,
    resync: bool,
) -> Result<()> {
    match book {
        Some(name) => {
            let summary = if resync {
                service.resync_book(name).await?
            } else {
                service.book_summary(name).await?
            };

            println!(
                "{}: {}",
                summary.book.name,
                format_cents(summary.snapshot.balance)
            );
            println!(
                "  Cash in:  {:>12}",
                format_cents(summary.snapshot.total_cash_in)
            );
            println!(
                "  Cash out: {:>12}",
                format_cents(summary.snapshot.total_cash_out)
            );
            println!("  Entries:  {:>12}", summary.entry_count);
        }
        None => {
            let balances = service.list_books_with_balances(false).await?;
            if balances.is_empty() {
                println!("No books found.");
            } else {
                println!("{:<20} {:>12} {:>8}", "BOOK", "BALANCE", "ENTRIES");
                println!("{}", "-".repeat(42));
                for balance in balances {
                    println!(
                        "{:<20} {:>12} {:>8}",
                        truncate(&balance.book.name, 20),
                        format_cents(balance.snapshot.balance),
                        balance.entry_count
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_statement_command(
    service: &CashbookService,
    book: &str,
    duration: Option<String>,
    from: Option<String>,
    to: Option<String>,
) -> Result<()> {
    let range = resolve_range(duration.as_deref(), from.as_deref(), to.as_deref())?;
    let statement = service.statement(book, range).await?;

    println!("Statement for {}", statement.book_name);
    match (statement.range.from, statement.range.to) {
        (Some(from), Some(to)) => println!("Period: {} to {}", from, to),
        (Some(from), None) => println!("Period: from {}", from),
        (None, Some(to)) => println!("Period: until {}", to),
        (None, None) => {}
    }
    println!();

    if statement.lines.is_empty() {
        println!("No entries found.");
        return Ok(());
    }

    println!(
        "{:<12} {:<9} {:>12} {:>12}  REMARKS",
        "DATE", "TYPE", "AMOUNT", "BALANCE"
    );
    println!("{}", "-".repeat(58));

    for line in &statement.lines {
        let entry = &line.entry;
        println!(
            "{:<12} {:<9} {:>12} {:>12}  {}",
            entry.date.to_string(),
            entry.entry_type.label(),
            format_cents(entry.amount_cents),
            format_cents(line.running_balance),
            truncate(entry.remarks.as_deref().unwrap_or(""), 30)
        );
    }

    println!("{}", "-".repeat(58));
    println!(
        "Cash in:  {:>12}",
        format_cents(statement.totals.total_cash_in)
    );
    println!(
        "Cash out: {:>12}",
        format_cents(statement.totals.total_cash_out)
    );
    println!("Closing:  {:>12}", format_cents(statement.totals.balance));
    Ok(())
}

async fn run_import_command(
    service: &CashbookService,
    book: &str,
    input: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{Read, stdin};

    let importer = Importer::new(service);

    // Determine input reader
    let reader: Box<dyn Read> = match input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };

    let options = ImportOptions { dry_run };
    let result = importer.import_entries_csv(book, reader, options).await?;

    // Display results
    if dry_run {
        println!("Validation complete (dry run)");
    } else {
        println!("Import complete");
    }
    println!("  Imported: {}", result.imported);
    println!("  Skipped:  {}", result.skipped);
    println!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            println!(
                "  Line {}: {}",
                error.line,
                error
                    .field
                    .as_ref()
                    .map(|f| format!("{}: ", f))
                    .unwrap_or_default()
                    + &error.error
            );
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
    }

    Ok(())
}

async fn run_invoice_command(service: &CashbookService, cmd: InvoiceCommands) -> Result<()> {
    match cmd {
        InvoiceCommands::Create {
            book,
            customer,
            email,
            phone,
            address,
            date,
            due,
            tax,
            discount,
            notes,
            items,
        } => {
            let invoice_date = match date {
                Some(date_str) => parse_date(&date_str)?,
                None => Utc::now().date_naive(),
            };
            let due_date = match due {
                Some(date_str) => parse_date(&date_str)?,
                None => invoice_date + chrono::Duration::days(30),
            };

            // A percent rate with up to two decimals maps to basis
            // points the same way an amount maps to cents
            let tax_rate_bps = tax
                .as_deref()
                .map(parse_cents)
                .transpose()
                .context("Invalid tax rate. Use '18' or '7.5'")?
                .unwrap_or(0);
            let discount_cents = discount
                .as_deref()
                .map(parse_cents)
                .transpose()
                .context("Invalid discount format. Use '50.00' or '50'")?
                .unwrap_or(0);

            let items = items
                .iter()
                .map(|spec| parse_invoice_item(spec))
                .collect::<Result<Vec<_>>>()?;

            let draft = InvoiceDraft {
                customer_name: customer,
                customer_email: email,
                customer_phone: phone,
                customer_address: address,
                invoice_date,
                due_date,
                tax_rate_bps,
                discount_cents,
                notes,
                items,
            };

            let invoice = service.create_invoice(&book, draft).await?;

            println!("Created invoice: {}", invoice.number);
            println!("  Customer: {}", invoice.customer_name);
            println!("  Date:     {}", invoice.invoice_date);
            println!("  Due:      {}", invoice.due_date);
            println!("  Total:    {}", format_cents(invoice.total_cents()));
        }

        InvoiceCommands::List { book, status } => {
            let status = status
                .as_deref()
                .map(|s| {
                    InvoiceStatus::from_str(s).ok_or_else(|| {
                        anyhow::anyhow!(
                            "Invalid status '{}'. Valid: draft, sent, paid, overdue, cancelled",
                            s
                        )
                    })
                })
                .transpose()?;

            let invoices = service.list_invoices(book.as_deref(), status).await?;
            if invoices.is_empty() {
                println!("No invoices found.");
            } else {
                println!(
                    "{:<16} {:<20} {:<12} {:<12} {:>12} {:<10}",
                    "NUMBER", "CUSTOMER", "DATE", "DUE", "TOTAL", "STATUS"
                );
                println!("{}", "-".repeat(87));
                for invoice in invoices {
                    println!(
                        "{:<16} {:<20} {:<12} {:<12} {:>12} {:<10}",
                        invoice.number,
                        truncate(&invoice.customer_name, 20),
                        invoice.invoice_date.to_string(),
                        invoice.due_date.to_string(),
                        format_cents(invoice.total_cents()),
                        invoice.status
                    );
                }
            }
        }

        InvoiceCommands::Show { number } => {
            let invoice = service.get_invoice(&number).await?;

            println!("Invoice: {}", invoice.number);
            println!("  Status:   {}", invoice.status);
            println!("  Customer: {}", invoice.customer_name);
            if let Some(email) = &invoice.customer_email {
                println!("  Email:    {}", email);
            }
            if let Some(phone) = &invoice.customer_phone {
                println!("  Phone:    {}", phone);
            }
            if let Some(address) = &invoice.customer_address {
                println!("  Address:  {}", address);
            }
            println!("  Date:     {}", invoice.invoice_date);
            println!("  Due:      {}", invoice.due_date);
            if let Some(notes) = &invoice.notes {
                println!("  Notes:    {}", notes);
            }
            println!();

            println!(
                "  {:<30} {:>6} {:>12} {:>12}",
                "DESCRIPTION", "QTY", "PRICE", "TOTAL"
            );
            println!("  {}", "-".repeat(63));
            for item in &invoice.items {
                println!(
                    "  {:<30} {:>6} {:>12} {:>12}",
                    truncate(&item.description, 30),
                    item.quantity,
                    format_cents(item.unit_price_cents),
                    format_cents(item.line_total_cents())
                );
            }
            println!("  {}", "-".repeat(63));

            println!("  {:<30} {:>33}", "Subtotal", format_cents(invoice.subtotal_cents()));
            if invoice.tax_rate_bps > 0 {
                println!(
                    "  {:<30} {:>33}",
                    format!("Tax ({}%)", invoice.tax_rate_bps as f64 / 100.0),
                    format_cents(invoice.tax_cents())
                );
            }
            if invoice.discount_cents > 0 {
                println!(
                    "  {:<30} {:>33}",
                    "Discount",
                    format!("-{}", format_cents(invoice.discount_cents))
                );
            }
            println!("  {:<30} {:>33}", "Total", format_cents(invoice.total_cents()));
        }

        InvoiceCommands::Send { number } => {
            let invoice = service.send_invoice(&number).await?;
            println!("Invoice {} is now {}", invoice.number, invoice.status);
        }

        InvoiceCommands::Pay { number } => {
            let invoice = service.pay_invoice(&number).await?;
            println!("Invoice {} is now {}", invoice.number, invoice.status);
        }

        InvoiceCommands::Cancel { number } => {
            let invoice = service.cancel_invoice(&number).await?;
            println!("Invoice {} is now {}", invoice.number, invoice.status);
        }

        InvoiceCommands::RefreshOverdue { book } => {
            let today = Utc::now().date_naive();
            let flipped = service
                .refresh_overdue_invoices(book.as_deref(), today)
                .await?;

            if flipped.is_empty() {
                println!("No invoices are newly overdue.");
            } else {
                println!("Marked {} invoice(s) overdue:", flipped.len());
                for invoice in flipped {
                    println!(
                        "  {} ({}, due {})",
                        invoice.number, invoice.customer_name, invoice.due_date
                    );
                }
            }
        }
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").context("Date must be in YYYY-MM-DD format")
}

fn parse_time(time_str: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(time_str, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time_str, "%H:%M"))
        .context("Time must be in HH:MM or HH:MM:SS format")
}

fn parse_entry_type(s: &str) -> Result<EntryType> {
    EntryType::from_str(s)
        .ok_or_else(|| anyhow::anyhow!("Invalid entry type '{}'. Valid types: in, out", s))
}

fn resolve_range(
    duration: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<DateRange> {
    if let Some(preset) = duration {
        let preset = DurationPreset::from_str(preset).ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid duration '{}'. Valid: today, yesterday, this-month, last-month, all-time",
                preset
            )
        })?;
        return Ok(preset.range(Utc::now().date_naive()));
    }

    let from = from.map(parse_date).transpose().context("Invalid from date")?;
    let to = to.map(parse_date).transpose().context("Invalid to date")?;
    Ok(DateRange::between(from, to))
}

fn parse_invoice_item(spec: &str) -> Result<InvoiceItem> {
    // rsplit keeps colons inside the description intact
    let parts: Vec<&str> = spec.rsplitn(3, ':').collect();
    if parts.len() != 3 {
        anyhow::bail!(
            "Invalid item '{}'. Use 'description:quantity:unit price'",
            spec
        );
    }

    let description = parts[2].trim();
    if description.is_empty() {
        anyhow::bail!("Invalid item '{}': description is empty", spec);
    }
    let quantity: i64 = parts[1]
        .trim()
        .parse()
        .with_context(|| format!("Invalid quantity in item '{}'", spec))?;
    let unit_price_cents = parse_cents(parts[0].trim())
        .with_context(|| format!("Invalid unit price in item '{}'", spec))?;

    Ok(InvoiceItem::new(description, quantity, unit_price_cents))
}

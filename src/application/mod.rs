// Application layer - use cases and orchestration on top of the domain.
// Clients (CLI, import) go through CashbookService; nothing here talks
// to SQL directly.

pub mod error;
pub mod reporting;
pub mod service;

pub use error::*;
pub use reporting::*;
pub use service::*;

mod book;
mod entry;
mod filter;
mod invoice;
mod ledger;
mod money;

pub use book::*;
pub use entry::*;
pub use filter::*;
pub use invoice::*;
pub use ledger::*;
pub use money::*;

//! Persistence layer for the TaskRipple ledger.
//!
//! Two layers live here:
//!
//! - [`DurableStore`]: the leaf. Loads and saves whole record collections
//!   and knows nothing else. [`MemoryStore`] and [`JsonFileStore`] are the
//!   shipped backends.
//! - [`LedgerStorage`]: narrow per-entity CRUD inside a snapshot
//!   (transaction). [`CollectionStorage`] implements it over any
//!   `DurableStore` and serializes all writers through one lock.

mod collection;
pub mod conformance;
mod durable;
mod error;
mod filter;
mod record;
mod traits;

pub use collection::{CollectionSnapshot, CollectionStorage, Collections};
pub use durable::{Collection, DurableStore, JsonFileStore, MemoryStore};
pub use error::StorageError;
pub use filter::{SubmissionFilter, TransactionFilter};
pub use record::{
    AccountRecord, AccountStatus, BalanceEffect, ProofType, Record, Role, SubmissionRecord,
    SubmissionStatus, TaskRecord, TransactionKind, TransactionMetadata, TransactionRecord,
    TransactionStatus,
};
pub use traits::LedgerStorage;

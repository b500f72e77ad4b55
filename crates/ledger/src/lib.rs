//! TaskRipple ledger and account-lifecycle engine.
//!
//! Users register (optionally under a referrer), pay a one-time activation
//! fee, complete tasks for rewards, and withdraw their balance. Approving an
//! activation pays commissions to up to five upline levels.
//!
//! Every write runs inside one [`taskripple_storage::LedgerStorage`]
//! snapshot: either all of its record mutations commit or none do. The
//! modules here are plain functions over any storage backend;
//! [`Platform`] wraps them with caller identity, account-state gating, and
//! configuration.

mod atomic;
pub mod catalog;
pub mod commission;
pub mod config;
pub mod engine;
mod error;
pub mod ids;
pub mod platform;
pub mod registry;
pub mod reports;
pub mod submissions;

pub use catalog::NewTask;
pub use commission::{compute_commissions, CommissionEffect, UplineLink};
pub use config::{LedgerConfig, MAX_COMMISSION_LEVELS};
pub use engine::{ActivationOutcome, Discrepancy, ReconcileReport};
pub use error::LedgerError;
pub use platform::{Actor, PendingQueue, Platform};
pub use registry::{DownlineLevel, Registration};
pub use reports::{AdminOverview, UserOverview};
pub use submissions::{Decision, DecisionOutcome, Proof};

pub use taskripple_storage as storage;

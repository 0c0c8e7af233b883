//! Sync command dispatch.
//!
//! - Storage and tenant-resolution traits the dispatcher runs against
//! - The dispatcher itself

pub mod service;
pub mod store;

#[cfg(test)]
mod memory;

pub use service::{CommandDispatcher, SyncEffect, SyncOutcome, SyncService};
pub use store::{LedgerStore, LedgerUnit, TenantResolver};

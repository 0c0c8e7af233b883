//! Core business logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Balance reconciliation, validation, audit diffing and command sequencing
//! live here; storage is reached through the traits in `sync::store`.
//!
//! # Modules
//!
//! - `ledger` - Transaction types, balance impact and reconciliation
//! - `audit` - Audit entries and field-level change tracking
//! - `sync` - The sync command dispatcher and its storage seam

pub mod audit;
pub mod ledger;
pub mod sync;

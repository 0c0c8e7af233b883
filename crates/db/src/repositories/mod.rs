//! Repository abstractions for data access.
//!
//! Write helpers are free functions over any `ConnectionTrait` so the ledger
//! store can run them inside one transaction. Read paths live on the
//! repository structs and go through an RLS-scoped connection.

pub mod account;
pub mod audit;
pub mod ledger_store;
pub mod tenant;
pub mod transaction;

pub use account::{AccountRepository, BalanceDrift, CreateAccountInput};
pub use audit::AuditRepository;
pub use ledger_store::{LedgerSync, PgLedgerStore, PgLedgerUnit};
pub use tenant::TenantRepository;
pub use transaction::TransactionRepository;

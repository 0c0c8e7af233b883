//! Entity re-exports.

pub use super::accounts::Entity as Accounts;
pub use super::audit_logs::Entity as AuditLogs;
pub use super::tenant_members::Entity as TenantMembers;
pub use super::tenants::Entity as Tenants;
pub use super::transactions::Entity as Transactions;

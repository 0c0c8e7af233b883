//! `SeaORM` entity definitions.

pub mod prelude;

pub mod accounts;
pub mod audit_logs;
pub mod sea_orm_active_enums;
pub mod tenant_members;
pub mod tenants;
pub mod transactions;

//! Repository methods on [`crate::AuditLogStore`].

pub mod audit;
pub mod summary;

//! Security module for ragsmith: repository-confined file access and audit logging.
//!
//! Provides:
//! - **FileGuard**: path resolution and validation against the repository
//!   root, sensitive-file deny-list, diffed atomic writes
//! - **Audit logging**: structured record of writes and denials

pub mod audit;
pub mod guard;

pub use audit::{AuditEntry, AuditEvent, AuditLogger, AuditOutcome, AuditSink, TracingSink};
pub use guard::{FileGuard, GuardError, WriteOutcome};

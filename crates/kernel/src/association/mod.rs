//! Showcase/dataset association bookkeeping.
//!
//! - AssociationStore: create, delete, list, cascade
//! - AssociationRecords: persistence contract (Postgres or in-memory)

mod records;
mod store;

pub use records::{AssociationRecords, MemoryAssociationRecords, PgAssociationRecords};
pub use store::AssociationStore;

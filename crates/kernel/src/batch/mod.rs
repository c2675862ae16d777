//! Bulk association operations.
//!
//! Adds and removes many datasets on one showcase, isolating failures per
//! item and reporting the partition of successes and failures.

mod service;
mod types;

pub use service::{BulkAssociationProcessor, dataset_ids_from_form};
pub use types::{BulkOperation, BulkOutcome, ItemFailure};

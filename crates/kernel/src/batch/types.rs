//! Bulk association types.

use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::FailureReason;

/// Kind of bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkOperation {
    /// Associate every target dataset.
    Add,

    /// Remove every target association.
    Remove,
}

impl BulkOperation {
    /// Form action name that triggers this operation.
    pub fn form_action(&self) -> &'static str {
        match self {
            BulkOperation::Add => "bulk_action.showcase_add",
            BulkOperation::Remove => "bulk_action.showcase_remove",
        }
    }

    fn past_tense(&self) -> &'static str {
        match self {
            BulkOperation::Add => "added",
            BulkOperation::Remove => "removed",
        }
    }
}

impl FromStr for BulkOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(BulkOperation::Add),
            "remove" => Ok(BulkOperation::Remove),
            other => Err(format!("unknown bulk operation: {other}")),
        }
    }
}

/// One dataset that could not be processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemFailure {
    /// Dataset id as submitted.
    pub dataset_id: String,

    /// Grouping reason.
    pub reason: FailureReason,

    /// Full error text, for logs and detail views.
    pub detail: String,
}

/// Result of a bulk operation: the partition of targets into successes and
/// failures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkOutcome {
    pub operation: BulkOperation,

    /// Canonical showcase id.
    pub showcase_id: String,

    /// Number of ids submitted.
    pub requested: usize,

    /// Dataset ids processed successfully, in submission order.
    pub succeeded: Vec<String>,

    /// Per-item failures, in submission order. Always empty for removals.
    pub failed: Vec<ItemFailure>,

    /// Associations actually deleted (removals only).
    pub removed: u64,
}

impl BulkOutcome {
    pub fn new(operation: BulkOperation, showcase_id: impl Into<String>, requested: usize) -> Self {
        Self {
            operation,
            showcase_id: showcase_id.into(),
            requested,
            succeeded: Vec::new(),
            failed: Vec::new(),
            removed: 0,
        }
    }

    /// Whether every submitted id succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// "N dataset(s) added" / "N dataset(s) removed".
    pub fn summary(&self) -> String {
        let n = match self.operation {
            BulkOperation::Add => self.succeeded.len() as u64,
            BulkOperation::Remove => self.removed,
        };
        let noun = if n == 1 { "dataset" } else { "datasets" };
        format!("{n} {noun} {}", self.operation.past_tense())
    }

    /// Success flash shown after the form post, if any.
    ///
    /// Additions are pluralised by the number that succeeded and only
    /// reported when at least one did; removals by the number submitted.
    pub fn flash_message(&self) -> Option<&'static str> {
        match self.operation {
            BulkOperation::Add => match self.succeeded.len() {
                0 => None,
                1 => Some("The dataset has been added to the showcase."),
                _ => Some("The datasets have been added to the showcase."),
            },
            BulkOperation::Remove => match self.requested {
                0 => None,
                1 => Some("The dataset has been removed from the showcase."),
                _ => Some("The datasets have been removed from the showcase."),
            },
        }
    }

    /// Failures grouped by reason, reasons in first-seen order.
    pub fn failures_by_reason(&self) -> IndexMap<FailureReason, Vec<&str>> {
        let mut grouped: IndexMap<FailureReason, Vec<&str>> = IndexMap::new();
        for failure in &self.failed {
            grouped
                .entry(failure.reason)
                .or_default()
                .push(failure.dataset_id.as_str());
        }
        grouped
    }

    /// One message per distinct failure reason.
    pub fn failure_messages(&self) -> Vec<String> {
        self.failures_by_reason()
            .into_iter()
            .map(|(reason, ids)| format!("{}: {}", reason.message(), ids.join(", ")))
            .collect()
    }

    /// Summary followed by the failure messages.
    pub fn messages(&self) -> Vec<String> {
        std::iter::once(self.summary())
            .chain(self.failure_messages())
            .collect()
    }
}

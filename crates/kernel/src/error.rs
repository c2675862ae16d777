//! Error types for association and discovery operations.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::catalog::CatalogError;

/// Errors surfaced by the showcase kernel.
#[derive(Debug, Error)]
pub enum ShowcaseError {
    /// A referenced showcase or dataset does not resolve in the catalog.
    #[error("{kind} not found: {id}")]
    NotFound { kind: ItemKind, id: String },

    /// The (showcase, dataset) pair is already associated.
    #[error("dataset {dataset_id} is already associated with showcase {showcase_id}")]
    DuplicateAssociation {
        showcase_id: String,
        dataset_id: String,
    },

    /// The permission gate denied the action.
    #[error("not authorized to {action}")]
    NotAuthorized { action: String },

    /// Malformed request input; carries the offending parameter name.
    #[error("parameter \"{parameter}\" is invalid: {reason}")]
    InvalidParameter { parameter: String, reason: String },

    /// The catalog search service failed.
    #[error("search backend error")]
    SearchBackend(#[from] CatalogError),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

/// Which side of an association an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Showcase,
    Dataset,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKind::Showcase => f.write_str("showcase"),
            ItemKind::Dataset => f.write_str("dataset"),
        }
    }
}

impl ShowcaseError {
    pub fn not_found(kind: ItemKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    pub fn not_authorized(action: impl Into<String>) -> Self {
        Self::NotAuthorized {
            action: action.into(),
        }
    }

    /// Short, user-facing reason used to group bulk failures.
    ///
    /// Identifiers are left out so that failures of the same kind share one
    /// message.
    pub fn reason(&self) -> FailureReason {
        match self {
            ShowcaseError::NotFound { kind, .. } => FailureReason::NotFound(*kind),
            ShowcaseError::DuplicateAssociation { .. } => FailureReason::AlreadyAssociated,
            _ => FailureReason::Other,
        }
    }

    /// Whether a bulk batch records this error per item instead of aborting.
    pub fn is_item_failure(&self) -> bool {
        matches!(
            self,
            ShowcaseError::NotFound { .. } | ShowcaseError::DuplicateAssociation { .. }
        )
    }
}

/// Grouping key for per-item failures in a bulk batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NotFound(ItemKind),
    AlreadyAssociated,
    Other,
}

impl serde::Serialize for ItemKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FailureReason {
    /// Human-readable message for the reason.
    pub fn message(&self) -> &'static str {
        match self {
            FailureReason::NotFound(ItemKind::Dataset) => "Dataset not found",
            FailureReason::NotFound(ItemKind::Showcase) => "Showcase not found",
            FailureReason::AlreadyAssociated => "The dataset is already in the showcase",
            FailureReason::Other => "The dataset could not be added",
        }
    }
}

impl IntoResponse for ShowcaseError {
    fn into_response(self) -> Response {
        let status = match &self {
            ShowcaseError::NotFound { .. } => StatusCode::NOT_FOUND,
            ShowcaseError::DuplicateAssociation { .. } => StatusCode::CONFLICT,
            ShowcaseError::NotAuthorized { .. } => StatusCode::UNAUTHORIZED,
            ShowcaseError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            ShowcaseError::SearchBackend(_) => StatusCode::BAD_GATEWAY,
            ShowcaseError::Database(_) | ShowcaseError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Backend and persistence details stay in the logs
        let body = match &self {
            ShowcaseError::SearchBackend(e) => {
                tracing::error!(error = %e, "search backend error");
                "search is currently unavailable".to_string()
            }
            ShowcaseError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "internal server error".to_string()
            }
            ShowcaseError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, body).into_response()
    }
}

/// Result type alias using ShowcaseError.
pub type ShowcaseResult<T> = Result<T, ShowcaseError>;

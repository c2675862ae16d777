//! Database models.

pub mod association;

pub use association::ShowcaseAssociation;

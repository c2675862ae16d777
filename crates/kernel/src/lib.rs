//! Showcase kernel library.
//!
//! Showcase/dataset associations and the faceted discovery search used to
//! find datasets to add to a showcase. The operator entry point is the
//! `showcase` binary.

pub mod association;
pub mod batch;
pub mod catalog;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod models;
pub mod permissions;
pub mod search;
pub mod showcase;

pub use config::Config;
pub use context::{Actor, RequestContext};
pub use error::{ShowcaseError, ShowcaseResult};
pub use showcase::ShowcaseService;

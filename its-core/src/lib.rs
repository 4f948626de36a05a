//! ITS Core - Core library for issue tracking system accessors
//!
//! This crate provides the vendor-independent pieces shared by every tracker
//! backend: the accessor capability trait, the issue update request, name to
//! id reference tables, configuration, and secrets.

pub mod accessor;
pub mod config;
pub mod error;
pub mod issue_data;
pub mod reference;
pub mod secrets;

pub use accessor::ItsAccessor;
pub use config::{Config, TrackerConfig, TrackerKind};
pub use error::{Error, Result};
pub use issue_data::{parse_hours, IssueData};
pub use reference::{ReferenceTable, UnknownNamePolicy};
pub use secrets::Secrets;

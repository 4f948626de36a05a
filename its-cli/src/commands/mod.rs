//! CLI command implementations

pub mod fields;
pub mod issue;

pub use issue::IssueCommand;

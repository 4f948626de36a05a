//! ITS Redmine - Redmine integration for issue tracking system accessors
//!
//! This crate provides the Redmine REST transport, the Redmine resource
//! model, and [`RedmineAccessor`], which maps [`its_core::IssueData`]
//! requests onto Redmine issues.

mod accessor;
mod api;
mod client;
mod error;
mod models;

pub use accessor::RedmineAccessor;
pub use api::{IssueFilter, RedmineApi};
pub use client::{ClientOptions, RedmineClient};
pub use error::{Error, Result};
pub use models::{
    CustomField, CustomFieldValue, Issue, IssueChanges, NamedRef, PossibleValue, Priority,
    Project, User, Version,
};

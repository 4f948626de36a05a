//! Accessor capability contract
//!
//! Every tracker backend implements [`ItsAccessor`]. The trait has no state
//! and no default bodies, so a backend that forgets an operation does not
//! compile.

use async_trait::async_trait;

use crate::IssueData;

/// Operations any issue tracking system accessor must provide
///
/// Read operations propagate errors. Writes report the outcome through their
/// return value and log the cause: `update_issue` returns `false` and
/// `create_issue` returns `None` when nothing was persisted.
#[async_trait]
pub trait ItsAccessor: Send {
    /// The tracker's issue handle
    type Issue: Send + Sync;

    /// Error returned by read operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch every issue of a project, open and closed
    async fn load_issues(&mut self, project_name: &str) -> Result<Vec<Self::Issue>, Self::Error>;

    /// Fetch a single issue
    async fn load_issue(&mut self, issue_id: u64) -> Result<Self::Issue, Self::Error>;

    /// Apply a partial update to an existing issue
    async fn update_issue(&mut self, issue: &mut Self::Issue, issue_data: &IssueData) -> bool;

    /// Create and persist a new issue, returning its id
    async fn create_issue(&mut self, issue_data: &IssueData) -> Option<u64>;
}

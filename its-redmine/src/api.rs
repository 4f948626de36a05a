//! The Redmine operations the accessor depends on

use async_trait::async_trait;

use crate::{CustomField, Issue, IssueChanges, Priority, Project, Result, User, Version};

/// Filter for issue listings
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    /// Project id or identifier
    pub project: Option<String>,
    /// Include closed issues as well as open ones
    pub all_statuses: bool,
}

impl IssueFilter {
    /// Every issue of a project regardless of status
    pub fn project(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            all_statuses: true,
        }
    }
}

/// Redmine resource operations
///
/// [`crate::RedmineClient`] implements this over HTTP. Listing methods
/// return every entry, following pagination internally.
#[async_trait]
pub trait RedmineApi: Send + Sync {
    /// All projects visible to the key
    async fn projects(&self) -> Result<Vec<Project>>;

    /// Issues matching a filter, with custom field values
    async fn issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>>;

    /// A single issue, with custom field values
    async fn issue(&self, id: u64) -> Result<Issue>;

    /// All users regardless of status
    async fn users(&self) -> Result<Vec<User>>;

    /// Issue priority enumeration
    async fn issue_priorities(&self) -> Result<Vec<Priority>>;

    /// Versions shared with a project
    async fn versions(&self, project_id: u64) -> Result<Vec<Version>>;

    /// All custom field definitions (administrator key required)
    async fn custom_fields(&self) -> Result<Vec<CustomField>>;

    /// Create an issue from pending changes, returning the stored issue
    async fn create_issue(&self, changes: &IssueChanges) -> Result<Issue>;

    /// Apply pending changes to an existing issue
    async fn update_issue(&self, id: u64, changes: &IssueChanges) -> Result<()>;
}

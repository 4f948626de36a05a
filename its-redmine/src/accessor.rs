//! Redmine implementation of the accessor contract
//!
//! A [`RedmineAccessor`] is bound to one project on one tracker. It caches
//! the user and priority tables when it is created and the version table
//! when the project is loaded, then maps [`IssueData`] requests onto
//! [`IssueChanges`] using those tables.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use its_core::{ItsAccessor, IssueData, ReferenceTable, UnknownNamePolicy};
use tracing::{debug, info, warn};

use crate::api::{IssueFilter, RedmineApi};
use crate::client::{ClientOptions, RedmineClient};
use crate::{Error, Issue, IssueChanges, Result};

/// Accessor for one Redmine project
pub struct RedmineAccessor<A: RedmineApi = RedmineClient> {
    api: A,
    project_name: String,
    project_id: Option<u64>,
    users: ReferenceTable,
    priorities: ReferenceTable,
    versions: ReferenceTable,
    issues: Vec<Issue>,
    issue: Option<Issue>,
    unknown_names: UnknownNamePolicy,
}

impl RedmineAccessor<RedmineClient> {
    /// Connect to the tracker at `url` and load the reference tables
    ///
    /// Fails only when the client cannot be built (invalid URL or key). An
    /// unreachable tracker yields an accessor with empty tables.
    pub async fn connect(
        project_name: impl Into<String>,
        url: &str,
        api_key: &str,
        options: &ClientOptions,
    ) -> Result<Self> {
        let client = RedmineClient::new(url, api_key, options)?;
        Ok(Self::new(project_name, client).await)
    }
}

impl<A: RedmineApi> RedmineAccessor<A> {
    /// Create an accessor and load the user and priority tables
    ///
    /// Fetch failures are logged and leave the affected table empty.
    pub async fn new(project_name: impl Into<String>, api: A) -> Self {
        let mut accessor = Self {
            api,
            project_name: project_name.into(),
            project_id: None,
            users: ReferenceTable::new(),
            priorities: ReferenceTable::new(),
            versions: ReferenceTable::new(),
            issues: Vec::new(),
            issue: None,
            unknown_names: UnknownNamePolicy::default(),
        };

        match accessor.api.users().await {
            Ok(users) => {
                accessor.users = users.iter().map(|u| (u.full_name(), u.id)).collect();
                debug!(count = accessor.users.len(), "Loaded users");
            }
            Err(e) => warn!(error = %e, "User info get error"),
        }

        match accessor.api.issue_priorities().await {
            Ok(priorities) => {
                accessor.priorities = priorities.into_iter().map(|p| (p.name, p.id)).collect();
                debug!(count = accessor.priorities.len(), "Loaded priorities");
            }
            Err(e) => warn!(error = %e, "Priority info get error"),
        }

        accessor
    }

    /// Set how unknown assignee/version/priority names are handled
    pub fn with_unknown_name_policy(mut self, policy: UnknownNamePolicy) -> Self {
        self.unknown_names = policy;
        self
    }

    /// Resolve the project id and load the project's version table
    ///
    /// Returns `false` when the project does not exist or a fetch fails.
    pub async fn load_project(&mut self) -> bool {
        match self.try_load_project().await {
            Ok(project_id) => {
                info!(
                    project = %self.project_name,
                    project_id,
                    versions = self.versions.len(),
                    "Loaded project"
                );
                true
            }
            Err(e) => {
                warn!(project = %self.project_name, error = %e, "Project load error");
                false
            }
        }
    }

    async fn try_load_project(&mut self) -> Result<u64> {
        self.project_id = None;
        self.versions = ReferenceTable::new();

        let projects = self.api.projects().await?;
        let project_id = projects
            .iter()
            .find(|p| p.identifier == self.project_name)
            .map(|p| p.id)
            .ok_or_else(|| Error::ProjectNotFound(self.project_name.clone()))?;
        self.project_id = Some(project_id);

        let versions = self.api.versions(project_id).await?;
        self.versions = versions.into_iter().map(|v| (v.name, v.id)).collect();

        Ok(project_id)
    }

    /// Update an issue, returning the reason on failure
    ///
    /// Consistency checks run before anything is assigned; nothing is sent
    /// when they fail.
    pub async fn try_update_issue(&self, issue: &mut Issue, issue_data: &IssueData) -> Result<()> {
        self.check_consistency(issue, issue_data)?;
        self.apply_payload(issue, issue_data)?;

        let id = issue.id.ok_or(Error::MissingId)?;
        self.api.update_issue(id, &issue.changes).await?;
        issue.commit_changes();

        info!(issue_id = id, "Updated issue");
        Ok(())
    }

    /// Create an issue, returning the reason on failure
    pub async fn try_create_issue(&self, issue_data: &IssueData) -> Result<u64> {
        let mut issue = Issue::blank();
        self.apply_payload(&mut issue, issue_data)?;

        let created = self.api.create_issue(&issue.changes).await?;
        let id = created
            .id
            .ok_or_else(|| Error::Parse("Created issue has no id".to_string()))?;

        info!(issue_id = id, "Created issue");
        Ok(id)
    }

    /// Newest `updated_on` among the loaded issues
    pub fn latest_update(&self) -> Option<DateTime<Utc>> {
        self.issues.iter().filter_map(|i| i.updated_on).max()
    }

    /// Issue id to subject for the loaded issues; the first subject seen wins
    pub fn id_to_subject(&self) -> BTreeMap<u64, String> {
        let mut map = BTreeMap::new();
        for issue in &self.issues {
            if let Some(id) = issue.id {
                map.entry(id).or_insert_with(|| issue.subject.clone());
            }
        }
        map
    }

    /// Check that a custom field exists and, for enumerated fields, that
    /// `value` is one of its possible values
    pub async fn has_custom_field(&self, field_id: u64, value: &str) -> Result<bool> {
        let fields = self.api.custom_fields().await?;

        let Some(field) = fields.iter().find(|f| f.id == field_id) else {
            warn!(field_id, "Custom field not found");
            return Ok(false);
        };

        Ok(field.accepts(value))
    }

    /// Refuse updates aimed at another project or another issue
    fn check_consistency(&self, issue: &Issue, issue_data: &IssueData) -> Result<()> {
        if let Some(found) = issue.project_id() {
            if self.project_id != Some(found) {
                return Err(Error::ProjectMismatch {
                    expected: self.project_id,
                    found,
                });
            }
        }

        let expected = issue_data.id_check.as_deref().filter(|s| !s.is_empty());
        if let (Some(expected), Some(found)) = (expected, issue.id) {
            if expected != found.to_string() {
                return Err(Error::IdMismatch {
                    expected: expected.to_string(),
                    found,
                });
            }
        }

        Ok(())
    }

    /// Assign every supplied field to the issue's pending changes
    ///
    /// The issue is left untouched if a name is rejected.
    fn apply_payload(&self, issue: &mut Issue, data: &IssueData) -> Result<()> {
        let mut changes: IssueChanges = issue.changes.clone();

        if let Some(project_id) = self.project_id {
            changes.project_id = Some(project_id);
        }
        // id is immutable on Redmine; tracker and status are not mapped
        if let Some(parent) = data.parent_id {
            changes.parent_issue_id = Some(parent);
        }
        if let Some(ref subject) = data.subject {
            changes.subject = Some(subject.clone());
        }
        if let Some(ref name) = data.assignee {
            changes.assigned_to_id = Some(self.resolve(&self.users, "assignee", name)?);
        }
        if let Some(ref name) = data.version {
            changes.fixed_version_id = Some(self.resolve(&self.versions, "version", name)?);
        }
        if let Some(date) = data.start_date {
            changes.start_date = Some(date);
        }
        if let Some(date) = data.due_date {
            changes.due_date = Some(date);
        }
        if let Some(hours) = data.estimated_hours {
            changes.estimated_hours = Some(hours);
        }
        if let Some(hours) = data.total_estimated_hours {
            changes.total_estimated_hours = Some(hours);
        }
        // spent_hours is read-only; only the total is written
        if let Some(hours) = data.total_spent_hours {
            changes.total_spent_hours = Some(hours);
        }
        if let Some(ratio) = data.done_ratio {
            changes.done_ratio = Some(ratio);
        }
        if let Some(ref name) = data.priority {
            changes.priority_id = Some(self.resolve(&self.priorities, "priority", name)?);
        }
        if let Some(ref description) = data.description {
            changes.description = Some(description.clone());
        }

        issue.changes = changes;
        Ok(())
    }

    fn resolve(&self, table: &ReferenceTable, kind: &'static str, name: &str) -> Result<Option<u64>> {
        if let Some(id) = table.resolve(name) {
            return Ok(Some(id));
        }

        match self.unknown_names {
            UnknownNamePolicy::Clear => {
                warn!(kind, name, known = ?table.names(), "Unknown name, field will be cleared");
                Ok(None)
            }
            UnknownNamePolicy::Reject => Err(Error::UnknownName {
                kind,
                name: name.to_string(),
                known: table.names().into_iter().map(String::from).collect(),
            }),
        }
    }

    /// Project identifier this accessor is bound to
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Resolved project id, once [`Self::load_project`] has succeeded
    pub fn project_id(&self) -> Option<u64> {
        self.project_id
    }

    pub fn users(&self) -> &ReferenceTable {
        &self.users
    }

    pub fn priorities(&self) -> &ReferenceTable {
        &self.priorities
    }

    pub fn versions(&self) -> &ReferenceTable {
        &self.versions
    }

    /// Issue set from the last [`ItsAccessor::load_issues`]
    pub fn current_issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Issue from the last [`ItsAccessor::load_issue`]
    pub fn current_issue(&self) -> Option<&Issue> {
        self.issue.as_ref()
    }

    /// Get the underlying API
    pub fn api(&self) -> &A {
        &self.api
    }
}

#[async_trait]
impl<A: RedmineApi> ItsAccessor for RedmineAccessor<A> {
    type Issue = Issue;
    type Error = Error;

    async fn load_issues(&mut self, project_name: &str) -> Result<Vec<Issue>> {
        debug!(project = project_name, "Loading issues");

        let issues = self.api.issues(&IssueFilter::project(project_name)).await?;
        info!(project = project_name, count = issues.len(), "Loaded issues");

        self.issues = issues.clone();
        Ok(issues)
    }

    async fn load_issue(&mut self, issue_id: u64) -> Result<Issue> {
        debug!(issue_id, "Loading issue");

        let issue = self.api.issue(issue_id).await?;
        self.issue = Some(issue.clone());
        Ok(issue)
    }

    async fn update_issue(&mut self, issue: &mut Issue, issue_data: &IssueData) -> bool {
        match self.try_update_issue(issue, issue_data).await {
            Ok(()) => true,
            Err(e) => {
                warn!(issue_id = ?issue.id, error = %e, "Issue update error");
                false
            }
        }
    }

    async fn create_issue(&mut self, issue_data: &IssueData) -> Option<u64> {
        match self.try_create_issue(issue_data).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "Issue creation error");
                None
            }
        }
    }
}

impl<A: RedmineApi> std::fmt::Debug for RedmineAccessor<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedmineAccessor")
            .field("project_name", &self.project_name)
            .field("project_id", &self.project_id)
            .field("users", &self.users.len())
            .field("priorities", &self.priorities.len())
            .field("versions", &self.versions.len())
            .field("issues", &self.issues.len())
            .finish_non_exhaustive()
    }
}

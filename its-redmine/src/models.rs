//! Redmine resource model
//!
//! Read-side structs mirror the JSON returned by the Redmine REST API.
//! Writes go through [`IssueChanges`], which only serializes the fields that
//! were actually assigned.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Reference to another resource as embedded in Redmine responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Redmine project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    /// URL-safe identifier, used as the project name by the accessor
    pub identifier: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent: Option<NamedRef>,
}

/// Redmine user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub mail: Option<String>,
}

impl User {
    /// Display name in "lastname firstname" order
    pub fn full_name(&self) -> String {
        format!("{} {}", self.lastname, self.firstname)
    }
}

/// Issue priority enumeration entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Priority {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Project version (milestone)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub project: Option<NamedRef>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Allowed value of a list-style custom field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PossibleValue {
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Custom field definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomField {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub customized_type: Option<String>,
    #[serde(default)]
    pub field_format: Option<String>,
    /// Present only for enumerated formats (list, bool, ...)
    #[serde(default)]
    pub possible_values: Option<Vec<PossibleValue>>,
}

impl CustomField {
    /// Whether `value` is acceptable for this field
    ///
    /// Fields without an enumerated value set accept anything.
    pub fn accepts(&self, value: &str) -> bool {
        match self.possible_values {
            Some(ref values) => values.iter().any(|v| v.value == value),
            None => true,
        }
    }
}

/// Custom field value attached to an issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomFieldValue {
    pub id: u64,
    pub name: String,
    /// String for single-value fields, array for multi-value fields
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Pending issue writes
///
/// `None` means "not assigned". For reference fields, `Some(None)` is an
/// assigned empty reference and is sent as JSON `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IssueChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_issue_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<Option<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_version_id: Option<Option<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_estimated_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_spent_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_ratio: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<Option<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl IssueChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Redmine issue
///
/// `id` is `None` only for a blank template that has not been saved yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub project: Option<NamedRef>,
    #[serde(default)]
    pub tracker: Option<NamedRef>,
    #[serde(default)]
    pub status: Option<NamedRef>,
    #[serde(default)]
    pub priority: Option<NamedRef>,
    #[serde(default)]
    pub author: Option<NamedRef>,
    #[serde(default)]
    pub assigned_to: Option<NamedRef>,
    #[serde(default)]
    pub fixed_version: Option<NamedRef>,
    #[serde(default)]
    pub parent: Option<NamedRef>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub done_ratio: Option<u8>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub total_estimated_hours: Option<f64>,
    #[serde(default)]
    pub spent_hours: Option<f64>,
    #[serde(default)]
    pub total_spent_hours: Option<f64>,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldValue>,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_on: Option<DateTime<Utc>>,

    /// Writes assigned since the last successful save
    #[serde(skip)]
    pub changes: IssueChanges,
}

impl Issue {
    /// Empty template for a new issue
    pub fn blank() -> Self {
        Self::default()
    }

    /// Project id, if the issue carries a project reference
    pub fn project_id(&self) -> Option<u64> {
        self.project.as_ref().map(|p| p.id)
    }

    /// Fold saved changes into the read-side attributes and clear them
    pub fn commit_changes(&mut self) {
        let changes = std::mem::take(&mut self.changes);

        if let Some(id) = changes.project_id {
            set_ref(&mut self.project, Some(id));
        }
        if let Some(id) = changes.parent_issue_id {
            set_ref(&mut self.parent, Some(id));
        }
        if let Some(subject) = changes.subject {
            self.subject = subject;
        }
        if let Some(id) = changes.assigned_to_id {
            set_ref(&mut self.assigned_to, id);
        }
        if let Some(id) = changes.fixed_version_id {
            set_ref(&mut self.fixed_version, id);
        }
        if let Some(date) = changes.start_date {
            self.start_date = Some(date);
        }
        if let Some(date) = changes.due_date {
            self.due_date = Some(date);
        }
        if let Some(hours) = changes.estimated_hours {
            self.estimated_hours = Some(hours);
        }
        if let Some(hours) = changes.total_estimated_hours {
            self.total_estimated_hours = Some(hours);
        }
        if let Some(hours) = changes.total_spent_hours {
            self.total_spent_hours = Some(hours);
        }
        if let Some(ratio) = changes.done_ratio {
            self.done_ratio = Some(ratio);
        }
        if let Some(id) = changes.priority_id {
            set_ref(&mut self.priority, id);
        }
        if let Some(description) = changes.description {
            self.description = Some(description);
        }
    }
}

/// Point a reference at `id`, keeping the cached name when the id is unchanged
fn set_ref(slot: &mut Option<NamedRef>, id: Option<u64>) {
    match id {
        Some(id) if slot.as_ref().is_some_and(|r| r.id == id) => {}
        Some(id) => *slot = Some(NamedRef { id, name: None }),
        None => *slot = None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUE_JSON: &str = r#"{
        "id": 42,
        "project": {"id": 7, "name": "Demo"},
        "tracker": {"id": 1, "name": "Bug"},
        "status": {"id": 1, "name": "New", "is_closed": false},
        "priority": {"id": 2, "name": "Normal"},
        "author": {"id": 1, "name": "Admin"},
        "parent": {"id": 40},
        "subject": "Fix bug",
        "description": "Steps",
        "start_date": "2024-04-01",
        "due_date": null,
        "done_ratio": 30,
        "is_private": false,
        "estimated_hours": 1.5,
        "total_estimated_hours": 1.5,
        "spent_hours": 0.0,
        "total_spent_hours": 0.0,
        "custom_fields": [
            {"id": 3, "name": "Severity", "value": "Major"},
            {"id": 4, "name": "Tags", "multiple": true, "value": ["a", "b"]}
        ],
        "created_on": "2024-04-01T09:00:00Z",
        "updated_on": "2024-04-02T10:30:00Z"
    }"#;

    #[test]
    fn test_deserialize_issue() {
        let issue: Issue = serde_json::from_str(ISSUE_JSON).unwrap();
        assert_eq!(issue.id, Some(42));
        assert_eq!(issue.project_id(), Some(7));
        assert_eq!(issue.parent.as_ref().map(|p| p.id), Some(40));
        assert!(issue.parent.as_ref().unwrap().name.is_none());
        assert_eq!(issue.start_date, NaiveDate::from_ymd_opt(2024, 4, 1));
        assert!(issue.due_date.is_none());
        assert_eq!(issue.done_ratio, Some(30));
        assert_eq!(issue.custom_fields.len(), 2);
        assert!(issue.custom_fields[1].value.is_array());
        assert!(issue.assigned_to.is_none());
        assert!(issue.changes.is_empty());
    }

    #[test]
    fn test_changes_serialize_only_assigned() {
        let changes = IssueChanges {
            project_id: Some(7),
            subject: Some("Test".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&changes).unwrap();
        assert_eq!(json, serde_json::json!({"project_id": 7, "subject": "Test"}));
    }

    #[test]
    fn test_cleared_reference_serializes_as_null() {
        let changes = IssueChanges {
            assigned_to_id: Some(None),
            priority_id: Some(Some(4)),
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            ..Default::default()
        };
        let json = serde_json::to_value(&changes).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"assigned_to_id": null, "priority_id": 4, "start_date": "2024-05-01"})
        );
    }

    #[test]
    fn test_commit_changes() {
        let mut issue: Issue = serde_json::from_str(ISSUE_JSON).unwrap();
        issue.changes = IssueChanges {
            project_id: Some(7),
            subject: Some("Renamed".to_string()),
            priority_id: Some(None),
            assigned_to_id: Some(Some(5)),
            done_ratio: Some(80),
            ..Default::default()
        };

        issue.commit_changes();

        assert!(issue.changes.is_empty());
        assert_eq!(issue.subject, "Renamed");
        // same project id keeps the cached name
        assert_eq!(issue.project.as_ref().unwrap().name.as_deref(), Some("Demo"));
        assert!(issue.priority.is_none());
        assert_eq!(issue.assigned_to.as_ref().map(|r| r.id), Some(5));
        assert_eq!(issue.done_ratio, Some(80));
        assert_eq!(issue.description.as_deref(), Some("Steps"));
    }

    #[test]
    fn test_user_full_name_is_last_first() {
        let user: User =
            serde_json::from_str(r#"{"id": 5, "login": "taro", "firstname": "Taro", "lastname": "Yamada"}"#)
                .unwrap();
        assert_eq!(user.full_name(), "Yamada Taro");
    }

    #[test]
    fn test_custom_field_accepts() {
        let list: CustomField = serde_json::from_str(
            r#"{"id": 3, "name": "Severity", "field_format": "list",
                "possible_values": [{"value": "Major"}, {"value": "Minor"}]}"#,
        )
        .unwrap();
        assert!(list.accepts("Major"));
        assert!(!list.accepts("Trivial"));

        let text: CustomField =
            serde_json::from_str(r#"{"id": 5, "name": "Note", "field_format": "string"}"#).unwrap();
        assert!(text.accepts("anything"));
    }
}

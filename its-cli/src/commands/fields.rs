//! Issue field flags shared by create and update

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Args;
use its_core::{parse_hours, IssueData};

/// Fields to write. Flags take precedence over values from `--data`.
#[derive(Args, Debug, Default)]
pub struct FieldArgs {
    /// JSON object keyed by field label (題名, 担当者, ...); empty values are skipped
    #[arg(long, value_name = "FILE")]
    pub data: Option<PathBuf>,

    /// Parent issue id
    #[arg(long)]
    pub parent: Option<u64>,

    #[arg(long)]
    pub subject: Option<String>,

    /// Assignee full name ("lastname firstname")
    #[arg(long)]
    pub assignee: Option<String>,

    /// Target version name
    #[arg(long = "target-version")]
    pub target_version: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due_date: Option<NaiveDate>,

    #[arg(long, value_parser = parse_hours)]
    pub estimated_hours: Option<f64>,

    #[arg(long, value_parser = parse_hours)]
    pub total_estimated_hours: Option<f64>,

    #[arg(long, value_parser = parse_hours)]
    pub total_spent_hours: Option<f64>,

    /// Progress percentage (0-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub done_ratio: Option<u8>,

    /// Priority name
    #[arg(long)]
    pub priority: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
}

impl FieldArgs {
    /// Merge the data file (if any) with explicit flags
    pub fn to_issue_data(&self) -> anyhow::Result<IssueData> {
        let mut data = match self.data {
            Some(ref path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                IssueData::from_labeled_json(&json)
                    .with_context(|| format!("Invalid issue data in {}", path.display()))?
            }
            None => IssueData::default(),
        };

        data.parent_id = self.parent.or(data.parent_id);
        data.subject = self.subject.clone().or(data.subject);
        data.assignee = self.assignee.clone().or(data.assignee);
        data.version = self.target_version.clone().or(data.version);
        data.start_date = self.start_date.or(data.start_date);
        data.due_date = self.due_date.or(data.due_date);
        data.estimated_hours = self.estimated_hours.or(data.estimated_hours);
        data.total_estimated_hours = self.total_estimated_hours.or(data.total_estimated_hours);
        data.total_spent_hours = self.total_spent_hours.or(data.total_spent_hours);
        data.done_ratio = self.done_ratio.or(data.done_ratio);
        data.priority = self.priority.clone().or(data.priority);
        data.description = self.description.clone().or(data.description);

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_no_flags_is_empty() {
        let data = FieldArgs::default().to_issue_data().unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r##"{{"#": "42", "題名": "From file", "優先度": "Low", "期日": ""}}"##
        )
        .unwrap();

        let args = FieldArgs {
            data: Some(file.path().to_path_buf()),
            subject: Some("From flag".to_string()),
            done_ratio: Some(20),
            ..Default::default()
        };

        let data = args.to_issue_data().unwrap();
        assert_eq!(data.id_check.as_deref(), Some("42"));
        assert_eq!(data.subject.as_deref(), Some("From flag"));
        assert_eq!(data.priority.as_deref(), Some("Low"));
        assert_eq!(data.done_ratio, Some(20));
        assert!(data.due_date.is_none());
    }

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        fields: FieldArgs,
    }

    #[test]
    fn test_hours_flags_reject_non_finite() {
        for value in ["NaN", "inf", "-1"] {
            let result = Harness::try_parse_from(["its", "--estimated-hours", value]);
            assert!(result.is_err(), "{value} should be rejected");
        }
        assert!(Harness::try_parse_from(["its", "--total-spent-hours", "NaN"]).is_err());
        assert!(Harness::try_parse_from(["its", "--total-estimated-hours", "inf"]).is_err());

        let parsed = Harness::try_parse_from(["its", "--estimated-hours", "2.5"]).unwrap();
        assert_eq!(parsed.fields.estimated_hours, Some(2.5));
    }

    #[test]
    fn test_missing_file_is_error() {
        let args = FieldArgs {
            data: Some(PathBuf::from("/nonexistent/issue.json")),
            ..Default::default()
        };
        assert!(args.to_issue_data().is_err());
    }
}

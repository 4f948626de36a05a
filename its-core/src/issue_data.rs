//! Issue update requests
//!
//! An [`IssueData`] carries the subset of issue fields a caller wants to
//! write. Every field is independently present or absent, so "not supplied"
//! is never confused with "cleared".
//!
//! Callers that still produce the labeled mapping used by spreadsheet
//! exports (Japanese column labels, `#` for the issue id, empty string for
//! "omit") go through [`IssueData::from_labeled`].

use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use serde_json::Value;

use crate::{Error, Result};

/// Label carrying the issue id used for the update consistency check
pub const LABEL_ID: &str = "#";
/// Parent ticket
pub const LABEL_PARENT: &str = "親チケット";
/// Subject
pub const LABEL_SUBJECT: &str = "題名";
/// Assignee full name
pub const LABEL_ASSIGNEE: &str = "担当者";
/// Target version name
pub const LABEL_VERSION: &str = "対象バージョン";
/// Start date
pub const LABEL_START_DATE: &str = "開始日";
/// Due date
pub const LABEL_DUE_DATE: &str = "期日";
/// Estimated hours
pub const LABEL_ESTIMATED_HOURS: &str = "予定工数";
/// Total estimated hours
pub const LABEL_TOTAL_ESTIMATED_HOURS: &str = "合計予定工数";
/// Total spent hours
pub const LABEL_TOTAL_SPENT_HOURS: &str = "合計作業時間";
/// Progress percentage
pub const LABEL_DONE_RATIO: &str = "進捗率";
/// Priority name
pub const LABEL_PRIORITY: &str = "優先度";
/// Description
pub const LABEL_DESCRIPTION: &str = "説明";

/// Date format for start and due dates
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A partial issue write
///
/// Name-valued fields (`assignee`, `version`, `priority`) are resolved to
/// tracker ids by the accessor through its reference tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueData {
    /// Expected issue id; an update is refused when it differs from the target
    pub id_check: Option<String>,
    /// Parent issue id
    pub parent_id: Option<u64>,
    pub subject: Option<String>,
    /// Assignee full name ("lastname firstname")
    pub assignee: Option<String>,
    /// Target version name
    pub version: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub estimated_hours: Option<f64>,
    pub total_estimated_hours: Option<f64>,
    pub total_spent_hours: Option<f64>,
    /// Progress ratio, 0-100
    pub done_ratio: Option<u8>,
    /// Priority name
    pub priority: Option<String>,
    pub description: Option<String>,
}

impl IssueData {
    /// Build a request from a labeled mapping
    ///
    /// Missing labels and empty strings leave the field unset. Labels that
    /// are not recognized are ignored.
    pub fn from_labeled(map: &HashMap<String, String>) -> Result<Self> {
        let text = |label: &str| {
            map.get(label)
                .filter(|value| !value.is_empty())
                .cloned()
        };

        let done_ratio = parse_field::<u8>(map, LABEL_DONE_RATIO)?;
        if let Some(ratio) = done_ratio {
            if ratio > 100 {
                return Err(Error::InvalidField {
                    label: LABEL_DONE_RATIO.to_string(),
                    value: ratio.to_string(),
                });
            }
        }

        Ok(Self {
            id_check: text(LABEL_ID),
            parent_id: parse_field(map, LABEL_PARENT)?,
            subject: text(LABEL_SUBJECT),
            assignee: text(LABEL_ASSIGNEE),
            version: text(LABEL_VERSION),
            start_date: parse_date(map, LABEL_START_DATE)?,
            due_date: parse_date(map, LABEL_DUE_DATE)?,
            estimated_hours: parse_hours_field(map, LABEL_ESTIMATED_HOURS)?,
            total_estimated_hours: parse_hours_field(map, LABEL_TOTAL_ESTIMATED_HOURS)?,
            total_spent_hours: parse_hours_field(map, LABEL_TOTAL_SPENT_HOURS)?,
            done_ratio,
            priority: text(LABEL_PRIORITY),
            description: text(LABEL_DESCRIPTION),
        })
    }

    /// Build a request from a JSON object keyed by label
    ///
    /// String and number values are accepted; `null` counts as omitted.
    pub fn from_labeled_json(json: &str) -> Result<Self> {
        let object: HashMap<String, Value> = serde_json::from_str(json)?;

        let map = object
            .into_iter()
            .filter_map(|(label, value)| match value {
                Value::String(s) => Some((label, s)),
                Value::Number(n) => Some((label, n.to_string())),
                Value::Null => None,
                other => Some((label, other.to_string())),
            })
            .collect();

        Self::from_labeled(&map)
    }

    /// True when no field (including the id check) is supplied
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Parse an hours value
///
/// Only finite, non-negative numbers are hours. `f64::from_str` also accepts
/// `NaN` and `inf`, which would otherwise reach the tracker as `null`.
pub fn parse_hours(value: &str) -> std::result::Result<f64, String> {
    let hours: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("not a number: {value:?}"))?;
    if !hours.is_finite() || hours < 0.0 {
        return Err(format!("hours must be a finite, non-negative number: {value:?}"));
    }
    Ok(hours)
}

fn raw<'a>(map: &'a HashMap<String, String>, label: &str) -> Option<&'a str> {
    map.get(label)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn invalid(label: &str, value: &str) -> Error {
    Error::InvalidField {
        label: label.to_string(),
        value: value.to_string(),
    }
}

fn parse_field<T: FromStr>(map: &HashMap<String, String>, label: &str) -> Result<Option<T>> {
    raw(map, label)
        .map(|value| value.parse::<T>().map_err(|_| invalid(label, value)))
        .transpose()
}

fn parse_hours_field(map: &HashMap<String, String>, label: &str) -> Result<Option<f64>> {
    raw(map, label)
        .map(|value| parse_hours(value).map_err(|_| invalid(label, value)))
        .transpose()
}

fn parse_date(map: &HashMap<String, String>, label: &str) -> Result<Option<NaiveDate>> {
    raw(map, label)
        .map(|value| NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| invalid(label, value)))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn all_empty() -> HashMap<String, String> {
        labeled(&[
            (LABEL_ID, ""),
            (LABEL_PARENT, ""),
            (LABEL_SUBJECT, ""),
            (LABEL_ASSIGNEE, ""),
            (LABEL_VERSION, ""),
            (LABEL_START_DATE, ""),
            (LABEL_DUE_DATE, ""),
            (LABEL_ESTIMATED_HOURS, ""),
            (LABEL_TOTAL_ESTIMATED_HOURS, ""),
            (LABEL_TOTAL_SPENT_HOURS, ""),
            (LABEL_DONE_RATIO, ""),
            (LABEL_PRIORITY, ""),
            (LABEL_DESCRIPTION, ""),
        ])
    }

    #[test]
    fn test_empty_strings_are_omitted() {
        let data = IssueData::from_labeled(&all_empty()).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_missing_labels_are_omitted() {
        let data = IssueData::from_labeled(&HashMap::new()).unwrap();
        assert_eq!(data, IssueData::default());
    }

    #[test]
    fn test_parse_full_row() {
        let map = labeled(&[
            (LABEL_ID, "42"),
            (LABEL_PARENT, "7"),
            (LABEL_SUBJECT, "Fix bug"),
            (LABEL_ASSIGNEE, "Yamada Taro"),
            (LABEL_VERSION, "v1.0"),
            (LABEL_START_DATE, "2024-04-01"),
            (LABEL_DUE_DATE, "2024-04-30"),
            (LABEL_ESTIMATED_HOURS, "1.5"),
            (LABEL_TOTAL_ESTIMATED_HOURS, "3"),
            (LABEL_TOTAL_SPENT_HOURS, "2.25"),
            (LABEL_DONE_RATIO, "50"),
            (LABEL_PRIORITY, "High"),
            (LABEL_DESCRIPTION, "Details"),
        ]);

        let data = IssueData::from_labeled(&map).unwrap();
        assert_eq!(data.id_check.as_deref(), Some("42"));
        assert_eq!(data.parent_id, Some(7));
        assert_eq!(data.subject.as_deref(), Some("Fix bug"));
        assert_eq!(data.assignee.as_deref(), Some("Yamada Taro"));
        assert_eq!(data.version.as_deref(), Some("v1.0"));
        assert_eq!(data.start_date, NaiveDate::from_ymd_opt(2024, 4, 1));
        assert_eq!(data.due_date, NaiveDate::from_ymd_opt(2024, 4, 30));
        assert_eq!(data.estimated_hours, Some(1.5));
        assert_eq!(data.total_estimated_hours, Some(3.0));
        assert_eq!(data.total_spent_hours, Some(2.25));
        assert_eq!(data.done_ratio, Some(50));
        assert_eq!(data.priority.as_deref(), Some("High"));
        assert_eq!(data.description.as_deref(), Some("Details"));
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        let map = labeled(&[(LABEL_START_DATE, "2024/04/01")]);
        let err = IssueData::from_labeled(&map).unwrap_err();
        assert!(matches!(err, Error::InvalidField { ref label, .. } if label == LABEL_START_DATE));
    }

    #[test]
    fn test_done_ratio_over_100_is_rejected() {
        let map = labeled(&[(LABEL_DONE_RATIO, "150")]);
        assert!(IssueData::from_labeled(&map).is_err());
    }

    #[test]
    fn test_non_finite_hours_are_rejected() {
        for value in ["NaN", "nan", "inf", "-inf", "infinity"] {
            let map = labeled(&[(LABEL_ESTIMATED_HOURS, value)]);
            let err = IssueData::from_labeled(&map).unwrap_err();
            assert!(
                matches!(err, Error::InvalidField { ref label, .. } if label == LABEL_ESTIMATED_HOURS),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn test_negative_hours_are_rejected() {
        let map = labeled(&[(LABEL_TOTAL_SPENT_HOURS, "-1")]);
        let err = IssueData::from_labeled(&map).unwrap_err();
        assert!(matches!(err, Error::InvalidField { ref label, .. } if label == LABEL_TOTAL_SPENT_HOURS));

        let map = labeled(&[(LABEL_TOTAL_ESTIMATED_HOURS, "-0.5")]);
        assert!(IssueData::from_labeled(&map).is_err());
    }

    #[test]
    fn test_parse_hours() {
        assert_eq!(parse_hours("0"), Ok(0.0));
        assert_eq!(parse_hours(" 7.5 "), Ok(7.5));
        assert!(parse_hours("NaN").is_err());
        assert!(parse_hours("inf").is_err());
        assert!(parse_hours("-1").is_err());
        assert!(parse_hours("two").is_err());
    }

    #[test]
    fn test_unknown_labels_are_ignored() {
        let map = labeled(&[("トラッカー", "Bug"), (LABEL_SUBJECT, "Test")]);
        let data = IssueData::from_labeled(&map).unwrap();
        assert_eq!(data.subject.as_deref(), Some("Test"));
    }

    #[test]
    fn test_from_labeled_json() {
        let json = r##"{"題名": "Test", "進捗率": 30, "#": null, "説明": ""}"##;
        let data = IssueData::from_labeled_json(json).unwrap();
        assert_eq!(data.subject.as_deref(), Some("Test"));
        assert_eq!(data.done_ratio, Some(30));
        assert!(data.id_check.is_none());
        assert!(data.description.is_none());
    }
}

//! Domain records materialized from the realtime store and object storage.
//!
//! Identifiers are assigned by the backend and never serialized back; the
//! `createdAt`/`updatedAt` stamps are written by the client as ISO-8601 UTC
//! strings.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Default accent color for newsletters created without one.
pub const DEFAULT_NEWSLETTER_COLOR: &str = "#3F51B5";

/// Newsletters that always appear in the list, stored or not.
pub const BUILTIN_NEWSLETTERS: &[(&str, &str)] =
    &[("raiz_digital", "Raiz Digital"), ("em_rede", "Em Rede")];

/// Group name for employees without a department.
pub const NO_DEPARTMENT: &str = "Sem Departamento";

/// A record kept in a live collection.
pub trait Entity: DeserializeOwned + Clone + Send + Sync + 'static {
    fn id(&self) -> &str;

    /// Stores the backend key this record was found under.
    fn assign_id(&mut self, id: String);

    /// Display order of the collection. Defaults to backend order.
    fn compare(_a: &Self, _b: &Self) -> Ordering {
        Ordering::Equal
    }

    /// Adjusts a freshly materialized list before it is sorted.
    fn complete(_items: &mut Vec<Self>) {}
}

/// Current time as an ISO-8601 UTC string with millisecond precision.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Milliseconds since the epoch for an RFC 3339 timestamp or a plain
/// `YYYY-MM-DD` date. Unparseable input yields `None`.
pub(crate) fn instant_millis(value: Option<&str>) -> Option<i64> {
    let value = value?.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.timestamp_millis());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Newest first; records without a readable timestamp sink to the end.
fn newest_first(a: Option<&str>, b: Option<&str>) -> Ordering {
    instant_millis(b).cmp(&instant_millis(a))
}

fn caseless(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Accepts `"2024"` as well as `2024` for fields older clients wrote as
/// numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(default, skip_serializing)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub start_year: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Entity for Employee {
    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn compare(a: &Self, b: &Self) -> Ordering {
        caseless(&a.name, &b.name)
    }
}

impl Employee {
    /// Department used for grouping; blank departments share one group.
    pub fn department_or_default(&self) -> &str {
        self.department
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(NO_DEPARTMENT)
    }
}

/// A short message shown in the site footer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    #[serde(default, skip_serializing)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Entity for NewsItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn compare(a: &Self, b: &Self) -> Ordering {
        newest_first(a.created_at.as_deref(), b.created_at.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterIssue {
    #[serde(default, skip_serializing)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub cover_image_path: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Entity for NewsletterIssue {
    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn compare(a: &Self, b: &Self) -> Ordering {
        newest_first(Some(&a.published_at), Some(&b.published_at))
    }
}

fn default_color() -> String {
    DEFAULT_NEWSLETTER_COLOR.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Newsletter {
    #[serde(default, skip_serializing)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default, skip_serializing)]
    pub issues: BTreeMap<String, NewsletterIssue>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Newsletter {
    fn builtin(name: &str, display_name: &str) -> Self {
        Self {
            id: name.to_string(),
            name: name.to_string(),
            display_name: display_name.to_string(),
            color: default_color(),
            issues: BTreeMap::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Storage folder holding this newsletter's images.
    pub fn image_folder(&self) -> String {
        format!("newsletters/{}", self.name)
    }

    /// Issues ordered newest first by publication date.
    pub fn sorted_issues(&self) -> Vec<NewsletterIssue> {
        let mut issues: Vec<_> = self.issues.values().cloned().collect();
        issues.sort_by(NewsletterIssue::compare);
        issues
    }
}

impl Entity for Newsletter {
    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        for (key, issue) in &mut self.issues {
            issue.id.clone_from(key);
        }
        self.id = id;
    }

    fn compare(a: &Self, b: &Self) -> Ordering {
        caseless(&a.display_name, &b.display_name)
    }

    /// Fills in built-in newsletters that are missing, and names the ones
    /// that only exist in the store because issues were written under them.
    fn complete(items: &mut Vec<Self>) {
        for newsletter in items.iter_mut() {
            if newsletter.name.is_empty() {
                newsletter.name.clone_from(&newsletter.id);
            }
            if newsletter.display_name.is_empty() {
                newsletter.display_name = BUILTIN_NEWSLETTERS
                    .iter()
                    .find(|(name, _)| *name == newsletter.name)
                    .map_or_else(|| newsletter.name.clone(), |(_, d)| (*d).to_string());
            }
        }
        for (name, display_name) in BUILTIN_NEWSLETTERS {
            if !items.iter().any(|n| n.name == *name || n.id == *name) {
                items.push(Newsletter::builtin(name, display_name));
            }
        }
    }
}

/// An image in object storage. Derived from storage metadata only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageItem {
    pub id: String,
    pub name: String,
    pub url: String,
    pub path: String,
    pub size: u64,
    pub content_type: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl ImageItem {
    pub(crate) fn compare(a: &Self, b: &Self) -> Ordering {
        newest_first(a.updated_at.as_deref(), b.updated_at.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn employee_accepts_numeric_start_year_and_skips_id_on_write() {
        let mut employee: Employee =
            serde_json::from_value(json!({"name": "Ana", "startYear": 2021, "startDate": "2021-02-01"}))
                .unwrap();
        employee.assign_id("e1".into());
        assert_eq!(employee.start_year, "2021");

        let written = serde_json::to_value(&employee).unwrap();
        assert!(written.get("id").is_none());
        assert_eq!(written["startYear"], json!("2021"));
    }

    #[test]
    fn blank_department_groups_under_default() {
        let employee = Employee {
            department: Some("  ".into()),
            ..serde_json::from_value(json!({"name": "Rui"})).unwrap()
        };
        assert_eq!(employee.department_or_default(), NO_DEPARTMENT);
    }

    #[test]
    fn instants_accept_dates_and_timestamps() {
        assert!(instant_millis(Some("2024-07-01")) < instant_millis(Some("2024-07-01T00:00:01.000Z")));
        assert_eq!(instant_millis(Some("soon")), None);
        assert_eq!(newest_first(Some("2024-01-01"), None), Ordering::Less);
    }

    #[test]
    fn newsletter_completion_adds_builtins_and_names_orphans() {
        let mut orphan: Newsletter =
            serde_json::from_value(json!({"issues": {"i1": {"title": "Edição 1"}}})).unwrap();
        orphan.assign_id("em_rede".into());
        let mut items = vec![orphan];

        Newsletter::complete(&mut items);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "em_rede");
        assert_eq!(items[0].display_name, "Em Rede");
        assert_eq!(items[0].issues["i1"].id, "i1");
        assert_eq!(items[1].name, "raiz_digital");
        assert_eq!(items[1].color, DEFAULT_NEWSLETTER_COLOR);
    }

    #[test]
    fn builtin_is_not_duplicated_when_its_id_is_stored_under_another_name() {
        let mut legacy: Newsletter =
            serde_json::from_value(json!({"name": "boletim", "displayName": "Boletim"})).unwrap();
        legacy.assign_id("raiz_digital".into());
        let mut items = vec![legacy];

        Newsletter::complete(&mut items);

        let raiz: Vec<_> = items.iter().filter(|n| n.id == "raiz_digital").collect();
        assert_eq!(raiz.len(), 1);
        assert_eq!(raiz[0].name, "boletim");
        assert_eq!(items.len(), 2);
    }
}

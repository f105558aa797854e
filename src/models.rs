use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::dates::{date_only, date_only_opt, format_date, parse_date_only};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    EmptyName,
    InvalidCategory(String),
    InvalidTimeWindow(String),
    InvalidDate(String),
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::EmptyName => write!(f, "task name must not be empty"),
            TaskError::InvalidCategory(value) => write!(f, "unknown category: {value}"),
            TaskError::InvalidTimeWindow(value) => write!(f, "unknown time window: {value}"),
            TaskError::InvalidDate(value) => write!(f, "invalid date: {value}"),
        }
    }
}

impl std::error::Error for TaskError {}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Todo,
    Progress,
    Review,
    Completed,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Todo,
        Category::Progress,
        Category::Review,
        Category::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Todo => "todo",
            Category::Progress => "progress",
            Category::Review => "review",
            Category::Completed => "completed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Todo => "To Do",
            Category::Progress => "In Progress",
            Category::Review => "Review",
            Category::Completed => "Completed",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TaskError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "todo" => Ok(Category::Todo),
            "progress" => Ok(Category::Progress),
            "review" => Ok(Category::Review),
            "completed" => Ok(Category::Completed),
            _ => Err(TaskError::InvalidCategory(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TimeWindow {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "1week")]
    OneWeek,
    #[serde(rename = "2weeks")]
    TwoWeeks,
    #[serde(rename = "3weeks")]
    ThreeWeeks,
}

impl TimeWindow {
    /// Length of the window in days, `None` for [`TimeWindow::All`].
    pub fn days(self) -> Option<i64> {
        match self {
            TimeWindow::All => None,
            TimeWindow::OneWeek => Some(7),
            TimeWindow::TwoWeeks => Some(14),
            TimeWindow::ThreeWeeks => Some(21),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::All => "all",
            TimeWindow::OneWeek => "1week",
            TimeWindow::TwoWeeks => "2weeks",
            TimeWindow::ThreeWeeks => "3weeks",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = TaskError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "all" => Ok(TimeWindow::All),
            "1week" => Ok(TimeWindow::OneWeek),
            "2weeks" => Ok(TimeWindow::TwoWeeks),
            "3weeks" => Ok(TimeWindow::ThreeWeeks),
            _ => Err(TaskError::InvalidTimeWindow(value.to_string())),
        }
    }
}

/// A schedulable work item.
///
/// `date` is the canonical day. When the task spans several days both
/// `start_date` and `end_date` are set, distinct, and `date == start_date`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(with = "date_only")]
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "date_only_opt")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "date_only_opt")]
    pub end_date: Option<NaiveDate>,
}

impl Task {
    /// First day covered by the task.
    pub fn start(&self) -> NaiveDate {
        self.start_date.unwrap_or(self.date)
    }

    /// Last day covered by the task.
    pub fn end(&self) -> NaiveDate {
        self.end_date.or(self.start_date).unwrap_or(self.date)
    }

    pub fn is_range(&self) -> bool {
        self.start() != self.end()
    }

    pub fn duration_days(&self) -> i64 {
        (self.end() - self.start()).num_days()
    }

    pub fn covers(&self, day: NaiveDate) -> bool {
        self.start() <= day && day <= self.end()
    }
}

/// Keeps `date`, `start_date` and `end_date` in agreement.
///
/// Applied after every add, patch merge, and load. A lone bound is completed
/// from the other fields, equal bounds collapse into a single day, an inverted
/// range collapses onto its start, and `date` follows `start_date`.
pub fn normalize_range(task: &mut Task) {
    let (start, end) = match (task.start_date, task.end_date) {
        (None, None) => return,
        (Some(start), None) => (start, start),
        (None, Some(end)) => (task.date, end),
        (Some(start), Some(end)) => (start, end),
    };

    if start > end {
        log::warn!(
            "inverted range collapsed task_id={} start={} end={}",
            task.id,
            format_date(start),
            format_date(end)
        );
    }

    if start >= end {
        task.date = start;
        task.start_date = None;
        task.end_date = None;
        return;
    }

    task.date = start;
    task.start_date = Some(start);
    task.end_date = Some(end);
}

/// Payload for creating a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "date_only")]
    pub date: NaiveDate,
    #[serde(default, with = "date_only_opt")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "date_only_opt")]
    pub end_date: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn single(name: impl Into<String>, category: Category, date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            category,
            description: None,
            date,
            start_date: None,
            end_date: None,
        }
    }

    /// Pre-fills a draft from a resolved drag-to-select span: a single day when
    /// both ends match, a spanning range otherwise.
    pub fn from_range(name: impl Into<String>, category: Category, range: SelectedRange) -> Self {
        let mut draft = Self::single(name, category, range.start);
        if range.start != range.end {
            draft.start_date = Some(range.start);
            draft.end_date = Some(range.end);
        }
        draft
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = if description.trim().is_empty() {
            None
        } else {
            Some(description)
        };
        self
    }
}

/// Partial update merged into an existing task.
///
/// Range fields are tri-state: `None` leaves the field alone, `Some(None)`
/// clears it and `Some(Some(day))` sets it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub description: Option<Option<String>>,
    pub date: Option<NaiveDate>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    pub fn category(category: Category) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }

    /// Sets both bounds and the canonical day.
    pub fn range(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            date: Some(start),
            start_date: Some(Some(start)),
            end_date: Some(Some(end)),
            ..Self::default()
        }
    }

    /// Moves the task to a single day and drops any range.
    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            start_date: Some(None),
            end_date: Some(None),
            ..Self::default()
        }
    }

    /// Merges the patch into `task`, then restores the range invariants.
    pub fn apply(&self, task: &mut Task) {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                log::warn!("ignoring empty name in patch task_id={}", task.id);
            } else {
                task.name = name.clone();
            }
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(date) = self.date {
            task.date = date;
        }
        if let Some(start_date) = self.start_date {
            task.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            task.end_date = end_date;
        }
        normalize_range(task);
    }
}

/// In-progress or just-completed drag-to-select span; `start <= end`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedRange {
    #[serde(with = "date_only")]
    pub start: NaiveDate,
    #[serde(with = "date_only")]
    pub end: NaiveDate,
}

impl SelectedRange {
    /// Builds a span from two days in either order.
    pub fn between(a: NaiveDate, b: NaiveDate) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }
}

/// Current query criteria for the task views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilters {
    #[serde(default = "default_categories")]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub time_window: TimeWindow,
    #[serde(default)]
    pub search_query: String,
}

impl Default for TaskFilters {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            time_window: TimeWindow::All,
            search_query: String::new(),
        }
    }
}

/// Shallow update for [`TaskFilters`]; unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FiltersPatch {
    pub categories: Option<Vec<Category>>,
    pub time_window: Option<TimeWindow>,
    pub search_query: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    #[default]
    Auto,
    Sunday,
    Monday,
}

impl FromStr for WeekStart {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "auto" => Ok(WeekStart::Auto),
            "sunday" | "sun" => Ok(WeekStart::Sunday),
            "monday" | "mon" => Ok(WeekStart::Monday),
            _ => Err(format!("unknown week start: {value}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default)]
    pub week_start: WeekStart,
    #[serde(default)]
    pub default_time_window: TimeWindow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SettingsFile {
    pub schema_version: u32,
    pub settings: Settings,
}

fn default_categories() -> Vec<Category> {
    Category::ALL.to_vec()
}

pub fn parse_day(value: &str) -> Result<NaiveDate, TaskError> {
    parse_date_only(value).ok_or_else(|| TaskError::InvalidDate(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn make_task(date: NaiveDate) -> Task {
        Task {
            id: "t1".to_string(),
            name: "Write report".to_string(),
            category: Category::Todo,
            description: None,
            created_at: Utc::now(),
            date,
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn category_parses_case_insensitively_and_rejects_unknown() {
        assert_eq!("Todo".parse::<Category>().unwrap(), Category::Todo);
        assert_eq!(" review ".parse::<Category>().unwrap(), Category::Review);
        assert_eq!(
            "blocked".parse::<Category>(),
            Err(TaskError::InvalidCategory("blocked".into()))
        );
    }

    #[test]
    fn time_window_serializes_with_short_tags() {
        let value = serde_json::to_value(TimeWindow::TwoWeeks).unwrap();
        assert_eq!(value, serde_json::json!("2weeks"));
        let back: TimeWindow = serde_json::from_value(serde_json::json!("3weeks")).unwrap();
        assert_eq!(back, TimeWindow::ThreeWeeks);
        assert_eq!(TimeWindow::OneWeek.days(), Some(7));
        assert_eq!(TimeWindow::All.days(), None);
    }

    #[test]
    fn task_uses_camel_case_wire_layout_and_date_only_strings() {
        let mut task = make_task(d(2024, 6, 1));
        task.start_date = Some(d(2024, 6, 1));
        task.end_date = Some(d(2024, 6, 3));
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["date"], "2024-06-01");
        assert_eq!(value["startDate"], "2024-06-01");
        assert_eq!(value["endDate"], "2024-06-03");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("description").is_none());
    }

    #[test]
    fn task_accepts_legacy_full_timestamps() {
        let json = r#"
        {
          "id": "abc",
          "name": "Plan sprint",
          "category": "progress",
          "createdAt": "2024-05-30T09:12:00.000Z",
          "date": "2024-06-04T00:00:00.000Z",
          "startDate": "2024-06-04T00:00:00.000Z",
          "endDate": "2024-06-06T00:00:00.000Z"
        }
        "#;
        let task: Task = serde_json::from_str(json).expect("task should deserialize");
        assert_eq!(task.date, d(2024, 6, 4));
        assert_eq!(task.start(), d(2024, 6, 4));
        assert_eq!(task.end(), d(2024, 6, 6));
        assert_eq!(task.duration_days(), 2);
        assert!(task.description.is_none());
    }

    #[test]
    fn normalize_collapses_equal_bounds() {
        let mut task = make_task(d(2024, 6, 1));
        task.start_date = Some(d(2024, 6, 9));
        task.end_date = Some(d(2024, 6, 9));
        normalize_range(&mut task);
        assert_eq!(task.date, d(2024, 6, 9));
        assert_eq!(task.start_date, None);
        assert_eq!(task.end_date, None);
    }

    #[test]
    fn normalize_syncs_date_to_start() {
        let mut task = make_task(d(2024, 6, 1));
        task.start_date = Some(d(2024, 6, 2));
        task.end_date = Some(d(2024, 6, 5));
        normalize_range(&mut task);
        assert_eq!(task.date, d(2024, 6, 2));
        assert_eq!(task.start_date, Some(d(2024, 6, 2)));

        // Idempotent.
        let before = task.clone();
        normalize_range(&mut task);
        assert_eq!(task, before);
    }

    #[test]
    fn normalize_completes_lone_bounds() {
        let mut only_start = make_task(d(2024, 6, 1));
        only_start.start_date = Some(d(2024, 6, 4));
        normalize_range(&mut only_start);
        assert_eq!(only_start.date, d(2024, 6, 4));
        assert!(!only_start.is_range());
        assert_eq!(only_start.start_date, None);

        let mut only_end = make_task(d(2024, 6, 1));
        only_end.end_date = Some(d(2024, 6, 4));
        normalize_range(&mut only_end);
        assert_eq!(only_end.start_date, Some(d(2024, 6, 1)));
        assert_eq!(only_end.end_date, Some(d(2024, 6, 4)));
    }

    #[test]
    fn normalize_collapses_inverted_range_onto_start() {
        let mut task = make_task(d(2024, 6, 1));
        task.start_date = Some(d(2024, 6, 8));
        task.end_date = Some(d(2024, 6, 3));
        normalize_range(&mut task);
        assert_eq!(task.date, d(2024, 6, 8));
        assert_eq!(task.start_date, None);
        assert_eq!(task.end_date, None);
    }

    #[test]
    fn empty_patch_leaves_task_unchanged() {
        let mut task = make_task(d(2024, 6, 1));
        task.start_date = Some(d(2024, 6, 1));
        task.end_date = Some(d(2024, 6, 3));
        let before = task.clone();
        let patch = TaskPatch::default();
        assert!(patch.is_empty());
        patch.apply(&mut task);
        assert_eq!(task, before);
    }

    #[test]
    fn patch_can_clear_range_and_description() {
        let mut task = make_task(d(2024, 6, 1));
        task.description = Some("notes".into());
        task.start_date = Some(d(2024, 6, 1));
        task.end_date = Some(d(2024, 6, 3));

        TaskPatch::single_day(d(2024, 6, 10)).apply(&mut task);
        assert_eq!(task.date, d(2024, 6, 10));
        assert_eq!(task.start_date, None);
        assert_eq!(task.end_date, None);

        TaskPatch {
            description: Some(None),
            ..TaskPatch::default()
        }
        .apply(&mut task);
        assert_eq!(task.description, None);
    }

    #[test]
    fn patch_ignores_blank_name() {
        let mut task = make_task(d(2024, 6, 1));
        TaskPatch {
            name: Some("   ".into()),
            ..TaskPatch::default()
        }
        .apply(&mut task);
        assert_eq!(task.name, "Write report");
    }

    #[test]
    fn draft_from_range_prefills_single_day_or_span() {
        let single = TaskDraft::from_range(
            "a",
            Category::Todo,
            SelectedRange::between(d(2024, 6, 5), d(2024, 6, 5)),
        );
        assert_eq!(single.date, d(2024, 6, 5));
        assert_eq!(single.start_date, None);

        let span = TaskDraft::from_range(
            "b",
            Category::Review,
            SelectedRange::between(d(2024, 6, 5), d(2024, 6, 3)),
        );
        assert_eq!(span.date, d(2024, 6, 3));
        assert_eq!(span.start_date, Some(d(2024, 6, 3)));
        assert_eq!(span.end_date, Some(d(2024, 6, 5)));
    }

    #[test]
    fn filters_and_settings_fill_serde_defaults() {
        let filters: TaskFilters = serde_json::from_str("{}").unwrap();
        assert_eq!(filters, TaskFilters::default());
        assert_eq!(filters.categories.len(), 4);

        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.week_start, WeekStart::Auto);
        assert_eq!(settings.default_time_window, TimeWindow::All);
    }
}

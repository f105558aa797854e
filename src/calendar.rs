use chrono::{Datelike, Months, NaiveDate, Weekday};
use serde::Serialize;

use crate::dates::{add_days, date_only};
use crate::models::{Task, WeekStart};

/// Regions whose calendars conventionally start the week on Sunday.
const SUNDAY_FIRST_REGIONS: &[&str] = &[
    "US", "CA", "MX", "BR", "JP", "KR", "TW", "HK", "IL", "PH", "IN", "SA", "ZA",
];

/// Languages that default to Sunday-first when the locale has no region.
const SUNDAY_FIRST_LANGUAGES: &[&str] = &["en", "ja", "ko", "he"];

pub fn resolve_week_start(week_start: WeekStart) -> Weekday {
    match week_start {
        WeekStart::Sunday => Weekday::Sun,
        WeekStart::Monday => Weekday::Mon,
        WeekStart::Auto => detect_system_week_start(),
    }
}

fn detect_system_week_start() -> Weekday {
    let locale = sys_locale::get_locale().unwrap_or_default();
    week_start_for_locale(&locale)
}

/// Maps a BCP-47 or POSIX-style locale (`en-US`, `de_DE.UTF-8`, `ja`) to a first weekday.
///
/// Unknown or empty locales fall back to Sunday, matching the grid's historical layout.
pub fn week_start_for_locale(locale: &str) -> Weekday {
    let tag = locale
        .split(['.', '@'])
        .next()
        .unwrap_or_default()
        .replace('_', "-");
    if tag.trim().is_empty() {
        return Weekday::Sun;
    }
    let mut parts = tag.split('-');
    let language = parts.next().unwrap_or_default().to_lowercase();
    let region = parts
        .find(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_alphabetic()))
        .map(|part| part.to_uppercase());

    match region {
        Some(region) if SUNDAY_FIRST_REGIONS.contains(&region.as_str()) => Weekday::Sun,
        Some(_) => Weekday::Mon,
        None if SUNDAY_FIRST_LANGUAGES.contains(&language.as_str()) => Weekday::Sun,
        None => Weekday::Mon,
    }
}

pub fn start_of_week(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset =
        (date.weekday().num_days_from_monday() + 7 - week_start.num_days_from_monday()) % 7;
    add_days(date, -i64::from(offset))
}

pub fn end_of_week(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    add_days(start_of_week(date, week_start), 6)
}

/// One month of the calendar grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthView {
    first: NaiveDate,
    week_start: Weekday,
}

impl MonthView {
    pub fn new(year: i32, month: u32, week_start: Weekday) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        Some(Self { first, week_start })
    }

    /// The month that contains `date`.
    pub fn containing(date: NaiveDate, week_start: Weekday) -> Self {
        Self {
            first: date.with_day(1).unwrap_or(date),
            week_start,
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn last_day(&self) -> NaiveDate {
        self.first
            .checked_add_months(Months::new(1))
            .map(|next| add_days(next, -1))
            .unwrap_or(self.first)
    }

    pub fn week_start(&self) -> Weekday {
        self.week_start
    }

    pub fn previous(&self) -> Self {
        Self {
            first: self
                .first
                .checked_sub_months(Months::new(1))
                .unwrap_or(self.first),
            week_start: self.week_start,
        }
    }

    pub fn next(&self) -> Self {
        Self {
            first: self
                .first
                .checked_add_months(Months::new(1))
                .unwrap_or(self.first),
            week_start: self.week_start,
        }
    }

    /// Whether `date` belongs to this month rather than the leading/trailing filler.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.first.year() && date.month() == self.first.month()
    }

    /// Every day shown in the grid: whole weeks covering the month.
    pub fn days(&self) -> Vec<NaiveDate> {
        let start = start_of_week(self.first, self.week_start);
        let end = end_of_week(self.last_day(), self.week_start);
        start.iter_days().take_while(|day| *day <= end).collect()
    }

    pub fn title(&self) -> String {
        self.first.format("%B %Y").to_string()
    }

    /// Column headers in grid order, e.g. `Sun Mon ... Sat`.
    pub fn weekday_names(&self) -> Vec<String> {
        let start = start_of_week(self.first, self.week_start);
        (0..7)
            .map(|offset| add_days(start, offset).format("%a").to_string())
            .collect()
    }
}

/// Every task in `tasks` whose day span contains `day`.
pub fn tasks_on(day: NaiveDate, tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|task| task.covers(day)).collect()
}

/// Render-ready projection of one grid day.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayCell {
    #[serde(with = "date_only")]
    pub date: NaiveDate,
    pub in_current_month: bool,
    pub is_today: bool,
    pub in_selection: bool,
    pub tasks: Vec<Task>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::Utc;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn make_task(id: &str, date: NaiveDate, range: Option<(NaiveDate, NaiveDate)>) -> Task {
        Task {
            id: id.to_string(),
            name: format!("task-{id}"),
            category: Category::Todo,
            description: None,
            created_at: Utc::now(),
            date,
            start_date: range.map(|r| r.0),
            end_date: range.map(|r| r.1),
        }
    }

    #[test]
    fn june_2024_grid_spans_whole_weeks() {
        let view = MonthView::new(2024, 6, Weekday::Sun).unwrap();
        let days = view.days();
        // June 1st 2024 is a Saturday; June 30th a Sunday.
        assert_eq!(days.first(), Some(&d(2024, 5, 26)));
        assert_eq!(days.last(), Some(&d(2024, 7, 6)));
        assert_eq!(days.len() % 7, 0);
        assert_eq!(days.len(), 42);
        assert!(view.contains(d(2024, 6, 15)));
        assert!(!view.contains(d(2024, 5, 31)));
        assert_eq!(view.title(), "June 2024");
        assert_eq!(view.weekday_names()[0], "Sun");
    }

    #[test]
    fn monday_start_shifts_grid() {
        let view = MonthView::new(2024, 6, Weekday::Mon).unwrap();
        let days = view.days();
        assert_eq!(days.first(), Some(&d(2024, 5, 27)));
        assert_eq!(days.last(), Some(&d(2024, 6, 30)));
        assert_eq!(days.len(), 35);
        assert_eq!(view.weekday_names()[6], "Sun");
    }

    #[test]
    fn navigation_crosses_year_boundaries() {
        let jan = MonthView::new(2025, 1, Weekday::Sun).unwrap();
        assert_eq!(jan.previous().first_day(), d(2024, 12, 1));
        assert_eq!(jan.previous().next(), jan);
        assert_eq!(
            MonthView::new(2024, 2, Weekday::Sun).unwrap().last_day(),
            d(2024, 2, 29)
        );
        assert_eq!(
            MonthView::containing(d(2024, 3, 17), Weekday::Sun).first_day(),
            d(2024, 3, 1)
        );
    }

    #[test]
    fn week_start_follows_locale_region() {
        assert_eq!(week_start_for_locale("en-US"), Weekday::Sun);
        assert_eq!(week_start_for_locale("en_GB.UTF-8"), Weekday::Mon);
        assert_eq!(week_start_for_locale("de-DE"), Weekday::Mon);
        assert_eq!(week_start_for_locale("ja"), Weekday::Sun);
        assert_eq!(week_start_for_locale("zh-Hans-CN"), Weekday::Mon);
        assert_eq!(week_start_for_locale("fr"), Weekday::Mon);
        assert_eq!(week_start_for_locale(""), Weekday::Sun);
        assert_eq!(resolve_week_start(WeekStart::Monday), Weekday::Mon);
        assert_eq!(resolve_week_start(WeekStart::Sunday), Weekday::Sun);
    }

    #[test]
    fn tasks_on_includes_exactly_the_span() {
        let range = make_task("r", d(2024, 6, 3), Some((d(2024, 6, 3), d(2024, 6, 5))));
        let single = make_task("s", d(2024, 6, 4), None);
        let tasks = vec![range, single];

        let on = |day| -> Vec<String> {
            tasks_on(day, &tasks)
                .into_iter()
                .map(|t| t.id.clone())
                .collect()
        };
        assert!(on(d(2024, 6, 2)).is_empty());
        assert_eq!(on(d(2024, 6, 3)), vec!["r"]);
        assert_eq!(on(d(2024, 6, 4)), vec!["r", "s"]);
        assert_eq!(on(d(2024, 6, 5)), vec!["r"]);
        assert!(on(d(2024, 6, 6)).is_empty());
    }
}

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};

use crate::dates::add_days;
use crate::models::{Category, FiltersPatch, Task, TaskFilters, TimeWindow};

/// Holds the active [`TaskFilters`] and derives filtered views from them.
#[derive(Debug, Clone, Default)]
pub struct FilterEngine {
    filters: TaskFilters,
}

impl FilterEngine {
    pub fn new(filters: TaskFilters) -> Self {
        Self { filters }
    }

    pub fn filters(&self) -> &TaskFilters {
        &self.filters
    }

    /// Shallow merge; fields left unset in `patch` keep their value.
    pub fn update_filters(&mut self, patch: FiltersPatch) {
        if let Some(categories) = patch.categories {
            self.filters.categories = dedup_categories(categories);
        }
        if let Some(time_window) = patch.time_window {
            self.filters.time_window = time_window;
        }
        if let Some(search_query) = patch.search_query {
            self.filters.search_query = search_query;
        }
        log::debug!(
            "filters updated categories={:?} window={} search={:?}",
            self.filters.categories,
            self.filters.time_window,
            self.filters.search_query
        );
    }

    pub fn reset_filters(&mut self) {
        self.filters = TaskFilters::default();
    }

    pub fn toggle_category(&mut self, category: Category, enabled: bool) {
        let categories = &mut self.filters.categories;
        if enabled {
            if !categories.contains(&category) {
                categories.push(category);
            }
        } else {
            categories.retain(|c| *c != category);
        }
    }

    pub fn clear_search(&mut self) {
        self.filters.search_query.clear();
    }

    pub fn has_active_filters(&self) -> bool {
        !self.filters.search_query.trim().is_empty()
            || Category::ALL
                .iter()
                .any(|c| !self.filters.categories.contains(c))
            || self.filters.time_window != TimeWindow::All
    }

    /// Tasks passing every criterion, evaluated against the local calendar day.
    pub fn get_filtered(&self, tasks: &[Task]) -> Vec<Task> {
        self.get_filtered_at(tasks, Local::now().date_naive())
    }

    /// Tasks passing every criterion with `today` as the time-window anchor.
    ///
    /// An active window keeps only tasks starting in `[today, today + N]`;
    /// tasks that already started are excluded.
    pub fn get_filtered_at(&self, tasks: &[Task], today: NaiveDate) -> Vec<Task> {
        if tasks.is_empty() {
            return Vec::new();
        }
        let search = self.filters.search_query.trim().to_lowercase();
        let window = self
            .filters
            .time_window
            .days()
            .map(|days| (today, add_days(today, days)));

        tasks
            .iter()
            .filter(|task| self.filters.categories.contains(&task.category))
            .filter(|task| search.is_empty() || task.name.to_lowercase().contains(&search))
            .filter(|task| match window {
                Some((from, to)) => {
                    let start = task.start();
                    from <= start && start <= to
                }
                None => true,
            })
            .cloned()
            .collect()
    }
}

/// Number of tasks per category; every category is present, possibly at zero.
pub fn category_counts(tasks: &[Task]) -> BTreeMap<Category, usize> {
    let mut counts: BTreeMap<Category, usize> = Category::ALL.iter().map(|c| (*c, 0)).collect();
    for task in tasks {
        *counts.entry(task.category).or_insert(0) += 1;
    }
    counts
}

fn dedup_categories(categories: Vec<Category>) -> Vec<Category> {
    let mut out = Vec::with_capacity(categories.len());
    for category in categories {
        if !out.contains(&category) {
            out.push(category);
        }
    }
    out
}

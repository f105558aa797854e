use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};

use crate::calendar::{resolve_week_start, tasks_on, DayCell, MonthView};
use crate::filters::{category_counts, FilterEngine};
use crate::gesture::{DragOutcome, DragSession, DragSource};
use crate::models::{
    Category, FiltersPatch, SelectedRange, Settings, Task, TaskDraft, TaskError, TaskFilters,
};
use crate::repository::TaskRepository;
use crate::selection::RangeSelection;
use crate::storage::{load_settings, save_settings, KeyValueStore, StorageError};

/// Everything the presentation layer reads from and writes through.
///
/// Owns the repository, the filters, and the transient pointer state. Build one
/// per window (or per test) and pass it to whoever needs it.
pub struct BoardState<S> {
    repo: TaskRepository<S>,
    filters: FilterEngine,
    settings: Settings,
    drag: DragSession,
    selection: RangeSelection,
    pending_range: Option<SelectedRange>,
}

impl<S: KeyValueStore> BoardState<S> {
    pub fn new(repo: TaskRepository<S>, settings: Settings) -> Self {
        let filters = FilterEngine::new(TaskFilters {
            time_window: settings.default_time_window,
            ..TaskFilters::default()
        });
        Self {
            repo,
            filters,
            settings,
            drag: DragSession::new(),
            selection: RangeSelection::new(),
            pending_range: None,
        }
    }

    /// Loads settings and tasks from `store`.
    pub fn open(store: S) -> Self {
        let settings = load_settings(&store);
        Self::new(TaskRepository::open(store), settings)
    }

    pub fn repository(&self) -> &TaskRepository<S> {
        &self.repo
    }

    pub fn repository_mut(&mut self) -> &mut TaskRepository<S> {
        &mut self.repo
    }

    pub fn tasks(&self) -> &[Task] {
        self.repo.tasks()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn update_settings(&mut self, settings: Settings) -> Result<(), StorageError> {
        save_settings(self.repo.store(), &settings)?;
        self.settings = settings;
        Ok(())
    }

    pub fn filters(&self) -> &TaskFilters {
        self.filters.filters()
    }

    pub fn filter_engine(&self) -> &FilterEngine {
        &self.filters
    }

    pub fn filter_engine_mut(&mut self) -> &mut FilterEngine {
        &mut self.filters
    }

    pub fn update_filters(&mut self, patch: FiltersPatch) {
        self.filters.update_filters(patch);
    }

    pub fn reset_filters(&mut self) {
        self.filters.reset_filters();
    }

    pub fn filtered_tasks(&self) -> Vec<Task> {
        self.filtered_tasks_at(today())
    }

    pub fn filtered_tasks_at(&self, today: NaiveDate) -> Vec<Task> {
        self.filters.get_filtered_at(self.repo.tasks(), today)
    }

    pub fn tasks_by_date(&self, date: NaiveDate) -> Vec<Task> {
        self.tasks_by_date_at(date, today())
    }

    /// Filtered tasks covering `date`.
    pub fn tasks_by_date_at(&self, date: NaiveDate, today: NaiveDate) -> Vec<Task> {
        let filtered = self.filtered_tasks_at(today);
        tasks_on(date, &filtered).into_iter().cloned().collect()
    }

    pub fn category_counts_at(&self, today: NaiveDate) -> BTreeMap<Category, usize> {
        category_counts(&self.filtered_tasks_at(today))
    }

    pub fn month_view(&self, date: NaiveDate) -> MonthView {
        MonthView::containing(date, resolve_week_start(self.settings.week_start))
    }

    /// One cell per grid day with the filtered tasks that cover it.
    pub fn month_cells(&self, view: &MonthView, today: NaiveDate) -> Vec<DayCell> {
        let filtered = self.filtered_tasks_at(today);
        view.days()
            .into_iter()
            .map(|date| DayCell {
                date,
                in_current_month: view.contains(date),
                is_today: date == today,
                in_selection: self.selection.contains(date),
                tasks: tasks_on(date, &filtered).into_iter().cloned().collect(),
            })
            .collect()
    }

    pub fn add_task(&mut self, draft: TaskDraft) -> Result<Task, TaskError> {
        self.repo.add(draft)
    }

    pub fn drag_start(&mut self, source: DragSource) -> bool {
        self.drag.begin(source, self.repo.tasks())
    }

    pub fn active_task(&self) -> Option<&Task> {
        self.drag.active_task()
    }

    /// Finishes the current drag and applies the resulting mutation.
    ///
    /// Returns the task as stored when something changed.
    pub fn drag_end(&mut self, drop_target: Option<&str>) -> Option<Task> {
        match self.drag.finish(drop_target) {
            DragOutcome::Committed { task_id, patch } => self.repo.update(&task_id, &patch),
            DragOutcome::Unchanged | DragOutcome::Cancelled => None,
        }
    }

    pub fn select_pointer_down(&mut self, date: NaiveDate, on_task: bool) -> bool {
        self.selection.pointer_down(date, on_task)
    }

    pub fn select_pointer_enter(&mut self, date: NaiveDate) {
        self.selection.pointer_enter(date);
    }

    /// Resolves a drag-to-select; the span is kept as the pending range for the
    /// next task created through [`Self::create_from_selection`].
    pub fn select_pointer_up(&mut self) -> Option<SelectedRange> {
        let range = self.selection.pointer_up()?;
        self.pending_range = Some(range);
        Some(range)
    }

    pub fn selection(&self) -> &RangeSelection {
        &self.selection
    }

    pub fn pending_range(&self) -> Option<SelectedRange> {
        self.pending_range
    }

    /// Drops any in-progress or pending selection, as when the form is dismissed.
    pub fn dismiss_selection(&mut self) {
        self.selection.cancel();
        self.pending_range = None;
    }

    /// Creates a task over the pending range, or on `fallback_day` when nothing is pending.
    pub fn create_from_selection(
        &mut self,
        name: &str,
        category: Category,
        description: Option<&str>,
        fallback_day: NaiveDate,
    ) -> Result<Task, TaskError> {
        let range = self
            .pending_range
            .unwrap_or_else(|| SelectedRange::between(fallback_day, fallback_day));
        let mut draft = TaskDraft::from_range(name, category, range);
        if let Some(description) = description {
            draft = draft.with_description(description);
        }
        let task = self.repo.add(draft)?;
        self.pending_range = None;
        Ok(task)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::{DayCell, MonthView};
use crate::events::StatePayload;
use crate::filters::category_counts;
use crate::gesture::DragSource;
use crate::models::{
    Category, FiltersPatch, SelectedRange, Settings, Task, TaskDraft, TaskPatch,
};
use crate::state::BoardState;
use crate::storage::KeyValueStore;

#[derive(Debug, Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

/// Host hooks for the command layer: the current day and change notifications.
pub trait CommandCtx {
    fn today(&self) -> NaiveDate;
    fn emit_state_updated(&self, payload: StatePayload);
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthPayload {
    pub title: String,
    pub weekdays: Vec<String>,
    pub cells: Vec<DayCell>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: Category,
    pub label: &'static str,
    pub count: usize,
}

fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

fn state_payload<S: KeyValueStore>(ctx: &impl CommandCtx, state: &BoardState<S>) -> StatePayload {
    StatePayload {
        tasks: state.tasks().to_vec(),
        filtered: state.filtered_tasks_at(ctx.today()),
        filters: state.filters().clone(),
        settings: state.settings().clone(),
    }
}

fn notify<S: KeyValueStore>(ctx: &impl CommandCtx, state: &BoardState<S>) {
    ctx.emit_state_updated(state_payload(ctx, state));
}

pub fn load_state<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &BoardState<S>,
) -> CommandResult<StatePayload> {
    ok(state_payload(ctx, state))
}

pub fn create_task<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &mut BoardState<S>,
    draft: TaskDraft,
) -> CommandResult<Task> {
    match state.add_task(draft) {
        Ok(task) => {
            notify(ctx, state);
            ok(task)
        }
        Err(error) => err(&error.to_string()),
    }
}

pub fn update_task<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &mut BoardState<S>,
    task_id: &str,
    patch: TaskPatch,
) -> CommandResult<Task> {
    match state.repository_mut().update(task_id, &patch) {
        Some(task) => {
            notify(ctx, state);
            ok(task)
        }
        None => err("task not found"),
    }
}

pub fn set_task_category<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &mut BoardState<S>,
    task_id: &str,
    category: Category,
) -> CommandResult<Task> {
    update_task(ctx, state, task_id, TaskPatch::category(category))
}

pub fn delete_task<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &mut BoardState<S>,
    task_id: &str,
) -> CommandResult<bool> {
    let removed = state.repository_mut().delete(task_id);
    if removed {
        notify(ctx, state);
    }
    ok(removed)
}

pub fn clear_tasks<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &mut BoardState<S>,
) -> CommandResult<bool> {
    state.repository_mut().clear_all();
    notify(ctx, state);
    ok(true)
}

/// Replays a full drag: `source_id` is the encoded drag identifier and
/// `drop_target` the day cell it was released over.
///
/// Returns the stored task when the drop changed it, `None` otherwise.
pub fn drag_task<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &mut BoardState<S>,
    source_id: &str,
    drop_target: Option<&str>,
) -> CommandResult<Option<Task>> {
    if !state.drag_start(DragSource::parse(source_id)) {
        return err("task not found");
    }
    let updated = state.drag_end(drop_target);
    if updated.is_some() {
        notify(ctx, state);
    }
    ok(updated)
}

/// Replays a drag-to-select from `anchor` across `entered` cells and creates
/// a task over the resolved span.
pub fn select_and_create<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &mut BoardState<S>,
    anchor: NaiveDate,
    entered: &[NaiveDate],
    name: &str,
    category: Category,
    description: Option<&str>,
) -> CommandResult<Task> {
    state.select_pointer_down(anchor, false);
    for date in entered {
        state.select_pointer_enter(*date);
    }
    let range = state
        .select_pointer_up()
        .unwrap_or_else(|| SelectedRange::between(anchor, anchor));
    match state.create_from_selection(name, category, description, range.start) {
        Ok(task) => {
            notify(ctx, state);
            ok(task)
        }
        Err(error) => {
            state.dismiss_selection();
            err(&error.to_string())
        }
    }
}

pub fn list_tasks<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &mut BoardState<S>,
    filters: FiltersPatch,
) -> CommandResult<Vec<Task>> {
    state.update_filters(filters);
    ok(state.filtered_tasks_at(ctx.today()))
}

pub fn tasks_for_day<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &BoardState<S>,
    date: NaiveDate,
) -> CommandResult<Vec<Task>> {
    ok(state.tasks_by_date_at(date, ctx.today()))
}

pub fn category_summary<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &BoardState<S>,
) -> CommandResult<Vec<CategoryCount>> {
    let counts = category_counts(&state.filtered_tasks_at(ctx.today()));
    ok(counts
        .into_iter()
        .map(|(category, count)| CategoryCount {
            category,
            label: category.label(),
            count,
        })
        .collect())
}

pub fn month_grid<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &BoardState<S>,
    month: Option<(i32, u32)>,
) -> CommandResult<MonthPayload> {
    let today = ctx.today();
    let base = state.month_view(today);
    let view = match month {
        Some((year, month)) => match MonthView::new(year, month, base.week_start()) {
            Some(view) => view,
            None => return err(&format!("invalid month: {year}-{month:02}")),
        },
        None => base,
    };
    ok(MonthPayload {
        title: view.title(),
        weekdays: view.weekday_names(),
        cells: state.month_cells(&view, today),
    })
}

pub fn update_settings<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &mut BoardState<S>,
    settings: Settings,
) -> CommandResult<Settings> {
    if let Err(error) = state.update_settings(settings.clone()) {
        return err(&format!("storage error: {error}"));
    }
    notify(ctx, state);
    ok(settings)
}

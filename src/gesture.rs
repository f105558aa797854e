use std::fmt;
use std::mem;

use chrono::NaiveDate;

use crate::dates::{add_days, parse_date_only};
use crate::models::{Task, TaskPatch};

const MOVE_PREFIX: &str = "task:";
const RESIZE_START_PREFIX: &str = "resize-start:";
const RESIZE_END_PREFIX: &str = "resize-end:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragIntent {
    /// Shift the whole task, keeping its length.
    Move,
    ResizeStart,
    ResizeEnd,
    /// Untagged identifier from older drag sources; only `date` is rewritten.
    Legacy,
}

/// What is being dragged: the intent and the task it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSource {
    pub intent: DragIntent,
    pub task_id: String,
}

impl DragSource {
    pub fn new(intent: DragIntent, task_id: impl Into<String>) -> Self {
        Self {
            intent,
            task_id: task_id.into(),
        }
    }

    /// Decodes a drag-source identifier such as `resize-start:<id>`.
    ///
    /// Identifiers without a known prefix are kept whole as a legacy task id.
    pub fn parse(raw: &str) -> Self {
        let prefixes = [
            (MOVE_PREFIX, DragIntent::Move),
            (RESIZE_START_PREFIX, DragIntent::ResizeStart),
            (RESIZE_END_PREFIX, DragIntent::ResizeEnd),
        ];
        for (prefix, intent) in prefixes {
            if let Some(task_id) = raw.strip_prefix(prefix) {
                return Self::new(intent, task_id);
            }
        }
        Self::new(DragIntent::Legacy, raw)
    }
}

impl fmt::Display for DragSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.intent {
            DragIntent::Move => write!(f, "{MOVE_PREFIX}{}", self.task_id),
            DragIntent::ResizeStart => write!(f, "{RESIZE_START_PREFIX}{}", self.task_id),
            DragIntent::ResizeEnd => write!(f, "{RESIZE_END_PREFIX}{}", self.task_id),
            DragIntent::Legacy => f.write_str(&self.task_id),
        }
    }
}

/// Computes the date mutation for dropping `task` on `drop` with `intent`.
///
/// Returns `None` when the drop leaves the task where it is.
pub fn interpret(intent: DragIntent, task: &Task, drop: NaiveDate) -> Option<TaskPatch> {
    match intent {
        DragIntent::Move => {
            if drop == task.start() {
                return None;
            }
            let duration = task.duration_days();
            if duration > 0 {
                Some(TaskPatch::range(drop, add_days(drop, duration)))
            } else {
                Some(TaskPatch::single_day(drop))
            }
        }
        DragIntent::ResizeStart => {
            let end = task.end();
            if drop > end {
                return Some(TaskPatch::range(drop, drop));
            }
            if drop == task.start() {
                return None;
            }
            Some(TaskPatch {
                date: Some(drop),
                start_date: Some(Some(drop)),
                ..TaskPatch::default()
            })
        }
        DragIntent::ResizeEnd => {
            let start = task.start();
            if drop < start {
                return Some(TaskPatch::range(drop, drop));
            }
            if drop == task.end() {
                return None;
            }
            Some(TaskPatch {
                start_date: task.start_date.is_none().then_some(Some(start)),
                end_date: Some(Some(drop)),
                ..TaskPatch::default()
            })
        }
        DragIntent::Legacy => {
            // `date` is pinned to the start of a range task.
            if task.is_range() || task.date == drop {
                return None;
            }
            Some(TaskPatch {
                date: Some(drop),
                ..TaskPatch::default()
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    Committed { task_id: String, patch: TaskPatch },
    /// Dropped on a valid day without changing anything.
    Unchanged,
    /// No valid drop target, or nothing was being dragged.
    Cancelled,
}

#[derive(Debug, Clone, Default)]
enum DragState {
    #[default]
    Idle,
    Dragging { source: DragSource, task: Task },
}

/// One drag interaction: `idle -> dragging -> committed | cancelled -> idle`.
#[derive(Debug, Clone, Default)]
pub struct DragSession {
    state: DragState,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts dragging `source` if its task is among `tasks`.
    pub fn begin(&mut self, source: DragSource, tasks: &[Task]) -> bool {
        if self.is_dragging() {
            log::debug!("drag restarted before previous drag ended");
            self.cancel();
        }
        let Some(task) = tasks.iter().find(|task| task.id == source.task_id) else {
            log::debug!("drag ignored for unknown task_id={}", source.task_id);
            return false;
        };
        log::debug!("drag started source={source}");
        self.state = DragState::Dragging {
            task: task.clone(),
            source,
        };
        true
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// The task snapshot taken when the drag started.
    pub fn active_task(&self) -> Option<&Task> {
        match &self.state {
            DragState::Dragging { task, .. } => Some(task),
            DragState::Idle => None,
        }
    }

    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }

    /// Ends the drag over `drop_target`, the identifier of a day cell.
    pub fn finish(&mut self, drop_target: Option<&str>) -> DragOutcome {
        let DragState::Dragging { source, task } = mem::take(&mut self.state) else {
            return DragOutcome::Cancelled;
        };
        let Some(drop) = drop_target.and_then(parse_date_only) else {
            log::debug!("drag cancelled without drop target source={source}");
            return DragOutcome::Cancelled;
        };
        match interpret(source.intent, &task, drop) {
            Some(patch) => DragOutcome::Committed {
                task_id: source.task_id,
                patch,
            },
            None => DragOutcome::Unchanged,
        }
    }
}

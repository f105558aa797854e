use chrono::NaiveDate;

use crate::models::SelectedRange;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum SelectionState {
    #[default]
    Idle,
    Selecting {
        anchor: NaiveDate,
        span: SelectedRange,
    },
}

/// Drag-to-select across day cells.
///
/// `pointer_down` on an empty part of a day anchors the span, `pointer_enter`
/// stretches it in either direction, and `pointer_up` (captured anywhere, even
/// outside the grid) resolves the last known span and returns to idle.
#[derive(Debug, Clone, Default)]
pub struct RangeSelection {
    state: SelectionState,
}

impl RangeSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Presses on `date`. Presses that land on a task element do not start a selection.
    pub fn pointer_down(&mut self, date: NaiveDate, on_task: bool) -> bool {
        if on_task {
            return false;
        }
        self.state = SelectionState::Selecting {
            anchor: date,
            span: SelectedRange::between(date, date),
        };
        true
    }

    pub fn pointer_enter(&mut self, date: NaiveDate) {
        if let SelectionState::Selecting { anchor, span } = &mut self.state {
            *span = SelectedRange::between(*anchor, date);
        }
    }

    /// Releases the pointer; returns the resolved span if a selection was in progress.
    pub fn pointer_up(&mut self) -> Option<SelectedRange> {
        match std::mem::take(&mut self.state) {
            SelectionState::Selecting { span, .. } => {
                log::debug!("range selected start={} end={}", span.start, span.end);
                Some(span)
            }
            SelectionState::Idle => None,
        }
    }

    /// Abandons the selection, e.g. on focus loss or when the dialog is dismissed.
    pub fn cancel(&mut self) {
        self.state = SelectionState::Idle;
    }

    pub fn is_selecting(&self) -> bool {
        matches!(self.state, SelectionState::Selecting { .. })
    }

    pub fn current(&self) -> Option<SelectedRange> {
        match self.state {
            SelectionState::Selecting { span, .. } => Some(span),
            SelectionState::Idle => None,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.current().is_some_and(|span| span.contains(date))
    }
}

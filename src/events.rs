use serde::Serialize;

use crate::models::{Settings, Task, TaskFilters};

pub const EVENT_STATE_UPDATED: &str = "state_updated";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePayload {
    pub tasks: Vec<Task>,
    pub filtered: Vec<Task>,
    pub filters: TaskFilters,
    pub settings: Settings,
}

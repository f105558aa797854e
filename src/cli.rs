use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::commands::{self, CommandCtx, CommandResult, MonthPayload};
use crate::dates::format_date;
use crate::events::{StatePayload, EVENT_STATE_UPDATED};
use crate::gesture::{DragIntent, DragSource};
use crate::logging::init_logging;
use crate::models::{
    parse_day, Category, FiltersPatch, Settings, Task, TaskDraft, TimeWindow, WeekStart,
};
use crate::state::BoardState;
use crate::storage::FileStore;

const APP_DIR_NAME: &str = "calendar-board";

#[derive(Parser)]
#[command(name = "calendar-board", version, about = "Month-grid calendar task board")]
struct Cli {
    /// Directory holding tasks, settings and logs.
    #[arg(long, env = "CALBOARD_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Print the raw command result as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct FilterArgs {
    /// Only show these categories (repeatable).
    #[arg(long = "category", value_parser = parse_category)]
    categories: Vec<Category>,

    /// Case-insensitive name search.
    #[arg(long)]
    search: Option<String>,

    /// all, 1week, 2weeks or 3weeks.
    #[arg(long, value_parser = parse_window)]
    window: Option<TimeWindow>,
}

impl FilterArgs {
    fn into_patch(self) -> FiltersPatch {
        FiltersPatch {
            categories: (!self.categories.is_empty()).then_some(self.categories),
            time_window: self.window,
            search_query: self.search,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Create a task on one day or across a range.
    Add {
        name: String,
        #[arg(long, default_value = "todo", value_parser = parse_category)]
        category: Category,
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date_arg, requires = "end")]
        start: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date_arg, requires = "start")]
        end: Option<NaiveDate>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List tasks passing the filters.
    List(FilterArgs),
    /// Tasks covering one day.
    Day {
        #[arg(value_parser = parse_date_arg)]
        date: NaiveDate,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Render a month grid (YYYY-MM, defaults to the current month).
    Month {
        month: Option<String>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Task counts per category.
    Summary(FilterArgs),
    /// Move a task, keeping its length.
    Move {
        task_id: String,
        #[arg(value_parser = parse_date_arg)]
        date: NaiveDate,
    },
    /// Drag the first day of a task.
    ResizeStart {
        task_id: String,
        #[arg(value_parser = parse_date_arg)]
        date: NaiveDate,
    },
    /// Drag the last day of a task.
    ResizeEnd {
        task_id: String,
        #[arg(value_parser = parse_date_arg)]
        date: NaiveDate,
    },
    /// Select a span of days (in either order) and create a task over it.
    Select {
        #[arg(value_parser = parse_date_arg)]
        from: NaiveDate,
        #[arg(value_parser = parse_date_arg)]
        to: NaiveDate,
        name: String,
        #[arg(long, default_value = "todo", value_parser = parse_category)]
        category: Category,
        #[arg(long)]
        description: Option<String>,
    },
    /// Change a task's category.
    Status {
        task_id: String,
        #[arg(value_parser = parse_category)]
        category: Category,
    },
    Delete {
        task_id: String,
    },
    /// Remove every task and the stored task list.
    Clear,
    /// Show or change settings.
    Settings {
        /// auto, sunday or monday.
        #[arg(long)]
        week_start: Option<WeekStart>,
        /// Default time window for listings.
        #[arg(long, value_parser = parse_window)]
        window: Option<TimeWindow>,
    },
}

struct CliCtx;

impl CommandCtx for CliCtx {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn emit_state_updated(&self, payload: StatePayload) {
        log::debug!(
            "{EVENT_STATE_UPDATED} tasks={} filtered={}",
            payload.tasks.len(),
            payload.filtered.len()
        );
    }
}

fn parse_category(value: &str) -> Result<Category, String> {
    value.parse::<Category>().map_err(|e| e.to_string())
}

fn parse_window(value: &str) -> Result<TimeWindow, String> {
    value.parse::<TimeWindow>().map_err(|e| e.to_string())
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_day(value).map_err(|e| e.to_string())
}

fn parse_month(value: &str) -> Option<(i32, u32)> {
    let (year, month) = value.trim().split_once('-')?;
    Some((year.parse().ok()?, month.parse().ok()?))
}

fn resolve_data_dir(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| dirs::data_local_dir().map(|dir| dir.join(APP_DIR_NAME)))
}

/// Entry point for the `calendar-board` binary; returns the process exit code.
pub fn run() -> i32 {
    let cli = Cli::parse();
    let Some(data_dir) = resolve_data_dir(cli.data_dir) else {
        eprintln!("no data directory; pass --data-dir or set CALBOARD_DATA_DIR");
        return 2;
    };
    if let Err(error) = init_logging(&data_dir) {
        eprintln!("file logging disabled: {error}");
    }

    let mut state = BoardState::open(FileStore::new(data_dir));
    let ctx = CliCtx;
    let json = cli.json;

    match cli.command {
        Command::Add {
            name,
            category,
            date,
            start,
            end,
            description,
        } => {
            let day = start.or(date).unwrap_or_else(|| ctx.today());
            let mut draft = TaskDraft::single(name, category, day);
            draft.start_date = start;
            draft.end_date = end;
            if let Some(description) = description {
                draft = draft.with_description(description);
            }
            emit(commands::create_task(&ctx, &mut state, draft), json, |task| {
                format!("created {}", task_line(task))
            })
        }
        Command::List(filters) => emit(
            commands::list_tasks(&ctx, &mut state, filters.into_patch()),
            json,
            |tasks| task_lines(tasks),
        ),
        Command::Day { date, filters } => {
            state.update_filters(filters.into_patch());
            emit(commands::tasks_for_day(&ctx, &state, date), json, |tasks| {
                format!("{}\n{}", format_date(date), task_lines(tasks))
            })
        }
        Command::Month { month, filters } => {
            let month = match month.as_deref().map(parse_month) {
                Some(None) => {
                    let result: CommandResult<MonthPayload> = invalid("month must be YYYY-MM");
                    return emit(result, json, render_month);
                }
                Some(Some(month)) => Some(month),
                None => None,
            };
            state.update_filters(filters.into_patch());
            emit(commands::month_grid(&ctx, &state, month), json, render_month)
        }
        Command::Summary(filters) => {
            state.update_filters(filters.into_patch());
            emit(commands::category_summary(&ctx, &state), json, |counts| {
                counts
                    .iter()
                    .map(|c| format!("{:<12} {}", c.label, c.count))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Command::Move { task_id, date } => {
            drag(&ctx, &mut state, DragIntent::Move, task_id, date, json)
        }
        Command::ResizeStart { task_id, date } => {
            drag(&ctx, &mut state, DragIntent::ResizeStart, task_id, date, json)
        }
        Command::ResizeEnd { task_id, date } => {
            drag(&ctx, &mut state, DragIntent::ResizeEnd, task_id, date, json)
        }
        Command::Select {
            from,
            to,
            name,
            category,
            description,
        } => emit(
            commands::select_and_create(
                &ctx,
                &mut state,
                from,
                &[to],
                &name,
                category,
                description.as_deref(),
            ),
            json,
            |task| format!("created {}", task_line(task)),
        ),
        Command::Status { task_id, category } => emit(
            commands::set_task_category(&ctx, &mut state, &task_id, category),
            json,
            |task| format!("updated {}", task_line(task)),
        ),
        Command::Delete { task_id } => emit(
            commands::delete_task(&ctx, &mut state, &task_id),
            json,
            |removed| {
                if *removed {
                    format!("deleted {task_id}")
                } else {
                    format!("no task {task_id}")
                }
            },
        ),
        Command::Clear => emit(commands::clear_tasks(&ctx, &mut state), json, |_| {
            "cleared all tasks".to_string()
        }),
        Command::Settings { week_start, window } => {
            if week_start.is_none() && window.is_none() {
                let current = state.settings().clone();
                return emit(
                    CommandResult {
                        ok: true,
                        data: Some(current),
                        error: None,
                    },
                    json,
                    render_settings,
                );
            }
            let mut settings = state.settings().clone();
            if let Some(week_start) = week_start {
                settings.week_start = week_start;
            }
            if let Some(window) = window {
                settings.default_time_window = window;
            }
            emit(
                commands::update_settings(&ctx, &mut state, settings),
                json,
                render_settings,
            )
        }
    }
}

fn drag(
    ctx: &CliCtx,
    state: &mut BoardState<FileStore>,
    intent: DragIntent,
    task_id: String,
    date: NaiveDate,
    json: bool,
) -> i32 {
    let source = DragSource::new(intent, task_id);
    let target = format_date(date);
    emit(
        commands::drag_task(ctx, state, &source.to_string(), Some(&target)),
        json,
        |task| match task {
            Some(task) => format!("updated {}", task_line(task)),
            None => "unchanged".to_string(),
        },
    )
}

fn invalid<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

fn emit<T: Serialize>(
    result: CommandResult<T>,
    json: bool,
    render: impl FnOnce(&T) -> String,
) -> i32 {
    let code = if result.ok { 0 } else { 1 };
    if json {
        match serde_json::to_string_pretty(&result) {
            Ok(text) => println!("{text}"),
            Err(error) => {
                eprintln!("failed to encode result: {error}");
                return 1;
            }
        }
        return code;
    }
    match (&result.data, &result.error) {
        (Some(data), _) if result.ok => println!("{}", render(data)),
        (_, Some(error)) => eprintln!("error: {error}"),
        _ => {}
    }
    code
}

fn task_line(task: &Task) -> String {
    let span = if task.is_range() {
        format!("{}..{}", format_date(task.start()), format_date(task.end()))
    } else {
        format_date(task.date)
    };
    format!("{} [{}] {} ({span})", task.id, task.category, task.name)
}

fn task_lines(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "no tasks".to_string();
    }
    tasks.iter().map(task_line).collect::<Vec<_>>().join("\n")
}

fn render_month(month: &MonthPayload) -> String {
    let mut out = format!("{}\n", month.title);
    out.push_str(
        &month
            .weekdays
            .iter()
            .map(|name| format!("{name:>6}"))
            .collect::<String>(),
    );
    for week in month.cells.chunks(7) {
        out.push('\n');
        for cell in week {
            let day = cell.date.format("%d").to_string();
            let marker = if cell.is_today { '*' } else { ' ' };
            let label = if !cell.in_current_month {
                format!("({day})")
            } else if cell.tasks.is_empty() {
                day
            } else {
                format!("{day}:{}", cell.tasks.len())
            };
            out.push_str(&format!("{label:>5}{marker}"));
        }
    }
    out
}

fn render_settings(settings: &Settings) -> String {
    format!(
        "week_start={:?} default_time_window={}",
        settings.week_start, settings.default_time_window
    )
}

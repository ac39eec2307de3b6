// Filtering and search over the task list

use crate::error::TaskError;
use crate::task::{Priority, Task};
use chrono::{Local, NaiveDate};
use std::str::FromStr;

/// Named predicate applied to the task list for display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterMode {
    #[default]
    All,
    Active,
    Completed,
    DueToday,
    Overdue,
    HighPriority,
}

impl FilterMode {
    pub const ALL: [FilterMode; 6] = [
        FilterMode::All,
        FilterMode::Active,
        FilterMode::Completed,
        FilterMode::DueToday,
        FilterMode::Overdue,
        FilterMode::HighPriority,
    ];

    /// Whether a task satisfies this mode on the given day
    pub fn matches(self, task: &Task, today: NaiveDate) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::Active => !task.completed,
            FilterMode::Completed => task.completed,
            FilterMode::DueToday => task.is_due_today(today),
            FilterMode::Overdue => task.is_overdue(today),
            FilterMode::HighPriority => task.priority == Priority::High && !task.completed,
        }
    }
}

/// Case-insensitive title search. Blank text matches every task.
pub fn matches_search(task: &Task, search: &str) -> bool {
    let needle = search.trim();
    if needle.is_empty() {
        return true;
    }
    task.title.to_lowercase().contains(&needle.to_lowercase())
}

/// Return the tasks matching both `mode` and `search`, in their original order
pub fn filter_tasks<'a>(tasks: &'a [Task], mode: FilterMode, search: &str, today: NaiveDate) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| mode.matches(task, today) && matches_search(task, search))
        .collect()
}

/// [`filter_tasks`] against the local calendar date at call time
pub fn filter_tasks_today<'a>(tasks: &'a [Task], mode: FilterMode, search: &str) -> Vec<&'a Task> {
    filter_tasks(tasks, mode, search, Local::now().date_naive())
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterMode::All => write!(f, "all"),
            FilterMode::Active => write!(f, "active"),
            FilterMode::Completed => write!(f, "completed"),
            FilterMode::DueToday => write!(f, "due-today"),
            FilterMode::Overdue => write!(f, "overdue"),
            FilterMode::HighPriority => write!(f, "high-priority"),
        }
    }
}

impl FromStr for FilterMode {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| if c == ' ' || c == '_' { '-' } else { c.to_ascii_lowercase() })
            .collect();

        match normalized.as_str() {
            "all" => Ok(FilterMode::All),
            "active" => Ok(FilterMode::Active),
            "completed" | "done" => Ok(FilterMode::Completed),
            "due-today" | "today" => Ok(FilterMode::DueToday),
            "overdue" => Ok(FilterMode::Overdue),
            "high-priority" | "high" => Ok(FilterMode::HighPriority),
            _ => Err(TaskError::validation(format!("unknown filter mode '{}'", s.trim()))),
        }
    }
}

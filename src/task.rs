// Task record and its field types

use crate::error::{Result, TaskError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Date format accepted for due dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single to-do item
///
/// This is the exact on-disk shape. Older files with missing fields are
/// read through `persist`, which fills them in once and writes them back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Display status of a task relative to a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Done,
    Overdue,
    DueToday,
    Pending,
}

/// Field changes for an edit. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub priority: Option<Priority>,
    /// `Some(None)` clears the due date, `Some(Some(text))` sets it
    pub due_date: Option<Option<String>>,
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

impl Task {
    /// Build a new, not yet completed task after validating the input
    pub fn new(title: &str, priority: Priority, due_date: Option<&str>) -> Result<Self> {
        let title = validate_title(title)?;
        let due_date = match due_date {
            Some(text) => parse_due_date(text)?,
            None => None,
        };

        Ok(Self {
            id: new_id(),
            title,
            priority,
            due_date,
            completed: false,
            created_at: Utc::now(),
        })
    }

    /// Apply an edit. Nothing changes unless every field validates.
    pub fn apply(&mut self, patch: &TaskPatch) -> Result<()> {
        let title = patch.title.as_deref().map(validate_title).transpose()?;
        let due_date = match &patch.due_date {
            Some(Some(text)) => Some(parse_due_date(text)?),
            Some(None) => Some(None),
            None => None,
        };

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = due_date {
            self.due_date = due_date;
        }
        Ok(())
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due < today)
    }

    pub fn is_due_today(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date == Some(today)
    }

    pub fn status(&self, today: NaiveDate) -> TaskStatus {
        if self.completed {
            TaskStatus::Done
        } else if self.is_overdue(today) {
            TaskStatus::Overdue
        } else if self.is_due_today(today) {
            TaskStatus::DueToday
        } else {
            TaskStatus::Pending
        }
    }
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn due_date(mut self, due: impl Into<String>) -> Self {
        self.due_date = Some(Some(due.into()));
        self
    }

    pub fn clear_due_date(mut self) -> Self {
        self.due_date = Some(None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.priority.is_none() && self.due_date.is_none()
    }
}

/// Trim a title and reject it if nothing is left
pub fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskError::validation("title cannot be empty"));
    }
    Ok(trimmed.to_string())
}

/// Parse a `YYYY-MM-DD` due date. Blank input means no due date.
pub fn parse_due_date(text: &str) -> Result<Option<NaiveDate>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map(Some)
        .map_err(|e| TaskError::validation(format!("due date '{}' is not YYYY-MM-DD: {}", text, e)))
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Medium => write!(f, "Medium"),
            Priority::High => write!(f, "High"),
        }
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "l" => Ok(Priority::Low),
            "medium" | "med" | "m" => Ok(Priority::Medium),
            "high" | "h" => Ok(Priority::High),
            other => Err(TaskError::validation(format!(
                "unknown priority '{}' (use Low, Medium or High)",
                other
            ))),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Done => write!(f, "Done"),
            TaskStatus::Overdue => write!(f, "Overdue"),
            TaskStatus::DueToday => write!(f, "Due Today"),
            TaskStatus::Pending => write!(f, "Pending"),
        }
    }
}

// tasklist - Local to-do list with JSON persistence, filtering and CSV export

pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod persist;
pub mod store;
pub mod task;

// Re-export main types for convenience
pub use config::Config;
pub use error::{Result, TaskError};
pub use export::{export_csv, write_csv};
pub use filter::{FilterMode, filter_tasks, filter_tasks_today};
pub use store::{Summary, TaskStore};
pub use task::{Priority, Task, TaskPatch, TaskStatus};

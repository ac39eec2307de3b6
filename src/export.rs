// CSV export

use crate::error::{Result, TaskError};
use crate::persist;
use crate::task::Task;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Column order of every exported file
pub const CSV_HEADER: [&str; 6] = ["id", "title", "priority", "due_date", "completed", "created_at"];

/// Quote a field when it contains a separator, quote or line break
pub fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(task: &Task) -> String {
    let due = task.due_date.map(|d| d.to_string()).unwrap_or_default();
    let fields = [
        csv_escape(&task.id),
        csv_escape(&task.title),
        task.priority.to_string(),
        due,
        task.completed.to_string(),
        task.created_at.to_rfc3339(),
    ];
    fields.join(",")
}

/// Write the header row followed by one row per task
pub fn write_csv<'a, W, I>(writer: &mut W, tasks: I) -> std::io::Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a Task>,
{
    writeln!(writer, "{}", CSV_HEADER.join(","))?;

    let mut count = 0;
    for task in tasks {
        writeln!(writer, "{}", csv_row(task))?;
        count += 1;
    }
    Ok(count)
}

/// Export tasks to a CSV file, replacing it atomically
///
/// Returns the number of task rows written.
pub fn export_csv<'a, I>(path: &Path, tasks: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut count = 0;
    persist::write_atomic(path, |writer| {
        count = write_csv(writer, tasks)?;
        Ok(())
    })
    .map_err(|e| match e {
        TaskError::Io { source, .. } => TaskError::io(format!("Failed to export CSV to {}", path.display()), source),
        other => other,
    })?;

    info!(file = ?path, count, "Exported tasks to CSV");
    Ok(count)
}

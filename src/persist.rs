// JSON file operations

use crate::error::{Result, TaskError};
use crate::task::{Priority, Task, new_id};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Timestamp format written by older versions of the task file
const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Tasks read from disk
#[derive(Debug)]
pub struct LoadedTasks {
    pub tasks: Vec<Task>,
    /// How many tasks were missing an id or creation time and got one
    /// assigned. The caller must save before handing these ids out.
    pub filled: usize,
}

/// On-disk task as older files may have it: short field names, missing
/// id or creation time
#[derive(Deserialize)]
struct StoredTask {
    #[serde(default)]
    id: Option<String>,
    title: String,
    #[serde(default)]
    priority: Priority,
    #[serde(default, alias = "due")]
    due_date: Option<NaiveDate>,
    #[serde(default, alias = "done")]
    completed: bool,
    #[serde(default, alias = "created", deserialize_with = "deserialize_timestamp")]
    created_at: Option<DateTime<Utc>>,
}

impl StoredTask {
    /// Convert to a task. Returns true when a field had to be generated.
    fn into_task(self) -> (Task, bool) {
        let filled = self.id.is_none() || self.created_at.is_none();
        let task = Task {
            id: self.id.unwrap_or_else(new_id),
            title: self.title,
            priority: self.priority,
            due_date: self.due_date,
            completed: self.completed,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        };
        (task, filled)
    }
}

/// Parse an RFC 3339 timestamp, or the older `YYYY-MM-DD HH:MM:SS` local time
pub fn parse_timestamp(text: &str) -> std::result::Result<DateTime<Utc>, String> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(text, LEGACY_TIMESTAMP_FORMAT)
        .map_err(|e| format!("invalid timestamp '{}': {}", text, e))?;
    Ok(Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc()))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|text| parse_timestamp(&text).map_err(serde::de::Error::custom))
        .transpose()
}

/// Read the task array from a JSON file
///
/// A missing file is an empty list. Anything that does not parse as an
/// array of tasks, or breaks the id/title invariants, is corrupt state.
pub fn read_tasks(path: &Path) -> Result<LoadedTasks> {
    if !path.exists() {
        debug!(file = ?path, "Task file does not exist yet, starting empty");
        return Ok(LoadedTasks {
            tasks: Vec::new(),
            filled: 0,
        });
    }

    let file = File::open(path).map_err(|e| TaskError::io(format!("Failed to open {}", path.display()), e))?;
    let reader = BufReader::new(file);

    let stored: Vec<StoredTask> = serde_json::from_reader(reader).map_err(|e| {
        warn!(file = ?path, error = %e, "Failed to parse task file");
        TaskError::corrupt(path, e)
    })?;

    let mut filled = 0;
    let tasks: Vec<Task> = stored
        .into_iter()
        .map(|raw| {
            let (task, was_filled) = raw.into_task();
            filled += usize::from(was_filled);
            task
        })
        .collect();

    check_invariants(path, &tasks)?;

    info!(file = ?path, count = tasks.len(), filled, "Loaded tasks");
    Ok(LoadedTasks { tasks, filled })
}

fn check_invariants(path: &Path, tasks: &[Task]) -> Result<()> {
    let mut seen = HashSet::new();
    for (index, task) in tasks.iter().enumerate() {
        if task.title.trim().is_empty() {
            return Err(TaskError::corrupt(path, format!("task #{} has an empty title", index + 1)));
        }
        if !seen.insert(task.id.as_str()) {
            return Err(TaskError::corrupt(path, format!("duplicate task id {}", task.id)));
        }
    }
    Ok(())
}

/// Serialize tasks as pretty JSON and atomically replace the file
pub fn write_tasks(path: &Path, tasks: &[Task]) -> Result<()> {
    write_atomic(path, |writer| {
        serde_json::to_writer_pretty(&mut *writer, tasks).map_err(std::io::Error::other)?;
        writeln!(writer)
    })?;

    debug!(file = ?path, count = tasks.len(), "Saved tasks");
    Ok(())
}

/// Write through a temp file in the target's directory, then rename over it
///
/// The temp file is flushed and synced before the rename. On any failure it
/// is removed and the original file is left untouched.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let tmp_path = temp_path(path);

    let result = (|| {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        write(&mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = result {
        if tmp_path.exists() {
            let _ = fs::remove_file(&tmp_path);
        }
        return Err(TaskError::io(format!("Failed to write {}", path.display()), e));
    }

    Ok(())
}

/// `.<name>.<uuid>.tmp` next to the target, so it never collides with a
/// user's file or another writer
fn temp_path(path: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(format!(".{}.tmp", uuid::Uuid::now_v7().simple()));
    path.with_file_name(name)
}

// Task store: in-memory ordered list with auto-save to a JSON file

use crate::error::{Result, TaskError};
use crate::persist;
use crate::task::{Priority, Task, TaskPatch};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default file name for persisted tasks
pub const DEFAULT_FILE_NAME: &str = "tasks.json";

/// Count shown in the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub remaining: usize,
    pub total: usize,
}

/// Ordered task collection backed by a JSON file
///
/// Every mutating call writes the whole collection back to disk before
/// returning. If the write fails the in-memory change is rolled back so
/// memory and disk never disagree.
pub struct TaskStore {
    path: PathBuf,
    tasks: Vec<Task>,
}

impl TaskStore {
    /// Open the store at `path`, creating its parent directory if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| TaskError::io(format!("Failed to create directory {}", parent.display()), e))?;
        }

        let mut store = Self {
            path,
            tasks: Vec::new(),
        };
        store.load()?;
        Ok(store)
    }

    /// Like [`TaskStore::open`], but a corrupt file is moved aside to
    /// `<file>.corrupt-<timestamp>` and the store starts empty
    pub fn open_or_reset<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::open(path.as_ref()) {
            Err(TaskError::CorruptState { path: bad, reason }) => {
                let backup = corrupt_backup_path(&bad, Local::now());
                warn!(file = ?bad, backup = ?backup, %reason, "Task file is corrupt, moving it aside");
                fs::rename(&bad, &backup)
                    .map_err(|e| TaskError::io(format!("Failed to move corrupt file to {}", backup.display()), e))?;
                Self::open(path)
            }
            other => other,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Replace the in-memory list with the file's contents
    ///
    /// Ids or creation times missing from an older file are assigned here
    /// and written straight back, so they stay the same on the next load.
    pub fn load(&mut self) -> Result<()> {
        let loaded = persist::read_tasks(&self.path)?;
        self.tasks = loaded.tasks;

        if loaded.filled > 0 {
            info!(file = ?self.path, filled = loaded.filled, "Assigned missing task fields, saving");
            self.save()?;
        }
        Ok(())
    }

    /// Atomically write the current list to the file
    pub fn save(&self) -> Result<()> {
        persist::write_tasks(&self.path, &self.tasks)
    }

    // ========================================================================
    // Mutations (all auto-save)
    // ========================================================================

    /// Create and append a new task
    pub fn add(&mut self, title: &str, priority: Priority, due_date: Option<&str>) -> Result<Task> {
        let task = Task::new(title, priority, due_date)?;
        self.tasks.push(task.clone());

        if let Err(e) = self.save() {
            self.tasks.pop();
            return Err(e);
        }

        info!(id = %task.id, title = %task.title, "Added task");
        Ok(task)
    }

    /// Apply a patch to the task with `id`
    pub fn edit(&mut self, id: &str, patch: &TaskPatch) -> Result<Task> {
        let index = self.index_of(id)?;
        let before = self.tasks[index].clone();

        self.tasks[index].apply(patch)?;
        if let Err(e) = self.save() {
            self.tasks[index] = before;
            return Err(e);
        }

        debug!(id, "Edited task");
        Ok(self.tasks[index].clone())
    }

    /// Remove the task with `id` and return it
    pub fn delete(&mut self, id: &str) -> Result<Task> {
        let index = self.index_of(id)?;
        let removed = self.tasks.remove(index);

        if let Err(e) = self.save() {
            self.tasks.insert(index, removed);
            return Err(e);
        }

        info!(id, title = %removed.title, "Deleted task");
        Ok(removed)
    }

    /// Flip the completed flag of the task with `id`
    pub fn toggle(&mut self, id: &str) -> Result<Task> {
        let index = self.index_of(id)?;
        self.tasks[index].completed = !self.tasks[index].completed;

        if let Err(e) = self.save() {
            self.tasks[index].completed = !self.tasks[index].completed;
            return Err(e);
        }

        debug!(id, completed = self.tasks[index].completed, "Toggled task");
        Ok(self.tasks[index].clone())
    }

    /// Remove every completed task. Returns how many were removed.
    pub fn clear_completed(&mut self) -> Result<usize> {
        let original = self.tasks.clone();
        self.tasks.retain(|t| !t.completed);

        let removed = original.len() - self.tasks.len();
        if removed == 0 {
            return Ok(0);
        }

        if let Err(e) = self.save() {
            self.tasks = original;
            return Err(e);
        }

        info!(removed, "Cleared completed tasks");
        Ok(removed)
    }

    // ========================================================================
    // Lookup helpers
    // ========================================================================

    /// Resolve a full id or a unique id prefix to the full id
    pub fn resolve(&self, prefix: &str) -> Result<String> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(TaskError::validation("task id cannot be empty"));
        }

        if let Some(task) = self.get(prefix) {
            return Ok(task.id.clone());
        }

        let mut matches = self.tasks.iter().filter(|t| t.id.starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(task), None) => Ok(task.id.clone()),
            (None, _) => Err(TaskError::NotFound(prefix.to_string())),
            (Some(_), Some(_)) => Err(TaskError::validation(format!(
                "task id prefix '{}' is ambiguous",
                prefix
            ))),
        }
    }

    pub fn summary(&self) -> Summary {
        Summary {
            remaining: self.tasks.iter().filter(|t| !t.completed).count(),
            total: self.tasks.len(),
        }
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }
}

/// First free `<file>.corrupt-<timestamp>[-N]` next to `path`
fn corrupt_backup_path(path: &Path, now: DateTime<Local>) -> PathBuf {
    let mut base = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    base.push(format!(".corrupt-{}", now.format("%Y%m%d-%H%M%S")));

    let mut candidate = path.with_file_name(&base);
    let mut n = 1;
    while candidate.exists() {
        let mut name = base.clone();
        name.push(format!("-{}", n));
        candidate = path.with_file_name(name);
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, TaskStore) {
        let temp = TempDir::new().unwrap();
        let store = TaskStore::open(temp.path().join(DEFAULT_FILE_NAME)).unwrap();
        (temp, store)
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("dir").join(DEFAULT_FILE_NAME);

        let store = TaskStore::open(&path).unwrap();
        assert!(store.is_empty());
        assert!(temp.path().join("nested/dir").is_dir());
        // Nothing is written until the first mutation
        assert!(!path.exists());
    }

    #[test]
    fn test_add_then_load_round_trips() {
        let (temp, mut store) = open_temp();
        let task = store.add("Buy milk", Priority::Low, Some("2025-01-01")).unwrap();
        assert!(!task.completed);

        let reopened = TaskStore::open(temp.path().join(DEFAULT_FILE_NAME)).unwrap();
        assert_eq!(reopened.tasks(), &[task]);
    }

    #[test]
    fn test_add_rejects_invalid_input_without_saving() {
        let (temp, mut store) = open_temp();

        assert!(matches!(
            store.add("", Priority::Medium, None),
            Err(TaskError::Validation(_))
        ));
        assert!(matches!(
            store.add("x", Priority::Medium, Some("2025-99-01")),
            Err(TaskError::Validation(_))
        ));
        assert!(store.is_empty());
        assert!(!temp.path().join(DEFAULT_FILE_NAME).exists());
    }

    #[test]
    fn test_add_preserves_order() {
        let (_temp, mut store) = open_temp();
        for title in ["one", "two", "three"] {
            store.add(title, Priority::Medium, None).unwrap();
        }
        let titles: Vec<&str> = store.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_edit() {
        let (temp, mut store) = open_temp();
        let task = store.add("Draft", Priority::Low, None).unwrap();

        let patch = TaskPatch::new().title("Final").priority(Priority::High).due_date("2025-12-24");
        let edited = store.edit(&task.id, &patch).unwrap();
        assert_eq!(edited.id, task.id);
        assert_eq!(edited.title, "Final");
        assert_eq!(edited.priority, Priority::High);
        assert_eq!(edited.created_at, task.created_at);

        let reopened = TaskStore::open(temp.path().join(DEFAULT_FILE_NAME)).unwrap();
        assert_eq!(reopened.get(&task.id), Some(&edited));
    }

    #[test]
    fn test_edit_invalid_leaves_task_unchanged() {
        let (_temp, mut store) = open_temp();
        let task = store.add("Keep", Priority::Low, None).unwrap();

        let patch = TaskPatch::new().title("   ");
        assert!(matches!(store.edit(&task.id, &patch), Err(TaskError::Validation(_))));
        assert_eq!(store.get(&task.id), Some(&task));
    }

    #[test]
    fn test_missing_id_is_not_found() {
        let (_temp, mut store) = open_temp();

        assert!(matches!(
            store.edit("nope", &TaskPatch::new().title("x")),
            Err(TaskError::NotFound(_))
        ));
        assert!(matches!(store.delete("nope"), Err(TaskError::NotFound(_))));
        assert!(matches!(store.toggle("nope"), Err(TaskError::NotFound(_))));
    }

    #[test]
    fn test_toggle_twice_restores_state() {
        let (_temp, mut store) = open_temp();
        let task = store.add("Flip", Priority::Medium, None).unwrap();

        assert!(store.toggle(&task.id).unwrap().completed);
        assert!(!store.toggle(&task.id).unwrap().completed);
        assert_eq!(store.get(&task.id), Some(&task));
    }

    #[test]
    fn test_delete_then_load() {
        let (temp, mut store) = open_temp();
        let milk = store.add("Buy milk", Priority::Low, Some("2025-01-01")).unwrap();
        let bread = store.add("Buy bread", Priority::Low, None).unwrap();

        let removed = store.delete(&milk.id).unwrap();
        assert_eq!(removed, milk);

        let reopened = TaskStore::open(temp.path().join(DEFAULT_FILE_NAME)).unwrap();
        assert!(reopened.get(&milk.id).is_none());
        assert_eq!(reopened.tasks(), &[bread]);
    }

    #[test]
    fn test_clear_completed() {
        let (temp, mut store) = open_temp();
        let a = store.add("a", Priority::Medium, None).unwrap();
        let b = store.add("b", Priority::Medium, None).unwrap();
        let c = store.add("c", Priority::Medium, None).unwrap();
        store.toggle(&a.id).unwrap();
        store.toggle(&c.id).unwrap();

        assert_eq!(store.clear_completed().unwrap(), 2);
        assert_eq!(store.clear_completed().unwrap(), 0);

        let reopened = TaskStore::open(temp.path().join(DEFAULT_FILE_NAME)).unwrap();
        assert_eq!(reopened.tasks(), &[b]);
    }

    #[test]
    fn test_summary() {
        let (_temp, mut store) = open_temp();
        let a = store.add("a", Priority::Medium, None).unwrap();
        store.add("b", Priority::Medium, None).unwrap();
        store.toggle(&a.id).unwrap();

        assert_eq!(store.summary(), Summary { remaining: 1, total: 2 });
    }

    #[test]
    fn test_resolve_prefix() {
        let (_temp, mut store) = open_temp();
        let task = store.add("only", Priority::Medium, None).unwrap();

        assert_eq!(store.resolve(&task.id).unwrap(), task.id);
        assert_eq!(store.resolve(&task.id[..8]).unwrap(), task.id);
        assert!(matches!(store.resolve("zzzz"), Err(TaskError::NotFound(_))));
        assert!(matches!(store.resolve(" "), Err(TaskError::Validation(_))));
    }

    #[test]
    fn test_resolve_ambiguous_prefix() {
        let (_temp, mut store) = open_temp();
        for id in ["abc1", "abc2"] {
            let mut task = Task::new(id, Priority::Medium, None).unwrap();
            task.id = id.to_string();
            store.tasks.push(task);
        }

        assert!(matches!(store.resolve("abc"), Err(TaskError::Validation(_))));
        assert_eq!(store.resolve("abc2").unwrap(), "abc2");
    }

    #[test]
    fn test_failed_save_rolls_back() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("data");
        let mut store = TaskStore::open(dir.join(DEFAULT_FILE_NAME)).unwrap();
        let task = store.add("Stay", Priority::Medium, None).unwrap();

        fs::remove_dir_all(&dir).unwrap();

        assert!(matches!(store.toggle(&task.id), Err(TaskError::Io { .. })));
        assert!(matches!(store.delete(&task.id), Err(TaskError::Io { .. })));
        assert!(matches!(
            store.add("New", Priority::Low, None),
            Err(TaskError::Io { .. })
        ));
        assert_eq!(store.tasks(), &[task]);
    }

    #[test]
    fn test_load_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_FILE_NAME);
        fs::write(&path, "not json").unwrap();

        assert!(matches!(TaskStore::open(&path), Err(TaskError::CorruptState { .. })));
    }

    /// Contents of every `tasks.json.corrupt-*` backup in `dir`, by name
    fn corrupt_backups(dir: &Path) -> Vec<String> {
        let mut backups: Vec<(String, String)> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap())
            .filter(|e| e.file_name().to_string_lossy().starts_with("tasks.json.corrupt-"))
            .map(|e| (e.file_name().to_string_lossy().into_owned(), fs::read_to_string(e.path()).unwrap()))
            .collect();
        backups.sort();
        backups.into_iter().map(|(_, content)| content).collect()
    }

    #[test]
    fn test_open_or_reset_moves_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_FILE_NAME);
        fs::write(&path, "not json").unwrap();

        let store = TaskStore::open_or_reset(&path).unwrap();
        assert!(store.is_empty());
        assert!(!path.exists());
        assert_eq!(corrupt_backups(temp.path()), vec!["not json"]);
    }

    #[test]
    fn test_open_or_reset_keeps_earlier_backups() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_FILE_NAME);

        fs::write(&path, "first damage").unwrap();
        TaskStore::open_or_reset(&path).unwrap();
        fs::write(&path, "second damage").unwrap();
        TaskStore::open_or_reset(&path).unwrap();

        let mut backups = corrupt_backups(temp.path());
        backups.sort();
        assert_eq!(backups, vec!["first damage", "second damage"]);
    }

    #[test]
    fn test_corrupt_backup_path_skips_existing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_FILE_NAME);
        let now = Local::now();

        let first = corrupt_backup_path(&path, now);
        fs::write(&first, "x").unwrap();
        let second = corrupt_backup_path(&path, now);

        assert_ne!(first, second);
        assert!(second.to_string_lossy().ends_with("-1"));
    }

    #[test]
    fn test_legacy_file_keeps_ids_across_opens() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_FILE_NAME);
        fs::write(
            &path,
            r#"[{"title":"Legacy","done":false,"priority":"High","due":"2025-01-01","created":"2024-01-01 10:00:00"}]"#,
        )
        .unwrap();

        let first = TaskStore::open(&path).unwrap();
        let mut second = TaskStore::open(&path).unwrap();

        assert_eq!(first.tasks(), second.tasks());
        let original = first.tasks()[0].clone();
        assert_eq!(original.title, "Legacy");
        assert_eq!(
            original.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
            "2024-01-01 10:00:00"
        );

        let toggled = second.toggle(&original.id).unwrap();
        assert!(toggled.completed);
        assert_eq!(toggled.created_at, original.created_at);

        // The file now holds the full field names
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"id\""));
        assert!(content.contains("\"created_at\""));
    }

    #[test]
    fn test_reload_picks_up_external_changes() {
        let (temp, mut store) = open_temp();
        store.add("mine", Priority::Medium, None).unwrap();

        let mut other = TaskStore::open(temp.path().join(DEFAULT_FILE_NAME)).unwrap();
        other.add("theirs", Priority::High, None).unwrap();

        store.load().unwrap();
        assert_eq!(store.len(), 2);
    }
}

use chrono::Local;
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use eyre::{Context, Result, eyre};
use std::path::PathBuf;
use std::process;
use tasklist::{Config, FilterMode, Priority, Task, TaskError, TaskPatch, TaskStatus, TaskStore, filter_tasks};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "tasklist - A local to-do list with priorities, due dates and CSV export")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to the task file (overrides the config file)
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Path to the config file (default: <config_dir>/tasklist/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Move a corrupt task file aside and start with an empty list
    #[arg(long, global = true)]
    reset_corrupt: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task title
        title: String,

        /// Priority: low, medium or high
        #[arg(short, long)]
        priority: Option<Priority>,

        /// Due date (YYYY-MM-DD)
        #[arg(short, long)]
        due: Option<String>,
    },

    /// Edit an existing task
    Edit {
        /// Task id or unique id prefix
        id: String,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        /// New priority
        #[arg(short, long)]
        priority: Option<Priority>,

        /// New due date (YYYY-MM-DD)
        #[arg(short, long, conflicts_with = "no_due")]
        due: Option<String>,

        /// Remove the due date
        #[arg(long)]
        no_due: bool,
    },

    /// Mark a task done, or undone if it already is
    Toggle {
        /// Task id or unique id prefix
        id: String,
    },

    /// Delete a task
    #[command(alias = "delete")]
    Rm {
        /// Task id or unique id prefix
        id: String,
    },

    /// List tasks
    #[command(alias = "ls")]
    List {
        /// Filter: all, active, completed, due-today, overdue, high-priority
        #[arg(short, long, default_value = "all")]
        filter: FilterMode,

        /// Case-insensitive text to search for in titles
        #[arg(short, long, default_value = "")]
        search: String,
    },

    /// Delete all completed tasks
    ClearCompleted,

    /// Export the listed tasks to a CSV file
    Export {
        /// Destination CSV file
        path: PathBuf,

        /// Filter: all, active, completed, due-today, overdue, high-priority
        #[arg(short, long, default_value = "all")]
        filter: FilterMode,

        /// Case-insensitive text to search for in titles
        #[arg(short, long, default_value = "")]
        search: String,
    },

    /// Show how many tasks remain
    Summary,
}

fn main() {
    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(report) = start(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), report);
        if let Some(hint) = hint_for(&report) {
            eprintln!("{}", hint.yellow());
        }
        process::exit(1);
    }
}

fn start(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let data_file = config.data_file(cli.file.as_deref())?;

    // Open store
    let store = if cli.reset_corrupt {
        TaskStore::open_or_reset(&data_file)
    } else {
        TaskStore::open(&data_file)
    };
    let mut store = store.with_context(|| format!("Failed to open task file {}", data_file.display()))?;

    run(&mut store, &config, cli.command)
}

/// Follow-up advice for errors the user can act on
fn hint_for(report: &eyre::Report) -> Option<&'static str> {
    let err = report.downcast_ref::<TaskError>()?;
    if err.is_user_error() {
        Some("Run `tasklist list` to see task ids. Due dates use YYYY-MM-DD, priorities are low, medium or high.")
    } else if matches!(err, TaskError::CorruptState { .. }) {
        Some("Run again with --reset-corrupt to move the damaged file aside and start with an empty list.")
    } else {
        None
    }
}

fn run(store: &mut TaskStore, config: &Config, command: Commands) -> Result<()> {
    let today = Local::now().date_naive();

    match command {
        Commands::Add { title, priority, due } => {
            let priority = priority.unwrap_or(config.default_priority);
            let task = store.add(&title, priority, due.as_deref())?;
            println!("Added {}", describe(&task));
        }
        Commands::Edit {
            id,
            title,
            priority,
            due,
            no_due,
        } => {
            let id = store.resolve(&id)?;
            let mut patch = TaskPatch {
                title,
                priority,
                due_date: due.map(Some),
            };
            if no_due {
                patch = patch.clear_due_date();
            }
            if patch.is_empty() {
                return Err(eyre!("Nothing to change; pass --title, --priority, --due or --no-due"));
            }
            let task = store.edit(&id, &patch)?;
            println!("Updated {}", describe(&task));
        }
        Commands::Toggle { id } => {
            let id = store.resolve(&id)?;
            let task = store.toggle(&id)?;
            let state = if task.completed { "done" } else { "not done" };
            println!("Marked {} as {}", describe(&task), state);
        }
        Commands::Rm { id } => {
            let id = store.resolve(&id)?;
            let task = store.delete(&id)?;
            println!("Deleted {}", describe(&task));
        }
        Commands::List { filter, search } => {
            let visible = filter_tasks(store.tasks(), filter, &search, today);
            if visible.is_empty() {
                println!("{}", "No tasks".dimmed());
            }
            for task in &visible {
                print_row(task, today);
            }
            print_summary(store);
        }
        Commands::ClearCompleted => {
            let removed = store.clear_completed()?;
            println!("Removed {} completed task(s)", removed);
        }
        Commands::Export { path, filter, search } => {
            let visible = filter_tasks(store.tasks(), filter, &search, today);
            if visible.is_empty() {
                println!("{}", "Nothing to export; writing header only".dimmed());
            }
            let count = tasklist::export_csv(&path, visible)
                .with_context(|| format!("Failed to export to {}", path.display()))?;
            println!("Exported {} task(s) to {}", count, path.display());
        }
        Commands::Summary => print_summary(store),
    }

    Ok(())
}

fn describe(task: &Task) -> String {
    format!("[{}] {}", task.id, task.title)
}

fn print_row(task: &Task, today: chrono::NaiveDate) {
    let due = task.due_date.map(|d| d.to_string()).unwrap_or_default();
    let title = if task.completed {
        task.title.dimmed().strikethrough()
    } else {
        task.title.normal()
    };
    println!(
        "{}  {:<10}  {:<8}  {:<10}  {}",
        task.id.dimmed(),
        status_label(task.status(today)),
        priority_label(task.priority),
        due,
        title
    );
}

fn priority_label(priority: Priority) -> ColoredString {
    let text = priority.to_string();
    match priority {
        Priority::High => text.red().bold(),
        Priority::Medium => text.yellow(),
        Priority::Low => text.normal(),
    }
}

fn status_label(status: TaskStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        TaskStatus::Done => text.green(),
        TaskStatus::Overdue => text.red(),
        TaskStatus::DueToday => text.yellow(),
        TaskStatus::Pending => text.normal(),
    }
}

fn print_summary(store: &TaskStore) {
    let summary = store.summary();
    println!(
        "{}",
        format!("{} task(s) remaining, {} total", summary.remaining, summary.total).dimmed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_for_user_errors() {
        let report = eyre::Report::new(TaskError::NotFound("abc".to_string()));
        assert!(hint_for(&report).unwrap().contains("tasklist list"));

        let report: eyre::Report = Err::<(), _>(TaskError::Validation("bad date".to_string()))
            .context("Failed to add task")
            .unwrap_err();
        assert!(hint_for(&report).is_some());
    }

    #[test]
    fn test_hint_for_corrupt_file() {
        let err = TaskError::CorruptState {
            path: PathBuf::from("tasks.json"),
            reason: "bad json".to_string(),
        };
        let report: eyre::Report = Err::<(), _>(err).context("Failed to open task file").unwrap_err();
        assert!(hint_for(&report).unwrap().contains("--reset-corrupt"));
    }

    #[test]
    fn test_no_hint_for_other_errors() {
        let io = TaskError::Io {
            context: "Failed to write".to_string(),
            source: std::io::Error::other("disk full"),
        };
        assert!(hint_for(&eyre::Report::new(io)).is_none());
        assert!(hint_for(&eyre!("Config file not found")).is_none());
    }
}

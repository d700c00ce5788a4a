//! smartpm - Smart Project Manager
//!
//! Command line front end for the project, task and label tracker.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use smartpm::manager::{
    LabelUpdate, NewLabel, NewProject, NewSubtask, NewTask, ProjectUpdate, SubtaskUpdate,
    TaskUpdate,
};
use smartpm::models::{parse_due_date, today, Priority, Subtask, Task};
use smartpm::{AppConfig, ImportStrategy, ProjectManager, SmartPmError};

#[derive(Parser)]
#[command(name = "smartpm")]
#[command(version = "0.1.0")]
#[command(about = "Track projects, tasks, subtasks and labels in one JSON file", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Data directory holding config.toml (defaults to ~/.smart_project_manager)
    #[arg(long, global = true, env = "SMARTPM_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Data file to use instead of the configured one
    #[arg(long, global = true, env = "SMARTPM_DATA_FILE")]
    data_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage projects
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Manage tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Manage subtasks
    Subtask {
        #[command(subcommand)]
        action: SubtaskAction,
    },

    /// Manage labels
    Label {
        #[command(subcommand)]
        action: LabelAction,
    },

    /// Show counts and completion rates
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export all data to a JSON file
    Export {
        /// Destination file
        path: PathBuf,
    },

    /// Import data from an exported or backup file
    Import {
        /// File to import
        path: PathBuf,

        /// merge adds everything under new ids, replace discards current data
        #[arg(short, long, default_value = "merge")]
        strategy: ImportStrategy,
    },

    /// Manage backups of the data file
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// Create a project
    Add {
        name: String,

        #[arg(id = "project_version", long = "project-version", value_name = "VERSION")]
        version: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        github_url: Option<String>,
    },

    /// List projects with their progress
    List {
        #[arg(long)]
        json: bool,
    },

    /// Show a project with its tasks
    Show {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Change project fields (pass "" to clear a text field)
    Edit {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(id = "project_version", long = "project-version", value_name = "VERSION")]
        version: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        github_url: Option<String>,
    },

    /// Delete a project with all its tasks and subtasks
    Delete { id: String },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Create a task in a project
    Add {
        project_id: String,
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        /// high, medium or low (or 1, 2, 3)
        #[arg(short, long, default_value = "medium")]
        priority: Priority,

        /// Due date, YYYY-MM-DD
        #[arg(long, value_parser = parse_due_date)]
        due: Option<NaiveDate>,

        /// Label id (repeatable)
        #[arg(short, long = "label", value_name = "LABEL_ID")]
        labels: Vec<String>,
    },

    /// List the tasks of a project
    List {
        project_id: String,

        #[arg(long)]
        json: bool,
    },

    /// Show a task with its subtasks
    Show {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Change task fields
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        priority: Option<Priority>,

        #[arg(long, value_parser = parse_due_date, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,

        /// Remove the due date
        #[arg(long)]
        clear_due: bool,

        /// Replace the labels (repeatable)
        #[arg(short, long = "label", value_name = "LABEL_ID")]
        labels: Vec<String>,

        /// Remove all labels
        #[arg(long, conflicts_with = "labels")]
        clear_labels: bool,
    },

    /// Mark a task and its subtasks complete
    Done { id: String },

    /// Mark a task and its subtasks open
    Undo { id: String },

    /// Delete a task and its subtasks
    Delete { id: String },
}

#[derive(Subcommand)]
enum SubtaskAction {
    /// Create a subtask under a task
    Add {
        task_id: String,
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long, default_value = "medium")]
        priority: Priority,

        #[arg(long, value_parser = parse_due_date)]
        due: Option<NaiveDate>,

        #[arg(short, long = "label", value_name = "LABEL_ID")]
        labels: Vec<String>,
    },

    /// Change subtask fields
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        priority: Option<Priority>,

        #[arg(long, value_parser = parse_due_date, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,

        #[arg(long)]
        clear_due: bool,

        #[arg(short, long = "label", value_name = "LABEL_ID")]
        labels: Vec<String>,

        #[arg(long, conflicts_with = "labels")]
        clear_labels: bool,
    },

    /// Mark a subtask complete
    Done { id: String },

    /// Mark a subtask open
    Undo { id: String },

    /// Delete a subtask
    Delete { id: String },
}

#[derive(Subcommand)]
enum LabelAction {
    /// Create a label
    Add {
        name: String,

        /// Background color, #RRGGBB
        #[arg(short, long)]
        color: Option<String>,

        /// Text color, #RRGGBB
        #[arg(long)]
        text_color: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// List labels
    List {
        #[arg(long)]
        json: bool,
    },

    /// Change label fields
    Edit {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(short, long)]
        color: Option<String>,

        #[arg(long)]
        text_color: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete a label and remove it from every task and subtask
    Delete { id: String },
}

#[derive(Subcommand)]
enum BackupAction {
    /// Copy the data file into the backups directory
    Create,

    /// List the most recent backups
    List {
        #[arg(long)]
        json: bool,
    },

    /// Delete backups older than the retention period
    Cleanup {
        /// Days to keep (defaults to backup.retention_days)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Delete every backup
    Clear,
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "smartpm=debug,info"
    } else {
        "smartpm=info,warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        let code = e
            .downcast_ref::<SmartPmError>()
            .map_or(1, SmartPmError::exit_code);
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let data_dir = cli.data_dir.unwrap_or_else(AppConfig::default_data_dir);
    let config = AppConfig::load(&data_dir)?;
    let data_file = config.data_file_path(&data_dir, cli.data_file.as_deref());
    let mut manager = ProjectManager::open(&data_file, config)?;

    match cli.command {
        Commands::Project { action } => run_project(&mut manager, action)?,
        Commands::Task { action } => run_task(&mut manager, action)?,
        Commands::Subtask { action } => run_subtask(&mut manager, action)?,
        Commands::Label { action } => run_label(&mut manager, action)?,

        Commands::Stats { json } => {
            let stats = manager.get_statistics();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("\n{} {}", "Statistics:".cyan().bold(), manager.data_file().display());
                println!("{}", "─".repeat(60));
                println!("   Projects: {}", stats.projects);
                println!(
                    "   Tasks:    {} ({} completed, {:.1}%)",
                    stats.tasks, stats.completed_tasks, stats.task_completion_rate
                );
                println!(
                    "   Subtasks: {} ({} completed, {:.1}%)",
                    stats.subtasks, stats.completed_subtasks, stats.subtask_completion_rate
                );
                println!("   Labels:   {}", stats.labels);
                if stats.overdue_tasks > 0 {
                    println!(
                        "   {}",
                        format!("Overdue:  {}", stats.overdue_tasks).red()
                    );
                }
            }
        }

        Commands::Export { path } => {
            let report = manager.export_data(&path)?;
            println!(
                "{} Exported to {} ({} bytes)",
                "✓".green(),
                report.path.display(),
                report.size_bytes
            );
        }

        Commands::Import { path, strategy } => {
            let report = manager.import_data(&path, strategy)?;
            println!(
                "{} Imported ({}): {}",
                "✓".green(),
                report.strategy,
                report.imported
            );
            if report.skipped.total() > 0 {
                println!(
                    "   {} skipped without a parent: {}",
                    "Warning:".yellow().bold(),
                    report.skipped
                );
            }
        }

        Commands::Backup { action } => run_backup(&manager, action)?,
    }

    Ok(())
}

// ============================================================================
// Projects
// ============================================================================

fn run_project(manager: &mut ProjectManager, action: ProjectAction) -> anyhow::Result<()> {
    match action {
        ProjectAction::Add {
            name,
            version,
            description,
            github_url,
        } => {
            let project = manager.create_project(NewProject {
                name,
                version,
                description,
                github_url,
            })?;
            println!(
                "{} Created project {} ({})",
                "✓".green(),
                project.name.bold(),
                project.id
            );
        }

        ProjectAction::List { json } => {
            let projects = manager.get_all_projects();
            if json {
                println!("{}", serde_json::to_string_pretty(&projects)?);
                return Ok(());
            }

            println!("\n{} ({} total)", "Projects:".cyan().bold(), projects.len());
            println!("{}", "─".repeat(60));
            if projects.is_empty() {
                println!("   No projects yet");
            }
            for project in projects {
                let progress = manager.get_project_progress(&project.id);
                println!(
                    "   {} {} v{} [{:.0}%] {}",
                    project.id.dimmed(),
                    project.name.bold(),
                    project.version,
                    progress,
                    smartpm::ProjectStatus::from_progress(progress)
                );
            }
        }

        ProjectAction::Show { id, json } => {
            let summary = manager
                .get_project_summary(&id)
                .ok_or_else(|| SmartPmError::not_found("Project", &id))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            let project = manager
                .get_project(&id)
                .ok_or_else(|| SmartPmError::not_found("Project", &id))?;
            println!("\n{} {}", "Project:".cyan().bold(), project.name.bold());
            println!("{}", "─".repeat(60));
            println!("   ID: {}", project.id);
            println!("   Version: {}", project.version);
            if let Some(description) = &project.description {
                println!("   Description: {description}");
            }
            if let Some(url) = &project.github_url {
                println!("   GitHub: {url}");
            }
            println!("   Created: {}", project.created_at.format("%Y-%m-%d %H:%M"));
            println!("   Updated: {}", project.updated_at.format("%Y-%m-%d %H:%M"));
            println!(
                "   Progress: {:.1}% ({})",
                summary.progress, summary.status
            );
            println!(
                "   Tasks: {}/{} done, subtasks: {}/{} done",
                summary.completed_tasks,
                summary.total_tasks,
                summary.completed_subtasks,
                summary.total_subtasks
            );
            println!();
            for task in manager.get_tasks_by_project(&id) {
                print_task_line(manager, task);
            }
        }

        ProjectAction::Edit {
            id,
            name,
            version,
            description,
            github_url,
        } => {
            let project = manager.update_project(
                &id,
                ProjectUpdate {
                    name,
                    version,
                    description: description.map(Some),
                    github_url: github_url.map(Some),
                },
            )?;
            println!("{} Updated project {}", "✓".green(), project.name.bold());
        }

        ProjectAction::Delete { id } => {
            if !manager.delete_project(&id)? {
                return Err(SmartPmError::not_found("Project", &id).into());
            }
            println!("{} Deleted project {}", "✓".green(), id);
        }
    }
    Ok(())
}

// ============================================================================
// Tasks and subtasks
// ============================================================================

fn due_update(due: Option<NaiveDate>, clear_due: bool) -> Option<Option<NaiveDate>> {
    if clear_due {
        Some(None)
    } else {
        due.map(Some)
    }
}

fn labels_update(labels: Vec<String>, clear_labels: bool) -> Option<Vec<String>> {
    if clear_labels {
        Some(Vec::new())
    } else if labels.is_empty() {
        None
    } else {
        Some(labels)
    }
}

fn label_names(manager: &ProjectManager, ids: &[String]) -> String {
    ids.iter()
        .map(|id| manager.get_label(id).map_or(id.as_str(), |l| l.name.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn priority_colored(priority: Priority) -> colored::ColoredString {
    match priority {
        Priority::High => priority.name().red(),
        Priority::Medium => priority.name().yellow(),
        Priority::Low => priority.name().green(),
    }
}

fn checkbox(completed: bool) -> colored::ColoredString {
    if completed {
        "[x]".green()
    } else {
        "[ ]".normal()
    }
}

fn print_task_line(manager: &ProjectManager, task: &Task) {
    let mut line = format!(
        "   {} {} {} ({}, {:.0}%)",
        checkbox(task.completed),
        task.id.dimmed(),
        task.title,
        priority_colored(task.priority),
        manager.get_task_progress(&task.id)
    );
    if let Some(due) = task.due_date {
        let due = format!(" due {due}");
        if task.is_overdue(today()) {
            line.push_str(&due.red().to_string());
        } else {
            line.push_str(&due);
        }
    }
    if !task.labels.is_empty() {
        line.push_str(&format!(" [{}]", label_names(manager, &task.labels)));
    }
    println!("{line}");
}

fn print_subtask_line(manager: &ProjectManager, subtask: &Subtask) {
    let mut line = format!(
        "      {} {} {} ({})",
        checkbox(subtask.completed),
        subtask.id.dimmed(),
        subtask.title,
        priority_colored(subtask.priority)
    );
    if let Some(due) = subtask.due_date {
        let due = format!(" due {due}");
        if subtask.is_overdue(today()) {
            line.push_str(&due.red().to_string());
        } else {
            line.push_str(&due);
        }
    }
    if !subtask.labels.is_empty() {
        line.push_str(&format!(" [{}]", label_names(manager, &subtask.labels)));
    }
    println!("{line}");
}

fn run_task(manager: &mut ProjectManager, action: TaskAction) -> anyhow::Result<()> {
    match action {
        TaskAction::Add {
            project_id,
            title,
            description,
            priority,
            due,
            labels,
        } => {
            let task = manager.create_task(NewTask {
                project_id,
                title,
                description,
                priority,
                due_date: due,
                completed: false,
                labels,
            })?;
            println!("{} Created task {} ({})", "✓".green(), task.title.bold(), task.id);
        }

        TaskAction::List { project_id, json } => {
            if manager.get_project(&project_id).is_none() {
                return Err(SmartPmError::not_found("Project", &project_id).into());
            }
            let tasks = manager.get_tasks_by_project(&project_id);
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
                return Ok(());
            }
            if tasks.is_empty() {
                println!("   No tasks yet");
            }
            for task in tasks {
                print_task_line(manager, task);
            }
        }

        TaskAction::Show { id, json } => {
            let task = manager
                .get_task(&id)
                .ok_or_else(|| SmartPmError::not_found("Task", &id))?;
            if json {
                println!("{}", serde_json::to_string_pretty(task)?);
                return Ok(());
            }

            println!("\n{} {}", "Task:".cyan().bold(), task.title.bold());
            println!("{}", "─".repeat(60));
            println!("   ID: {}", task.id);
            println!("   Project: {}", task.project_id);
            println!("   Priority: {}", priority_colored(task.priority));
            println!(
                "   Status: {}",
                if task.completed { "Completed" } else { "Open" }
            );
            if let Some(due) = task.due_date {
                println!("   Due: {due}");
            }
            if let Some(description) = &task.description {
                println!("   Description: {description}");
            }
            if !task.labels.is_empty() {
                println!("   Labels: {}", label_names(manager, &task.labels));
            }
            println!("   Progress: {:.1}%", manager.get_task_progress(&task.id));
            println!();
            for subtask in manager.get_subtasks_by_task(&task.id) {
                print_subtask_line(manager, subtask);
            }
        }

        TaskAction::Edit {
            id,
            title,
            description,
            priority,
            due,
            clear_due,
            labels,
            clear_labels,
        } => {
            let task = manager.update_task(
                &id,
                TaskUpdate {
                    title,
                    description: description.map(Some),
                    priority,
                    due_date: due_update(due, clear_due),
                    completed: None,
                    labels: labels_update(labels, clear_labels),
                },
            )?;
            println!("{} Updated task {}", "✓".green(), task.title.bold());
        }

        TaskAction::Done { id } => {
            let task = manager.update_task(&id, TaskUpdate::completed(true))?;
            println!("{} Completed task {}", "✓".green(), task.title.bold());
        }

        TaskAction::Undo { id } => {
            let task = manager.update_task(&id, TaskUpdate::completed(false))?;
            println!("{} Reopened task {}", "✓".green(), task.title.bold());
        }

        TaskAction::Delete { id } => {
            if !manager.delete_task(&id)? {
                return Err(SmartPmError::not_found("Task", &id).into());
            }
            println!("{} Deleted task {}", "✓".green(), id);
        }
    }
    Ok(())
}

fn run_subtask(manager: &mut ProjectManager, action: SubtaskAction) -> anyhow::Result<()> {
    match action {
        SubtaskAction::Add {
            task_id,
            title,
            description,
            priority,
            due,
            labels,
        } => {
            let subtask = manager.create_subtask(NewSubtask {
                task_id,
                title,
                description,
                priority,
                due_date: due,
                completed: false,
                labels,
            })?;
            println!(
                "{} Created subtask {} ({})",
                "✓".green(),
                subtask.title.bold(),
                subtask.id
            );
        }

        SubtaskAction::Edit {
            id,
            title,
            description,
            priority,
            due,
            clear_due,
            labels,
            clear_labels,
        } => {
            let subtask = manager.update_subtask(
                &id,
                SubtaskUpdate {
                    title,
                    description: description.map(Some),
                    priority,
                    due_date: due_update(due, clear_due),
                    completed: None,
                    labels: labels_update(labels, clear_labels),
                },
            )?;
            println!("{} Updated subtask {}", "✓".green(), subtask.title.bold());
        }

        SubtaskAction::Done { id } => {
            let subtask = manager.update_subtask(&id, SubtaskUpdate::completed(true))?;
            println!("{} Completed subtask {}", "✓".green(), subtask.title.bold());
            report_parent(manager, &subtask.task_id);
        }

        SubtaskAction::Undo { id } => {
            let subtask = manager.update_subtask(&id, SubtaskUpdate::completed(false))?;
            println!("{} Reopened subtask {}", "✓".green(), subtask.title.bold());
            report_parent(manager, &subtask.task_id);
        }

        SubtaskAction::Delete { id } => {
            if !manager.delete_subtask(&id)? {
                return Err(SmartPmError::not_found("Subtask", &id).into());
            }
            println!("{} Deleted subtask {}", "✓".green(), id);
        }
    }
    Ok(())
}

fn report_parent(manager: &ProjectManager, task_id: &str) {
    if let Some(task) = manager.get_task(task_id) {
        println!(
            "   Task {} is {} ({:.0}%)",
            task.title.bold(),
            if task.completed { "complete" } else { "open" },
            manager.get_task_progress(task_id)
        );
    }
}

// ============================================================================
// Labels
// ============================================================================

fn run_label(manager: &mut ProjectManager, action: LabelAction) -> anyhow::Result<()> {
    match action {
        LabelAction::Add {
            name,
            color,
            text_color,
            description,
        } => {
            let label = manager.create_label(NewLabel {
                name,
                color,
                text_color,
                description,
            })?;
            println!(
                "{} Created label {} ({}, {})",
                "✓".green(),
                label.name.bold(),
                label.color,
                label.id
            );
        }

        LabelAction::List { json } => {
            let labels = manager.get_all_labels();
            if json {
                println!("{}", serde_json::to_string_pretty(&labels)?);
                return Ok(());
            }

            println!("\n{} ({} total)", "Labels:".cyan().bold(), labels.len());
            println!("{}", "─".repeat(60));
            if labels.is_empty() {
                println!("   No labels yet");
            }
            for label in labels {
                println!(
                    "   {} {} {}{}",
                    label.id.dimmed(),
                    label.name.bold(),
                    label.color,
                    label
                        .description
                        .as_deref()
                        .map(|d| format!(" - {d}"))
                        .unwrap_or_default()
                );
            }
        }

        LabelAction::Edit {
            id,
            name,
            color,
            text_color,
            description,
        } => {
            let label = manager.update_label(
                &id,
                LabelUpdate {
                    name,
                    color,
                    text_color,
                    description: description.map(Some),
                },
            )?;
            println!("{} Updated label {}", "✓".green(), label.name.bold());
        }

        LabelAction::Delete { id } => {
            if !manager.delete_label(&id)? {
                return Err(SmartPmError::not_found("Label", &id).into());
            }
            println!("{} Deleted label {}", "✓".green(), id);
        }
    }
    Ok(())
}

// ============================================================================
// Backups
// ============================================================================

fn run_backup(manager: &ProjectManager, action: BackupAction) -> anyhow::Result<()> {
    match action {
        BackupAction::Create => {
            let path = manager.create_backup()?;
            println!("{} Backup created: {}", "✓".green(), path.display());
        }

        BackupAction::List { json } => {
            let inventory = manager.get_backup_info()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&inventory)?);
                return Ok(());
            }

            println!(
                "\n{} {} total, {:.2} MB",
                "Backups:".cyan().bold(),
                inventory.total,
                inventory.total_size_mb()
            );
            println!("{}", "─".repeat(60));
            if inventory.backups.is_empty() {
                println!("   No backups found");
            }
            for entry in &inventory.backups {
                let date = entry
                    .date
                    .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "Unknown date".to_string());
                println!(
                    "   {} [{}] {:.3} MB",
                    entry.filename,
                    date,
                    entry.size_mb()
                );
            }
        }

        BackupAction::Cleanup { days } => {
            let days = days.unwrap_or(manager.config().backup.retention_days);
            let report = manager.cleanup_old_backups(days)?;
            println!(
                "{} Deleted {} backups older than {}, kept {}",
                "✓".green(),
                report.deleted,
                report.cutoff_date.format("%Y-%m-%d"),
                report.kept
            );
        }

        BackupAction::Clear => {
            let report = manager.clear_all_backups()?;
            println!(
                "{} Deleted {} of {} backups, freed {:.2} MB",
                "✓".green(),
                report.deleted,
                report.total_files,
                report.freed_mb()
            );
        }
    }
    Ok(())
}

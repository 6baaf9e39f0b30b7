use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Result, eyre};
use std::path::PathBuf;
use todostore::{ItemManager, LifecycleEvent, Location, ToDoItem};

#[derive(Parser)]
#[command(name = "todostore")]
#[command(about = "TodoStore CLI - Track to-do and done items")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to the store directory (default: platform data directory)
    #[arg(short, long)]
    store_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a to-do item
    Add {
        title: String,

        /// Free-form notes
        #[arg(short, long)]
        description: Option<String>,

        /// Where the item takes place
        #[arg(short, long)]
        location: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },

    /// List to-do and done items
    List,

    /// Mark the to-do item at INDEX as done
    Check { index: usize },

    /// Move the done item at INDEX back to the to-do list
    Uncheck { index: usize },

    /// Remove all items and the saved snapshot
    Clear,
}

fn main() -> Result<()> {
    // Setup tracing; stdout is reserved for command output
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let store_path = cli.store_path.unwrap_or_else(default_store_path);
    let mut manager = ItemManager::open(&store_path)?;

    match cli.command {
        Commands::Add {
            title,
            description,
            location,
            due,
        } => {
            if title.trim().is_empty() {
                return Err(eyre!("Title cannot be empty"));
            }

            let mut item = ToDoItem::new(title);
            if let Some(description) = description {
                item = item.with_description(description);
            }
            if let Some(location) = location {
                item = item.with_location(Location::new(location));
            }
            if let Some(due) = due {
                item = item.with_timestamp(parse_due_date(&due)?);
            }

            if manager.add_item(item) {
                println!("Added item #{}", manager.to_do_count() - 1);
            } else {
                println!("Item is already on the to-do list");
            }
        }
        Commands::List => print_items(&manager),
        Commands::Check { index } => {
            if index >= manager.to_do_count() {
                return Err(eyre!(
                    "No to-do item at index {} ({} pending)",
                    index,
                    manager.to_do_count()
                ));
            }
            manager.check_item_at_index(index);
            println!("Checked: {}", manager.done_item_at_index(manager.done_count() - 1));
        }
        Commands::Uncheck { index } => {
            if index >= manager.done_count() {
                return Err(eyre!("No done item at index {} ({} done)", index, manager.done_count()));
            }
            if manager.uncheck_item_at_index(index) {
                println!("Unchecked: {}", manager.item_at_index(manager.to_do_count() - 1));
            } else {
                println!("Item is already on the to-do list, removed from done");
            }
        }
        Commands::Clear => {
            manager.remove_all_items()?;
            println!("All items removed");
        }
    }

    // The CLI process is about to go away after every command
    manager.handle_lifecycle(LifecycleEvent::WillResignActive)?;

    Ok(())
}

fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("todostore"))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn parse_due_date(due: &str) -> Result<i64> {
    let date = NaiveDate::parse_from_str(due, "%Y-%m-%d")
        .map_err(|e| eyre!("Invalid due date {:?} (expected YYYY-MM-DD): {}", due, e))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| eyre!("Invalid due date {:?}", due))?;
    Ok(midnight.and_utc().timestamp_millis())
}

fn format_item(item: &ToDoItem) -> String {
    let mut line = item.to_string();
    if let Some(date) = item.timestamp.and_then(DateTime::<Utc>::from_timestamp_millis) {
        line.push_str(&format!(" (due {})", date.format("%Y-%m-%d")));
    }
    if let Some(description) = &item.description {
        line.push_str(&format!(" - {}", description));
    }
    line
}

fn print_items(manager: &ItemManager) {
    println!("{} ({})", "To do".bold(), manager.to_do_count());
    for (index, item) in manager.to_do_items().iter().enumerate() {
        println!("  {} {}", format!("[{}]", index).as_str().cyan(), format_item(item));
    }

    println!("{} ({})", "Done".bold(), manager.done_count());
    for (index, item) in manager.done_items().iter().enumerate() {
        println!("  {} {}", format!("[{}]", index).as_str().green(), format_item(item).as_str().dimmed());
    }
}

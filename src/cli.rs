use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::database::Database;
use crate::models::{NewTodo, Priority};
use crate::service::{ServiceError, TagService, TodoService};

#[derive(Parser)]
#[command(name = "todo-api")]
#[command(about = "Todo and tag REST API backed by SQLite")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default if no subcommand)
    Serve {
        /// Address to bind, overrides the config file
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on, overrides the config file
        #[arg(long)]
        port: Option<u16>,
    },
    /// Quickly add a new todo
    AddTodo {
        /// Todo title
        title: String,
        /// Longer description
        #[arg(long)]
        description: Option<String>,
        /// LOW, MEDIUM or HIGH
        #[arg(long)]
        priority: Option<Priority>,
    },
    /// Quickly add a new tag
    AddTag {
        /// Tag name
        name: String,
    },
    /// Print every tag
    ListTags,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Handle the add-todo command
pub fn handle_add_todo(
    title: String,
    description: Option<String>,
    priority: Option<Priority>,
    db: &Database,
) -> Result<(), CliError> {
    let todo = TodoService::new(db).create_todo(NewTodo {
        title,
        description,
        completed: None,
        priority,
    })?;
    println!(
        "Todo created successfully (ID: {}, priority: {})",
        todo.id.unwrap_or_default(),
        todo.priority
    );
    Ok(())
}

/// Handle the add-tag command
pub fn handle_add_tag(name: String, db: &Database) -> Result<(), CliError> {
    let tag = TagService::new(db).create_tag(name)?;
    println!("Tag created successfully (ID: {})", tag.id.unwrap_or_default());
    Ok(())
}

/// Handle the list-tags command
pub fn handle_list_tags(db: &Database) -> Result<(), CliError> {
    let tags = TagService::new(db).get_all_tags()?;
    if tags.is_empty() {
        println!("No tags");
    }
    for tag in tags {
        println!("{:>5}  {}", tag.id.unwrap_or_default(), tag.name);
    }
    Ok(())
}

use std::path::Path;

use clap::Parser;
use color_eyre::Result;
use todo_api::{
    Config, Database, Profile,
    cli::{Cli, Commands},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    // An explicit --config file is read as-is; otherwise the profile default is used
    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(Path::new(path))?,
        None => Config::load_with_profile(profile)?,
    };

    let command = cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    });
    if let Commands::Serve { host, port } = &command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }

    todo_api::logging::init_tracing(&config.logging)?;

    let db_path = config.get_database_path();
    let db = Database::new(
        db_path
            .to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Database path contains invalid UTF-8"))?,
    )?;
    tracing::debug!(path = %db_path.display(), "database opened");

    match command {
        Commands::Serve { .. } => todo_api::api::serve(&config, db).await?,
        Commands::AddTodo {
            title,
            description,
            priority,
        } => todo_api::cli::handle_add_todo(title, description, priority, &db)?,
        Commands::AddTag { name } => todo_api::cli::handle_add_tag(name, &db)?,
        Commands::ListTags => todo_api::cli::handle_list_tags(&db)?,
    }

    Ok(())
}

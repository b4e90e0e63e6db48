//! entisql CLI
//!
//! Command-line tools over the entisql demo database.
//!
//! # Commands
//!
//! - `init` - Create the demo schema, optionally with its rows
//! - `list` - Print the rows of an entity type
//! - `count` - Count the rows of an entity type
//! - `delete-department` - Delete a department, optionally with its employees

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// entisql command-line tools.
#[derive(Parser)]
#[command(name = "entisql")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite database file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the demo schema
    Init {
        /// Create the tables without demo rows
        #[arg(short, long)]
        empty: bool,
    },

    /// Print the rows of an entity type
    List {
        /// Entity type name, for example `emp`
        entity: String,

        /// Maximum number of rows to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Count the rows of an entity type
    Count {
        /// Entity type name, for example `emp`
        entity: String,
    },

    /// Delete a department
    DeleteDepartment {
        /// Department number
        id: i64,

        /// Delete the department's employees in the same transaction
        #[arg(short, long)]
        cascade: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Init { empty } => {
            let path = cli.path.ok_or("Database path required for init")?;
            commands::init::run(&path, !empty)?;
        }
        Commands::List { entity, limit, format } => {
            let path = cli.path.ok_or("Database path required for list")?;
            commands::list::run(&path, &entity, limit, &format)?;
        }
        Commands::Count { entity } => {
            let path = cli.path.ok_or("Database path required for count")?;
            commands::count::run(&path, &entity)?;
        }
        Commands::DeleteDepartment { id, cascade } => {
            let path = cli.path.ok_or("Database path required for delete-department")?;
            commands::delete_department::run(&path, id, cascade)?;
        }
        Commands::Version => {
            println!("entisql CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("entisql Core v{}", entisql_core::VERSION);
        }
    }

    Ok(())
}

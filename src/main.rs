use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

/// Inspect a SQLite database file and export its tables as CSV
#[derive(Parser, Debug)]
#[command(name = "sqlite2csv", version)]
struct Cli {
    /// Path to the SQLite database file
    database: PathBuf,

    /// Log progress to stderr (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print header information and the number of tables
    #[command(alias = ".dbinfo")]
    Dbinfo,

    /// List user tables
    #[command(alias = ".tables")]
    Tables {
        /// Print each table with its row count
        #[arg(long)]
        counts: bool,
    },

    /// Show the columns of a table
    Schema {
        table: String,
        #[arg(long, value_enum, default_value_t = SchemaFormat::Text)]
        format: SchemaFormat,
    },

    /// Print every row of a table
    Rows {
        table: String,
        #[arg(long, value_enum, default_value_t = RowFormat::Csv)]
        format: RowFormat,
    },

    /// Run a read-only SQL statement and print its rows
    Query {
        sql: String,
        #[arg(long, value_enum, default_value_t = RowFormat::Csv)]
        format: RowFormat,
    },

    /// Export a table to <name>.csv
    Export {
        /// Table to export; may come from the profile instead
        table: Option<String>,

        /// TOML export profile with field mappings
        #[arg(long)]
        profile: Option<PathBuf>,

        /// Rename a column in the output
        #[arg(long, value_name = "COLUMN=NAME", value_parser = parse_rename)]
        rename: Vec<(String, String)>,

        /// Leave a column out
        #[arg(long, value_name = "COLUMN")]
        exclude: Vec<String>,

        /// Export only these columns
        #[arg(long, value_name = "COLUMN")]
        only: Vec<String>,

        /// Directory to write into [default: current directory]
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// File name without the .csv extension [default: table name]
        #[arg(short, long)]
        name: Option<String>,

        /// Print the CSV instead of writing a file
        #[arg(long, conflicts_with_all = ["output_dir", "name"])]
        stdout: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SchemaFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum RowFormat {
    Csv,
    Json,
}

fn parse_rename(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((from, to)) if !from.is_empty() && !to.is_empty() => {
            Ok((from.to_string(), to.to_string()))
        }
        _ => Err(format!("expected COLUMN=NAME, got `{s}`")),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let path = cli.database.as_path();
    match cli.command {
        Command::Dbinfo => commands::dbinfo(path)?,
        Command::Tables { counts } => commands::tables(path, counts)?,
        Command::Schema { table, format } => commands::schema(path, &table, format)?,
        Command::Rows { table, format } => commands::rows(path, &table, format)?,
        Command::Query { sql, format } => commands::query(path, &sql, format)?,
        Command::Export {
            table,
            profile,
            rename,
            exclude,
            only,
            output_dir,
            name,
            stdout,
        } => commands::export(
            path,
            commands::ExportArgs {
                table,
                profile,
                rename,
                exclude,
                only,
                output_dir,
                name,
                stdout,
            },
        )?,
    }

    Ok(())
}

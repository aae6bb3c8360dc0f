use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

use sqlite2csv::config::ExportProfile;
use sqlite2csv::db::{ColumnInfo, Database, QueryResult};
use sqlite2csv::export::{self, MappingOverrides};

use crate::{RowFormat, SchemaFormat};

pub struct ExportArgs {
    pub table: Option<String>,
    pub profile: Option<PathBuf>,
    pub rename: Vec<(String, String)>,
    pub exclude: Vec<String>,
    pub only: Vec<String>,
    pub output_dir: Option<PathBuf>,
    pub name: Option<String>,
    pub stdout: bool,
}

fn open(path: &Path) -> Result<Database> {
    Database::open(path).context("Failed to load database, make sure it is a SQLite file")
}

pub fn dbinfo(path: &Path) -> Result<()> {
    let db = open(path)?;
    let info = db.info().context("Failed to read database info")?;
    let header = &info.header;
    println!("database page size: {}", header.page_size);
    println!("number of tables: {}", info.table_count);
    println!("page count: {}", header.page_count);
    println!("freelist pages: {}", header.freelist_pages);
    println!("text encoding: {}", header.text_encoding);
    println!("schema format: {}", header.schema_format);
    println!("user version: {}", header.user_version);
    println!("application id: {}", header.application_id);
    println!("written by sqlite: {}", header.sqlite_version_string());
    db.close()?;
    Ok(())
}

pub fn tables(path: &Path, counts: bool) -> Result<()> {
    let db = open(path)?;
    let table_names = db.table_names().context("Failed to read table names")?;
    if counts {
        for name in &table_names {
            let rows = db.count_rows(name)?;
            println!("{name}\t{rows}");
        }
    } else {
        println!("{}", table_names.join(" "));
    }
    db.close()?;
    Ok(())
}

pub fn schema(path: &Path, table: &str, format: SchemaFormat) -> Result<()> {
    let db = open(path)?;
    let columns = db.table_schema(table)?;
    if columns.is_empty() {
        bail!("No such table: {}", table);
    }
    match format {
        SchemaFormat::Text => {
            for column in &columns {
                println!("{}", describe_column(column));
            }
        }
        SchemaFormat::Json => println!("{}", serde_json::to_string_pretty(&columns)?),
    }
    db.close()?;
    Ok(())
}

fn describe_column(column: &ColumnInfo) -> String {
    let mut line = column.name.clone();
    if !column.decl_type.is_empty() {
        line.push(' ');
        line.push_str(&column.decl_type);
    }
    if column.not_null {
        line.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default_value {
        line.push_str(" DEFAULT ");
        line.push_str(default);
    }
    if column.is_primary_key() {
        line.push_str(&format!(" PRIMARY KEY ({})", column.primary_key));
    }
    line
}

pub fn rows(path: &Path, table: &str, format: RowFormat) -> Result<()> {
    let db = open(path)?;
    let result = db.query_table(table)?;
    print_result(&result, format)?;
    db.close()?;
    Ok(())
}

pub fn query(path: &Path, sql: &str, format: RowFormat) -> Result<()> {
    let db = open(path)?;
    let result = db.execute_query(sql)?;
    print_result(&result, format)?;
    db.close()?;
    Ok(())
}

fn print_result(result: &QueryResult, format: RowFormat) -> Result<()> {
    match format {
        RowFormat::Csv => {
            let csv = export::convert_to_csv(result, &export::mappings_for(&result.columns))?;
            if !csv.is_empty() {
                println!("{csv}");
            }
        }
        RowFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
    }
    Ok(())
}

pub fn export(path: &Path, args: ExportArgs) -> Result<()> {
    let profile = match &args.profile {
        Some(file) => ExportProfile::load(file)?,
        None => ExportProfile::default(),
    };
    let Some(table) = args.table.or(profile.table.clone()) else {
        bail!("Missing <table>: pass one or set `table` in the export profile");
    };

    let db = open(path)?;
    let result = db.query_table(&table)?;

    // Result columns include generated columns, which table_info omits.
    let mut mappings = profile.mappings(&result.columns);
    MappingOverrides {
        rename: args.rename,
        exclude: args.exclude,
        only: args.only,
    }
    .apply(&mut mappings)?;

    let csv = export::convert_to_csv(&result, &mappings)?;
    if csv.is_empty() {
        warn!(table = %table, "nothing to export: no rows or no included columns");
    }

    if args.stdout {
        if !csv.is_empty() {
            println!("{csv}");
        }
    } else {
        let dir = args
            .output_dir
            .or(profile.output_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        let name = args.name.or(profile.filename).unwrap_or_else(|| table.clone());
        let written = export::write_csv_file(&csv, &dir, &name)
            .with_context(|| format!("Failed to export table {table}"))?;
        println!("exported {} rows to {}", result.len(), written.display());
    }

    db.close()?;
    Ok(())
}

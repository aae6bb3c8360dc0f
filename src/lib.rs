//! Inspect SQLite database files and export their tables as CSV.

pub mod config;
pub mod db;
pub mod export;

//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `table_exporter` library that handles:
//! - Environment variable loading (.env file)
//! - Command-line argument parsing
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use table_exporter::config::Opt;
use table_exporter::initialization::init_logger_with;
use table_exporter::{export_all, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // DATABASE_URL may live in a .env file, either in the current directory
    // or next to the executable
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let config = Config::from(Opt::parse());

    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;

    match export_all(&config).await {
        Ok(report) => {
            println!(
                "✅ Exported {} of {} table{} ({} rows) in {:.1}s",
                report.tables_exported,
                report.tables_listed,
                if report.tables_listed == 1 { "" } else { "s" },
                report.total_rows,
                report.elapsed_seconds
            );
            println!("  • JSON: {}", report.json_file.display());
            println!("  • CSV:  {}", report.csv_dir.display());
            println!("  • XLSX: {}", report.workbook_file.display());
            if !report.skipped_tables.is_empty() {
                println!("⚠️  Skipped: {}", report.skipped_tables.join(", "));
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("table_exporter error: {:#}", anyhow::Error::from(e));
            process::exit(1);
        }
    }
}

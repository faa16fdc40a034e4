//! Tests for CLI option parsing.

use clap::{CommandFactory, Parser};
use std::ffi::OsStr;
use std::path::PathBuf;
use table_exporter::config::Opt;
use table_exporter::{Config, LogFormat, LogLevel};

#[test]
fn test_cli_defaults() {
    let args = ["table_exporter", "postgresql://localhost/shop"];
    let opt = Opt::try_parse_from(args.iter()).expect("Should parse with only a URL");

    assert_eq!(opt.database_url, "postgresql://localhost/shop");
    assert_eq!(opt.output_dir, PathBuf::from("./exports"));
    assert_eq!(opt.schema, "public");
    // LogLevel doesn't implement PartialEq, so compare via conversion
    assert_eq!(
        log::LevelFilter::from(opt.log_level.clone()),
        log::LevelFilter::Info
    );
    match opt.log_format {
        LogFormat::Plain => {}
        _ => panic!("Should default to Plain format"),
    }
}

#[test]
fn test_cli_with_options() {
    let args = vec![
        "table_exporter",
        "sqlite:./shop.db",
        "--output-dir",
        "/var/backups",
        "--schema",
        "ventas",
        "--log-level",
        "debug",
        "--log-format",
        "json",
    ];
    let config = Config::from(Opt::try_parse_from(args.iter()).expect("Should parse options"));

    assert_eq!(config.database_url, "sqlite:./shop.db");
    assert_eq!(config.output_dir, PathBuf::from("/var/backups"));
    assert_eq!(config.schema, "ventas");
    assert_eq!(
        log::LevelFilter::from(config.log_level),
        log::LevelFilter::from(LogLevel::Debug)
    );
    assert!(matches!(config.log_format, LogFormat::Json));
}

#[test]
fn test_cli_url_reads_from_environment() {
    let command = Opt::command();
    let url = command
        .get_arguments()
        .find(|arg| arg.get_id() == "database_url")
        .expect("database_url argument");

    assert_eq!(url.get_env(), Some(OsStr::new("DATABASE_URL")));
    assert!(
        url.is_hide_env_values_set(),
        "the connection string must not show up in --help"
    );
}

#[test]
fn test_cli_missing_url_error() {
    if std::env::var_os("DATABASE_URL").is_some() {
        // the environment supplies the URL; nothing to check
        return;
    }
    let result = Opt::try_parse_from(["table_exporter"].iter());

    assert!(result.is_err(), "Should fail without a connection string");
    let error_msg = result.unwrap_err().to_string();
    assert!(
        error_msg.contains("DATABASE_URL"),
        "Error message should name the missing argument: {}",
        error_msg
    );
}

#[test]
fn test_cli_invalid_log_level_error() {
    let args = ["table_exporter", "sqlite:./shop.db", "--log-level", "loud"];
    let result = Opt::try_parse_from(args.iter());

    assert!(result.is_err(), "Should reject unknown log levels");
    let error_msg = result.unwrap_err().to_string();
    assert!(
        error_msg.contains("loud") || error_msg.contains("invalid value"),
        "Error message should mention the bad value: {}",
        error_msg
    );
}

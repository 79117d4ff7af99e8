//! Config validation CLI tool
//!
//! Validates a playtime configuration file and reports any errors.

use chrono::Datelike;
use playtime_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1).map(String::as_str) {
        Some("-h") | Some("--help") => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a playtime configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            eprintln!("  validate-config config.example.json");
            return ExitCode::from(2);
        }
        Some(path) => PathBuf::from(path),
        None => default_config_path(),
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match playtime_config::load_config(&config_path) {
        Ok(policy) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Weekday limit: {} min", policy.weekday_limit_minutes);
            println!("  Weekend/holiday limit: {} min", policy.weekend_limit_minutes);
            println!(
                "  Time server: {} (timeout {}s)",
                policy.time_sync.server,
                policy.time_sync.timeout.as_secs()
            );
            if let Some(ledger) = &policy.ledger_path {
                println!("  Session log: {}", ledger.display());
            }

            if !policy.holidays.is_empty() {
                println!();
                println!("Holidays:");
                for day in &policy.holidays {
                    println!("  - {} ({})", day, day.weekday());
                }
            }

            println!();
            println!("Activities:");
            for activity in &policy.activities {
                println!("  - {}", activity);
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                playtime_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                playtime_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("JSON parse error:");
                    eprintln!("  {}", parse_err);
                }
                playtime_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
            }
            ExitCode::from(1)
        }
    }
}

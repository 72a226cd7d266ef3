//! Config validation CLI tool
//!
//! Validates a selenium-launcher configuration file and reports any errors.

use selenium_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a selenium-launcher configuration file.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match selenium_config::load_config(&config_path) {
        Ok(config) => {
            let options = &config.options;
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", selenium_config::CURRENT_CONFIG_VERSION);
            println!("  Installer: {}", config.installer_command.join(" "));
            println!(
                "  Install step: {}",
                if options.skip_selenium_install { "skipped" } else { "enabled" }
            );
            match &options.log_path {
                Some(dir) => println!("  Server log dir: {}", dir.display()),
                None => println!("  Server log: disabled"),
            }
            println!("  Capabilities: {}", config.capabilities.len());

            let drivers: Vec<&str> = options.args.drivers.keys().map(String::as_str).collect();
            if !drivers.is_empty() {
                println!("  Drivers: {}", drivers.join(", "));
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                selenium_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                selenium_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                selenium_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                selenium_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        selenium_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}

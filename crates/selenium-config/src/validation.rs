//! Configuration validation

use crate::schema::RawConfig;
use selenium_api::DriverSpec;
use std::collections::BTreeMap;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Installer command: {0}")]
    InstallerCommand(String),

    #[error("Driver '{driver}' in {section}: {message}")]
    DriverError {
        section: &'static str,
        driver: String,
        message: String,
    },

    #[error("Invalid argument in {section}: {message}")]
    InvalidArgument {
        section: &'static str,
        message: String,
    },
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(command) = &config.installer.command {
        match command.first() {
            None => errors.push(ValidationError::InstallerCommand(
                "command cannot be empty".into(),
            )),
            Some(program) if program.trim().is_empty() => {
                errors.push(ValidationError::InstallerCommand(
                    "program name cannot be blank".into(),
                ))
            }
            Some(_) => {}
        }
    }

    let launcher = &config.launcher;
    errors.extend(validate_drivers("install_args", &launcher.install_args.drivers));
    errors.extend(validate_drivers("args", &launcher.args.drivers));

    if launcher.args.java_args.iter().any(|a| a.is_empty()) {
        errors.push(ValidationError::InvalidArgument {
            section: "args.java_args",
            message: "arguments cannot be empty".into(),
        });
    }

    if launcher.args.selenium_args.iter().any(|a| a.is_empty()) {
        errors.push(ValidationError::InvalidArgument {
            section: "args.selenium_args",
            message: "arguments cannot be empty".into(),
        });
    }

    errors
}

fn validate_drivers(
    section: &'static str,
    drivers: &BTreeMap<String, DriverSpec>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (name, spec) in drivers {
        if name.trim().is_empty() {
            errors.push(ValidationError::DriverError {
                section,
                driver: name.clone(),
                message: "driver name cannot be blank".into(),
            });
        }

        if spec.version.as_deref().is_some_and(|v| v.trim().is_empty()) {
            errors.push(ValidationError::DriverError {
                section,
                driver: name.clone(),
                message: "version cannot be blank".into(),
            });
        }
    }

    errors
}

use anyhow::Error;
use halodial_api::ApiError;
use halodial_config::ConfigError;
use halodial_core::CoreError;
use std::process::ExitCode;
use thiserror::Error as ThisError;

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_INVALID_INPUT: u8 = 3;
pub const EXIT_PARTIAL_FAILURE: u8 = 4;

#[derive(Debug, ThisError)]
pub enum CliError {
    #[error("{failed} of {attempted} user updates failed")]
    PartialFailure { failed: usize, attempted: usize },
}

pub fn partial_failure(failed: usize, attempted: usize) -> Error {
    CliError::PartialFailure { failed, attempted }.into()
}

pub fn report_error(err: &Error, verbose: bool) {
    if verbose {
        eprintln!("error: {:#}", err);
    } else {
        eprintln!("error: {}", err);
    }
}

pub fn exit_code_for(err: &Error) -> ExitCode {
    for cause in err.chain() {
        if let Some(cli_err) = cause.downcast_ref::<CliError>() {
            return ExitCode::from(match cli_err {
                CliError::PartialFailure { .. } => EXIT_PARTIAL_FAILURE,
            });
        }
        if let Some(config_err) = cause.downcast_ref::<ConfigError>() {
            return ExitCode::from(config_exit_code(config_err));
        }
        if let Some(api_err) = cause.downcast_ref::<ApiError>() {
            return ExitCode::from(api_exit_code(api_err));
        }
        if let Some(_core_err) = cause.downcast_ref::<CoreError>() {
            return ExitCode::from(EXIT_FAILURE);
        }
    }
    ExitCode::from(EXIT_FAILURE)
}

fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::MissingHomeDir => EXIT_FAILURE,
        ConfigError::InvalidConfigPath(_)
        | ConfigError::MissingConfigFile(_)
        | ConfigError::MissingField(_)
        | ConfigError::InvalidBaseUrl(_)
        | ConfigError::InvalidSiteId(_)
        | ConfigError::InvalidPageSize(_)
        | ConfigError::InvalidTimeout(_)
        | ConfigError::InvalidSecretField { .. }
        | ConfigError::Read { .. }
        | ConfigError::Parse { .. } => EXIT_INVALID_INPUT,
    }
}

fn api_exit_code(err: &ApiError) -> u8 {
    match err {
        ApiError::Unavailable(_) | ApiError::Url(_) => EXIT_INVALID_INPUT,
        ApiError::Secret(_)
        | ApiError::Runtime(_)
        | ApiError::Io(_)
        | ApiError::Core(_)
        | ApiError::Http(_)
        | ApiError::Status { .. } => EXIT_FAILURE,
    }
}

//! Output formatting utilities.

use crate::context::CliError;
use serde::Serialize;

/// Formats a value as pretty JSON.
pub fn format_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Prints a value as the command's single JSON document.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", format_json(value)?);
    Ok(())
}

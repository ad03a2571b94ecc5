//! Error types for the scipaper CLI application.
//!
//! This module provides the error type for everything that can go wrong while running a
//! command:
//! - Harvesting, configuration and snapshot errors from the library
//! - User interaction errors
//! - File system operations
//!
//! The errors are transparent, so the underlying message is what the user sees.

use thiserror::Error;

/// Errors that can occur during CLI operations.
///
/// # Examples
///
/// ```no_run
/// use scipaper::config::Config;
/// use scipaper_cli::errors::ScipaperCliError;
///
/// # fn example() -> Result<(), ScipaperCliError> {
/// // Library errors convert with `?`
/// let config = Config::load("config.yaml")?;
///
/// // So do user interaction errors
/// let sure = dialoguer::Confirm::new().with_prompt("Continue?").interact()?;
/// # Ok(())
/// # }
/// ```
#[derive(Error, Debug)]
pub enum ScipaperCliError {
  /// Errors from user interaction dialogs
  #[error(transparent)]
  Dialoguer(#[from] dialoguer::Error),

  /// Errors from the underlying scipaper library
  #[error(transparent)]
  Scipaper(#[from] scipaper::errors::ScipaperError),

  /// File system and IO operation errors
  #[error(transparent)]
  IO(#[from] std::io::Error),
}

// Utility functions for Exliar Compat

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{CompatError, Result};

/// Captured output of an external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool, // Exit status was zero
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Output of a command that exited successfully
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Output of a command that ran but exited non-zero
    pub fn failed(stdout: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// Runs a system command and captures its output.
///
/// A non-zero exit status is not an error here: status tools such as
/// `systemctl status` exit non-zero while still printing useful text. Only
/// failing to start the program is reported, as `DetectionUnavailable`.
pub fn run_command(program: &str, args: &[&str]) -> Result<CommandOutput> {
    let command_line = if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    };
    debug!("Running `{}`", command_line);

    match Command::new(program).args(args).output() {
        Ok(output) => {
            let result = CommandOutput {
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            };
            if !result.success {
                debug!("`{}` exited with {:?}: {}", command_line, output.status.code(), result.stderr);
            }
            Ok(result)
        }
        Err(e) => Err(CompatError::DetectionUnavailable {
            command: command_line,
            message: e.to_string(),
        }),
    }
}

/// Helper to create a timestamped backup of a file
pub fn create_timestamped_backup(file_path: &Path) -> io::Result<PathBuf> {
    if !file_path.exists() {
        // Nothing to back up
        return Ok(file_path.to_path_buf());
    }

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let file_name = file_path.file_name().unwrap_or_default().to_string_lossy();

    // Never overwrite an earlier backup taken within the same second
    let mut backup_path = file_path.with_file_name(format!("{}.backup_{}", file_name, timestamp));
    let mut counter = 1;
    while backup_path.exists() {
        backup_path = file_path.with_file_name(format!("{}.backup_{}_{}", file_name, timestamp, counter));
        counter += 1;
    }

    fs::copy(file_path, &backup_path)?;
    debug!("Backed up {} to {}", file_path.display(), backup_path.display());
    Ok(backup_path)
}

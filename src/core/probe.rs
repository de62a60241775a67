// System probe abstraction for Exliar Compat
//
// Readiness checks and detectors never touch the host directly; they go
// through a SystemProbe so the same logic can run against canned output.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CompatError, Result};
use crate::utils::{run_command, CommandOutput};

/// Access to the host's commands and files
pub trait SystemProbe {
    /// Runs an external command, `DetectionUnavailable` if it cannot start
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Whether a filesystem path exists
    fn path_exists(&self, path: &Path) -> bool;

    /// Reads a text file, `None` if it is missing or unreadable
    fn read_file(&self, path: &Path) -> Option<String>;

    /// Number of entries in a directory, `None` if it cannot be listed
    fn dir_entry_count(&self, path: &Path) -> Option<usize>;
}

/// Probe backed by the real host
#[derive(Debug, Clone, Copy, Default)]
pub struct HostProbe;

impl SystemProbe for HostProbe {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        run_command(program, args)
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_file(&self, path: &Path) -> Option<String> {
        fs::read_to_string(path).ok()
    }

    fn dir_entry_count(&self, path: &Path) -> Option<usize> {
        fs::read_dir(path).ok().map(|entries| entries.count())
    }
}

/// Probe answering from canned command output and file contents.
///
/// Commands are keyed by their full command line (`"lsmod"`, `"uname -r"`).
/// Anything not registered behaves as missing: unknown commands fail to start
/// and unknown paths do not exist.
#[derive(Debug, Clone, Default)]
pub struct CannedProbe {
    commands: HashMap<String, CommandOutput>,
    files: HashMap<PathBuf, String>,
    dirs: HashMap<PathBuf, usize>,
    paths: HashSet<PathBuf>,
}

impl CannedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the output of a command line
    pub fn with_command(mut self, command_line: &str, output: CommandOutput) -> Self {
        self.commands.insert(command_line.to_string(), output);
        self
    }

    /// Registers a readable file
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: &str) -> Self {
        self.files.insert(path.into(), contents.to_string());
        self
    }

    /// Registers a directory with the given number of entries
    pub fn with_dir(mut self, path: impl Into<PathBuf>, entries: usize) -> Self {
        self.dirs.insert(path.into(), entries);
        self
    }

    /// Registers a path that exists but is not readable as text
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.insert(path.into());
        self
    }
}

impl SystemProbe for CannedProbe {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let command_line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        match self.commands.get(&command_line) {
            Some(output) => Ok(output.clone()),
            None => Err(CompatError::DetectionUnavailable {
                command: command_line,
                message: "No such file or directory (os error 2)".to_string(),
            }),
        }
    }

    fn path_exists(&self, path: &Path) -> bool {
        self.paths.contains(path) || self.files.contains_key(path) || self.dirs.contains_key(path)
    }

    fn read_file(&self, path: &Path) -> Option<String> {
        self.files.get(path).cloned()
    }

    fn dir_entry_count(&self, path: &Path) -> Option<usize> {
        self.dirs.get(path).copied()
    }
}

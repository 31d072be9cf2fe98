//! Init command for Hifdh.
//!
//! Scaffolds the project data directory and default configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{hifdh_home, Config, PROJECT_DIR_NAME};
use crate::error::{exit_codes, HifdhError};

/// Options for the init command.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Force overwrite of an existing config file.
    pub force: bool,
}

/// Output format for the init command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitOutput {
    /// Whether initialization was successful.
    pub success: bool,
    /// Files and directories created.
    pub created: Vec<String>,
    /// Files and directories that already existed (skipped).
    pub skipped: Vec<String>,
    /// Error message if initialization failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Process exit code.
    #[serde(skip)]
    pub exit_code: i32,
}

impl InitOutput {
    /// Create a successful output.
    pub fn success(created: Vec<String>, skipped: Vec<String>) -> Self {
        Self {
            success: true,
            created,
            skipped,
            error: None,
            exit_code: exit_codes::SUCCESS,
        }
    }

    /// Create a failed output with partial success information.
    ///
    /// Reports what was created before the failure occurred.
    pub fn failure(error: &HifdhError, created: Vec<String>, skipped: Vec<String>) -> Self {
        Self {
            success: false,
            created,
            skipped,
            error: Some(error.to_string()),
            exit_code: error.exit_code(),
        }
    }
}

/// The init command implementation.
///
/// Initializes `cwd` itself; it does not walk up to an enclosing project.
pub struct InitCommand {
    config: Config,
    cwd: PathBuf,
}

impl InitCommand {
    /// Create a new init command.
    pub fn new(config: Config, cwd: impl AsRef<Path>) -> Self {
        Self {
            config,
            cwd: cwd.as_ref().to_path_buf(),
        }
    }

    /// Run the init command.
    pub fn run(&self, options: &InitOptions) -> InitOutput {
        let mut created = Vec::new();
        let mut skipped = Vec::new();

        let project_dir = self.cwd.join(PROJECT_DIR_NAME);
        let records_dir = project_dir.join("records");
        for dir in [&project_dir, &records_dir] {
            match ensure_dir(dir) {
                Ok(true) => created.push(dir.display().to_string()),
                Ok(false) => skipped.push(dir.display().to_string()),
                Err(e) => return InitOutput::failure(&e, created, skipped),
            }
        }

        let config_path = project_dir.join("config.toml");
        if config_path.exists() && !options.force {
            skipped.push(config_path.display().to_string());
        } else {
            match self.config.save_project(&self.cwd) {
                Ok(path) => created.push(path.display().to_string()),
                Err(e) => return InitOutput::failure(&e, created, skipped),
            }
        }

        if let Some(home) = hifdh_home() {
            match ensure_dir(&home) {
                Ok(true) => created.push(home.display().to_string()),
                Ok(false) => skipped.push(home.display().to_string()),
                Err(e) => return InitOutput::failure(&e, created, skipped),
            }
        }

        InitOutput::success(created, skipped)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &InitOutput, options: &InitOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        let mut lines = Vec::new();
        for path in &output.created {
            lines.push(format!("  created  {}", path));
        }
        for path in &output.skipped {
            lines.push(format!("  exists   {}", path));
        }

        match &output.error {
            Some(error) => lines.push(format!("Init failed: {}", error)),
            None => lines.push("Hifdh initialized.".to_string()),
        }
        lines.join("\n")
    }
}

/// Ensure a directory exists.
/// Returns Ok(true) if created, Ok(false) if it already exists.
fn ensure_dir(path: &Path) -> Result<bool, HifdhError> {
    if path.exists() {
        if path.is_dir() {
            return Ok(false);
        }
        return Err(HifdhError::storage(
            path,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "exists but is not a directory"),
        ));
    }

    fs::create_dir_all(path).map_err(|e| HifdhError::storage(path, e))?;
    Ok(true)
}

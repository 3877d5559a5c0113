use std::io;
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{program} not found on PATH")]
    Missing { program: String },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Runs an external audio-control program and returns its stdout.
///
/// Implementations block until the child exits.
pub trait ToolRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ToolError>;
}

/// Spawns real processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    runtime_dir: Option<PathBuf>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point child processes at a user session's runtime directory, for
    /// running outside that session (e.g. as a system service).
    pub fn with_runtime_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.runtime_dir = dir;
        self
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ToolError> {
        let mut command = Command::new(program);
        command.args(args);
        if let Some(dir) = &self.runtime_dir {
            command
                .env("XDG_RUNTIME_DIR", dir)
                .env("DBUS_SESSION_BUS_ADDRESS", format!("unix:path={}", dir.join("bus").display()));
        }

        let output = command.output().map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ToolError::Missing {
                    program: program.to_string(),
                }
            } else {
                ToolError::Spawn {
                    program: program.to_string(),
                    source,
                }
            }
        })?;

        if !output.status.success() {
            return Err(ToolError::Failed {
                program: program.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

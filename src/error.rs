use std::path::{Path, PathBuf};
use std::process::ExitStatus;

pub type Result<T, E = BuildError> = std::result::Result<T, E>;

/// Errors surfaced by the build engine.
///
/// Config errors print as `config error: ...`, generic failures as
/// `error: ...`, and subprocess failures bubble the child's exit status up
/// to the caller.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Message(String),

    #[error("{source}: {path}", path = .path.display())]
    Io { source: std::io::Error, path: PathBuf },

    #[error(transparent)]
    Ini(#[from] ini::Error),

    #[error("command `{command}` exited with {status}")]
    Subprocess { command: String, status: ExitStatus },
}

impl BuildError {
    pub fn config(msg: impl std::fmt::Display) -> Self {
        BuildError::Config(msg.to_string())
    }

    pub fn msg(msg: impl std::fmt::Display) -> Self {
        BuildError::Message(msg.to_string())
    }

    pub fn io(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        BuildError::Io { source, path: path.as_ref().to_path_buf() }
    }

    /// Best-effort process exit code for this error: the child's exit code
    /// when known, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::Subprocess { status, .. } => status.code().unwrap_or(1),
            _ => 1,
        }
    }
}

pub(crate) trait IoResultExt<T> {
    fn with_path(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|source| BuildError::io(source, path))
    }
}

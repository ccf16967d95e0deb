use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("git command failed: {command} (exit code: {exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error(transparent)]
    Exec(#[from] canopy_exec::ExecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

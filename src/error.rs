use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures talking to an external UCI engine process.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start engine at {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("engine process has no {0} pipe")]
    MissingPipe(&'static str),

    #[error("engine I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("engine closed its output while waiting for `{0}`")]
    Closed(&'static str),

    #[error("engine did not become ready within {0:?}")]
    StartupTimeout(Duration),

    #[error("engine worker stopped unexpectedly")]
    WorkerGone,
}

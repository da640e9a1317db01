//! Crate-level error types.

use std::fmt;

#[cfg(feature = "viewer")]
use crate::gpu::render_context::RenderContextError;

/// Errors produced by the simview crate.
#[derive(Debug)]
pub enum SimviewError {
    /// The model failed validation while being built.
    InvalidModel(String),
    /// A cross reference points at an entity that does not exist.
    MissingReference {
        /// Kind of entity that was referenced (e.g. `"body"`, `"texture"`).
        kind: &'static str,
        /// The dangling index.
        index: usize,
    },
    /// The scene loader failed to produce a simulation.
    Load(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// Failed to spawn a background thread.
    ThreadSpawn(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// GPU context initialization failure.
    #[cfg(feature = "viewer")]
    Gpu(RenderContextError),
    /// Viewer event-loop failure.
    #[cfg(feature = "viewer")]
    Viewer(String),
}

impl fmt::Display for SimviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidModel(msg) => write!(f, "invalid model: {msg}"),
            Self::MissingReference { kind, index } => {
                write!(f, "missing {kind} reference: {index}")
            }
            Self::Load(msg) => write!(f, "scene load error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::ThreadSpawn(e) => {
                write!(f, "failed to spawn thread: {e}")
            }
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            #[cfg(feature = "viewer")]
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            #[cfg(feature = "viewer")]
            Self::Viewer(msg) => write!(f, "viewer error: {msg}"),
        }
    }
}

impl std::error::Error for SimviewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) | Self::ThreadSpawn(e) => Some(e),
            #[cfg(feature = "viewer")]
            Self::Gpu(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(feature = "viewer")]
impl From<RenderContextError> for SimviewError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<std::io::Error> for SimviewError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

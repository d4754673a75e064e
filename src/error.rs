//! Error types for the playback core.
//!
//! Every variant renders as the message shown to the user, so callers can
//! recover at the command boundary with `to_string()`.

use thiserror::Error;

use crate::audio::player::{Operation, PlaybackState};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// No hay transporte de audio conectado
    #[error("I'm not in a voice channel!")]
    NotInVoiceContext,

    /// La búsqueda no devolvió nada reproducible o falló la red
    #[error("Could not find a video matching the query ({reason}).")]
    ResolutionFailed { query: String, reason: String },

    /// Operación no permitida en el estado actual
    #[error("{}", .operation.rejection())]
    InvalidState {
        operation: Operation,
        state: PlaybackState,
    },

    /// Error al iniciar, pausar o detener el stream
    #[error("Audio transport failed: {0}")]
    TransportFailure(String),
}

impl PlaybackError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::TransportFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlaybackError>;

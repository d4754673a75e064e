use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::sources::Track;

/// Identidad de cada stream iniciado por la sesión
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackId(pub(crate) u64);

impl fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identidad de cada conexión de voz adjuntada a la sesión
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub(crate) u64);

/// Motivo por el que terminó un stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Completed,
    Stopped,
    Error,
}

/// Eventos asíncronos que alimentan la máquina de estados
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    TrackEnded {
        playback: PlaybackId,
        reason: EndReason,
    },
    InactivityExpired {
        playback: PlaybackId,
    },
    TransportLost {
        connection: ConnectionId,
    },
}

/// Señal de fin de stream entregada al transporte.
///
/// Se puede clonar (un handler por tipo de evento), pero todas las copias
/// comparten el mismo flag: el evento se emite como máximo una vez.
#[derive(Debug, Clone)]
pub struct EndSignal {
    playback: PlaybackId,
    events: mpsc::UnboundedSender<PlaybackEvent>,
    fired: Arc<AtomicBool>,
}

impl EndSignal {
    pub(crate) fn new(playback: PlaybackId, events: mpsc::UnboundedSender<PlaybackEvent>) -> Self {
        Self {
            playback,
            events,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn playback(&self) -> PlaybackId {
        self.playback
    }

    /// Devuelve `false` si la señal ya se había emitido
    pub fn fire(&self, reason: EndReason) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            debug!("🔁 Señal de fin duplicada para {} ignorada", self.playback);
            return false;
        }

        // Si el controlador ya no existe no hay nadie a quien avisar
        let _ = self.events.send(PlaybackEvent::TrackEnded {
            playback: self.playback,
            reason,
        });
        true
    }
}

/// Transporte de audio en tiempo real (conexión de voz).
///
/// `stop` debe ser seguro sobre un stream que ya terminó.
#[async_trait]
pub trait AudioTransport: Send + Sync {
    /// Empieza a transmitir `track`, reemplazando cualquier stream anterior
    async fn start_streaming(&self, track: &Track, on_ended: EndSignal) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn resume(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    async fn is_active(&self) -> bool;

    /// Cierra la conexión de voz
    async fn disconnect(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_signal_fires_at_most_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let signal = EndSignal::new(PlaybackId(7), tx);
        let copy = signal.clone();

        assert!(signal.fire(EndReason::Stopped));
        assert!(!copy.fire(EndReason::Completed));
        assert!(!signal.fire(EndReason::Error));

        assert_eq!(
            rx.try_recv().ok(),
            Some(PlaybackEvent::TrackEnded {
                playback: PlaybackId(7),
                reason: EndReason::Stopped,
            })
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_fire_after_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let signal = EndSignal::new(PlaybackId(1), tx);
        assert!(signal.fire(EndReason::Completed));
    }
}

use serenity::async_trait;
use songbird::{
    events::CoreEvent, tracks::PlayMode, Call, Event as VoiceEvent, EventContext,
    EventHandler as VoiceEventHandler,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::audio::{
    player::PlaybackController,
    transport::{ConnectionId, EndReason, EndSignal, PlaybackEvent},
};

/// Handler para el fin (o error) de un track: dispara su `EndSignal`
pub struct TrackEndNotifier {
    signal: EndSignal,
}

impl TrackEndNotifier {
    pub fn new(signal: EndSignal) -> Self {
        Self { signal }
    }
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        let reason = match ctx {
            EventContext::Track(track_list) => track_list
                .first()
                .map(|(state, _handle)| end_reason(&state.playing))
                .unwrap_or(EndReason::Completed),
            _ => EndReason::Completed,
        };

        if reason == EndReason::Error {
            error!("❌ Error en track {}", self.signal.playback());
        } else {
            debug!("🏁 Track {} terminó: {:?}", self.signal.playback(), reason);
        }
        self.signal.fire(reason);

        None
    }
}

fn end_reason(mode: &PlayMode) -> EndReason {
    match mode {
        PlayMode::Errored(_) => EndReason::Error,
        PlayMode::Stop => EndReason::Stopped,
        _ => EndReason::Completed,
    }
}

/// Handler para desconexiones del driver de voz
pub struct DriverDisconnectHandler {
    pub controller: Arc<PlaybackController>,
    pub connection: ConnectionId,
}

#[async_trait]
impl VoiceEventHandler for DriverDisconnectHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        if let EventContext::DriverDisconnect(data) = ctx {
            // Sin motivo = desconexión pedida por nosotros (leave)
            if data.reason.is_none() {
                debug!("🔌 Desconexión solicitada en guild {:?}", data.guild_id);
                return None;
            }

            warn!(
                "🔌 Driver de voz desconectado en guild {:?}: {:?}",
                data.guild_id, data.reason
            );
            self.controller.notify(PlaybackEvent::TransportLost {
                connection: self.connection,
            });
        }

        None
    }
}

/// Handler para reconexiones del driver
pub struct ReconnectHandler;

#[async_trait]
impl VoiceEventHandler for ReconnectHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        if let EventContext::DriverReconnect(data) = ctx {
            info!("🔄 Reconectado al canal de voz en guild {:?}", data.guild_id);
        }
        None
    }
}

/// Registra los handlers globales de la llamada para una conexión
pub fn register_voice_events(
    call: &mut Call,
    controller: Arc<PlaybackController>,
    connection: ConnectionId,
) {
    call.remove_all_global_events();

    call.add_global_event(
        VoiceEvent::Core(CoreEvent::DriverDisconnect),
        DriverDisconnectHandler {
            controller,
            connection,
        },
    );

    call.add_global_event(
        VoiceEvent::Core(CoreEvent::DriverReconnect),
        ReconnectHandler,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_reason_from_play_mode() {
        assert_eq!(end_reason(&PlayMode::End), EndReason::Completed);
        assert_eq!(end_reason(&PlayMode::Stop), EndReason::Stopped);
        assert_eq!(end_reason(&PlayMode::Play), EndReason::Completed);
    }
}

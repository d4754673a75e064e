use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serenity::model::id::GuildId;
use songbird::{
    input::{Input, YoutubeDl},
    tracks::{ControlError, PlayMode, TrackHandle},
    Call, Event, Songbird, TrackEvent,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    audio::transport::{AudioTransport, EndSignal},
    bot::events::TrackEndNotifier,
    sources::Track,
};

/// Transporte de audio sobre una llamada de voz de songbird
pub struct SongbirdTransport {
    manager: Arc<Songbird>,
    guild_id: GuildId,
    call: Arc<Mutex<Call>>,
    http_client: reqwest::Client,
    current: parking_lot::Mutex<Option<TrackHandle>>,
}

impl SongbirdTransport {
    pub fn new(
        manager: Arc<Songbird>,
        guild_id: GuildId,
        call: Arc<Mutex<Call>>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            manager,
            guild_id,
            call,
            http_client,
            current: parking_lot::Mutex::new(None),
        }
    }

    fn current(&self) -> Result<TrackHandle> {
        self.current
            .lock()
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No hay stream activo"))
    }
}

#[async_trait]
impl AudioTransport for SongbirdTransport {
    async fn start_streaming(&self, track: &Track, on_ended: EndSignal) -> Result<()> {
        // yt-dlp resuelve el stream real de forma perezosa
        let input: Input = YoutubeDl::new(self.http_client.clone(), track.source_ref().to_string()).into();

        let handle = {
            let mut call = self.call.lock().await;
            call.play_only_input(input)
        };

        handle
            .add_event(
                Event::Track(TrackEvent::End),
                TrackEndNotifier::new(on_ended.clone()),
            )
            .context("Error al registrar evento de fin de track")?;
        handle
            .add_event(Event::Track(TrackEvent::Error), TrackEndNotifier::new(on_ended))
            .context("Error al registrar evento de error de track")?;

        *self.current.lock() = Some(handle);

        info!("🎵 Stream iniciado en guild {}: {}", self.guild_id, track);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.current()?.pause().context("Error al pausar el stream")
    }

    async fn resume(&self) -> Result<()> {
        self.current()?.play().context("Error al reanudar el stream")
    }

    async fn stop(&self) -> Result<()> {
        let handle = self.current.lock().take();
        let Some(handle) = handle else {
            return Ok(());
        };

        match handle.stop() {
            Ok(()) | Err(ControlError::Finished) => Ok(()),
            Err(e) => Err(e).context("Error al detener el stream"),
        }
    }

    async fn is_active(&self) -> bool {
        let Ok(handle) = self.current() else {
            return false;
        };

        match handle.get_info().await {
            Ok(state) => matches!(state.playing, PlayMode::Play | PlayMode::Pause),
            Err(_) => false,
        }
    }

    async fn disconnect(&self) -> Result<()> {
        self.current.lock().take();

        self.manager
            .remove(self.guild_id)
            .await
            .context("Error al salir del canal de voz")?;

        debug!("👋 Llamada de voz eliminada en guild {}", self.guild_id);
        Ok(())
    }
}

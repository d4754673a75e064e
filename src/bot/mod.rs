//! # Bot Module
//!
//! Discord front end for the playback controller.
//!
//! - Prefix command parsing ([`commands`])
//! - Command execution and voice connection ([`handlers`])
//! - Songbird event handlers ([`events`])
//!
//! The bot is built around the [`QueueBot`] struct which implements
//! Serenity's [`EventHandler`] trait. Replies go to the channel where the
//! command was written; asynchronous notices (next track, timeout, lost
//! connection) go to the channel of the most recent command.

use parking_lot::Mutex;
use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Message, Ready},
    async_trait,
    http::Http,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub mod commands;
pub mod events;
pub mod handlers;

use crate::{audio::player::PlaybackController, bot::commands::Command, config::Config};

pub struct QueueBot {
    /// Bot configuration loaded from environment variables
    config: Arc<Config>,
    /// Playback state machine shared with the voice event handlers
    pub controller: Arc<PlaybackController>,
    /// HTTP client reused by yt-dlp inputs
    http_client: reqwest::Client,
    /// Canal donde se publican los avisos asíncronos
    announce_channel: Arc<Mutex<Option<ChannelId>>>,
    /// Serializa las conexiones de voz
    voice_lock: tokio::sync::Mutex<()>,
}

impl QueueBot {
    pub fn new(
        config: Config,
        controller: Arc<PlaybackController>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            config: Arc::new(config),
            controller,
            http_client,
            announce_channel: Arc::new(Mutex::new(None)),
            voice_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn announce_channel(&self) -> Arc<Mutex<Option<ChannelId>>> {
        self.announce_channel.clone()
    }
}

#[async_trait]
impl EventHandler for QueueBot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());
        info!(
            "💡 Usa {}help para ver los comandos",
            self.config.command_prefix
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let Some(command) = Command::parse(&msg.content, &self.config.command_prefix) else {
            return;
        };

        let guild_id = match allowed_guild(self.config.guild_id, msg.guild_id) {
            Ok(guild_id) => guild_id,
            Err(reason) => {
                debug!("🚫 Comando {} rechazado: {}", command.name(), reason);
                say(&ctx.http, msg.channel_id, format!("Command cannot be used: {}", reason)).await;
                return;
            }
        };

        *self.announce_channel.lock() = Some(msg.channel_id);

        let reply = match handlers::handle_command(&ctx, &msg, guild_id, command, self).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Error manejando comando: {:?}", e);
                "❌ Something went wrong while running that command.".to_string()
            }
        };

        say(&ctx.http, msg.channel_id, reply).await;
    }
}

/// Verifica que el comando venga de un servidor permitido
fn allowed_guild(restriction: Option<u64>, guild_id: Option<GuildId>) -> Result<GuildId, String> {
    let Some(guild_id) = guild_id else {
        return Err("commands only work inside a server.".to_string());
    };

    match restriction {
        Some(allowed) if guild_id.get() != allowed => {
            Err(format!("this bot is restricted to server {}.", allowed))
        }
        _ => Ok(guild_id),
    }
}

async fn say(http: &Http, channel_id: ChannelId, text: impl Into<String>) {
    if let Err(e) = channel_id.say(http, text).await {
        error!("Error al enviar mensaje: {:?}", e);
    }
}

/// Reenvía los avisos del controlador al último canal de texto usado
pub async fn forward_notices(
    http: Arc<Http>,
    channel: Arc<Mutex<Option<ChannelId>>>,
    mut notices: mpsc::UnboundedReceiver<String>,
) {
    while let Some(notice) = notices.recv().await {
        let target = *channel.lock();
        match target {
            Some(channel_id) => say(&http, channel_id, notice).await,
            None => warn!("📭 Aviso sin canal de destino: {}", notice),
        }
    }
    debug!("🛑 Canal de avisos cerrado");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_guild() {
        let guild = GuildId::new(42);

        assert_eq!(allowed_guild(None, Some(guild)), Ok(guild));
        assert_eq!(allowed_guild(Some(42), Some(guild)), Ok(guild));
        assert!(allowed_guild(Some(7), Some(guild)).is_err());
        assert!(allowed_guild(None, None).is_err());
    }
}

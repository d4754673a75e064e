use anyhow::{Context as _, Result};
use serenity::{
    model::{
        channel::Message,
        id::{ChannelId, GuildId},
    },
    prelude::Context,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    audio::{player::Status, voice::SongbirdTransport},
    bot::{commands, commands::Command, events, QueueBot},
    error::PlaybackError,
};

/// Ejecuta un comando y devuelve el texto de respuesta para el canal
pub async fn handle_command(
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    command: Command,
    bot: &QueueBot,
) -> Result<String> {
    info!(
        "📝 Comando {} usado por {} en guild {}",
        command.name(),
        msg.author.name,
        guild_id
    );

    let prefix = &bot.config.command_prefix;
    let controller = &bot.controller;

    let response = match command {
        Command::Play(None) => commands::play_usage(prefix),
        Command::Play(Some(query)) => handle_play(ctx, msg, guild_id, &query, bot).await?,
        Command::Skip => reply(controller.skip().await),
        Command::Pause => reply(controller.pause().await),
        Command::Resume => reply(controller.resume().await),
        Command::Stop => reply(controller.stop().await),
        Command::NowPlaying => {
            commands::format_now_playing(controller.currently_playing().as_ref())
        }
        Command::Queue => commands::format_queue(&controller.list_queue()),
        Command::Leave => reply(controller.leave_session().await),
        Command::Help => commands::help_text(prefix),
    };

    Ok(response)
}

async fn handle_play(
    ctx: &Context,
    msg: &Message,
    guild_id: GuildId,
    query: &str,
    bot: &QueueBot,
) -> Result<String> {
    if !bot.controller.has_transport() {
        let Some(channel_id) = author_voice_channel(ctx, msg, guild_id) else {
            return Ok("You're not in a voice channel!".to_string());
        };
        join_voice_channel(ctx, guild_id, channel_id, bot).await?;
    }

    Ok(reply(bot.controller.request_play(query).await))
}

fn reply(result: Result<Status, PlaybackError>) -> String {
    match result {
        Ok(status) => status.to_string(),
        Err(e) => format!("❌ {}", e),
    }
}

fn author_voice_channel(ctx: &Context, msg: &Message, guild_id: GuildId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&msg.author.id)
        .and_then(|state| state.channel_id)
}

/// Conecta al canal de voz y adjunta el transporte al controlador
async fn join_voice_channel(
    ctx: &Context,
    guild_id: GuildId,
    channel_id: ChannelId,
    bot: &QueueBot,
) -> Result<()> {
    let _connecting = bot.voice_lock.lock().await;
    if bot.controller.has_transport() {
        return Ok(());
    }

    let manager = songbird::get(ctx)
        .await
        .ok_or_else(|| anyhow::anyhow!("Songbird no inicializado"))?;

    let call = manager
        .join(guild_id, channel_id)
        .await
        .context("Error al conectar al canal de voz")?;

    let transport = Arc::new(SongbirdTransport::new(
        manager.clone(),
        guild_id,
        call.clone(),
        bot.http_client.clone(),
    ));
    let connection = bot.controller.attach_transport(transport);

    {
        let mut call = call.lock().await;
        if let Err(e) = call.deafen(true).await {
            warn!("⚠️ No se pudo ensordecer al bot: {:?}", e);
        }
        events::register_voice_events(&mut call, bot.controller.clone(), connection);
    }

    info!("🔊 Conectado al canal de voz {} en guild {}", channel_id, guild_id);
    Ok(())
}

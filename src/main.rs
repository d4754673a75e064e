use anyhow::{Context, Result};
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::SerenityInit;
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};

use queue_bot::{
    audio::player::PlaybackController,
    bot::{self, QueueBot},
    config::Config,
    sources::YouTubeResolver,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("queue_bot=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check().await;
    }

    info!("🎵 Iniciando Queue Bot v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;
    info!("⚙️ {}", config.summary());

    let resolver = Arc::new(YouTubeResolver::new(config.search_timeout())?);
    let (controller, notices) = PlaybackController::new(resolver, config.inactivity_timeout());

    // Cliente HTTP que songbird usa para los inputs de yt-dlp
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(20))
        .user_agent("Mozilla/5.0 (compatible; Discord Music Bot)")
        .build()
        .context("Error al crear cliente HTTP")?;

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let handler = QueueBot::new(config.clone(), controller, http_client);
    let announce_channel = handler.announce_channel();

    // Construir cliente
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird()
        .await
        .context("Error al crear el cliente de Discord")?;

    tokio::spawn(bot::forward_notices(
        client.http.clone(),
        announce_channel,
        notices,
    ));

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        shard_manager.shutdown_all().await;
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

async fn health_check() -> Result<()> {
    // yt-dlp es la única dependencia externa en tiempo de ejecución
    let yt_dlp = async_process::Command::new("yt-dlp")
        .arg("--version")
        .output()
        .await
        .context("yt-dlp no está instalado")?;

    if yt_dlp.status.success() {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("Dependencias faltantes");
    }
}

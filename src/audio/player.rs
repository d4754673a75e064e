use parking_lot::Mutex;
use std::{
    fmt,
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    audio::{
        queue::TrackQueue,
        timer::InactivityTimer,
        transport::{AudioTransport, ConnectionId, EndReason, EndSignal, PlaybackEvent, PlaybackId},
    },
    error::{PlaybackError, Result},
    sources::{is_valid_uri, Track, TrackResolver},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

/// Operaciones que dependen del estado de la sesión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Skip,
    Pause,
    Resume,
    Stop,
}

impl Operation {
    /// Mensaje para el usuario cuando la operación no aplica
    pub fn rejection(&self) -> &'static str {
        match self {
            Operation::Resume => "The audio is not paused or no audio is playing.",
            Operation::Skip | Operation::Pause | Operation::Stop => "No audio is currently playing.",
        }
    }
}

/// Resultado de una operación exitosa, listo para mostrarse en el chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    NowPlaying(Track),
    Queued { track: Track, position: usize },
    Skipped { next: Option<Track> },
    QueueFinished,
    Paused,
    Resumed,
    Stopped,
    Left,
    /// La sesión cambió mientras se preparaba el track
    Discarded(Track),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::NowPlaying(track) => write!(f, "▶️ Now playing: {}", track),
            Status::Queued { track, position } => {
                write!(f, "➕ Added to queue (#{}): {}", position, track)
            }
            Status::Skipped { next: Some(track) } => {
                write!(f, "⏭️ Skipped the current song. Now playing: {}", track)
            }
            Status::Skipped { next: None } => {
                f.write_str("⏭️ Skipped the current song. Queue is empty, nothing to play.")
            }
            Status::QueueFinished => f.write_str("📭 Queue is empty, nothing to play."),
            Status::Paused => f.write_str("⏸️ Paused the audio."),
            Status::Resumed => f.write_str("▶️ Resumed the audio."),
            Status::Stopped => f.write_str("⏹️ Stopped the audio."),
            Status::Left => f.write_str("👋 Disconnected and cleared the queue."),
            Status::Discarded(track) => write!(
                f,
                "🚮 The session was reset while preparing {}, request discarded.",
                track
            ),
        }
    }
}

struct Attached {
    connection: ConnectionId,
    transport: Arc<dyn AudioTransport>,
}

/// Stream ya comprometido en la sesión pero aún no iniciado en el transporte
struct Pending {
    playback: PlaybackId,
    track: Track,
    transport: Arc<dyn AudioTransport>,
}

enum Next {
    Start(Pending),
    Drained,
}

/// Estado único de reproducción del proceso.
///
/// `Idle` implica sin track actual, sin timer y sin stream; cada stream
/// iniciado recibe un `PlaybackId` nuevo y las señales de streams anteriores
/// se ignoran.
struct Session {
    state: PlaybackState,
    current: Option<Track>,
    playback: Option<PlaybackId>,
    queue: TrackQueue,
    timer: InactivityTimer,
    transport: Option<Attached>,
    epoch: u64,
    next_playback: u64,
    next_connection: u64,
}

impl Session {
    fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            current: None,
            playback: None,
            queue: TrackQueue::new(),
            timer: InactivityTimer::new(),
            transport: None,
            epoch: 0,
            next_playback: 0,
            next_connection: 0,
        }
    }

    fn transport(&self) -> Option<Arc<dyn AudioTransport>> {
        self.transport.as_ref().map(|attached| attached.transport.clone())
    }

    fn is_current(&self, playback: PlaybackId) -> bool {
        self.playback == Some(playback)
    }

    fn current_title(&self) -> String {
        self.current
            .as_ref()
            .map(|track| track.title().to_string())
            .unwrap_or_default()
    }

    fn begin(&mut self, track: Track) -> PlaybackId {
        self.timer.cancel();
        self.next_playback += 1;
        let playback = PlaybackId(self.next_playback);

        self.state = PlaybackState::Playing;
        self.current = Some(track);
        self.playback = Some(playback);
        playback
    }

    fn reset_to_idle(&mut self) {
        self.timer.cancel();
        self.state = PlaybackState::Idle;
        self.current = None;
        self.playback = None;
    }

    /// Decide el siguiente paso de la cola; el track sale de la cabeza aquí y solo aquí
    fn take_next(&mut self) -> Next {
        self.timer.cancel();

        let Some(transport) = self.transport() else {
            self.reset_to_idle();
            return Next::Drained;
        };

        match self.queue.dequeue_head() {
            Some(track) => {
                let playback = self.begin(track.clone());
                Next::Start(Pending {
                    playback,
                    track,
                    transport,
                })
            }
            None => {
                self.reset_to_idle();
                Next::Drained
            }
        }
    }
}

/// Controlador de reproducción: la máquina de estados de la sesión.
///
/// Toda lectura-escritura de la sesión pasa por un único lock que nunca se
/// mantiene a través de un `.await`. Las llamadas lentas (búsqueda, transporte)
/// se hacen sin lock y el resultado se revalida antes de confirmarse.
pub struct PlaybackController {
    session: Mutex<Session>,
    resolver: Arc<dyn TrackResolver>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
    notices: mpsc::UnboundedSender<String>,
    inactivity_timeout: Duration,
}

impl PlaybackController {
    /// Crea el controlador y lanza su bucle de eventos.
    ///
    /// El receptor devuelto entrega los avisos que no son respuesta directa a
    /// un comando (siguiente track, timeout, errores del transporte).
    pub fn new(
        resolver: Arc<dyn TrackResolver>,
        inactivity_timeout: Duration,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (notices_tx, notices_rx) = mpsc::unbounded_channel();

        let controller = Arc::new(Self {
            session: Mutex::new(Session::new()),
            resolver,
            events: events_tx,
            notices: notices_tx,
            inactivity_timeout,
        });

        tokio::spawn(Self::run_events(Arc::downgrade(&controller), events_rx));

        (controller, notices_rx)
    }

    async fn run_events(
        controller: Weak<Self>,
        mut events: mpsc::UnboundedReceiver<PlaybackEvent>,
    ) {
        while let Some(event) = events.recv().await {
            let Some(controller) = controller.upgrade() else {
                break;
            };
            controller.handle_event(event).await;
        }
        debug!("🛑 Bucle de eventos de reproducción terminado");
    }

    /// Adjunta la conexión de voz que usarán las siguientes reproducciones
    pub fn attach_transport(&self, transport: Arc<dyn AudioTransport>) -> ConnectionId {
        let mut session = self.session.lock();
        session.next_connection += 1;
        let connection = ConnectionId(session.next_connection);

        if session.transport.is_some() {
            warn!("🔁 Reemplazando transporte de audio existente");
        }
        session.transport = Some(Attached {
            connection,
            transport,
        });

        info!("🔊 Transporte de audio conectado");
        connection
    }

    pub fn has_transport(&self) -> bool {
        self.session.lock().transport.is_some()
    }

    /// Inyecta un evento externo (p. ej. desconexión del driver de voz)
    pub fn notify(&self, event: PlaybackEvent) {
        let _ = self.events.send(event);
    }

    pub fn state(&self) -> PlaybackState {
        self.session.lock().state
    }

    pub fn currently_playing(&self) -> Option<Track> {
        self.session.lock().current.clone()
    }

    pub fn list_queue(&self) -> Vec<Track> {
        self.session.lock().queue.snapshot()
    }

    pub fn timer_armed(&self) -> bool {
        self.session.lock().timer.is_armed()
    }

    /// Reproduce inmediatamente si la sesión está libre; si no, encola.
    pub async fn request_play(&self, query: &str) -> Result<Status> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PlaybackError::ResolutionFailed {
                query: String::new(),
                reason: "empty query".to_string(),
            });
        }

        let epoch = {
            let session = self.session.lock();
            if session.transport.is_none() {
                return Err(PlaybackError::NotInVoiceContext);
            }
            session.epoch
        };

        let track = self.resolve(query).await?;

        let pending = {
            let mut session = self.session.lock();
            if session.epoch != epoch {
                info!("🚮 Sesión reiniciada durante la búsqueda, descartando: {}", track);
                return Ok(Status::Discarded(track));
            }

            let Some(transport) = session.transport() else {
                return Err(PlaybackError::NotInVoiceContext);
            };

            if session.state != PlaybackState::Idle {
                let position = session.queue.enqueue(track.clone());
                return Ok(Status::Queued { track, position });
            }

            let playback = session.begin(track.clone());
            Pending {
                playback,
                track,
                transport,
            }
        };

        self.start(pending).await
    }

    async fn resolve(&self, query: &str) -> Result<Track> {
        if is_valid_uri(query) {
            return Ok(self.resolver.describe(query).await);
        }

        match self.resolver.resolve(query).await {
            Ok(Some(track)) => Ok(track),
            Ok(None) => Err(PlaybackError::ResolutionFailed {
                query: query.to_string(),
                reason: "no results".to_string(),
            }),
            Err(e) => {
                warn!("❌ Error al resolver '{}': {:?}", query, e);
                Err(PlaybackError::ResolutionFailed {
                    query: query.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn start(&self, pending: Pending) -> Result<Status> {
        let Pending {
            playback,
            track,
            transport,
        } = pending;

        let signal = EndSignal::new(playback, self.events.clone());
        if let Err(e) = transport.start_streaming(&track, signal).await {
            error!("❌ Error al iniciar {}: {:?}", track, e);
            let mut session = self.session.lock();
            if session.is_current(playback) {
                session.reset_to_idle();
            }
            return Err(PlaybackError::transport(e));
        }

        let (still_current, superseded) = {
            let mut session = self.session.lock();
            let still_current = session.is_current(playback);
            if still_current {
                self.arm_timer(&mut session, playback);
            }
            (still_current, session.playback.is_some())
        };

        if !still_current {
            warn!("🚮 {} dejó de ser el stream actual mientras iniciaba", track);
            // Si otro stream ya ocupa la sesión, el transporte lo reemplazará
            if !superseded {
                if let Err(e) = transport.stop().await {
                    warn!("⚠️ Error al detener stream descartado: {}", e);
                }
            }
            return Ok(Status::Discarded(track));
        }

        info!("🎵 Reproduciendo: {} ({})", track, playback);
        Ok(Status::NowPlaying(track))
    }

    fn arm_timer(&self, session: &mut Session, playback: PlaybackId) {
        let events = self.events.clone();
        session.timer.arm(self.inactivity_timeout, move || {
            let _ = events.send(PlaybackEvent::InactivityExpired { playback });
        });
    }

    /// Detiene el stream actual y avanza la cola una sola vez.
    ///
    /// Si el transporte no puede detener el stream, la sesión no cambia.
    pub async fn skip(&self) -> Result<Status> {
        let (playback, transport) = self.expect_state(Operation::Skip, PlaybackState::Playing)?;
        transport.stop().await.map_err(PlaybackError::transport)?;

        let next = {
            let mut session = self.session.lock();
            if !session.is_current(playback) {
                debug!("🔕 La sesión avanzó mientras se saltaba {}", playback);
                return Ok(Status::Skipped {
                    next: session.current.clone(),
                });
            }
            session.take_next()
        };
        info!("⏭️ Track saltado");

        let pending = match next {
            Next::Drained => return Ok(Status::Skipped { next: None }),
            Next::Start(pending) => pending,
        };

        let track = pending.track.clone();
        match self.start(pending).await {
            Ok(Status::NowPlaying(track)) => Ok(Status::Skipped { next: Some(track) }),
            Ok(other) => Ok(other),
            Err(e) => {
                // El siguiente track vuelve a la cabeza de la cola
                let mut session = self.session.lock();
                if session.state == PlaybackState::Idle {
                    session.queue.requeue_front(track);
                }
                Err(e)
            }
        }
    }

    /// Pausa sin tocar el timer de inactividad: la pausa no extiende el tiempo
    pub async fn pause(&self) -> Result<Status> {
        let (playback, transport) = self.expect_state(Operation::Pause, PlaybackState::Playing)?;
        transport.pause().await.map_err(PlaybackError::transport)?;

        let mut session = self.session.lock();
        if session.is_current(playback) && session.state == PlaybackState::Playing {
            session.state = PlaybackState::Paused;
            info!("⏸️ Reproducción pausada");
        }
        Ok(Status::Paused)
    }

    pub async fn resume(&self) -> Result<Status> {
        let (playback, transport) = self.expect_state(Operation::Resume, PlaybackState::Paused)?;
        transport.resume().await.map_err(PlaybackError::transport)?;

        let mut session = self.session.lock();
        if session.is_current(playback) && session.state == PlaybackState::Paused {
            session.state = PlaybackState::Playing;
            info!("▶️ Reproducción reanudada");
        }
        Ok(Status::Resumed)
    }

    /// Detiene el track actual; la cola se conserva
    pub async fn stop(&self) -> Result<Status> {
        let (playback, transport) = {
            let session = self.session.lock();
            match (session.state, session.playback, session.transport()) {
                (PlaybackState::Idle, _, _) => {
                    return Err(rejected(Operation::Stop, session.state));
                }
                (_, Some(playback), Some(transport)) => (playback, transport),
                _ => return Err(PlaybackError::NotInVoiceContext),
            }
        };

        transport.stop().await.map_err(PlaybackError::transport)?;

        let mut session = self.session.lock();
        if session.is_current(playback) {
            session.reset_to_idle();
            info!("⏹️ Reproducción detenida");
        }
        Ok(Status::Stopped)
    }

    /// Cierra la sesión desde cualquier estado: cola vacía, sin timer, `Idle`
    pub async fn leave_session(&self) -> Result<Status> {
        let attached = {
            let mut session = self.session.lock();
            session.epoch += 1;
            session.queue.clear();
            session.reset_to_idle();
            session.transport.take()
        };

        let Some(attached) = attached else {
            return Err(PlaybackError::NotInVoiceContext);
        };

        if attached.transport.is_active().await {
            if let Err(e) = attached.transport.stop().await {
                warn!("⚠️ Error al detener stream antes de salir: {}", e);
            }
        }
        // La sesión ya quedó liberada
        if let Err(e) = attached.transport.disconnect().await {
            warn!("⚠️ Error al desconectar el transporte: {}", e);
        }

        info!("👋 Sesión cerrada y cola limpiada");
        Ok(Status::Left)
    }

    fn expect_state(
        &self,
        operation: Operation,
        expected: PlaybackState,
    ) -> Result<(PlaybackId, Arc<dyn AudioTransport>)> {
        let session = self.session.lock();
        if session.state != expected {
            return Err(rejected(operation, session.state));
        }
        match (session.playback, session.transport()) {
            (Some(playback), Some(transport)) => Ok((playback, transport)),
            _ => Err(PlaybackError::NotInVoiceContext),
        }
    }

    /// Único punto de entrada para eventos asíncronos del transporte y del timer
    pub async fn handle_event(&self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::TrackEnded { playback, reason } => {
                self.on_track_ended(playback, reason).await
            }
            PlaybackEvent::InactivityExpired { playback } => self.on_inactivity(playback).await,
            PlaybackEvent::TransportLost { connection } => self.on_transport_lost(connection),
        }
    }

    async fn on_track_ended(&self, playback: PlaybackId, reason: EndReason) {
        // `Stopped` solo llega como respuesta a un stop pedido por el controlador,
        // que ya decidió el siguiente estado
        if reason == EndReason::Stopped {
            debug!("🔕 Fin de {} por stop ignorado", playback);
            return;
        }

        let (title, next) = {
            let mut session = self.session.lock();
            if !session.is_current(playback) {
                debug!("🔕 Fin de {} ignorado: ya no es el stream actual", playback);
                return;
            }
            (session.current_title(), session.take_next())
        };

        if reason == EndReason::Error {
            self.announce(format!("⚠️ Playback failed for {}, moving on.", title));
        } else {
            debug!("🏁 {} terminó ({:?})", title, reason);
        }
        self.announce_next(next).await;
    }

    async fn on_inactivity(&self, playback: PlaybackId) {
        let (title, transport, next) = {
            let mut session = self.session.lock();
            if !session.is_current(playback) {
                debug!("🔕 Timeout de {} ignorado: ya no es el stream actual", playback);
                return;
            }
            let transport = session.transport();
            (session.current_title(), transport, session.take_next())
        };

        warn!("⌛ Timeout de inactividad para: {}", title);
        if let Some(transport) = transport {
            if let Err(e) = transport.stop().await {
                warn!("⚠️ Error al detener track por timeout: {}", e);
            }
        }

        self.announce(format!(
            "⌛ Playback timed out after {} and stopped: {}",
            humantime::format_duration(self.inactivity_timeout),
            title
        ));
        self.announce_next(next).await;
    }

    fn on_transport_lost(&self, connection: ConnectionId) {
        {
            let mut session = self.session.lock();
            match &session.transport {
                Some(attached) if attached.connection == connection => {}
                _ => {
                    debug!("🔕 Desconexión de una conexión anterior ignorada");
                    return;
                }
            }
            session.transport = None;
            session.reset_to_idle();
        }

        error!("❌ Conexión de voz perdida, sesión en Idle");
        self.announce("⚠️ Lost the voice connection. Playback stopped; the queue was kept.");
    }

    async fn announce_next(&self, next: Next) {
        match next {
            Next::Drained => self.announce(Status::QueueFinished.to_string()),
            Next::Start(pending) => match self.start(pending).await {
                Ok(Status::Discarded(_)) => {}
                Ok(status) => self.announce(status.to_string()),
                Err(e) => self.announce(format!("❌ {}", e)),
            },
        }
    }

    fn announce(&self, text: impl Into<String>) {
        let text = text.into();
        info!("📢 {}", text);
        let _ = self.notices.send(text);
    }
}

fn rejected(operation: Operation, state: PlaybackState) -> PlaybackError {
    debug!("🚫 {:?} rechazado en estado {:?}", operation, state);
    PlaybackError::InvalidState { operation, state }
}

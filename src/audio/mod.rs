//! # Audio Module
//!
//! Playback core of the bot: one session, one FIFO queue, one stream at a time.
//!
//! ### [`player`] - Playback Controller
//! - `Idle` / `Playing` / `Paused` state machine
//! - Serializes play, skip, pause, resume, stop and leave
//! - Consumes track-end, inactivity and disconnect events
//!
//! ### [`queue`] - Queue Management
//! - Strict FIFO, only touched under the session lock
//!
//! ### [`timer`] - Inactivity Timer
//! - Cancellable countdown that force-stops the current track
//!
//! ### [`transport`] / [`voice`] - Audio Transport
//! - `AudioTransport` seam and its songbird implementation
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use queue_bot::audio::player::PlaybackController;
//! use queue_bot::sources::YouTubeResolver;
//! use std::{sync::Arc, time::Duration};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let resolver = Arc::new(YouTubeResolver::new(Duration::from_secs(10))?);
//! let (controller, _notices) = PlaybackController::new(resolver, Duration::from_secs(300));
//!
//! // Requiere un transporte adjunto (ver `voice::SongbirdTransport`)
//! let status = controller.request_play("never gonna give you up").await?;
//! println!("{status}");
//! # Ok(())
//! # }
//! ```

pub mod player;
pub mod queue;
pub mod timer;
pub mod transport;
pub mod voice;

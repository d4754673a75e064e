//! Single-session Discord music bot: one voice connection, a FIFO queue and
//! an inactivity timer around a three-state playback controller.

pub mod audio;
pub mod bot;
pub mod config;
pub mod error;
pub mod sources;

pub mod youtube;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use url::Url;

pub use youtube::YouTubeResolver;

/// Trait común para resolver peticiones de reproducción
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Convierte una búsqueda de texto libre en un track reproducible.
    ///
    /// `Ok(None)` significa que la búsqueda no produjo resultados; `Err` queda
    /// reservado para fallos de red o de parseo.
    async fn resolve(&self, query: &str) -> Result<Option<Track>>;

    /// Obtiene metadata para una URI ya válida.
    ///
    /// Nunca falla: si no hay metadata disponible se usa la propia URI como título.
    async fn describe(&self, uri: &str) -> Track {
        Track::from_uri(uri)
    }
}

/// Representa un track resuelto y listo para reproducirse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    source_ref: String,
    title: String,
}

impl Track {
    pub fn new(source_ref: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source_ref: source_ref.into(),
            title: title.into(),
        }
    }

    /// Track sin metadata: el título es la propia URI
    pub fn from_uri(uri: &str) -> Self {
        Self::new(uri, uri)
    }

    pub fn source_ref(&self) -> &str {
        &self.source_ref
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Verifica si la petición ya es una URI reproducible (esquema + host).
pub fn is_valid_uri(candidate: &str) -> bool {
    match Url::parse(candidate.trim()) {
        Ok(url) => !url.scheme().is_empty() && url.has_host(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_detection() {
        assert!(is_valid_uri("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_valid_uri("http://example.com/song.mp3"));
        assert!(is_valid_uri("  https://youtu.be/dQw4w9WgXcQ  "));
        assert!(!is_valid_uri("never gonna give you up"));
        assert!(!is_valid_uri("song2"));
        assert!(!is_valid_uri("mailto:someone@example.com"));
        assert!(!is_valid_uri(""));
    }

    #[test]
    fn test_track_from_uri_uses_uri_as_title() {
        let track = Track::from_uri("https://example.com/a.mp3");
        assert_eq!(track.source_ref(), "https://example.com/a.mp3");
        assert_eq!(track.title(), "https://example.com/a.mp3");
        assert_eq!(track.to_string(), "https://example.com/a.mp3");
    }
}

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{Track, TrackResolver};

const SEARCH_URL: &str = "https://www.youtube.com/results";
const OEMBED_URL: &str = "https://www.youtube.com/oembed";
const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Cliente de búsqueda usando scraping web de YouTube
pub struct YouTubeResolver {
    client: reqwest::Client,
    video_id: Regex,
}

/// Respuesta del endpoint oEmbed (solo nos interesa el título)
#[derive(Debug, Deserialize)]
struct OEmbed {
    title: String,
}

impl YouTubeResolver {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .context("Error al crear cliente HTTP")?;

        Ok(Self {
            client,
            video_id: Regex::new(r"watch\?v=([A-Za-z0-9_-]{11})")?,
        })
    }

    /// Extrae el primer ID de video del HTML de resultados
    fn first_video_id<'a>(&self, html: &'a str) -> Option<&'a str> {
        self.video_id
            .captures(html)
            .and_then(|cap| cap.get(1))
            .map(|id| id.as_str())
    }

    pub fn watch_url(video_id: &str) -> String {
        format!("{}{}", WATCH_URL, video_id)
    }

    async fn fetch_title(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(OEMBED_URL)
            .query(&[("url", url), ("format", "json")])
            .send()
            .await
            .context("Error en request a oEmbed")?
            .error_for_status()?;

        let oembed: OEmbed = response
            .json()
            .await
            .context("Error al parsear respuesta de oEmbed")?;

        Ok(oembed.title)
    }
}

#[async_trait]
impl TrackResolver for YouTubeResolver {
    async fn resolve(&self, query: &str) -> Result<Option<Track>> {
        info!("🔍 Buscando en YouTube: {}", query);

        let search_url = format!("{}?search_query={}", SEARCH_URL, urlencoding::encode(query));
        let html = self
            .client
            .get(&search_url)
            .send()
            .await
            .context("Error en request a YouTube")?
            .error_for_status()?
            .text()
            .await
            .context("Error leyendo respuesta")?;

        let Some(video_id) = self.first_video_id(&html) else {
            info!("📭 Sin resultados para: {}", query);
            return Ok(None);
        };

        let url = Self::watch_url(video_id);
        debug!("🎯 Primer resultado: {}", url);
        Ok(Some(self.describe(&url).await))
    }

    async fn describe(&self, uri: &str) -> Track {
        match self.fetch_title(uri).await {
            Ok(title) => Track::new(uri, title),
            Err(e) => {
                warn!("⚠️ No se pudo obtener el título de {}: {}", uri, e);
                Track::from_uri(uri)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_video_id_extraction() {
        let resolver = YouTubeResolver::new(Duration::from_secs(1)).unwrap();
        let html = r#"<a href="/shorts/abc"></a><a href="/watch?v=dQw4w9WgXcQ&pp=xyz">x</a>
            <a href="/watch?v=9bZkp7q19f0">y</a>"#;

        assert_eq!(resolver.first_video_id(html), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_no_results() {
        let resolver = YouTubeResolver::new(Duration::from_secs(1)).unwrap();
        assert_eq!(resolver.first_video_id("<html>no videos</html>"), None);
        assert_eq!(resolver.first_video_id("/watch?v=short"), None);
    }

    #[test]
    fn test_oembed_title_parsing() {
        let body = r#"{"title":"Rick Astley - Never Gonna Give You Up","author_name":"Rick Astley","type":"video"}"#;
        let oembed: OEmbed = serde_json::from_str(body).unwrap();
        assert_eq!(oembed.title, "Rick Astley - Never Gonna Give You Up");

        assert!(serde_json::from_str::<OEmbed>("<html>Not Found</html>").is_err());
        assert!(serde_json::from_str::<OEmbed>(r#"{"author_name":"x"}"#).is_err());
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(
            YouTubeResolver::watch_url("dQw4w9WgXcQ"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }
}

use crate::sources::Track;

/// Comandos de chat reconocidos por el bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `None` cuando el usuario no escribió ninguna búsqueda
    Play(Option<String>),
    Skip,
    Pause,
    Resume,
    Stop,
    NowPlaying,
    Queue,
    Leave,
    Help,
}

impl Command {
    /// Parsea un mensaje con prefijo; devuelve `None` si no es un comando conocido
    pub fn parse(content: &str, prefix: &str) -> Option<Self> {
        let rest = content.trim_start().strip_prefix(prefix)?;
        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };

        let command = match name.to_lowercase().as_str() {
            "play" | "p" => {
                Command::Play((!args.is_empty()).then(|| args.to_string()))
            }
            "skip" => Command::Skip,
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "stop" => Command::Stop,
            "now_playing" | "np" => Command::NowPlaying,
            "queue" | "q" | "queue_list" => Command::Queue,
            "leave" => Command::Leave,
            "help" | "h" => Command::Help,
            _ => return None,
        };

        Some(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Play(_) => "play",
            Command::Skip => "skip",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Stop => "stop",
            Command::NowPlaying => "now_playing",
            Command::Queue => "queue",
            Command::Leave => "leave",
            Command::Help => "help",
        }
    }
}

pub fn help_text(prefix: &str) -> String {
    let p = prefix;
    format!(
        "**Available Commands:**\n\
        `{p}leave` - Leaves the voice channel and clears the queue.\n\
        `{p}play <query>` or `{p}p <query>` - Adds a song to the queue and plays it if not already playing.\n\
        `{p}skip` - Skips the current song.\n\
        `{p}pause` - Pauses the current song.\n\
        `{p}resume` - Resumes the paused song.\n\
        `{p}stop` - Stops the current song.\n\
        `{p}now_playing` or `{p}np` - Shows the currently playing song.\n\
        `{p}queue` or `{p}q` - Shows the current queue.\n"
    )
}

pub fn play_usage(prefix: &str) -> String {
    format!("❌ Usage: `{prefix}play <url or search terms>`")
}

/// Lista numerada de la cola, desde 1
pub fn format_queue(tracks: &[Track]) -> String {
    if tracks.is_empty() {
        return "📭 The queue is empty.".to_string();
    }

    let mut message = String::from("📜 Current queue:\n");
    for (i, track) in tracks.iter().enumerate() {
        message.push_str(&format!("{}. {}\n", i + 1, track));
    }
    message
}

pub fn format_now_playing(track: Option<&Track>) -> String {
    match track {
        Some(track) => format!("🎵 Now playing: {}", track),
        None => "No audio is currently playing.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_commands_and_aliases() {
        assert_eq!(
            Command::parse("!play never gonna give you up", "!"),
            Some(Command::Play(Some("never gonna give you up".to_string())))
        );
        assert_eq!(
            Command::parse("!p https://youtu.be/x", "!"),
            Some(Command::Play(Some("https://youtu.be/x".to_string())))
        );
        assert_eq!(Command::parse("!np", "!"), Some(Command::NowPlaying));
        assert_eq!(Command::parse("!now_playing", "!"), Some(Command::NowPlaying));
        assert_eq!(Command::parse("!q", "!"), Some(Command::Queue));
        assert_eq!(Command::parse("!queue_list", "!"), Some(Command::Queue));
        assert_eq!(Command::parse("!h", "!"), Some(Command::Help));
        assert_eq!(Command::parse("!SKIP", "!"), Some(Command::Skip));
        assert_eq!(Command::parse("?leave", "?"), Some(Command::Leave));
    }

    #[test]
    fn test_play_without_query() {
        assert_eq!(Command::parse("!play", "!"), Some(Command::Play(None)));
        assert_eq!(Command::parse("!play    ", "!"), Some(Command::Play(None)));
    }

    #[test]
    fn test_ignored_messages() {
        assert_eq!(Command::parse("hello there", "!"), None);
        assert_eq!(Command::parse("!dance", "!"), None);
        assert_eq!(Command::parse("!", "!"), None);
        assert_eq!(Command::parse("?play x", "!"), None);
    }

    #[test]
    fn test_format_queue() {
        assert_eq!(format_queue(&[]), "📭 The queue is empty.");

        let tracks = vec![
            Track::new("https://example.com/1", "First"),
            Track::new("https://example.com/2", "Second"),
        ];
        assert_eq!(
            format_queue(&tracks),
            "📜 Current queue:\n1. First\n2. Second\n"
        );
    }

    #[test]
    fn test_help_uses_prefix() {
        let help = help_text("?");
        assert!(help.contains("`?play <query>`"));
        assert!(help.contains("`?np`"));
        assert!(!help.contains("`!"));
    }

    #[test]
    fn test_format_now_playing() {
        let track = Track::new("https://example.com/1", "First");
        assert_eq!(format_now_playing(Some(&track)), "🎵 Now playing: First");
        assert_eq!(format_now_playing(None), "No audio is currently playing.");
    }
}

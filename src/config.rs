use anyhow::{Context, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub guild_id: Option<u64>, // Restringe los comandos a un solo servidor
    pub command_prefix: String,

    // Reproducción
    pub inactivity_timeout_secs: u64,
    pub search_timeout_secs: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Construye la configuración a partir de una función de búsqueda de variables.
    ///
    /// Las variables vacías se tratan como ausentes.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            discord_token: var("DISCORD_TOKEN").context("DISCORD_TOKEN no está configurado")?,
            guild_id: var("GUILD_ID")
                .map(|s| s.trim().parse())
                .transpose()
                .context("GUILD_ID debe ser un ID numérico")?,
            command_prefix: var("COMMAND_PREFIX").unwrap_or(defaults.command_prefix),

            inactivity_timeout_secs: var("INACTIVITY_TIMEOUT")
                .map(|s| s.trim().parse())
                .transpose()
                .context("INACTIVITY_TIMEOUT debe ser un número de segundos")?
                .unwrap_or(defaults.inactivity_timeout_secs),
            search_timeout_secs: var("SEARCH_TIMEOUT")
                .map(|s| s.trim().parse())
                .transpose()
                .context("SEARCH_TIMEOUT debe ser un número de segundos")?
                .unwrap_or(defaults.search_timeout_secs),
        })
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Token and prefix must not be empty
    /// - The prefix must not contain whitespace
    /// - Timeouts must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("Discord token must not be empty");
        }

        if self.command_prefix.is_empty() {
            anyhow::bail!("Command prefix must not be empty");
        }

        if self.command_prefix.chars().any(char::is_whitespace) {
            anyhow::bail!(
                "Command prefix must not contain whitespace, got: {:?}",
                self.command_prefix
            );
        }

        if self.inactivity_timeout_secs == 0 {
            anyhow::bail!("Inactivity timeout must be greater than 0");
        }

        if self.search_timeout_secs == 0 {
            anyhow::bail!("Search timeout must be greater than 0");
        }

        Ok(())
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Excludes the Discord token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: prefix {:?} (Guild: {})\n  \
            Playback: {} inactivity timeout, {} search timeout",
            self.command_prefix,
            self.guild_id.map_or("any".to_string(), |id| id.to_string()),
            humantime::format_duration(self.inactivity_timeout()),
            humantime::format_duration(self.search_timeout()),
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            guild_id: None,
            command_prefix: "!".to_string(),

            inactivity_timeout_secs: 300, // 5 minutos
            search_timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_only_token() {
        let config = Config::from_lookup(lookup(&[("DISCORD_TOKEN", "secret")])).unwrap();

        assert_eq!(config.discord_token, "secret");
        assert_eq!(config.guild_id, None);
        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.inactivity_timeout(), Duration::from_secs(300));
        assert_eq!(config.search_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_all_variables() {
        let config = Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "secret"),
            ("GUILD_ID", "123456789"),
            ("COMMAND_PREFIX", "?"),
            ("INACTIVITY_TIMEOUT", "60"),
            ("SEARCH_TIMEOUT", " 5 "),
        ]))
        .unwrap();

        assert_eq!(config.guild_id, Some(123456789));
        assert_eq!(config.command_prefix, "?");
        assert_eq!(config.inactivity_timeout_secs, 60);
        assert_eq!(config.search_timeout_secs, 5);
    }

    #[test]
    fn test_missing_token_fails() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("DISCORD_TOKEN", "  ")])).is_err());
    }

    #[test]
    fn test_invalid_numbers_fail() {
        assert!(Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "secret"),
            ("GUILD_ID", "not-a-number"),
        ]))
        .is_err());
        assert!(Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "secret"),
            ("INACTIVITY_TIMEOUT", "5m"),
        ]))
        .is_err());
    }

    #[test]
    fn test_validation_rules() {
        let base = Config {
            discord_token: "secret".to_string(),
            ..Config::default()
        };
        assert!(base.validate().is_ok());

        let zero_timeout = Config {
            inactivity_timeout_secs: 0,
            ..base.clone()
        };
        assert!(zero_timeout.validate().is_err());

        let spaced_prefix = Config {
            command_prefix: "! ".to_string(),
            ..base.clone()
        };
        assert!(spaced_prefix.validate().is_err());

        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn test_summary_hides_token() {
        let config = Config {
            discord_token: "super-secret-token".to_string(),
            guild_id: Some(42),
            ..Config::default()
        };

        let summary = config.summary();
        assert!(!summary.contains("super-secret-token"));
        assert!(summary.contains("Guild: 42"));
        assert!(summary.contains("5m inactivity timeout"));
    }
}

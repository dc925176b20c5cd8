use std::path::PathBuf;

use clap::Parser;
use kiosk_core::ConfigError;
use kiosk_core::KioskConfig;

/// Looping transmission kiosk for the terminal.
#[derive(Debug, Parser)]
#[command(name = "kiosk", version)]
pub struct Cli {
    /// TOML configuration file. Every setting has a default.
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Listing endpoint, overriding `feed.endpoint`.
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Seconds between listing polls, overriding `feed.poll_interval_ms`.
    #[arg(long = "poll-interval", value_name = "SECS")]
    pub poll_interval_secs: Option<u64>,

    /// Directory for `kiosk.log`. Defaults to the user cache directory.
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    /// Loads the config file (if any) and applies the command-line overrides.
    pub fn load_config(&self) -> Result<KioskConfig, ConfigError> {
        let mut config = KioskConfig::load(self.config.as_deref())?;
        if let Some(endpoint) = &self.endpoint {
            config.feed.endpoint = endpoint.clone();
        }
        if let Some(secs) = self.poll_interval_secs {
            config.feed.poll_interval_ms = secs.saturating_mul(1_000);
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        match Cli::try_parse_from(args) {
            Ok(cli) => cli,
            Err(err) => panic!("arguments should parse: {err}"),
        }
    }

    #[test]
    fn overrides_replace_defaults() {
        let cli = parse(&[
            "kiosk",
            "--endpoint",
            "http://localhost:9000/list",
            "--poll-interval",
            "5",
        ]);
        let config = cli.load_config();
        let Ok(config) = config else {
            panic!("config should load");
        };
        assert_eq!(config.feed.endpoint, "http://localhost:9000/list");
        assert_eq!(config.feed.poll_interval_ms, 5_000);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let cli = parse(&["kiosk", "--poll-interval", "0"]);
        assert!(matches!(cli.load_config(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn no_flags_means_defaults() {
        let cli = parse(&["kiosk"]);
        assert_eq!(cli.load_config().ok(), Some(KioskConfig::default()));
    }
}

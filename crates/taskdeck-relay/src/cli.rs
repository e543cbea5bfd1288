use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};

/// `KEY=VALUE` pair given with `--rc`.
#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskdeck-relay",
    version,
    about = "Local OAuth callback relay for the taskdeck frontend"
)]
pub struct RelayCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Address to listen on (default: relay.host)
    #[arg(long = "host")]
    pub host: Option<String>,

    /// Port to listen on (default: relay.port)
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Frontend URL the authorization code is handed to
    #[arg(long = "forward-url")]
    pub forward_url: Option<String>,

    /// rc file to load instead of `TASKDECKRC` / `~/.taskdeckrc`
    #[arg(long = "config", alias = "taskdeckrc")]
    pub config: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    #[arg(
        long = "rc",
        value_name = "KEY=VALUE",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,
}

impl RelayCli {
    /// Command line flags expressed as rc overrides, applied after `--rc`.
    pub fn overrides(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .rc_overrides
            .iter()
            .map(|kv| (kv.key.clone(), kv.value.clone()))
            .collect();
        if let Some(host) = &self.host {
            out.push(("relay.host".to_string(), host.clone()));
        }
        if let Some(port) = self.port {
            out.push(("relay.port".to_string(), port.to_string()));
        }
        if let Some(url) = &self.forward_url {
            out.push(("relay.forward_url".to_string(), url.clone()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_win_over_rc_pairs() {
        let cli = RelayCli::parse_from([
            "taskdeck-relay",
            "--rc",
            "relay.port=9000",
            "--port",
            "9100",
            "-vv",
        ]);
        assert_eq!(cli.verbose, 2);
        let overrides = cli.overrides();
        assert_eq!(overrides.first(), Some(&("relay.port".to_string(), "9000".to_string())));
        assert_eq!(overrides.last(), Some(&("relay.port".to_string(), "9100".to_string())));
    }

    #[test]
    fn keyval_requires_equals() {
        assert!("relay.host".parse::<KeyVal>().is_err());
        let kv: KeyVal = " relay.host = 0.0.0.0 ".parse().unwrap();
        assert_eq!((kv.key.as_str(), kv.value.as_str()), ("relay.host", "0.0.0.0"));
    }
}

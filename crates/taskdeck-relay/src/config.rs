use anyhow::{Context, anyhow};
use taskdeck_core::config::Config;
use tokio::net::TcpListener;
use url::Url;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_FORWARD_URL: &str = "http://localhost:3001/auth/callback";

/// Listen address and forward target for the callback relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub forward_url: Url,
}

impl RelayConfig {
    /// Reads `relay.host`, `relay.port` and `relay.forward_url`.
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let host = cfg
            .get("relay.host")
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = cfg
            .get_u16("relay.port")
            .context("invalid relay.port")?
            .unwrap_or(DEFAULT_PORT);
        let raw = cfg
            .get("relay.forward_url")
            .unwrap_or_else(|| DEFAULT_FORWARD_URL.to_string());
        let forward_url = Url::parse(&raw).with_context(|| format!("invalid relay.forward_url: {raw}"))?;
        if forward_url.cannot_be_a_base() {
            return Err(anyhow!("relay.forward_url must be an absolute http(s) URL: {raw}"));
        }
        Ok(Self {
            host,
            port,
            forward_url,
        })
    }

    /// Binds the listener. The host may be an IP literal or a name such
    /// as `localhost`, resolved through the system resolver.
    pub async fn bind(&self) -> anyhow::Result<TcpListener> {
        TcpListener::bind((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("failed to bind {}", self.listen_label()))
    }

    pub fn listen_label(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `forward_url` with the callback parameters appended.
    pub fn forward_target(&self, code: &str, state: Option<&str>) -> String {
        let mut url = self.forward_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("code", code);
            pairs.append_pair("state", state.unwrap_or_default());
        }
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_builtin_rc() {
        let cfg = RelayConfig::from_config(&Config::default()).unwrap();
        assert_eq!(cfg.forward_url.as_str(), DEFAULT_FORWARD_URL);
        assert_eq!(cfg.listen_label(), "127.0.0.1:8080");
    }

    #[test]
    fn rejects_bad_port_and_url() {
        let mut rc = Config::default();
        rc.set("relay.port", "eighty");
        assert!(RelayConfig::from_config(&rc).is_err());

        let mut rc = Config::default();
        rc.set("relay.forward_url", "not a url");
        assert!(RelayConfig::from_config(&rc).is_err());
    }

    #[tokio::test]
    async fn host_names_resolve_when_binding() {
        let mut rc = Config::default();
        rc.set("relay.host", "localhost");
        rc.set("relay.port", "0");
        let cfg = RelayConfig::from_config(&rc).unwrap();
        assert_eq!(cfg.host, "localhost");

        let listener = cfg.bind().await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }

    #[test]
    fn forward_target_encodes_params() {
        let cfg = RelayConfig::from_config(&Config::default()).unwrap();
        assert_eq!(
            cfg.forward_target("a b&c", Some("s/1")),
            "http://localhost:3001/auth/callback?code=a+b%26c&state=s%2F1"
        );
        assert_eq!(
            cfg.forward_target("abc", None),
            "http://localhost:3001/auth/callback?code=abc&state="
        );
    }
}

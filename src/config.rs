use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub static_dir: String,
    /// Empty means the relay routes sit at the root.
    pub relay_prefix: String,
    pub mailbox_capacity: usize,
    /// Zero disables stale-peer eviction.
    pub peer_ttl: Duration,
    pub sweep_interval: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|val| val.trim().parse::<u64>().ok());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            static_dir: lookup("STATIC_DIR").unwrap_or(defaults.static_dir),
            relay_prefix: lookup("RELAY_PREFIX")
                .map(|prefix| normalize_prefix(&prefix))
                .unwrap_or(defaults.relay_prefix),
            mailbox_capacity: parsed("MAILBOX_CAPACITY")
                .map(|cap| (cap as usize).max(1))
                .unwrap_or(defaults.mailbox_capacity),
            peer_ttl: parsed("PEER_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.peer_ttl),
            sweep_interval: parsed("SWEEP_INTERVAL_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn eviction_enabled(&self) -> bool {
        !self.peer_ttl.is_zero()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3737,
            static_dir: "static".to_string(),
            relay_prefix: "/webrtc".to_string(),
            mailbox_capacity: 256,
            peer_ttl: Duration::from_secs(120),
            sweep_interval: Duration::from_secs(30),
        }
    }
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]);
        assert_eq!(config.bind_addr(), "0.0.0.0:3737");
        assert_eq!(config.relay_prefix, "/webrtc");
        assert_eq!(config.mailbox_capacity, 256);
        assert!(config.eviction_enabled());
    }

    #[test]
    fn reads_overrides_and_ignores_garbage() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("RELAY_PREFIX", "signal/"),
            ("MAILBOX_CAPACITY", "0"),
            ("PEER_TTL_SECS", "0"),
            ("SWEEP_INTERVAL_SECS", "soon"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.relay_prefix, "/signal");
        assert_eq!(config.mailbox_capacity, 1);
        assert!(!config.eviction_enabled());
        assert_eq!(config.sweep_interval, Duration::from_secs(30));
    }
}

//! Loader configuration.

use std::str::FromStr;

use crate::error::LoaderError;

/// Default capacity of the state-change broadcast channel.
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Tunables for a [`ScriptLoader`](crate::loader::ScriptLoader).
///
/// The defaults give the standard behaviour: every reconnect moves the
/// loader to `CONNECTED` and immediately starts a forced reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Buffer size of the state-change channel.
    pub event_capacity: usize,
    /// Start a load pass automatically when the transport connects.
    pub reload_on_connect: bool,
    /// Whether that automatic pass skips existence checks.
    pub force_on_connect: bool,
    /// Spawn a [`StateLogger`](scriptcache_events::StateLogger) for this loader.
    pub log_transitions: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            reload_on_connect: true,
            force_on_connect: true,
            log_transitions: false,
        }
    }
}

impl LoaderConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                           | Default |
    /// |-----------------------------------|---------|
    /// | `SCRIPT_LOADER_EVENT_CAPACITY`    | `256`   |
    /// | `SCRIPT_LOADER_RELOAD_ON_CONNECT` | `true`  |
    /// | `SCRIPT_LOADER_FORCE_ON_CONNECT`  | `true`  |
    /// | `SCRIPT_LOADER_LOG_TRANSITIONS`   | `false` |
    pub fn from_env() -> Result<Self, LoaderError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoaderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let event_capacity: usize = parse_var(
            &lookup,
            "SCRIPT_LOADER_EVENT_CAPACITY",
            defaults.event_capacity,
        )?;
        if event_capacity == 0 {
            return Err(LoaderError::Config {
                key: "SCRIPT_LOADER_EVENT_CAPACITY",
                value: "0".into(),
            });
        }

        Ok(Self {
            event_capacity,
            reload_on_connect: flag_var(
                &lookup,
                "SCRIPT_LOADER_RELOAD_ON_CONNECT",
                defaults.reload_on_connect,
            )?,
            force_on_connect: flag_var(
                &lookup,
                "SCRIPT_LOADER_FORCE_ON_CONNECT",
                defaults.force_on_connect,
            )?,
            log_transitions: flag_var(
                &lookup,
                "SCRIPT_LOADER_LOG_TRANSITIONS",
                defaults.log_transitions,
            )?,
        })
    }
}

// ---- private helpers ----

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, LoaderError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| LoaderError::Config { key, value: raw }),
    }
}

fn flag_var<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, LoaderError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(LoaderError::Config { key, value: raw }),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = LoaderConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LoaderConfig::default());
        assert!(config.reload_on_connect);
        assert!(config.force_on_connect);
        assert!(!config.log_transitions);
    }

    #[test]
    fn overrides_are_applied() {
        let config = LoaderConfig::from_lookup(lookup(&[
            ("SCRIPT_LOADER_EVENT_CAPACITY", "16"),
            ("SCRIPT_LOADER_RELOAD_ON_CONNECT", "no"),
            ("SCRIPT_LOADER_FORCE_ON_CONNECT", "0"),
            ("SCRIPT_LOADER_LOG_TRANSITIONS", " TRUE "),
        ]))
        .unwrap();

        assert_eq!(config.event_capacity, 16);
        assert!(!config.reload_on_connect);
        assert!(!config.force_on_connect);
        assert!(config.log_transitions);
    }

    #[test]
    fn malformed_values_are_errors() {
        assert_matches!(
            LoaderConfig::from_lookup(lookup(&[("SCRIPT_LOADER_EVENT_CAPACITY", "lots")])),
            Err(LoaderError::Config { key: "SCRIPT_LOADER_EVENT_CAPACITY", .. })
        );
        assert_matches!(
            LoaderConfig::from_lookup(lookup(&[("SCRIPT_LOADER_RELOAD_ON_CONNECT", "maybe")])),
            Err(LoaderError::Config { key: "SCRIPT_LOADER_RELOAD_ON_CONNECT", .. })
        );
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert_matches!(
            LoaderConfig::from_lookup(lookup(&[("SCRIPT_LOADER_EVENT_CAPACITY", "0")])),
            Err(LoaderError::Config { .. })
        );
    }
}

//! # Server Configuration
//!
//! [`ServerConfig`] is read from a YAML (`.yaml`/`.yml`) or TOML (`.toml`)
//! file and then overridden from the environment:
//!
//! | Variable              | Field           | Example         |
//! |-----------------------|-----------------|-----------------|
//! | `ARBOR_ADDR`          | `address`       | `:3000`         |
//! | `ARBOR_DISPATCH_MODE` | `dispatch_mode` | `automatic`     |
//! | `ARBOR_STACK_SIZE`    | `stack_size`    | `0x8000`        |
//!
//! ```yaml
//! address: "127.0.0.1:8080"
//! dispatch_mode: automatic
//! stack_size: 0x8000
//! ```

use std::path::Path;

use anyhow::{anyhow, bail, Context as _};
use serde::{Deserialize, Deserializer, Serialize};

use crate::dispatcher::DispatchMode;
use crate::runtime_config::{parse_stack_size, RuntimeConfig, DEFAULT_STACK_SIZE, STACK_SIZE_ENV};

/// Address used when none is configured.
pub const DEFAULT_ADDRESS: &str = "0.0.0.0:8080";

pub const ADDR_ENV: &str = "ARBOR_ADDR";
pub const DISPATCH_MODE_ENV: &str = "ARBOR_DISPATCH_MODE";

/// Settings for the bundled HTTP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address; a bare `:port` binds every interface
    pub address: String,
    pub dispatch_mode: DispatchMode,
    /// Coroutine stack size in bytes
    #[serde(deserialize_with = "deserialize_stack_size")]
    pub stack_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            dispatch_mode: DispatchMode::default(),
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl ServerConfig {
    /// Read a config file, choosing the format by extension.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, has an unknown extension, or does
    /// not parse.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read server config: {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let mut config: ServerConfig = match extension.as_deref() {
            Some("yaml" | "yml") => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse server config: {}", path.display()))?,
            Some("toml") => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse server config: {}", path.display()))?,
            _ => bail!(
                "Unsupported config format for {} (expected .yaml, .yml or .toml)",
                path.display()
            ),
        };
        config.address = normalize_address(&config.address);
        Ok(config)
    }

    /// Load `path` if given, otherwise start from defaults, then apply the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Propagates [`load`](Self::load) and override errors.
    pub fn resolve(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override fields from `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Fails on an unknown dispatch mode or an unparseable stack size.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(ADDR_ENV).filter(|a| !a.trim().is_empty()) {
            self.address = normalize_address(&addr);
        }
        if let Some(mode) = lookup(DISPATCH_MODE_ENV) {
            self.dispatch_mode = mode
                .parse()
                .map_err(|e: String| anyhow!(e))
                .with_context(|| format!("Invalid {DISPATCH_MODE_ENV}"))?;
        }
        if let Some(size) = lookup(STACK_SIZE_ENV) {
            self.stack_size = parse_stack_size(&size)
                .ok_or_else(|| anyhow!("Invalid {STACK_SIZE_ENV}: `{size}`"))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn runtime(&self) -> RuntimeConfig {
        RuntimeConfig {
            stack_size: self.stack_size,
        }
    }
}

/// Expand `:port` to `0.0.0.0:port`; an empty address becomes the default.
#[must_use]
pub fn normalize_address(address: &str) -> String {
    let address = address.trim();
    if address.is_empty() {
        DEFAULT_ADDRESS.to_string()
    } else if address.starts_with(':') {
        format!("0.0.0.0{address}")
    } else {
        address.to_string()
    }
}

fn deserialize_stack_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(usize),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => parse_stack_size(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid stack size `{s}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address(":3000"), "0.0.0.0:3000");
        assert_eq!(normalize_address(""), DEFAULT_ADDRESS);
        assert_eq!(normalize_address("127.0.0.1:80"), "127.0.0.1:80");
    }

    #[test]
    fn test_overrides_take_precedence() {
        let env: HashMap<&str, &str> = [
            (ADDR_ENV, ":9090"),
            (DISPATCH_MODE_ENV, "automatic"),
            (STACK_SIZE_ENV, "0x8000"),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.address, "0.0.0.0:9090");
        assert_eq!(config.dispatch_mode, DispatchMode::Automatic);
        assert_eq!(config.stack_size, 0x8000);
    }

    #[test]
    fn test_bad_override_is_an_error() {
        let mut config = ServerConfig::default();
        let err = config
            .apply_overrides(|k| (k == DISPATCH_MODE_ENV).then(|| "sideways".to_string()))
            .unwrap_err();
        assert!(format!("{err:#}").contains("sideways"));
    }
}

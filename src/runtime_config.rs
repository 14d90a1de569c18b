//! # Runtime Configuration Module
//!
//! Coroutine runtime settings read from the environment.
//!
//! ## Environment Variables
//!
//! ### `ARBOR_STACK_SIZE`
//!
//! Stack size for request coroutines. Accepts values in:
//! - Decimal: `16384` (16 KB)
//! - Hexadecimal: `0x4000` (16 KB)
//!
//! Default: `0x4000` (16 KB). Unparseable values fall back to the default.
//!
//! Memory used by the runtime grows with `stack_size × concurrent requests`,
//! so handlers with deep call chains need a larger value and everything else
//! should stay small.
//!
//! ```bash
//! export ARBOR_STACK_SIZE=0x8000
//! ```

use std::env;

/// Environment variable holding the coroutine stack size.
pub const STACK_SIZE_ENV: &str = "ARBOR_STACK_SIZE";

/// Default coroutine stack size (16 KB).
pub const DEFAULT_STACK_SIZE: usize = 0x4000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = env::var(STACK_SIZE_ENV)
            .ok()
            .and_then(|v| parse_stack_size(&v))
            .unwrap_or(DEFAULT_STACK_SIZE);
        Self { stack_size }
    }

    /// Push the settings into the global `may` configuration.
    ///
    /// Must run before the server spawns its first coroutine.
    pub fn apply(&self) {
        may::config().set_stack_size(self.stack_size);
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal size.
#[must_use]
pub fn parse_stack_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stack_size_accepts_hex_and_decimal() {
        assert_eq!(parse_stack_size("0x4000"), Some(0x4000));
        assert_eq!(parse_stack_size("0X8000"), Some(0x8000));
        assert_eq!(parse_stack_size(" 32768 "), Some(32768));
        assert_eq!(parse_stack_size("big"), None);
        assert_eq!(parse_stack_size("0xzz"), None);
    }
}

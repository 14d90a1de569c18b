//! Structured logging setup.
//!
//! Everything in the crate logs through `tracing`; this module installs the
//! subscriber for binaries that want one:
//!
//! - `EnvFilter` from `RUST_LOG`, else `ARBOR_LOG_LEVEL`
//! - a [`SamplingLayer`] that thins out low-severity events
//! - a JSON (production) or pretty (development) `fmt` layer
//! - optionally a non-blocking writer from `tracing-appender`
//!
//! | Variable                     | Default   |
//! |------------------------------|-----------|
//! | `ARBOR_LOG_LEVEL`            | `info`    |
//! | `ARBOR_LOG_FORMAT`           | `json`    |
//! | `ARBOR_LOG_SAMPLING_MODE`    | `all`     |
//! | `ARBOR_LOG_SAMPLING_RATE`    | `1.0`     |
//! | `ARBOR_LOG_ASYNC`            | `false`   |
//! | `ARBOR_LOG_TARGET_FILTER`    | unset     |
//! | `ARBOR_LOG_INCLUDE_LOCATION` | `false`   |

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use tracing::{Level, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Unknown values fall back to JSON.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("pretty") {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

/// Which events survive the sampling layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    /// Log everything
    All,
    /// Log only WARN and ERROR
    ErrorOnly,
    /// Keep every WARN/ERROR and a fraction of the rest
    Sampled,
}

impl SamplingMode {
    /// Unknown values fall back to [`SamplingMode::All`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "error-only" | "error_only" => SamplingMode::ErrorOnly,
            "sampled" => SamplingMode::Sampled,
            _ => SamplingMode::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    pub sampling_mode: SamplingMode,
    /// Fraction (0.0-1.0) of sub-WARN events kept in `Sampled` mode
    pub sampling_rate: f64,
    /// Write through a background thread
    pub async_logging: bool,
    /// Extra comma-separated `EnvFilter` directives
    pub target_filter: Option<String>,
    /// Include file:line location
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            sampling_mode: SamplingMode::All,
            sampling_rate: 1.0,
            async_logging: false,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Read `ARBOR_LOG_*` from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    ///
    /// Missing or unparseable values keep their defaults.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            log_level: lookup("ARBOR_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: lookup("ARBOR_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(defaults.format),
            sampling_mode: lookup("ARBOR_LOG_SAMPLING_MODE")
                .map(|s| SamplingMode::parse(&s))
                .unwrap_or(defaults.sampling_mode),
            sampling_rate: lookup("ARBOR_LOG_SAMPLING_RATE")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.sampling_rate),
            async_logging: lookup("ARBOR_LOG_ASYNC")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.async_logging),
            target_filter: lookup("ARBOR_LOG_TARGET_FILTER").filter(|s| !s.trim().is_empty()),
            include_location: lookup("ARBOR_LOG_INCLUDE_LOCATION")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.include_location),
        }
    }

    /// Verbose, human-readable settings for local runs.
    #[must_use]
    pub fn development() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            include_location: true,
            ..Self::default()
        }
    }
}

/// Sampling layer: decides whether to emit an event based on its level
pub struct SamplingLayer {
    mode: SamplingMode,
    sampling_rate: f64,
    counter: AtomicU64,
}

impl SamplingLayer {
    #[must_use]
    pub fn new(mode: SamplingMode, sampling_rate: f64) -> Self {
        Self {
            mode,
            sampling_rate: sampling_rate.clamp(0.0, 1.0),
            counter: AtomicU64::new(0),
        }
    }

    fn should_sample(&self, level: &Level) -> bool {
        let severe = matches!(*level, Level::WARN | Level::ERROR);
        match self.mode {
            SamplingMode::All => true,
            SamplingMode::ErrorOnly => severe,
            SamplingMode::Sampled if severe => true,
            SamplingMode::Sampled => {
                if self.sampling_rate <= 0.0 {
                    return false;
                }
                let interval = (1.0 / self.sampling_rate).round().max(1.0) as u64;
                self.counter.fetch_add(1, Ordering::Relaxed) % interval == 0
            }
        }
    }
}

impl<S> Layer<S> for SamplingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: LayerContext<'_, S>) -> bool {
        // spans are never sampled away, or their events lose their context
        !metadata.is_event() || self.should_sample(metadata.level())
    }
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.trim().to_ascii_lowercase()));

    // may_minihttp logs every client disconnect at info
    if let Ok(directive) = "may_minihttp=warn".parse() {
        filter = filter.add_directive(directive);
    }

    if let Some(targets) = &config.target_filter {
        for directive in targets.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(_) => eprintln!("Warning: Invalid log filter directive: {directive}"),
            }
        }
    }
    filter
}

/// Install the global subscriber.
///
/// With `async_logging` the returned guard owns the background writer;
/// keep it alive for the life of the process or buffered lines are lost.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let (writer, guard) = if config.async_logging {
        let (nb, guard) = tracing_appender::non_blocking(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(nb), Some(guard))
    } else {
        (
            tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout),
            None,
        )
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(SamplingLayer::new(config.sampling_mode, config.sampling_rate))
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_lookup_reads_every_variable() {
        let vars: HashMap<&str, &str> = [
            ("ARBOR_LOG_LEVEL", "debug"),
            ("ARBOR_LOG_FORMAT", "pretty"),
            ("ARBOR_LOG_SAMPLING_MODE", "sampled"),
            ("ARBOR_LOG_SAMPLING_RATE", "0.25"),
            ("ARBOR_LOG_ASYNC", "true"),
            ("ARBOR_LOG_TARGET_FILTER", "arbor=trace"),
            ("ARBOR_LOG_INCLUDE_LOCATION", "true"),
        ]
        .into_iter()
        .collect();

        let config = LogConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.sampling_mode, SamplingMode::Sampled);
        assert_eq!(config.sampling_rate, 0.25);
        assert!(config.async_logging);
        assert_eq!(config.target_filter.as_deref(), Some("arbor=trace"));
        assert!(config.include_location);
    }

    #[test]
    fn test_from_lookup_keeps_defaults_on_garbage() {
        let config = LogConfig::from_lookup(|k| match k {
            "ARBOR_LOG_SAMPLING_RATE" | "ARBOR_LOG_ASYNC" => Some("nope".to_string()),
            _ => None,
        });
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn test_parse_fallbacks() {
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("xml"), LogFormat::Json);
        assert_eq!(SamplingMode::parse("error_only"), SamplingMode::ErrorOnly);
        assert_eq!(SamplingMode::parse("whatever"), SamplingMode::All);
    }

    #[test]
    fn test_error_only_drops_info() {
        let layer = SamplingLayer::new(SamplingMode::ErrorOnly, 1.0);
        assert!(!layer.should_sample(&Level::INFO));
        assert!(layer.should_sample(&Level::WARN));
        assert!(layer.should_sample(&Level::ERROR));
    }

    #[test]
    fn test_sampled_keeps_every_nth_event() {
        let layer = SamplingLayer::new(SamplingMode::Sampled, 0.25);
        let kept = (0..100).filter(|_| layer.should_sample(&Level::DEBUG)).count();
        assert_eq!(kept, 25);
        assert!((0..10).all(|_| layer.should_sample(&Level::ERROR)));
    }

    #[test]
    fn test_zero_rate_drops_everything_but_errors() {
        let layer = SamplingLayer::new(SamplingMode::Sampled, -1.0);
        assert!(!layer.should_sample(&Level::INFO));
        assert!(layer.should_sample(&Level::ERROR));
    }
}

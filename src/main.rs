use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use arbor::config::{normalize_address, ServerConfig};
use arbor::logging::{init_logging, LogConfig};
use arbor::middleware::{MetricsMiddleware, Middleware, TracingMiddleware};
use arbor::server::{self, RouterService};
use arbor::{Context, DispatchMode, Registry};
use clap::Parser;
use http::StatusCode;
use serde_json::json;
use tracing::{info, warn};

/// Demo server for the arbor router
#[derive(Parser)]
#[command(name = "arbor", version, about = "arbor demo server", long_about = None)]
struct Cli {
    /// Server config file (.yaml, .yml or .toml)
    #[arg(short, long, env = "ARBOR_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, e.g. `127.0.0.1:8080` or `:8080`
    #[arg(short, long)]
    addr: Option<String>,

    /// Middleware dispatch mode: `automatic` or `manual`
    #[arg(short, long)]
    mode: Option<DispatchMode>,

    /// Print the compiled route trees and exit
    #[arg(long, default_value_t = false)]
    dump_routes: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::resolve(cli.config.as_deref())?;
    if let Some(addr) = &cli.addr {
        config.address = normalize_address(addr);
    }
    if let Some(mode) = cli.mode {
        config.dispatch_mode = mode;
    }

    // Hold the guard so buffered log lines are flushed on exit
    let _log_guard = init_logging(&LogConfig::from_env())?;
    config.runtime().apply();

    let metrics = Arc::new(MetricsMiddleware::new());
    let registry = demo_registry(config.dispatch_mode, Arc::clone(&metrics));
    let (dispatcher, rejected) = registry.build_with_report();
    for err in &rejected {
        warn!(error = %err, "Demo route rejected");
    }

    if cli.dump_routes {
        print!("{}", dispatcher.table().dump_routes());
        return Ok(());
    }

    let service = RouterService::new(dispatcher);
    let handle = server::start(service, config.address.as_str())
        .with_context(|| format!("Failed to start server on {}", config.address))?;
    handle
        .wait_ready()
        .context("Server did not start accepting connections")?;
    info!(
        addr = %handle.addr(),
        dispatch_mode = %config.dispatch_mode,
        stack_size = config.stack_size,
        "arbor ready"
    );

    wait_for_shutdown()?;

    info!(
        requests = metrics.request_count(),
        errors = metrics.error_count(),
        avg_latency_us = metrics.average_latency().as_micros(),
        "Shutting down"
    );
    handle.stop();
    Ok(())
}

fn demo_registry(mode: DispatchMode, metrics: Arc<MetricsMiddleware>) -> Registry {
    let metrics: Arc<dyn Middleware> = metrics;
    let mut registry = Registry::new();
    registry
        .set_mode(mode)
        .attach("/", Arc::new(TracingMiddleware))
        .attach("/", metrics)
        .use_middleware("/users", |ctx: &mut Context<'_>| {
            let tenant = ctx.header("x-tenant").unwrap_or("public").to_string();
            ctx.set("tenant", tenant);
            ctx.next()
        });

    registry
        .get("/", |ctx: &mut Context<'_>| {
            ctx.send_text(StatusCode::OK, "arbor\n");
            Ok(())
        })
        .get("/health", |ctx: &mut Context<'_>| {
            ctx.send_json(StatusCode::OK, &json!({ "status": "ok" }))?;
            Ok(())
        })
        .get("/users", |ctx: &mut Context<'_>| {
            let tenant = ctx.get::<String>("tenant").cloned().unwrap_or_default();
            ctx.send_json(
                StatusCode::OK,
                &json!({ "tenant": tenant, "users": [{ "id": 1 }, { "id": 2 }] }),
            )?;
            Ok(())
        })
        .get("/users/:id", |ctx: &mut Context<'_>| {
            let id: u64 = ctx.param_as("id")?;
            ctx.send_json(StatusCode::OK, &json!({ "id": id }))?;
            Ok(())
        })
        .get(r"/users/:id/posts/:|\d+|", |ctx: &mut Context<'_>| {
            let user = ctx.param("id").unwrap_or_default().to_string();
            let post: u64 = ctx.regex_param_as(1)?;
            ctx.send_json(StatusCode::OK, &json!({ "user": user, "post": post }))?;
            Ok(())
        })
        .get(r"/archive/:year|\d{4}|/:month|\d{2}|", |ctx: &mut Context<'_>| {
            let body = json!({ "params": ctx.named_params() });
            ctx.send_json(StatusCode::OK, &body)?;
            Ok(())
        })
        .get("/search", |ctx: &mut Context<'_>| {
            let q = ctx.query("q").unwrap_or_default();
            let limit: usize = ctx.query_as("limit").unwrap_or(10);
            ctx.send_json(StatusCode::OK, &json!({ "q": q, "limit": limit }))?;
            Ok(())
        })
        .post("/echo", |ctx: &mut Context<'_>| {
            let body = ctx.body().to_vec();
            ctx.status(StatusCode::OK)
                .set_header("content-type", "application/octet-stream")?;
            ctx.write(&body);
            Ok(())
        })
        .get("/old-users", |ctx: &mut Context<'_>| {
            ctx.redirect(301, "/users")?;
            Ok(())
        });
    registry
}

#[cfg(unix)]
fn wait_for_shutdown() -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("Failed to register signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutdown signal received");
    }
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown() -> anyhow::Result<()> {
    loop {
        std::thread::park();
    }
}

//! Stripegate server - S3-compatible streaming read gateway.
//!
//! Serves `GET /{bucket}/{object}` over the in-memory backend, streaming
//! object data in stripe-unit chunks with backpressure and cooperative
//! shutdown. Optionally seeds the backend from a local directory at boot
//! so the binary has something to serve.
//!
//! # Usage
//!
//! ```text
//! GATEWAY_LISTEN=0.0.0.0:8330 SEED_DIR=./data stripegate-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8330` | Bind address |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//! | `SEED_DIR` | *(unset)* | Directory loaded into the backend at boot |
//!
//! See `GatewayConfig` for the read-pipeline tunables.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use stripegate_engine::{MemoryBackend, MemoryPool, ObjectSpec};
use stripegate_gateway::{Gateway, GatewayConfig, ShutdownSignal};
use stripegate_http::GatewayHttpService;
use stripegate_model::LayoutTable;

/// Server version reported in health check responses.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config
/// value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Load a seed directory into the backend: each top-level directory is a
/// bucket, and files below it become objects keyed by their relative path.
fn seed_backend(backend: &MemoryBackend, dir: &Path) -> Result<usize> {
    let mut loaded = 0;
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("cannot read seed directory {}", dir.display()))?;

    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let bucket = entry.file_name().to_string_lossy().into_owned();
        backend.create_bucket(&bucket);
        loaded += seed_bucket(backend, &bucket, &entry.path(), "")?;
    }

    Ok(loaded)
}

fn seed_bucket(backend: &MemoryBackend, bucket: &str, dir: &Path, prefix: &str) -> Result<usize> {
    let mut loaded = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let key = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        if entry.file_type()?.is_dir() {
            loaded += seed_bucket(backend, bucket, &entry.path(), &key)?;
        } else {
            let data = std::fs::read(entry.path())
                .with_context(|| format!("cannot read seed file {}", entry.path().display()))?;
            backend.put_object(bucket, &key, Bytes::from(data), ObjectSpec::default());
            loaded += 1;
        }
    }
    Ok(loaded)
}

/// Run the accept loop, serving connections until a shutdown signal is
/// received. On the signal the gateway begins quiescing and in-flight
/// connections are drained.
async fn serve(
    listener: TcpListener,
    service: GatewayHttpService,
    shutdown: ShutdownSignal,
) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let signal = async {
        tokio::signal::ctrl_c().await.ok();
    };
    tokio::pin!(signal);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut signal => {
                info!("received shutdown signal, quiescing");
                shutdown.begin_quiesce();
                break;
            }
        }
    }

    // Wait for in-flight requests to wind down.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Perform a health check by connecting to the gateway and requesting the
/// health endpoint. Exits with code 0 if healthy, 1 otherwise.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"status\":\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let config = GatewayConfig::from_env();
        let addr = config.listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let config = GatewayConfig::from_env();

    init_tracing(&config.log_level)?;

    info!(
        listen = %config.listen,
        units_per_request = config.units_per_request,
        pool_capacity = config.pool_capacity,
        version = VERSION,
        "starting stripegate server",
    );

    let pool = MemoryPool::new(config.pool_capacity);
    let layouts = Arc::new(LayoutTable::default());
    let backend = MemoryBackend::new(Arc::clone(&pool), Arc::clone(&layouts));

    if let Some(seed_dir) = &config.seed_dir {
        let loaded = seed_backend(&backend, Path::new(seed_dir))?;
        info!(seed_dir = %seed_dir, objects = loaded, "seeded backend");
    }

    let shutdown = ShutdownSignal::new();
    let gateway = Arc::new(Gateway::new(
        backend.engine(),
        backend.catalog(),
        backend.catalog(),
        layouts,
        pool,
        Arc::new(config.clone()),
        shutdown.clone(),
    ));
    let service = GatewayHttpService::new(gateway);

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service, shutdown).await
}

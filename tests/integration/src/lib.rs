//! End-to-end tests for the stripegate gateway.
//!
//! Each test starts a full server (hyper service over the in-memory
//! backend) on an ephemeral port and drives it through the AWS S3 SDK,
//! exercising the real HTTP surface: headers, statuses, range semantics,
//! and streamed bodies.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Once;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;

use stripegate_engine::{MemoryBackend, MemoryPool};
use stripegate_gateway::{Gateway, GatewayConfig, ShutdownSignal};
use stripegate_http::GatewayHttpService;
use stripegate_model::LayoutTable;

mod test_get_object;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A running gateway bound to an ephemeral port, plus its backend for
/// seeding objects.
pub struct TestServer {
    /// The bound address.
    pub addr: SocketAddr,
    /// The in-memory backend behind the gateway.
    pub backend: MemoryBackend,
    /// The process shutdown signal.
    pub shutdown: ShutdownSignal,
}

/// Start a server with default configuration.
pub async fn start_server() -> TestServer {
    start_server_with(GatewayConfig::default()).await
}

/// Start a server with the given configuration.
pub async fn start_server_with(config: GatewayConfig) -> TestServer {
    init_tracing();

    let pool = MemoryPool::new(config.pool_capacity);
    let layouts = Arc::new(LayoutTable::default());
    let backend = MemoryBackend::new(Arc::clone(&pool), Arc::clone(&layouts));
    let shutdown = ShutdownSignal::new();
    let gateway = Arc::new(Gateway::new(
        backend.engine(),
        backend.catalog(),
        backend.catalog(),
        layouts,
        pool,
        Arc::new(config),
        shutdown.clone(),
    ));
    let service = GatewayHttpService::new(gateway);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        let http = HttpConnBuilder::new(TokioExecutor::new());
        loop {
            let Ok((stream, _peer)) = listener.accept().await else {
                break;
            };
            let svc = service.clone();
            let conn = http.serve_connection(TokioIo::new(stream), svc).into_owned();
            tokio::spawn(async move {
                let _ = conn.await;
            });
        }
    });

    TestServer {
        addr,
        backend,
        shutdown,
    }
}

/// Create an S3 client pointing at the test server.
#[must_use]
pub fn s3_client(addr: SocketAddr) -> aws_sdk_s3::Client {
    let creds = Credentials::new("test", "test", None, None, "integration-test");

    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(creds)
        .endpoint_url(format!("http://{addr}"))
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(config)
}

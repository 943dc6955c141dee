//! The hyper `Service` fronting the gateway.
//!
//! Routing is deliberately small: health probes, then `GET /{bucket}/{key}`
//! into the GET-object action. The action runs on its own task and streams
//! through the reply handle; the service future returns as soon as the
//! response head is available, so the body streams while hyper writes it.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::StatusCode;
use hyper::body::Incoming;
use hyper::service::Service;
use tracing::{debug, warn};

use stripegate_gateway::{Gateway, RequestContext};

use crate::body::ReplyBody;
use crate::reply::HyperReply;

/// How a request path resolves.
#[derive(Debug, PartialEq, Eq)]
enum Route {
    /// A health probe.
    Health,
    /// An object address: bucket and key.
    Object(String, String),
    /// Anything else.
    Unknown,
}

/// Resolve a request path. Object keys may contain `/`.
fn route(path: &str) -> Route {
    if path == "/health" || path == "/_health" {
        return Route::Health;
    }
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    match trimmed.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
            Route::Object(bucket.to_owned(), key.to_owned())
        }
        _ => Route::Unknown,
    }
}

/// JSON health probe body.
fn health_response() -> http::Response<ReplyBody> {
    http::Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(ReplyBody::from_bytes(
            r#"{"status":"running","service":"stripegate"}"#,
        ))
        .expect("static health response should be valid")
}

/// A bare status response for requests outside the S3 surface.
fn plain_status(status: StatusCode) -> http::Response<ReplyBody> {
    http::Response::builder()
        .status(status)
        .body(ReplyBody::empty())
        .expect("static response should be valid")
}

/// Stamp the common headers every response carries.
fn add_common_headers(
    mut response: http::Response<ReplyBody>,
    request_id: &str,
) -> http::Response<ReplyBody> {
    let headers = response.headers_mut();
    if let Ok(hv) = http::header::HeaderValue::from_str(request_id) {
        headers.insert("x-amz-request-id", hv);
    }
    headers.insert(
        "Server",
        http::header::HeaderValue::from_static("Stripegate"),
    );
    response
}

/// The hyper service for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayHttpService {
    gateway: Arc<Gateway>,
}

impl GatewayHttpService {
    /// Create a service over a shared gateway.
    #[must_use]
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

impl Service<http::Request<Incoming>> for GatewayHttpService {
    type Response = http::Response<ReplyBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let gateway = Arc::clone(&self.gateway);
        Box::pin(async move { Ok(handle_request(gateway, &req).await) })
    }
}

/// Process one request through routing and the GET action.
async fn handle_request(
    gateway: Arc<Gateway>,
    req: &http::Request<Incoming>,
) -> http::Response<ReplyBody> {
    let method = req.method().clone();
    let path = req.uri().path();
    debug!(%method, path, "incoming request");

    let (bucket, key) = match route(path) {
        Route::Health if method == http::Method::GET => return health_response(),
        Route::Health | Route::Unknown => return plain_status(StatusCode::BAD_REQUEST),
        Route::Object(..) if method != http::Method::GET => {
            return plain_status(StatusCode::METHOD_NOT_ALLOWED);
        }
        Route::Object(bucket, key) => (bucket, key),
    };

    let range_header = req
        .headers()
        .get(http::header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let ctx = RequestContext::new(bucket, key, range_header);
    let request_id = ctx.request_id.clone();

    let (reply, head_rx) = HyperReply::channel();
    tokio::spawn(async move {
        gateway.get_object(ctx, reply).await;
    });

    match head_rx.await {
        Ok(response) => add_common_headers(response, &request_id),
        Err(_) => {
            warn!(request_id, "action finished without sending a response head");
            add_common_headers(
                plain_status(StatusCode::INTERNAL_SERVER_ERROR),
                &request_id,
            )
        }
    }
}

//! HTTP server module
//!
//! A hyper HTTP/1 accept loop with minimal dispatch. Each connection runs on
//! its own task; each request runs the pipeline to completion on that task.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tubely_ingest::server::{AppState, Server};
//!
//! # async fn example(state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
//! let server = Server::bind(state).await?;
//! println!("listening on {}", server.local_addr());
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod handlers;

use crate::auth::Authenticator;
use crate::config::Config;
use crate::error::ApiError;
use crate::pipeline::UploadPipeline;
use crate::store::VideoStore;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info, Instrument};

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(String),

    #[error("Server error: {0}")]
    RuntimeError(String),
}

/// Shared, read-only request context
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: UploadPipeline,
    pub videos: Arc<dyn VideoStore>,
    pub auth: Arc<dyn Authenticator>,
}

/// HTTP server bound to `server.address`
pub struct Server {
    state: Arc<AppState>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Bind the configured address. Port 0 lets the OS pick one.
    pub async fn bind(state: Arc<AppState>) -> Result<Self, ServerError> {
        let addr: SocketAddr = state
            .config
            .server
            .address
            .parse()
            .map_err(|e| ServerError::BindError(format!("Invalid address: {}", e)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("Failed to bind to {}: {}", addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(format!("Failed to get local address: {}", e)))?;

        info!("Server bound to {}", local_addr);

        Ok(Self {
            state,
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until Ctrl-C
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
    }

    /// Serve until `shutdown` resolves. In-flight connections keep running on
    /// their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        info!("Starting server on {}", self.local_addr);
        tokio::pin!(shutdown);

        loop {
            let (stream, peer_addr) = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down server");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                }
            };

            let state = Arc::clone(&self.state);

            tokio::spawn(async move {
                let io = TokioIo::new(stream);

                let service = service_fn(move |req| {
                    let state = Arc::clone(&state);
                    async move { Ok::<_, Infallible>(handle_request(req, state).await) }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection from {}: {}", peer_addr, e);
                }
            });
        }
    }
}

/// Dispatch a request to its handler.
///
/// * `GET /health`
/// * `POST /api/video_upload/{videoID}`
/// * `GET /api/videos/{videoID}`
///
/// Everything else is a JSON 404.
pub async fn handle_request<B>(req: Request<B>, state: Arc<AppState>) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes> + Send + Unpin + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http.request",
        http.method = %method,
        http.target = %path,
        http.status_code = tracing::field::Empty,
    );

    async move {
        let result = match (&method, route(&path)) {
            (&Method::GET, Route::Health) => Ok(handlers::health()),
            (&Method::POST, Route::UploadVideo(id)) => {
                handlers::upload_video(&state, req, id).await
            }
            (&Method::GET, Route::Video(id)) => {
                handlers::get_video(&state, req.headers(), id).await
            }
            _ => Err(ApiError::not_found("Not Found")),
        };

        let response = result.unwrap_or_else(ApiError::into_response);
        tracing::Span::current().record("http.status_code", response.status().as_u16());
        info!(status = response.status().as_u16(), "Handled {} {}", method, path);
        response
    }
    .instrument(span)
    .await
}

#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    Health,
    UploadVideo(&'a str),
    Video(&'a str),
    Unknown,
}

fn route(path: &str) -> Route<'_> {
    if path == "/health" {
        return Route::Health;
    }
    if let Some(id) = single_segment(path, "/api/video_upload/") {
        return Route::UploadVideo(id);
    }
    if let Some(id) = single_segment(path, "/api/videos/") {
        return Route::Video(id);
    }
    Route::Unknown
}

/// The remainder of `path` after `prefix`, if it is one non-empty segment
fn single_segment<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    path.strip_prefix(prefix)
        .filter(|rest| !rest.is_empty() && !rest.contains('/'))
}

//! Prometheus Metrics HTTP Server
//!
//! Serves the default registry on `/metrics` for scraping, separate from the
//! API listener.
//!
//! # Example
//!
//! ```no_run
//! use tubely_ingest::config::MetricsConfig;
//! use tubely_ingest::metrics::server::MetricsServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MetricsConfig {
//!         enabled: true,
//!         address: "127.0.0.1:9090".to_string(),
//!     };
//!     let mut server = MetricsServer::from_config(&config);
//!     let addr = server.start().await?;
//!     println!("Metrics server listening on {}", addr);
//!     Ok(())
//! }
//! ```

use crate::config::MetricsConfig;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, TextEncoder};
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Metrics server error
#[derive(Debug, thiserror::Error)]
pub enum MetricsServerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Prometheus metrics HTTP server
pub struct MetricsServer {
    address: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl MetricsServer {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            shutdown_tx: None,
            server_handle: None,
        }
    }

    pub fn from_config(config: &MetricsConfig) -> Self {
        Self::new(config.address.clone())
    }

    /// Start the metrics server
    ///
    /// Returns the actual bound address (useful when using port 0)
    pub async fn start(&mut self) -> Result<SocketAddr, MetricsServerError> {
        let listener = TcpListener::bind(&self.address).await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);
        self.server_handle = Some(tokio::spawn(run_server(listener, shutdown_rx)));

        tracing::info!(address = %addr, "Metrics server listening");
        Ok(addr)
    }

    /// Shutdown the metrics server
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.server_handle.take() {
            let _ = handle.await;
        }
    }
}

async fn run_server(listener: TcpListener, mut shutdown_rx: oneshot::Receiver<()>) {
    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                break;
            }
            result = listener.accept() => {
                match result {
                    Ok((stream, _)) => {
                        let io = TokioIo::new(stream);
                        tokio::spawn(async move {
                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service_fn(handle_request::<Incoming>))
                                .await
                            {
                                tracing::debug!(error = %e, "Metrics connection error");
                            }
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to accept metrics connection"),
                }
            }
        }
    }
}

async fn handle_request<B>(req: Request<B>) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => metrics_handler(),
        (&Method::GET, "/health") => {
            text_response(StatusCode::OK, "application/json", r#"{"status":"ok"}"#)
        }
        _ => text_response(StatusCode::NOT_FOUND, "text/plain", "Not Found"),
    };
    Ok(response)
}

fn metrics_handler() -> Response<Full<Bytes>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return text_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "text/plain",
            "Failed to encode metrics",
        );
    }

    let mut response = Response::new(Full::new(Bytes::from(buffer)));
    if let Ok(value) = HeaderValue::from_str(encoder.format_type()) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response
}

fn text_response(
    status: StatusCode,
    content_type: &'static str,
    body: &'static str,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

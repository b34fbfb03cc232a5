// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Metrics exposition endpoint.
//!
//! A minimal hyper server: `GET /metrics` renders the default Prometheus
//! registry in text exposition format, everything else is a 404. Scrapes
//! only read the gauges, so they never contend with the pollers.

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{http, Method, Request, Response, StatusCode};
use prometheus::{Encoder, TextEncoder};
use std::io;
use std::net::SocketAddr;
use tracing::{error, info};

const METRICS_ENDPOINT_PATH: &str = "/metrics";

/// Serve the scrape endpoint until the process is killed.
pub async fn serve(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("metrics endpoint listening on port {port}");

    let server = hyper::server::conn::http1::Builder::new();
    let service = service_fn(scrape_handler);
    let mut joinset = tokio::task::JoinSet::new();

    loop {
        let conn = tokio::select! {
            accepted = listener.accept() => match accepted {
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::ConnectionAborted
                            | io::ErrorKind::ConnectionReset
                            | io::ErrorKind::ConnectionRefused
                    ) =>
                {
                    continue;
                }
                Err(e) => {
                    error!("server error: {e}");
                    return Err(e.into());
                }
                Ok((conn, _)) => conn,
            },
            finished = async {
                match joinset.join_next().await {
                    Some(finished) => finished,
                    None => std::future::pending().await,
                }
            } => match finished {
                Err(e) if e.is_panic() => {
                    // Don't kill the server on panic - log and continue
                    error!("connection handler panicked: {e:?}");
                    continue;
                }
                Ok(()) | Err(_) => continue,
            },
        };

        let conn = hyper_util::rt::TokioIo::new(conn);
        let server = server.clone();
        let service = service.clone();
        joinset.spawn(async move {
            if let Err(e) = server.serve_connection(conn, service).await {
                error!("connection error: {e}");
            }
        });
    }
}

async fn scrape_handler(req: Request<Incoming>) -> http::Result<Response<Full<Bytes>>> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, METRICS_ENDPOINT_PATH) => {
            let encoder = TextEncoder::new();
            let mut buffer = Vec::new();
            if let Err(err) = encoder.encode(&prometheus::gather(), &mut buffer) {
                error!(error = %err, "failed to encode metrics");
                return Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Full::default());
            }
            Response::builder()
                .status(StatusCode::OK)
                .header(hyper::header::CONTENT_TYPE, encoder.format_type())
                .body(Full::new(Bytes::from(buffer)))
        }
        _ => {
            let mut not_found = Response::default();
            *not_found.status_mut() = StatusCode::NOT_FOUND;
            Ok(not_found)
        }
    }
}

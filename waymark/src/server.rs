//! HTTP server loop.

use std::convert::Infallible;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use http::Request;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;

use crate::app::Application;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Accepts connections until Ctrl-C, then drains open connections.
pub async fn serve(app: Application, listener: TcpListener) -> std::io::Result<()> {
    let app = Arc::new(app);
    let graceful = GracefulShutdown::new();
    let mut ctrl_c = pin!(tokio::signal::ctrl_c());

    tracing::info!(
        addr = %listener.local_addr()?,
        endpoints = app.endpoints().len(),
        "waymark listening"
    );

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, remote) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let app = Arc::clone(&app);
                let service = service_fn(move |req: Request<Incoming>| {
                    let app = Arc::clone(&app);
                    async move { Ok::<_, Infallible>(app.handle(req).await) }
                });

                let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
                let conn = graceful.watch(conn);
                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        tracing::warn!(error = %e, %remote, "connection error");
                    }
                });
            }
            _ = &mut ctrl_c => {
                tracing::info!("shutdown signal received");
                break;
            }
        }
    }

    drop(listener);
    tokio::select! {
        _ = graceful.shutdown() => tracing::info!("all connections closed"),
        _ = tokio::time::sleep(SHUTDOWN_GRACE) => {
            tracing::warn!("timed out waiting for connections to close");
        }
    }
    Ok(())
}

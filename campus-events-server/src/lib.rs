//! The hyper accept loop shared by the back end and the front end.

use core::convert::Infallible;
use core::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::pin_mut;
use http::{Request, Response};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::net::TcpListener;
use tokio::select;
use tokio::sync::watch;
use tracing::{debug, error, warn};

/// Serves every connection accepted on `listener` with `handler` until
/// `shutdown` resolves, then waits for the open connections to finish.
#[allow(clippy::cognitive_complexity)]
pub async fn serve<H, Fut>(listener: TcpListener, handler: H, shutdown: impl Future<Output = ()>)
where
    H: Fn(Request<Incoming>) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Response<Full<Bytes>>> + Send + 'static,
{
    // tell the connections to shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let shutdown_tx = Arc::new(shutdown_tx);

    // wait for the connections to finish shutdown
    let (closed_tx, closed_rx) = watch::channel(());

    pin_mut!(shutdown);

    #[allow(clippy::redundant_pub_crate)]
    loop {
        select! {
            accept = listener.accept() => {
                let (socket, remote_addr): (_, SocketAddr) = match accept {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        warn!("failed to accept connection: {err}");
                        continue;
                    }
                };
                debug!(%remote_addr, "accepted connection");

                let handler = handler.clone();
                let shutdown_tx = Arc::clone(&shutdown_tx);
                let closed_rx = closed_rx.clone();

                tokio::spawn(async move {
                    let socket = TokioIo::new(socket);

                    let hyper_service = hyper::service::service_fn(move |request: Request<Incoming>| {
                        let response = handler(request);
                        async move { Ok::<_, Infallible>(response.await) }
                    });

                    let builder = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new());
                    let connection = builder.serve_connection(socket, hyper_service);
                    pin_mut!(connection);

                    select! {
                        connection_result = connection.as_mut() => {
                            if let Err(err) = connection_result {
                                error!("failed to serve connection: {err:#}");
                            }
                        }
                        () = shutdown_tx.closed() => {
                            connection.as_mut().graceful_shutdown();
                            if let Err(err) = connection.as_mut().await {
                                error!("failed to shut down connection: {err:#}");
                            }
                        }
                    }

                    drop(closed_rx);
                });
            }
            () = &mut shutdown => {
                warn!("shutting down");
                drop(shutdown_rx); // initiate shutdown
                drop(closed_rx);
                closed_tx.closed().await;
                break;
            }
        }
    }
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
#[allow(clippy::redundant_pub_crate)]
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt as _;
    use tokio::sync::oneshot;

    use super::*;

    async fn echo_path(request: Request<Incoming>) -> Response<Full<Bytes>> {
        Response::new(Full::new(Bytes::from(request.uri().path().to_owned())))
    }

    #[tokio::test]
    async fn serves_until_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, echo_path, async move {
            let _ = stop_rx.await;
        }));

        let stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .unwrap();
        let connection = tokio::spawn(connection);
        let request = Request::builder()
            .uri("/events")
            .header(http::header::HOST, addr.to_string())
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = sender.send_request(request).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"/events");

        stop_tx.send(()).unwrap();
        drop(sender);
        server.await.unwrap();
        assert!(connection.await.is_ok());
    }
}

// Server loop module
// Accepts connections until shutdown is requested, then drains

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::error::StartupError;
use crate::logger;

/// How long in-flight connections get to finish after shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Accept connections until `shutdown` is notified.
///
/// The listener is closed as soon as shutdown is seen; connections already
/// accepted get `DRAIN_TIMEOUT` to complete.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
) -> Result<(), StartupError> {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        // Transient accept failures (EMFILE and friends) must not kill the server
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = shutdown.notified() => {
                break;
            }
        }
    }

    let addr = listener.local_addr()?;
    drop(listener);
    logger::log_info(&format!("Listener on {addr} closed"));
    drain_connections(&active_connections).await;
    Ok(())
}

/// Wait until no connection is active or the drain timeout passes
async fn drain_connections(active_connections: &AtomicUsize) {
    let deadline = tokio::time::Instant::now() + DRAIN_TIMEOUT;
    loop {
        let active = active_connections.load(Ordering::SeqCst);
        if active == 0 {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "{active} connections still open after {}s, closing anyway",
                DRAIN_TIMEOUT.as_secs()
            ));
            return;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::create_reusable_listener;
    use http_body_util::{BodyExt, Empty};
    use hyper::body::Bytes;
    use hyper_util::client::legacy::Client;
    use hyper_util::rt::TokioExecutor;

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
                let addr = listener.local_addr().unwrap();
                let state = Arc::new(AppState::new(&crate::config::test_config()));
                let active = Arc::new(AtomicUsize::new(0));
                let shutdown = Arc::new(Notify::new());

                let server = tokio::task::spawn_local(start_server_loop(
                    listener,
                    state,
                    Arc::clone(&active),
                    Arc::clone(&shutdown),
                ));

                let client = Client::builder(TokioExecutor::new()).build_http::<Empty<Bytes>>();
                let resp = client
                    .get(format!("http://{addr}/nothing-here").parse().unwrap())
                    .await
                    .unwrap();
                assert_eq!(resp.status(), 200);
                let body = resp.into_body().collect().await.unwrap().to_bytes();
                assert!(String::from_utf8_lossy(&body).contains("Can't find /nothing-here"));
                drop(client);

                shutdown.notify_one();
                server.await.unwrap().unwrap();
                assert!(tokio::net::TcpStream::connect(addr).await.is_err());
            })
            .await;
    }
}

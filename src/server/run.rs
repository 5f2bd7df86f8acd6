// Serve module
// Runs the accept loop until a signal or a failed background task stops it

use std::process::ExitCode;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::{start_server_loop, Rejections, SignalHandler, FATAL_EXIT_CODE};
use crate::config::AppState;
use crate::error::StartupError;
use crate::logger;

/// Serve until a signal or a failed background task stops the server.
///
/// Both stop the listener gracefully; a rejection exits with
/// [`FATAL_EXIT_CODE`]. Must run inside a `LocalSet`.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    signals: Arc<SignalHandler>,
    mut rejections: Rejections,
) -> Result<ExitCode, StartupError> {
    let shutdown = Arc::new(Notify::new());
    let active_connections = Arc::new(AtomicUsize::new(0));

    let server = start_server_loop(listener, state, active_connections, Arc::clone(&shutdown));
    tokio::pin!(server);

    let code = tokio::select! {
        result = &mut server => {
            result?;
            return Ok(ExitCode::SUCCESS);
        }
        () = signals.shutdown.notified() => ExitCode::SUCCESS,
        Some(rejection) = rejections.recv() => {
            logger::log_unhandled_rejection(rejection.task, &rejection.message);
            ExitCode::from(FATAL_EXIT_CODE)
        }
    };

    shutdown.notify_one();
    server.await?;
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{create_reusable_listener, Supervisor};
    use std::time::Duration;

    async fn run_with<F>(trigger: F) -> (ExitCode, std::net::SocketAddr)
    where
        F: FnOnce(&Supervisor, &SignalHandler),
    {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async move {
                let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
                let addr = listener.local_addr().unwrap();
                let state = Arc::new(AppState::new(&crate::config::test_config()));
                let signals = Arc::new(SignalHandler::new());
                let (supervisor, rejections) = Supervisor::new();

                let server = tokio::task::spawn_local(serve(
                    listener,
                    state,
                    Arc::clone(&signals),
                    rejections,
                ));
                assert!(tokio::net::TcpStream::connect(addr).await.is_ok());

                trigger(&supervisor, &signals);
                let code = tokio::time::timeout(Duration::from_secs(10), server)
                    .await
                    .unwrap()
                    .unwrap()
                    .unwrap();
                (code, addr)
            })
            .await
    }

    #[tokio::test]
    async fn test_failed_task_stops_server_with_fatal_code() {
        let (code, addr) = run_with(|supervisor, _| {
            supervisor.spawn("database", async { Err::<(), _>("connection refused") });
        })
        .await;

        assert_eq!(code, ExitCode::from(FATAL_EXIT_CODE));
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_signal_exits_cleanly() {
        let (code, addr) = run_with(|_, signals| signals.shutdown.notify_one()).await;

        assert_eq!(code, ExitCode::SUCCESS);
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }
}

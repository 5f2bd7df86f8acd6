// Process supervision module
// Panics end the process; background task failures trigger a graceful stop

use std::fmt::Display;
use std::future::Future;

use tokio::sync::mpsc;

use crate::logger;

/// Exit code used for every fatal failure
pub const FATAL_EXIT_CODE: u8 = 1;

/// Log any panic as an uncaught exception and exit immediately.
///
/// Call once, before the runtime starts.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        logger::log_uncaught_exception(&info.to_string());
        std::process::exit(i32::from(FATAL_EXIT_CODE));
    }));
}

/// A background task that finished with an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub task: &'static str,
    pub message: String,
}

/// Spawns background tasks and reports their failures
#[derive(Clone)]
pub struct Supervisor {
    tx: mpsc::UnboundedSender<Rejection>,
}

/// Receiving side; the main task waits on it next to the server
pub struct Rejections {
    rx: mpsc::UnboundedReceiver<Rejection>,
}

impl Supervisor {
    pub fn new() -> (Self, Rejections) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, Rejections { rx })
    }

    /// Run `task` on the runtime; an `Err` result is reported as a rejection
    pub fn spawn<F, E>(&self, name: &'static str, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            if let Err(e) = task.await {
                // Receiver gone means the process is already shutting down
                let _ = tx.send(Rejection {
                    task: name,
                    message: e.to_string(),
                });
            }
        });
    }
}

impl Rejections {
    /// Next failure; `None` once every supervised task and the supervisor
    /// are gone
    pub async fn recv(&mut self) -> Option<Rejection> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_task_is_reported() {
        let (supervisor, mut rejections) = Supervisor::new();
        supervisor.spawn("ok", async { Ok::<(), String>(()) });
        supervisor.spawn("db", async { Err::<(), _>("connection refused") });

        let rejection = rejections.recv().await.unwrap();
        assert_eq!(
            rejection,
            Rejection {
                task: "db",
                message: "connection refused".to_string(),
            }
        );

        drop(supervisor);
        assert!(rejections.recv().await.is_none());
    }
}

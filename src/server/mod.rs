// Server module entry point
// Listener setup, connection serving, signals and process supervision

pub mod connection;
pub mod listener;
pub mod run;
pub mod signal;
pub mod supervisor;

// `loop` is a keyword, so the module is exposed as server_loop
#[path = "loop.rs"]
pub mod server_loop;

pub use listener::create_reusable_listener;
pub use run::serve;
pub use server_loop::start_server_loop;
pub use signal::{start_signal_handler, SignalHandler};
pub use supervisor::{install_panic_hook, Rejection, Rejections, Supervisor, FATAL_EXIT_CODE};

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use storefront::config::{AppState, Config};
use storefront::error::StartupError;
use storefront::logger;
use storefront::pipeline::rate_limit;
use storefront::server::{self, SignalHandler, Supervisor};

/// How often expired rate-limit windows are pruned
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn main() -> ExitCode {
    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("[ERROR] Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logger::init(&cfg) {
        eprintln!("[ERROR] Failed to open log files: {e}");
        return ExitCode::FAILURE;
    }
    server::install_panic_hook();

    // Worker thread count from config, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = match runtime_builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            logger::log_error(&format!("Failed to start runtime: {e}"));
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(async_main(cfg)) {
        Ok(code) => code,
        Err(e) => {
            logger::log_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn async_main(cfg: Config) -> Result<ExitCode, StartupError> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;
    let state = Arc::new(AppState::new(&cfg));

    let (supervisor, rejections) = Supervisor::new();
    supervisor.spawn(
        "rate-limit sweeper",
        rate_limit::run_sweeper(Arc::clone(&state.rate_limits), SWEEP_INTERVAL),
    );

    let signals = Arc::new(SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals));

    logger::log_server_start(&addr, &cfg);

    // Use LocalSet for spawn_local support
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::serve(listener, state, signals, rejections))
        .await
}

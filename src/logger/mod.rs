//! Logger module
//!
//! Logging helpers for the storefront server:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Fault, error and warning logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use crate::error::Fault;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
        config.logging.level.eq_ignore_ascii_case("debug"),
    )
}

fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info(&format!("App running on port {}...", addr.port()));
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Build mode: {:?}", config.app.mode));
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    match config.masked_database_url() {
        Some(url) => write_info(&format!("Database: {url}")),
        None => write_info("Database: in-memory document store"),
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

pub fn log_info(message: &str) {
    write_info(&format!("[INFO] {message}"));
}

pub fn log_debug(message: &str) {
    if writer::get().is_some_and(writer::LogWriter::debug_enabled) {
        write_info(&format!("[DEBUG] {message}"));
    }
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

/// Full fault dump, written for every fault that reaches the translator
pub fn log_fault(fault: &Fault) {
    write_error(&format!(
        "ERROR 💥: {} {} {}",
        fault.status_code(),
        fault.kind(),
        fault.message()
    ));
    if let Some(trace) = fault.trace() {
        write_error(trace);
    }
}

pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_info(&entry.format(format));
}

pub fn log_uncaught_exception(message: &str) {
    write_error("UNCAUGHT EXCEPTION! Shutting down...");
    write_error(message);
}

pub fn log_unhandled_rejection(name: &str, message: &str) {
    write_error("UNHANDLED REJECTION!  Shutting down...");
    write_error(&format!("{name} {message}"));
}

pub fn log_shutdown(reason: &str) {
    write_info(&format!("\n[Shutdown] {reason}"));
}

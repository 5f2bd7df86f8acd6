//! Storefront server
//!
//! JSON resource endpoints and server-rendered views behind a fixed
//! middleware pipeline.

pub mod config;
pub mod error;
pub mod http;
pub mod logger;
pub mod orders;
pub mod pipeline;
pub mod resources;
pub mod routing;
pub mod server;
pub mod views;

//! HTTP protocol helpers
//!
//! Response builders, conditional-request checks and content types, kept
//! apart from the pipeline so every stage builds responses the same way.

pub mod cache;
pub mod mime;
pub mod response;

pub use response::{
    build_304_response, build_empty_response, build_file_response, build_html_response,
    build_json_response, build_text_response, HttpResponse,
};

//! Static asset stage
//!
//! Serves files from the configured mounts. A miss is not an error; the
//! request just moves on to the next stage.

use std::path::{Path, PathBuf};

use hyper::body::Bytes;
use hyper::header::IF_NONE_MATCH;
use hyper::Method;
use percent_encoding::percent_decode_str;
use tokio::fs;

use super::{Flow, RequestContext};
use crate::http::{self, cache, mime};
use crate::logger;

/// One URL prefix mapped onto a directory
#[derive(Debug, Clone)]
struct Mount {
    /// Empty for unscoped mounts
    prefix: String,
    dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct StaticMounts {
    mounts: Vec<Mount>,
}

impl StaticMounts {
    /// `/bootstrap`, `/text`, then `views` and `public` at the root
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let mount = |prefix: &str, dir: &str| Mount {
            prefix: prefix.to_string(),
            dir: root.join(dir),
        };
        Self {
            mounts: vec![
                mount("/bootstrap", "bootstrap"),
                mount("/text", "text"),
                mount("", "views"),
                mount("", "public"),
            ],
        }
    }

    pub async fn apply(&self, ctx: &RequestContext) -> Flow {
        if ctx.method != Method::GET && ctx.method != Method::HEAD {
            return Flow::Next;
        }

        for mount in &self.mounts {
            let Some(relative) = strip_mount(ctx.path(), &mount.prefix) else {
                continue;
            };
            if let Some((content, content_type)) = load_from_directory(&mount.dir, relative).await {
                let etag = cache::generate_etag(&content);
                if cache::is_fresh(ctx.header(IF_NONE_MATCH), &etag) {
                    return Flow::Respond(http::build_304_response(&etag));
                }
                return Flow::Respond(http::build_file_response(
                    Bytes::from(content),
                    content_type,
                    &etag,
                    ctx.is_head(),
                ));
            }
        }
        Flow::Next
    }
}

/// Path below the mount prefix, without its leading slash
fn strip_mount<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path.trim_start_matches('/'));
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some("")
    } else {
        rest.strip_prefix('/')
    }
}

/// Load a regular file below `dir`; `None` for misses, directories and
/// anything resolving outside `dir`
async fn load_from_directory(dir: &Path, relative: &str) -> Option<(Vec<u8>, &'static str)> {
    if relative.is_empty() || relative.ends_with('/') {
        return None;
    }

    // Mount directories are optional
    let Ok(dir_canonical) = fs::canonicalize(dir).await else {
        return None;
    };

    let Ok(decoded) = percent_decode_str(relative).decode_utf8() else {
        return None;
    };
    let file_path = dir.join(&*decoded);
    let Ok(file_canonical) = fs::canonicalize(&file_path).await else {
        return None;
    };
    if !file_canonical.starts_with(&dir_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {relative} -> {}",
            file_canonical.display()
        ));
        return None;
    }

    match fs::metadata(&file_canonical).await {
        Ok(meta) if meta.is_file() => {}
        _ => return None,
    }

    let content = match fs::read(&file_canonical).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                file_canonical.display()
            ));
            return None;
        }
    };

    Some((content, mime::content_type_for(&file_canonical)))
}

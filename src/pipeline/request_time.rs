//! Request timestamping

use chrono::{SecondsFormat, Utc};

use super::RequestContext;

pub fn apply(ctx: &mut RequestContext) {
    ctx.requested_at = Some(Utc::now());
}

/// `requested_at` as RFC 3339 with millisecond precision
pub fn formatted(ctx: &RequestContext) -> Option<String> {
    ctx.requested_at
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::context::test_context;
    use hyper::Method;

    #[test]
    fn test_stamp_format() {
        let mut ctx = test_context(Method::GET, "/");
        assert!(formatted(&ctx).is_none());
        apply(&mut ctx);
        let stamp = formatted(&ctx).unwrap();
        assert!(stamp.ends_with('Z'));
        assert_eq!(stamp.len(), "2024-01-01T00:00:00.000Z".len());
    }
}

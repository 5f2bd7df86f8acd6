//! Access log format module
//!
//! Supports:
//! - `dev` (method, url, status, response time, length; the development default)
//! - `combined` (Apache/Nginx combined format)
//! - `common` (Common Log Format - CLF)
//! - `json` (one JSON object per line)
//! - Custom patterns with `$variables`

use std::time::Duration;

use chrono::{DateTime, Local};

/// One finished request, ready to be formatted
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub time: DateTime<Local>,
    pub method: String,
    /// Path plus query string, as requested
    pub url: String,
    pub http_version: String,
    pub status: u16,
    /// Response Content-Length, when known
    pub body_bytes: Option<u64>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub response_time: Duration,
}

impl AccessLogEntry {
    pub fn new(remote_addr: String, method: String, url: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            url,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: None,
            referer: None,
            user_agent: None,
            response_time: Duration::ZERO,
        }
    }

    pub fn format(&self, format: &str) -> String {
        match format {
            "dev" => self.format_dev(),
            "combined" => self.format_combined(),
            "common" => self.format_common(),
            "json" => self.format_json(),
            custom => self.format_custom(custom),
        }
    }

    fn response_time_ms(&self) -> f64 {
        self.response_time.as_secs_f64() * 1000.0
    }

    fn body_bytes_or_dash(&self) -> String {
        self.body_bytes
            .map_or_else(|| "-".to_string(), |b| b.to_string())
    }

    /// `GET /api/v1/products 200 3.512 ms - 1432`
    fn format_dev(&self) -> String {
        format!(
            "{} {} {} {:.3} ms - {}",
            self.method,
            self.url,
            self.status,
            self.response_time_ms(),
            self.body_bytes_or_dash(),
        )
    }

    fn format_combined(&self) -> String {
        format!(
            "{} \"{}\" \"{}\"",
            self.format_common(),
            self.referer.as_deref().unwrap_or("-"),
            self.user_agent.as_deref().unwrap_or("-"),
        )
    }

    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{} {} HTTP/{}\" {} {}",
            self.remote_addr,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.method,
            self.url,
            self.http_version,
            self.status,
            self.body_bytes_or_dash(),
        )
    }

    fn format_json(&self) -> String {
        serde_json::json!({
            "remote_addr": self.remote_addr,
            "time": self.time.to_rfc3339(),
            "method": self.method,
            "url": self.url,
            "http_version": self.http_version,
            "status": self.status,
            "body_bytes": self.body_bytes,
            "referer": self.referer,
            "user_agent": self.user_agent,
            "response_time_ms": self.response_time_ms(),
        })
        .to_string()
    }

    /// Variables: `$remote_addr`, `$time_local`, `$time_iso8601`,
    /// `$request_method`, `$request_uri`, `$status`, `$body_bytes_sent`,
    /// `$http_referer`, `$http_user_agent`, `$response_time` (ms).
    fn format_custom(&self, pattern: &str) -> String {
        pattern
            .replace("$remote_addr", &self.remote_addr)
            .replace(
                "$time_local",
                &self.time.format("%d/%b/%Y:%H:%M:%S %z").to_string(),
            )
            .replace("$time_iso8601", &self.time.to_rfc3339())
            .replace("$request_method", &self.method)
            .replace("$request_uri", &self.url)
            .replace("$status", &self.status.to_string())
            .replace("$body_bytes_sent", &self.body_bytes_or_dash())
            .replace("$http_referer", self.referer.as_deref().unwrap_or("-"))
            .replace("$http_user_agent", self.user_agent.as_deref().unwrap_or("-"))
            .replace("$response_time", &format!("{:.3}", self.response_time_ms()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "10.0.0.7".to_string(),
            "PATCH".to_string(),
            "/api/v1/orders/42?x=1".to_string(),
        );
        entry.status = 200;
        entry.body_bytes = Some(87);
        entry.referer = Some("http://localhost:3000/orders/42".to_string());
        entry.user_agent = Some("Mozilla/5.0".to_string());
        entry.response_time = Duration::from_micros(2500);
        entry
    }

    #[test]
    fn test_format_dev() {
        let log = create_test_entry().format("dev");
        assert_eq!(log, "PATCH /api/v1/orders/42?x=1 200 2.500 ms - 87");
    }

    #[test]
    fn test_format_dev_unknown_length() {
        let mut entry = create_test_entry();
        entry.body_bytes = None;
        assert!(entry.format("dev").ends_with("ms - -"));
    }

    #[test]
    fn test_format_combined() {
        let log = create_test_entry().format("combined");
        assert!(log.starts_with("10.0.0.7 - - ["));
        assert!(log.contains("\"PATCH /api/v1/orders/42?x=1 HTTP/1.1\" 200 87"));
        assert!(log.ends_with("\"http://localhost:3000/orders/42\" \"Mozilla/5.0\""));
    }

    #[test]
    fn test_format_common_has_no_agent() {
        let log = create_test_entry().format("common");
        assert!(!log.contains("Mozilla"));
    }

    #[test]
    fn test_format_json() {
        let log = create_test_entry().format("json");
        let value: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(value["method"], "PATCH");
        assert_eq!(value["status"], 200);
        assert_eq!(value["body_bytes"], 87);
    }

    #[test]
    fn test_format_custom() {
        let log = create_test_entry().format("$remote_addr $status $response_time");
        assert_eq!(log, "10.0.0.7 200 2.500");
    }
}

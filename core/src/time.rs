//! Time related utils.

use chrono::Utc;

/// DateTime in UTC.
pub type DateTime = chrono::DateTime<Utc>;

/// Return the current time in UTC.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format a datetime into an http date, aka RFC 1123.
///
/// ```text
/// Fri, 21 Nov 1997 09:55:06 GMT
/// ```
pub fn format_http_date(t: DateTime) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Format a datetime into RFC 3339 with seconds precision.
///
/// ```text
/// 1997-11-21T09:55:06Z
/// ```
pub fn format_rfc3339(t: DateTime) -> String {
    t.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

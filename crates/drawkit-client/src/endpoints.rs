//! Backend routes, relative to the API base (HTTP) or stream origin (WS).
//!
//! Job ids are opaque. They are percent-encoded as a single path segment and
//! otherwise passed through untouched.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Everything except RFC 3986 unreserved characters.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub const START_DRAW: &str = "/draw";
pub const AUDIT: &str = "/audit";
pub const START_NIST: &str = "/audit/nist";

fn segment(job_id: &str) -> String {
    utf8_percent_encode(job_id, SEGMENT).to_string()
}

pub fn draw_result(job_id: &str) -> String {
    format!("/draw/{}", segment(job_id))
}

pub fn draw_bits(job_id: &str) -> String {
    format!("/draw/{}/bits", segment(job_id))
}

pub fn nist_report(job_id: &str) -> String {
    format!("/audit/nist/{}", segment(job_id))
}

/// WebSocket feed of a draw job.
pub fn draw_ws(job_id: &str) -> String {
    format!("/ws/draw/{}", segment(job_id))
}

/// WebSocket feed of an audit job.
pub fn audit_ws(job_id: &str) -> String {
    format!("/ws/audit/{}", segment(job_id))
}

/// SSE feed of a draw job.
pub fn draw_events(job_id: &str) -> String {
    format!("/draw/{}/events", segment(job_id))
}

/// SSE feed of an audit job.
pub fn audit_events(job_id: &str) -> String {
    format!("/audit/nist/{}/events", segment(job_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ids_pass_through() {
        let id = "3f2b9c1e-7a44-4b7e-9b0e-2d1f0c9a8e77";
        assert_eq!(draw_result(id), format!("/draw/{id}"));
        assert_eq!(draw_ws(id), format!("/ws/draw/{id}"));
        assert_eq!(nist_report("n_1.2~x"), "/audit/nist/n_1.2~x");
    }

    #[test]
    fn reserved_characters_are_escaped() {
        assert_eq!(draw_bits("a/b c"), "/draw/a%2Fb%20c/bits");
        assert_eq!(audit_ws("x?y#z"), "/ws/audit/x%3Fy%23z");
    }

    #[test]
    fn event_feeds() {
        assert_eq!(draw_events("j"), "/draw/j/events");
        assert_eq!(audit_events("j"), "/audit/nist/j/events");
    }
}

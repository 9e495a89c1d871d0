//! Draw generation contracts.
//!
//! A draw is requested with a [`DrawConfig`], progresses through the backend
//! pipeline (entropy → whitening → seed → draw → tests) and ends in a
//! [`DrawResult`]. The raw bit stream behind a draw is available as a
//! [`BitsResult`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::JsonMap;
use crate::audit::NistSummary;
use crate::stream::StreamEvent;

/// Parameters of a draw request. The backend echoes it back unchanged in
/// [`DrawResult::config`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawConfig {
    /// Entropy source identifiers to mix.
    pub sources: Vec<String>,
    /// Number of bits to harvest.
    pub bits: u64,
    /// How many numbers to draw.
    pub numbers: u64,
    /// Inclusive upper bound of each drawn number.
    pub max_number: u64,
}

impl DrawConfig {
    pub fn new(sources: Vec<String>, bits: u64, numbers: u64, max_number: u64) -> Self {
        Self {
            sources,
            bits,
            numbers,
            max_number,
        }
    }

    /// Split a comma-separated source list, dropping blanks.
    pub fn parse_sources(list: &str) -> Vec<String> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Completed draw job as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawResult {
    pub job_id: String,
    pub status: String,
    /// Unix time in seconds.
    pub started_at: f64,
    pub finished_at: f64,
    pub config: DrawConfig,
    /// Per-stage reports in pipeline order.
    pub stages: Vec<JsonMap>,
    pub draw: Vec<i64>,
    pub fingerprint: String,
    pub tests: JsonMap,
}

impl DrawResult {
    /// Wall time of the job in seconds, never negative.
    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).max(0.0)
    }

    /// True when the backend echoed `sent` unchanged.
    pub fn echoes(&self, sent: &DrawConfig) -> bool {
        &self.config == sent
    }
}

/// Bit stream behind a draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitsResult {
    pub job_id: String,
    /// `'0'`/`'1'` characters.
    pub bits: String,
    pub length: u64,
}

impl BitsResult {
    /// `length` matches the bit string and the string is binary.
    pub fn is_consistent(&self) -> bool {
        self.bits.len() as u64 == self.length && self.bits.bytes().all(|b| b == b'0' || b == b'1')
    }

    pub fn count_ones(&self) -> usize {
        self.bits.bytes().filter(|&b| b == b'1').count()
    }
}

/// Live snapshot of a draw assembled from stream events before the final
/// result is fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawLive {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests_summary: Option<NistSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl DrawLive {
    /// Fold the fields this snapshot tracks out of an event payload.
    ///
    /// Any event kind may carry them; `tests` events typically use `summary`,
    /// `final` events `tests_summary`. Fields that fail to parse are left
    /// untouched.
    pub fn absorb(&mut self, event: &StreamEvent) {
        let data = &event.data;

        if let Some(draw) = data.get("draw").and_then(parse_numbers) {
            self.draw = Some(draw);
        }
        if let Some(fp) = data.get("fingerprint").and_then(Value::as_str) {
            self.fingerprint = Some(fp.to_string());
        }
        let summary = data.get("tests_summary").or_else(|| data.get("summary"));
        if let Some(value) = summary {
            match serde_json::from_value::<NistSummary>(value.clone()) {
                Ok(s) => self.tests_summary = Some(s),
                Err(e) if !value.is_null() => {
                    log::warn!("ignoring malformed tests summary in '{}' event: {e}", event.event)
                }
                Err(_) => {}
            }
        }
        if let Some(status) = data.get("status").and_then(Value::as_str) {
            self.status = Some(status.to_string());
        }
    }
}

fn parse_numbers(value: &Value) -> Option<Vec<i64>> {
    value.as_array()?.iter().map(Value::as_i64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_config() -> DrawConfig {
        DrawConfig::new(vec!["clock_jitter".into(), "dram".into()], 4096, 6, 49)
    }

    #[test]
    fn config_echo_round_trip() {
        let sent = sample_config();
        let body = json!({
            "job_id": "j-1",
            "status": "done",
            "started_at": 1700000000.25,
            "finished_at": 1700000002.75,
            "config": serde_json::to_value(&sent).unwrap(),
            "stages": [{"stage": "entropy", "bytes": 512}],
            "draw": [3, 17, 22, 31, 40, 49],
            "fingerprint": "ab12",
            "tests": {"monobit": {"passed": true}}
        });
        let result: DrawResult = serde_json::from_value(body).unwrap();
        assert!(result.echoes(&sent));
        assert_eq!(result.config, sent);
        assert!((result.duration_secs() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn duration_never_negative() {
        let result = DrawResult {
            job_id: "j".into(),
            status: "failed".into(),
            started_at: 10.0,
            finished_at: 0.0,
            config: sample_config(),
            stages: vec![],
            draw: vec![],
            fingerprint: String::new(),
            tests: JsonMap::new(),
        };
        assert_eq!(result.duration_secs(), 0.0);
    }

    #[test]
    fn parse_sources_drops_blanks() {
        assert_eq!(
            DrawConfig::parse_sources(" a, ,b ,"),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(DrawConfig::parse_sources("").is_empty());
    }

    #[test]
    fn bits_consistency() {
        let ok = BitsResult {
            job_id: "j".into(),
            bits: "0110".into(),
            length: 4,
        };
        assert!(ok.is_consistent());
        assert_eq!(ok.count_ones(), 2);

        let short = BitsResult {
            length: 5,
            ..ok.clone()
        };
        assert!(!short.is_consistent());

        let junk = BitsResult {
            bits: "01a0".into(),
            ..ok
        };
        assert!(!junk.is_consistent());
    }

    #[test]
    fn live_absorbs_draw_and_summary() {
        let mut live = DrawLive::default();
        let draw = StreamEvent::new("draw", json!({"draw": [1, 2, 3], "fingerprint": "ff00"}));
        live.absorb(&draw);
        assert_eq!(live.draw.as_deref(), Some(&[1, 2, 3][..]));
        assert_eq!(live.fingerprint.as_deref(), Some("ff00"));

        let tests = StreamEvent::new(
            "tests",
            json!({"summary": {"eligible": 10, "total": 15, "passed": 9, "ratio": 0.9}}),
        );
        live.absorb(&tests);
        let summary = live.tests_summary.unwrap();
        assert_eq!(summary.passed, 9);
        assert_eq!(summary.total, 15);
    }

    #[test]
    fn live_keeps_previous_values_on_garbage() {
        let mut live = DrawLive {
            draw: Some(vec![7]),
            ..Default::default()
        };
        live.absorb(&StreamEvent::new(
            "final",
            json!({"draw": "nope", "tests_summary": null, "status": "done"}),
        ));
        assert_eq!(live.draw, Some(vec![7]));
        assert!(live.tests_summary.is_none());
        assert_eq!(live.status.as_deref(), Some("done"));
    }

    #[test]
    fn live_serializes_without_missing_fields() {
        let live = DrawLive {
            status: Some("running".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&live).unwrap(), json!({"status": "running"}));
    }
}

//! Draw session state and the results log.
//!
//! [`DrawState`] is what the draw page keeps while a job runs: which stages
//! have been reported, the live snapshot, the final result and the optional
//! bit view. Stream messages are otherwise ephemeral; [`ResultsLog`] is the
//! explicit way to keep them.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::draw::{BitsResult, DrawLive, DrawResult};
use crate::error::ContractError;
use crate::stream::StreamMessage;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawState {
    pub job_id: Option<String>,
    pub result: Option<DrawResult>,
    /// Pipeline stages in arrival order, each recorded once.
    pub stages: Vec<String>,
    pub live: DrawLive,
    pub is_loading: bool,
    pub error: Option<String>,
    pub show_bits: bool,
    pub bits: Option<BitsResult>,
}

impl DrawState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for a freshly started job.
    pub fn begin(&mut self, job_id: impl Into<String>) {
        *self = Self {
            job_id: Some(job_id.into()),
            is_loading: true,
            ..Self::default()
        };
    }

    /// Fold one stream message into the state.
    pub fn apply(&mut self, message: &StreamMessage) {
        match message {
            StreamMessage::Event(event) => {
                let is_new = !self.stages.iter().any(|s| s == &event.event);
                if is_new && event.kind().is_stage() {
                    self.stages.push(event.event.clone());
                }
                self.live.absorb(event);
                if event.is_final() {
                    self.is_loading = false;
                }
            }
            StreamMessage::ValidationError(err) => self.fail(err.to_string()),
        }
    }

    /// Store the fetched result; the job is no longer loading.
    ///
    /// A result for a different job than the one begun is ignored.
    pub fn complete(&mut self, result: DrawResult) {
        if let Some(job) = self.job_id.as_deref().filter(|j| *j != result.job_id) {
            log::warn!(
                "ignoring result for job {} while tracking {job}",
                result.job_id
            );
            return;
        }
        self.job_id = Some(result.job_id.clone());
        self.result = Some(result);
        self.is_loading = false;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.is_loading = false;
    }

    pub fn attach_bits(&mut self, bits: BitsResult) {
        self.bits = Some(bits);
    }

    /// Flip the bit view; returns the new visibility.
    pub fn toggle_bits(&mut self) -> bool {
        self.show_bits = !self.show_bits;
        self.show_bits
    }

    /// Draw numbers from the result, or from the live feed while running.
    pub fn numbers(&self) -> Option<&[i64]> {
        match &self.result {
            Some(r) => Some(&r.draw),
            None => self.live.draw.as_deref(),
        }
    }

    pub fn fingerprint(&self) -> Option<&str> {
        match &self.result {
            Some(r) => Some(&r.fingerprint),
            None => self.live.fingerprint.as_deref(),
        }
    }
}

/// Explicitly retained stream messages for one job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsLog {
    pub job_id: Option<String>,
    pub messages: Vec<StreamMessage>,
}

impl ResultsLog {
    pub fn new(job_id: Option<String>) -> Self {
        Self {
            job_id,
            messages: Vec::new(),
        }
    }

    pub fn record(&mut self, message: StreamMessage) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Write the log as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ContractError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ContractError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsonMap;
    use crate::draw::DrawConfig;
    use crate::stream::{StreamEvent, ValidationError, ValidationIssue};
    use serde_json::json;

    fn event(name: &str, data: serde_json::Value) -> StreamMessage {
        StreamMessage::Event(StreamEvent::new(name, data))
    }

    fn result(job: &str) -> DrawResult {
        DrawResult {
            job_id: job.into(),
            status: "done".into(),
            started_at: 0.0,
            finished_at: 1.0,
            config: DrawConfig::new(vec!["a".into()], 64, 2, 10),
            stages: vec![],
            draw: vec![4, 9],
            fingerprint: "cafe".into(),
            tests: JsonMap::new(),
        }
    }

    #[test]
    fn begin_resets_previous_job() {
        let mut state = DrawState::new();
        state.begin("old");
        state.fail("boom");
        state.toggle_bits();
        state.begin("new");
        assert_eq!(state.job_id.as_deref(), Some("new"));
        assert!(state.is_loading);
        assert!(state.error.is_none());
        assert!(!state.show_bits);
    }

    #[test]
    fn stages_are_recorded_once_in_order() {
        let mut state = DrawState::new();
        state.begin("j");
        for name in ["entropy", "entropy", "whitening", "seed", "entropy"] {
            state.apply(&event(name, json!({})));
        }
        assert_eq!(state.stages, vec!["entropy", "whitening", "seed"]);
        assert!(state.is_loading);
    }

    #[test]
    fn non_stage_events_are_not_stages() {
        let mut state = DrawState::new();
        state.begin("j");
        for name in ["message", "seed", "heartbeat", "final"] {
            state.apply(&event(name, json!({})));
        }
        assert_eq!(state.stages, vec!["seed"]);
        assert!(!state.is_loading);
    }

    #[test]
    fn final_event_stops_loading_and_fills_live() {
        let mut state = DrawState::new();
        state.begin("j");
        state.apply(&event("draw", json!({"draw": [5, 6], "fingerprint": "beef"})));
        assert_eq!(state.numbers(), Some(&[5, 6][..]));
        state.apply(&event("final", json!({"status": "done"})));
        assert!(!state.is_loading);
        assert_eq!(state.live.status.as_deref(), Some("done"));
        assert_eq!(state.fingerprint(), Some("beef"));
    }

    #[test]
    fn validation_error_fails_the_job() {
        let mut state = DrawState::new();
        state.begin("j");
        state.apply(&StreamMessage::ValidationError(ValidationError {
            issues: vec![ValidationIssue {
                location: vec![],
                message: "bits must be positive".into(),
                kind: "value_error".into(),
            }],
        }));
        assert_eq!(state.error.as_deref(), Some("bits must be positive"));
        assert!(!state.is_loading);
    }

    #[test]
    fn complete_prefers_result_over_live() {
        let mut state = DrawState::new();
        state.begin("j");
        state.apply(&event("draw", json!({"draw": [1]})));
        state.complete(result("j"));
        assert_eq!(state.numbers(), Some(&[4, 9][..]));
        assert_eq!(state.fingerprint(), Some("cafe"));
        assert!(!state.is_loading);
    }

    #[test]
    fn complete_ignores_foreign_job() {
        let mut state = DrawState::new();
        state.begin("mine");
        state.complete(result("theirs"));
        assert!(state.result.is_none());
        assert!(state.is_loading);
    }

    #[test]
    fn bits_toggle() {
        let mut state = DrawState::new();
        state.attach_bits(BitsResult {
            job_id: "j".into(),
            bits: "01".into(),
            length: 2,
        });
        assert!(state.toggle_bits());
        assert!(!state.toggle_bits());
        assert!(state.bits.is_some());
    }

    #[test]
    fn results_log_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("job.json");

        let mut log = ResultsLog::new(Some("j-9".into()));
        log.record(event("seed", json!({"seed": "00ff"})));
        log.record(StreamMessage::from_json(r#"{"detail":"gone"}"#).unwrap());
        log.save(&path).unwrap();

        let loaded = ResultsLog::load(&path).unwrap();
        assert_eq!(loaded, log);
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn results_log_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ResultsLog::load(&dir.path().join("missing.json")),
            Err(ContractError::Io(_))
        ));
    }
}

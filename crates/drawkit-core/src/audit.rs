//! Audit contracts: submitting a bit sequence (or a list of numbers) to the
//! backend's NIST SP 800-22 style battery and reading the report back.

use serde::{Deserialize, Serialize};

use crate::JsonMap;

/// Input to an audit run.
///
/// Exactly one of the two fields is expected to be set. The backend enforces
/// this; [`AuditInput::is_well_formed`] only reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_bits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numbers: Option<Vec<i64>>,
}

impl AuditInput {
    pub fn from_bits(bits: impl Into<String>) -> Self {
        Self {
            sequence_bits: Some(bits.into()),
            numbers: None,
        }
    }

    pub fn from_numbers(numbers: Vec<i64>) -> Self {
        Self {
            sequence_bits: None,
            numbers: Some(numbers),
        }
    }

    /// Exactly one input is populated.
    pub fn is_well_formed(&self) -> bool {
        self.sequence_bits.is_some() != self.numbers.is_some()
    }
}

/// Strip whitespace from a pasted or file-loaded bit sequence.
///
/// Returns `None` when anything other than `0`, `1` or whitespace is present.
pub fn normalize_bits(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '0' | '1' => out.push(c),
            c if c.is_whitespace() => {}
            _ => return None,
        }
    }
    Some(out)
}

/// Synchronous audit outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResult {
    pub status: String,
    pub length: u64,
    pub tests: JsonMap,
}

/// Returned when an asynchronous job is accepted. Draw jobs use the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NistStartResponse {
    pub job_id: String,
}

/// Aggregate of a NIST run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NistSummary {
    /// Tests that had enough data to run.
    pub eligible: u64,
    pub total: u64,
    pub passed: u64,
    /// Expected to equal `passed / eligible`.
    pub ratio: f64,
}

impl NistSummary {
    /// Build a summary whose ratio is derived from the counts.
    pub fn from_counts(eligible: u64, total: u64, passed: u64) -> Self {
        Self {
            eligible,
            total,
            passed,
            ratio: expected_ratio(passed, eligible),
        }
    }

    /// Summarize a list of test cases, counting every case as eligible.
    pub fn from_cases(cases: &[NistTestCase]) -> Self {
        let total = cases.len() as u64;
        let passed = cases.iter().filter(|c| c.passed).count() as u64;
        Self::from_counts(total, total, passed)
    }

    /// `ratio == passed / eligible` within `tolerance`; zero eligible tests
    /// must report a zero ratio.
    pub fn is_consistent(&self, tolerance: f64) -> bool {
        (self.ratio - expected_ratio(self.passed, self.eligible)).abs() <= tolerance
            && self.passed <= self.eligible
            && self.eligible <= self.total
    }
}

fn expected_ratio(passed: u64, eligible: u64) -> f64 {
    if eligible == 0 {
        0.0
    } else {
        passed as f64 / eligible as f64
    }
}

/// One test in a NIST report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NistTestCase {
    pub name: String,
    pub passed: bool,
    pub p_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Full NIST report for an audit job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NistReport {
    pub job_id: String,
    pub status: String,
    pub started_at: f64,
    #[serde(default)]
    pub finished_at: Option<f64>,
    pub length: u64,
    pub tests: Vec<NistTestCase>,
    pub summary: NistSummary,
}

impl NistReport {
    /// The job has a finish time.
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn failed_tests(&self) -> impl Iterator<Item = &NistTestCase> {
        self.tests.iter().filter(|t| !t.passed)
    }
}

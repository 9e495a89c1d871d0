//! `drawkit report` — fetch and print the NIST report of an audit job.

use drawkit_core::NistReport;

use crate::BackendArgs;

pub fn run(job_id: &str, json: bool, backend: &BackendArgs) {
    let client = super::make_client(backend);
    let rt = super::runtime();
    let report = rt
        .block_on(client.nist_report(job_id))
        .unwrap_or_else(|e| super::fail(format!("cannot fetch report for {job_id}: {e}")));

    if json {
        print_json(&report);
    } else {
        print_report(&report);
    }
}

pub fn print_json(report: &NistReport) {
    match serde_json::to_string_pretty(report) {
        Ok(text) => println!("{text}"),
        Err(e) => super::fail(e),
    }
}

/// Human-readable report: one line per test, then the summary.
pub fn print_report(report: &NistReport) {
    println!("NIST report {} ({})", report.job_id, report.status);
    match report.finished_at {
        Some(end) => println!(
            "  {} bits, {:.2}s",
            report.length,
            (end - report.started_at).max(0.0)
        ),
        None => println!("  {} bits, still running", report.length),
    }
    println!();

    let width = report
        .tests
        .iter()
        .map(|t| t.name.len())
        .max()
        .unwrap_or(4)
        .max(4);
    println!("  {:<width$}  {:>8}  RESULT", "TEST", "P-VALUE");
    for test in &report.tests {
        let mark = if test.passed { "pass" } else { "FAIL" };
        let note = test
            .note
            .as_deref()
            .map(|n| format!("  ({n})"))
            .unwrap_or_default();
        println!(
            "  {:<width$}  {:>8.4}  {mark}{note}",
            test.name, test.p_value
        );
    }

    let s = &report.summary;
    println!();
    println!(
        "  {}/{} eligible tests passed ({:.1}%), {} run in total",
        s.passed,
        s.eligible,
        s.ratio * 100.0,
        s.total
    );
    if !s.is_consistent(1e-9) {
        log::warn!("report summary does not match its counts");
    }
}

//! `drawkit audit` — audit a bit sequence or a number list.
//!
//! Without `--nist` the backend answers synchronously. With `--nist` an
//! audit job is started, optionally followed over its feed, and its report
//! fetched.

use drawkit_client::{Client, ClientError, endpoints};
use drawkit_core::{AuditInput, AuditResult, NistReport, normalize_bits};
use futures::StreamExt;

use crate::BackendArgs;

pub struct AuditCommandConfig<'a> {
    pub bits: Option<&'a str>,
    pub bits_file: Option<&'a str>,
    pub numbers: Option<&'a str>,
    pub nist: bool,
    pub follow: bool,
    pub json: bool,
    pub backend: &'a BackendArgs,
}

enum Outcome {
    Sync(AuditResult),
    Nist(NistReport),
}

pub fn run(cfg: AuditCommandConfig<'_>) {
    let input = build_input(&cfg).unwrap_or_else(|e| super::fail(e));
    let client = super::make_client(cfg.backend);
    let rt = super::runtime();

    let outcome = rt
        .block_on(execute(&client, &input, &cfg))
        .unwrap_or_else(|e| super::fail(format!("audit failed: {e}")));

    match outcome {
        Outcome::Sync(result) if cfg.json => match serde_json::to_string_pretty(&result) {
            Ok(text) => println!("{text}"),
            Err(e) => super::fail(e),
        },
        Outcome::Sync(result) => print_result(&result),
        Outcome::Nist(report) if cfg.json => super::report::print_json(&report),
        Outcome::Nist(report) => super::report::print_report(&report),
    }
}

/// Exactly one input source becomes the request body.
fn build_input(cfg: &AuditCommandConfig<'_>) -> Result<AuditInput, String> {
    let raw_bits = match (cfg.bits, cfg.bits_file) {
        (Some(bits), _) => Some(bits.to_string()),
        (None, Some(path)) => Some(
            std::fs::read_to_string(path).map_err(|e| format!("cannot read {path}: {e}"))?,
        ),
        (None, None) => None,
    };

    if let Some(raw) = raw_bits {
        let bits = normalize_bits(&raw)
            .ok_or_else(|| "bit sequence may only contain '0', '1' and whitespace".to_string())?;
        if bits.is_empty() {
            return Err("bit sequence is empty".to_string());
        }
        return Ok(AuditInput::from_bits(bits));
    }

    match cfg.numbers {
        Some(list) => {
            let numbers = super::parse_numbers(list)?;
            if numbers.is_empty() {
                return Err("--numbers is empty".to_string());
            }
            Ok(AuditInput::from_numbers(numbers))
        }
        None => Err("provide --bits, --bits-file or --numbers".to_string()),
    }
}

async fn execute(
    client: &Client,
    input: &AuditInput,
    cfg: &AuditCommandConfig<'_>,
) -> Result<Outcome, ClientError> {
    if !cfg.nist {
        return client.audit(input).await.map(Outcome::Sync);
    }

    let job = client.start_nist(input).await?;
    if !cfg.json {
        println!("🔬 NIST audit {} started", job.job_id);
    }

    if cfg.follow {
        match client.stream_ws(&endpoints::audit_ws(&job.job_id)).await {
            Ok(mut feed) => {
                while let Some(item) = feed.next().await {
                    match item {
                        Ok(message) => {
                            if !cfg.json {
                                super::draw::print_progress(&message);
                            }
                        }
                        Err(e) => log::warn!("feed error: {e}"),
                    }
                }
            }
            Err(e) => log::warn!("cannot open audit feed: {e}"),
        }
    }

    client.nist_report(&job.job_id).await.map(Outcome::Nist)
}

fn print_result(result: &AuditResult) {
    println!("Audit {} — {} values", result.status, result.length);
    if result.tests.is_empty() {
        return;
    }
    println!();
    for (name, outcome) in &result.tests {
        let mark = match outcome.get("passed").and_then(|v| v.as_bool()) {
            Some(true) => "pass",
            Some(false) => "FAIL",
            None => "?",
        };
        let p = outcome
            .get("p_value")
            .and_then(|v| v.as_f64())
            .map(|p| format!("  p={p:.4}"))
            .unwrap_or_default();
        println!("  {name:<24} {mark}{p}");
    }
}
